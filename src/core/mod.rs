pub mod config;
pub use config::{AppConfig, Settings, load_settings, save_settings};
