pub mod enhance;
pub mod page;

pub use enhance::{AugmentedPrompt, Enhancement, FetchError, WebEnhancer, extract_urls};
pub use page::extract_page_text;
