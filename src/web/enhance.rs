use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::USER_AGENT;
use thiserror::Error;

use super::page::extract_page_text;

pub const CLIENT_USER_AGENT: &str = "Yak/1.0 (Local LLM Assistant)";

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:https?://\S+|www\.\S+)").unwrap());

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not convert {url} to text: {source}")]
    Convert {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{url} has no readable text")]
    Empty { url: String },
}

/// Prompt text that has been enriched with fetched page content. It
/// is only ever sent to the backend and deliberately has no
/// conversion into a `Message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedPrompt(String);

impl AugmentedPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct Enhancement {
    pub prompt: AugmentedPrompt,
    /// True whenever URLs were detected, even if every fetch failed.
    pub was_enhanced: bool,
    pub fetched: Vec<String>,
    pub failed: Vec<(String, FetchError)>,
}

impl Enhancement {
    fn unchanged(prompt: &str) -> Self {
        Self {
            prompt: AugmentedPrompt(prompt.to_string()),
            was_enhanced: false,
            fetched: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Every `http(s)://` or `www.` token in `text`, in order of
/// appearance. Bare `www.` hosts get an `https://` scheme.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL.find_iter(text)
        .map(|m| {
            let url = m.as_str();
            if url.to_lowercase().starts_with("www.") {
                format!("https://{}", url)
            } else {
                url.to_string()
            }
        })
        .collect()
}

/// Wraps `prompt` in a quotation block of the page at `url`.
pub fn quote_page(url: &str, content: &str, prompt: &str) -> String {
    format!(
        "Based on this webpage content from {}:\n\n{}\n\n---\n\n{}",
        url, content, prompt
    )
}

/// Fetches pages linked from a prompt and folds their text into it.
#[derive(Clone, Debug)]
pub struct WebEnhancer {
    http: reqwest::Client,
}

impl Default for WebEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

impl WebEnhancer {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    pub async fn fetch_page_content(&self, url: &str) -> Result<String, FetchError> {
        tracing::info!("Fetching {}", url);

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        let content = extract_page_text(&html).map_err(|source| FetchError::Convert {
            url: url.to_string(),
            source,
        })?;
        if content.is_empty() {
            return Err(FetchError::Empty {
                url: url.to_string(),
            });
        }

        tracing::info!("Fetched {} characters from {}", content.chars().count(), url);
        Ok(content)
    }

    /// Prepends a quotation block for every URL in `prompt` that can
    /// be fetched. URLs are handled in order and each successful
    /// fetch wraps the text built so far. Failed URLs are skipped.
    pub async fn enhance(&self, prompt: &str) -> Enhancement {
        let urls = extract_urls(prompt);
        if urls.is_empty() {
            return Enhancement::unchanged(prompt);
        }

        let mut augmented = prompt.to_string();
        let mut fetched = Vec::new();
        let mut failed = Vec::new();

        for url in urls {
            match self.fetch_page_content(&url).await {
                Ok(content) => {
                    augmented = quote_page(&url, &content, &augmented);
                    fetched.push(url);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", url, e);
                    failed.push((url, e));
                }
            }
        }

        Enhancement {
            prompt: AugmentedPrompt(augmented),
            was_enhanced: true,
            fetched,
            failed,
        }
    }
}
