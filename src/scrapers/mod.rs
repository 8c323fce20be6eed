//! Page acquisition: turn a wishlist URL into raw markup.
//!
//! Two acquirers share the [`PageAcquirer`] trait: a single HTTP GET, and a
//! headless browser session that scrolls the page so lazily loaded items
//! render before the markup is captured.

pub mod browser;
mod http_client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use browser::{BrowserAcquirer, BrowserEngineConfig, ScrollConfig, ScrollPolicy};
pub use http_client::{resolve_user_agent, HttpAcquirer, DEFAULT_USER_AGENT};

/// How page markup is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AcquireMode {
    /// One HTTP GET; the body is used as-is.
    #[default]
    Static,
    /// Headless browser with scroll cycles to force lazy content.
    Rendered,
}

impl AcquireMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Rendered => "rendered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "http" => Some(Self::Static),
            "rendered" | "browser" => Some(Self::Rendered),
            _ => None,
        }
    }
}

/// Page could not be acquired. Never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("browser session for {url} failed: {message}")]
    Browser { url: String, message: String },

    #[error("cannot render {url}: built without browser support (rebuild with --features browser)")]
    BrowserUnavailable { url: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. } | Self::Browser { url, .. } | Self::BrowserUnavailable { url } => {
                url
            }
        }
    }

    pub(crate) fn browser(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Browser {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Source of raw page markup.
#[async_trait]
pub trait PageAcquirer: Send + Sync {
    /// Fetch the markup for `url`.
    async fn acquire(&self, url: &str) -> Result<String, FetchError>;

    /// Mode label for logging.
    fn mode(&self) -> AcquireMode;
}
