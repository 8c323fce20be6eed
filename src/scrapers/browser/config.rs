//! Browser engine and scroll configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::scroll::ScrollPolicy;

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch the scroll cycles while debugging.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chrome/Chromium executable. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// CDP request and navigation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            proxy: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

impl BrowserEngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Lazy-load scrolling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Scroll cycles for the fixed policy.
    #[serde(default = "default_scroll_count")]
    pub count: u32,

    /// Settle delay after each scroll, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Stop as soon as the rendered markup stops changing.
    #[serde(default)]
    pub adaptive: bool,

    /// Upper bound on cycles for the adaptive policy.
    #[serde(default = "default_scroll_max")]
    pub max: u32,
}

fn default_scroll_count() -> u32 {
    50
}

fn default_settle_ms() -> u64 {
    500
}

fn default_scroll_max() -> u32 {
    200
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            count: default_scroll_count(),
            settle_ms: default_settle_ms(),
            adaptive: false,
            max: default_scroll_max(),
        }
    }
}

impl ScrollConfig {
    pub fn policy(&self) -> ScrollPolicy {
        if self.adaptive {
            ScrollPolicy::Adaptive { max: self.max }
        } else {
            ScrollPolicy::Fixed { count: self.count }
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
