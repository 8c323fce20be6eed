//! Rendered page acquisition through a headless browser.
//!
//! Uses chromiumoxide (CDP). Each acquisition runs in its own browser
//! session with a throwaway profile; the session is shut down on every exit
//! path so repeated runs do not leak Chrome processes.

mod config;
mod scroll;

pub use config::{BrowserEngineConfig, ScrollConfig};
pub use scroll::{ScrollPolicy, ScrollTracker};

use async_trait::async_trait;

use super::{AcquireMode, FetchError, PageAcquirer};

#[cfg(feature = "browser")]
use anyhow::{Context, Result};
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Browser-backed acquirer.
pub struct BrowserAcquirer {
    config: BrowserEngineConfig,
    scroll: ScrollConfig,
    user_agent: String,
}

impl BrowserAcquirer {
    pub fn new(config: BrowserEngineConfig, scroll: ScrollConfig, user_agent: String) -> Self {
        Self {
            config,
            scroll,
            user_agent,
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageAcquirer for BrowserAcquirer {
    async fn acquire(&self, url: &str) -> Result<String, FetchError> {
        let session = BrowserSession::open(&self.config)
            .await
            .map_err(|e| FetchError::browser(url, format!("{:#}", e)))?;

        let result = self.render(&session, url).await;
        session.close().await;

        result.map_err(|e| FetchError::browser(url, format!("{:#}", e)))
    }

    fn mode(&self) -> AcquireMode {
        AcquireMode::Rendered
    }
}

#[cfg(feature = "browser")]
impl BrowserAcquirer {
    async fn render(&self, session: &BrowserSession, url: &str) -> Result<String> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open tab")?;

        let result = self.scroll_and_capture(&page, url).await;

        if let Err(e) = page.close().await {
            debug!("Closing tab failed: {}", e);
        }
        result
    }

    async fn scroll_and_capture(&self, page: &Page, url: &str) -> Result<String> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .context("Failed to set user agent")?;

        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid URL: {}", e))?;
        page.goto(nav_params).await.context("Navigation failed")?;

        let settle = self.scroll.settle();
        let mut tracker = ScrollTracker::new(self.scroll.policy());
        while tracker.next_cycle() {
            page.evaluate(SCROLL_TO_BOTTOM.to_string())
                .await
                .context("Scroll script failed")?;
            tokio::time::sleep(settle).await;

            let snapshot = if tracker.wants_snapshot() {
                Some(page.content().await.context("Snapshot failed")?)
            } else {
                None
            };
            tracker.record_cycle(snapshot);
        }

        debug!(
            url,
            cycles = tracker.cycles(),
            settled = tracker.settled(),
            "Scrolling finished"
        );

        match tracker.into_last_snapshot() {
            Some(content) => Ok(content),
            None => page.content().await.context("Failed to capture page content"),
        }
    }
}

/// One browser session, launched locally or attached to a remote DevTools endpoint.
#[cfg(feature = "browser")]
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    launched: bool,
    // Removed when the session is dropped.
    _profile: Option<tempfile::TempDir>,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    async fn open(config: &BrowserEngineConfig) -> Result<Self> {
        match config.remote_url.as_deref() {
            Some(remote_url) => Self::connect_remote(config, remote_url).await,
            None => Self::launch(config).await,
        }
    }

    /// Find Chrome executable.
    fn find_chrome(config: &BrowserEngineConfig) -> Result<std::path::PathBuf> {
        if let Some(ref path) = config.chrome_path {
            return Ok(path.clone());
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                debug!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Please install it:\n\
             - Arch/Manjaro: sudo pacman -S chromium\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or set browser.chrome_path in the config"
        ))
    }

    async fn launch(config: &BrowserEngineConfig) -> Result<Self> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = Self::find_chrome(config)?;
        let profile = tempfile::Builder::new()
            .prefix("wishtrack-profile-")
            .tempdir()
            .context("Failed to create browser profile directory")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile.path())
            .request_timeout(config.request_timeout());

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox") // Often needed for headless in containers/restricted environments
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
            launched: true,
            _profile: Some(profile),
        })
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(config: &BrowserEngineConfig, url: &str) -> Result<Self> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, config.timeout
        );

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: config.request_timeout(),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .context("Failed to connect to remote browser")?;

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
            launched: false,
            _profile: None,
        })
    }

    /// Tear the session down. A launched browser is closed (killed if it
    /// refuses); a remote browser is left running.
    async fn close(mut self) {
        if self.launched {
            if let Err(e) = self.browser.close().await {
                warn!("Browser did not close cleanly ({}), killing it", e);
                if let Some(Err(e)) = self.browser.kill().await {
                    warn!("Failed to kill browser: {}", e);
                }
            }
            if let Err(e) = self.browser.wait().await {
                debug!("Waiting for browser exit failed: {}", e);
            }
        }
        self.handler.abort();
    }
}

#[cfg(feature = "browser")]
fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageAcquirer for BrowserAcquirer {
    async fn acquire(&self, url: &str) -> Result<String, FetchError> {
        let _ = (&self.config, &self.scroll, &self.user_agent);
        Err(FetchError::BrowserUnavailable {
            url: url.to_string(),
        })
    }

    fn mode(&self) -> AcquireMode {
        AcquireMode::Rendered
    }
}
