//! Headless-browser fetch strategy for script-rendered listings.
//!
//! Uses chromiumoxide (CDP) to render pages that build their listing tables
//! with JavaScript. Compiled behind the `browser` feature; when the feature
//! is off or Chrome cannot be found, strategy construction fails and the
//! engine falls back to plain HTTP.

use std::sync::Arc;

#[cfg(feature = "browser")]
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

use crate::models::SourceConfig;

use super::rate_limit::RateLimiter;
#[cfg(feature = "browser")]
use super::user_agent::resolve_user_agent;
#[cfg(feature = "browser")]
use super::DEFAULT_TIMEOUT_SECS;
use super::{FetchError, FetchStrategy, FetchedPage, StrategyKind};

/// JavaScript to wait for the document ready state.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Browser-based fetcher.
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    browser: Arc<Mutex<Browser>>,
    limiter: Arc<RateLimiter>,
    user_agent: String,
    timeout_secs: u64,
    /// Selector whose appearance means the listings have rendered.
    wait_selector: Option<String>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    fn find_chrome() -> Result<std::path::PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow::anyhow!("Chrome/Chromium not found on this host"))
    }

    /// Launch a headless browser for one source.
    pub async fn launch(source: &SourceConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let chrome_path = Self::find_chrome()?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if let Some(proxy) = source.proxies.first() {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        // Listing extraction only needs the DOM; skip decorative resources
        if source.block_resources {
            builder = builder
                .arg("--blink-settings=imagesEnabled=false")
                .arg("--disable-remote-fonts")
                .arg("--mute-audio");
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config).await?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let wait_selector = if source.selectors.job_container.is_empty() {
            None
        } else {
            Some(source.selectors.job_container.clone())
        };

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            limiter,
            user_agent: resolve_user_agent(source.user_agent.as_deref()),
            timeout_secs: source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            wait_selector,
        })
    }

    async fn fetch_inner(&self, page: &Page, url: &str) -> Result<String> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await?;

        page.goto(url).await?;
        self.wait_for_ready(page).await;
        self.wait_for_listings(page).await;

        Ok(page.content().await?)
    }

    async fn wait_for_ready(&self, page: &Page) {
        let timeout = Duration::from_secs(self.timeout_secs);
        match tokio::time::timeout(timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string())).await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("could not check ready state: {}", e),
            Err(_) => warn!("timeout waiting for page ready state"),
        }
    }

    /// Scripted listing tables appear after the document is ready; wait for
    /// the container selector so extraction sees the rendered rows.
    async fn wait_for_listings(&self, page: &Page) {
        if let Some(selector) = &self.wait_selector {
            let timeout = Duration::from_secs(self.timeout_secs);
            match tokio::time::timeout(timeout, page.find_element(selector.as_str())).await {
                Ok(Ok(_)) => debug!("listing container rendered"),
                Ok(Err(e)) => warn!("listing container not found: {}", e),
                Err(_) => warn!("timeout waiting for listing container"),
            }
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl FetchStrategy for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.limiter.acquire().await;

        let start = Instant::now();
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| FetchError::Render {
                    url: url.to_string(),
                    message: format!("failed to open page: {e}"),
                })?
        };

        let result = self.fetch_inner(&page, url).await;
        let _ = page.close().await;

        match result {
            Ok(html) => Ok(FetchedPage {
                html,
                final_url: url.to_string(),
                response_ms: start.elapsed().as_millis() as u64,
                attempts: 1,
            }),
            Err(e) => Err(FetchError::Render {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Browser
    }
}

// Stub for when the browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    _limiter: Arc<RateLimiter>,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub async fn launch(_source: &SourceConfig, _limiter: Arc<RateLimiter>) -> Result<Self> {
        Err(anyhow::anyhow!(
            "browser support not compiled; rebuild with: cargo build --features browser"
        ))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl FetchStrategy for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        Err(FetchError::Render {
            url: url.to_string(),
            message: "browser support not compiled".to_string(),
        })
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Browser
    }
}
