//! Headless Chromium session using chromiumoxide

use super::http::{build_http_client, download};
use super::{Session, SessionError};
use crate::config::SessionConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::task::JoinHandle;

const SCROLL_HEIGHT_JS: &str = "document.body ? document.body.scrollHeight : 0";
const SCROLL_BOTTOM_JS: &str = "window.scrollTo(0, document.body ? document.body.scrollHeight : 0)";
const OUTER_HTML_JS: &str = "document.documentElement.outerHTML";

/// One headless browser process with a single page
///
/// Document downloads go through a reqwest client carrying the same client
/// identity and proxy as the browser.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    client: Client,
    navigation_timeout: Duration,
    download_timeout: Duration,
    current_url: Option<String>,
    html: Option<String>,
}

impl ChromiumSession {
    /// Launches the browser and opens a blank page
    ///
    /// If the page cannot be created the browser is shut down before returning.
    pub async fn launch(config: &SessionConfig, proxy: Option<&str>) -> Result<Self, SessionError> {
        let client =
            build_http_client(config, proxy).map_err(|e| SessionError::Launch(e.to_string()))?;

        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", config.user_agent))
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(viewport_for(config));

        if let Some(proxy) = proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| SessionError::Launch(format!("invalid browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::debug!("Browser close after failed page open: {}", close_err);
                }
                handler.abort();
                return Err(SessionError::Launch(format!("failed to open page: {}", e)));
            }
        };

        tracing::debug!(
            "Browser started ({}x{}, proxy: {})",
            config.viewport_width,
            config.viewport_height,
            proxy.unwrap_or("none")
        );

        Ok(Self {
            browser,
            page,
            handler,
            client,
            navigation_timeout: config.navigation_timeout(),
            download_timeout: config.download_timeout(),
            current_url: None,
            html: None,
        })
    }

    async fn page_height(&self) -> Option<f64> {
        self.page
            .evaluate(SCROLL_HEIGHT_JS)
            .await
            .ok()?
            .into_value::<f64>()
            .ok()
    }
}

#[async_trait]
impl Session for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.html = None;
        self.current_url = None;

        let timeout_ms = self.navigation_timeout.as_millis() as u64;
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(SessionError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(SessionError::Timeout {
                    url: url.to_string(),
                    timeout_ms,
                })
            }
        }

        let final_url = self.page.url().await.ok().flatten();
        self.current_url = Some(final_url.unwrap_or_else(|| url.to_string()));
        Ok(())
    }

    async fn scroll_to_exhaustion(&mut self, max_rounds: u32, settle: Duration) -> u32 {
        self.html = None;

        let Some(mut last_height) = self.page_height().await else {
            return 0;
        };

        let mut rounds = 0;
        while rounds < max_rounds {
            if let Err(e) = self.page.evaluate(SCROLL_BOTTOM_JS).await {
                tracing::debug!("Scroll failed: {}", e);
                break;
            }
            rounds += 1;
            tokio::time::sleep(settle).await;

            match self.page_height().await {
                Some(height) if height > last_height => last_height = height,
                _ => break,
            }
        }

        tracing::debug!("Scrolled {} rounds, page height {}", rounds, last_height);
        rounds
    }

    async fn html(&mut self) -> Result<String, SessionError> {
        if self.current_url.is_none() {
            return Err(SessionError::NoPage);
        }
        if let Some(html) = &self.html {
            return Ok(html.clone());
        }

        let url = self.current_url.clone().unwrap_or_default();
        let html: String = self
            .page
            .evaluate(OUTER_HTML_JS)
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.clone(),
                message: e.to_string(),
            })?
            .into_value()
            .map_err(|e| SessionError::Navigation {
                url,
                message: format!("failed to read document: {:?}", e),
            })?;

        self.html = Some(html.clone());
        Ok(html)
    }

    fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    async fn fetch_binary(&mut self, url: &str) -> Result<Vec<u8>, SessionError> {
        download(&self.client, url, self.download_timeout).await
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        let ChromiumSession {
            mut browser,
            page,
            handler,
            ..
        } = *self;

        if let Err(e) = page.close().await {
            tracing::debug!("Page close failed: {}", e);
        }
        let result = browser.close().await;
        if let Err(e) = browser.wait().await {
            tracing::warn!("Waiting for browser exit failed: {}", e);
        }
        handler.abort();

        result
            .map(|_| ())
            .map_err(|e| SessionError::Close(e.to_string()))
    }
}

/// Page emulation matching the configured window size
fn viewport_for(config: &SessionConfig) -> Viewport {
    Viewport {
        width: config.viewport_width,
        height: config.viewport_height,
        ..Viewport::default()
    }
}
