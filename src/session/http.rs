//! Static HTTP session
//!
//! Fetches pages with a plain GET and serves extraction from the response body.
//! No script runs, so scrolling never loads more content.

use super::{Session, SessionError};
use crate::config::SessionConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Builds the HTTP client shared by page loads and document downloads
///
/// # Arguments
///
/// * `config` - Session configuration (client identity and timeouts)
/// * `proxy` - Optional upstream proxy all traffic is routed through
pub fn build_http_client(
    config: &SessionConfig,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.navigation_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    builder.build()
}

/// Maps a transport error onto the session taxonomy
pub(crate) fn request_error(url: &str, error: reqwest::Error, timeout: Duration) -> SessionError {
    if error.is_timeout() {
        SessionError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if error.is_connect() {
        SessionError::Navigation {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        SessionError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Downloads `url` in full with a per-request timeout
pub(crate) async fn download(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, SessionError> {
    let failed = |message: String| SessionError::Download {
        url: url.to_string(),
        message,
    };

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("HTTP {}", status.as_u16())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    Ok(bytes.to_vec())
}

#[derive(Debug)]
struct LoadedPage {
    url: String,
    html: String,
}

/// Session backed by plain HTTP requests
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    navigation_timeout: Duration,
    download_timeout: Duration,
    page: Option<LoadedPage>,
}

impl HttpSession {
    pub fn new(config: &SessionConfig, proxy: Option<&str>) -> Result<Self, SessionError> {
        let client =
            build_http_client(config, proxy).map_err(|e| SessionError::Launch(e.to_string()))?;

        Ok(Self {
            client,
            navigation_timeout: config.navigation_timeout(),
            download_timeout: config.download_timeout(),
            page: None,
        })
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.page = None;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e, self.navigation_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| request_error(url, e, self.navigation_timeout))?;

        tracing::debug!("Loaded {} ({} bytes)", final_url, html.len());
        self.page = Some(LoadedPage {
            url: final_url,
            html,
        });
        Ok(())
    }

    async fn scroll_to_exhaustion(&mut self, _max_rounds: u32, _settle: Duration) -> u32 {
        0
    }

    async fn html(&mut self) -> Result<String, SessionError> {
        self.page
            .as_ref()
            .map(|page| page.html.clone())
            .ok_or(SessionError::NoPage)
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|page| page.url.as_str())
    }

    async fn fetch_binary(&mut self, url: &str) -> Result<Vec<u8>, SessionError> {
        download(&self.client, url, self.download_timeout).await
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        Ok(())
    }
}
