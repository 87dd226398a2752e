use crate::error::{Result, ScanError};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Status recorded when no HTTP status was received at all
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Build the transport shared by every probe and fetch of a crawl
pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!("cobweb/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(timeout)
        .pool_max_idle_per_host(50) // Connection pooling
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// Result of a HEAD probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Transport failure or a status outside 200..=299
    Dead { status_code: u16, error: String },
    /// Alive, but not an HTML page (image, script, stylesheet, ...)
    Terminal { status_code: u16 },
    /// Alive HTML page whose links can be followed
    Crawlable { status_code: u16 },
}

impl ProbeOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            ProbeOutcome::Dead { status_code, .. }
            | ProbeOutcome::Terminal { status_code }
            | ProbeOutcome::Crawlable { status_code } => *status_code,
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, ProbeOutcome::Dead { .. })
    }

    pub fn is_crawlable(&self) -> bool {
        matches!(self, ProbeOutcome::Crawlable { .. })
    }
}

/// Issues the cheap existence probe and the full document fetch.
#[derive(Debug, Clone)]
pub struct ResourceChecker {
    client: Client,
}

impl ResourceChecker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        debug!("Probing {}", url);

        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return ProbeOutcome::Dead {
                    status_code: TRANSPORT_FAILURE_STATUS,
                    error: e.to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::Dead {
                status_code: status.as_u16(),
                error: ScanError::LinkFailed.to_string(),
            };
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        if is_html {
            ProbeOutcome::Crawlable {
                status_code: status.as_u16(),
            }
        } else {
            ProbeOutcome::Terminal {
                status_code: status.as_u16(),
            }
        }
    }

    /// GET the full page and decode it with the charset its Content-Type
    /// declares (UTF-8 when it declares none).
    pub async fn fetch_document(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);
        let extraction = |e: reqwest::Error| ScanError::Extraction(e.to_string());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(extraction)?;
        response.text_with_charset("utf-8").await.map_err(extraction)
    }
}
