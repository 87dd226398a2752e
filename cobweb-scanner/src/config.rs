use crate::checker::build_client;
use crate::error::Result;
use crate::events::{CrawlEvents, TracingEvents};
use crate::extract::{HtmlLinkExtractor, LinkExtractor};
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything one crawl run needs. Read-only once handed to [`crate::run`].
#[derive(Clone)]
pub struct CrawlConfig {
    pub seed_url: String,
    pub max_depth: usize,
    pub check_external: bool,
    pub timeout: Duration,
    client: Option<Client>,
    events: Arc<dyn CrawlEvents>,
    extractor: Arc<dyn LinkExtractor>,
}

impl CrawlConfig {
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            check_external: false,
            timeout: DEFAULT_TIMEOUT,
            client: None,
            events: Arc::new(TracingEvents),
            extractor: Arc::new(HtmlLinkExtractor::new()),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_check_external(mut self, check_external: bool) -> Self {
        self.check_external = check_external;
        self
    }

    /// Per-request timeout for the transport built by `run`.
    /// Ignored when a client is supplied with [`CrawlConfig::with_client`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn CrawlEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn events(&self) -> &Arc<dyn CrawlEvents> {
        &self.events
    }

    pub fn extractor(&self) -> &Arc<dyn LinkExtractor> {
        &self.extractor
    }

    pub(crate) fn http_client(&self) -> Result<Client> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => build_client(self.timeout),
        }
    }
}

impl fmt::Debug for CrawlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlConfig")
            .field("seed_url", &self.seed_url)
            .field("max_depth", &self.max_depth)
            .field("check_external", &self.check_external)
            .field("timeout", &self.timeout)
            .field("custom_client", &self.client.is_some())
            .finish_non_exhaustive()
    }
}
