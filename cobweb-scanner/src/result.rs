use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a link ended up in the dead-link list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The HEAD probe hit a transport error or a non-2xx status
    Probe,
    /// The page probed fine but its body could not be fetched or decoded
    Extraction,
}

/// One dead or failed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub link: String,
    pub status_code: u16,
    pub error: String,
    pub kind: FailureKind,
}

impl LinkReport {
    pub fn probe_failure(link: String, status_code: u16, error: String) -> Self {
        Self {
            link,
            status_code,
            error,
            kind: FailureKind::Probe,
        }
    }

    pub fn extraction_failure(link: String, status_code: u16, error: String) -> Self {
        Self {
            link,
            status_code,
            error,
            kind: FailureKind::Extraction,
        }
    }
}

/// Outcome of one crawl run.
///
/// `dead_links` is in arrival order, which differs between runs because tasks
/// complete concurrently. Compare it as a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub dead_links: Vec<LinkReport>,
}

impl CrawlResult {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start,
            dead_links: Vec::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }

    pub fn has_dead_links(&self) -> bool {
        !self.dead_links.is_empty()
    }
}
