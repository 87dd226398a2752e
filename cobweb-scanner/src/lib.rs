pub mod checker;
pub mod config;
pub mod crawler;
pub mod error;
pub mod events;
pub mod extract;
pub mod pool;
pub mod registry;
pub mod resolve;
pub mod result;

pub use checker::{ProbeOutcome, ResourceChecker};
pub use config::CrawlConfig;
pub use crawler::run;
pub use error::{PoolError, Result, ScanError};
pub use events::{CrawlEvents, RecordingEvents, TracingEvents};
pub use extract::{HtmlLinkExtractor, LinkExtractor};
pub use pool::{POOL_WORKERS, Work, WorkerPool};
pub use registry::VisitedRegistry;
pub use resolve::LinkResolver;
pub use result::{CrawlResult, FailureKind, LinkReport};
