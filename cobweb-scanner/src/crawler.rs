//! Crawl tasks and the orchestrator that runs them.
//!
//! Every task holds a [`PendingTicket`]; the run is over when the last ticket
//! is dropped. Dead links flow back over one channel that the orchestrator
//! drains for the whole run, so a reporting task is never left waiting on a
//! reader that has gone away.

use crate::checker::{ProbeOutcome, ResourceChecker, TRANSPORT_FAILURE_STATUS};
use crate::config::CrawlConfig;
use crate::error::{Result, ScanError};
use crate::pool::{POOL_WORKERS, Work, WorkerPool};
use crate::registry::VisitedRegistry;
use crate::resolve::{Candidate, LinkResolver, canonical_key, is_http};
use crate::result::{CrawlResult, LinkReport};
use chrono::Utc;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};
use url::Url;

const RUN_CONTEXT: &str = "Run";
const DEAD_LINK_BUFFER: usize = 1;

/// Count of tasks that have been issued but not yet finished
#[derive(Debug, Default)]
pub(crate) struct PendingWork {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingWork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one more task; the count drops again when the ticket does.
    pub(crate) fn ticket(self: &Arc<Self>) -> PendingTicket {
        self.count.fetch_add(1, Ordering::SeqCst);
        PendingTicket(Arc::clone(self))
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Resolves once the count is zero.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent notify_waiters is not missed.
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
pub(crate) struct PendingTicket(Arc<PendingWork>);

impl Drop for PendingTicket {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// State shared by every task of one run
struct Crawl {
    config: CrawlConfig,
    resolver: LinkResolver,
    checker: ResourceChecker,
    registry: VisitedRegistry,
    pending: Arc<PendingWork>,
    dead_links: mpsc::Sender<LinkReport>,
    pool: Arc<WorkerPool>,
}

impl Crawl {
    async fn report(&self, context: &str, report: LinkReport) {
        self.config.events().error_event(
            context,
            "Dead Link",
            &format!(
                "URL[{}] Status[{}] {}",
                report.link, report.status_code, report.error
            ),
        );
        if let Err(e) = self.dead_links.send(report).await {
            warn!("Dead link report dropped after the run closed: {}", e.0.link);
        }
    }
}

/// Where a task enters the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// Must claim and probe its own URL
    Seed,
    /// Claimed and probed crawlable by the parent; starts at extraction
    Discovered,
}

struct CrawlTask {
    target: Url,
    depth: usize,
    entry: Entry,
    crawl: Arc<Crawl>,
    _ticket: PendingTicket,
}

impl CrawlTask {
    fn new(target: Url, depth: usize, entry: Entry, crawl: Arc<Crawl>) -> Self {
        let ticket = crawl.pending.ticket();
        Self {
            target,
            depth,
            entry,
            crawl,
            _ticket: ticket,
        }
    }

    async fn run(self, context: String) {
        let crawl = Arc::clone(&self.crawl);
        let events = crawl.config.events();
        let max_depth = crawl.config.max_depth;
        let target = self.target.as_str();

        if self.depth > max_depth {
            debug!("Depth {} exceeds {} for {}", self.depth, max_depth, target);
            return;
        }

        if self.entry == Entry::Seed {
            if !crawl.registry.try_claim(&canonical_key(&self.target)) {
                return;
            }

            events.event(
                &context,
                "Check",
                &format!("URL[{}] Depth[{}] Start", target, self.depth),
            );

            match crawl.checker.probe(target).await {
                ProbeOutcome::Dead { status_code, error } => {
                    crawl
                        .report(
                            &context,
                            LinkReport::probe_failure(target.to_string(), status_code, error),
                        )
                        .await;
                    return;
                }
                ProbeOutcome::Terminal { .. } => {
                    events.event(&context, "URL Status", &format!("URL[{}] not crawlable", target));
                    return;
                }
                ProbeOutcome::Crawlable { .. } => {}
            }
        } else {
            events.event(
                &context,
                "Check",
                &format!("URL[{}] Depth[{}] Start", target, self.depth),
            );
        }

        // Links on this page would sit one hop past the limit.
        if self.depth >= max_depth {
            events.event(
                &context,
                "Check",
                &format!("URL[{}] Depth[{}] End", target, self.depth),
            );
            return;
        }

        let document = match crawl.checker.fetch_document(target).await {
            Ok(document) => document,
            Err(e) => {
                crawl
                    .report(
                        &context,
                        LinkReport::extraction_failure(
                            target.to_string(),
                            TRANSPORT_FAILURE_STATUS,
                            e.to_string(),
                        ),
                    )
                    .await;
                return;
            }
        };

        let links = crawl.config.extractor().extract(&document);
        debug!("{} raw links on {}", links.len(), target);

        for raw in links {
            self.dispatch_link(&context, &raw).await;
        }

        events.event(
            &context,
            "Check",
            &format!("URL[{}] Depth[{}] End", target, self.depth),
        );
    }

    async fn dispatch_link(&self, context: &str, raw: &str) {
        let crawl = &self.crawl;
        let events = crawl.config.events();
        events.event(context, "Found Link", &format!("Link[{}]", raw));

        let (url, external) = match crawl.resolver.classify(raw, &self.target) {
            Candidate::Fragment => {
                crawl.registry.try_claim(raw);
                return;
            }
            Candidate::SelfLink => return,
            Candidate::Unresolvable(e) => {
                debug!("Skipping unresolvable link {:?}: {}", raw, e);
                return;
            }
            Candidate::Unsupported(url) => {
                debug!("Skipping non-HTTP link {}", url);
                crawl.registry.try_claim(&canonical_key(&url));
                return;
            }
            Candidate::Resolved { url, external } => (url, external),
        };

        if !crawl.registry.try_claim(&canonical_key(&url)) {
            return;
        }

        if external && !crawl.config.check_external {
            events.event(context, "Skip External", &format!("Link[{}]", url));
            return;
        }

        match crawl.checker.probe(url.as_str()).await {
            ProbeOutcome::Dead { status_code, error } => {
                crawl
                    .report(
                        context,
                        LinkReport::probe_failure(url.to_string(), status_code, error),
                    )
                    .await;
            }
            ProbeOutcome::Terminal { .. } => {}
            ProbeOutcome::Crawlable { .. } => {
                let depth = self.depth + 1;
                if depth >= crawl.config.max_depth {
                    // The child would probe its page and stop; we just did that.
                    return;
                }
                let child = CrawlTask::new(url, depth, Entry::Discovered, Arc::clone(crawl));
                crawl.pool.dispatch(context, child).await;
            }
        }
    }
}

impl Work for CrawlTask {
    fn work(self: Box<Self>, context: String) -> BoxFuture<'static, ()> {
        Box::pin((*self).run(context))
    }
}

/// Crawl from `config.seed_url` and collect every dead link found.
///
/// Only a bad seed (or a transport that cannot be built) is an error; every
/// other failure ends up as a [`LinkReport`] in the result.
pub async fn run(config: &CrawlConfig) -> Result<CrawlResult> {
    let events = Arc::clone(config.events());
    events.event(
        RUN_CONTEXT,
        "Run",
        &format!("Started: URL[{}]", config.seed_url),
    );

    let seed = match parse_seed(&config.seed_url) {
        Ok(seed) => seed,
        Err(e) => {
            events.error_event(RUN_CONTEXT, "Run", &e.to_string());
            return Err(e);
        }
    };
    let client = config.http_client()?;

    let (dead_links, mut dead_rx) = mpsc::channel(DEAD_LINK_BUFFER);
    let pool = Arc::new(WorkerPool::new(POOL_WORKERS));
    let pending = PendingWork::new();
    let crawl = Arc::new(Crawl {
        config: config.clone(),
        resolver: LinkResolver::new(&seed),
        checker: ResourceChecker::new(client),
        registry: VisitedRegistry::new(),
        pending: Arc::clone(&pending),
        dead_links,
        pool: Arc::clone(&pool),
    });

    let mut result = CrawlResult::new(Utc::now());
    debug!(
        "Starting crawl of {} (origin {}) with {} workers, max depth {}",
        seed,
        crawl.resolver.origin(),
        pool.size(),
        config.max_depth
    );

    let seed_task = CrawlTask::new(seed, 0, Entry::Seed, Arc::clone(&crawl));
    drop(crawl);
    if let Err(e) = pool.submit(RUN_CONTEXT, seed_task).await {
        pool.shutdown().await;
        return Err(e.into());
    }

    let idle = pending.wait_idle();
    tokio::pin!(idle);
    loop {
        tokio::select! {
            Some(report) = dead_rx.recv() => result.dead_links.push(report),
            _ = &mut idle => break,
        }
    }

    // Everything has finished; pick up whatever is still buffered.
    dead_rx.close();
    while let Some(report) = dead_rx.recv().await {
        result.dead_links.push(report);
    }

    pool.shutdown().await;
    result.end = Utc::now();

    events.event(
        RUN_CONTEXT,
        "Run",
        &format!("Completed: {} dead links", result.dead_links.len()),
    );
    Ok(result)
}

fn parse_seed(raw: &str) -> Result<Url> {
    let invalid = |reason: String| ScanError::InvalidSeedUrl {
        url: raw.escape_debug().to_string(),
        reason,
    };

    if raw.chars().any(char::is_control) {
        return Err(invalid("contains control characters".to_string()));
    }

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !is_http(&url) {
        return Err(invalid(format!("cannot crawl '{}' URLs", url.scheme())));
    }

    Ok(url)
}
