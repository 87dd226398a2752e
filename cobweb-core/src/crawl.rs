use cobweb_scanner::config::{DEFAULT_MAX_DEPTH, DEFAULT_TIMEOUT};
use cobweb_scanner::{CrawlConfig, CrawlEvents, CrawlResult, Result, TracingEvents};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Seed offered when the user has not supplied one
pub const DEFAULT_TARGET_URL: &str = "https://example.com/";

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: String,
    pub max_depth: usize,
    pub check_external: bool,
    pub timeout: Duration,
    pub show_progress_bars: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            check_external: false,
            timeout: DEFAULT_TIMEOUT,
            show_progress_bars: true,
        }
    }
}

impl CrawlOptions {
    /// Engine configuration for these options, reporting to `events`
    pub fn to_config(&self, events: Arc<dyn CrawlEvents>) -> CrawlConfig {
        CrawlConfig::new(self.url.clone())
            .with_max_depth(self.max_depth)
            .with_check_external(self.check_external)
            .with_timeout(self.timeout)
            .with_events(events)
    }
}

/// Drives a spinner from crawl events and passes every event on to tracing.
pub struct ProgressEvents {
    bar: ProgressBar,
    checked: AtomicUsize,
    dead: AtomicUsize,
    inner: TracingEvents,
}

impl ProgressEvents {
    pub fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            checked: AtomicUsize::new(0),
            dead: AtomicUsize::new(0),
            inner: TracingEvents,
        }
    }

    /// Links seen on crawled pages so far
    pub fn checked(&self) -> usize {
        self.checked.load(Ordering::Relaxed)
    }

    pub fn dead(&self) -> usize {
        self.dead.load(Ordering::Relaxed)
    }

    fn refresh(&self) {
        self.bar.set_message(format!(
            "Crawling... {} URLs checked, {} dead",
            self.checked(),
            self.dead()
        ));
        self.bar.tick();
    }
}

impl CrawlEvents for ProgressEvents {
    fn event(&self, context: &str, event: &str, message: &str) {
        if event == "Found Link" {
            self.checked.fetch_add(1, Ordering::Relaxed);
            self.refresh();
        }
        self.bar.suspend(|| self.inner.event(context, event, message));
    }

    fn error_event(&self, context: &str, event: &str, message: &str) {
        if event == "Dead Link" {
            self.dead.fetch_add(1, Ordering::Relaxed);
            self.refresh();
        }
        self.bar.suspend(|| self.inner.error_event(context, event, message));
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Starting crawl...");
    pb
}

/// Execute a crawl with the given options.
///
/// With progress bars enabled a spinner tracks the run on stderr; otherwise
/// events only go to tracing.
pub async fn execute_crawl(options: CrawlOptions) -> Result<CrawlResult> {
    if !options.show_progress_bars {
        return cobweb_scanner::run(&options.to_config(Arc::new(TracingEvents))).await;
    }

    let progress = Arc::new(ProgressEvents::new(spinner()));
    let config = options.to_config(progress.clone());
    debug!("Crawl options: {:?}", options);

    let outcome = cobweb_scanner::run(&config).await;
    match &outcome {
        Ok(result) => progress.bar.finish_with_message(format!(
            "Crawl complete! {} URLs checked, {} dead links",
            progress.checked(),
            result.dead_links.len()
        )),
        Err(e) => progress
            .bar
            .abandon_with_message(format!("Crawl failed: {}", e)),
    }
    outcome
}
