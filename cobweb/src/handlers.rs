use anyhow::{Context, Result};
use clap::ArgMatches;
use cobweb_core::crawl::{CrawlOptions, DEFAULT_TARGET_URL, execute_crawl};
use cobweb_core::report::{ReportFormat, generate_report, save_report};
use cobweb_scanner::config::{DEFAULT_MAX_DEPTH, DEFAULT_TIMEOUT};
use cobweb_scanner::{CrawlResult, POOL_WORKERS};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

pub const EXIT_CLEAN: u8 = 0;
pub const EXIT_DEAD_LINKS: u8 = 1;
pub const EXIT_FATAL: u8 = 2;

/// Settings for one `check` run, as given on the command line
#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub url: Option<String>,
    pub max_depth: usize,
    pub check_external: bool,
    pub timeout: Duration,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub show_progress: bool,
}

impl CheckArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let format_name = matches
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text");
        let format = ReportFormat::from_str(format_name)
            .with_context(|| format!("Unknown report format '{}'", format_name))?;

        Ok(Self {
            url: matches.get_one::<String>("url").cloned(),
            max_depth: matches
                .get_one::<usize>("depth")
                .copied()
                .unwrap_or(DEFAULT_MAX_DEPTH),
            check_external: matches.get_flag("external"),
            timeout: matches
                .get_one::<u64>("timeout")
                .copied()
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            format,
            output: matches.get_one::<PathBuf>("output").cloned(),
            show_progress: !matches.get_flag("no-progress"),
        })
    }

    pub fn to_options(&self, url: String, check_external: bool) -> CrawlOptions {
        CrawlOptions {
            url,
            max_depth: self.max_depth,
            check_external,
            timeout: self.timeout,
            show_progress_bars: self.show_progress,
        }
    }
}

/// Parse a single line as a URL, adding http:// when the scheme is missing.
///
/// Anything with a scheme is passed through untouched so the crawler can
/// reject it with a proper error.
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match Url::parse(line) {
        Ok(url) if !looks_like_host_and_port(&url) => Some(line.to_string()),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            let with_scheme = format!("http://{}", line);
            Url::parse(&with_scheme).ok().map(|_| with_scheme)
        }
        Err(e) => {
            debug!("Not a URL {:?}: {}", line, e);
            None
        }
    }
}

// `localhost:8080` parses as scheme "localhost" with path "8080"
fn looks_like_host_and_port(url: &Url) -> bool {
    url.cannot_be_a_base() && url.path().starts_with(|c: char| c.is_ascii_digit())
}

/// Seed to hand to the crawler for what the user typed
pub fn seed_from_input(raw: &str) -> String {
    parse_url_line(raw).unwrap_or_else(|| raw.to_string())
}

pub fn parse_yes_no(answer: &str, default: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" | "true" => true,
        _ => false,
    }
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, msg: &str) -> io::Result<String> {
    write!(output, "{} ", msg.bright_cyan().bold())?;
    output.flush()?;
    let mut response = String::new();
    input.read_line(&mut response)?;
    Ok(response.trim().to_string())
}

/// Ask for the seed URL and whether external links should be probed.
/// An empty answer takes the default shown in brackets.
pub fn prompt_crawl_target<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<(String, bool)> {
    let url = prompt(
        input,
        output,
        &format!(
            "What is the website URL you want to check? [{}]:",
            DEFAULT_TARGET_URL
        ),
    )?;
    let url = if url.is_empty() {
        DEFAULT_TARGET_URL.to_string()
    } else {
        url
    };

    let external = prompt(input, output, "Check external links as well? [y/N]:")?;
    Ok((url, parse_yes_no(&external, false)))
}

pub fn exit_code_for(result: &CrawlResult) -> u8 {
    if result.has_dead_links() {
        EXIT_DEAD_LINKS
    } else {
        EXIT_CLEAN
    }
}

pub fn verbosity_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Log to stderr so reports on stdout stay clean
pub fn init_tracing(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(verbosity_level(verbosity))
        .with_target(false)
        .try_init();
}

pub fn print_banner() {
    println!(
        "{} {}",
        "cobweb".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}", "dead link crawler".bright_blue());
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_check_settings(options: &CrawlOptions) {
    print_divider();
    println!("{}", "  COBWEB LINK CHECK".bright_white().bold());
    print_divider();
    println!("{} Target: {}", "→".blue(), options.url.bright_white());
    println!("{} Max depth: {}", "→".blue(), options.max_depth);
    println!(
        "{} External links: {}",
        "→".blue(),
        if options.check_external {
            "checked"
        } else {
            "skipped"
        }
    );
    println!("{} Timeout: {}s", "→".blue(), options.timeout.as_secs());
    println!("{} Workers: {}", "→".blue(), POOL_WORKERS);
    println!();
}

fn print_summary(result: &CrawlResult) {
    let count = result.dead_links.len();
    if count == 0 {
        println!("{} No dead links found", "✓".green().bold());
    } else {
        println!(
            "{} {} dead link{} found",
            "✗".red().bold(),
            count,
            if count == 1 { "" } else { "s" }
        );
    }
}

/// Crawl, then print the report or save it to `args.output`
pub async fn run_check(args: &CheckArgs, options: CrawlOptions) -> Result<CrawlResult> {
    let result = execute_crawl(options).await.context("Crawl failed")?;
    let report = generate_report(&result, args.format).context("Failed to render report")?;

    match &args.output {
        Some(path) => save_report(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => print!("{}", report),
    }

    Ok(result)
}

pub async fn handle_check(sub_matches: &ArgMatches, quiet: bool) -> Result<u8> {
    let args = CheckArgs::from_matches(sub_matches)?;

    let (raw_url, check_external) = match &args.url {
        Some(url) => (url.clone(), args.check_external),
        None => {
            let stdin = io::stdin();
            let (url, external) = prompt_crawl_target(&mut stdin.lock(), &mut io::stdout())
                .context("Failed to read crawl target")?;
            (url, external || args.check_external)
        }
    };

    let options = args.to_options(seed_from_input(&raw_url), check_external);
    if !quiet {
        print_check_settings(&options);
    }

    let result = run_check(&args, options).await?;

    if !quiet {
        println!();
        if let Some(path) = &args.output {
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display()
            );
        }
        print_summary(&result);
    }

    Ok(exit_code_for(&result))
}
