use cobweb::handlers::*;
use cobweb::command_argument_builder;
use cobweb_core::report::ReportFormat;
use cobweb_scanner::{CrawlResult, LinkReport};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::path};

fn check_matches(args: &[&str]) -> CheckArgs {
    let mut argv = vec!["cobweb", "check"];
    argv.extend_from_slice(args);
    let matches = command_argument_builder()
        .try_get_matches_from(argv)
        .unwrap();
    CheckArgs::from_matches(matches.subcommand_matches("check").unwrap()).unwrap()
}

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("http://example.com".to_string()));
}

#[test]
fn test_parse_url_line_host_and_port() {
    assert_eq!(
        parse_url_line("localhost:8080/docs"),
        Some("http://localhost:8080/docs".to_string())
    );
    assert_eq!(
        parse_url_line("127.0.0.1:3000"),
        Some("http://127.0.0.1:3000".to_string())
    );
}

#[test]
fn test_parse_url_line_trims_whitespace() {
    let result = parse_url_line("  https://example.com/  \n");
    assert_eq!(result, Some("https://example.com/".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line("   "), None);
}

#[test]
fn test_parse_url_line_keeps_other_schemes() {
    // Left for the crawler to reject
    assert_eq!(
        parse_url_line("ftp://example.com/file"),
        Some("ftp://example.com/file".to_string())
    );
}

#[test]
fn test_seed_from_input_falls_back_to_raw() {
    assert_eq!(seed_from_input("example.com"), "http://example.com");
    assert_eq!(seed_from_input("not a valid url!!!"), "not a valid url!!!");
}

#[test]
fn test_parse_yes_no() {
    assert!(parse_yes_no("y", false));
    assert!(parse_yes_no("YES", false));
    assert!(parse_yes_no("true", false));
    assert!(!parse_yes_no("n", true));
    assert!(!parse_yes_no("nope", false));
    assert!(parse_yes_no("", true));
    assert!(!parse_yes_no("  ", false));
}

#[test]
fn test_prompt_crawl_target_reads_answers() {
    let mut input = Cursor::new("http://localhost:4000/\ny\n");
    let mut output = Vec::new();

    let (url, external) = prompt_crawl_target(&mut input, &mut output).unwrap();

    assert_eq!(url, "http://localhost:4000/");
    assert!(external);
    let shown = String::from_utf8(output).unwrap();
    assert!(shown.contains("What is the website URL you want to check?"));
    assert!(shown.contains("Check external links as well?"));
}

#[test]
fn test_prompt_crawl_target_defaults() {
    let mut input = Cursor::new("\n\n");
    let mut output = Vec::new();

    let (url, external) = prompt_crawl_target(&mut input, &mut output).unwrap();

    assert_eq!(url, "https://example.com/");
    assert!(!external);
}

#[test]
fn test_prompt_crawl_target_at_end_of_input() {
    let mut input = Cursor::new("");
    let mut output = Vec::new();

    let (url, external) = prompt_crawl_target(&mut input, &mut output).unwrap();

    assert_eq!(url, "https://example.com/");
    assert!(!external);
}

#[test]
fn test_verbosity_level() {
    assert_eq!(verbosity_level(0), LevelFilter::WARN);
    assert_eq!(verbosity_level(1), LevelFilter::INFO);
    assert_eq!(verbosity_level(2), LevelFilter::DEBUG);
    assert_eq!(verbosity_level(7), LevelFilter::DEBUG);
}

#[test]
fn test_exit_code_for() {
    let mut result = CrawlResult::new(chrono::Utc::now());
    assert_eq!(exit_code_for(&result), EXIT_CLEAN);

    result.dead_links.push(LinkReport::probe_failure(
        "http://localhost/gone".to_string(),
        404,
        "link failed".to_string(),
    ));
    assert_eq!(exit_code_for(&result), EXIT_DEAD_LINKS);
}

#[test]
fn test_check_args_defaults() {
    let args = check_matches(&[]);

    assert_eq!(args.url, None);
    assert_eq!(args.max_depth, 2);
    assert!(!args.check_external);
    assert_eq!(args.timeout, Duration::from_secs(5));
    assert_eq!(args.format, ReportFormat::Text);
    assert_eq!(args.output, None);
    assert!(args.show_progress);
}

#[test]
fn test_check_args_from_flags() {
    let args = check_matches(&[
        "-u",
        "http://localhost:8080/",
        "-d",
        "4",
        "--external",
        "--timeout",
        "12",
        "-f",
        "json",
        "-o",
        "report.json",
        "--no-progress",
    ]);

    assert_eq!(args.url.as_deref(), Some("http://localhost:8080/"));
    assert_eq!(args.max_depth, 4);
    assert!(args.check_external);
    assert_eq!(args.timeout, Duration::from_secs(12));
    assert_eq!(args.format, ReportFormat::Json);
    assert_eq!(args.output, Some(PathBuf::from("report.json")));
    assert!(!args.show_progress);

    let options = args.to_options("http://localhost:8080/".to_string(), true);
    assert_eq!(options.max_depth, 4);
    assert!(options.check_external);
    assert!(!options.show_progress_bars);
}

#[test]
fn test_check_rejects_unknown_format() {
    let result = command_argument_builder().try_get_matches_from(["cobweb", "check", "-f", "csv"]);
    assert!(result.is_err());
}

#[test]
fn test_global_flags() {
    let matches = command_argument_builder()
        .try_get_matches_from(["cobweb", "-q", "-vv", "check"])
        .unwrap();
    assert!(matches.get_flag("quiet"));
    assert_eq!(matches.get_count("verbose"), 2);
}

#[tokio::test]
async fn test_run_check_saves_report() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(r#"<a href="/retired">Old page</a>"#.as_bytes()),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report_path = dir.path().join("report.json");
    let args = check_matches(&[
        "-u",
        &server.uri(),
        "-f",
        "json",
        "-o",
        report_path.to_str().unwrap(),
        "--no-progress",
    ]);

    let options = args.to_options(seed_from_input(&server.uri()), false);
    let result = run_check(&args, options).await.unwrap();

    assert_eq!(exit_code_for(&result), EXIT_DEAD_LINKS);
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(saved["report"]["summary"]["total_dead_links"], 1);
}

#[tokio::test]
async fn test_run_check_invalid_seed_is_fatal() {
    let args = check_matches(&["--no-progress"]);
    let options = args.to_options(seed_from_input("not a valid url!!!"), false);

    assert!(run_check(&args, options).await.is_err());
}
