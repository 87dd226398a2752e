// Rendering and saving crawl results

use chrono::{DateTime, Utc};
use cobweb_scanner::{CrawlResult, FailureKind, LinkReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

const RULE: &str = "--------------";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Dead links ordered by URL so repeated runs render the same way
pub fn sorted_dead_links(result: &CrawlResult) -> Vec<&LinkReport> {
    let mut links: Vec<&LinkReport> = result.dead_links.iter().collect();
    links.sort_by(|a, b| a.link.cmp(&b.link).then(a.status_code.cmp(&b.status_code)));
    links
}

pub fn generate_text_report(result: &CrawlResult) -> String {
    let mut report = String::new();

    report.push_str(&format!("\n{}Timelapse{}\n", RULE, RULE));
    report.push_str(&format!("  Start Time: {}\n", format_timestamp(&result.start)));
    report.push_str(&format!("  End Time:   {}\n", format_timestamp(&result.end)));
    report.push_str(&format!("  Duration:   {}\n", format_duration(result.duration())));

    if result.has_dead_links() {
        report.push_str(&format!("\n{}DEAD LINKS{}\n", RULE, RULE));
        for link in sorted_dead_links(result) {
            report.push_str(&format!("\n  URL:         {}\n", link.link));
            report.push_str(&format!("  Status Code: {}\n", link.status_code));
            report.push_str(&format!("  Error:       {}\n", link.error));
            if link.kind == FailureKind::Extraction {
                report.push_str("  Stage:       page extraction\n");
            }
        }
        report.push_str(&format!("\n  {} dead links found\n", result.dead_links.len()));
    } else {
        report.push_str(&format!("\n{}NO DEAD LINKS{}\n", RULE, RULE));
    }

    report
}

pub fn generate_json_report(result: &CrawlResult) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Cobweb",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": Utc::now().to_rfc3339(),
                "format": "json"
            },
            "timelapse": {
                "start_time": result.start.to_rfc3339(),
                "end_time": result.end.to_rfc3339(),
                "duration_ms": result.duration().as_millis() as u64
            },
            "summary": {
                "total_dead_links": result.dead_links.len()
            },
            "dead_links": sorted_dead_links(result)
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_report(result: &CrawlResult, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(result)),
        ReportFormat::Json => generate_json_report(result),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    if secs >= 60 {
        format!("{}m {}.{:03}s", secs / 60, secs % 60, millis)
    } else {
        format!("{}.{:03}s", secs, millis)
    }
}
