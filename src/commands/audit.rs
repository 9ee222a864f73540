//! Audit command
//!
//! Lists recent delivery attempts from the JSONL audit files.

use colored::*;
use eyre::{Context, Result};

use hookpost::audit::{AuditRecord, FileSink};
use hookpost::config::{AuditSinkKind, Config};

use crate::cli::OutputFormat;

pub fn run(last: usize, endpoint: Option<&str>, format: OutputFormat, config: &Config) -> Result<()> {
    if !config.audit.sinks.contains(&AuditSinkKind::File) {
        log::warn!("File audit sink is not enabled; showing whatever is on disk");
    }

    let sink = FileSink::new(Config::expand_path(&config.audit.path));
    let mut records = sink.read_recent(usize::MAX)?;

    if let Some(filter) = endpoint {
        records.retain(|r| r.endpoint.contains(filter));
    }
    let start = records.len().saturating_sub(last);
    let records = &records[start..];

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(records).context("Failed to serialize audit records")?
            );
        }
        OutputFormat::Yaml => {
            println!(
                "{}",
                serde_yaml::to_string(records).context("Failed to serialize audit records")?
            );
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("{}", "No delivery attempts recorded".dimmed());
                return Ok(());
            }
            for record in records {
                print_record(record);
            }
        }
    }

    Ok(())
}

fn print_record(record: &AuditRecord) {
    let local = record.timestamp.with_timezone(&chrono::Local);
    let code = match record.http_code() {
        Some(0) | None => "---".red(),
        Some(c) if (200..300).contains(&c) => c.to_string().green(),
        Some(c) => c.to_string().yellow(),
    };

    println!(
        "{} {} {}",
        local.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        code,
        record.endpoint.bold()
    );

    let detail: Vec<&str> = record.result.lines().skip(1).collect();
    if !detail.is_empty() {
        println!("    {}", detail.join(" ").dimmed());
    }
}
