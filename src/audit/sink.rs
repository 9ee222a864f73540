//! Audit sink implementations

use chrono::{Duration, Local};
use eyre::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{AuditRecord, AuditSink};

/// Writes records through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AuditSink for LogSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        log::info!(
            target: "hookpost::audit",
            "[{}] {} {} {}",
            record.module,
            record.endpoint,
            record.request,
            record.result
        );
        Ok(())
    }
}

/// Appends records to daily JSONL files
///
/// Clones share one append lock, and each record goes out as a single
/// write, so concurrent dispatches never interleave lines.
#[derive(Debug, Clone)]
pub struct FileSink {
    base_path: PathBuf,
    append_lock: Arc<Mutex<()>>,
}

impl FileSink {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            append_lock: Arc::new(Mutex::new(())),
        }
    }

    fn log_path(&self, date: chrono::DateTime<Local>) -> PathBuf {
        self.base_path
            .join(date.format("%Y-%m").to_string())
            .join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Path of today's audit file
    pub fn today_log_path(&self) -> PathBuf {
        self.log_path(Local::now())
    }

    /// Last `count` records from yesterday's and today's files, oldest first
    pub fn read_recent(&self, count: usize) -> Result<Vec<AuditRecord>> {
        let today = Local::now();
        let yesterday = today - Duration::days(1);

        let mut records = Vec::new();
        for date in [yesterday, today] {
            let path = self.log_path(date);
            if path.exists() {
                records.extend(read_records(&path)?);
            }
        }

        let start = records.len().saturating_sub(count);
        Ok(records.split_off(start))
    }
}

impl AuditSink for FileSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize audit record")?;
        line.push('\n');

        let path = self.today_log_path();
        let _guard = self.append_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(format!("Failed to create audit directory {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("Failed to open audit file {}", path.display()))?;

        file.write_all(line.as_bytes())
            .context("Failed to write audit record")?;

        Ok(())
    }
}

fn read_records(path: &Path) -> Result<Vec<AuditRecord>> {
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;

    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping malformed audit line in {}: {}", path.display(), e),
        }
    }

    Ok(records)
}
