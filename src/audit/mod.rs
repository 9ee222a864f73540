//! Audit trail for dispatch attempts
//!
//! Every delivery attempt produces one [`AuditRecord`], handed to an
//! [`AuditSink`]. Sinks:
//! - Log - writes through the `log` facade
//! - File (JSONL) - appends to `audit/YYYY-MM/YYYY-MM-DD.jsonl`

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};

pub mod sink;

pub use sink::{FileSink, LogSink};

use crate::config::{AuditConfig, AuditSinkKind, Config};

/// Source tag stamped on every record
pub const MODULE_TAG: &str = "hookpost";

/// One dispatch attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub module: String,
    pub endpoint: String,
    /// Exact JSON body sent
    pub request: String,
    /// `HTTP Code: <n>` followed by the response body or error
    pub result: String,
}

impl AuditRecord {
    pub fn new(endpoint: &str, request: &str, result: String) -> Self {
        Self {
            timestamp: Utc::now(),
            module: MODULE_TAG.to_string(),
            endpoint: endpoint.to_string(),
            request: request.to_string(),
            result,
        }
    }

    /// Status code parsed back out of the result line
    pub fn http_code(&self) -> Option<u16> {
        self.result
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("HTTP Code: "))
            .and_then(|code| code.trim().parse().ok())
    }
}

/// Somewhere audit records go
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> Result<()>;
}

impl<S: AuditSink + ?Sized> AuditSink for Box<S> {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        (**self).record(record)
    }
}

/// Forwards each record to every inner sink
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn AuditSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Build the sinks listed in the audit configuration
    pub fn from_config(config: &AuditConfig) -> Self {
        let sinks = config
            .sinks
            .iter()
            .map(|kind| -> Box<dyn AuditSink> {
                match kind {
                    AuditSinkKind::Log => Box::new(LogSink),
                    AuditSinkKind::File => Box::new(FileSink::new(Config::expand_path(&config.path))),
                }
            })
            .collect();

        Self::new(sinks)
    }
}

impl AuditSink for FanoutSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.record(record) {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            eyre::bail!("{} audit sink(s) failed: {}", failures.len(), failures.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<AuditRecord>>);

    impl AuditSink for Collect {
        fn record(&self, record: &AuditRecord) -> Result<()> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct Broken;

    impl AuditSink for Broken {
        fn record(&self, _record: &AuditRecord) -> Result<()> {
            eyre::bail!("disk full")
        }
    }

    #[test]
    fn test_record_new_stamps_module() {
        let record = AuditRecord::new("https://hooks.example/x", "{}", "HTTP Code: 200\nok".to_string());
        assert_eq!(record.module, MODULE_TAG);
        assert_eq!(record.endpoint, "https://hooks.example/x");
    }

    #[test]
    fn test_record_http_code() {
        let record = AuditRecord::new("e", "{}", "HTTP Code: 404\nnot found".to_string());
        assert_eq!(record.http_code(), Some(404));

        let record = AuditRecord::new("e", "{}", "garbage".to_string());
        assert_eq!(record.http_code(), None);
    }

    #[test]
    fn test_fanout_reaches_every_sink_despite_failure() {
        let collect = std::sync::Arc::new(Collect::default());

        struct Shared(std::sync::Arc<Collect>);
        impl AuditSink for Shared {
            fn record(&self, record: &AuditRecord) -> Result<()> {
                self.0.record(record)
            }
        }

        let fanout = FanoutSink::new(vec![Box::new(Broken), Box::new(Shared(collect.clone()))]);
        let record = AuditRecord::new("e", "{}", "HTTP Code: 200\n".to_string());

        let result = fanout.record(&record);
        assert!(result.is_err());
        assert_eq!(collect.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fanout_from_config() {
        let temp = tempfile::tempdir().unwrap();
        let config = AuditConfig {
            sinks: vec![AuditSinkKind::Log, AuditSinkKind::File],
            path: temp.path().to_path_buf(),
        };

        let fanout = FanoutSink::from_config(&config);
        assert_eq!(fanout.len(), 2);

        fanout
            .record(&AuditRecord::new("https://a", "{}", "HTTP Code: 200\n".to_string()))
            .unwrap();
        let written = FileSink::new(temp.path().to_path_buf()).read_recent(10).unwrap();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn test_fanout_empty() {
        let fanout = FanoutSink::default();
        assert!(fanout.is_empty());
        assert!(fanout.record(&AuditRecord::new("e", "{}", String::new())).is_ok());
    }
}
