//! Shared helpers for integration tests

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Mutex;

use hookpost::dispatch::UreqTransport;
use hookpost::{AuditRecord, AuditSink, DispatchConfig, DispatchError, DispatchOutcome, Dispatcher, Event, Payload};

pub const INVOICE_EVENT: &str = r#"{
    "title": "Invoice Created",
    "message": "Invoice #100 created",
    "url": "https://x/invoice/100",
    "attributes": [{"label": "Amount", "value": "$50.00"}]
}"#;

pub const INVOICE_PAYLOAD: &str = r#"{"event_title":"Invoice Created","event_url":"https://x/invoice/100","event_message":"Invoice #100 created","event_params":[{"label":"Amount","value":"$50.00","url":"","style":"","icon":""}]}"#;

/// A port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn invoice_payload() -> Payload {
    Payload::from_event(&Event::from_json(INVOICE_EVENT).unwrap())
}

/// Audit sink that keeps records in memory
#[derive(Default)]
pub struct MemorySink(pub Mutex<Vec<AuditRecord>>);

impl AuditSink for &MemorySink {
    fn record(&self, record: &AuditRecord) -> eyre::Result<()> {
        self.0.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Run a real dispatch off the async runtime, returning the outcome and every audit record
pub async fn dispatch_invoice(
    config: DispatchConfig,
) -> (Result<DispatchOutcome, DispatchError>, Vec<AuditRecord>) {
    tokio::task::spawn_blocking(move || {
        let sink = MemorySink::default();
        let result = Dispatcher::new(UreqTransport, &sink).dispatch(&config, &invoice_payload());
        let records = sink.0.into_inner().unwrap();
        (result, records)
    })
    .await
    .expect("dispatch task panicked")
}
