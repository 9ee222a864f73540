//! Event notifications delivered as JSON webhooks
//!
//! An event source hands over an [`Event`] and a resolved [`DispatchConfig`];
//! [`payload::build`] flattens the event and [`Dispatcher::dispatch`] POSTs it
//! once, recording the attempt through an [`AuditSink`].

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod payload;

pub use audit::{AuditRecord, AuditSink};
pub use dispatch::{DispatchConfig, DispatchError, DispatchOutcome, Dispatcher};
pub use event::{Attribute, Event};
pub use payload::Payload;
