use eyre::{Context, Result};
use std::path::Path;

use hookpost::event::Event;
use hookpost::payload::Payload;

/// Print the payload an event would produce, without sending it
pub fn run(event_path: Option<&Path>) -> Result<()> {
    let event = Event::read(event_path)?;
    let payload = Payload::from_event(&event);

    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("Failed to serialize payload")?
    );

    Ok(())
}
