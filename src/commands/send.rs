//! Send command
//!
//! Builds the payload for an event and delivers it to every selected rule.
//! Each rule is dispatched on its own worker thread.

use colored::*;
use eyre::{Context, Result};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use hookpost::audit::FanoutSink;
use hookpost::config::Config;
use hookpost::dispatch::{DispatchConfig, DispatchError, DispatchOutcome, Dispatcher, UreqTransport};
use hookpost::event::Event;
use hookpost::payload::Payload;

/// Arguments for `hookpost send`
#[derive(Debug, Default)]
pub struct SendArgs {
    pub event: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub rules: Vec<String>,
    pub insecure: bool,
    pub timeout: Option<u64>,
    pub force: bool,
    pub quiet: bool,
}

/// One delivery destination
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    name: String,
    dispatch: DispatchConfig,
}

pub fn run(args: SendArgs, config: &Config) -> Result<()> {
    let event = Event::read(args.event.as_deref())?;

    if !config.notifications.enabled && !args.force {
        log::info!("Notifications disabled, skipping '{}'", event.title);
        if !args.quiet {
            println!(
                "{} Notifications are disabled; nothing sent (use --force to override)",
                "⚠".yellow()
            );
        }
        return Ok(());
    }

    let targets = resolve_targets(&args, config)?;
    let payload = Payload::from_event(&event);

    let audit = FanoutSink::from_config(&config.audit);
    log::debug!("Auditing to {} sink(s)", audit.len());
    let dispatcher = Dispatcher::new(UreqTransport, audit);

    let results = dispatch_all(&dispatcher, &targets, &payload)?;

    let mut not_configured = 0;
    for (target, result) in targets.iter().zip(&results) {
        match result {
            Ok(outcome) => {
                if !args.quiet {
                    print_outcome(target, outcome);
                }
            }
            Err(e) => {
                not_configured += 1;
                eprintln!("{} {}: {}", "✗".red(), target.name.bold(), e);
            }
        }
    }

    if not_configured > 0 {
        eyre::bail!(
            "{} of {} notification(s) not sent: {}",
            not_configured,
            targets.len(),
            DispatchError::ConfigurationError
        );
    }

    Ok(())
}

/// Work out which endpoints to deliver to
fn resolve_targets(args: &SendArgs, config: &Config) -> Result<Vec<Target>> {
    let mut targets = if let Some(endpoint) = &args.endpoint {
        vec![Target {
            name: "endpoint".to_string(),
            dispatch: config.dispatch_config(Some(endpoint)),
        }]
    } else if !args.rules.is_empty() {
        args.rules
            .iter()
            .map(|name| {
                config
                    .find_rule(name)
                    .map(|rule| Target {
                        name: rule.name.clone(),
                        dispatch: config.dispatch_config(rule.endpoint.as_deref()),
                    })
                    .ok_or_else(|| eyre::eyre!("Unknown rule: {}", name))
            })
            .collect::<Result<Vec<_>>>()?
    } else if config.rules.is_empty() {
        // Nothing configured; dispatching surfaces the missing endpoint
        vec![Target {
            name: "default".to_string(),
            dispatch: config.dispatch_config(None),
        }]
    } else {
        config
            .rules
            .iter()
            .map(|rule| Target {
                name: rule.name.clone(),
                dispatch: config.dispatch_config(rule.endpoint.as_deref()),
            })
            .collect()
    };

    for target in &mut targets {
        if args.insecure {
            target.dispatch.insecure_skip_verify = true;
        }
        if let Some(secs) = args.timeout {
            target.dispatch.timeout = Duration::from_secs(secs);
        }
    }

    Ok(targets)
}

fn dispatch_all(
    dispatcher: &Dispatcher<UreqTransport, FanoutSink>,
    targets: &[Target],
    payload: &Payload,
) -> Result<Vec<std::result::Result<DispatchOutcome, DispatchError>>> {
    thread::scope(|scope| {
        let handles: Vec<_> = targets
            .iter()
            .map(|target| scope.spawn(move || dispatcher.dispatch(&target.dispatch, payload)))
            .collect();

        handles
            .into_iter()
            .zip(targets)
            .map(|(handle, target)| {
                handle
                    .join()
                    .map_err(|_| eyre::eyre!("Dispatch worker for '{}' panicked", target.name))
            })
            .collect::<Result<Vec<_>>>()
    })
    .context("Failed to dispatch notifications")
}

fn print_outcome(target: &Target, outcome: &DispatchOutcome) {
    let endpoint = target.dispatch.endpoint.as_deref().unwrap_or_default();
    match outcome {
        DispatchOutcome::Delivered { status, .. } => {
            println!(
                "{} {} → {} {}",
                "✓".green(),
                target.name.bold(),
                endpoint,
                format!("HTTP {}", status).green()
            );
        }
        DispatchOutcome::UnexpectedStatus { status, .. } => {
            println!(
                "{} {} → {} {}",
                "⚠".yellow(),
                target.name.bold(),
                endpoint,
                format!("HTTP {}", status).yellow()
            );
        }
        DispatchOutcome::TransportFailed { error } => {
            println!(
                "{} {} → {} {}",
                "✗".red(),
                target.name.bold(),
                endpoint,
                error.to_string().red()
            );
            return;
        }
    }

    if let Some(error) = outcome.transport_error() {
        println!("    {}", error.to_string().yellow());
    }
}
