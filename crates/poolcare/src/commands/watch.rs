//! `poolcare watch`: poll on the configured interval until Ctrl-C.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use poolcare_core::{CycleOutcome, PollingCoordinator, PoolConfig, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::commands::fetch;
use crate::error::CliError;
use crate::output;

/// One line of `--output json` watch output.
#[derive(Serialize)]
struct WatchUpdate<'a> {
    completed_at: DateTime<Utc>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    new_sensors: Vec<&'a str>,
    values: &'a BTreeMap<String, Value>,
}

pub async fn handle(config: PoolConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let hours = config.poll_interval.as_secs() / 3600;
    let coordinator = PollingCoordinator::new(config)?;

    // Outcome and snapshot are read on the cycle task, one message per cycle.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let source = coordinator.clone();
    let listener = coordinator.subscribe(move || {
        if let Some(outcome) = source.last_outcome() {
            let _ = tx.send((outcome, source.current_snapshot()));
        }
    });

    if !global.quiet {
        eprintln!("Polling every {hours}h, press Ctrl-C to stop.");
    }
    coordinator.start();

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, stopping");
                break;
            }
            msg = rx.recv() => {
                let Some((outcome, snapshot)) = msg else {
                    break;
                };
                print_update(&outcome, &snapshot, global)?;
            }
        }
    }

    // The listener holds a coordinator handle.
    listener.unsubscribe();
    coordinator.shutdown().await;
    Ok(())
}

fn print_update(
    outcome: &CycleOutcome,
    snapshot: &Snapshot,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if global.output == OutputFormat::Json {
        let update = WatchUpdate {
            completed_at: outcome.completed_at(),
            ok: outcome.is_success(),
            error: outcome.error().map(ToString::to_string),
            new_sensors: added(outcome),
            values: snapshot.values(),
        };
        output::print_output(&output::render_json_compact(&update)?, false);
        return Ok(());
    }

    let color = output::should_color(global.color);
    let stamp = outcome.completed_at().format("%Y-%m-%d %H:%M:%S");
    match outcome {
        CycleOutcome::Success { sensors, .. } => {
            if !global.quiet {
                eprintln!(
                    "{} {stamp} {} sensor(s)",
                    output::status_marker(true, color),
                    sensors
                );
                let new = added(outcome);
                if !new.is_empty() {
                    eprintln!("New sensors: {}", new.join(", "));
                }
            }
            output::print_output(&fetch::render(snapshot, global)?, global.quiet);
        }
        CycleOutcome::Failure { reason, .. } => {
            // Failures are always reported; the last good data stays in place.
            eprintln!("{} {stamp} {reason}", output::status_marker(false, color));
        }
    }
    Ok(())
}

fn added(outcome: &CycleOutcome) -> Vec<&str> {
    match outcome {
        CycleOutcome::Success { added, .. } => added.iter().map(String::as_str).collect(),
        CycleOutcome::Failure { .. } => Vec::new(),
    }
}
