//! `poolcare fetch`: one cycle, raw flattened snapshot.

use serde_json::Value;
use tabled::Tabled;

use poolcare_core::{PollingCoordinator, PoolConfig, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub async fn handle(config: PoolConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = PollingCoordinator::oneshot(config).await?;
    if snapshot.is_empty() && !global.quiet {
        eprintln!("No measurements returned by the service.");
    }

    let out = render(&snapshot, global)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub(crate) fn render(snapshot: &Snapshot, global: &GlobalOpts) -> Result<String, CliError> {
    let entries: Vec<(&String, &Value)> = snapshot.values().iter().collect();
    output::render_single(
        global.output,
        snapshot.values(),
        |_| {
            let rows: Vec<SnapshotRow> = entries
                .iter()
                .map(|(key, value)| SnapshotRow {
                    key: (*key).clone(),
                    value: output::display_value(value),
                })
                .collect();
            output::render_table(&rows)
        },
        |_| {
            entries
                .iter()
                .map(|(key, value)| format!("{key}={}", output::display_value(value)))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}
