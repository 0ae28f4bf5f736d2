//! One monitoring pass from the command line, for cron jobs and local checks.
//!
//! Usage: `run_once [--print-changes]`
//! Always exits 0; failures are logged.

use changelog_monitor::config::MonitorSettings;
use changelog_monitor::run_state::Trigger;
use changelog_monitor::{build_monitor, telemetry};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let print_changes = std::env::args().skip(1).any(|a| a == "--print-changes");

    if let Err(e) = run(print_changes).await {
        tracing::error!(error = %format!("{e:#}"), "run_once failed");
    }
}

async fn run(print_changes: bool) -> anyhow::Result<()> {
    let settings = MonitorSettings::from_env();
    let monitor = build_monitor(&settings)?;

    let report = monitor.trigger(Trigger::Manual).await?;
    if let Some(summary) = &report.summary {
        println!("{}", summary.text);
    }
    if print_changes {
        println!("{}", serde_json::to_string_pretty(&report.changes)?);
    }
    tracing::info!(
        checked = report.checked,
        changed_sources = report.changes.len(),
        skipped = report.skipped.len(),
        "run_once done"
    );
    Ok(())
}
