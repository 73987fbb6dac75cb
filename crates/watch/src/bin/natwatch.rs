//! natwatch — one pass of the NAT table change watcher.
//!
//! Meant to be started by a timer or cron job. Captures the NAT rules,
//! reports changes since the previous pass and exits. Configuration comes
//! from the environment (optionally via a `.env` file):
//! - `NATWATCH_SOURCE_COMMAND` — rule dump command (default `iptables-save -t nat`)
//! - `NATWATCH_STATE_FILE` — snapshot location
//! - `NATWATCH_WEBHOOK_URL` — notification endpoint; unset means log only

use clap::Parser;
use tracing::{info, warn};

use natwatch::{Pipeline, RunState};
use natwatch_core::config::{load_dotenv, Config};

// ── CLI ─────────────────────────────────────────────────────────────

/// NAT table change watcher.
#[derive(Parser, Debug)]
#[command(name = "natwatch", version, about)]
struct Cli {
    /// Config profile; keys are read as `{PROFILE}_{KEY}` before `{KEY}`.
    #[arg(long, env = "NATWATCH_PROFILE", default_value = "")]
    profile: String,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::for_profile(&cli.profile);
    config.log_summary();
    if let Err(e) = config.validate() {
        warn!(error = %e, "configuration problem, the run will likely fail");
    }

    let pipeline = Pipeline::from_config(&config);
    let report = pipeline.run().await;

    match report.final_state {
        RunState::Aborted => warn!("run aborted: NAT rules could not be captured"),
        _ => info!(
            changed = report.changed(),
            notified = report.notification.as_ref().is_some_and(|n| n.success),
            persisted = report.persisted,
            "run complete"
        ),
    }

    Ok(())
}
