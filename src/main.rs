//! Navigator Bridge replay tool
//!
//! Runs a JSON scenario through an in-process host and its frames and
//! prints every event the host reports, one JSON object per line.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use navigator_bridge::replay::{load_scenario, Replay};
use navigator_bridge::BridgeConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let env_config = BridgeConfig::from_env();

    // Initialize tracing; stdout is reserved for events
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: navigator-bridge <scenario.json>");
    };

    let mut scenario = load_scenario(&path)
        .await
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;
    let config = scenario.config.take().unwrap_or(env_config);

    tracing::info!(
        "Replaying {} ({} pages, {} steps)",
        path.display(),
        scenario.pages.len(),
        scenario.steps.len()
    );

    let events = Replay::run(scenario, config).context("Replay failed")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in &events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }

    tracing::info!("Reported {} events", events.len());
    Ok(())
}
