use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use gold_signal_engine::config::EngineConfig;
use gold_signal_engine::engine::Engine;
use gold_signal_engine::models::MarketData;
use gold_signal_engine::notify::{LogNotifier, Notifier};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = EngineConfig::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: gold-signal <snapshot.json>")?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading snapshot {path}"))?;
    let data: MarketData =
        serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {path}"))?;
    info!(
        "Loaded snapshot: m5={} m15={} h1={} h4={}",
        data.m5.len(),
        data.m15.len(),
        data.h1.len(),
        data.h4.len()
    );

    let symbol = cfg.symbol.clone();
    let engine = Engine::new(cfg);
    let signal = engine.evaluate(&data).context("evaluating snapshot")?;

    if signal.is_trade() {
        LogNotifier.notify(&symbol, &signal).await?;
    }
    println!("{}", serde_json::to_string_pretty(&signal)?);

    Ok(())
}
