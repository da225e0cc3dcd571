use std::sync::Arc;
use std::time::Duration;

use privacy_scheduler::{
    config::Config,
    logger::init_tracing,
    runtime::ResourceManager,
    runtime::clock::{Clock, RealClock, SimClock},
};

fn build_clock(is_simulated: bool) -> Arc<dyn Clock> {
    if is_simulated {
        Arc::new(SimClock::new())
    } else {
        Arc::new(RealClock::new(Duration::from_millis(50)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("starting privacy-budget scheduler");

    let config = Config::from_args();
    config.validate()?;

    let simulated_clock = std::env::var("SCHEDULER_SIMULATED_CLOCK")
        .map(|v| v != "0")
        .unwrap_or(true);
    let clock = build_clock(simulated_clock);

    let manager = ResourceManager::new(config, clock);
    let report = manager.run().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
