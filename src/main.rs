use std::sync::Arc;

use tracing::{info, warn};

use tradesetup::config::AppConfig;
use tradesetup::day::TradeDay;
use tradesetup::transport::ApiClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup Logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    dotenvy::dotenv().ok();

    info!("Starting TradeSetup client...");

    let mut config = AppConfig::load()?;
    if let Ok(base_url) = std::env::var("TRADESETUP_BASE_URL") {
        info!("Using base URL override from environment: {}", base_url);
        config.service.base_url = base_url;
    }
    info!("Loaded configuration: {:?}", config);

    let client = Arc::new(ApiClient::new(&config.service)?);

    let trade_date = chrono::Local::now().date_naive();
    let day = TradeDay::new(client, trade_date);

    info!("Initializing trade day {}", trade_date);
    let degraded = day.refresh().await;
    for (stage, err) in &degraded {
        warn!("{} degraded to manual input: {}", stage, err);
    }

    let gates = day.gates();
    info!(
        "Gate state: stage1={} stage2={} stage3={} stage4={}",
        gates.can_access_stage1,
        gates.can_access_stage2,
        gates.can_access_stage3,
        gates.can_access_stage4
    );
    info!(
        "Stage modes: stage1={:?} stage2={:?} stage3(candidates)={:?} stage4={:?}",
        day.context.mode(),
        day.open_behavior.mode(),
        day.execution.candidates_mode(),
        day.construction.mode()
    );

    if let Some(snapshot) = day.context.snapshot() {
        info!(
            "Stage-1 snapshot: frozen={} mode={:?}",
            snapshot.is_frozen(),
            snapshot.mode()
        );
    }

    Ok(())
}
