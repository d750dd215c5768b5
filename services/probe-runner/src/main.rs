use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use wp_bridge_http::HttpBridge;
use wp_driver::{ProbeConfig, RunOutcome, TokioDelay, VerifyDriver};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ProbeConfig::from_env();
    info!(
        "starting verification run, iteration cap {}",
        config.max_iterations
    );

    let bridge = Arc::new(HttpBridge::new(None));
    let mut driver = VerifyDriver::new(bridge, Arc::new(TokioDelay), config);

    match driver.run().await? {
        RunOutcome::Completed { iterations } => {
            info!("verification completed after {iterations} iterations");
            Ok(())
        }
        RunOutcome::Failed { step, failure } => {
            error!("verification failed at {}: {failure}", step.name());
            std::process::exit(1);
        }
    }
}
