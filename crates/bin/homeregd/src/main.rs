//! `homeregd` entry point: load configuration, start logging, assemble the
//! hub and run until interrupted.

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use homeregd::config::Config;
use homeregd::hub::Hub;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let hub = Hub::build(&config)?;

    // Registry events are only logged for now.
    let mut events = hub.event_bus().subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::info!(topic = %event.topic, event_id = %event.id, "registry event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event log lagging behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tracing::info!("homeregd running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    hub.shutdown();
    event_log.abort();
    Ok(())
}
