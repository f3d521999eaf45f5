use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sentinel_datetime::{
    Composer, Config, DatetimeModule, HttpSunriseClient, Publisher, RumqttcClient, Scheduler,
    SystemClock,
};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(version, about = "Date/time virtual device for the sentinel hub")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "sentinel-datetime.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    init_logging(&config);

    tracing::info!("sentinel-datetime starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let tz = config.timezone()?;
    match &config.location {
        Some(location) => tracing::info!(
            "Timer {} in {} at {}, {}",
            config.device.id,
            tz.name(),
            location.latitude,
            location.longitude
        ),
        None => tracing::info!(
            "Timer {} in {} (no location, sunrise/sunset disabled)",
            config.device.id,
            tz.name()
        ),
    }

    let sunrise = HttpSunriseClient::new(&config.sunrise).context("building HTTP client")?;
    let composer = Composer::new(
        Arc::new(SystemClock),
        tz,
        config.device.profile,
        config.location,
        sunrise,
    );
    let publisher = Publisher::new(RumqttcClient::new(&config.pubsub));
    let module = Arc::new(DatetimeModule::new(
        config.device.id.clone(),
        composer,
        publisher,
    ));

    let connection_lost = module.connect().await.with_context(|| {
        format!(
            "connecting to broker {}:{}",
            config.pubsub.host, config.pubsub.port
        )
    })?;
    module.bootstrap().await.context("bootstrapping timer device")?;

    let poller = tokio::spawn(Scheduler::new(&config.polling).run(module.clone()));

    #[cfg(feature = "http_api")]
    let api_shutdown = match config.api.clone() {
        Some(api_config) => {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let api_module: Arc<dyn sentinel_datetime::DeviceModule> = module.clone();
            tokio::spawn(async move {
                if let Err(e) =
                    sentinel_datetime::api::serve(api_config.listen, api_config.port, api_module, rx)
                        .await
                {
                    tracing::error!("HTTP API server error: {}", e);
                }
            });
            Some(tx)
        }
        None => None,
    };

    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        reason = connection_lost => {
            let reason = reason.unwrap_or_else(|_| "connection task ended".to_string());
            tracing::error!("Lost connection to broker: {}", reason);
            std::process::exit(1);
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("Received shutdown signal"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
        }
    }

    poller.abort();

    match module.remove_device(module.device_id()).await {
        Ok(true) => tracing::info!("Timer device {} removed", module.device_id()),
        Ok(false) => {}
        Err(e) => tracing::error!("Failed to remove timer device: {}", e),
    }

    #[cfg(feature = "http_api")]
    if let Some(tx) = api_shutdown {
        let _ = tx.send(());
    }

    tracing::info!("sentinel-datetime shutdown complete");

    Ok(())
}

fn init_logging(config: &Config) {
    let targets = config.logging.overrides.iter().fold(
        Targets::new().with_default(LevelFilter::from(config.logging.level)),
        |targets, (target, level)| targets.with_target(target.clone(), LevelFilter::from(*level)),
    );

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(targets)
        .init();
}
