//! Fleet API server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use fleet_api::auth::StaticCredentialVerifier;
use fleet_api::config::{self, FleetConfig};
use fleet_api::lifecycle::{shutdown_signal, Shutdown};
use fleet_api::observability::{logging, metrics};
use fleet_api::{AppState, HttpServer};

#[derive(Parser)]
#[command(name = "fleet-api", about = "Fleet dashboard API core")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "fleet-api.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        config::load_config(&args.config)?
    } else {
        // Secrets still have to come from somewhere; validation rejects
        // an empty environment.
        let mut config = FleetConfig::default();
        config::loader::apply_env_overrides(&mut config);
        config::validation::validate_config(&config)
            .map_err(|errors| config::ConfigError::Validation(errors))?;
        config
    };

    logging::init(&config.observability.log_level);
    tracing::info!(
        bind_address = %config.server.bind_address,
        environment = ?config.environment,
        broker_configured = config.broker.url.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    // The fleet user store is an external collaborator; until it is
    // wired in, the binary runs with an empty credential directory.
    let credentials = Arc::new(StaticCredentialVerifier::new());

    let bind_address = config.server.bind_address.clone();
    let state = AppState::build(config, credentials, &shutdown).await;

    let listener = TcpListener::bind(&bind_address).await?;
    let server = HttpServer::new(state);

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
