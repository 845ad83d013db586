use anyhow::{Context, Result};
use bumper_config::{Config, ConfigLoader};
use bumper_service::{api, builder, cli::Args, cli::Command, events};
use clap::Parser;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long running orders get to record a terminal status on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::new()
		.with_file(&args.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", args.config))?;

	let log_level = args
		.log_level
		.clone()
		.unwrap_or_else(|| config.bumper.log_level.clone());
	setup_tracing(&log_level)?;

	match args.command {
		Some(Command::Start) | None => start_service(config).await,
		Some(Command::Validate) => validate_config(config),
	}
}

async fn start_service(config: Config) -> Result<()> {
	info!("Starting bumper service");
	info!(
		treasury = %config.fees.treasury,
		batch_size = config.batch.batch_size,
		"Configuration loaded"
	);

	let api_config = config.api.clone();
	let manager = builder(config)
		.build()
		.context("Failed to build order manager")?;

	let event_handle = events::spawn_event_logger(manager.event_bus());

	let server_manager = manager.clone();
	let mut http_handle =
		tokio::spawn(async move { api::start_http_server(api_config, server_manager).await });

	info!("Bumper service started");

	tokio::select! {
		_ = setup_shutdown_signal() => {
			info!("Shutdown signal received, stopping running orders...");
		}
		result = &mut http_handle => match result {
			Ok(Ok(())) => warn!("HTTP server stopped, stopping running orders..."),
			Ok(Err(e)) => error!(error = %e, "HTTP server failed, stopping running orders..."),
			Err(e) => error!(error = %e, "HTTP server task panicked, stopping running orders..."),
		},
	}

	manager.shutdown(SHUTDOWN_GRACE).await;
	http_handle.abort();
	event_handle.abort();

	info!("Bumper service stopped");
	Ok(())
}

fn validate_config(config: Config) -> Result<()> {
	info!("Configuration is valid");
	info!("  Treasury: {}", config.fees.treasury);
	info!("  Storage: {}", config.storage.backend);
	info!("  Key custody: {}", config.account.custody);
	info!("  Delivery: {}", config.delivery.provider);
	info!(
		"  Exchange: {} (fallback: {})",
		config.exchange.primary,
		config.exchange.fallback.as_deref().unwrap_or("none")
	);
	info!("  Funding: {}", config.funding.implementation);

	// Plugin tables are only checked by their factories.
	builder(config)
		.build()
		.context("Plugin configuration is invalid")?;
	info!("Plugin configuration is valid");
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!(error = %e, "Failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				error!(error = %e, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
