//! Configuration validation utility
//!
//! Usage: cargo run --bin validate-config config/local.toml

use std::env;
use std::process;

use bumper_config::ConfigLoader;

#[tokio::main]
async fn main() {
	let args: Vec<String> = env::args().collect();

	if args.len() != 2 {
		eprintln!("Usage: {} <config-file>", args[0]);
		process::exit(1);
	}

	let config_path = &args[1];

	println!("Validating configuration file: {}", config_path);

	match ConfigLoader::new().with_file(config_path).load().await {
		Ok(config) => {
			println!("Configuration is valid");
			println!("API: {}:{}", config.api.host, config.api.port);
			println!("Treasury: {}", config.fees.treasury);
			println!("Batch size: {}", config.batch.batch_size);
			println!("Storage backend: {}", config.storage.backend);
			println!("Delivery provider: {}", config.delivery.provider);
			println!(
				"Exchanges: {} (fallback: {})",
				config.exchange.primary,
				config.exchange.fallback.as_deref().unwrap_or("none")
			);
			println!("Funding: {}", config.funding.implementation);
		}
		Err(e) => {
			eprintln!("Configuration validation failed:");
			eprintln!("{}", e);
			process::exit(1);
		}
	}
}
