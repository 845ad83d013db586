use crate::{Config, ConfigError};
use alloy::primitives::utils::parse_ether;
use regex::Regex;
use std::env;
use std::path::Path;
use tracing::debug;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "BUMPER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		let content = tokio::fs::read_to_string(file_path).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				ConfigError::FileNotFound(file_path.clone())
			} else {
				ConfigError::IoError(e)
			}
		})?;

		self.load_from_str(&content)
	}

	/// Substitutes, parses, overrides and validates `content`.
	pub fn load_from_str(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content)?;
		let mut config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn env(&self, name: &str) -> Option<String> {
		env::var(format!("{}{}", self.env_prefix, name)).ok()
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Some(log_level) = self.env("LOG_LEVEL") {
			config.bumper.log_level = log_level;
		}

		if let Some(host) = self.env("API_HOST") {
			config.api.host = host;
		}

		if let Some(port) = self.env("API_PORT") {
			config.api.port = port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid API port: {}", e)))?;
		}

		if let Some(treasury) = self.env("TREASURY_ADDRESS") {
			config.fees.treasury = treasury.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid treasury address: {}", e))
			})?;
		}

		if let Some(amount) = self.env("BUMP_AMOUNT") {
			config.batch.bump_amount = parse_ether(&amount)
				.map_err(|e| ConfigError::ValidationError(format!("Invalid bump amount: {}", e)))?;
		}

		if let Some(rpc_url) = self.env("RPC_URL") {
			debug!("Overriding RPC URL from environment");
			if let Some(table) = config.delivery.config.as_table_mut() {
				table.insert("rpc_url".to_string(), toml::Value::String(rpc_url));
			}
		}

		Ok(())
	}
}

/// Replaces every `${VAR_NAME}` with the value of that environment variable.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut result = content.to_string();
	for cap in re.captures_iter(content) {
		let var_name = &cap[1];
		let value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
		result = result.replace(&cap[0], &value);
	}

	Ok(result)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

	if config.batch.batch_size == 0 {
		return invalid("batch.batch_size must be at least 1");
	}

	if config.batch.bump_amount.is_zero() {
		return invalid("batch.bump_amount must be greater than zero");
	}

	if config.fees.treasury_fee >= config.fees.min_balance {
		return invalid("fees.treasury_fee must be below fees.min_balance");
	}

	if config.batch.order_timeout_secs == Some(0) {
		return invalid("batch.order_timeout_secs must be positive when set");
	}

	let exchange = &config.exchange;
	if !exchange.implementations.contains_key(&exchange.primary) {
		return Err(ConfigError::ValidationError(format!(
			"Primary exchange '{}' has no [exchange.implementations] entry",
			exchange.primary
		)));
	}

	if let Some(fallback) = &exchange.fallback {
		if fallback == &exchange.primary {
			return invalid("exchange.fallback must differ from exchange.primary");
		}
		if !exchange.implementations.contains_key(fallback) {
			return Err(ConfigError::ValidationError(format!(
				"Fallback exchange '{}' has no [exchange.implementations] entry",
				fallback
			)));
		}
	}

	Ok(())
}
