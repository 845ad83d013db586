//! Configuration sections.
//!
//! Pluggable components (storage, custody, delivery, exchanges, funding) are
//! selected by name and carry an opaque `toml::Value` table that the chosen
//! implementation validates against its own schema.

use crate::serde_helpers::ether;
use alloy::primitives::utils::parse_ether;
use bumper_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	#[serde(default)]
	pub bumper: BumperSettings,
	#[serde(default)]
	pub api: ApiConfig,
	pub fees: FeeConfig,
	pub batch: BatchConfig,
	pub storage: StorageConfig,
	#[serde(default)]
	pub account: AccountConfig,
	pub delivery: DeliveryConfig,
	pub exchange: ExchangeConfig,
	pub funding: FundingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BumperSettings {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

impl Default for BumperSettings {
	fn default() -> Self {
		Self {
			log_level: default_log_level(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
		}
	}
}

/// Treasury fee taken once from every deposit.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeeConfig {
	pub treasury: Address,
	#[serde(with = "ether", default = "default_treasury_fee")]
	pub treasury_fee: U256,
	/// Deposits below this are rejected when an order is started.
	#[serde(with = "ether", default = "default_min_balance")]
	pub min_balance: U256,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
	/// Native amount each ephemeral account swaps.
	#[serde(with = "ether")]
	pub bump_amount: U256,
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	/// Extra native amount per account to pay for its swap gas.
	#[serde(with = "ether", default = "default_gas_buffer")]
	pub gas_buffer: U256,
	#[serde(default = "default_inter_batch_delay")]
	pub inter_batch_delay_secs: u64,
	/// Upper bound of the random delay before each swap; 0 disables jitter.
	#[serde(default = "default_max_jitter")]
	pub max_jitter_ms: u64,
	/// Stops a running order after this long; unlimited when absent.
	#[serde(default)]
	pub order_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	pub backend: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	#[serde(default = "default_custody")]
	pub custody: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

impl Default for AccountConfig {
	fn default() -> Self {
		Self {
			custody: default_custody(),
			config: empty_table(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	pub provider: String,
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
	pub primary: String,
	#[serde(default)]
	pub fallback: Option<String>,
	#[serde(default = "default_deadline")]
	pub deadline_secs: u64,
	/// Protocol name -> protocol table.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FundingConfig {
	pub implementation: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_host() -> String {
	"0.0.0.0".to_string()
}

fn default_port() -> u16 {
	3000
}

fn default_treasury_fee() -> U256 {
	parse_ether("0.009").unwrap_or_default()
}

fn default_min_balance() -> U256 {
	parse_ether("0.01").unwrap_or_default()
}

fn default_batch_size() -> usize {
	5
}

fn default_gas_buffer() -> U256 {
	parse_ether("0.0001").unwrap_or_default()
}

fn default_inter_batch_delay() -> u64 {
	10
}

fn default_max_jitter() -> u64 {
	5000
}

fn default_custody() -> String {
	"local".to_string()
}

fn default_confirmations() -> u64 {
	1
}

fn default_deadline() -> u64 {
	20 * 60
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}
