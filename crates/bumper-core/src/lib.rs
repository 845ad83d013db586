//! Order lifecycle and batch execution engine.
//!
//! [`BumperBuilder`] turns a [`Config`] into a ready [`OrderManager`] by
//! looking up each configured plugin (storage, key custody, delivery,
//! exchanges, funding) in the factories registered by the binary.

use bumper_account::{AccountError, AccountService, KeyCustody};
use bumper_config::Config;
use bumper_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use bumper_exchange::{ExchangeError, ExchangeInterface, ExchangeService};
use bumper_funding::{FundingError, FundingInterface, FundingService};
use bumper_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub mod batch;
pub mod engine;
pub mod error;
pub mod event_bus;
pub mod lease;
pub mod plan;
pub mod settings;

#[cfg(test)]
mod testing;

pub use batch::BatchExecutor;
pub use engine::{OrderManager, DEFAULT_LIST_LIMIT};
pub use error::BumperError;
pub use event_bus::EventBus;
pub use settings::EngineSettings;

type Factory<T, E> = Box<dyn Fn(&toml::Value) -> Result<Box<T>, E> + Send>;

pub struct BumperBuilder {
	config: Config,
	storage_factories: HashMap<String, Factory<dyn StorageInterface, StorageError>>,
	custody_factories: HashMap<String, Factory<dyn KeyCustody, AccountError>>,
	delivery_factories: HashMap<String, Factory<dyn DeliveryInterface, DeliveryError>>,
	exchange_factories: HashMap<String, Factory<dyn ExchangeInterface, ExchangeError>>,
	funding_factories: HashMap<String, Factory<dyn FundingInterface, FundingError>>,
	event_capacity: usize,
}

impl BumperBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			custody_factories: HashMap::new(),
			delivery_factories: HashMap::new(),
			exchange_factories: HashMap::new(),
			funding_factories: HashMap::new(),
			event_capacity: 1000,
		}
	}

	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send + 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_custody_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn KeyCustody>, AccountError> + Send + 'static,
	{
		self.custody_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_delivery_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> + Send + 'static,
	{
		self.delivery_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_exchange_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn ExchangeInterface>, ExchangeError> + Send + 'static,
	{
		self.exchange_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_funding_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn FundingInterface>, FundingError> + Send + 'static,
	{
		self.funding_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	pub fn build(self) -> Result<OrderManager, BumperError> {
		let config = &self.config;

		let storage_backend = create(
			"storage",
			&self.storage_factories,
			&config.storage.backend,
			&config.storage.config,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let custody = create(
			"account",
			&self.custody_factories,
			&config.account.custody,
			&config.account.config,
		)?;
		let account = Arc::new(AccountService::new(custody));

		let provider = create(
			"delivery",
			&self.delivery_factories,
			&config.delivery.provider,
			&config.delivery.config,
		)?;
		let delivery = Arc::new(DeliveryService::new(
			provider,
			config.delivery.confirmations,
		));

		let primary = create(
			"exchange",
			&self.exchange_factories,
			&config.exchange.primary,
			exchange_table(config, &config.exchange.primary)?,
		)?;
		let fallback = match &config.exchange.fallback {
			Some(name) => Some(create(
				"exchange",
				&self.exchange_factories,
				name,
				exchange_table(config, name)?,
			)?),
			None => None,
		};
		let exchange = Arc::new(ExchangeService::new(
			primary,
			fallback,
			delivery.clone(),
			Duration::from_secs(config.exchange.deadline_secs),
		));

		let funder = create(
			"funding",
			&self.funding_factories,
			&config.funding.implementation,
			&config.funding.config,
		)?;
		let funding = Arc::new(FundingService::new(funder, delivery.clone()));

		let event_bus = EventBus::new(self.event_capacity);
		let settings = Arc::new(EngineSettings::from_config(config));

		let executor = Arc::new(BatchExecutor::new(
			account.clone(),
			funding,
			exchange.clone(),
			storage.clone(),
			event_bus.clone(),
			settings.clone(),
		));

		Ok(OrderManager::new(
			storage, delivery, account, exchange, executor, event_bus, settings,
		))
	}
}

fn exchange_table<'a>(config: &'a Config, name: &str) -> Result<&'a toml::Value, BumperError> {
	config.exchange.implementations.get(name).ok_or_else(|| {
		BumperError::Configuration(format!("No configuration for exchange '{}'", name))
	})
}

/// Looks up `name` among `factories` and runs it on `config`.
fn create<T: ?Sized, E: std::fmt::Display>(
	kind: &str,
	factories: &HashMap<String, Factory<T, E>>,
	name: &str,
	config: &toml::Value,
) -> Result<Box<T>, BumperError> {
	let factory = factories.get(name).ok_or_else(|| {
		BumperError::Configuration(format!("Unknown {} implementation '{}'", kind, name))
	})?;
	factory(config)
		.map_err(|e| BumperError::Configuration(format!("{} '{}': {}", kind, name, e)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use bumper_account::implementations::local::create_custody;
	use bumper_config::ConfigLoader;
	use bumper_delivery::implementations::evm::alloy::create_http_delivery;
	use bumper_exchange::implementations::{
		uniswap_v2::create_uniswap_v2, uniswap_v3::create_uniswap_v3,
	};
	use bumper_funding::implementations::disperse::create_disperse_funding;
	use bumper_storage::implementations::memory::create_memory_storage;

	const CONFIG: &str = r#"
[fees]
treasury = "0x1111111111111111111111111111111111111111"

[batch]
bump_amount = "0.02"

[storage]
backend = "memory"

[delivery]
provider = "http"
[delivery.config]
rpc_url = "http://localhost:8545"
chain_id = 31337

[exchange]
primary = "uniswap-v3"
fallback = "uniswap-v2"

[exchange.implementations.uniswap-v3]
router = "0xE592427A0AEce92De3Edee1F18E0157C05861564"
weth = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

[exchange.implementations.uniswap-v2]
router = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"
weth = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

[funding]
implementation = "disperse"
[funding.config]
contract = "0xD152f549545093347A162Dce210e7293f1452150"
"#;

	fn builder() -> BumperBuilder {
		let config = ConfigLoader::new()
			.with_env_prefix("BUMPER_CORE_TEST_UNSET_")
			.load_from_str(CONFIG)
			.unwrap();
		BumperBuilder::new(config)
			.with_storage_factory("memory", create_memory_storage)
			.with_custody_factory("local", create_custody)
			.with_delivery_factory("http", create_http_delivery)
			.with_exchange_factory("uniswap-v3", create_uniswap_v3)
			.with_exchange_factory("uniswap-v2", create_uniswap_v2)
			.with_funding_factory("disperse", create_disperse_funding)
	}

	#[test]
	fn test_build_wires_configured_plugins() {
		let manager = builder().build().unwrap();
		assert_eq!(manager.settings().batch_size, 5);
		assert_eq!(manager.settings().inter_batch_delay, Duration::from_secs(10));
	}

	#[test]
	fn test_build_rejects_unregistered_implementation() {
		let mut builder = builder();
		builder.storage_factories.clear();
		assert!(matches!(
			builder.build(),
			Err(BumperError::Configuration(msg)) if msg.contains("storage")
		));
	}
}
