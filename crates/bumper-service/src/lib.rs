//! Bumper service: HTTP API, command-line interface and plugin wiring.
//!
//! - `api`: routes over the order manager
//! - `cli`: command-line arguments
//! - `events`: logs engine events as they are published

use bumper_account::implementations::local::create_custody;
use bumper_config::Config;
use bumper_core::BumperBuilder;
use bumper_delivery::implementations::evm::alloy::create_http_delivery;
use bumper_exchange::implementations::{
	uniswap_v2::create_uniswap_v2, uniswap_v3::create_uniswap_v3,
};
use bumper_funding::implementations::disperse::create_disperse_funding;
use bumper_storage::implementations::{file::create_file_storage, memory::create_memory_storage};

pub mod api;
pub mod cli;
pub mod events;

/// Builder with every implementation this binary ships registered under the
/// name used to select it in config.
pub fn builder(config: Config) -> BumperBuilder {
	BumperBuilder::new(config)
		.with_storage_factory("file", create_file_storage)
		.with_storage_factory("memory", create_memory_storage)
		.with_custody_factory("local", create_custody)
		.with_delivery_factory("http", create_http_delivery)
		.with_exchange_factory("uniswap-v3", create_uniswap_v3)
		.with_exchange_factory("uniswap-v2", create_uniswap_v2)
		.with_funding_factory("disperse", create_disperse_funding)
}
