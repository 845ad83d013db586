//! Runtime parameters of the order engine, resolved from configuration.

use bumper_config::Config;
use bumper_types::{Address, U256};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineSettings {
	pub treasury: Address,
	pub treasury_fee: U256,
	pub min_balance: U256,
	pub bump_amount: U256,
	pub batch_size: usize,
	pub gas_buffer: U256,
	pub inter_batch_delay: Duration,
	/// Exclusive upper bound of the per-swap jitter.
	pub max_jitter: Duration,
	pub order_timeout: Option<Duration>,
}

impl EngineSettings {
	pub fn from_config(config: &Config) -> Self {
		Self {
			treasury: config.fees.treasury,
			treasury_fee: config.fees.treasury_fee,
			min_balance: config.fees.min_balance,
			bump_amount: config.batch.bump_amount,
			batch_size: config.batch.batch_size,
			gas_buffer: config.batch.gas_buffer,
			inter_batch_delay: Duration::from_secs(config.batch.inter_batch_delay_secs),
			max_jitter: Duration::from_millis(config.batch.max_jitter_ms),
			order_timeout: config.batch.order_timeout_secs.map(Duration::from_secs),
		}
	}

	/// Amount sent to each ephemeral account: the swap input plus its gas.
	pub fn per_account_funding(&self) -> U256 {
		self.bump_amount.saturating_add(self.gas_buffer)
	}

	/// Deposit balance needed before another batch may start.
	pub fn batch_requirement(&self) -> U256 {
		self.per_account_funding()
			.saturating_mul(U256::from(self.batch_size))
	}
}
