//! Batch executor: one batch of ephemeral accounts from generation to the
//! last swap.
//!
//! Generate `batch_size` accounts, persist the batch as `created`, fund every
//! account in one disperse call, persist `funded`, then let each account swap
//! concurrently after a random jitter. The batch becomes `completed` once all
//! swap attempts have been awaited. Individual swap failures are recorded on
//! the account and never fail the batch; anything before the swaps does.

use crate::event_bus::EventBus;
use crate::settings::EngineSettings;
use crate::BumperError;
use bumper_account::AccountService;
use bumper_exchange::ExchangeService;
use bumper_funding::FundingService;
use bumper_storage::StorageService;
use bumper_types::{
	BatchResult, BatchStatus, BumpOrder, BumperEvent, EphemeralAccount, SwapOutcome, WalletBatch,
};
use futures::future::join_all;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const BATCHES_NAMESPACE: &str = "batches";

pub struct BatchExecutor {
	account: Arc<AccountService>,
	funding: Arc<FundingService>,
	exchange: Arc<ExchangeService>,
	storage: Arc<StorageService>,
	event_bus: EventBus,
	settings: Arc<EngineSettings>,
}

impl BatchExecutor {
	pub fn new(
		account: Arc<AccountService>,
		funding: Arc<FundingService>,
		exchange: Arc<ExchangeService>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
		settings: Arc<EngineSettings>,
	) -> Self {
		Self {
			account,
			funding,
			exchange,
			storage,
			event_bus,
			settings,
		}
	}

	#[instrument(skip_all, fields(order_id = %order.id, batch = batch_number))]
	pub async fn run_batch(
		&self,
		order: &BumpOrder,
		batch_number: u32,
	) -> Result<BatchResult, BumperError> {
		let accounts = self.account.generate_accounts(self.settings.batch_size)?;
		let mut batch = WalletBatch::new(order.id.clone(), batch_number, accounts);
		self.persist(&batch).await?;

		let depositor = self.account.signer(&order.deposit_key)?;
		let funding_tx = self
			.funding
			.disperse(
				&*depositor,
				&batch.addresses(),
				self.settings.per_account_funding(),
			)
			.await?;

		batch.status = BatchStatus::Funded;
		batch.funding_tx = Some(funding_tx.clone());
		self.persist(&batch).await?;
		self.event_bus.publish(BumperEvent::BatchFunded {
			order_id: order.id.clone(),
			batch_number,
			tx_hash: funding_tx,
		});

		let outcomes = join_all(
			batch
				.accounts
				.iter()
				.enumerate()
				.map(|(index, account)| self.swap_from(order, account, index)),
		)
		.await;

		for (account, outcome) in batch.accounts.iter_mut().zip(outcomes) {
			self.event_bus.publish(BumperEvent::SwapSettled {
				order_id: order.id.clone(),
				batch_number,
				account: account.address,
				outcome: outcome.clone(),
			});
			account.record(outcome);
		}

		batch.status = BatchStatus::Completed;
		self.persist(&batch).await?;

		let result = batch.report();
		info!(
			succeeded = result.succeeded(),
			failed = result.failed(),
			"Batch completed"
		);
		self.event_bus.publish(BumperEvent::BatchCompleted {
			order_id: order.id.clone(),
			result: result.clone(),
		});

		Ok(result)
	}

	/// One account's swap. Never fails; errors end up in the outcome.
	async fn swap_from(
		&self,
		order: &BumpOrder,
		account: &EphemeralAccount,
		index: usize,
	) -> SwapOutcome {
		let delay = jitter(self.settings.max_jitter);
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}

		let signer = match self.account.signer(&account.key) {
			Ok(signer) => signer,
			Err(e) => {
				warn!(swap = index + 1, account = %account.address, error = %e, "Swap skipped");
				return SwapOutcome::failed(e.to_string());
			}
		};

		match self
			.exchange
			.swap(
				&*signer,
				order.token_address,
				self.settings.bump_amount,
				account.address,
			)
			.await
		{
			Ok(receipt) => {
				info!(
					swap = index + 1,
					protocol = %receipt.protocol,
					tx_hash = %receipt.tx_hash.truncated(),
					"Swap completed"
				);
				SwapOutcome::executed(receipt.protocol, receipt.tx_hash)
			}
			Err(e) => {
				let e = BumperError::SwapFailure(e);
				warn!(swap = index + 1, account = %account.address, error = %e, "Swap failed");
				SwapOutcome::failed(e.to_string())
			}
		}
	}

	async fn persist(&self, batch: &WalletBatch) -> Result<(), BumperError> {
		self.storage
			.store(BATCHES_NAMESPACE, &batch.id(), batch)
			.await
			.map_err(BumperError::from)
	}
}

/// Uniform in `[0, max)` at millisecond resolution.
fn jitter(max: Duration) -> Duration {
	let max = max.as_millis() as u64;
	if max == 0 {
		return Duration::ZERO;
	}
	Duration::from_millis(rand::thread_rng().gen_range(0..max))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_jitter_stays_below_max() {
		let max = Duration::from_millis(50);
		for _ in 0..1000 {
			assert!(jitter(max) < max);
		}
	}

	#[test]
	fn test_zero_jitter_never_sleeps() {
		assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
		// Below one millisecond rounds down to no jitter.
		assert_eq!(jitter(Duration::from_micros(900)), Duration::ZERO);
	}
}
