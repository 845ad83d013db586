//! Batch funding: one transaction that pays every account in a batch.

use bumper_account::AccountInterface;
use bumper_delivery::{DeliveryError, DeliveryService};
use bumper_types::{Address, ConfigSchema, Transaction, TransactionHash, U256};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod disperse;
}

#[derive(Debug, Error)]
pub enum FundingError {
	#[error("Invalid configuration: {0}")]
	Config(String),
	#[error("Nothing to fund")]
	EmptyBatch,
	#[error("Funding transaction failed: {0}")]
	Delivery(#[from] DeliveryError),
}

pub trait FundingInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Builds a single transaction paying `amounts[i]` to `recipients[i]`.
	/// The attached value equals the sum of all amounts.
	fn build_disperse(
		&self,
		recipients: &[Address],
		amounts: &[U256],
	) -> Result<Transaction, FundingError>;
}

pub struct FundingService {
	funder: Box<dyn FundingInterface>,
	delivery: Arc<DeliveryService>,
}

impl FundingService {
	pub fn new(funder: Box<dyn FundingInterface>, delivery: Arc<DeliveryService>) -> Self {
		Self { funder, delivery }
	}

	/// Pays `per_account` to each recipient from `signer` and waits for the
	/// funding transaction to confirm.
	pub async fn disperse(
		&self,
		signer: &dyn AccountInterface,
		recipients: &[Address],
		per_account: U256,
	) -> Result<TransactionHash, FundingError> {
		if recipients.is_empty() {
			return Err(FundingError::EmptyBatch);
		}

		let amounts = vec![per_account; recipients.len()];
		let tx = self.funder.build_disperse(recipients, &amounts)?;
		let receipt = self.delivery.deliver(tx, signer).await?;

		tracing::info!(
			tx_hash = %receipt.hash.truncated(),
			recipients = recipients.len(),
			"Funded batch"
		);
		Ok(receipt.hash)
	}
}
