//! Blockchain RPC boundary.
//!
//! [`DeliveryInterface`] is everything the engine needs from a node: balance
//! reads, read-only calls, and submission of transactions signed by whichever
//! account is spending. [`DeliveryService`] layers "send and await the
//! receipt" on top, turning reverts into errors.

use async_trait::async_trait;
use bumper_account::{AccountError, AccountInterface};
use bumper_types::{
	Address, ConfigSchema, Transaction, TransactionHash, TransactionReceipt, U256,
};
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Transaction reverted: {0}")]
	Reverted(TransactionHash),
	#[error("Signing error: {0}")]
	Signing(#[from] AccountError),
	#[error("Configuration error: {0}")]
	Config(String),
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Native balance of `address` at the latest block.
	async fn get_balance(&self, address: Address) -> Result<U256, DeliveryError>;

	/// Completes, signs with `signer` and broadcasts `tx`.
	async fn submit(
		&self,
		tx: Transaction,
		signer: &dyn AccountInterface,
	) -> Result<TransactionHash, DeliveryError>;

	/// Executes a read-only call and returns the raw return data.
	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError>;

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;
}

pub struct DeliveryService {
	provider: Box<dyn DeliveryInterface>,
	confirmations: u64,
}

impl DeliveryService {
	pub fn new(provider: Box<dyn DeliveryInterface>, confirmations: u64) -> Self {
		Self {
			provider,
			confirmations,
		}
	}

	pub async fn get_balance(&self, address: Address) -> Result<U256, DeliveryError> {
		self.provider.get_balance(address).await
	}

	pub async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		self.provider.call(tx).await
	}

	/// Sends `tx` from `signer` and waits for a successful receipt.
	pub async fn deliver(
		&self,
		tx: Transaction,
		signer: &dyn AccountInterface,
	) -> Result<TransactionReceipt, DeliveryError> {
		let hash = self.provider.submit(tx, signer).await?;
		tracing::debug!(tx_hash = %hash.truncated(), from = %signer.address(), "Submitted transaction");

		let receipt = self
			.provider
			.wait_for_confirmation(&hash, self.confirmations)
			.await?;

		if !receipt.success {
			tracing::warn!(tx_hash = %hash.truncated(), "Transaction reverted");
			return Err(DeliveryError::Reverted(hash));
		}

		Ok(receipt)
	}
}
