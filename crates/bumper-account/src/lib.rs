//! Key custody and signing for deposit and ephemeral accounts.
//!
//! Storage only ever sees [`KeyMaterial`]; anything that needs to sign asks
//! a [`KeyCustody`] for an [`AccountInterface`] and signs through it.

use async_trait::async_trait;
use bumper_types::{
	Address, ConfigSchema, EphemeralAccount, KeyMaterial, SignedTransaction, Transaction,
};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Invalid configuration: {0}")]
	Config(String),
}

/// Signing capability of a single account.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn address(&self) -> Address;

	/// Signs a fully populated transaction (nonce, gas price and gas limit set).
	async fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError>;
}

/// Issues new keys and hands out signers for keys already in custody.
pub trait KeyCustody: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	fn generate(&self) -> Result<(Address, KeyMaterial), AccountError>;

	fn signer(&self, key: &KeyMaterial) -> Result<Arc<dyn AccountInterface>, AccountError>;
}

pub struct AccountService {
	custody: Box<dyn KeyCustody>,
}

impl AccountService {
	pub fn new(custody: Box<dyn KeyCustody>) -> Self {
		Self { custody }
	}

	/// Creates the deposit account of a new order.
	pub fn new_deposit_account(&self) -> Result<(Address, KeyMaterial), AccountError> {
		self.custody.generate()
	}

	/// Generates `count` fresh ephemeral accounts for one batch.
	pub fn generate_accounts(&self, count: usize) -> Result<Vec<EphemeralAccount>, AccountError> {
		(0..count)
			.map(|_| {
				let (address, key) = self.custody.generate()?;
				Ok(EphemeralAccount::new(address, key))
			})
			.collect()
	}

	pub fn signer(&self, key: &KeyMaterial) -> Result<Arc<dyn AccountInterface>, AccountError> {
		self.custody.signer(key)
	}
}
