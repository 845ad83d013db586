//! Local private key custody backed by Alloy's signer.

use crate::{AccountError, AccountInterface, KeyCustody};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSigner;
use alloy::primitives::{Bytes, TxKind};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use bumper_types::{
	Address, ConfigSchema, KeyMaterial, Schema, SignedTransaction, Transaction, ValidationError,
};
use std::sync::Arc;

/// Wallet holding one private key in process memory.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a LocalWallet from a hex-encoded private key (with or without 0x).
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}

	pub fn random() -> Self {
		Self {
			signer: PrivateKeySigner::random(),
		}
	}

	pub fn key_material(&self) -> KeyMaterial {
		KeyMaterial::new(format!("0x{}", hex::encode(self.signer.to_bytes())))
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError> {
		let (Some(nonce), Some(gas_price), Some(gas_limit)) = (tx.nonce, tx.gas_price, tx.gas_limit)
		else {
			return Err(AccountError::SigningFailed(
				"transaction must carry nonce, gas price and gas limit".to_string(),
			));
		};

		let mut legacy_tx = TxLegacy {
			chain_id: Some(tx.chain_id),
			nonce,
			gas_price,
			gas_limit,
			to: TxKind::Call(tx.to),
			value: tx.value,
			input: Bytes::from(tx.data.clone()),
		};

		let signature = self
			.signer
			.sign_transaction(&mut legacy_tx)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign transaction: {}", e)))?;

		let envelope = TxEnvelope::from(legacy_tx.into_signed(signature));
		Ok(SignedTransaction(envelope.encoded_2718()))
	}
}

/// Custody keeping generated keys as hex material; no configuration.
pub struct LocalCustody;

struct LocalCustodySchema;

impl ConfigSchema for LocalCustodySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

impl KeyCustody for LocalCustody {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalCustodySchema)
	}

	fn generate(&self) -> Result<(Address, KeyMaterial), AccountError> {
		let wallet = LocalWallet::random();
		Ok((wallet.address(), wallet.key_material()))
	}

	fn signer(&self, key: &KeyMaterial) -> Result<Arc<dyn AccountInterface>, AccountError> {
		Ok(Arc::new(LocalWallet::new(key.expose())?))
	}
}

/// Factory function to create the key custody from configuration.
pub fn create_custody(config: &toml::Value) -> Result<Box<dyn KeyCustody>, AccountError> {
	LocalCustodySchema
		.validate(config)
		.map_err(|e| AccountError::Config(e.to_string()))?;
	tracing::debug!("Using local key custody");
	Ok(Box::new(LocalCustody))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::U256;

	const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

	#[test]
	fn test_key_material_round_trips() {
		let wallet = LocalWallet::new(KEY).unwrap();
		let again = LocalWallet::new(wallet.key_material().expose()).unwrap();
		assert_eq!(wallet.address(), again.address());
	}

	#[test]
	fn test_rejects_bad_key() {
		assert!(matches!(
			LocalWallet::new("0x1234"),
			Err(AccountError::InvalidKey(_))
		));
	}

	#[tokio::test]
	async fn test_sign_requires_populated_transaction() {
		let wallet = LocalWallet::new(KEY).unwrap();
		let tx = Transaction::transfer(Address::repeat_byte(9), U256::from(1u64));
		assert!(wallet.sign_transaction(&tx).await.is_err());

		let mut tx = tx;
		tx.chain_id = 1;
		tx.nonce = Some(0);
		tx.gas_price = Some(1_000_000_000);
		let signed = wallet.sign_transaction(&tx).await.unwrap();
		// Legacy envelopes are plain RLP lists.
		assert!(signed.0[0] >= 0xc0);
	}
}
