//! Wallet batch types.

use crate::{KeyMaterial, TransactionHash};
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one batch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
	/// Accounts generated and persisted, funding not yet confirmed.
	Created,
	/// Bulk funding confirmed on chain.
	Funded,
	/// Every account has made its swap attempt.
	Completed,
}

/// Result of one account's swap attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
	/// Exchange protocol that executed the swap.
	pub protocol: Option<String>,
	pub tx_hash: Option<TransactionHash>,
	/// Error text when every protocol failed.
	pub error: Option<String>,
}

impl SwapOutcome {
	pub fn executed(protocol: impl Into<String>, tx_hash: TransactionHash) -> Self {
		Self {
			protocol: Some(protocol.into()),
			tx_hash: Some(tx_hash),
			error: None,
		}
	}

	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			protocol: None,
			tx_hash: None,
			error: Some(error.into()),
		}
	}

	pub fn succeeded(&self) -> bool {
		self.tx_hash.is_some()
	}
}

/// Disposable account funded for a single swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralAccount {
	pub address: Address,
	pub key: KeyMaterial,
	/// Set once the swap attempt has been made, whatever its outcome.
	pub used: bool,
	pub outcome: Option<SwapOutcome>,
}

impl EphemeralAccount {
	pub fn new(address: Address, key: KeyMaterial) -> Self {
		Self {
			address,
			key,
			used: false,
			outcome: None,
		}
	}

	pub fn record(&mut self, outcome: SwapOutcome) {
		self.used = true;
		self.outcome = Some(outcome);
	}
}

/// Persisted record of one batch of ephemeral accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBatch {
	pub order_id: String,
	/// One-based batch sequence number.
	pub batch_number: u32,
	pub accounts: Vec<EphemeralAccount>,
	pub status: BatchStatus,
	pub funding_tx: Option<TransactionHash>,
	pub created_at: DateTime<Utc>,
}

impl WalletBatch {
	pub fn new(order_id: impl Into<String>, batch_number: u32, accounts: Vec<EphemeralAccount>) -> Self {
		Self {
			order_id: order_id.into(),
			batch_number,
			accounts,
			status: BatchStatus::Created,
			funding_tx: None,
			created_at: Utc::now(),
		}
	}

	/// Storage id; zero padded so key order follows batch order.
	pub fn storage_id(order_id: &str, batch_number: u32) -> String {
		format!("{}-{:06}", order_id, batch_number)
	}

	pub fn id(&self) -> String {
		Self::storage_id(&self.order_id, self.batch_number)
	}

	pub fn addresses(&self) -> Vec<Address> {
		self.accounts.iter().map(|a| a.address).collect()
	}

	/// Public view of the batch without key material.
	pub fn report(&self) -> BatchResult {
		BatchResult {
			batch_number: self.batch_number,
			status: self.status,
			funding_tx: self.funding_tx.clone(),
			swaps: self
				.accounts
				.iter()
				.map(|account| SwapReport {
					account: account.address,
					outcome: account.outcome.clone(),
				})
				.collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReport {
	pub account: Address,
	pub outcome: Option<SwapOutcome>,
}

/// Structured per-account result of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
	pub batch_number: u32,
	pub status: BatchStatus,
	pub funding_tx: Option<TransactionHash>,
	pub swaps: Vec<SwapReport>,
}

impl BatchResult {
	pub fn succeeded(&self) -> usize {
		self.swaps
			.iter()
			.filter(|s| s.outcome.as_ref().is_some_and(SwapOutcome::succeeded))
			.count()
	}

	pub fn failed(&self) -> usize {
		self.swaps.len() - self.succeeded()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_storage_id_sorts_by_batch() {
		let a = WalletBatch::storage_id("o", 2);
		let b = WalletBatch::storage_id("o", 10);
		assert!(a < b);
	}

	#[test]
	fn test_record_marks_account_used() {
		let mut account = EphemeralAccount::new(Address::repeat_byte(3), KeyMaterial::new("k"));
		assert!(!account.used);

		account.record(SwapOutcome::failed("reverted"));
		assert!(account.used);
		assert!(!account.outcome.as_ref().unwrap().succeeded());
	}

	#[test]
	fn test_report_counts_outcomes() {
		let mut accounts: Vec<_> = (1..=3u8)
			.map(|i| EphemeralAccount::new(Address::repeat_byte(i), KeyMaterial::new("k")))
			.collect();
		accounts[0].record(SwapOutcome::executed("uniswap-v3", TransactionHash(vec![1])));
		accounts[1].record(SwapOutcome::failed("boom"));
		accounts[2].record(SwapOutcome::executed("uniswap-v2", TransactionHash(vec![2])));

		let mut batch = WalletBatch::new("o", 1, accounts);
		batch.status = BatchStatus::Completed;
		let report = batch.report();

		assert_eq!(report.succeeded(), 2);
		assert_eq!(report.failed(), 1);
		assert!(!serde_json::to_string(&report).unwrap().contains("\"k\""));
	}
}
