//! Account-related types: key material and the unsigned transaction envelope.

use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use serde::{Deserialize, Serialize};

/// Hex-encoded private key as held in custody.
///
/// The value is persisted alongside the record that owns the account, but it
/// never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMaterial(String);

impl KeyMaterial {
	pub fn new(hex_key: impl Into<String>) -> Self {
		Self(hex_key.into())
	}

	/// Exposes the raw key to a signer implementation.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Debug for KeyMaterial {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("KeyMaterial(<redacted>)")
	}
}

/// Fully signed, EIP-2718 encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction(pub Vec<u8>);

/// Blockchain transaction representation.
///
/// Built by the exchange and funding adapters, completed (nonce, gas price)
/// by delivery and signed by the sending account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	/// Recipient address.
	pub to: Address,
	/// Calldata.
	pub data: Vec<u8>,
	/// Native value attached to the call.
	pub value: U256,
	/// Chain ID for replay protection.
	pub chain_id: u64,
	/// Filled by delivery when absent.
	pub nonce: Option<u64>,
	/// Gas limit for execution; estimated by delivery when absent.
	pub gas_limit: Option<u64>,
	/// Legacy gas price; read from the node when absent.
	pub gas_price: Option<u128>,
}

impl Transaction {
	/// Plain native-currency transfer with the standard 21k gas limit.
	pub fn transfer(to: Address, value: U256) -> Self {
		Self {
			to,
			data: Vec::new(),
			value,
			chain_id: 0,
			nonce: None,
			gas_limit: Some(21_000),
			gas_price: None,
		}
	}

	/// Contract call carrying `data` and `value`.
	pub fn call(to: Address, data: Vec<u8>, value: U256) -> Self {
		Self {
			to,
			data,
			value,
			chain_id: 0,
			nonce: None,
			gas_limit: None,
			gas_price: None,
		}
	}

	pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}
}

impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		TransactionRequest {
			chain_id: (tx.chain_id != 0).then_some(tx.chain_id),
			value: Some(tx.value),
			to: Some(TxKind::Call(tx.to)),
			nonce: tx.nonce,
			gas: tx.gas_limit,
			gas_price: tx.gas_price,
			input: TransactionInput::new(Bytes::from(tx.data)),
			..Default::default()
		}
	}
}
