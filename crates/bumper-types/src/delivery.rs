//! Transaction delivery types: hashes and receipts.

use serde::{Deserialize, Serialize};

/// Blockchain transaction hash, rendered as `0x`-prefixed hex.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// Short form for log lines, e.g. `0xa096...a0b4`.
	pub fn truncated(&self) -> String {
		let full = self.to_string();
		if full.len() <= 12 {
			full
		} else {
			format!("{}...{}", &full[..6], &full[full.len() - 4..])
		}
	}
}

impl std::fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl std::fmt::Debug for TransactionHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "TransactionHash({})", self)
	}
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncated_hash() {
		let hash = TransactionHash(vec![0xa0; 32]);
		assert_eq!(hash.truncated(), "0xa0a0...a0a0");

		let short = TransactionHash(vec![0x12, 0x34]);
		assert_eq!(short.truncated(), "0x1234");
	}
}
