//! Events broadcast while orders are created and processed.

use crate::{BatchResult, OrderStatus, StopReason, SwapOutcome, TransactionHash};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BumperEvent {
	OrderCreated {
		order_id: String,
		deposit_address: Address,
	},
	OrderStarted {
		order_id: String,
		total_batches: u32,
		fee_tx: TransactionHash,
	},
	BatchFunded {
		order_id: String,
		batch_number: u32,
		tx_hash: TransactionHash,
	},
	SwapSettled {
		order_id: String,
		batch_number: u32,
		account: Address,
		outcome: SwapOutcome,
	},
	BatchCompleted {
		order_id: String,
		result: BatchResult,
	},
	OrderFinished {
		order_id: String,
		status: OrderStatus,
		reason: StopReason,
	},
}
