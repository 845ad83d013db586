//! Bump order types and the order state machine.
//!
//! An order is created `pending` when its deposit account is issued, moves to
//! `processing` exactly once when an operator starts it, and ends in
//! `completed` or `failed`. Terminal orders are immutable.

use crate::{KeyMaterial, TransactionHash};
use alloy::primitives::{utils::format_ether, Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a bump order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	Pending,
	Processing,
	Completed,
	Failed,
}

impl OrderStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}
}

impl std::fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Pending => write!(f, "pending"),
			Self::Processing => write!(f, "processing"),
			Self::Completed => write!(f, "completed"),
			Self::Failed => write!(f, "failed"),
		}
	}
}

/// Why the batch loop of an order stopped.
///
/// `status` keeps the coarse, backward compatible outcome; this records which
/// of the several paths into that status was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
	/// Every planned batch ran.
	PlanFinished,
	/// The deposit balance could not cover another full batch.
	FundsExhausted,
	/// A batch raised an error (funding failure, batch persistence).
	BatchAborted,
	/// An operator cancelled the run.
	Cancelled,
	/// The run exceeded its configured time budget.
	TimedOut,
	/// Reading or writing the order record failed.
	PersistenceFailure,
}

impl StopReason {
	/// Terminal status recorded for this stop.
	pub fn terminal_status(&self) -> OrderStatus {
		match self {
			Self::PlanFinished | Self::FundsExhausted | Self::BatchAborted => {
				OrderStatus::Completed
			}
			Self::Cancelled | Self::TimedOut | Self::PersistenceFailure => OrderStatus::Failed,
		}
	}
}

/// Rejected order state transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid order transition from {from} to {to}")]
pub struct TransitionError {
	pub from: OrderStatus,
	pub to: OrderStatus,
}

/// Persisted bump order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BumpOrder {
	/// Opaque unique identifier.
	pub id: String,
	/// Account the user deposits into.
	pub deposit_address: Address,
	/// Custody-held key of the deposit account.
	pub deposit_key: KeyMaterial,
	/// Asset bought by every bump.
	pub token_address: Address,
	/// Deposit balance observed when processing started.
	pub total_amount: U256,
	/// Planning value: `total_amount - fee_amount`, set once at start.
	pub remaining_amount: U256,
	/// Treasury fee debited at start.
	pub fee_amount: U256,
	pub status: OrderStatus,
	/// Number of batches completed so far.
	pub current_batch: u32,
	pub total_batches: u32,
	pub created_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub stop_reason: Option<StopReason>,
	#[serde(default)]
	pub fee_tx: Option<TransactionHash>,
}

impl BumpOrder {
	/// Creates a fresh `pending` order awaiting deposit.
	pub fn new_pending(
		id: impl Into<String>,
		deposit_address: Address,
		deposit_key: KeyMaterial,
		token_address: Address,
	) -> Self {
		Self {
			id: id.into(),
			deposit_address,
			deposit_key,
			token_address,
			total_amount: U256::ZERO,
			remaining_amount: U256::ZERO,
			fee_amount: U256::ZERO,
			status: OrderStatus::Pending,
			current_batch: 0,
			total_batches: 0,
			created_at: Utc::now(),
			completed_at: None,
			stop_reason: None,
			fee_tx: None,
		}
	}

	/// Moves a pending order into `processing` with its batch plan.
	pub fn start_processing(
		&mut self,
		total_amount: U256,
		fee_amount: U256,
		total_batches: u32,
		fee_tx: TransactionHash,
	) -> Result<(), TransitionError> {
		if self.status != OrderStatus::Pending {
			return Err(TransitionError {
				from: self.status,
				to: OrderStatus::Processing,
			});
		}

		self.total_amount = total_amount;
		self.fee_amount = fee_amount;
		self.remaining_amount = total_amount.saturating_sub(fee_amount);
		self.total_batches = total_batches;
		self.fee_tx = Some(fee_tx);
		self.status = OrderStatus::Processing;
		Ok(())
	}

	/// Records one more completed batch.
	pub fn advance_batch(&mut self) -> Result<(), TransitionError> {
		if self.status != OrderStatus::Processing || self.current_batch >= self.total_batches {
			return Err(TransitionError {
				from: self.status,
				to: OrderStatus::Processing,
			});
		}
		self.current_batch += 1;
		Ok(())
	}

	/// Closes a processing order with the status implied by `reason`.
	pub fn finish(&mut self, reason: StopReason) -> Result<(), TransitionError> {
		let to = reason.terminal_status();
		if self.status != OrderStatus::Processing {
			return Err(TransitionError {
				from: self.status,
				to,
			});
		}

		self.status = to;
		self.stop_reason = Some(reason);
		self.completed_at = Some(Utc::now());
		Ok(())
	}

	/// Read-only projection combined with a live balance reading.
	pub fn view(&self, live_balance: U256, running: bool) -> OrderStatusView {
		OrderStatusView {
			order_id: self.id.clone(),
			status: self.status,
			token_address: self.token_address,
			deposit_wallet: self.deposit_address,
			current_balance: format_ether(live_balance),
			total_amount: format_ether(self.total_amount),
			remaining_amount: format_ether(self.remaining_amount),
			current_batch: self.current_batch,
			total_batches: self.total_batches,
			stop_reason: self.stop_reason,
			running,
			created_at: self.created_at,
			completed_at: self.completed_at,
		}
	}

	/// Listing form without key material.
	pub fn summary(&self) -> OrderSummary {
		OrderSummary {
			order_id: self.id.clone(),
			status: self.status,
			token_address: self.token_address,
			deposit_wallet: self.deposit_address,
			total_amount: format_ether(self.total_amount),
			remaining_amount: format_ether(self.remaining_amount),
			current_batch: self.current_batch,
			total_batches: self.total_batches,
			created_at: self.created_at,
			completed_at: self.completed_at,
		}
	}
}

/// Status projection surfaced to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusView {
	pub order_id: String,
	pub status: OrderStatus,
	pub token_address: Address,
	pub deposit_wallet: Address,
	/// Live deposit balance in ether; varies with chain state.
	pub current_balance: String,
	pub total_amount: String,
	pub remaining_amount: String,
	pub current_batch: u32,
	pub total_batches: u32,
	pub stop_reason: Option<StopReason>,
	/// Whether a batch loop currently holds the order's lease.
	pub running: bool,
	pub created_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
	pub order_id: String,
	pub status: OrderStatus,
	pub token_address: Address,
	pub deposit_wallet: Address,
	pub total_amount: String,
	pub remaining_amount: String,
	pub current_batch: u32,
	pub total_batches: u32,
	pub created_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
}

/// Returned when an order is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
	pub order_id: String,
	pub deposit_wallet: Address,
}

/// Returned by a successful start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginReceipt {
	pub order_id: String,
	pub total_batches: u32,
	pub estimated_bumps: u64,
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::utils::parse_ether;

	fn pending() -> BumpOrder {
		BumpOrder::new_pending(
			"order-1",
			Address::repeat_byte(1),
			KeyMaterial::new("00"),
			Address::repeat_byte(2),
		)
	}

	#[test]
	fn test_start_processing_sets_plan_once() {
		let mut order = pending();
		let balance = parse_ether("0.02").unwrap();
		let fee = parse_ether("0.009").unwrap();

		order
			.start_processing(balance, fee, 3, TransactionHash(vec![1]))
			.unwrap();
		assert_eq!(order.status, OrderStatus::Processing);
		assert_eq!(order.remaining_amount, parse_ether("0.011").unwrap());

		let again = order.start_processing(balance, fee, 3, TransactionHash(vec![1]));
		assert_eq!(
			again,
			Err(TransitionError {
				from: OrderStatus::Processing,
				to: OrderStatus::Processing
			})
		);
	}

	#[test]
	fn test_finish_only_from_processing() {
		let mut order = pending();
		assert!(order.finish(StopReason::PlanFinished).is_err());

		order
			.start_processing(U256::from(10u64), U256::from(1u64), 1, TransactionHash(vec![]))
			.unwrap();
		order.finish(StopReason::FundsExhausted).unwrap();
		assert_eq!(order.status, OrderStatus::Completed);
		assert!(order.completed_at.is_some());

		// Terminal orders are immutable.
		assert!(order.finish(StopReason::Cancelled).is_err());
		assert_eq!(order.stop_reason, Some(StopReason::FundsExhausted));
	}

	#[test]
	fn test_advance_batch_is_bounded() {
		let mut order = pending();
		order
			.start_processing(U256::from(10u64), U256::from(1u64), 1, TransactionHash(vec![]))
			.unwrap();
		order.advance_batch().unwrap();
		assert_eq!(order.current_batch, 1);
		assert!(order.advance_batch().is_err());
	}

	#[test]
	fn test_stop_reasons_map_to_status() {
		assert_eq!(
			StopReason::BatchAborted.terminal_status(),
			OrderStatus::Completed
		);
		assert_eq!(StopReason::Cancelled.terminal_status(), OrderStatus::Failed);
		assert_eq!(
			StopReason::PersistenceFailure.terminal_status(),
			OrderStatus::Failed
		);
	}

	#[test]
	fn test_view_formats_amounts_in_ether() {
		let order = pending();
		let view = order.view(parse_ether("0.5").unwrap(), false);
		assert_eq!(view.current_balance, "0.500000000000000000");
		assert_eq!(view.status, OrderStatus::Pending);

		let json = serde_json::to_value(&view).unwrap();
		assert_eq!(json["status"], "pending");
		assert!(json.get("depositWallet").is_some());
	}
}
