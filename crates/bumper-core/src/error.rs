use bumper_account::AccountError;
use bumper_delivery::DeliveryError;
use bumper_exchange::ExchangeError;
use bumper_funding::FundingError;
use bumper_storage::StorageError;
use bumper_types::{OrderStatus, TransitionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BumperError {
	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("Order not found: {0}")]
	OrderNotFound(String),

	/// Amounts are rendered in ether.
	#[error("Insufficient funds: {needed} ETH required, {available} ETH available")]
	InsufficientFunds { needed: String, available: String },

	#[error("Order is not in pending status (status: {0})")]
	OrderNotPending(OrderStatus),

	#[error("Order {0} is already running")]
	OrderAlreadyRunning(String),

	#[error("Order {0} is not running")]
	OrderNotRunning(String),

	#[error("Invalid order state: {0}")]
	InvalidState(#[from] TransitionError),

	#[error("Treasury fee transfer failed: {0}")]
	FeeTransferFailed(#[source] DeliveryError),

	#[error("Funding failure: {0}")]
	FundingFailure(#[from] FundingError),

	#[error("Swap failure: {0}")]
	SwapFailure(#[from] ExchangeError),

	#[error("Persistence failure: {0}")]
	Persistence(#[from] StorageError),

	#[error("Chain error: {0}")]
	Chain(#[from] DeliveryError),

	#[error("Account error: {0}")]
	Account(#[from] AccountError),

	#[error("Configuration error: {0}")]
	Configuration(String),
}
