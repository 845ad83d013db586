//! Order lifecycle manager.
//!
//! Owns the persisted order record. `begin` validates the deposit, takes the
//! treasury fee, plans the batches and hands the order to a background loop
//! that runs batches until the plan is done or a stop condition fires. Once
//! the loop has started, its outcome is only visible through `status`.

use crate::batch::{BatchExecutor, BATCHES_NAMESPACE};
use crate::event_bus::EventBus;
use crate::lease::{LeaseRegistry, OrderLease};
use crate::plan::plan_batches;
use crate::settings::EngineSettings;
use crate::BumperError;
use alloy::primitives::utils::format_ether;
use bumper_account::AccountService;
use bumper_delivery::DeliveryService;
use bumper_exchange::ExchangeService;
use bumper_storage::{StorageError, StorageService};
use bumper_types::{
	Address, BatchResult, BeginReceipt, BumpOrder, BumperEvent, CreatedOrder, OrderStatus,
	OrderStatusView, OrderSummary, StopReason, Transaction, WalletBatch,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub const ORDERS_NAMESPACE: &str = "orders";

/// Default page size of [`OrderManager::list`].
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Clone)]
pub struct OrderManager {
	storage: Arc<StorageService>,
	delivery: Arc<DeliveryService>,
	account: Arc<AccountService>,
	exchange: Arc<ExchangeService>,
	executor: Arc<BatchExecutor>,
	leases: LeaseRegistry,
	event_bus: EventBus,
	settings: Arc<EngineSettings>,
}

impl OrderManager {
	pub fn new(
		storage: Arc<StorageService>,
		delivery: Arc<DeliveryService>,
		account: Arc<AccountService>,
		exchange: Arc<ExchangeService>,
		executor: Arc<BatchExecutor>,
		event_bus: EventBus,
		settings: Arc<EngineSettings>,
	) -> Self {
		Self {
			storage,
			delivery,
			account,
			exchange,
			executor,
			leases: LeaseRegistry::new(),
			event_bus,
			settings,
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn settings(&self) -> &EngineSettings {
		&self.settings
	}

	/// Issues a deposit account for a new order buying `token`.
	pub async fn create(&self, token: &str) -> Result<CreatedOrder, BumperError> {
		let token_address: Address = token
			.trim()
			.parse()
			.map_err(|_| BumperError::InvalidInput(format!("Invalid token address: {}", token)))?;

		if !self.exchange.is_tradeable(token_address).await {
			return Err(BumperError::InvalidInput(
				"Token is not tradeable or has no liquidity".to_string(),
			));
		}

		let (deposit_address, deposit_key) = self.account.new_deposit_account()?;
		let order_id = uuid::Uuid::new_v4().to_string();
		let order = BumpOrder::new_pending(&order_id, deposit_address, deposit_key, token_address);
		self.save_order(&order).await?;

		info!(order_id = %order_id, token = %token_address, deposit = %deposit_address, "Order created");
		self.event_bus.publish(BumperEvent::OrderCreated {
			order_id: order_id.clone(),
			deposit_address,
		});

		Ok(CreatedOrder {
			order_id,
			deposit_wallet: deposit_address,
		})
	}

	/// Starts a pending order and returns without waiting for its batches.
	///
	/// Any error leaves the order `pending`. The fee transfer is not retried.
	pub async fn begin(&self, order_id: &str) -> Result<BeginReceipt, BumperError> {
		// Taken before the first await so two concurrent calls cannot both pass.
		let lease = self
			.leases
			.try_acquire(order_id)
			.ok_or_else(|| BumperError::OrderAlreadyRunning(order_id.to_string()))?;

		let mut order = self.load_order(order_id).await?;
		if order.status != OrderStatus::Pending {
			return Err(BumperError::OrderNotPending(order.status));
		}

		let balance = self.delivery.get_balance(order.deposit_address).await?;
		if balance < self.settings.min_balance {
			return Err(BumperError::InsufficientFunds {
				needed: format_ether(self.settings.min_balance),
				available: format_ether(balance),
			});
		}

		let fee = self.settings.treasury_fee;
		let remaining = balance.saturating_sub(fee);
		if remaining.is_zero() {
			return Err(BumperError::InsufficientFunds {
				needed: format_ether(fee),
				available: format_ether(balance),
			});
		}

		let plan = plan_batches(remaining, self.settings.bump_amount, self.settings.batch_size);

		let depositor = self.account.signer(&order.deposit_key)?;
		let fee_receipt = self
			.delivery
			.deliver(Transaction::transfer(self.settings.treasury, fee), &*depositor)
			.await
			.map_err(BumperError::FeeTransferFailed)?;

		order
			.start_processing(balance, fee, plan.total_batches, fee_receipt.hash.clone())?;
		if let Err(e) = self.save_order(&order).await {
			error!(order_id, fee_tx = %fee_receipt.hash, error = %e, "Fee paid but order could not be saved");
			return Err(e);
		}

		info!(
			order_id,
			total = %format_ether(balance),
			remaining = %format_ether(order.remaining_amount),
			total_batches = plan.total_batches,
			"Order processing started"
		);
		self.event_bus.publish(BumperEvent::OrderStarted {
			order_id: order_id.to_string(),
			total_batches: plan.total_batches,
			fee_tx: fee_receipt.hash,
		});

		let manager = self.clone();
		tokio::spawn(async move { manager.run(lease, order).await });

		Ok(BeginReceipt {
			order_id: order_id.to_string(),
			total_batches: plan.total_batches,
			estimated_bumps: plan.total_bumps,
		})
	}

	/// Persisted order plus a live balance read. Never writes.
	pub async fn status(&self, order_id: &str) -> Result<OrderStatusView, BumperError> {
		let order = self.load_order(order_id).await?;
		let balance = self.delivery.get_balance(order.deposit_address).await?;
		Ok(order.view(balance, self.leases.is_held(order_id)))
	}

	/// Most recent orders first.
	pub async fn list(&self, limit: usize) -> Result<Vec<OrderSummary>, BumperError> {
		let mut orders: Vec<BumpOrder> = self.storage.list(ORDERS_NAMESPACE, "").await?;
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(orders.iter().take(limit).map(BumpOrder::summary).collect())
	}

	/// Per-account results of every batch of an order, in batch order.
	pub async fn batches(&self, order_id: &str) -> Result<Vec<BatchResult>, BumperError> {
		self.load_order(order_id).await?;
		let prefix = format!("{}-", order_id);
		let batches: Vec<WalletBatch> = self.storage.list(BATCHES_NAMESPACE, &prefix).await?;
		Ok(batches.iter().map(WalletBatch::report).collect())
	}

	/// Asks a running order to stop after its current batch.
	pub async fn cancel(&self, order_id: &str) -> Result<(), BumperError> {
		self.load_order(order_id).await?;
		if !self.leases.cancel(order_id) {
			return Err(BumperError::OrderNotRunning(order_id.to_string()));
		}
		info!(order_id, "Cancellation requested");
		Ok(())
	}

	pub fn is_running(&self, order_id: &str) -> bool {
		self.leases.is_held(order_id)
	}

	/// Cancels every running order and waits up to `grace` for their loops to
	/// record a terminal status.
	pub async fn shutdown(&self, grace: Duration) {
		let running = self.leases.cancel_all();
		if running == 0 {
			return;
		}

		info!(running, "Waiting for running orders to stop");
		let deadline = Instant::now() + grace;
		while self.leases.held_count() > 0 {
			if Instant::now() >= deadline {
				warn!(
					still_running = self.leases.held_count(),
					"Shutdown grace period elapsed"
				);
				return;
			}
			tokio::time::sleep(Duration::from_millis(100)).await;
		}
	}

	/// Background loop of one order; holds the lease until it returns.
	///
	/// `order` is the record as saved by `begin`. The loop keeps it current so
	/// the outcome can still be written when the record can no longer be read.
	async fn run(self, mut lease: OrderLease, mut order: BumpOrder) {
		let reason = match self.process_batches(&mut lease, &mut order).await {
			Ok(reason) => reason,
			Err(e) => {
				error!(order_id = %order.id, error = %e, "Order state could not be read or written");
				StopReason::PersistenceFailure
			}
		};

		self.finalize(order, reason).await;
	}

	/// Runs batches until the plan is done or a stop condition fires.
	///
	/// Errors are reserved for failures on the order record itself; every
	/// other stop is a `StopReason`.
	async fn process_batches(
		&self,
		lease: &mut OrderLease,
		order: &mut BumpOrder,
	) -> Result<StopReason, BumperError> {
		let started = Instant::now();
		*order = self.load_order(lease.order_id()).await?;
		let required = self.settings.batch_requirement();

		while order.current_batch < order.total_batches {
			if lease.is_cancelled() {
				return Ok(StopReason::Cancelled);
			}
			if self.timed_out(started) {
				return Ok(StopReason::TimedOut);
			}

			let batch_number = order.current_batch + 1;

			let balance = match self.delivery.get_balance(order.deposit_address).await {
				Ok(balance) => balance,
				Err(e) => {
					error!(order_id = %order.id, batch = batch_number, error = %e, "Balance read failed");
					return Ok(StopReason::BatchAborted);
				}
			};
			if balance < required {
				info!(
					order_id = %order.id,
					batch = batch_number,
					balance = %format_ether(balance),
					required = %format_ether(required),
					"Insufficient balance for next batch, stopping"
				);
				return Ok(StopReason::FundsExhausted);
			}

			if let Err(e) = self.executor.run_batch(order, batch_number).await {
				error!(order_id = %order.id, batch = batch_number, error = %e, "Batch aborted");
				return Ok(StopReason::BatchAborted);
			}

			order.advance_batch()?;
			self.save_order(order).await?;
			info!(
				order_id = %order.id,
				batch = order.current_batch,
				total_batches = order.total_batches,
				"Batch recorded"
			);

			// No pause after the final batch.
			if order.current_batch < order.total_batches {
				tokio::select! {
					_ = tokio::time::sleep(self.settings.inter_batch_delay) => {}
					_ = lease.cancelled() => {}
				}
			}
		}

		Ok(StopReason::PlanFinished)
	}

	fn timed_out(&self, started: Instant) -> bool {
		self.settings
			.order_timeout
			.is_some_and(|timeout| started.elapsed() >= timeout)
	}

	/// Records the terminal status. Falls back to the loop's own copy of the
	/// order when the stored record cannot be read, so the write still happens.
	async fn finalize(&self, last_known: BumpOrder, reason: StopReason) {
		let order_id = last_known.id.clone();
		let order_id = order_id.as_str();
		let mut order = match self.load_order(order_id).await {
			Ok(order) => order,
			Err(e) => {
				warn!(order_id, error = %e, "Could not reload order, recording outcome from last known state");
				last_known
			}
		};

		if let Err(e) = order.finish(reason) {
			warn!(order_id, error = %e, "Order already terminal");
			return;
		}

		if let Err(e) = self.save_order(&order).await {
			error!(order_id, error = %e, "Could not record order outcome");
			return;
		}

		info!(
			order_id,
			status = %order.status,
			reason = ?reason,
			batches = order.current_batch,
			"Order finished"
		);
		self.event_bus.publish(BumperEvent::OrderFinished {
			order_id: order_id.to_string(),
			status: order.status,
			reason,
		});
	}

	async fn load_order(&self, order_id: &str) -> Result<BumpOrder, BumperError> {
		self.storage
			.retrieve(ORDERS_NAMESPACE, order_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => BumperError::OrderNotFound(order_id.to_string()),
				other => BumperError::Persistence(other),
			})
	}

	async fn save_order(&self, order: &BumpOrder) -> Result<(), BumperError> {
		Ok(self.storage.store(ORDERS_NAMESPACE, &order.id, order).await?)
	}
}
