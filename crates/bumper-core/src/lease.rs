//! Per-order execution leases.
//!
//! A lease is the right to spend from an order's deposit account. At most one
//! exists per order; a second `begin` while one is held is rejected. Each lease
//! carries a monotonic owner token so a stale guard can never release a lease
//! it no longer owns, and a cancellation signal the batch loop checks between
//! batches.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

struct ActiveLease {
	token: u64,
	cancel: watch::Sender<bool>,
}

#[derive(Clone, Default)]
pub struct LeaseRegistry {
	active: Arc<DashMap<String, ActiveLease>>,
	next_token: Arc<AtomicU64>,
}

impl LeaseRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes the lease for `order_id`, or `None` when it is already held.
	/// Synchronous, so callers can take it before their first await point.
	pub fn try_acquire(&self, order_id: &str) -> Option<OrderLease> {
		match self.active.entry(order_id.to_string()) {
			Entry::Occupied(_) => None,
			Entry::Vacant(slot) => {
				let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
				let (cancel, cancelled) = watch::channel(false);
				slot.insert(ActiveLease { token, cancel });
				Some(OrderLease {
					registry: self.clone(),
					order_id: order_id.to_string(),
					token,
					cancelled,
				})
			}
		}
	}

	pub fn is_held(&self, order_id: &str) -> bool {
		self.active.contains_key(order_id)
	}

	/// Raises the cancel signal of the lease for `order_id`.
	/// Returns false when no lease is held.
	pub fn cancel(&self, order_id: &str) -> bool {
		match self.active.get(order_id) {
			Some(lease) => {
				lease.cancel.send_replace(true);
				true
			}
			None => false,
		}
	}

	/// Cancels every held lease and returns how many there were.
	pub fn cancel_all(&self) -> usize {
		let mut count = 0;
		for lease in self.active.iter() {
			lease.cancel.send_replace(true);
			count += 1;
		}
		count
	}

	pub fn held_count(&self) -> usize {
		self.active.len()
	}

	fn release(&self, order_id: &str, token: u64) {
		self.active.remove_if(order_id, |_, lease| lease.token == token);
	}
}

/// RAII guard; dropping it releases the lease.
pub struct OrderLease {
	registry: LeaseRegistry,
	order_id: String,
	token: u64,
	cancelled: watch::Receiver<bool>,
}

impl OrderLease {
	pub fn order_id(&self) -> &str {
		&self.order_id
	}

	pub fn is_cancelled(&self) -> bool {
		*self.cancelled.borrow()
	}

	/// Resolves once cancellation is requested.
	pub async fn cancelled(&mut self) {
		// The sender lives in the registry entry this guard owns, so it cannot
		// be dropped while we wait.
		let _ = self.cancelled.wait_for(|cancelled| *cancelled).await;
	}
}

impl Drop for OrderLease {
	fn drop(&mut self) {
		self.registry.release(&self.order_id, self.token);
	}
}
