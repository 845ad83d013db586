use bumper_core::EventBus;
use bumper_types::BumperEvent;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Logs every engine event until the bus closes.
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<()> {
	let mut receiver = bus.subscribe();
	tokio::spawn(async move {
		loop {
			match receiver.recv().await {
				Ok(event) => log_event(&event),
				Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
				Err(RecvError::Closed) => break,
			}
		}
	})
}

fn log_event(event: &BumperEvent) {
	match event {
		BumperEvent::OrderCreated {
			order_id,
			deposit_address,
		} => info!(order_id, deposit = %deposit_address, "Order created"),
		BumperEvent::OrderStarted {
			order_id,
			total_batches,
			fee_tx,
		} => info!(order_id, total_batches, fee_tx = %fee_tx, "Order started"),
		BumperEvent::BatchFunded {
			order_id,
			batch_number,
			tx_hash,
		} => info!(order_id, batch = batch_number, tx_hash = %tx_hash, "Batch funded"),
		BumperEvent::SwapSettled {
			order_id,
			batch_number,
			account,
			outcome,
		} => match (&outcome.tx_hash, &outcome.error) {
			(Some(hash), _) => debug!(
				order_id,
				batch = batch_number,
				account = %account,
				protocol = outcome.protocol.as_deref().unwrap_or("unknown"),
				tx_hash = %hash,
				"Swap settled"
			),
			(None, error) => debug!(
				order_id,
				batch = batch_number,
				account = %account,
				error = error.as_deref().unwrap_or("unknown"),
				"Swap failed"
			),
		},
		BumperEvent::BatchCompleted { order_id, result } => info!(
			order_id,
			batch = result.batch_number,
			succeeded = result.succeeded(),
			failed = result.failed(),
			"Batch completed"
		),
		BumperEvent::OrderFinished {
			order_id,
			status,
			reason,
		} => info!(order_id, status = %status, reason = ?reason, "Order finished"),
	}
}
