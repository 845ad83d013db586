//! Broadcast bus for [`BumperEvent`]s.
//!
//! Publishing never blocks the batch loop: slow subscribers lose the oldest
//! events rather than applying backpressure.

use bumper_types::BumperEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<BumperEvent>,
}

impl EventBus {
	/// `capacity` events are buffered per subscriber before the oldest are
	/// dropped.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<BumperEvent> {
		self.sender.subscribe()
	}

	/// Publishes to current subscribers; having none is not an error here.
	pub fn publish(&self, event: BumperEvent) {
		if self.sender.send(event).is_err() {
			tracing::trace!("Event published with no subscribers");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bumper_types::Address;

	#[tokio::test]
	async fn test_subscribers_receive_published_events() {
		let bus = EventBus::new(8);
		let mut rx = bus.subscribe();

		bus.publish(BumperEvent::OrderCreated {
			order_id: "o1".into(),
			deposit_address: Address::repeat_byte(1),
		});

		match rx.recv().await.unwrap() {
			BumperEvent::OrderCreated { order_id, .. } => assert_eq!(order_id, "o1"),
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[test]
	fn test_publish_without_subscribers_is_silent() {
		let bus = EventBus::new(1);
		bus.publish(BumperEvent::OrderCreated {
			order_id: "o1".into(),
			deposit_address: Address::ZERO,
		});
	}
}
