//! Fan-out of publication events to connected recipients.
//!
//! Each recipient owns one unbounded FIFO outbox drained by its connection's
//! writer task, so whatever order events are published in is the order each
//! recipient receives them. Publishing never blocks and never awaits.

use log::debug;
use shared::{EntityId, Packet, PublicationEvent};
use std::collections::HashMap;
use tokio::sync::mpsc;

pub type Outbox = mpsc::UnboundedSender<Packet>;

/// Who receives a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    AllExcept(EntityId),
    Single(EntityId),
}

impl Audience {
    pub fn includes(&self, recipient: EntityId) -> bool {
        match self {
            Audience::All => true,
            Audience::AllExcept(excluded) => *excluded != recipient,
            Audience::Single(target) => *target == recipient,
        }
    }
}

#[derive(Debug, Default)]
pub struct Publisher {
    recipients: HashMap<EntityId, Outbox>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: EntityId, outbox: Outbox) {
        self.recipients.insert(id, outbox);
    }

    /// Drops the recipient's outbox, which lets its writer task finish.
    pub fn unregister(&mut self, id: EntityId) -> Option<Outbox> {
        self.recipients.remove(&id)
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.recipients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Queues `event` for every recipient in `audience`; returns how many
    /// outboxes accepted it.
    pub fn publish(&self, event: PublicationEvent, audience: Audience) -> usize {
        let mut delivered = 0;

        match audience {
            Audience::Single(id) => {
                if let Some(outbox) = self.recipients.get(&id) {
                    delivered += Self::deliver(id, outbox, event);
                }
            }
            _ => {
                for (id, outbox) in &self.recipients {
                    if audience.includes(*id) {
                        delivered += Self::deliver(*id, outbox, event);
                    }
                }
            }
        }

        delivered
    }

    fn deliver(id: EntityId, outbox: &Outbox, event: PublicationEvent) -> usize {
        match outbox.send(Packet::Event(event)) {
            Ok(()) => 1,
            Err(_) => {
                // The connection is going away; its close notification will
                // arrive through the room's message queue.
                debug!("Outbox for {} is closed, dropping {:?}", id, event);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Position;

    fn changed(id: EntityId, x: f32) -> PublicationEvent {
        PublicationEvent::EntityChanged {
            id,
            position: Position::new(x, -1.0, 0.0),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Packet>) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = rx.try_recv() {
            packets.push(packet);
        }
        packets
    }

    #[test]
    fn test_audience_membership() {
        assert!(Audience::All.includes(1));
        assert!(!Audience::AllExcept(1).includes(1));
        assert!(Audience::AllExcept(1).includes(2));
        assert!(Audience::Single(2).includes(2));
        assert!(!Audience::Single(2).includes(1));
    }

    #[test]
    fn test_publish_respects_audience() {
        let mut publisher = Publisher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        publisher.register(1, tx1);
        publisher.register(2, tx2);

        assert_eq!(publisher.publish(changed(1, 1.0), Audience::All), 2);
        assert_eq!(publisher.publish(changed(1, 2.0), Audience::AllExcept(1)), 1);
        assert_eq!(publisher.publish(changed(1, 3.0), Audience::Single(1)), 1);
        assert_eq!(publisher.publish(changed(1, 4.0), Audience::Single(99)), 0);

        assert_eq!(
            drain(&mut rx1),
            vec![
                Packet::Event(changed(1, 1.0)),
                Packet::Event(changed(1, 3.0))
            ]
        );
        assert_eq!(
            drain(&mut rx2),
            vec![
                Packet::Event(changed(1, 1.0)),
                Packet::Event(changed(1, 2.0))
            ]
        );
    }

    #[test]
    fn test_per_recipient_order_is_emission_order() {
        let mut publisher = Publisher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        publisher.register(1, tx);

        for step in 0..100 {
            publisher.publish(changed(1, step as f32), Audience::All);
        }

        let xs: Vec<f32> = drain(&mut rx)
            .into_iter()
            .map(|packet| match packet {
                Packet::Event(PublicationEvent::EntityChanged { position, .. }) => position.x,
                other => panic!("Unexpected packet {:?}", other),
            })
            .collect();
        let expected: Vec<f32> = (0..100).map(|step| step as f32).collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn test_closed_outbox_is_skipped() {
        let mut publisher = Publisher::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        publisher.register(1, tx1);
        publisher.register(2, tx2);
        drop(rx1);

        assert_eq!(publisher.publish(changed(2, 0.0), Audience::All), 1);
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[test]
    fn test_unregister_closes_outbox() {
        let mut publisher = Publisher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        publisher.register(1, tx);

        assert!(publisher.unregister(1).is_some());
        assert!(publisher.is_empty());
        // Dropping the only sender disconnects the receiver.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
