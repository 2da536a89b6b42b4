use uuid::Uuid;

use crate::relay::ResponsePacket;

/// Who an outbound packet is meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single connection.
    Connection(Uuid),
    /// Every member of a room.
    Room(String),
    /// Every registered connection.
    Everyone,
}

/// A packet together with the connections it is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipients: Vec<Uuid>,
    pub packet: ResponsePacket,
}

/// The ordered deliveries produced while handling one inbound action.
///
/// Deferred deliveries go out after every immediate one, regardless of the
/// order they were queued in.
#[derive(Debug, Default)]
pub struct Outbox {
    immediate: Vec<Delivery>,
    deferred: Vec<Delivery>,
}

impl Outbox {
    pub fn new() -> Outbox {
        Outbox::default()
    }

    pub fn push(&mut self, recipients: Vec<Uuid>, packet: ResponsePacket) {
        self.immediate.push(Delivery { recipients, packet });
    }

    /// Queue a delivery behind everything else produced by the handler.
    pub fn defer(&mut self, recipients: Vec<Uuid>, packet: ResponsePacket) {
        self.deferred.push(Delivery { recipients, packet });
    }

    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.deferred.is_empty()
    }

    pub fn into_deliveries(self) -> Vec<Delivery> {
        let mut deliveries = self.immediate;
        deliveries.extend(self.deferred);
        deliveries
    }
}

/// Packets addressed to `id`, in delivery order.
#[cfg(test)]
pub(crate) fn packets_for(deliveries: &[Delivery], id: Uuid) -> Vec<ResponsePacket> {
    deliveries
        .iter()
        .filter(|delivery| delivery.recipients.contains(&id))
        .map(|delivery| delivery.packet.clone())
        .collect()
}
