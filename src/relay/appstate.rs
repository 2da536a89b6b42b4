use std::{collections::HashMap, sync::Arc};

use axum::extract::ws::Message;
use tokio::sync::RwLock;
use flume::TrySendError;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::relay::game::{Game, GameOptions};
use crate::relay::outbox::Outbox;
use crate::relay::RequestPacket;

/// The sending half of a connection's outbound queue.
///
/// A writer task per socket drains the queue, so pushing into it never
/// waits on the network.
pub type Sender = flume::Sender<Message>;
pub type Receiver = flume::Receiver<Message>;

/// How many packets may wait for a single connection before it is dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1000;

/// Creates the outbound queue for one connection.
pub fn outbound_queue() -> (Sender, Receiver) {
    flume::bounded(OUTBOUND_QUEUE_CAPACITY)
}

/// Everything the server knows: the game itself and a queue per connection.
///
/// Handlers take the write lock, run one action through the [`Game`] and
/// queue every resulting packet before the lock is released. Deliveries of
/// one action therefore never interleave with those of another.
#[derive(Debug)]
pub struct AppState {
    pub game: Game,
    connections: HashMap<Uuid, Sender>,
}

impl AppState {
    /// Creates a new shared `AppState` with no players and no rooms.
    pub fn new(options: GameOptions) -> Arc<RwLock<AppState>> {
        AppState::with_game(Game::new(options))
    }

    pub fn with_game(game: Game) -> Arc<RwLock<AppState>> {
        Arc::new(RwLock::new(AppState {
            game,
            connections: HashMap::new(),
        }))
    }

    /// Register a connection and greet it.
    pub fn connect(&mut self, player_id: Uuid, sender: Sender) {
        self.connections.insert(player_id, sender);
        let outbox = self.game.connect(player_id);
        self.deliver(outbox);
    }

    /// Forget a connection, notifying whoever shared its room.
    pub fn disconnect(&mut self, player_id: Uuid) {
        let outbox = self.game.disconnect(player_id);
        self.connections.remove(&player_id);
        self.deliver(outbox);
    }

    pub fn handle(&mut self, player_id: Uuid, packet: RequestPacket) {
        let outbox = self.game.handle(player_id, packet);
        self.deliver(outbox);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Queue every delivery of `outbox` on its recipients' connections.
    ///
    /// Queuing never blocks. A connection whose queue is full has stopped
    /// reading; it is disconnected once the whole outbox has been queued.
    fn deliver(&mut self, outbox: Outbox) {
        let mut stalled: Vec<Uuid> = Vec::new();

        for delivery in outbox.into_deliveries() {
            let text = match serde_json::to_string(&delivery.packet) {
                Ok(text) => text,
                Err(error) => {
                    error!("Failed to serialize packet {:?}: {}", delivery.packet, error);
                    continue;
                }
            };

            for player_id in delivery.recipients {
                if stalled.contains(&player_id) {
                    continue;
                }
                let Some(sender) = self.connections.get(&player_id) else {
                    debug!(%player_id, "No connection for recipient");
                    continue;
                };
                match sender.try_send(Message::Text(text.clone())) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => stalled.push(player_id),
                    Err(TrySendError::Disconnected(_)) => {
                        warn!(%player_id, "Failed to queue message for the client: queue closed");
                    }
                }
            }
        }

        for player_id in stalled {
            warn!(
                %player_id,
                "Outbound queue full after {} packets, dropping connection",
                OUTBOUND_QUEUE_CAPACITY
            );
            // Dropping the sender closes the queue, which ends the writer task.
            self.disconnect(player_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::ResponsePacket;
    use rand::{rngs::StdRng, SeedableRng};

    fn packets(receiver: &flume::Receiver<Message>) -> Vec<ResponsePacket> {
        receiver
            .drain()
            .filter_map(|message| match message {
                Message::Text(text) => serde_json::from_str(&text).ok(),
                _ => None,
            })
            .collect()
    }

    fn state() -> Arc<RwLock<AppState>> {
        AppState::with_game(Game::with_rng(
            GameOptions::default(),
            StdRng::seed_from_u64(3),
        ))
    }

    #[test]
    fn test_new() {
        let app_state = AppState::new(GameOptions::default());

        assert!(Arc::ptr_eq(&app_state, &app_state.clone()));
    }

    #[tokio::test]
    async fn test_connect_sends_greeting() {
        let state = state();
        let (sender, receiver) = flume::unbounded();
        let id = Uuid::new_v4();

        state.write().await.connect(id, sender);

        assert_eq!(
            packets(&receiver),
            vec![
                ResponsePacket::RandomLetter { letter: None },
                ResponsePacket::ScoreUpdate {
                    player_id: id,
                    score: 0
                },
            ]
        );
        assert_eq!(state.read().await.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_deliveries_keep_handler_order() {
        let state = state();
        let (sender, receiver) = flume::unbounded();
        let id = Uuid::new_v4();
        let mut state = state.write().await;
        state.connect(id, sender);
        receiver.drain().for_each(drop);

        state.handle(
            id,
            RequestPacket::CreateRoom {
                nick_name: "ada".to_string(),
                winning_score: 1,
            },
        );
        state.handle(id, RequestPacket::IncrementScore);

        let kinds: Vec<_> = packets(&receiver)
            .into_iter()
            .map(|packet| match packet {
                ResponsePacket::CreateRoom { .. } => "createRoom",
                ResponsePacket::OpponentUpdate { .. } => "opponentUpdate",
                ResponsePacket::LetterUpdate { .. } => "letterUpdate",
                ResponsePacket::ScoreUpdate { .. } => "scoreUpdate",
                ResponsePacket::Win { .. } => "win",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "createRoom",
                "opponentUpdate",
                "letterUpdate",
                "scoreUpdate",
                "letterUpdate",
                "win"
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_receiver_is_tolerated() {
        let state = state();
        let (host_sender, host_receiver) = flume::unbounded();
        let (guest_sender, guest_receiver) = flume::unbounded();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut state = state.write().await;
        state.connect(host, host_sender);
        state.connect(guest, guest_sender);
        drop(guest_receiver);

        state.handle(
            host,
            RequestPacket::CreateRoom {
                nick_name: "ada".to_string(),
                winning_score: 2,
            },
        );
        state.handle(host, RequestPacket::IncrementScore);

        assert!(!packets(&host_receiver).is_empty());
    }

    #[tokio::test]
    async fn test_stalled_connection_is_dropped() {
        let state = state();
        let (racer_sender, racer_receiver) = outbound_queue();
        let (watcher_sender, watcher_receiver) = outbound_queue();
        let racer = Uuid::new_v4();
        let watcher = Uuid::new_v4();
        let mut state = state.write().await;
        state.connect(racer, racer_sender);
        state.connect(watcher, watcher_sender);
        state.handle(
            racer,
            RequestPacket::CreateRoom {
                nick_name: "ada".to_string(),
                winning_score: 100,
            },
        );

        // Every point is broadcast to the watcher, which never reads.
        for _ in 0..(OUTBOUND_QUEUE_CAPACITY * 2) {
            state.handle(racer, RequestPacket::IncrementScore);
            racer_receiver.drain().for_each(drop);
        }

        assert!(watcher_receiver.len() <= OUTBOUND_QUEUE_CAPACITY);
        assert_eq!(state.connection_count(), 1);
        assert!(state.game.registry().get(watcher).is_none());
        assert!(state.game.registry().get(racer).is_some());
        watcher_receiver.drain().for_each(drop);
        assert!(watcher_receiver.is_disconnected());
    }

    #[tokio::test]
    async fn test_disconnect_drops_sender() {
        let state = state();
        let (sender, receiver) = flume::unbounded();
        let id = Uuid::new_v4();
        let mut state = state.write().await;
        state.connect(id, sender);

        state.disconnect(id);

        assert_eq!(state.connection_count(), 0);
        assert!(state.game.registry().get(id).is_none());
        receiver.drain().for_each(drop);
        assert!(receiver.is_disconnected());
    }
}
