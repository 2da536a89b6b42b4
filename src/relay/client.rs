use axum::extract::ws::Message;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::relay::appstate::{AppState, Sender};
use crate::relay::RequestPacket;

/// This struct represents a single client connection to the server.
///
/// A `Client` only remembers its connection id. The player record, its room
/// and the outbound queue all live in the shared [`AppState`], keyed by that
/// id.
#[derive(Debug)]
pub struct Client {
    id: Uuid,
}

impl Client {
    /// Registers a fresh connection and returns its `Client`.
    ///
    /// The connection gets a new v4 id and its greeting is queued on
    /// `sender` before this returns.
    ///
    /// # Arguments
    ///
    /// * `server` - The shared state the connection registers with.
    /// * `sender` - The connection's outbound queue.
    pub async fn connect(server: &RwLock<AppState>, sender: Sender) -> Client {
        let id = Uuid::new_v4();
        server.write().await.connect(id, sender);
        Client { id }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handles an incoming message from the client.
    ///
    /// Text frames are parsed as a [`RequestPacket`] and run against the
    /// shared state. Frames that fail to parse, binary frames and control
    /// frames are logged and otherwise ignored.
    ///
    /// # Arguments
    ///
    /// * `server` - The shared state to run the packet against.
    /// * `message` - The frame received from the client.
    pub async fn handle_message(&mut self, server: &RwLock<AppState>, message: Message) {
        match message {
            Message::Text(text) => {
                // Parse the packet
                let packet: RequestPacket = match serde_json::from_str(&text) {
                    Ok(packet) => packet,
                    Err(error) => {
                        debug!(player_id = %self.id, "Ignoring malformed packet: {}", error);
                        return;
                    }
                };
                debug!(player_id = %self.id, "Got packet {:?}", packet);

                // Run it and queue the results while holding the lock
                server.write().await.handle(self.id, packet);
            }
            Message::Binary(_) => {
                debug!(player_id = %self.id, "Ignoring binary message");
            }
            Message::Ping(_) => {
                debug!("Got Message Type Ping");
            }
            Message::Pong(_) => {
                debug!("Got Message Type Pong");
            }
            Message::Close(_) => {
                // The read loop ends right after; cleanup happens in handle_close
                debug!("Got Message Type Close");
            }
        }
    }

    /// Removes the client's player, and its room once nobody is left.
    pub async fn handle_close(&mut self, server: &RwLock<AppState>) {
        server.write().await.disconnect(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::game::GameOptions;
    use crate::relay::ResponsePacket;

    fn packets(receiver: &flume::Receiver<Message>) -> Vec<ResponsePacket> {
        receiver
            .drain()
            .filter_map(|message| match message {
                Message::Text(text) => serde_json::from_str(&text).ok(),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_room_over_text_frame() {
        let server = AppState::new(GameOptions::default());
        let (sender, receiver) = flume::unbounded();
        let mut client = Client::connect(&server, sender).await;
        assert_eq!(packets(&receiver).len(), 2);

        client
            .handle_message(
                &server,
                Message::Text(r#"{"type":"createRoom","nickName":"ada","winningScore":4}"#.to_string()),
            )
            .await;

        let packets = packets(&receiver);
        let Some(ResponsePacket::CreateRoom { letter_array, nick_name, .. }) = packets.first() else {
            panic!("expected createRoom, got {packets:?}");
        };
        assert_eq!(letter_array.len(), 4);
        assert_eq!(nick_name, "ada");
    }

    #[tokio::test]
    async fn test_malformed_frames_are_ignored() {
        let server = AppState::new(GameOptions::default());
        let (sender, receiver) = flume::unbounded();
        let mut client = Client::connect(&server, sender).await;
        receiver.drain().for_each(drop);

        for message in [
            Message::Text("not json".to_string()),
            Message::Text(r#"{"type":"joinRoom"}"#.to_string()),
            Message::Binary(vec![1, 2, 3]),
            Message::Ping(vec![]),
        ] {
            client.handle_message(&server, message).await;
        }

        assert!(packets(&receiver).is_empty());
        assert!(server.read().await.game.registry().get(client.id()).is_some());
    }

    #[tokio::test]
    async fn test_join_unknown_room_over_text_frame() {
        let server = AppState::new(GameOptions::default());
        let (sender, receiver) = flume::unbounded();
        let mut client = Client::connect(&server, sender).await;
        receiver.drain().for_each(drop);

        client
            .handle_message(
                &server,
                Message::Text(r#"{"type":"joinRoom","nickName":"bob","roomId":"NOPE00"}"#.to_string()),
            )
            .await;

        assert_eq!(packets(&receiver), vec![ResponsePacket::RoomNotFound]);
    }

    #[tokio::test]
    async fn test_handle_close() {
        let server = AppState::new(GameOptions::default());
        let (sender, _receiver) = flume::unbounded();
        let mut client = Client::connect(&server, sender).await;
        client
            .handle_message(
                &server,
                Message::Text(r#"{"type":"createRoom","nickName":"ada","winningScore":2}"#.to_string()),
            )
            .await;
        assert_eq!(server.read().await.game.directory().len(), 1);

        client.handle_close(&server).await;
        client.handle_close(&server).await;

        let server = server.read().await;
        assert!(server.game.directory().is_empty());
        assert!(server.game.registry().is_empty());
        assert_eq!(server.connection_count(), 0);
    }
}
