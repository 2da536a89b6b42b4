pub mod appstate;
pub mod client;
pub mod directory;
pub mod game;
pub mod outbox;
pub mod player;
pub mod race;
pub mod room;
pub mod server;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actions a client can send to the server.
///
/// Packets travel as JSON text frames tagged by `type`, for example
/// `{"type": "joinRoom", "nickName": "ada", "roomId": "K3J9QZ"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RequestPacket {
    /// The player typed the current letter correctly.
    IncrementScore,
    /// Rename the player. A `room_id` other than the current room joins it.
    #[serde(rename_all = "camelCase")]
    SetNickName {
        nick_name: String,
        #[serde(default)]
        room_id: String,
    },
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        nick_name: String,
        winning_score: usize,
    },
    #[serde(rename_all = "camelCase")]
    JoinRoom { nick_name: String, room_id: String },
    /// Ask for the roster of the player's room.
    OpponentUpdate,
}

/// Notifications the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponsePacket {
    /// Sent once on connect. `letter` is `None` until the player is in a room.
    RandomLetter { letter: Option<char> },
    #[serde(rename_all = "camelCase")]
    ScoreUpdate { player_id: Uuid, score: usize },
    /// The next letter the receiving player has to type.
    LetterUpdate { letter: char },
    #[serde(rename_all = "camelCase")]
    Win { nick_name: String },
    #[serde(rename_all = "camelCase")]
    SetNickName {
        player_id: Uuid,
        nick_name: String,
        room_id: String,
        current_letter: Option<char>,
        winning_score: usize,
    },
    OpponentUpdate { players: Vec<PlayerView> },
    RoomNotFound,
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        room_id: String,
        nick_name: String,
        letter_array: Vec<char>,
    },
}

/// A roster entry as seen by the other players of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_id: Uuid,
    pub nick_name: String,
    pub score: usize,
    /// Empty when the player is not in a room.
    pub room_id: String,
    pub current_letter: Option<char>,
    pub winning_score: usize,
}
