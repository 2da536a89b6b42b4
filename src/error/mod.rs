use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the race coordinator.
///
/// None of these are fatal. `RoomNotFound` is reported back to the
/// requesting connection, everything else is logged and dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RaceError {
    #[error("room '{room_id}' does not exist")]
    RoomNotFound { room_id: String },

    #[error("no player registered for connection {player_id}")]
    PlayerNotFound { player_id: Uuid },

    #[error("player {player_id} is not in a room")]
    NotInRoom { player_id: Uuid },
}

pub type Result<T> = std::result::Result<T, RaceError>;

/// Errors raised while assembling the server configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}
