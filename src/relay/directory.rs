use std::collections::HashMap;

use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::error::{RaceError, Result};
use crate::relay::room::{generate_room_code, Room};

/// All rooms the server knows about, keyed by room code.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
}

impl RoomDirectory {
    pub fn new() -> RoomDirectory {
        RoomDirectory::default()
    }

    /// Create a room with `host` as its only member.
    ///
    /// Codes are drawn until one is found that no live room uses, so a
    /// collision never replaces an existing race.
    ///
    /// # Arguments
    ///
    /// * `host` - The connection creating the room.
    /// * `winning_score` - The score that ends the race, also the length of
    ///   the letter sequence.
    /// * `rng` - Source for the room code and letters.
    pub fn create_room<R: Rng + ?Sized>(
        &mut self,
        host: Uuid,
        winning_score: usize,
        rng: &mut R,
    ) -> &Room {
        let mut room_id = generate_room_code(rng);
        while self.rooms.contains_key(&room_id) {
            debug!("Room code {room_id} is taken, drawing another");
            room_id = generate_room_code(rng);
        }

        let room = Room::new(room_id.clone(), host, winning_score, rng);
        self.rooms.entry(room_id).or_insert(room)
    }

    /// Add `player_id` to the room with the given code.
    ///
    /// Returns `RaceError::RoomNotFound` without touching any state when the
    /// code is unknown.
    pub fn join_room(&mut self, player_id: Uuid, room_id: &str) -> Result<&Room> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Err(RaceError::RoomNotFound {
                room_id: room_id.to_string(),
            });
        };

        room.add_member(player_id);
        Ok(room)
    }

    /// Remove `player_id` from a room, deleting the room once it is empty.
    ///
    /// Returns `true` if the room was deleted.
    pub fn leave(&mut self, player_id: Uuid, room_id: &str) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };

        room.remove_member(player_id);

        if room.is_empty() {
            self.rooms.remove(room_id);
            debug!("Room {room_id} closed");
            return true;
        }
        false
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
