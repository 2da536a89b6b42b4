use std::collections::HashMap;

use uuid::Uuid;

/// A connected player.
///
/// Players are created when their connection opens and dropped when it
/// closes. `room_id` is `None` until the player creates or joins a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: Uuid,
    pub nick_name: String,
    pub score: usize,
    pub room_id: Option<String>,
    /// Position in the room's letter sequence.
    pub score_index: usize,
}

impl Player {
    pub fn new(id: Uuid) -> Player {
        Player {
            id,
            nick_name: String::new(),
            score: 0,
            room_id: None,
            score_index: 0,
        }
    }

    /// Put the player back at the start of a race.
    pub fn reset(&mut self) {
        self.score = 0;
        self.score_index = 0;
    }
}

/// Maps every live connection to its player.
#[derive(Debug, Default)]
pub struct Registry {
    players: HashMap<Uuid, Player>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Register a connection. An id that is already known keeps its player.
    pub fn connect(&mut self, id: Uuid) -> &Player {
        self.players.entry(id).or_insert_with(|| Player::new(id))
    }

    /// Remove a connection and hand back its player, if it was registered.
    pub fn disconnect(&mut self, id: Uuid) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.players.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_creates_default_player() {
        let mut registry = Registry::new();
        let id = Uuid::new_v4();

        let player = registry.connect(id);

        assert_eq!(player, &Player::new(id));
        assert_eq!(player.score, 0);
        assert!(player.room_id.is_none());
        assert!(player.nick_name.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_connect_keeps_existing_player() {
        let mut registry = Registry::new();
        let id = Uuid::new_v4();
        registry.connect(id);
        registry.get_mut(id).unwrap().score = 4;

        assert_eq!(registry.connect(id).score, 4);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disconnect() {
        let mut registry = Registry::new();
        let id = Uuid::new_v4();
        registry.connect(id);

        assert_eq!(registry.disconnect(id).map(|p| p.id), Some(id));
        assert!(registry.get(id).is_none());
        assert!(registry.disconnect(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut player = Player::new(Uuid::new_v4());
        player.score = 3;
        player.score_index = 2;

        player.reset();

        assert_eq!(player.score, 0);
        assert_eq!(player.score_index, 0);
    }
}
