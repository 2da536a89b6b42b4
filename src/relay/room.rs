use rand::Rng;
use uuid::Uuid;

const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LETTER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Struct representing a single race.
///
/// A `Room` holds the ids of its members in join order, the score needed to
/// win and the letter sequence every member types through. The sequence
/// always has one letter per point, so its length equals `winning_score`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// The code clients use to join the room.
    pub id: String,
    /// Connection ids of the members, in join order.
    pub members: Vec<Uuid>,
    /// The score that ends the race.
    pub winning_score: usize,
    /// The shared letter sequence of the current race.
    pub letters: Vec<char>,
}

impl Room {
    /// Length of a generated room code.
    pub const CODE_LENGTH: usize = 6;

    /// Create a new room with `host` as its only member.
    ///
    /// # Arguments
    ///
    /// * `id` - The room code.
    /// * `host` - The connection that created the room.
    /// * `winning_score` - The score that ends the race.
    /// * `rng` - Source for the first letter sequence.
    pub fn new<R: Rng + ?Sized>(id: String, host: Uuid, winning_score: usize, rng: &mut R) -> Room {
        Room {
            id,
            members: vec![host],
            winning_score,
            letters: generate_letters(winning_score, rng),
        }
    }

    pub fn letter_at(&self, index: usize) -> Option<char> {
        self.letters.get(index).copied()
    }

    pub fn first_letter(&self) -> Option<char> {
        self.letter_at(0)
    }

    /// Index of the last letter in the sequence.
    pub fn last_index(&self) -> usize {
        self.letters.len().saturating_sub(1)
    }

    /// Replace the letter sequence with a fresh one of the same length.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.letters = generate_letters(self.winning_score, rng);
    }

    pub fn contains(&self, player_id: Uuid) -> bool {
        self.members.contains(&player_id)
    }

    /// Add a member. Returns `false` if they were already in the room.
    pub fn add_member(&mut self, player_id: Uuid) -> bool {
        if self.contains(player_id) {
            return false;
        }
        self.members.push(player_id);
        true
    }

    /// Remove a member. Returns `false` if they were not in the room.
    pub fn remove_member(&mut self, player_id: Uuid) -> bool {
        let Some(index) = self.members.iter().position(|id| *id == player_id) else {
            return false;
        };
        self.members.remove(index);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Generate a room code of uppercase letters and digits.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..Room::CODE_LENGTH)
        .map(|_| char::from(ROOM_CODE_CHARSET[rng.gen_range(0..ROOM_CODE_CHARSET.len())]))
        .collect()
}

/// Generate `length` random uppercase letters.
pub fn generate_letters<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Vec<char> {
    (0..length)
        .map(|_| char::from(LETTER_CHARSET[rng.gen_range(0..LETTER_CHARSET.len())]))
        .collect()
}
