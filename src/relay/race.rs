//! Score progression and win detection.
//!
//! Every member of a room walks the same letter sequence with their own
//! cursor. A point advances the cursor by one letter; reaching the room's
//! winning score ends the race, resets the room and deals a new sequence.

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RaceError;
use crate::relay::game::{Game, ScoreScope};
use crate::relay::outbox::{Outbox, Target};
use crate::relay::ResponsePacket;

impl Game {
    /// Award `player_id` one point.
    ///
    /// Players that are unknown or not in a room are ignored. The score update
    /// goes out to the configured [`ScoreScope`]. On a win the `win` packet is
    /// deferred behind the fresh letters for every member.
    ///
    /// # Arguments
    ///
    /// * `player_id` - The connection that typed the right letter.
    pub fn increment_score(&mut self, player_id: Uuid) -> Outbox {
        let mut outbox = Outbox::new();

        let Some(room_id) = self
            .registry
            .get(player_id)
            .and_then(|player| player.room_id.clone())
        else {
            debug!("{}", RaceError::NotInRoom { player_id });
            return outbox;
        };
        let Some(room) = self.directory.get(&room_id) else {
            debug!("{}", RaceError::RoomNotFound { room_id });
            return outbox;
        };
        let winning_score = room.winning_score;
        let last_index = room.last_index();

        // Award the point and move the cursor unless the race is over
        let Some(player) = self.registry.get_mut(player_id) else {
            return outbox;
        };
        player.score += 1;
        let score = player.score;
        let won = score >= winning_score;

        let mut next_index = None;
        if !won && player.score_index < last_index {
            player.score_index += 1;
            next_index = Some(player.score_index);
        }

        let scope = match self.options.score_scope {
            ScoreScope::Everyone => Target::Everyone,
            ScoreScope::Room => Target::Room(room_id.clone()),
        };
        self.emit(
            &mut outbox,
            scope,
            ResponsePacket::ScoreUpdate { player_id, score },
        );

        // The scorer alone gets its next letter
        if won {
            self.finish_race(player_id, &room_id, &mut outbox);
        } else if let Some(letter) = next_index.and_then(|index| {
            self.directory
                .get(&room_id)
                .and_then(|room| room.letter_at(index))
        }) {
            outbox.push(vec![player_id], ResponsePacket::LetterUpdate { letter });
        }

        outbox
    }

    /// Reset every member of `room_id` and deal a new sequence.
    fn finish_race(&mut self, winner: Uuid, room_id: &str, outbox: &mut Outbox) {
        let nick_name = self
            .registry
            .get(winner)
            .map(|player| player.nick_name.clone())
            .unwrap_or_default();

        let Some(room) = self.directory.get_mut(room_id) else {
            return;
        };
        // New race: new letters, every member back to the start
        room.regenerate(&mut self.rng);
        let members = room.members.clone();
        let first_letter = room.first_letter();

        for id in &members {
            if let Some(player) = self.registry.get_mut(*id) {
                player.reset();
            }
        }
        info!(%room_id, %winner, %nick_name, "Race won");

        if let Some(letter) = first_letter {
            for id in &members {
                outbox.push(vec![*id], ResponsePacket::LetterUpdate { letter });
            }
        }
        self.emit_deferred(
            outbox,
            Target::Room(room_id.to_string()),
            ResponsePacket::Win { nick_name },
        );
    }
}
