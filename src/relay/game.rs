use std::str::FromStr;

use clap::ValueEnum;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RaceError;
use crate::relay::directory::RoomDirectory;
use crate::relay::outbox::{Outbox, Target};
use crate::relay::player::Registry;
use crate::relay::{PlayerView, RequestPacket, ResponsePacket};

/// Where score updates are broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScoreScope {
    /// Every connected player, including other rooms.
    #[default]
    Everyone,
    /// Only the members of the scoring player's room.
    Room,
}

impl FromStr for ScoreScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "everyone" => Ok(ScoreScope::Everyone),
            "room" => Ok(ScoreScope::Room),
            other => Err(format!("unknown score scope '{other}'")),
        }
    }
}

/// Tunables for a [`Game`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOptions {
    pub score_scope: ScoreScope,
    /// Upper bound for a room's winning score.
    pub max_winning_score: usize,
}

impl GameOptions {
    pub const DEFAULT_MAX_WINNING_SCORE: usize = 100;
}

impl Default for GameOptions {
    fn default() -> Self {
        GameOptions {
            score_scope: ScoreScope::default(),
            max_winning_score: GameOptions::DEFAULT_MAX_WINNING_SCORE,
        }
    }
}

/// The race coordinator.
///
/// `Game` owns every player and room. Each entry point handles one inbound
/// action to completion and returns the deliveries it produced; nothing is
/// sent from in here, which keeps the whole state machine synchronous.
#[derive(Debug)]
pub struct Game {
    pub(crate) registry: Registry,
    pub(crate) directory: RoomDirectory,
    pub(crate) rng: StdRng,
    pub(crate) options: GameOptions,
}

impl Game {
    pub fn new(options: GameOptions) -> Game {
        Game::with_rng(options, StdRng::from_entropy())
    }

    /// Create a game drawing codes and letters from `rng`.
    pub fn with_rng(options: GameOptions, rng: StdRng) -> Game {
        Game {
            registry: Registry::new(),
            directory: RoomDirectory::new(),
            rng,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Register a new connection.
    ///
    /// The connection is told its (empty) starting letter and its score.
    pub fn connect(&mut self, player_id: Uuid) -> Outbox {
        let mut outbox = Outbox::new();
        let score = self.registry.connect(player_id).score;

        outbox.push(
            vec![player_id],
            ResponsePacket::RandomLetter { letter: None },
        );
        outbox.push(
            vec![player_id],
            ResponsePacket::ScoreUpdate { player_id, score },
        );
        outbox
    }

    /// Drop a connection and clean up the room it was in.
    pub fn disconnect(&mut self, player_id: Uuid) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(player) = self.registry.disconnect(player_id) else {
            return outbox;
        };

        if let Some(room_id) = player.room_id {
            self.leave_room(player_id, &room_id, &mut outbox);
        }
        outbox
    }

    /// Dispatch an inbound action from `player_id`.
    pub fn handle(&mut self, player_id: Uuid, packet: RequestPacket) -> Outbox {
        if self.registry.get(player_id).is_none() {
            debug!("{}", RaceError::PlayerNotFound { player_id });
            return Outbox::new();
        }

        match packet {
            RequestPacket::IncrementScore => self.increment_score(player_id),
            RequestPacket::SetNickName { nick_name, room_id } => {
                self.set_nick_name(player_id, nick_name, room_id)
            }
            RequestPacket::CreateRoom {
                nick_name,
                winning_score,
            } => self.create_room(player_id, nick_name, winning_score),
            RequestPacket::JoinRoom { nick_name, room_id } => {
                self.join_room(player_id, nick_name, room_id)
            }
            RequestPacket::OpponentUpdate => self.opponent_update(player_id),
        }
    }

    /// Open a new room hosted by `player_id`.
    ///
    /// A host that is already racing leaves that room first. The winning
    /// score is clamped into `1..=max_winning_score`.
    ///
    /// # Arguments
    ///
    /// * `player_id` - The connection creating the room.
    /// * `nick_name` - The host's display name.
    /// * `winning_score` - The requested score that ends the race.
    pub fn create_room(&mut self, player_id: Uuid, nick_name: String, winning_score: usize) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(previous) = self.registry.get(player_id).map(|p| p.room_id.clone()) else {
            return outbox;
        };
        // A player races in one room at a time
        if let Some(previous) = previous {
            self.leave_room(player_id, &previous, &mut outbox);
        }

        let winning_score = winning_score.clamp(1, self.options.max_winning_score.max(1));
        let room = self
            .directory
            .create_room(player_id, winning_score, &mut self.rng);
        let room_id = room.id.clone();
        let letters = room.letters.clone();

        if let Some(player) = self.registry.get_mut(player_id) {
            player.nick_name = nick_name.clone();
            player.room_id = Some(room_id.clone());
            player.reset();
        }
        info!(%player_id, %room_id, winning_score, "Room created");

        // Hand the host the code and the sequence, then its first letter
        outbox.push(
            vec![player_id],
            ResponsePacket::CreateRoom {
                room_id: room_id.clone(),
                nick_name,
                letter_array: letters.clone(),
            },
        );
        let players = self.roster(&room_id);
        self.emit(
            &mut outbox,
            Target::Room(room_id),
            ResponsePacket::OpponentUpdate { players },
        );
        if let Some(letter) = letters.first().copied() {
            outbox.push(vec![player_id], ResponsePacket::LetterUpdate { letter });
        }
        outbox
    }

    /// Add `player_id` to an existing room.
    ///
    /// Unknown codes are answered with `roomNotFound` to the requester only
    /// and leave every player and room untouched.
    ///
    /// # Arguments
    ///
    /// * `player_id` - The connection joining.
    /// * `nick_name` - The joiner's display name.
    /// * `room_id` - The code of the room to join.
    pub fn join_room(&mut self, player_id: Uuid, nick_name: String, room_id: String) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(previous) = self.registry.get(player_id).map(|p| p.room_id.clone()) else {
            return outbox;
        };

        let (winning_score, first_letter) = match self.directory.join_room(player_id, &room_id) {
            Ok(room) => (room.winning_score, room.first_letter()),
            Err(error) => {
                debug!(%player_id, "{error}");
                outbox.push(vec![player_id], ResponsePacket::RoomNotFound);
                return outbox;
            }
        };

        // Only leave the old room once the new one is known to exist
        if let Some(previous) = previous.filter(|previous| *previous != room_id) {
            self.leave_room(player_id, &previous, &mut outbox);
        }

        if let Some(player) = self.registry.get_mut(player_id) {
            player.nick_name = nick_name.clone();
            player.room_id = Some(room_id.clone());
            player.reset();
        }
        info!(%player_id, %room_id, "Player joined room");

        self.emit(
            &mut outbox,
            Target::Room(room_id.clone()),
            ResponsePacket::SetNickName {
                player_id,
                nick_name,
                room_id: room_id.clone(),
                current_letter: first_letter,
                winning_score,
            },
        );
        let players = self.roster(&room_id);
        self.emit(
            &mut outbox,
            Target::Room(room_id),
            ResponsePacket::OpponentUpdate { players },
        );
        if let Some(letter) = first_letter {
            outbox.push(vec![player_id], ResponsePacket::LetterUpdate { letter });
        }
        outbox
    }

    /// Rename `player_id`.
    ///
    /// A non-empty `room_id` naming a room the player is not in turns the
    /// rename into a join.
    ///
    /// # Arguments
    ///
    /// * `player_id` - The connection being renamed.
    /// * `nick_name` - The new display name.
    /// * `room_id` - An optional room code, empty for none.
    pub fn set_nick_name(&mut self, player_id: Uuid, nick_name: String, room_id: String) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(player) = self.registry.get_mut(player_id) else {
            return outbox;
        };

        if !room_id.is_empty() && player.room_id.as_deref() != Some(room_id.as_str()) {
            return self.join_room(player_id, nick_name, room_id);
        }

        player.nick_name = nick_name.clone();
        let score_index = player.score_index;
        let current_room = player.room_id.clone();

        let Some(room) = current_room.as_deref().and_then(|id| self.directory.get(id)) else {
            // Roomless players only hear their own echo
            outbox.push(
                vec![player_id],
                ResponsePacket::SetNickName {
                    player_id,
                    nick_name,
                    room_id: String::new(),
                    current_letter: None,
                    winning_score: 0,
                },
            );
            return outbox;
        };

        let room_id = room.id.clone();
        let packet = ResponsePacket::SetNickName {
            player_id,
            nick_name,
            room_id: room_id.clone(),
            current_letter: room.letter_at(score_index),
            winning_score: room.winning_score,
        };
        self.emit(&mut outbox, Target::Room(room_id.clone()), packet);
        let players = self.roster(&room_id);
        self.emit(
            &mut outbox,
            Target::Room(room_id),
            ResponsePacket::OpponentUpdate { players },
        );
        outbox
    }

    /// Answer a roster poll with the players of the requester's room.
    pub fn opponent_update(&mut self, player_id: Uuid) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(player) = self.registry.get(player_id) else {
            return outbox;
        };

        let players = match &player.room_id {
            Some(room_id) => self.roster(room_id),
            None => Vec::new(),
        };
        outbox.push(vec![player_id], ResponsePacket::OpponentUpdate { players });
        outbox
    }

    /// The roster of a room, in join order.
    pub fn roster(&self, room_id: &str) -> Vec<PlayerView> {
        let Some(room) = self.directory.get(room_id) else {
            return Vec::new();
        };

        room.members
            .iter()
            .filter_map(|id| self.registry.get(*id))
            .map(|player| PlayerView {
                player_id: player.id,
                nick_name: player.nick_name.clone(),
                score: player.score,
                room_id: room.id.clone(),
                current_letter: room.letter_at(player.score_index),
                winning_score: room.winning_score,
            })
            .collect()
    }

    /// Remove `player_id` from `room_id` and tell whoever is left.
    pub(crate) fn leave_room(&mut self, player_id: Uuid, room_id: &str, outbox: &mut Outbox) {
        if let Some(player) = self.registry.get_mut(player_id) {
            if player.room_id.as_deref() == Some(room_id) {
                player.room_id = None;
                player.reset();
            }
        }

        if self.directory.leave(player_id, room_id) {
            info!(%room_id, "Room closed");
            return;
        }

        if self.directory.contains(room_id) {
            let players = self.roster(room_id);
            self.emit(
                outbox,
                Target::Room(room_id.to_string()),
                ResponsePacket::OpponentUpdate { players },
            );
        }
    }

    /// Resolve `target` to connection ids.
    pub(crate) fn recipients(&self, target: &Target) -> Vec<Uuid> {
        match target {
            Target::Connection(id) => vec![*id],
            Target::Room(room_id) => self
                .directory
                .get(room_id)
                .map(|room| room.members.clone())
                .unwrap_or_default(),
            Target::Everyone => self.registry.ids().collect(),
        }
    }

    pub(crate) fn emit(&self, outbox: &mut Outbox, target: Target, packet: ResponsePacket) {
        outbox.push(self.recipients(&target), packet);
    }

    pub(crate) fn emit_deferred(&self, outbox: &mut Outbox, target: Target, packet: ResponsePacket) {
        outbox.defer(self.recipients(&target), packet);
    }
}
