//! Room store and the operations that mutate it

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::util::time::SharedClock;
use crate::ws::protocol::{ConnectionId, ErrorCode, PlayerSlot, Scores, Side};

use super::code::{generate_room_code, normalize_room_code};
use super::room::{Player, Room, RoomSettings, RoomStatus};

/// Domain errors returned by room operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,

    #[error("Game already in progress")]
    InProgress,

    #[error("Game has ended")]
    Ended,

    #[error("Room is full")]
    Full,

    #[error("Already in another room")]
    AlreadyInAnotherRoom,

    #[error("Not in a room")]
    NotInRoom,

    #[error("Only the host can do that")]
    NotHost,

    #[error("Game has not started")]
    NotStarted,
}

impl RoomError {
    pub fn code(self) -> ErrorCode {
        match self {
            RoomError::NotFound => ErrorCode::RoomNotFound,
            RoomError::InProgress => ErrorCode::GameInProgress,
            RoomError::Ended => ErrorCode::GameEnded,
            RoomError::Full => ErrorCode::RoomFull,
            RoomError::AlreadyInAnotherRoom => ErrorCode::AlreadyInAnotherRoom,
            RoomError::NotInRoom => ErrorCode::NotInRoom,
            RoomError::NotHost => ErrorCode::NotHost,
            RoomError::NotStarted => ErrorCode::GameNotStarted,
        }
    }
}

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub room: Room,
    pub slot: PlayerSlot,
    pub opponent: Option<ConnectionId>,
}

/// Result of marking a player ready
#[derive(Debug, Clone)]
pub enum ReadyOutcome {
    /// Both seats ready; the room is now playing
    BothReady { room: Room },
    /// Still waiting on the other seat
    Waiting { opponent: Option<ConnectionId> },
}

/// Result of an accepted goal report
#[derive(Debug, Clone)]
pub struct GoalOutcome {
    pub scorer: Side,
    pub scores: Scores,
    /// Set when the goal reached the score target
    pub winner: Option<Side>,
    pub players: Vec<ConnectionId>,
}

/// Result of a leave
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    /// Room as it was right after the player was removed
    pub room: Room,
    pub slot: PlayerSlot,
    pub opponent: Option<ConnectionId>,
    pub room_deleted: bool,
}

/// Where a connection is seated, for relay decisions
#[derive(Debug, Clone)]
pub struct Seat {
    pub room_id: String,
    pub slot: PlayerSlot,
    pub status: RoomStatus,
    pub opponent: Option<ConnectionId>,
}

/// A player dropped for missing heartbeats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedOutPlayer {
    pub connection_id: ConnectionId,
    pub room_id: String,
    /// Remaining player to notify, if any
    pub opponent: Option<ConnectionId>,
}

/// What a sweep pass removed
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub expired_rooms: Vec<String>,
    /// Bindings released because their room expired
    pub released: Vec<ConnectionId>,
    pub timed_out: Vec<TimedOutPlayer>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired_rooms.is_empty() && self.timed_out.is_empty()
    }
}

/// Counts for the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub rooms: usize,
    pub players: usize,
    pub playing: usize,
}

/// Store of all live rooms and connection bindings.
///
/// Each operation on a room runs under that room's map entry lock. Locks are
/// always taken rooms first, then bindings; a bindings guard is never held
/// while a rooms guard is acquired.
pub struct RoomManager {
    rooms: DashMap<String, Room>,
    bindings: DashMap<ConnectionId, String>,
    settings: RoomSettings,
    clock: SharedClock,
}

impl RoomManager {
    pub fn new(settings: RoomSettings, clock: SharedClock) -> Self {
        Self {
            rooms: DashMap::new(),
            bindings: DashMap::new(),
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    /// Create an empty waiting room.
    ///
    /// A custom id that is blank or already taken falls back to a generated
    /// code; this never fails.
    pub fn create(&self, custom_id: Option<&str>, score_target: Option<u32>) -> Room {
        let now = self.clock.now_millis();
        let score_target = self.settings.clamp_score_target(score_target);

        if let Some(custom) = custom_id.map(normalize_room_code).filter(|id| !id.is_empty()) {
            if let Entry::Vacant(slot) = self.rooms.entry(custom.clone()) {
                let room = Room::new(custom, score_target, now);
                slot.insert(room.clone());
                info!(room_id = %room.id, score_target, "Room created");
                return room;
            }
            debug!(room_id = %custom, "Requested room id taken, generating one");
        }

        loop {
            let code = generate_room_code(self.settings.code_length);
            if let Entry::Vacant(slot) = self.rooms.entry(code.clone()) {
                let room = Room::new(code, score_target, now);
                slot.insert(room.clone());
                info!(room_id = %room.id, score_target, "Room created");
                return room;
            }
        }
    }

    /// Seat a connection in a room, slot one first
    pub fn join(&self, room_id: &str, connection_id: ConnectionId) -> Result<JoinOutcome, RoomError> {
        let room_id = normalize_room_code(room_id);
        let bound_to = self.room_of(connection_id);
        let now = self.clock.now_millis();

        let mut room = self.rooms.get_mut(&room_id).ok_or(RoomError::NotFound)?;

        match room.status {
            RoomStatus::Playing => return Err(RoomError::InProgress),
            RoomStatus::Ended => return Err(RoomError::Ended),
            RoomStatus::Waiting => {}
        }

        if bound_to.as_deref() == Some(room_id.as_str()) {
            if let Some(slot) = room.slot_of(connection_id) {
                if let Some(player) = room.player_mut(slot) {
                    player.ready = false;
                    player.last_heartbeat_at = now;
                }
                debug!(room_id = %room_id, connection_id = %connection_id, "Player re-joined own room");
                return Ok(JoinOutcome {
                    opponent: room.opponent(slot),
                    room: room.clone(),
                    slot,
                });
            }
        }

        let slot = room.free_slot().ok_or(RoomError::Full)?;

        if bound_to.is_some() {
            return Err(RoomError::AlreadyInAnotherRoom);
        }

        room.seat(Player::new(connection_id, slot, now));
        self.bindings.insert(connection_id, room_id.clone());

        info!(room_id = %room_id, connection_id = %connection_id, slot = %slot, "Player joined room");

        Ok(JoinOutcome {
            opponent: room.opponent(slot),
            room: room.clone(),
            slot,
        })
    }

    /// Create a room and seat its creator as host
    pub fn host(
        &self,
        connection_id: ConnectionId,
        custom_id: Option<&str>,
        score_target: Option<u32>,
    ) -> Result<JoinOutcome, RoomError> {
        if self.bindings.contains_key(&connection_id) {
            return Err(RoomError::AlreadyInAnotherRoom);
        }

        let room = self.create(custom_id, score_target);
        self.join(&room.id, connection_id).map_err(|e| {
            self.rooms.remove_if(&room.id, |_, r| r.is_empty());
            e
        })
    }

    /// Mark the caller ready; starts the match once both seats are ready
    pub fn ready(&self, connection_id: ConnectionId) -> Result<ReadyOutcome, RoomError> {
        let room_id = self.room_of(connection_id).ok_or(RoomError::NotInRoom)?;
        let mut room = self.rooms.get_mut(&room_id).ok_or(RoomError::NotInRoom)?;

        match room.status {
            RoomStatus::Playing => return Err(RoomError::InProgress),
            RoomStatus::Ended => return Err(RoomError::Ended),
            RoomStatus::Waiting => {}
        }

        let slot = room.slot_of(connection_id).ok_or(RoomError::NotInRoom)?;
        if let Some(player) = room.player_mut(slot) {
            player.ready = true;
        }

        if room.both_ready() {
            room.status = RoomStatus::Playing;
            // Fresh heartbeat baseline for the match
            let now = self.clock.now_millis();
            if let Some(p) = room.slot_a.as_mut() {
                p.last_heartbeat_at = now;
            }
            if let Some(p) = room.slot_b.as_mut() {
                p.last_heartbeat_at = now;
            }
            info!(room_id = %room_id, "Both players ready, game started");
            return Ok(ReadyOutcome::BothReady { room: room.clone() });
        }

        Ok(ReadyOutcome::Waiting {
            opponent: room.opponent(slot),
        })
    }

    /// Apply a goal reported by the host
    pub fn report_goal(&self, connection_id: ConnectionId, scorer: Side) -> Result<GoalOutcome, RoomError> {
        let room_id = self.room_of(connection_id).ok_or(RoomError::NotInRoom)?;
        let mut room = self.rooms.get_mut(&room_id).ok_or(RoomError::NotInRoom)?;

        if room.status != RoomStatus::Playing {
            return Err(RoomError::NotStarted);
        }
        if room.slot_of(connection_id) != Some(PlayerSlot::One) {
            return Err(RoomError::NotHost);
        }

        let count = room.scores.increment(scorer);
        let winner = if count >= room.score_target {
            room.status = RoomStatus::Ended;
            Some(scorer)
        } else {
            None
        };

        info!(
            room_id = %room_id,
            scorer = %scorer,
            player1 = room.scores.player1,
            player2 = room.scores.player2,
            "Goal confirmed"
        );
        if let Some(winner) = winner {
            info!(room_id = %room_id, winner = %winner, "Game over");
        }

        Ok(GoalOutcome {
            scorer,
            scores: room.scores,
            winner,
            players: room.connection_ids(),
        })
    }

    /// Remove the caller from its room
    pub fn leave(&self, connection_id: ConnectionId) -> Result<LeaveOutcome, RoomError> {
        let (_, room_id) = self
            .bindings
            .remove(&connection_id)
            .ok_or(RoomError::NotInRoom)?;

        let outcome = {
            let mut room = self.rooms.get_mut(&room_id).ok_or(RoomError::NotInRoom)?;
            let slot = room.slot_of(connection_id).ok_or(RoomError::NotInRoom)?;
            room.vacate(slot);

            if !room.is_empty() && room.status == RoomStatus::Playing {
                room.status = RoomStatus::Ended;
                info!(room_id = %room_id, "Player left mid-game, room ended");
            }

            LeaveOutcome {
                opponent: room.opponent(slot),
                room: room.clone(),
                slot,
                room_deleted: false,
            }
        };

        let room_deleted = self
            .rooms
            .remove_if(&room_id, |_, room| room.is_empty())
            .is_some();
        if room_deleted {
            info!(room_id = %room_id, "Room deleted (empty)");
        }

        info!(room_id = %room_id, connection_id = %connection_id, "Player left room");

        Ok(LeaveOutcome {
            room_deleted,
            ..outcome
        })
    }

    /// Record a heartbeat; returns false when the caller is not seated
    pub fn heartbeat(&self, connection_id: ConnectionId) -> bool {
        let Some(room_id) = self.room_of(connection_id) else {
            return false;
        };
        let now = self.clock.now_millis();
        let Some(mut room) = self.rooms.get_mut(&room_id) else {
            return false;
        };
        let Some(slot) = room.slot_of(connection_id) else {
            return false;
        };
        if let Some(player) = room.player_mut(slot) {
            player.last_heartbeat_at = now;
        }
        true
    }

    /// Reclaim expired rooms and players that stopped sending heartbeats
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now_millis();
        let max_age = self.settings.max_room_age.as_millis() as u64;
        let timeout = self.settings.heartbeat_timeout.as_millis() as u64;
        let mut report = SweepReport::default();

        self.rooms.retain(|room_id, room| match room.status {
            RoomStatus::Waiting | RoomStatus::Ended => {
                if now.saturating_sub(room.created_at) <= max_age {
                    return true;
                }
                for player in room.players() {
                    self.bindings
                        .remove_if(&player.connection_id, |_, bound| bound == room_id);
                    report.released.push(player.connection_id);
                }
                report.expired_rooms.push(room_id.clone());
                false
            }
            RoomStatus::Playing => {
                let stale: Vec<PlayerSlot> = room
                    .players()
                    .filter(|p| now.saturating_sub(p.last_heartbeat_at) > timeout)
                    .map(|p| p.slot)
                    .collect();
                if stale.is_empty() {
                    return true;
                }

                for slot in &stale {
                    if let Some(player) = room.vacate(*slot) {
                        self.bindings
                            .remove_if(&player.connection_id, |_, bound| bound == room_id);
                        report.timed_out.push(TimedOutPlayer {
                            connection_id: player.connection_id,
                            room_id: room_id.clone(),
                            opponent: None,
                        });
                    }
                }
                room.status = RoomStatus::Ended;

                let remaining = room.players().next().map(|p| p.connection_id);
                for entry in report.timed_out.iter_mut().filter(|t| &t.room_id == room_id) {
                    entry.opponent = remaining;
                }

                !room.is_empty()
            }
        });

        if !report.is_empty() {
            info!(
                rooms_cleaned = report.expired_rooms.len(),
                players_timed_out = report.timed_out.len(),
                "Sweep completed"
            );
        }

        report
    }

    pub fn room(&self, room_id: &str) -> Option<Room> {
        self.rooms
            .get(&normalize_room_code(room_id))
            .map(|r| r.value().clone())
    }

    pub fn room_of(&self, connection_id: ConnectionId) -> Option<String> {
        self.bindings.get(&connection_id).map(|r| r.value().clone())
    }

    pub fn seat_of(&self, connection_id: ConnectionId) -> Option<Seat> {
        let room_id = self.room_of(connection_id)?;
        let room = self.rooms.get(&room_id)?;
        let slot = room.slot_of(connection_id)?;
        Some(Seat {
            slot,
            status: room.status,
            opponent: room.opponent(slot),
            room_id,
        })
    }

    pub fn slot_of(&self, connection_id: ConnectionId) -> Option<PlayerSlot> {
        self.seat_of(connection_id).map(|seat| seat.slot)
    }

    pub fn opponent_of(&self, connection_id: ConnectionId) -> Option<ConnectionId> {
        self.seat_of(connection_id).and_then(|seat| seat.opponent)
    }

    pub fn stats(&self) -> RoomStats {
        RoomStats {
            rooms: self.rooms.len(),
            players: self.bindings.len(),
            playing: self
                .rooms
                .iter()
                .filter(|r| r.status == RoomStatus::Playing)
                .count(),
        }
    }
}
