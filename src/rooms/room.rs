//! Room and player state

use std::time::Duration;

use crate::ws::protocol::{ConnectionId, PlayerSlot, Scores};

/// Score target used when the creator does not ask for one
pub const DEFAULT_SCORE_TARGET: u32 = 7;

/// Upper bound for a requested score target
pub const MAX_SCORE_TARGET: u32 = 15;

/// Room lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    /// Zero or one seated player, or two players not both ready
    Waiting,
    /// Both players ready, match running
    Playing,
    /// Terminal; deleted once vacated or swept
    Ended,
}

/// Tunables for the room store
#[derive(Debug, Clone, Copy)]
pub struct RoomSettings {
    pub default_score_target: u32,
    pub max_score_target: u32,
    pub code_length: usize,
    /// Waiting/ended rooms older than this are swept
    pub max_room_age: Duration,
    /// Players in a running match silent for longer than this are dropped
    pub heartbeat_timeout: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            default_score_target: DEFAULT_SCORE_TARGET,
            max_score_target: MAX_SCORE_TARGET,
            code_length: super::code::DEFAULT_ROOM_CODE_LEN,
            max_room_age: Duration::from_secs(60 * 60),
            heartbeat_timeout: Duration::from_secs(60),
        }
    }
}

impl RoomSettings {
    /// Clamp a requested target into `[default, max]`
    pub fn clamp_score_target(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_score_target)
            .clamp(self.default_score_target, self.max_score_target)
    }
}

/// A connection seated in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub connection_id: ConnectionId,
    pub slot: PlayerSlot,
    pub ready: bool,
    pub last_heartbeat_at: u64,
}

impl Player {
    pub fn new(connection_id: ConnectionId, slot: PlayerSlot, now: u64) -> Self {
        Self {
            connection_id,
            slot,
            ready: false,
            last_heartbeat_at: now,
        }
    }
}

/// A two-seat game room
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    /// Host seat (slot one)
    pub slot_a: Option<Player>,
    pub slot_b: Option<Player>,
    pub status: RoomStatus,
    pub created_at: u64,
    pub scores: Scores,
    pub score_target: u32,
}

impl Room {
    pub fn new(id: String, score_target: u32, now: u64) -> Self {
        Self {
            id,
            slot_a: None,
            slot_b: None,
            status: RoomStatus::Waiting,
            created_at: now,
            scores: Scores::default(),
            score_target,
        }
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&Player> {
        match slot {
            PlayerSlot::One => self.slot_a.as_ref(),
            PlayerSlot::Two => self.slot_b.as_ref(),
        }
    }

    fn seat_mut(&mut self, slot: PlayerSlot) -> &mut Option<Player> {
        match slot {
            PlayerSlot::One => &mut self.slot_a,
            PlayerSlot::Two => &mut self.slot_b,
        }
    }

    pub fn player_mut(&mut self, slot: PlayerSlot) -> Option<&mut Player> {
        self.seat_mut(slot).as_mut()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.slot_a.iter().chain(self.slot_b.iter())
    }

    pub fn slot_of(&self, connection_id: ConnectionId) -> Option<PlayerSlot> {
        self.players()
            .find(|p| p.connection_id == connection_id)
            .map(|p| p.slot)
    }

    /// Connection seated opposite `slot`
    pub fn opponent(&self, slot: PlayerSlot) -> Option<ConnectionId> {
        self.player(slot.other()).map(|p| p.connection_id)
    }

    /// First free seat, slot one preferred
    pub fn free_slot(&self) -> Option<PlayerSlot> {
        if self.slot_a.is_none() {
            Some(PlayerSlot::One)
        } else if self.slot_b.is_none() {
            Some(PlayerSlot::Two)
        } else {
            None
        }
    }

    pub fn seat(&mut self, player: Player) {
        let slot = player.slot;
        *self.seat_mut(slot) = Some(player);
    }

    pub fn vacate(&mut self, slot: PlayerSlot) -> Option<Player> {
        self.seat_mut(slot).take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_a.is_none() && self.slot_b.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.slot_a.is_some() && self.slot_b.is_some()
    }

    pub fn both_ready(&self) -> bool {
        matches!((&self.slot_a, &self.slot_b), (Some(a), Some(b)) if a.ready && b.ready)
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.players().map(|p| p.connection_id).collect()
    }
}
