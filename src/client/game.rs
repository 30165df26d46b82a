//! Per-frame view of a networked match for the rendering layer

use crate::util::time::{MonotonicClock, SharedClock};
use crate::ws::protocol::{ClientMsg, PlayerSlot};

use super::interpolation::{InterpolationConfig, PaddleSmoother, SnapshotBuffer};

/// Positions to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bodies {
    pub puck: Option<(f64, f64)>,
    pub paddle1: Option<(f64, f64)>,
    pub paddle2: Option<(f64, f64)>,
}

/// Local seat plus the smoothed remote state
pub struct RemoteGame {
    slot: PlayerSlot,
    puck: SnapshotBuffer,
    opponent: PaddleSmoother,
    local_paddle: Option<(f64, f64)>,
}

impl RemoteGame {
    pub fn new(slot: PlayerSlot, clock: SharedClock) -> Self {
        Self::with_config(slot, InterpolationConfig::default(), PaddleSmoother::default(), clock)
    }

    /// Render timing on a monotonic clock
    pub fn for_slot(slot: PlayerSlot) -> Self {
        Self::new(slot, MonotonicClock::shared())
    }

    pub fn with_config(
        slot: PlayerSlot,
        interpolation: InterpolationConfig,
        opponent: PaddleSmoother,
        clock: SharedClock,
    ) -> Self {
        Self {
            slot,
            puck: SnapshotBuffer::new(interpolation, clock),
            opponent,
            local_paddle: None,
        }
    }

    pub fn slot(&self) -> PlayerSlot {
        self.slot
    }

    /// The host simulates the puck itself and ignores relayed puck updates
    pub fn is_host(&self) -> bool {
        self.slot.is_host()
    }

    /// Record the local paddle and build the message to forward
    pub fn move_paddle(&mut self, x: f64, y: f64) -> ClientMsg {
        self.local_paddle = Some((x, y));
        ClientMsg::PaddleMove { x, y }
    }

    pub fn on_puck_update(&mut self, x: f64, y: f64, vx: f64, vy: f64, seq: u64) -> bool {
        if self.is_host() {
            return false;
        }
        self.puck.add_snapshot(x, y, vx, vy, seq)
    }

    pub fn on_opponent_paddle(&mut self, x: f64, y: f64) {
        self.opponent.set_target(x, y);
    }

    /// Advance the opponent smoother one frame and report every body
    pub fn bodies(&mut self) -> Bodies {
        let puck = self.puck.interpolated_position();
        let opponent = self.opponent.step();
        let (paddle1, paddle2) = match self.slot {
            PlayerSlot::One => (self.local_paddle, opponent),
            PlayerSlot::Two => (opponent, self.local_paddle),
        };
        Bodies {
            puck,
            paddle1,
            paddle2,
        }
    }

    /// New point or new game: forget buffered puck history
    pub fn reset_point(&mut self) {
        self.puck.clear();
    }

    /// Opponent left: also forget its paddle
    pub fn reset(&mut self) {
        self.puck.clear();
        self.opponent.clear();
    }
}
