//! Room lifecycle: codes, seats, readiness, scoring, and expiry

pub mod code;
pub mod manager;
pub mod room;

pub use manager::{
    GoalOutcome, JoinOutcome, LeaveOutcome, ReadyOutcome, RoomError, RoomManager, RoomStats, Seat,
    SweepReport, TimedOutPlayer,
};
pub use room::{Player, Room, RoomSettings, RoomStatus};
