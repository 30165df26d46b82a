//! Lobby view kept by the client session from server messages

use crate::ws::protocol::{ConnectionId, ErrorCode, PlayerSlot, ServerMsg};

/// Where the local player is in the room lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LobbyPhase {
    #[default]
    Idle,
    Creating,
    Joining,
    /// Seated, no opponent yet
    Waiting,
    OpponentJoined,
    /// Local player signalled ready
    Ready,
    Playing,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LobbyState {
    pub player_id: Option<ConnectionId>,
    pub room_id: Option<String>,
    pub slot: Option<PlayerSlot>,
    pub opponent_connected: bool,
    pub opponent_ready: bool,
    pub phase: LobbyPhase,
    pub last_error: Option<(ErrorCode, String)>,
}

impl LobbyState {
    pub fn is_host(&self) -> bool {
        self.slot.is_some_and(PlayerSlot::is_host)
    }

    /// Fold one server message into the view
    pub fn apply(&mut self, msg: &ServerMsg) {
        match msg {
            // A new connection id starts with no room on the server
            ServerMsg::Connected { player_id } => {
                *self = Self {
                    player_id: Some(*player_id),
                    ..Self::default()
                };
            }
            ServerMsg::RoomCreated { room_id, .. } => {
                self.room_id = Some(room_id.clone());
                self.phase = LobbyPhase::Waiting;
            }
            ServerMsg::RoomJoined {
                room_id,
                player_number,
            } => {
                self.room_id = Some(room_id.clone());
                self.slot = Some(*player_number);
                if self.phase != LobbyPhase::Waiting {
                    self.phase = LobbyPhase::OpponentJoined;
                }
            }
            ServerMsg::OpponentJoined { .. } => {
                self.opponent_connected = true;
                self.phase = LobbyPhase::OpponentJoined;
            }
            ServerMsg::OpponentLeft => {
                self.opponent_connected = false;
                self.opponent_ready = false;
                self.phase = match self.phase {
                    LobbyPhase::Playing | LobbyPhase::Ended => LobbyPhase::Ended,
                    _ => LobbyPhase::Waiting,
                };
            }
            ServerMsg::OpponentReady => self.opponent_ready = true,
            ServerMsg::GameStart { your_number } => {
                self.slot = Some(*your_number);
                self.phase = LobbyPhase::Playing;
            }
            ServerMsg::GameOver { .. } => self.phase = LobbyPhase::Ended,
            ServerMsg::Error { message, code } => {
                self.last_error = Some((*code, message.clone()));
                if matches!(self.phase, LobbyPhase::Creating | LobbyPhase::Joining) {
                    self.phase = LobbyPhase::Idle;
                }
            }
            ServerMsg::OpponentPaddle { .. }
            | ServerMsg::PuckUpdate { .. }
            | ServerMsg::GoalConfirmed { .. }
            | ServerMsg::Pong { .. } => {}
        }
    }

    pub(crate) fn begin_create(&mut self) {
        self.phase = LobbyPhase::Creating;
        self.last_error = None;
    }

    pub(crate) fn begin_join(&mut self) {
        self.phase = LobbyPhase::Joining;
        self.last_error = None;
    }

    pub(crate) fn mark_ready(&mut self) {
        self.phase = LobbyPhase::Ready;
    }

    /// Forget the room but keep the connection identity
    pub(crate) fn leave(&mut self) {
        *self = Self {
            player_id: self.player_id,
            ..Self::default()
        };
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}
