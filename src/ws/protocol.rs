//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque per-connection identity, minted on accept and never reused
pub type ConnectionId = Uuid;

/// Maximum size of a single inbound frame in bytes
pub const MAX_FRAME_BYTES: usize = 1024;

/// Transport read limit; anything larger closes the connection unread
pub const MAX_TRANSPORT_BYTES: usize = 16 * 1024;

/// Maximum length of a client-supplied room id
pub const MAX_ROOM_ID_LEN: usize = 16;

/// Player slot inside a room. Slot one is the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub fn number(self) -> u8 {
        match self {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }

    pub fn other(self) -> Self {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    pub fn is_host(self) -> bool {
        self == PlayerSlot::One
    }

    pub fn side(self) -> Side {
        match self {
            PlayerSlot::One => Side::Player1,
            PlayerSlot::Two => Side::Player2,
        }
    }
}

impl From<PlayerSlot> for u8 {
    fn from(slot: PlayerSlot) -> Self {
        slot.number()
    }
}

impl TryFrom<u8> for PlayerSlot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PlayerSlot::One),
            2 => Ok(PlayerSlot::Two),
            other => Err(format!("invalid player number {other}")),
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Scoring side as named on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player1,
    Player2,
}

impl Side {
    pub fn slot(self) -> PlayerSlot {
        match self {
            Side::Player1 => PlayerSlot::One,
            Side::Player2 => PlayerSlot::Two,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player1 => f.write_str("player1"),
            Side::Player2 => f.write_str("player2"),
        }
    }
}

/// Authoritative score pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub player1: u32,
    pub player2: u32,
}

impl Scores {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Player1 => self.player1,
            Side::Player2 => self.player2,
        }
    }

    /// Add one goal for `side` and return the new count
    pub fn increment(&mut self, side: Side) -> u32 {
        let counter = match side {
            Side::Player1 => &mut self.player1,
            Side::Player2 => &mut self.player2,
        };
        *counter = counter.saturating_add(1);
        *counter
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Create a room, optionally with a custom code and score target
    CreateRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score_to_win: Option<u32>,
    },

    /// Join an existing room by code
    JoinRoom { room_id: String },

    /// Leave the current room
    LeaveRoom,

    /// Mark this player ready
    Ready,

    /// Local paddle position, relayed to the opponent
    PaddleMove { x: f64, y: f64 },

    /// Host-only puck physics broadcast
    PuckState {
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
        seq: u64,
    },

    /// Host-only goal report
    GoalScored { scorer: Side },

    /// Heartbeat; the timestamp is echoed back for round-trip measurement
    #[serde(rename = "ping", alias = "heartbeat")]
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
}

impl ClientMsg {
    /// Semantic checks serde cannot express
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMsg::CreateRoom {
                room_id: Some(room_id),
                ..
            }
            | ClientMsg::JoinRoom { room_id } => validate_room_id(room_id),
            ClientMsg::PaddleMove { x, y } => {
                ensure_finite("x", *x)?;
                ensure_finite("y", *y)
            }
            ClientMsg::PuckState { x, y, vx, vy, .. } => {
                ensure_finite("x", *x)?;
                ensure_finite("y", *y)?;
                ensure_finite("vx", *vx)?;
                ensure_finite("vy", *vy)
            }
            _ => Ok(()),
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::CreateRoom { .. } => "create-room",
            ClientMsg::JoinRoom { .. } => "join-room",
            ClientMsg::LeaveRoom => "leave-room",
            ClientMsg::Ready => "ready",
            ClientMsg::PaddleMove { .. } => "paddle-move",
            ClientMsg::PuckState { .. } => "puck-state",
            ClientMsg::GoalScored { .. } => "goal-scored",
            ClientMsg::Ping { .. } => "ping",
        }
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), ProtocolError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::NonFinite(field))
    }
}

fn validate_room_id(room_id: &str) -> Result<(), ProtocolError> {
    let trimmed = room_id.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_ROOM_ID_LEN
        || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ProtocolError::InvalidRoomId);
    }
    Ok(())
}

/// Decode and validate one inbound text frame
pub fn decode_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    if text.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::TooLarge {
            size: text.len(),
            max: MAX_FRAME_BYTES,
        });
    }

    let msg: ClientMsg = serde_json::from_str(text)?;
    msg.validate()?;
    Ok(msg)
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Identity assigned to this connection
    Connected { player_id: ConnectionId },

    RoomCreated { room_id: String, score_to_win: u32 },

    RoomJoined {
        room_id: String,
        player_number: PlayerSlot,
    },

    OpponentJoined { opponent_id: ConnectionId },

    OpponentLeft,

    OpponentReady,

    /// Sent to each player separately with its own slot
    GameStart { your_number: PlayerSlot },

    OpponentPaddle { x: f64, y: f64 },

    PuckUpdate {
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
        seq: u64,
    },

    GoalConfirmed { scorer: Side, scores: Scores },

    GameOver { winner: Side, scores: Scores },

    Error { message: String, code: ErrorCode },

    /// Heartbeat acknowledgement
    #[serde(rename = "pong", alias = "heartbeat-ack")]
    Pong { timestamp: u64 },
}

impl ServerMsg {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            message: message.into(),
            code,
        }
    }
}

/// Machine-readable error codes carried by `ServerMsg::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimited,
    InvalidMessage,
    RoomNotFound,
    GameInProgress,
    GameEnded,
    RoomFull,
    AlreadyInAnotherRoom,
    NotInRoom,
    NotHost,
    GameNotStarted,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::GameInProgress => "GAME_IN_PROGRESS",
            ErrorCode::GameEnded => "GAME_ENDED",
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::AlreadyInAnotherRoom => "ALREADY_IN_ANOTHER_ROOM",
            ErrorCode::NotInRoom => "NOT_IN_ROOM",
            ErrorCode::NotHost => "NOT_HOST",
            ErrorCode::GameNotStarted => "GAME_NOT_STARTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an inbound frame is rejected before dispatch
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Message too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid message format: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Field `{0}` must be a finite number")]
    NonFinite(&'static str),

    #[error("Invalid room id")]
    InvalidRoomId,

    #[error("Binary frames are not supported")]
    Binary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_create_room_with_optional_fields() {
        let msg = decode_client_msg(r#"{"type":"create-room","roomId":"abc","scoreToWin":9}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMsg::CreateRoom {
                room_id: Some("abc".into()),
                score_to_win: Some(9),
            }
        );

        let bare = decode_client_msg(r#"{"type":"create-room"}"#).unwrap();
        assert_eq!(
            bare,
            ClientMsg::CreateRoom {
                room_id: None,
                score_to_win: None,
            }
        );
    }

    #[test]
    fn decodes_unit_and_heartbeat_variants() {
        assert_eq!(decode_client_msg(r#"{"type":"ready"}"#).unwrap(), ClientMsg::Ready);
        assert_eq!(
            decode_client_msg(r#"{"type":"leave-room"}"#).unwrap(),
            ClientMsg::LeaveRoom
        );
        assert_eq!(
            decode_client_msg(r#"{"type":"ping","timestamp":42}"#).unwrap(),
            ClientMsg::Ping {
                timestamp: Some(42)
            }
        );
        assert_eq!(
            decode_client_msg(r#"{"type":"heartbeat"}"#).unwrap(),
            ClientMsg::Ping { timestamp: None }
        );
    }

    #[test]
    fn decodes_goal_scorer_names() {
        let msg = decode_client_msg(r#"{"type":"goal-scored","scorer":"player2"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::GoalScored {
                scorer: Side::Player2
            }
        );
        assert!(decode_client_msg(r#"{"type":"goal-scored","scorer":"player3"}"#).is_err());
    }

    #[test]
    fn rejects_unknown_type_and_wrong_field_types() {
        assert!(matches!(
            decode_client_msg(r#"{"type":"teleport"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_client_msg(r#"{"type":"paddle-move","x":"1","y":2}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_client_msg(r#"{"x":1}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_client_msg("not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        // serde_json refuses to produce an infinite f64 from a literal
        assert!(decode_client_msg(r#"{"type":"paddle-move","x":1e400,"y":0}"#).is_err());

        let nan = ClientMsg::PuckState {
            x: 0.0,
            y: f64::NAN,
            vx: 0.0,
            vy: 0.0,
            seq: 1,
        };
        assert!(matches!(nan.validate(), Err(ProtocolError::NonFinite("y"))));
    }

    #[test]
    fn rejects_bad_room_ids() {
        let long = format!(r#"{{"type":"join-room","roomId":"{}"}}"#, "A".repeat(17));
        assert!(matches!(
            decode_client_msg(&long),
            Err(ProtocolError::InvalidRoomId)
        ));
        assert!(matches!(
            decode_client_msg(r#"{"type":"join-room","roomId":"AB CD"}"#),
            Err(ProtocolError::InvalidRoomId)
        ));
        assert!(matches!(
            decode_client_msg(r#"{"type":"join-room","roomId":""}"#),
            Err(ProtocolError::InvalidRoomId)
        ));
        assert!(decode_client_msg(r#"{"type":"join-room","roomId":" abcd23 "}"#).is_ok());
    }

    #[test]
    fn rejects_oversized_frames() {
        let padding = "x".repeat(MAX_FRAME_BYTES);
        let frame = format!(r#"{{"type":"ready","pad":"{padding}"}}"#);
        assert!(matches!(
            decode_client_msg(&frame),
            Err(ProtocolError::TooLarge { .. })
        ));
    }

    #[test]
    fn server_messages_use_camel_case_fields() {
        let joined = serde_json::to_value(ServerMsg::RoomJoined {
            room_id: "ABC234".into(),
            player_number: PlayerSlot::Two,
        })
        .unwrap();
        assert_eq!(
            joined,
            json!({"type": "room-joined", "roomId": "ABC234", "playerNumber": 2})
        );

        let start = serde_json::to_value(ServerMsg::GameStart {
            your_number: PlayerSlot::One,
        })
        .unwrap();
        assert_eq!(start, json!({"type": "game-start", "yourNumber": 1}));

        let err = serde_json::to_value(ServerMsg::error(ErrorCode::RoomFull, "Room is full")).unwrap();
        assert_eq!(
            err,
            json!({"type": "error", "message": "Room is full", "code": "ROOM_FULL"})
        );

        let pong = serde_json::to_value(ServerMsg::Pong { timestamp: 7 }).unwrap();
        assert_eq!(pong, json!({"type": "pong", "timestamp": 7}));
    }

    #[test]
    fn goal_messages_carry_scores() {
        let scores = Scores {
            player1: 3,
            player2: 1,
        };
        let value = serde_json::to_value(ServerMsg::GoalConfirmed {
            scorer: Side::Player1,
            scores,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({
                "type": "goal-confirmed",
                "scorer": "player1",
                "scores": {"player1": 3, "player2": 1}
            })
        );
    }

    #[test]
    fn player_slot_rejects_other_numbers() {
        assert!(serde_json::from_str::<PlayerSlot>("3").is_err());
        assert_eq!(serde_json::from_str::<PlayerSlot>("2").unwrap(), PlayerSlot::Two);
    }

    #[test]
    fn scores_increment_per_side() {
        let mut scores = Scores::default();
        assert_eq!(scores.increment(Side::Player2), 1);
        assert_eq!(scores.increment(Side::Player2), 2);
        assert_eq!(scores.get(Side::Player1), 0);
        assert_eq!(scores.get(Side::Player2), 2);
    }
}
