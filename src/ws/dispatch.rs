//! Routes validated client messages through the room store
//!
//! Dispatch is synchronous: it mutates room state and returns the frames to
//! send. The socket handler owns delivery.

use tracing::{debug, warn};

use crate::rooms::{GoalOutcome, ReadyOutcome, RoomManager};
use crate::util::time::unix_millis;

use super::protocol::{ClientMsg, ConnectionId, ErrorCode, PlayerSlot, ServerMsg};

/// One outbound frame addressed to one connection
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub msg: ServerMsg,
}

impl Delivery {
    pub fn new(to: ConnectionId, msg: ServerMsg) -> Self {
        Self { to, msg }
    }
}

/// Apply one client message and collect the frames it produces
pub fn dispatch(rooms: &RoomManager, from: ConnectionId, msg: ClientMsg) -> Vec<Delivery> {
    debug!(connection_id = %from, kind = msg.kind(), "Dispatching message");

    match msg {
        ClientMsg::CreateRoom {
            room_id,
            score_to_win,
        } => match rooms.host(from, room_id.as_deref(), score_to_win) {
            Ok(joined) => vec![
                Delivery::new(
                    from,
                    ServerMsg::RoomCreated {
                        room_id: joined.room.id.clone(),
                        score_to_win: joined.room.score_target,
                    },
                ),
                Delivery::new(
                    from,
                    ServerMsg::RoomJoined {
                        room_id: joined.room.id,
                        player_number: joined.slot,
                    },
                ),
            ],
            Err(e) => reject(from, e),
        },

        ClientMsg::JoinRoom { room_id } => match rooms.join(&room_id, from) {
            Ok(joined) => {
                let mut out = vec![Delivery::new(
                    from,
                    ServerMsg::RoomJoined {
                        room_id: joined.room.id,
                        player_number: joined.slot,
                    },
                )];
                if let Some(opponent) = joined.opponent {
                    out.push(Delivery::new(
                        opponent,
                        ServerMsg::OpponentJoined { opponent_id: from },
                    ));
                    out.push(Delivery::new(
                        from,
                        ServerMsg::OpponentJoined {
                            opponent_id: opponent,
                        },
                    ));
                }
                out
            }
            Err(e) => reject(from, e),
        },

        ClientMsg::LeaveRoom => match rooms.leave(from) {
            Ok(left) => left
                .opponent
                .map(|opponent| Delivery::new(opponent, ServerMsg::OpponentLeft))
                .into_iter()
                .collect(),
            Err(e) => reject(from, e),
        },

        ClientMsg::Ready => match rooms.ready(from) {
            Ok(ReadyOutcome::BothReady { room }) => room
                .players()
                .map(|p| {
                    Delivery::new(
                        p.connection_id,
                        ServerMsg::GameStart {
                            your_number: p.slot,
                        },
                    )
                })
                .collect(),
            Ok(ReadyOutcome::Waiting { opponent }) => opponent
                .map(|opponent| Delivery::new(opponent, ServerMsg::OpponentReady))
                .into_iter()
                .collect(),
            Err(e) => reject(from, e),
        },

        ClientMsg::PaddleMove { x, y } => rooms
            .opponent_of(from)
            .map(|opponent| Delivery::new(opponent, ServerMsg::OpponentPaddle { x, y }))
            .into_iter()
            .collect(),

        ClientMsg::PuckState { x, y, vx, vy, seq } => {
            let Some(seat) = rooms.seat_of(from) else {
                return vec![error(from, ErrorCode::NotInRoom, "Not in a room")];
            };
            if seat.slot != PlayerSlot::One {
                warn!(connection_id = %from, room_id = %seat.room_id, "Puck state from non-host");
                return vec![error(from, ErrorCode::NotHost, "Only the host sends puck state")];
            }
            seat.opponent
                .map(|opponent| {
                    Delivery::new(opponent, ServerMsg::PuckUpdate { x, y, vx, vy, seq })
                })
                .into_iter()
                .collect()
        }

        ClientMsg::GoalScored { scorer } => match rooms.report_goal(from, scorer) {
            Ok(goal) => goal_deliveries(goal),
            Err(e) => reject(from, e),
        },

        ClientMsg::Ping { timestamp } => {
            rooms.heartbeat(from);
            vec![Delivery::new(
                from,
                ServerMsg::Pong {
                    timestamp: timestamp.unwrap_or_else(unix_millis),
                },
            )]
        }
    }
}

/// Leave path for a closed transport; nothing is sent to the closed socket
pub fn on_disconnect(rooms: &RoomManager, from: ConnectionId) -> Vec<Delivery> {
    match rooms.leave(from) {
        Ok(left) => left
            .opponent
            .map(|opponent| Delivery::new(opponent, ServerMsg::OpponentLeft))
            .into_iter()
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn goal_deliveries(goal: GoalOutcome) -> Vec<Delivery> {
    let mut out: Vec<Delivery> = goal
        .players
        .iter()
        .map(|&p| {
            Delivery::new(
                p,
                ServerMsg::GoalConfirmed {
                    scorer: goal.scorer,
                    scores: goal.scores,
                },
            )
        })
        .collect();

    if let Some(winner) = goal.winner {
        out.extend(goal.players.iter().map(|&p| {
            Delivery::new(
                p,
                ServerMsg::GameOver {
                    winner,
                    scores: goal.scores,
                },
            )
        }));
    }
    out
}

fn reject(to: ConnectionId, err: crate::rooms::RoomError) -> Vec<Delivery> {
    debug!(connection_id = %to, code = %err.code(), "Room operation rejected");
    vec![error(to, err.code(), err.to_string())]
}

fn error(to: ConnectionId, code: ErrorCode, message: impl Into<String>) -> Delivery {
    Delivery::new(to, ServerMsg::error(code, message))
}
