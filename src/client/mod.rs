//! Client-side netcode: transport session, lobby view, puck interpolation and the game view

pub mod game;
pub mod interpolation;
pub mod lobby;
pub mod session;

pub use game::{Bodies, RemoteGame};
pub use interpolation::{InterpolationConfig, PaddleSmoother, Snapshot, SnapshotBuffer};
pub use lobby::{LobbyPhase, LobbyState};
pub use session::{
    ClientSession, ConnectionStatus, Connector, SessionConfig, SessionError, SessionHandler,
    Transport, WsConnector, WsTransport,
};
