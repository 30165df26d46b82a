//! WebSocket gateway: wire protocol, connection routing, and the sweeper

pub mod connections;
pub mod dispatch;
pub mod handler;
pub mod protocol;
pub mod sweeper;

pub use connections::ConnectionRegistry;
pub use handler::ws_handler;
pub use sweeper::{spawn_sweeper, SweeperHandle};
