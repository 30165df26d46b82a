//! Periodic room cleanup

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::rooms::{RoomManager, SweepReport};

use super::connections::ConnectionRegistry;
use super::protocol::ServerMsg;

/// Owns the sweep task; dropping the handle stops it
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `RoomManager::sweep` every `interval` and tell opponents of timed-out players
pub fn spawn_sweeper(
    rooms: Arc<RoomManager>,
    connections: Arc<ConnectionRegistry>,
    interval: Duration,
) -> SweeperHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = rooms.sweep();
            notify(&connections, &report);
        }
    });

    info!(interval_secs = interval.as_secs(), "Room sweeper started");
    SweeperHandle { task }
}

fn notify(connections: &ConnectionRegistry, report: &SweepReport) {
    for timed_out in &report.timed_out {
        if let Some(opponent) = timed_out.opponent {
            connections.send(opponent, ServerMsg::OpponentLeft);
        }
    }
}
