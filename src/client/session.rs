//! Client transport session: connect, heartbeat, reconnect, typed callbacks
//!
//! One background task owns the connection, the heartbeat timer and the
//! reconnect wait. The [`ClientSession`] handle queues outbound messages to it
//! and can stop it at any point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::util::time::unix_millis;

use super::lobby::LobbyState;
use crate::ws::protocol::{
    ClientMsg, ConnectionId, ErrorCode, PlayerSlot, Scores, ServerMsg, Side,
};

/// Client transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Connection attempt timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection closed")]
    Closed,
}

/// A connected, text-framed transport
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<(), SessionError>;

    /// Next text frame; `None` once the peer has closed
    async fn recv(&mut self) -> Option<Result<String, SessionError>>;

    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens a fresh transport for every (re)connect attempt
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn Transport>, SessionError>;
}

/// WebSocket transport over tokio-tungstenite
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), SessionError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(SessionError::Transport(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}

/// Connects to a relay server URL such as `ws://localhost:8080/ws`
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, SessionError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        Ok(Box::new(WsTransport { stream }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(2),
            max_reconnect_attempts: 10,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Stopped by [`ClientSession::shutdown`]
    Disconnected,
    /// Gave up after the configured number of reconnect attempts
    Failed,
}

/// Callbacks invoked from the session task. All default to no-ops.
#[allow(unused_variables)]
pub trait SessionHandler: Send + 'static {
    fn on_status(&mut self, status: ConnectionStatus) {}
    fn on_latency(&mut self, round_trip: Duration) {}
    fn on_connected(&mut self, player_id: ConnectionId) {}
    fn on_room_created(&mut self, room_id: &str, score_to_win: u32) {}
    fn on_room_joined(&mut self, room_id: &str, slot: PlayerSlot) {}
    fn on_opponent_joined(&mut self, opponent_id: ConnectionId) {}
    fn on_opponent_left(&mut self) {}
    fn on_opponent_ready(&mut self) {}
    fn on_game_start(&mut self, your_slot: PlayerSlot) {}
    fn on_opponent_paddle(&mut self, x: f64, y: f64) {}
    fn on_puck_update(&mut self, x: f64, y: f64, vx: f64, vy: f64, seq: u64) {}
    fn on_goal_confirmed(&mut self, scorer: Side, scores: Scores) {}
    fn on_game_over(&mut self, winner: Side, scores: Scores) {}
    fn on_error(&mut self, code: ErrorCode, message: &str) {}
}

struct Shared {
    status: RwLock<ConnectionStatus>,
    latency: RwLock<Option<Duration>>,
    lobby: RwLock<LobbyState>,
}

/// Handle to a running client session
pub struct ClientSession {
    commands: mpsc::UnboundedSender<ClientMsg>,
    shared: Arc<Shared>,
    puck_seq: AtomicU64,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ClientSession {
    /// Spawn the session task and begin connecting
    pub fn start<C, H>(connector: C, config: SessionConfig, handler: H) -> Self
    where
        C: Connector,
        H: SessionHandler,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shared = Arc::new(Shared {
            status: RwLock::new(ConnectionStatus::Connecting),
            latency: RwLock::new(None),
            lobby: RwLock::new(LobbyState::default()),
        });

        let task = tokio::spawn(
            SessionTask {
                connector,
                config,
                handler,
                commands: command_rx,
                shutdown: shutdown_rx,
                shared: shared.clone(),
                pending_ping: None,
            }
            .run(),
        );

        Self {
            commands,
            shared,
            puck_seq: AtomicU64::new(0),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.read()
    }

    pub fn is_open(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Most recent heartbeat round trip
    pub fn latency(&self) -> Option<Duration> {
        *self.shared.latency.read()
    }

    /// Room, seat and lobby phase as last reported by the server
    pub fn lobby(&self) -> LobbyState {
        self.shared.lobby.read().clone()
    }

    pub fn clear_error(&self) {
        self.shared.lobby.write().clear_error();
    }

    pub fn create_room(&self, room_id: Option<String>, score_to_win: Option<u32>) {
        if self.is_open() {
            self.shared.lobby.write().begin_create();
        }
        let _ = self.send(ClientMsg::CreateRoom {
            room_id,
            score_to_win,
        });
    }

    pub fn join_room(&self, room_id: impl Into<String>) {
        if self.is_open() {
            self.shared.lobby.write().begin_join();
        }
        let _ = self.send(ClientMsg::JoinRoom {
            room_id: room_id.into(),
        });
    }

    pub fn leave_room(&self) {
        if self.is_open() {
            self.shared.lobby.write().leave();
        }
        let _ = self.send(ClientMsg::LeaveRoom);
    }

    pub fn set_ready(&self) {
        if self.is_open() {
            self.shared.lobby.write().mark_ready();
        }
        let _ = self.send(ClientMsg::Ready);
    }

    pub fn send_paddle(&self, x: f64, y: f64) {
        let _ = self.send(ClientMsg::PaddleMove { x, y });
    }

    /// Host only; sequence numbers are assigned here
    pub fn send_puck(&self, x: f64, y: f64, vx: f64, vy: f64) {
        if !self.is_open() {
            return;
        }
        let seq = self.puck_seq.fetch_add(1, Ordering::Relaxed);
        let _ = self.send(ClientMsg::PuckState { x, y, vx, vy, seq });
    }

    pub fn send_goal(&self, scorer: Side) {
        let _ = self.send(ClientMsg::GoalScored { scorer });
    }

    /// Queue a message; dropped (and `false` returned) when the connection is not open
    pub fn send(&self, msg: ClientMsg) -> bool {
        if !self.is_open() {
            debug!(kind = msg.kind(), "Session not open, dropping message");
            return false;
        }
        self.commands.send(msg).is_ok()
    }

    /// Stop heartbeat and reconnects, close the transport and wait for the task
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Session task ended abnormally");
            }
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Exit {
    /// Transport dropped; reconnect
    Lost,
    /// Shutdown requested or handle dropped
    Stop,
}

struct SessionTask<C, H> {
    connector: C,
    config: SessionConfig,
    handler: H,
    commands: mpsc::UnboundedReceiver<ClientMsg>,
    shutdown: oneshot::Receiver<()>,
    shared: Arc<Shared>,
    pending_ping: Option<(u64, Instant)>,
}

impl<C: Connector, H: SessionHandler> SessionTask<C, H> {
    async fn run(mut self) {
        let mut attempts: u32 = 0;
        self.set_status(ConnectionStatus::Connecting);

        loop {
            let attempt = tokio::time::timeout(self.config.connect_timeout, self.connector.connect());
            let connected = tokio::select! {
                result = attempt => result,
                _ = &mut self.shutdown => {
                    self.set_status(ConnectionStatus::Disconnected);
                    return;
                }
            };

            match connected {
                Ok(Ok(transport)) => {
                    attempts = 0;
                    // Anything queued while offline is stale
                    while self.commands.try_recv().is_ok() {}
                    self.set_status(ConnectionStatus::Connected);
                    info!("Session connected");

                    match self.drive(transport).await {
                        Exit::Stop => {
                            self.set_status(ConnectionStatus::Disconnected);
                            return;
                        }
                        Exit::Lost => info!("Session connection lost"),
                    }
                }
                Ok(Err(e)) => warn!(error = %e, "Connect attempt failed"),
                Err(_) => warn!(error = %SessionError::Timeout, "Connect attempt failed"),
            }

            if attempts >= self.config.max_reconnect_attempts {
                error!(attempts, "Giving up on reconnecting");
                self.set_status(ConnectionStatus::Failed);
                return;
            }
            attempts += 1;
            self.set_status(ConnectionStatus::Reconnecting { attempt: attempts });

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = &mut self.shutdown => {
                    self.set_status(ConnectionStatus::Disconnected);
                    return;
                }
            }
        }
    }

    async fn drive(&mut self, mut transport: Box<dyn Transport>) -> Exit {
        let period = self.config.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        self.pending_ping = None;

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    let _ = transport.close().await;
                    return Exit::Stop;
                }

                cmd = self.commands.recv() => {
                    let Some(msg) = cmd else {
                        let _ = transport.close().await;
                        return Exit::Stop;
                    };
                    if let Err(e) = send_msg(transport.as_mut(), &msg).await {
                        warn!(error = %e, "Send failed");
                        return Exit::Lost;
                    }
                }

                _ = heartbeat.tick() => {
                    let timestamp = unix_millis();
                    self.pending_ping = Some((timestamp, Instant::now()));
                    let ping = ClientMsg::Ping { timestamp: Some(timestamp) };
                    if let Err(e) = send_msg(transport.as_mut(), &ping).await {
                        warn!(error = %e, "Heartbeat send failed");
                        return Exit::Lost;
                    }
                }

                incoming = transport.recv() => match incoming {
                    Some(Ok(text)) => match serde_json::from_str::<ServerMsg>(&text) {
                        Ok(msg) => self.handle(msg),
                        Err(e) => warn!(error = %e, "Ignoring undecodable server frame"),
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "Transport receive error");
                        return Exit::Lost;
                    }
                    None => return Exit::Lost,
                },
            }
        }
    }

    fn handle(&mut self, msg: ServerMsg) {
        self.shared.lobby.write().apply(&msg);
        let handler = &mut self.handler;
        match msg {
            ServerMsg::Connected { player_id } => handler.on_connected(player_id),
            ServerMsg::RoomCreated {
                room_id,
                score_to_win,
            } => handler.on_room_created(&room_id, score_to_win),
            ServerMsg::RoomJoined {
                room_id,
                player_number,
            } => handler.on_room_joined(&room_id, player_number),
            ServerMsg::OpponentJoined { opponent_id } => handler.on_opponent_joined(opponent_id),
            ServerMsg::OpponentLeft => handler.on_opponent_left(),
            ServerMsg::OpponentReady => handler.on_opponent_ready(),
            ServerMsg::GameStart { your_number } => handler.on_game_start(your_number),
            ServerMsg::OpponentPaddle { x, y } => handler.on_opponent_paddle(x, y),
            ServerMsg::PuckUpdate { x, y, vx, vy, seq } => handler.on_puck_update(x, y, vx, vy, seq),
            ServerMsg::GoalConfirmed { scorer, scores } => handler.on_goal_confirmed(scorer, scores),
            ServerMsg::GameOver { winner, scores } => handler.on_game_over(winner, scores),
            ServerMsg::Error { message, code } => handler.on_error(code, &message),
            ServerMsg::Pong { timestamp } => {
                if let Some((sent, at)) = self.pending_ping {
                    if sent == timestamp {
                        self.pending_ping = None;
                        let round_trip = at.elapsed();
                        *self.shared.latency.write() = Some(round_trip);
                        handler.on_latency(round_trip);
                    }
                }
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        *self.shared.status.write() = status;
        self.handler.on_status(status);
    }
}

async fn send_msg(transport: &mut dyn Transport, msg: &ClientMsg) -> Result<(), SessionError> {
    let json = serde_json::to_string(msg).map_err(|e| SessionError::Transport(e.to_string()))?;
    transport.send(json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::lobby::LobbyPhase;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use uuid::Uuid;

    /// Server side of a mock connection
    struct Peer {
        to_client: mpsc::UnboundedSender<String>,
        from_client: mpsc::UnboundedReceiver<String>,
    }

    impl Peer {
        fn push(&self, msg: &ServerMsg) {
            self.to_client.send(serde_json::to_string(msg).unwrap()).unwrap();
        }

        async fn next_msg(&mut self) -> ClientMsg {
            let text = self.from_client.recv().await.unwrap();
            serde_json::from_str(&text).unwrap()
        }
    }

    struct MockTransport {
        inbound: mpsc::UnboundedReceiver<String>,
        outbound: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, text: String) -> Result<(), SessionError> {
            self.outbound.send(text).map_err(|_| SessionError::Closed)
        }

        async fn recv(&mut self) -> Option<Result<String, SessionError>> {
            self.inbound.recv().await.map(Ok)
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            self.inbound.close();
            Ok(())
        }
    }

    fn mock_pair() -> (MockTransport, Peer) {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        (
            MockTransport { inbound, outbound },
            Peer {
                to_client,
                from_client,
            },
        )
    }

    /// Hands out scripted transports, then refuses
    #[derive(Clone, Default)]
    struct MockConnector {
        script: Arc<Mutex<VecDeque<MockTransport>>>,
        calls: Arc<Mutex<u32>>,
    }

    impl MockConnector {
        fn with_peers(n: usize) -> (Self, Vec<Peer>) {
            let connector = Self::default();
            let peers = (0..n)
                .map(|_| {
                    let (transport, peer) = mock_pair();
                    connector.script.lock().push_back(transport);
                    peer
                })
                .collect();
            (connector, peers)
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self) -> Result<Box<dyn Transport>, SessionError> {
            *self.calls.lock() += 1;
            match self.script.lock().pop_front() {
                Some(transport) => Ok(Box::new(transport)),
                None => Err(SessionError::Connect("refused".into())),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Status(ConnectionStatus),
        Latency(Duration),
        Connected(ConnectionId),
        RoomJoined(String, PlayerSlot),
        Puck(f64, u64),
        GameOver(Side),
        Error(ErrorCode),
    }

    struct Recorder(mpsc::UnboundedSender<Event>);

    impl SessionHandler for Recorder {
        fn on_status(&mut self, status: ConnectionStatus) {
            let _ = self.0.send(Event::Status(status));
        }
        fn on_latency(&mut self, round_trip: Duration) {
            let _ = self.0.send(Event::Latency(round_trip));
        }
        fn on_connected(&mut self, player_id: ConnectionId) {
            let _ = self.0.send(Event::Connected(player_id));
        }
        fn on_room_joined(&mut self, room_id: &str, slot: PlayerSlot) {
            let _ = self.0.send(Event::RoomJoined(room_id.to_string(), slot));
        }
        fn on_puck_update(&mut self, x: f64, _y: f64, _vx: f64, _vy: f64, seq: u64) {
            let _ = self.0.send(Event::Puck(x, seq));
        }
        fn on_game_over(&mut self, winner: Side, _scores: Scores) {
            let _ = self.0.send(Event::GameOver(winner));
        }
        fn on_error(&mut self, code: ErrorCode, _message: &str) {
            let _ = self.0.send(Event::Error(code));
        }
    }

    fn start(connector: MockConnector, config: SessionConfig) -> (ClientSession, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ClientSession::start(connector, config, Recorder(tx)), rx)
    }

    async fn expect(events: &mut mpsc::UnboundedReceiver<Event>, expected: Event) {
        assert_eq!(events.recv().await, Some(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_server_frames_to_callbacks() {
        let (connector, mut peers) = MockConnector::with_peers(1);
        let (session, mut events) = start(connector, SessionConfig::default());
        let peer = peers.remove(0);

        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        expect(&mut events, Event::Status(ConnectionStatus::Connected)).await;
        assert!(session.is_open());

        let id = Uuid::new_v4();
        peer.push(&ServerMsg::Connected { player_id: id });
        peer.push(&ServerMsg::RoomJoined {
            room_id: "ABCDEF".into(),
            player_number: PlayerSlot::Two,
        });
        peer.to_client.send("not json".into()).unwrap();
        peer.push(&ServerMsg::PuckUpdate {
            x: 4.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            seq: 12,
        });
        peer.push(&ServerMsg::error(ErrorCode::RoomFull, "Room is full"));
        peer.push(&ServerMsg::GameOver {
            winner: Side::Player2,
            scores: Scores::default(),
        });

        expect(&mut events, Event::Connected(id)).await;
        expect(&mut events, Event::RoomJoined("ABCDEF".into(), PlayerSlot::Two)).await;
        expect(&mut events, Event::Puck(4.0, 12)).await;
        expect(&mut events, Event::Error(ErrorCode::RoomFull)).await;
        expect(&mut events, Event::GameOver(Side::Player2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn outbound_api_sends_messages_with_puck_sequence() {
        let (connector, mut peers) = MockConnector::with_peers(1);
        let (session, mut events) = start(connector, SessionConfig::default());
        let mut peer = peers.remove(0);
        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        expect(&mut events, Event::Status(ConnectionStatus::Connected)).await;

        session.join_room("room42");
        session.set_ready();
        session.send_puck(1.0, 2.0, 3.0, 4.0);
        session.send_puck(1.5, 2.5, 3.0, 4.0);
        session.send_goal(Side::Player1);

        assert_eq!(
            peer.next_msg().await,
            ClientMsg::JoinRoom {
                room_id: "room42".into()
            }
        );
        assert_eq!(peer.next_msg().await, ClientMsg::Ready);
        assert!(matches!(peer.next_msg().await, ClientMsg::PuckState { seq: 0, .. }));
        assert!(matches!(peer.next_msg().await, ClientMsg::PuckState { seq: 1, .. }));
        assert_eq!(
            peer.next_msg().await,
            ClientMsg::GoalScored {
                scorer: Side::Player1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn lobby_tracks_server_messages_and_local_actions() {
        let (connector, mut peers) = MockConnector::with_peers(1);
        let (session, mut events) = start(connector, SessionConfig::default());
        let mut peer = peers.remove(0);
        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        expect(&mut events, Event::Status(ConnectionStatus::Connected)).await;

        let id = Uuid::new_v4();
        peer.push(&ServerMsg::Connected { player_id: id });
        expect(&mut events, Event::Connected(id)).await;

        session.join_room("abcdef");
        assert_eq!(session.lobby().phase, LobbyPhase::Joining);
        assert!(matches!(peer.next_msg().await, ClientMsg::JoinRoom { .. }));

        peer.push(&ServerMsg::RoomJoined {
            room_id: "ABCDEF".into(),
            player_number: PlayerSlot::Two,
        });
        expect(&mut events, Event::RoomJoined("ABCDEF".into(), PlayerSlot::Two)).await;

        let lobby = session.lobby();
        assert_eq!(lobby.player_id, Some(id));
        assert_eq!(lobby.room_id.as_deref(), Some("ABCDEF"));
        assert_eq!(lobby.phase, LobbyPhase::OpponentJoined);
        assert!(!lobby.is_host());

        session.leave_room();
        assert_eq!(session.lobby().room_id, None);
        assert_eq!(session.lobby().phase, LobbyPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_measures_round_trip() {
        let (connector, mut peers) = MockConnector::with_peers(1);
        let (session, mut events) = start(connector, SessionConfig::default());
        let mut peer = peers.remove(0);
        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        expect(&mut events, Event::Status(ConnectionStatus::Connected)).await;

        let timestamp = match peer.next_msg().await {
            ClientMsg::Ping {
                timestamp: Some(ts),
            } => ts,
            other => panic!("expected ping, got {other:?}"),
        };

        tokio::time::sleep(Duration::from_millis(40)).await;
        peer.push(&ServerMsg::Pong { timestamp });

        match events.recv().await {
            Some(Event::Latency(rtt)) => {
                assert!(rtt >= Duration::from_millis(40));
                assert!(rtt < Duration::from_secs(1));
            }
            other => panic!("expected latency, got {other:?}"),
        }
        assert!(session.latency().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_connection_loss() {
        let (connector, mut peers) = MockConnector::with_peers(2);
        let (session, mut events) = start(connector.clone(), SessionConfig::default());
        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        expect(&mut events, Event::Status(ConnectionStatus::Connected)).await;

        drop(peers.remove(0));
        expect(&mut events, Event::Status(ConnectionStatus::Reconnecting { attempt: 1 })).await;
        assert!(!session.is_open());

        // Dropped while offline
        session.send_paddle(1.0, 1.0);

        expect(&mut events, Event::Status(ConnectionStatus::Connected)).await;
        assert_eq!(connector.calls(), 2);

        let mut second = peers.remove(0);
        session.leave_room();
        assert_eq!(second.next_msg().await, ClientMsg::LeaveRoom);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let connector = MockConnector::default();
        let config = SessionConfig {
            max_reconnect_attempts: 3,
            ..SessionConfig::default()
        };
        let (session, mut events) = start(connector.clone(), config);

        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        for attempt in 1..=3 {
            expect(&mut events, Event::Status(ConnectionStatus::Reconnecting { attempt })).await;
        }
        expect(&mut events, Event::Status(ConnectionStatus::Failed)).await;
        assert_eq!(events.recv().await, None);
        assert_eq!(connector.calls(), 4);
        assert_eq!(session.status(), ConnectionStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_reconnect() {
        let connector = MockConnector::default();
        let (mut session, mut events) = start(connector.clone(), SessionConfig::default());
        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        expect(&mut events, Event::Status(ConnectionStatus::Reconnecting { attempt: 1 })).await;

        session.shutdown().await;
        expect(&mut events, Event::Status(ConnectionStatus::Disconnected)).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.calls(), 1);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_open_connection() {
        let (connector, mut peers) = MockConnector::with_peers(1);
        let (mut session, mut events) = start(connector, SessionConfig::default());
        let mut peer = peers.remove(0);
        expect(&mut events, Event::Status(ConnectionStatus::Connecting)).await;
        expect(&mut events, Event::Status(ConnectionStatus::Connected)).await;

        session.shutdown().await;
        expect(&mut events, Event::Status(ConnectionStatus::Disconnected)).await;

        session.send_paddle(1.0, 1.0);
        assert_eq!(peer.from_client.recv().await, None);
    }
}
