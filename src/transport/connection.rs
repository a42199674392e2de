//! WebSocket channel connection and event loop.
//!
//! A [`Connection`] keeps exactly one logical channel to the device. It
//! handles pairing, reconnects after abnormal closures, correlates requests
//! with responses and routes everything else to the event handler.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──open──► AwaitingReady ──ready──► Ready
//!      ▲                                                                    │
//!      └──────────────── abnormal close (reconnect after interval) ◄────────┘
//! ```
//!
//! A normal closure (code 1000) or a local [`Connection::close`] is
//! terminal. Reconnects use a fixed interval and retry until they succeed
//! or the connection is closed.
//!
//! # Event Loop
//!
//! Each physical socket gets a tokio task that handles:
//!
//! - Incoming frames (handshake signals, responses, notifications)
//! - Outgoing frames from the Rust API
//! - Socket closure reporting, which drives reconnection

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::client::{ChannelIdentity, ConnectionOptions, Security};
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Inbound, Notification, Request, Response};

use super::TokenStore;
use super::tls;

// ============================================================================
// Constants
// ============================================================================

/// WebSocket close code for an intentional closure.
const NORMAL_CLOSURE: u16 = 1000;

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

/// Pairing cycles allowed within one `connect()`.
const MAX_PAIRING_CYCLES: usize = 3;

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<Response>>>;

/// Socket type for both plain and TLS channels.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Event handler callback type.
///
/// Called, in arrival order, for each unsolicited event from the device.
/// The handler runs without any connection lock held, so it may replace or
/// clear itself.
pub type EventHandler = Arc<dyn Fn(Notification) + Send + Sync>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Opening the socket.
    Connecting,
    /// Socket open, waiting for the handshake.
    AwaitingReady,
    /// Channel ready for requests.
    Ready,
    /// Closing on request of the caller.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingReady => "awaiting-ready",
            Self::Ready => "ready",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Internal Types
// ============================================================================

/// Handshake events forwarded from the event loop to `connect()`.
#[derive(Debug)]
enum HandshakeSignal {
    ChannelConnect { token: Option<String> },
    Ready,
    Unauthorized,
}

/// How a handshake ended.
#[derive(Debug)]
enum Handshake {
    Ready,
    Paired(String),
}

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a frame whose correlation entry is already registered.
    Request { frame: String, request_id: RequestId },
    /// Send an uncorrelated frame and report the write result.
    Emit {
        frame: String,
        ack: oneshot::Sender<Result<()>>,
    },
    /// Send a normal closure and stop.
    Shutdown { done: oneshot::Sender<()> },
}

/// Why a socket's event loop stopped.
#[derive(Debug, Clone, Copy)]
struct SocketExit {
    code: Option<u16>,
    local: bool,
}

impl SocketExit {
    fn local() -> Self {
        Self {
            code: Some(NORMAL_CLOSURE),
            local: true,
        }
    }

    fn remote(code: Option<u16>) -> Self {
        Self { code, local: false }
    }

    fn is_normal(self) -> bool {
        self.local || self.code == Some(NORMAL_CLOSURE)
    }
}

/// The socket currently owned by the connection.
struct ActiveSocket {
    generation: u64,
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

/// State shared by connection handles, event loops and the reconnect timer.
struct Shared {
    identity: ChannelIdentity,
    options: ConnectionOptions,
    tokens: TokenStore,
    state: watch::Sender<ConnectionState>,
    correlation: Mutex<CorrelationMap>,
    event_handler: Mutex<Option<EventHandler>>,
    socket: Mutex<Option<ActiveSocket>>,
    reconnect_timer: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
    reconnects: AtomicU64,
    closing: AtomicBool,
    connect_lock: tokio::sync::Mutex<()>,
}

// ============================================================================
// PendingResponse
// ============================================================================

/// A registered correlation entry waiting for its response.
///
/// Dropping it removes the entry, so abandoned waits leave nothing behind.
pub struct PendingResponse {
    request_id: RequestId,
    rx: Option<oneshot::Receiver<Result<Response>>>,
    shared: Weak<Shared>,
}

impl PendingResponse {
    /// The correlation ID being waited on.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Waits for the response.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] if nothing arrives within `deadline`
    /// - [`Error::ConnectionClosed`] if the channel is lost first
    pub async fn wait(mut self, deadline: Duration) -> Result<Response> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(Error::ConnectionClosed);
        };
        let outcome = timeout(deadline, rx).await;
        self.rx = None;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                self.forget();
                warn!(request_id = %self.request_id, "Request timed out");
                Err(Error::request_timeout(
                    self.request_id.clone(),
                    deadline.as_millis() as u64,
                ))
            }
        }
    }

    fn forget(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.correlation.lock().remove(&self.request_id);
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if self.rx.is_some() {
            self.forget();
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket channel to the device.
///
/// Correlated requests go through [`Connection::request`]; unsolicited
/// events go to the handler set with [`Connection::set_event_handler`].
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share one
/// channel.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("identity", &self.shared.identity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a disconnected connection for `identity`.
    #[must_use]
    pub fn new(identity: ChannelIdentity, options: ConnectionOptions) -> Self {
        let tokens = TokenStore::for_channel(&options.token_dir(), &identity.path);
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            shared: Arc::new(Shared {
                identity,
                options,
                tokens,
                state,
                correlation: Mutex::new(CorrelationMap::default()),
                event_handler: Mutex::new(None),
                socket: Mutex::new(None),
                reconnect_timer: Mutex::new(None),
                generation: AtomicU64::new(0),
                reconnects: AtomicU64::new(0),
                closing: AtomicBool::new(false),
                connect_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Returns the channel identity.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &ChannelIdentity {
        &self.shared.identity
    }

    /// Returns the connection options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.shared.options
    }

    /// Returns the pairing token store.
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.shared.tokens
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Subscribes to state changes.
    ///
    /// Automatic reconnects are only observable here.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Returns `true` once the channel is ready for requests.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Returns `true` if an automatic reconnect is scheduled.
    #[inline]
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.shared.reconnect_timer.lock().is_some()
    }

    /// Number of automatic reconnect attempts made so far.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u64 {
        self.shared.reconnects.load(Ordering::SeqCst)
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.correlation.lock().len()
    }

    /// Sets the event handler callback.
    pub fn set_event_handler(&self, handler: EventHandler) {
        *self.shared.event_handler.lock() = Some(handler);
    }

    /// Clears the event handler.
    pub fn clear_event_handler(&self) {
        *self.shared.event_handler.lock() = None;
    }

    /// Opens the channel and completes the handshake.
    ///
    /// Idempotent: returns immediately if the channel is already ready.
    /// A stored pairing token is presented; if the device issues a new one
    /// it is stored and the channel is reopened with it.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionRefused`] if the transport fails before the handshake
    /// - [`Error::ConnectionTimeout`] if the handshake does not finish in time
    /// - [`Error::RemoteRejected`] if the device denies pairing
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.shared.connect_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }

        self.shared.closing.store(false, Ordering::SeqCst);
        self.shared.cancel_reconnect();
        Shared::establish(&self.shared).await
    }

    /// Closes the channel with a normal closure.
    ///
    /// Cancels any scheduled reconnect. Safe to call when never connected.
    pub async fn close(&self) {
        let shared = &self.shared;
        shared.closing.store(true, Ordering::SeqCst);
        shared.cancel_reconnect();

        let socket = shared.socket.lock().take();
        match socket {
            Some(socket) => {
                shared.set_state(ConnectionState::Closing);
                let (done, done_rx) = oneshot::channel();
                if socket
                    .command_tx
                    .send(ConnectionCommand::Shutdown { done })
                    .is_ok()
                {
                    let _ = done_rx.await;
                }
                info!(channel = %shared.identity.path, "Channel closed");
            }
            None => debug!(channel = %shared.identity.path, "Close requested without an open channel"),
        }

        shared.fail_pending();
        shared.set_state(ConnectionState::Disconnected);
    }

    /// Sends a request and waits for its response with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not open
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::DuplicateRequest`] if the request ID is already pending
    /// - [`Error::TooManyPending`] if too many requests are in flight
    pub async fn request(&self, request: Request) -> Result<Response> {
        self.request_with_timeout(request, self.shared.options.request_timeout)
            .await
    }

    /// Sends a request and waits for its response with a custom timeout.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn request_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let frame = request.to_frame()?;

        let pending = self.register_response(request.id.clone())?;
        self.shared.transmit(ConnectionCommand::Request {
            frame,
            request_id: request.id.clone(),
        })?;
        debug!(request_id = %request.id, action = %request.action, "Request sent");

        pending.wait(request_timeout).await
    }

    /// Registers interest in a response without sending anything.
    ///
    /// Used when the device answers a second time under an ID whose first
    /// response was already consumed (upload confirmation).
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateRequest`] if the ID is already pending
    /// - [`Error::TooManyPending`] if too many requests are in flight
    pub fn register_response(&self, request_id: RequestId) -> Result<PendingResponse> {
        let (tx, rx) = oneshot::channel();
        {
            let mut correlation = self.shared.correlation.lock();
            if correlation.contains_key(&request_id) {
                return Err(Error::DuplicateRequest { request_id });
            }
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::TooManyPending {
                    pending: correlation.len(),
                    max: MAX_PENDING_REQUESTS,
                });
            }
            correlation.insert(request_id.clone(), tx);
        }

        Ok(PendingResponse {
            request_id,
            rx: Some(rx),
            shared: Arc::downgrade(&self.shared),
        })
    }

    /// Sends an uncorrelated message (e.g. a remote key press).
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not open
    /// - [`Error::WebSocket`] if the write fails
    pub async fn emit<T: Serialize>(&self, message: &T) -> Result<()> {
        let frame = serde_json::to_string(message)?;
        let (ack, ack_rx) = oneshot::channel();
        self.shared.transmit(ConnectionCommand::Emit { frame, ack })?;
        ack_rx.await.map_err(|_| Error::ConnectionClosed)?
    }
}

// ============================================================================
// Shared - Connection Lifecycle
// ============================================================================

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(channel = %self.identity.path, from = %previous, to = %state, "State changed");
        }
    }

    fn cancel_reconnect(&self) {
        if let Some(timer) = self.reconnect_timer.lock().take() {
            timer.abort();
            debug!(channel = %self.identity.path, "Cancelled scheduled reconnect");
        }
    }

    fn transmit(&self, command: ConnectionCommand) -> Result<()> {
        let socket = self.socket.lock();
        let socket = socket.as_ref().ok_or(Error::ConnectionClosed)?;
        socket
            .command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Fails all pending requests with `ConnectionClosed`.
    fn fail_pending(&self) {
        let pending: Vec<_> = self.correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on disconnect");
        }
    }

    /// Opens sockets until the handshake completes, following at most
    /// [`MAX_PAIRING_CYCLES`] token reissues.
    async fn establish(self: &Arc<Self>) -> Result<()> {
        let mut pairing_cycles = 0;

        loop {
            let token = self.tokens.get();
            let url = self
                .identity
                .channel_url(self.options.security, token.as_deref())?;

            self.set_state(ConnectionState::Connecting);
            info!(
                channel = %self.identity.path,
                host = %self.identity.host,
                paired = token.is_some(),
                "Opening channel"
            );

            let ws = match open_socket(&url, self.options.security).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(channel = %self.identity.path, error = %e, "Channel connection refused");
                    self.set_state(ConnectionState::Disconnected);
                    return Err(e);
                }
            };

            self.set_state(ConnectionState::AwaitingReady);
            let (handshake_tx, mut handshake_rx) = mpsc::unbounded_channel();
            let generation = self.attach(ws, handshake_tx);

            let outcome = timeout(
                self.options.handshake_timeout,
                self.await_handshake(&mut handshake_rx, token.as_deref()),
            )
            .await
            .unwrap_or_else(|_| {
                Err(Error::connection_timeout(
                    self.options.handshake_timeout.as_millis() as u64,
                ))
            });

            match outcome {
                Ok(Handshake::Ready) if self.closing.load(Ordering::SeqCst) => {
                    self.detach(generation).await;
                    self.set_state(ConnectionState::Disconnected);
                    return Err(Error::ConnectionClosed);
                }
                Ok(Handshake::Ready) => {
                    if self.promote_ready(generation) {
                        info!(channel = %self.identity.path, "Channel ready");
                        return Ok(());
                    }
                    warn!(channel = %self.identity.path, "Channel lost right after the handshake");
                    self.set_state(ConnectionState::Disconnected);
                    return Err(Error::connection_refused(
                        "channel closed right after the handshake",
                    ));
                }
                Ok(Handshake::Paired(new_token)) => {
                    pairing_cycles += 1;
                    info!(channel = %self.identity.path, "Paired; reopening channel with new token");
                    if let Err(e) = self.tokens.set(&new_token) {
                        warn!(error = %e, "Failed to persist pairing token");
                    }
                    self.detach(generation).await;

                    if pairing_cycles >= MAX_PAIRING_CYCLES {
                        self.set_state(ConnectionState::Disconnected);
                        return Err(Error::protocol(format!(
                            "device issued {pairing_cycles} tokens without becoming ready"
                        )));
                    }
                }
                Err(e) => {
                    self.detach(generation).await;
                    self.set_state(ConnectionState::Disconnected);
                    return Err(e);
                }
            }
        }
    }

    /// Waits for the handshake outcome of the current socket.
    async fn await_handshake(
        &self,
        signals: &mut mpsc::UnboundedReceiver<HandshakeSignal>,
        presented: Option<&str>,
    ) -> Result<Handshake> {
        loop {
            match signals.recv().await {
                Some(HandshakeSignal::ChannelConnect { token: Some(token) })
                    if presented != Some(token.as_str()) =>
                {
                    return Ok(Handshake::Paired(token));
                }
                // The presented token was accepted.
                Some(HandshakeSignal::ChannelConnect { .. }) if presented.is_some() => {
                    return Ok(Handshake::Ready);
                }
                Some(HandshakeSignal::ChannelConnect { .. }) => {}
                Some(HandshakeSignal::Ready) => return Ok(Handshake::Ready),
                Some(HandshakeSignal::Unauthorized) => {
                    self.tokens.clear();
                    return Err(Error::remote_rejected(
                        "unauthorized",
                        "pairing was denied by the device",
                    ));
                }
                None => {
                    return Err(Error::connection_refused(
                        "channel closed before the handshake completed",
                    ));
                }
            }
        }
    }

    /// Spawns the event loop for a fresh socket and makes it current.
    fn attach(
        self: &Arc<Self>,
        ws: WsStream,
        handshake_tx: mpsc::UnboundedSender<HandshakeSignal>,
    ) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        *self.socket.lock() = Some(ActiveSocket {
            generation,
            command_tx,
        });

        tokio::spawn(run_event_loop(
            ws,
            command_rx,
            Arc::downgrade(self),
            handshake_tx,
            generation,
        ));

        generation
    }

    /// Moves to `Ready` if the socket of `generation` is still current.
    ///
    /// Checked under the socket lock: `socket_closed` takes the slot under
    /// the same lock, so it either sees `Ready` and schedules a reconnect,
    /// or this returns `false`.
    fn promote_ready(&self, generation: u64) -> bool {
        let slot = self.socket.lock();
        match slot.as_ref() {
            Some(socket) if socket.generation == generation => {
                self.set_state(ConnectionState::Ready);
                true
            }
            _ => false,
        }
    }

    /// Closes the socket of `generation` normally, if it is still current.
    async fn detach(&self, generation: u64) {
        let socket = {
            let mut slot = self.socket.lock();
            match slot.as_ref() {
                Some(socket) if socket.generation == generation => slot.take(),
                _ => None,
            }
        };

        if let Some(socket) = socket {
            let (done, done_rx) = oneshot::channel();
            if socket
                .command_tx
                .send(ConnectionCommand::Shutdown { done })
                .is_ok()
            {
                let _ = done_rx.await;
            }
        }
    }

    /// Called by an event loop when its socket is gone.
    fn socket_closed(self: &Arc<Self>, generation: u64, exit: SocketExit) {
        let previous = {
            let mut slot = self.socket.lock();
            match slot.as_ref() {
                Some(socket) if socket.generation == generation => {
                    slot.take();
                }
                _ => {
                    trace!(generation, "Ignoring closure of a detached socket");
                    return;
                }
            }
            *self.state.borrow()
        };

        self.fail_pending();

        if previous == ConnectionState::Ready {
            if exit.is_normal() {
                info!(channel = %self.identity.path, code = ?exit.code, "Channel closed normally");
            } else if !self.closing.load(Ordering::SeqCst) {
                warn!(
                    channel = %self.identity.path,
                    code = ?exit.code,
                    retry_in_ms = self.options.reconnect_interval.as_millis() as u64,
                    "Channel lost; scheduling reconnect"
                );
                // Scheduled before the state change so observers of
                // `Disconnected` already see the pending reconnect.
                self.schedule_reconnect();
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    /// Schedules a single reconnect, replacing any earlier one.
    fn schedule_reconnect(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let delay = self.options.reconnect_interval;

        let timer = tokio::spawn(async move {
            sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // Release our own slot without aborting this task.
            shared.reconnect_timer.lock().take();
            Shared::reconnect(shared).await;
        });

        if let Some(previous) = self.reconnect_timer.lock().replace(timer) {
            previous.abort();
        }
    }

    async fn reconnect(shared: Arc<Self>) {
        let _guard = shared.connect_lock.lock().await;
        if shared.closing.load(Ordering::SeqCst) || *shared.state.borrow() == ConnectionState::Ready {
            return;
        }

        let attempt = shared.reconnects.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(channel = %shared.identity.path, attempt, "Reconnecting");

        match shared.establish().await {
            Ok(()) => info!(channel = %shared.identity.path, attempt, "Reconnected"),
            Err(e) => {
                warn!(channel = %shared.identity.path, attempt, error = %e, "Reconnect failed");
                if !shared.closing.load(Ordering::SeqCst) {
                    shared.schedule_reconnect();
                }
            }
        }
    }
}

// ============================================================================
// Shared - Inbound Routing
// ============================================================================

impl Shared {
    /// Handles an incoming text frame.
    fn handle_incoming_message(
        &self,
        text: &str,
        handshake_tx: &mpsc::UnboundedSender<HandshakeSignal>,
    ) {
        let inbound = match Inbound::parse(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };

        match inbound {
            Inbound::ChannelConnect { token } => {
                debug!(has_token = token.is_some(), "Channel connect received");
                let _ = handshake_tx.send(HandshakeSignal::ChannelConnect { token });
            }

            Inbound::ChannelReady => {
                let _ = handshake_tx.send(HandshakeSignal::Ready);
            }

            Inbound::Unauthorized => {
                warn!(channel = %self.identity.path, "Pairing denied");
                let _ = handshake_tx.send(HandshakeSignal::Unauthorized);
            }

            Inbound::Response(response) => {
                let tx = self.correlation.lock().remove(&response.request_id);

                if let Some(tx) = tx {
                    trace!(request_id = %response.request_id, "Response matched");
                    let _ = tx.send(Ok(response));
                } else {
                    debug!(request_id = %response.request_id, "Dropping response for unknown request");
                }
            }

            Inbound::Stray { request_id } => {
                debug!(%request_id, "Dropping response with a blank request id");
            }

            Inbound::Notification(notification) => {
                trace!(event = %notification.event, "Notification received");
                let handler = self.event_handler.lock().clone();
                if let Some(handler) = handler {
                    handler(notification);
                }
            }
        }
    }
}

// ============================================================================
// Socket Plumbing
// ============================================================================

/// Opens the WebSocket for `url`.
async fn open_socket(url: &Url, security: Security) -> Result<WsStream> {
    let connector = match security {
        Security::Tls => Connector::Rustls(tls::client_config()?),
        Security::Plain => Connector::Plain,
    };

    let (ws, _response) =
        tokio_tungstenite::connect_async_tls_with_config(url.as_str(), None, false, Some(connector))
            .await
            .map_err(|e| Error::connection_refused(e.to_string()))?;

    Ok(ws)
}

/// Event loop that handles WebSocket I/O for one socket.
async fn run_event_loop(
    ws: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    shared: Weak<Shared>,
    handshake_tx: mpsc::UnboundedSender<HandshakeSignal>,
    generation: u64,
) {
    let (mut ws_write, mut ws_read) = ws.split();
    let mut shutdown_done = None;

    let exit = loop {
        tokio::select! {
            // Incoming frames from the device
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let Some(shared) = shared.upgrade() else {
                            break SocketExit::local();
                        };
                        shared.handle_incoming_message(&text, &handshake_tx);
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map(|frame| u16::from(frame.code));
                        debug!(?code, "WebSocket closed by remote");
                        break SocketExit::remote(code);
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break SocketExit::remote(None);
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break SocketExit::remote(None);
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the Rust API
            command = command_rx.recv() => {
                match command {
                    Some(ConnectionCommand::Request { frame, request_id }) => {
                        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                            warn!(%request_id, error = %e, "Failed to send request");
                            if let Some(shared) = shared.upgrade()
                                && let Some(tx) = shared.correlation.lock().remove(&request_id)
                            {
                                let _ = tx.send(Err(Error::WebSocket(e)));
                            }
                        }
                    }

                    Some(ConnectionCommand::Emit { frame, ack }) => {
                        let result = ws_write
                            .send(Message::Text(frame.into()))
                            .await
                            .map_err(Error::from);
                        let _ = ack.send(result);
                    }

                    Some(ConnectionCommand::Shutdown { done }) => {
                        let close = CloseFrame {
                            code: CloseCode::Normal,
                            reason: Default::default(),
                        };
                        if let Err(e) = ws_write.send(Message::Close(Some(close))).await {
                            debug!(error = %e, "Failed to send close frame");
                        }
                        shutdown_done = Some(done);
                        break SocketExit::local();
                    }

                    None => {
                        debug!("Command channel closed");
                        let _ = ws_write.close().await;
                        break SocketExit::local();
                    }
                }
            }
        }
    };

    if let Some(shared) = shared.upgrade() {
        shared.socket_closed(generation, exit);
    }
    if let Some(done) = shutdown_done {
        let _ = done.send(());
    }

    debug!(generation, "Event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
