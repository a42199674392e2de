//! In-process device peer for channel and upload tests.
//!
//! Speaks the channel handshake over plain WebSocket, answers art requests
//! through a pluggable responder, and can accept one upload stream.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as HandshakeRequest, Response as HandshakeResponse,
};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

// ============================================================================
// Constants
// ============================================================================

/// Delay before a scripted abrupt drop, so the client has become ready.
const ABRUPT_DROP_DELAY: Duration = Duration::from_millis(150);

/// Upper bound for the `wait_for_*` helpers.
const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Secret handed out with the upload socket.
pub(crate) const UPLOAD_SECRET: &str = "mock-secret";

// ============================================================================
// Types
// ============================================================================

type Responder = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// How the peer answers a new channel.
pub(crate) enum PeerHandshake {
    /// `ms.channel.connect` without a token, then `ms.channel.ready`.
    ReadyOnly,
    /// `ms.channel.connect` carrying this token.
    IssueToken(String),
    /// `ms.channel.unauthorized`.
    Deny,
}

enum PeerCommand {
    Push(String),
    Drop,
    CloseNormally,
}

/// A payload received on the upload socket.
#[derive(Debug, Clone)]
pub(crate) struct ReceivedUpload {
    pub header: Value,
    pub payload: Vec<u8>,
}

struct PeerState {
    handshake: PeerHandshake,
    paths: Mutex<Vec<String>>,
    frames: Mutex<Vec<Value>>,
    responder: Mutex<Option<Responder>>,
    reverse_pairs: AtomicBool,
    drop_first: AtomicUsize,
    close_after_handshake: AtomicUsize,
    reject_handshakes: AtomicUsize,
    accepted_at: Mutex<Vec<Instant>>,
    current: Mutex<Option<mpsc::UnboundedSender<PeerCommand>>>,
    uploads: Mutex<Vec<ReceivedUpload>>,
    upload_request: Mutex<Option<String>>,
}

// ============================================================================
// MockPeer
// ============================================================================

/// Scripted device listening on a random local port.
pub(crate) struct MockPeer {
    port: u16,
    state: Arc<PeerState>,
    accept_task: JoinHandle<()>,
}

impl Drop for MockPeer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

impl MockPeer {
    /// Starts listening.
    pub(crate) async fn start(handshake: PeerHandshake) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock peer");
        let port = listener.local_addr().expect("mock peer addr").port();

        let state = Arc::new(PeerState {
            handshake,
            paths: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            reverse_pairs: AtomicBool::new(false),
            drop_first: AtomicUsize::new(0),
            close_after_handshake: AtomicUsize::new(0),
            reject_handshakes: AtomicUsize::new(0),
            accepted_at: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            uploads: Mutex::new(Vec::new()),
            upload_request: Mutex::new(None),
        });

        let accept_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_channel(stream, Arc::clone(&accept_state)));
            }
        });

        Self {
            port,
            state,
            accept_task,
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Number of channels that completed the WebSocket upgrade.
    pub(crate) fn connection_count(&self) -> usize {
        self.state.paths.lock().len()
    }

    /// When every upgrade completed, in order.
    pub(crate) fn accepted_at(&self) -> Vec<Instant> {
        self.state.accepted_at.lock().clone()
    }

    /// Request paths (with query) of every upgrade, in order.
    pub(crate) fn paths(&self) -> Vec<String> {
        self.state.paths.lock().clone()
    }

    /// Every frame received from the client.
    pub(crate) fn frames(&self) -> Vec<Value> {
        self.state.frames.lock().clone()
    }

    /// Decoded inner bodies of every art request received.
    pub(crate) fn request_bodies(&self) -> Vec<Value> {
        self.state.frames.lock().iter().filter_map(request_body).collect()
    }

    /// Uploads received so far.
    pub(crate) fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.uploads.lock().clone()
    }

    /// Replaces the default echo responder.
    ///
    /// The closure gets the decoded request body; `None` means no reply.
    /// Replies without `request_id` get the request's.
    pub(crate) fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        *self.state.responder.lock() = Some(Arc::new(responder));
    }

    /// Holds each odd reply and sends it after the next one.
    pub(crate) fn reply_in_reverse_pairs(&self) {
        self.state.reverse_pairs.store(true, Ordering::SeqCst);
    }

    /// Drops the next `count` channels without a close frame shortly after
    /// the handshake.
    pub(crate) fn drop_first_connections(&self, count: usize) {
        self.state.drop_first.store(count, Ordering::SeqCst);
    }

    /// Sends the full handshake on the next `count` channels, then closes
    /// them at once with code 1001.
    pub(crate) fn close_after_handshake(&self, count: usize) {
        self.state.close_after_handshake.store(count, Ordering::SeqCst);
    }

    /// Closes the next `count` channels with code 1001 before any
    /// handshake frame.
    pub(crate) fn reject_handshakes(&self, count: usize) {
        self.state.reject_handshakes.store(count, Ordering::SeqCst);
    }

    /// Sends a raw outer frame on the current channel.
    pub(crate) fn push_frame(&self, frame: Value) {
        self.command(PeerCommand::Push(frame.to_string()));
    }

    /// Sends a `d2d_service_message` on the current channel.
    pub(crate) fn push_service_message(&self, inner: Value) {
        self.command(PeerCommand::Push(service_frame(&inner)));
    }

    /// Closes the current channel with code 1000.
    pub(crate) fn close_current_normally(&self) {
        self.command(PeerCommand::CloseNormally);
    }

    /// Drops the current channel without a close frame.
    pub(crate) fn drop_current(&self) {
        self.command(PeerCommand::Drop);
    }

    pub(crate) async fn wait_for_frames(&self, count: usize) {
        self.wait_until(|state| state.frames.lock().len() >= count).await;
    }

    pub(crate) async fn wait_for_requests(&self, count: usize) {
        self.wait_until(|state| {
            state.frames.lock().iter().filter_map(request_body).count() >= count
        })
        .await;
    }

    /// Answers `send_image` with a local upload socket.
    ///
    /// After the payload is read, the upload is confirmed with `content_id`
    /// on the current channel, or never when `content_id` is `None`.
    pub(crate) async fn serve_uploads(&self, content_id: Option<&str>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upload socket");
        let port = listener.local_addr().expect("upload socket addr").port();

        let weak: Weak<PeerState> = Arc::downgrade(&self.state);
        self.respond_with(move |body| match body["request"].as_str() {
            Some("send_image") => {
                if let Some(state) = weak.upgrade() {
                    *state.upload_request.lock() = body["request_id"].as_str().map(str::to_string);
                }
                let conn_info = json!({
                    "ip": "127.0.0.1",
                    "port": port,
                    "key": UPLOAD_SECRET,
                    "secured": false
                });
                Some(json!({ "event": "ready_to_use", "conn_info": conn_info.to_string() }))
            }
            _ => Some(echo(body)),
        });

        let state = Arc::clone(&self.state);
        let content_id = content_id.map(str::to_string);
        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(upload) = read_upload(&mut stream).await else {
                return;
            };
            state.uploads.lock().push(upload);

            let Some(content_id) = content_id else {
                return;
            };
            let request_id = state.upload_request.lock().clone();
            let confirmation = json!({
                "request_id": request_id,
                "event": "image_added",
                "content_id": content_id
            });
            if let Some(tx) = state.current.lock().as_ref() {
                let _ = tx.send(PeerCommand::Push(service_frame(&confirmation)));
            }
        });
    }

    fn command(&self, command: PeerCommand) {
        if let Some(tx) = self.state.current.lock().as_ref() {
            let _ = tx.send(command);
        }
    }

    async fn wait_until(&self, condition: impl Fn(&PeerState) -> bool) {
        let deadline = Instant::now() + WAIT_LIMIT;
        while !condition(&self.state) {
            assert!(Instant::now() < deadline, "mock peer condition not met in time");
            sleep(Duration::from_millis(10)).await;
        }
    }
}

// ============================================================================
// Peer Side
// ============================================================================

impl PeerState {
    /// Records a client frame and returns the frames to send back.
    fn on_frame(&self, text: &str, held: &mut Option<String>) -> Vec<String> {
        let Ok(frame) = serde_json::from_str::<Value>(text) else {
            return Vec::new();
        };
        self.frames.lock().push(frame.clone());

        let Some(body) = request_body(&frame) else {
            return Vec::new();
        };
        let responder = self.responder.lock().clone();
        let reply = match responder {
            Some(responder) => responder(&body),
            None => Some(echo(&body)),
        };
        let Some(Value::Object(mut reply)) = reply else {
            return Vec::new();
        };
        if !reply.contains_key("request_id") {
            reply.insert("request_id".into(), body["request_id"].clone());
        }
        let reply = service_frame(&Value::Object(reply));

        if !self.reverse_pairs.load(Ordering::SeqCst) {
            return vec![reply];
        }
        match held.take() {
            Some(first) => vec![reply, first],
            None => {
                *held = Some(reply);
                Vec::new()
            }
        }
    }

    fn handshake_frames(&self) -> Vec<Value> {
        match &self.handshake {
            PeerHandshake::ReadyOnly => vec![
                json!({ "event": "ms.channel.connect", "data": { "clients": [] } }),
                json!({ "event": "ms.channel.ready", "data": {} }),
            ],
            PeerHandshake::IssueToken(token) => vec![json!({
                "event": "ms.channel.connect",
                "data": { "token": token, "clients": [] }
            })],
            PeerHandshake::Deny => vec![json!({ "event": "ms.channel.unauthorized", "data": {} })],
        }
    }

}

/// Consumes one unit of a scripted countdown.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn going_away() -> CloseFrame {
    CloseFrame {
        code: CloseCode::Away,
        reason: "going away".into(),
    }
}

async fn serve_channel(stream: TcpStream, state: Arc<PeerState>) {
    let mut path = String::new();
    let record_path = |request: &HandshakeRequest,
                       response: HandshakeResponse|
     -> Result<HandshakeResponse, ErrorResponse> {
        path = request.uri().to_string();
        Ok(response)
    };
    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, record_path).await else {
        return;
    };
    state.paths.lock().push(path);
    state.accepted_at.lock().push(Instant::now());

    if take_one(&state.reject_handshakes) {
        let _ = ws.close(Some(going_away())).await;
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    *state.current.lock() = Some(tx);

    for frame in state.handshake_frames() {
        if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
            return;
        }
    }

    if take_one(&state.close_after_handshake) {
        let _ = ws.close(Some(going_away())).await;
        return;
    }

    let drop_at = take_one(&state.drop_first).then(|| Instant::now() + ABRUPT_DROP_DELAY);
    let mut held = None;

    loop {
        let scripted_drop = async {
            match drop_at {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = scripted_drop => return,

            message = ws.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    for reply in state.on_frame(&text, &mut held) {
                        if ws.send(Message::Text(reply.into())).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },

            command = rx.recv() => match command {
                Some(PeerCommand::Push(frame)) => {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                Some(PeerCommand::CloseNormally) => {
                    let close = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "bye".into(),
                    };
                    let _ = ws.close(Some(close)).await;
                    return;
                }
                Some(PeerCommand::Drop) | None => return,
            },
        }
    }
}

async fn read_upload(stream: &mut TcpStream) -> std::io::Result<ReceivedUpload> {
    let length = stream.read_u32().await? as usize;
    let mut header = vec![0u8; length];
    stream.read_exact(&mut header).await?;
    let header: Value = serde_json::from_slice(&header)?;

    let mut payload = Vec::new();
    stream.read_to_end(&mut payload).await?;
    Ok(ReceivedUpload { header, payload })
}

// ============================================================================
// Frame Helpers
// ============================================================================

/// Wraps an inner message as a `d2d_service_message` frame.
pub(crate) fn service_frame(inner: &Value) -> String {
    json!({ "event": "d2d_service_message", "data": inner.to_string() }).to_string()
}

/// Decodes the inner body of a `ms.channel.emit` frame.
fn request_body(frame: &Value) -> Option<Value> {
    if frame.get("method")?.as_str()? != "ms.channel.emit" {
        return None;
    }
    serde_json::from_str(frame.get("params")?.get("data")?.as_str()?).ok()
}

/// Default reply: the request body with `event` set to the action name.
fn echo(body: &Value) -> Value {
    let mut reply = body.clone();
    reply["event"] = body["request"].clone();
    reply
}
