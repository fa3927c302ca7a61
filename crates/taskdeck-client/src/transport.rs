//! WebSocket and HTTP transport for the client.
//!
//! Provides [`ConnectedClient`], which runs one Socket.IO session over a
//! WebSocket in a background task, and [`HistoryClient`] for the REST history
//! endpoint. Both report back through [`TransportEvent`]s; protocol logic
//! remains in the Sans-IO [`crate::Client`].

use std::time::Duration;

use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use taskdeck_core::HistoryRequest;
use taskdeck_proto::{
    ClientCommand, EnginePacket, Message, PacketKind, ProtocolError, ServerEvent, SocketPacket,
    UserId,
    payloads::session::{ConnectAck, ConnectAuth, ErrorPayload},
};
use thiserror::Error;
use tokio::{sync::mpsc, time::Instant};
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, info, warn};
use url::Url;

use crate::TransportEvent;

/// Default Socket.IO endpoint path.
pub const SOCKET_PATH: &str = "/socket.io/";

/// Buffer size of the command and event channels.
const CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server or API address could not be used.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// WebSocket connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Engine.IO handshake did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Server refused the Socket.IO CONNECT (bad or expired token).
    #[error("{0}")]
    Rejected(String),

    /// WebSocket stream error after the handshake.
    #[error("stream error: {0}")]
    Stream(String),

    /// History request failed.
    #[error("http error: {0}")]
    Http(String),

    /// Malformed packet.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Handle to a realtime session running in a background task.
///
/// Commands are sent through `to_server`; lifecycle notifications and server
/// events arrive on `from_server`. The session ends with exactly one
/// `Closed` or `Failed` event.
pub struct ConnectedClient {
    /// Send commands to the server. Dropping it disconnects cleanly.
    pub to_server: mpsc::Sender<ClientCommand>,
    /// Receive transport events.
    pub from_server: mpsc::Receiver<TransportEvent>,
    /// Abort handle to stop the session task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the session immediately.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Build the WebSocket URL for a Socket.IO server.
///
/// Accepts `http(s)://` or `ws(s)://` addresses. A bare host gets the default
/// `/socket.io/` path; the Engine.IO query is always appended.
///
/// # Errors
///
/// - `TransportError::InvalidUrl` for unparsable addresses or other schemes
pub fn socket_url(server: &str) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(server).map_err(|e| TransportError::InvalidUrl(format!("{server}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(TransportError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidUrl(format!("cannot use scheme {scheme}")))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(SOCKET_PATH);
    }
    url.query_pairs_mut().append_pair("EIO", "4").append_pair("transport", "websocket");
    Ok(url)
}

/// Start a Socket.IO session authenticated with `token`.
///
/// Returns immediately; the handshake runs in the background and reports
/// `Opened` or `Failed` on the event channel. Must be called from within a
/// Tokio runtime.
///
/// # Errors
///
/// - `TransportError::InvalidUrl` if `server` is not a usable address
pub fn connect(server: &str, token: &str) -> Result<ConnectedClient, TransportError> {
    let url = socket_url(server)?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<ClientCommand>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(run_connection(url, token.to_string(), to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run one session and report how it ended.
async fn run_connection(
    url: Url,
    token: String,
    mut to_server: mpsc::Receiver<ClientCommand>,
    events: mpsc::Sender<TransportEvent>,
) {
    let last = match run_session(&url, &token, &mut to_server, &events).await {
        Ok(reason) => {
            info!(%reason, "realtime channel closed");
            TransportEvent::Closed { reason }
        },
        Err(e) => {
            warn!(error = %e, "realtime channel failed");
            TransportEvent::Failed { message: e.to_string() }
        },
    };

    if events.send(last).await.is_err() {
        debug!("event receiver dropped before session end");
    }
}

/// Handshake, then pump commands out and events in until either side closes.
///
/// Returns the close reason on an orderly close.
async fn run_session(
    url: &Url,
    token: &str,
    to_server: &mut mpsc::Receiver<ClientCommand>,
    events: &mpsc::Sender<TransportEvent>,
) -> Result<String, TransportError> {
    let (ws, _) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;
    let (mut sink, mut stream) = ws.split();

    let handshake = loop {
        match stream.next().await {
            Some(Ok(tungstenite::Message::Text(text))) => match EnginePacket::decode(&text)? {
                EnginePacket::Open(handshake) => break handshake,
                other => {
                    return Err(TransportError::Handshake(format!(
                        "expected open packet, got {other:?}"
                    )));
                },
            },
            Some(Ok(tungstenite::Message::Close(_))) | None => {
                return Err(TransportError::Handshake("closed during handshake".to_string()));
            },
            Some(Ok(_)) => {},
            Some(Err(e)) => return Err(TransportError::Connection(e.to_string())),
        }
    };
    debug!(
        sid = %handshake.sid,
        ping_interval = handshake.ping_interval,
        ping_timeout = handshake.ping_timeout,
        "engine.io open"
    );

    // The server pings every interval; silence past interval plus timeout
    // means the channel is dead even if the socket never reports it.
    let heartbeat =
        Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout));
    let silence = tokio::time::sleep(heartbeat);
    tokio::pin!(silence);

    let auth = serde_json::to_value(ConnectAuth { token: token.to_string() })
        .map_err(|e| ProtocolError::JsonEncode(e.to_string()))?;
    send_engine(&mut sink, SocketPacket::connect(Some(auth)).into_engine()?).await?;

    loop {
        tokio::select! {
            command = to_server.recv() => {
                let Some(command) = command else {
                    send_engine(&mut sink, SocketPacket::disconnect().into_engine()?).await?;
                    if let Err(e) = sink.close().await {
                        debug!(error = %e, "close after disconnect");
                    }
                    return Ok("client disconnect".to_string());
                };
                send_engine(&mut sink, command.to_packet()?.into_engine()?).await?;
            },

            () = &mut silence => {
                return Err(TransportError::Stream(format!(
                    "ping timeout after {} ms",
                    heartbeat.as_millis()
                )));
            },

            frame = stream.next() => {
                silence.as_mut().reset(Instant::now() + heartbeat);
                let text = match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => text,
                    Some(Ok(tungstenite::Message::Close(_))) | None => {
                        return Ok("transport close".to_string());
                    },
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
                };

                if let Some(reason) = handle_text(&text, &mut sink, events).await? {
                    return Ok(reason);
                }
            },
        }
    }
}

/// Handle one inbound text frame.
///
/// Returns `Some(reason)` when the server ended the session.
async fn handle_text<S>(
    text: &str,
    sink: &mut S,
    events: &mpsc::Sender<TransportEvent>,
) -> Result<Option<String>, TransportError>
where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let packet = match EnginePacket::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(error = %e, "dropping undecodable engine packet");
            return Ok(None);
        },
    };

    let body = match packet {
        EnginePacket::Ping(probe) => {
            send_engine(sink, EnginePacket::Pong(probe)).await?;
            return Ok(None);
        },
        EnginePacket::Close => return Ok(Some("server close".to_string())),
        EnginePacket::Message(body) => body,
        EnginePacket::Open(_) | EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
            return Ok(None);
        },
    };

    let packet = match SocketPacket::decode(&body) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(error = %e, "dropping undecodable socket packet");
            return Ok(None);
        },
    };

    let event = match packet.kind {
        PacketKind::Connect => {
            match packet.data.map(serde_json::from_value::<ConnectAck>) {
                Some(Ok(ack)) => debug!(sid = %ack.sid, "socket.io connected"),
                Some(Err(e)) => debug!(error = %e, "connect ack without session id"),
                None => debug!("socket.io connected"),
            }
            TransportEvent::Opened
        },
        PacketKind::ConnectError => {
            let reason = packet
                .data
                .and_then(|data| serde_json::from_value::<ErrorPayload>(data).ok())
                .map(|payload| payload.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "connection rejected".to_string());
            return Err(TransportError::Rejected(reason));
        },
        PacketKind::Disconnect => return Ok(Some("io server disconnect".to_string())),
        PacketKind::Event => match ServerEvent::from_packet(&packet) {
            Ok(event) => TransportEvent::Received(event),
            Err(e) => {
                warn!(error = %e, "dropping malformed server event");
                return Ok(None);
            },
        },
        PacketKind::Ack => return Ok(None),
    };

    if events.send(event).await.is_err() {
        return Ok(Some("client dropped".to_string()));
    }
    Ok(None)
}

async fn send_engine<S>(sink: &mut S, packet: EnginePacket) -> Result<(), TransportError>
where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let text = packet.encode()?;
    sink.send(tungstenite::Message::Text(text))
        .await
        .map_err(|e| TransportError::Stream(e.to_string()))
}

/// History endpoint body: a bare array or an object wrapping one.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    List(Vec<Message>),
    Wrapped { messages: Vec<Message> },
}

/// Bearer-authenticated client for `GET {api}/messages/{peer}`.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl HistoryClient {
    /// Client for the REST API rooted at `api_base`.
    ///
    /// # Errors
    ///
    /// - `TransportError::InvalidUrl` if `api_base` does not parse
    pub fn new(api_base: &str, token: impl Into<String>) -> Result<Self, TransportError> {
        let mut base = Url::parse(api_base)
            .map_err(|e| TransportError::InvalidUrl(format!("{api_base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { http: reqwest::Client::new(), base, token: token.into() })
    }

    /// URL of a peer's history.
    ///
    /// # Errors
    ///
    /// - `TransportError::InvalidUrl` if the peer id cannot form a path
    pub fn messages_url(&self, peer: &UserId) -> Result<Url, TransportError> {
        let mut url =
            self.base.join("messages/").map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(peer.as_str());
        Ok(url)
    }

    /// Fetch the full, ordered history with `peer`.
    ///
    /// # Errors
    ///
    /// - `TransportError::Http` for network failures, non-2xx responses and
    ///   undecodable bodies
    pub async fn fetch(&self, peer: &UserId) -> Result<Vec<Message>, TransportError> {
        let url = self.messages_url(peer)?;
        debug!(%url, "fetching history");

        let body: HistoryBody = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(match body {
            HistoryBody::List(messages) | HistoryBody::Wrapped { messages } => messages,
        })
    }

    /// Fetch in the background and deliver the result on `events`.
    pub fn spawn_fetch(&self, request: HistoryRequest, events: mpsc::Sender<TransportEvent>) {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.fetch(&request.peer_id).await.map_err(|e| e.to_string());
            if events.send(TransportEvent::HistoryFetched { request, result }).await.is_err() {
                debug!("history receiver dropped");
            }
        });
    }
}
