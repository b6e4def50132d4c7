use crate::{
    config::{RelayConfig, RelayPermissions},
    envelopes::{
        self, AuthRequest, CloseRequest, CountRequest, EventRequest, RelayMessage, ReqRequest,
        MAX_FILTERS,
    },
    observers::{ObserverKey, Observers},
    relay_information::{self, RelayInformationDocument},
    Event, ID,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::{
    collections::VecDeque,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
    },
    time::Duration,
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, Mutex},
};
use tokio_tungstenite::{
    connect_async_tls_with_config,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// how long a client-initiated close may take before the socket is just dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(3);

/// how many ids from earlier connections are remembered and refused
const MAX_RETIRED_IDS: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("not connected")]
    NotConnected,

    #[error("cancelled")]
    Cancelled,

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("subscription id {0} belongs to a previous connection")]
    StaleSubscription(String),

    #[error("a REQ carries at most 4 filters, got {0}")]
    TooManyFilters(usize),

    #[error("a REQ needs at least one filter")]
    NoFilters,

    #[error("failed to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("payload is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("relay is not readable")]
    ReadNotAllowed,

    #[error("relay is not writable")]
    WriteNotAllowed,
}

impl RelayError {
    /// the operation didn't complete because it was asked to stop, nothing went wrong
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RelayError::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// everything a relay session reports to its observers
#[derive(Debug, Clone)]
pub enum Notification {
    Connected,
    ConnectionClosed(String),
    Error(String),
    Capabilities(RelayInformationDocument),
    AuthChallenge(String),
    Event {
        subscription_id: String,
        event: Event,
    },
    Count {
        subscription_id: String,
        count: u64,
        approximate: bool,
    },
    Ok {
        event_id: ID,
        accepted: bool,
        message: String,
    },
    Eose(String),
    Notice(String),
    Unknown(String),
}

impl From<RelayMessage> for Notification {
    fn from(message: RelayMessage) -> Self {
        match message {
            RelayMessage::Event {
                subscription_id,
                event,
            } => Notification::Event {
                subscription_id,
                event,
            },
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => Notification::Ok {
                event_id,
                accepted,
                message,
            },
            RelayMessage::Eose { subscription_id } => Notification::Eose(subscription_id),
            RelayMessage::Notice(notice) => Notification::Notice(notice),
            RelayMessage::Count {
                subscription_id,
                count,
                approximate,
            } => Notification::Count {
                subscription_id,
                count,
                approximate,
            },
            RelayMessage::AuthChallenge(challenge) => Notification::AuthChallenge(challenge),
            RelayMessage::Unknown(raw) => Notification::Unknown(raw),
        }
    }
}

/// one open socket: the subscription id it issued, its writer and the token that stops its tasks
struct Connection {
    subscription_id: String,
    writer: Arc<Mutex<WsSink>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("subscription_id", &self.subscription_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

enum Frame {
    Text(String),
    Closed(String),
}

#[derive(Debug)]
struct Shared {
    url: Url,
    connect_timeout: Duration,
    fetch_capabilities: bool,
    permissions: RwLock<RelayPermissions>,

    // connect, disconnect and reconnect run one at a time
    lifecycle: Mutex<()>,
    connecting: AtomicBool,
    connection: RwLock<Option<Arc<Connection>>>,

    capabilities: RwLock<Option<RelayInformationDocument>>,
    // oldest first
    retired_ids: RwLock<VecDeque<String>>,
    observers: Observers<Notification>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let connection = self
            .connection
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(conn) = connection.take() {
            conn.cancel.cancel();
        }
    }
}

/// a session with a single relay
///
/// cloning is cheap and every clone drives the same session.
#[derive(Debug, Clone)]
pub struct Relay {
    shared: Arc<Shared>,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                url: config.url,
                connect_timeout: config.connect_timeout,
                fetch_capabilities: config.fetch_capabilities,
                permissions: RwLock::new(config.permissions),
                lifecycle: Mutex::new(()),
                connecting: AtomicBool::new(false),
                connection: RwLock::new(None),
                capabilities: RwLock::new(None),
                retired_ids: RwLock::new(VecDeque::new()),
                observers: Observers::new(),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    pub fn state(&self) -> ConnectionState {
        if read(&self.shared.connection).is_some() {
            ConnectionState::Connected
        } else if self.shared.connecting.load(Ordering::SeqCst) {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// the id issued by the current connection
    pub fn subscription_id(&self) -> Option<String> {
        read(&self.shared.connection)
            .as_ref()
            .map(|conn| conn.subscription_id.clone())
    }

    pub fn permissions(&self) -> RelayPermissions {
        *read(&self.shared.permissions)
    }

    pub fn set_permissions(&self, permissions: RelayPermissions) {
        *write(&self.shared.permissions) = permissions;
    }

    /// the NIP-11 document fetched on the last connect, if any
    pub fn capabilities(&self) -> Option<RelayInformationDocument> {
        read(&self.shared.capabilities).clone()
    }

    pub fn subscribe(&self) -> (ObserverKey, mpsc::UnboundedReceiver<Notification>) {
        self.shared.observers.subscribe()
    }

    pub fn unsubscribe(&self, key: ObserverKey) -> bool {
        self.shared.observers.unsubscribe(key)
    }

    /// open the socket; does nothing when already connected
    pub async fn connect(&self, cancel: Option<&CancellationToken>) -> Result<(), RelayError> {
        let _lifecycle = with_cancel(cancel, self.shared.lifecycle.lock()).await?;
        self.connect_locked(cancel).await
    }

    /// close the socket; does nothing when already disconnected
    pub async fn disconnect(&self, cancel: Option<&CancellationToken>) -> Result<(), RelayError> {
        let _lifecycle = with_cancel(cancel, self.shared.lifecycle.lock()).await?;
        self.disconnect_locked().await;
        Ok(())
    }

    /// disconnect and connect again, always with a new subscription id
    pub async fn reconnect(&self, cancel: Option<&CancellationToken>) -> Result<(), RelayError> {
        let _lifecycle = with_cancel(cancel, self.shared.lifecycle.lock()).await?;
        self.disconnect_locked().await;
        self.connect_locked(cancel).await
    }

    async fn connect_locked(&self, cancel: Option<&CancellationToken>) -> Result<(), RelayError> {
        if self.is_connected() {
            return Ok(());
        }

        self.shared.connecting.store(true, Ordering::SeqCst);
        let result = self.open(cancel).await;
        self.shared.connecting.store(false, Ordering::SeqCst);

        if let Err(err) = &result {
            if !err.is_cancelled() {
                log::warn!("[{}] failed to connect: {}", self.url(), err);
                self.notify(Notification::Error(format!("failed to connect: {}", err)));
            }
        }
        result
    }

    async fn open(&self, cancel: Option<&CancellationToken>) -> Result<(), RelayError> {
        let url = self.url().clone();
        let timeout = self.shared.connect_timeout;

        let ws = with_cancel(cancel, async {
            let request = match url.as_str().into_client_request() {
                Ok(request) => request,
                Err(err) => return Err(RelayError::Websocket(err)),
            };
            match tokio::time::timeout(
                timeout,
                connect_async_tls_with_config(request, None, false, None),
            )
            .await
            {
                Ok(Ok((ws, _))) => Ok(ws),
                Ok(Err(err)) => Err(RelayError::Websocket(err)),
                Err(_) => Err(RelayError::Timeout(timeout)),
            }
        })
        .await??;

        // best effort, a relay without a NIP-11 document is still a relay
        *write(&self.shared.capabilities) = None;
        if self.shared.fetch_capabilities {
            match with_cancel(cancel, relay_information::fetch(url.as_str())).await? {
                Ok(info) => {
                    *write(&self.shared.capabilities) = Some(info.clone());
                    self.notify(Notification::Capabilities(info));
                }
                Err(err) => {
                    log::warn!("[{}] failed to fetch relay information: {}", url, err);
                }
            }
        }

        let (sink, stream) = ws.split();
        let conn = Arc::new(Connection {
            subscription_id: uuid::Uuid::new_v4().to_string(),
            writer: Arc::new(Mutex::new(sink)),
            cancel: CancellationToken::new(),
        });
        *write(&self.shared.connection) = Some(conn.clone());

        log::info!(
            "[{}] connected, subscription id {}",
            url,
            conn.subscription_id
        );
        self.notify(Notification::Connected);

        // received frames go through a queue so slow observers never hold up the socket
        let (frames_sender, frames) = mpsc::unbounded_channel();
        tokio::spawn(receive_loop(
            url,
            stream,
            conn.writer.clone(),
            frames_sender,
            conn.cancel.clone(),
        ));
        tokio::spawn(dispatch_loop(frames, conn, Arc::downgrade(&self.shared)));

        Ok(())
    }

    async fn disconnect_locked(&self) {
        let Some(conn) = write(&self.shared.connection).take() else {
            return;
        };
        self.retire(&conn.subscription_id);

        let close = CloseRequest::new(conn.subscription_id.as_str());
        let goodbye = async {
            let mut writer = conn.writer.lock().await;
            if let Ok(text) = serde_json::to_string(&close) {
                let _ = writer.send(Message::text(text)).await;
            }
            let _ = writer.close().await;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, goodbye).await.is_err() {
            log::info!("[{}] relay didn't acknowledge the close", self.url());
        }
        conn.cancel.cancel();

        log::info!("[{}] disconnected", self.url());
        self.notify(Notification::ConnectionClosed(
            "disconnected by client".to_string(),
        ));
    }

    pub async fn send_text(
        &self,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), RelayError> {
        let conn = self.current()?;
        self.write_frame(&conn, text.to_string(), cancel).await
    }

    /// raw payload, sent as a text frame
    pub async fn send_bytes(
        &self,
        bytes: &[u8],
        cancel: Option<&CancellationToken>,
    ) -> Result<(), RelayError> {
        let text = std::str::from_utf8(bytes)?;
        self.send_text(text, cancel).await
    }

    pub async fn send_event(
        &self,
        event: &Event,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), RelayError> {
        let conn = self.current()?;
        let text = serde_json::to_string(&EventRequest {
            event: event.clone(),
        })?;
        self.write_frame(&conn, text, cancel).await
    }

    /// answer an AUTH challenge with a signed kind 22242 event
    pub async fn send_authentication(
        &self,
        event: &Event,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), RelayError> {
        let conn = self.current()?;
        let text = serde_json::to_string(&AuthRequest {
            event: event.clone(),
        })?;
        self.write_frame(&conn, text, cancel).await
    }

    /// send a REQ, returns the subscription id that went on the wire
    pub async fn send_filter(
        &self,
        mut request: ReqRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, RelayError> {
        if request.filters.is_empty() {
            return Err(RelayError::NoFilters);
        }
        if request.filters.len() > MAX_FILTERS {
            return Err(RelayError::TooManyFilters(request.filters.len()));
        }

        let conn = self.current_for(&request.subscription_id)?;
        request.subscription_id = resolve_subscription_id(&conn, request.subscription_id);
        let text = serde_json::to_string(&request)?;
        self.write_frame(&conn, text, cancel).await?;
        Ok(request.subscription_id)
    }

    /// send a COUNT, returns the subscription id that went on the wire
    pub async fn send_count(
        &self,
        mut request: CountRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, RelayError> {
        let conn = self.current_for(&request.subscription_id)?;
        request.subscription_id = resolve_subscription_id(&conn, request.subscription_id);
        let text = serde_json::to_string(&request)?;
        self.write_frame(&conn, text, cancel).await?;
        Ok(request.subscription_id)
    }

    pub async fn send_close(
        &self,
        mut request: CloseRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), RelayError> {
        let conn = self.current_for(&request.subscription_id)?;
        request.subscription_id = resolve_subscription_id(&conn, request.subscription_id);
        let text = serde_json::to_string(&request)?;
        self.write_frame(&conn, text, cancel).await
    }

    fn current(&self) -> Result<Arc<Connection>, RelayError> {
        read(&self.shared.connection)
            .clone()
            .ok_or(RelayError::NotConnected)
    }

    /// like `current` but refuses ids issued by earlier connections
    fn current_for(&self, subscription_id: &str) -> Result<Arc<Connection>, RelayError> {
        if read(&self.shared.retired_ids)
            .iter()
            .any(|id| id == subscription_id)
        {
            return Err(RelayError::StaleSubscription(subscription_id.to_string()));
        }
        self.current()
    }

    async fn write_frame(
        &self,
        conn: &Connection,
        text: String,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), RelayError> {
        // cancelling is only possible until we get hold of the writer
        let mut writer = with_cancel(cancel, conn.writer.lock()).await?;
        if conn.cancel.is_cancelled() {
            return Err(RelayError::NotConnected);
        }

        log::debug!("[{}] sending: {}", self.url(), text);
        if let Err(err) = writer.send(Message::text(text)).await {
            log::warn!("[{}] failed to send: {}", self.url(), err);
            self.notify(Notification::Error(format!("failed to send: {}", err)));
            return Err(RelayError::Websocket(err));
        }
        Ok(())
    }

    fn retire(&self, subscription_id: &str) {
        let mut retired = write(&self.shared.retired_ids);
        if retired.iter().any(|id| id == subscription_id) {
            return;
        }
        if retired.len() == MAX_RETIRED_IDS {
            retired.pop_front();
        }
        retired.push_back(subscription_id.to_string());
    }

    fn notify(&self, notification: Notification) {
        self.shared.observers.notify(notification);
    }

    fn dispatch(&self, frame: &str) {
        let notification = match envelopes::classify(frame) {
            Ok(RelayMessage::Event {
                subscription_id,
                event,
            }) => {
                if !event.verify() {
                    log::info!("[{}] dropping event {} with a bad signature", self.url(), event.id);
                    Notification::Error(format!("event {} failed verification", event.id))
                } else {
                    Notification::Event {
                        subscription_id,
                        event,
                    }
                }
            }
            Ok(message) => {
                match &message {
                    RelayMessage::Notice(notice) => {
                        log::info!("[{}] received notice: {}", self.url(), notice)
                    }
                    RelayMessage::Unknown(raw) => {
                        log::info!("[{}] unexpected message: {}", self.url(), raw)
                    }
                    _ => {}
                }
                message.into()
            }
            Err(err) => {
                log::info!("[{}] wrong message: {}", self.url(), err);
                Notification::Error(format!("invalid message: {}", err))
            }
        };
        self.notify(notification);
    }

    /// the socket went away without us asking
    fn connection_lost(&self, conn: &Arc<Connection>, reason: String) {
        {
            let mut current = write(&self.shared.connection);
            if !current.as_ref().is_some_and(|c| Arc::ptr_eq(c, conn)) {
                // an explicit disconnect got here first
                return;
            }
            *current = None;
        }
        self.retire(&conn.subscription_id);
        conn.cancel.cancel();

        log::info!("[{}] connection closed: {}", self.url(), reason);
        self.notify(Notification::ConnectionClosed(reason));
    }
}

impl std::fmt::Display for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<relay url={}>", self.url())
    }
}

/// ids the caller didn't pick properly are replaced by the connection's own
fn resolve_subscription_id(conn: &Connection, requested: String) -> String {
    if requested.is_empty() || uuid::Uuid::parse_str(&requested).is_err() {
        conn.subscription_id.clone()
    } else {
        requested
    }
}

async fn receive_loop(
    url: Url,
    mut stream: SplitStream<WsStream>,
    writer: Arc<Mutex<WsSink>>,
    frames: mpsc::UnboundedSender<Frame>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => return,
            message = stream.next() => message,
        };

        let reason = match message {
            Some(Ok(Message::Text(text))) => {
                log::debug!("[{}] received: {}", url, text.as_str());
                if frames.send(Frame::Text(text.as_str().to_owned())).is_err() {
                    return;
                }
                continue;
            }
            Some(Ok(Message::Ping(payload))) => {
                let _ = writer.lock().await.send(Message::Pong(payload)).await;
                continue;
            }
            Some(Ok(Message::Close(frame))) => frame
                .map_or("closed without a reason".to_string(), |c| {
                    format!("close ({}) {}", c.code, c.reason)
                }),
            Some(Ok(_)) => continue,
            Some(Err(err)) => format!("error: {}", err),
            None => "connection dropped".to_string(),
        };

        let _ = frames.send(Frame::Closed(reason));
        return;
    }
}

async fn dispatch_loop(
    mut frames: mpsc::UnboundedReceiver<Frame>,
    conn: Arc<Connection>,
    shared: Weak<Shared>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = conn.cancel.cancelled() => return,
            frame = frames.recv() => frame,
        };
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let relay = Relay { shared };

        match frame {
            Some(Frame::Text(text)) => relay.dispatch(&text),
            Some(Frame::Closed(reason)) => {
                relay.connection_lost(&conn, reason);
                return;
            }
            None => {
                relay.connection_lost(&conn, "connection dropped".to_string());
                return;
            }
        }
    }
}

async fn with_cancel<F: Future>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Result<F::Output, RelayError> {
    match cancel {
        None => Ok(fut.await),
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(RelayError::Cancelled),
            output = fut => Ok(output),
        },
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventTemplate, Filter, Kind, SecretKey};

    fn closed_port_relay() -> Relay {
        // port 9 (discard) is never served locally
        let config = RelayConfig::new("ws://127.0.0.1:9")
            .unwrap()
            .with_fetch_capabilities(false)
            .with_connect_timeout(Duration::from_secs(2));
        Relay::new(config)
    }

    #[tokio::test]
    async fn test_sends_fail_when_disconnected() {
        let relay = closed_port_relay();
        assert_eq!(relay.state(), ConnectionState::Disconnected);
        assert!(relay.subscription_id().is_none());

        let event = EventTemplate::new(Kind(1), Vec::new(), "x")
            .sign(&SecretKey::generate())
            .unwrap();
        assert!(matches!(
            relay.send_event(&event, None).await,
            Err(RelayError::NotConnected)
        ));
        assert!(matches!(
            relay.send_text("[]", None).await,
            Err(RelayError::NotConnected)
        ));
        assert!(matches!(
            relay
                .send_filter(ReqRequest::new(vec![Filter::default()]), None)
                .await,
            Err(RelayError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_send_bytes_checks_utf8_first() {
        let relay = closed_port_relay();
        assert!(matches!(
            relay.send_bytes(&[0xff, 0xfe, b'['], None).await,
            Err(RelayError::InvalidUtf8(_))
        ));
        assert!(matches!(
            relay.send_bytes(b"[]", None).await,
            Err(RelayError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_retired_ids_are_bounded() {
        let relay = closed_port_relay();
        for i in 0..=MAX_RETIRED_IDS {
            relay.retire(&format!("old-{}", i));
        }
        relay.retire("old-1");
        assert_eq!(read(&relay.shared.retired_ids).len(), MAX_RETIRED_IDS);

        // the first one fell out and is only refused for being disconnected now
        assert!(matches!(
            relay.current_for("old-0"),
            Err(RelayError::NotConnected)
        ));
        let newest = format!("old-{}", MAX_RETIRED_IDS);
        assert!(matches!(
            relay.current_for(&newest),
            Err(RelayError::StaleSubscription(id)) if id == newest
        ));
        assert!(matches!(
            relay.current_for("old-1"),
            Err(RelayError::StaleSubscription(_))
        ));
    }

    #[tokio::test]
    async fn test_filter_count_is_checked_first() {
        let relay = closed_port_relay();
        assert!(matches!(
            relay.send_filter(ReqRequest::new(vec![]), None).await,
            Err(RelayError::NoFilters)
        ));
        assert!(matches!(
            relay
                .send_filter(ReqRequest::new(vec![Filter::default(); 5]), None)
                .await,
            Err(RelayError::TooManyFilters(5))
        ));
    }

    #[tokio::test]
    async fn test_failed_connect_notifies() {
        let relay = closed_port_relay();
        let (_key, mut notifications) = relay.subscribe();

        assert!(relay.connect(None).await.is_err());
        assert_eq!(relay.state(), ConnectionState::Disconnected);
        assert!(matches!(
            notifications.recv().await,
            Some(Notification::Error(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_connect() {
        let relay = closed_port_relay();
        let (_key, mut notifications) = relay.subscribe();

        let token = CancellationToken::new();
        token.cancel();
        let err = relay.connect(Some(&token)).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(relay.state(), ConnectionState::Disconnected);

        // cancelling isn't reported as a failure
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let relay = closed_port_relay();
        relay.disconnect(None).await.unwrap();
        relay.disconnect(None).await.unwrap();
        assert_eq!(relay.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_permissions_can_change() {
        let relay = closed_port_relay();
        assert!(relay.permissions().can_write());
        relay.set_permissions(RelayPermissions::read_only());
        assert!(!relay.permissions().can_write());
        assert!(relay.permissions().can_read());
    }
}
