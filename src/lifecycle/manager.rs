//! Connection lifecycle event loop.
//!
//! All lifecycle transitions are handled by a single task consuming one
//! channel: operator commands, gateway session events, connect attempt
//! results, and reconnect timers all arrive as [`LifecycleEvent`] values
//! and are processed strictly one at a time. Status reads bypass the loop
//! through a watch channel carrying the latest [`ConnectionSnapshot`].

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::common::error::GatewayError;
use crate::common::{ConnectionSnapshot, ConnectionState};
use crate::events::EventSink;
use crate::gateway::{
    CredentialStore, Gateway, GatewayConnection, GatewayConnector, GatewayEvent,
};

/// Delay before an automatic reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Everything the lifecycle loop reacts to.
enum LifecycleEvent {
    Connect {
        reply: oneshot::Sender<Result<(), GatewayError>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<(), GatewayError>>,
    },
    Acquire {
        reply: oneshot::Sender<Option<Arc<dyn Gateway>>>,
    },
    AttemptFinished(Result<GatewayConnection, GatewayError>),
    /// Event from a session's forwarder, tagged with that session's
    /// generation so events of a dead session are discarded.
    Gateway(u64, GatewayEvent),
    ReconnectDue,
}

/// Cheap, cloneable front to the lifecycle loop.
#[derive(Clone)]
pub struct LifecycleHandle {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
    status_rx: watch::Receiver<ConnectionSnapshot>,
}

impl LifecycleHandle {
    /// Begin a session handshake.
    ///
    /// Rejected while a connection is active or an attempt is in progress.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        self.request(|reply| LifecycleEvent::Connect { reply }).await
    }

    /// Close the active session, or cancel a pending attempt or reconnect.
    pub async fn disconnect(&self) -> Result<(), GatewayError> {
        self.request(|reply| LifecycleEvent::Disconnect { reply })
            .await
    }

    /// Borrow the live gateway handle, if the connection is established.
    pub async fn acquire(&self) -> Result<Arc<dyn Gateway>, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LifecycleEvent::Acquire { reply })
            .map_err(|_| GatewayError::ManagerGone)?;
        rx.await
            .map_err(|_| GatewayError::ManagerGone)?
            .ok_or(GatewayError::NotConnected)
    }

    /// Latest status snapshot, read without going through the event loop.
    pub fn status(&self) -> ConnectionSnapshot {
        self.status_rx.borrow().clone()
    }

    /// Watch receiver for status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.status_rx.clone()
    }

    /// Wait until the connection reports ready.
    pub async fn wait_ready(&self) -> Result<(), GatewayError> {
        let mut rx = self.status_rx.clone();
        loop {
            if rx.borrow_and_update().is_ready() {
                return Ok(());
            }
            rx.changed().await.map_err(|_| GatewayError::ManagerGone)?;
        }
    }

    async fn request(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<(), GatewayError>>) -> LifecycleEvent,
    ) -> Result<(), GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| GatewayError::ManagerGone)?;
        rx.await.map_err(|_| GatewayError::ManagerGone)?
    }
}

/// Owns the connection state machine. Run with [`LifecycleManager::run`].
pub struct LifecycleManager {
    connector: Arc<dyn GatewayConnector>,
    store: Arc<dyn CredentialStore>,
    sink: Arc<EventSink>,

    rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    tx: mpsc::UnboundedSender<LifecycleEvent>,
    status_tx: watch::Sender<ConnectionSnapshot>,

    gateway: Option<Arc<dyn Gateway>>,
    state: ConnectionState,
    qr: Option<String>,
    connecting: bool,
    reconnect_pending: bool,
    /// Generation of the current live session. A forwarder stamps its
    /// session's generation on every event; a mismatch means the event
    /// belongs to a session that has since been torn down.
    session_gen: u64,

    reconnect_delay: Duration,
    backoff: Box<dyn Iterator<Item = Duration> + Send>,
}

impl LifecycleManager {
    pub fn new(
        connector: Arc<dyn GatewayConnector>,
        store: Arc<dyn CredentialStore>,
        sink: Arc<EventSink>,
        reconnect_delay: Duration,
    ) -> (Self, LifecycleHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionSnapshot::idle());

        let manager = Self {
            connector,
            store,
            sink,
            rx,
            tx: tx.clone(),
            status_tx,
            gateway: None,
            state: ConnectionState::Idle,
            qr: None,
            connecting: false,
            reconnect_pending: false,
            session_gen: 0,
            reconnect_delay,
            backoff: reconnect_backoff(reconnect_delay),
        };

        (manager, LifecycleHandle { tx, status_rx })
    }

    /// Consume lifecycle events until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            match event {
                LifecycleEvent::Connect { reply } => {
                    let _ = reply.send(self.handle_connect());
                }
                LifecycleEvent::Disconnect { reply } => {
                    let result = self.handle_disconnect().await;
                    let _ = reply.send(result);
                }
                LifecycleEvent::Acquire { reply } => {
                    let gateway = if self.state == ConnectionState::Ready {
                        self.gateway.clone()
                    } else {
                        None
                    };
                    let _ = reply.send(gateway);
                }
                LifecycleEvent::AttemptFinished(result) => self.handle_attempt(result),
                LifecycleEvent::Gateway(gen, event) => {
                    self.handle_gateway_event(gen, event).await
                }
                LifecycleEvent::ReconnectDue => self.handle_reconnect_due(),
            }
        }
        debug!("All lifecycle handles dropped, stopping event loop");
    }

    fn handle_connect(&mut self) -> Result<(), GatewayError> {
        if self.connecting || self.gateway.is_some() {
            return Err(GatewayError::AlreadyActive);
        }
        self.sink.info("Connecting to messaging service...");
        self.spawn_attempt();
        Ok(())
    }

    async fn handle_disconnect(&mut self) -> Result<(), GatewayError> {
        let had_pending = self.reconnect_pending;
        // Any disconnect intent invalidates a scheduled reconnect; a stale
        // ReconnectDue that still fires is ignored.
        self.reconnect_pending = false;

        if let Some(gateway) = self.gateway.take() {
            self.invalidate_session();
            self.set_state(ConnectionState::Closing);
            if let Err(e) = gateway.disconnect().await {
                self.sink.warning(format!("Disconnect was not clean: {}", e));
            }
            self.qr = None;
            self.connecting = false;
            self.set_state(ConnectionState::Idle);
            self.sink.info("Disconnected");
            return Ok(());
        }

        if self.connecting {
            // The attempt task is still running; its result is discarded on
            // arrival because `connecting` is no longer set.
            self.invalidate_session();
            self.connecting = false;
            self.qr = None;
            self.set_state(ConnectionState::Idle);
            self.sink.info("Connect attempt cancelled");
            return Ok(());
        }

        if had_pending {
            self.qr = None;
            self.set_state(ConnectionState::Idle);
            self.sink.info("Scheduled reconnect cancelled");
            return Ok(());
        }

        Err(GatewayError::NotConnected)
    }

    fn handle_attempt(&mut self, result: Result<GatewayConnection, GatewayError>) {
        if !self.connecting {
            // Disconnected while the attempt was in flight
            if let Ok(connection) = result {
                let gateway = connection.handle;
                tokio::spawn(async move {
                    let _ = gateway.disconnect().await;
                });
            }
            return;
        }

        match result {
            Ok(connection) => {
                // Handshake continues over the event stream; not ready yet
                self.gateway = Some(Arc::clone(&connection.handle));
                self.spawn_event_forwarder(connection.events);
            }
            Err(e) => {
                self.connecting = false;
                self.set_state(ConnectionState::Idle);
                self.sink.error(format!("Connection failed: {}", e));
                self.schedule_reconnect();
            }
        }
    }

    async fn handle_gateway_event(&mut self, gen: u64, event: GatewayEvent) {
        if gen != self.session_gen {
            debug!("Dropping event from a torn-down session: {:?}", event);
            return;
        }

        match event {
            GatewayEvent::Qr(payload) => {
                self.qr = Some(payload);
                self.publish();
                self.sink
                    .info("QR code received, scan it to authenticate");
            }
            GatewayEvent::Open => {
                self.connecting = false;
                self.qr = None;
                self.set_state(ConnectionState::Ready);
                self.backoff = reconnect_backoff(self.reconnect_delay);
                self.sink.success("Connected to messaging service");
            }
            GatewayEvent::Credentials(credentials) => {
                // Awaited inline: no later event is handled until the
                // credentials are durable.
                if let Err(e) = self.store.persist(&credentials).await {
                    self.sink
                        .warning(format!("Failed to persist credentials: {}", e));
                } else {
                    debug!("Persisted credentials '{}'", credentials.key);
                }
            }
            GatewayEvent::Closed(reason) => {
                self.invalidate_session();
                self.gateway = None;
                self.connecting = false;
                self.qr = None;
                self.set_state(ConnectionState::Closing);

                if reason.is_terminal() {
                    self.set_state(ConnectionState::Idle);
                    self.sink.warning(format!(
                        "Connection closed ({}), stored session is invalid, not reconnecting",
                        reason
                    ));
                } else {
                    // State stays Closing until the reconnect timer moves it
                    // to Connecting
                    self.sink
                        .warning(format!("Connection closed ({})", reason));
                    self.schedule_reconnect();
                }
            }
        }
    }

    fn handle_reconnect_due(&mut self) {
        if !self.reconnect_pending {
            return;
        }
        self.reconnect_pending = false;
        if self.connecting || self.gateway.is_some() {
            return;
        }
        self.sink.info("Reconnecting to messaging service...");
        self.spawn_attempt();
    }

    fn spawn_attempt(&mut self) {
        self.connecting = true;
        self.set_state(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = connector.connect().await;
            let _ = tx.send(LifecycleEvent::AttemptFinished(result));
        });
    }

    fn spawn_event_forwarder(&mut self, mut events: mpsc::UnboundedReceiver<GatewayEvent>) {
        self.session_gen += 1;
        let gen = self.session_gen;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if tx.send(LifecycleEvent::Gateway(gen, event)).is_err() {
                    break;
                }
            }
        });
    }

    /// Mark the current session dead; its forwarder's remaining events are
    /// dropped on arrival.
    fn invalidate_session(&mut self) {
        self.session_gen += 1;
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_pending {
            return;
        }
        self.reconnect_pending = true;

        let delay = self.backoff.next().unwrap_or(self.reconnect_delay);
        self.sink.info(format!(
            "Reconnecting in {} second(s)...",
            delay.as_secs()
        ));

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(LifecycleEvent::ReconnectDue);
        });
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        let _ = self.status_tx.send(ConnectionSnapshot {
            state: self.state,
            qr: self.qr.clone(),
        });
    }
}

/// Constant-interval reconnect schedule expressed as a backoff iterator.
fn reconnect_backoff(delay: Duration) -> Box<dyn Iterator<Item = Duration> + Send> {
    Box::new(
        ExponentialBuilder::default()
            .with_min_delay(delay)
            .with_max_delay(delay)
            .with_factor(1.0)
            .without_max_times()
            .build(),
    )
}
