// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection manager: keeps one session up and rebuilds it when it drops.
//!
//! The manager owns its session outright. Every rebuild asks the factory
//! for a fresh session; the old one is closed and its pending events are
//! discarded. While the caller wants the link up and it is down, a single
//! monitor task retries on a fixed period.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::error::{ConnectorError, ConnectorResult, SessionError, SessionResult};
use crate::options::{ConnectorOptions, FailurePolicy};
use crate::session::{Session, SessionEvent, SessionEventReceiver, SessionFactory};
use crate::state::{Effects, LinkState, Phase, Transition};
use crate::websocket::WebSocketFactory;

/// Notification delivered to [`ConnectionManager::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// `connected` flipped; always followed by `Connected` or `Disconnected`.
    ConnectionChanged(bool),
    Connected,
    Disconnected,
    /// Raw frame from the session, untouched.
    Message(String),
    /// A failure with nobody waiting on it: socket errors and failed
    /// background reconnects.
    Error(ConnectorError),
    Info(String),
    /// Handshake refused. Only published with [`FailurePolicy::Emit`].
    Failed(SessionError),
}

struct SessionSlot<S> {
    session: Arc<S>,
    /// Drains this session's events into the manager.
    pump: JoinHandle<()>,
}

struct Inner<F: SessionFactory> {
    options: ConnectorOptions,
    factory: F,
    state: Mutex<LinkState>,
    slot: Mutex<Option<SessionSlot<F::Session>>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<ConnectorEvent>,
}

/// Keeps a session connected.
///
/// Cheap to clone; clones drive the same link.
pub struct ConnectionManager<F: SessionFactory = WebSocketFactory> {
    inner: Arc<Inner<F>>,
}

impl<F: SessionFactory> Clone for ConnectionManager<F> {
    fn clone(&self) -> Self {
        ConnectionManager { inner: Arc::clone(&self.inner) }
    }
}

impl ConnectionManager<WebSocketFactory> {
    /// Create a manager connecting over WebSocket.
    pub fn new(options: ConnectorOptions) -> Self {
        Self::with_factory(options, WebSocketFactory)
    }
}

impl<F: SessionFactory> ConnectionManager<F> {
    /// Create a manager with a custom session factory (for testing).
    pub fn with_factory(options: ConnectorOptions, factory: F) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        ConnectionManager {
            inner: Arc::new(Inner {
                options,
                factory,
                state: Mutex::new(LinkState::default()),
                slot: Mutex::new(None),
                monitor: Mutex::new(None),
                events,
            }),
        }
    }

    /// Subscribe to connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.inner.events.subscribe()
    }

    pub fn options(&self) -> &ConnectorOptions {
        &self.inner.options
    }

    /// Snapshot of the link flags.
    pub fn state(&self) -> LinkState {
        self.inner.lock_state().clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock_state().phase()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock_state().connected
    }

    /// Server-assigned id of the live session.
    pub fn connection_id(&self) -> Option<String> {
        self.inner.lock_state().connection_id.clone()
    }

    /// Whether the reconnect monitor is running.
    pub fn monitor_active(&self) -> bool {
        lock(&self.inner.monitor).as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Connect the session, creating one if needed.
    ///
    /// On success the link is marked as wanted, so later drops are repaired
    /// automatically. Resolves only when the session's own connect does.
    pub async fn connect(&self) -> ConnectorResult<()> {
        let session = self.inner.session_or_create();
        {
            let mut state = self.inner.lock_state();
            if state.connecting {
                return Err(ConnectorError::ConnectInProgress);
            }
            self.inner.apply(&mut state, Transition::ConnectStarted);
        }

        if session.is_open() {
            // Stale socket from an earlier attempt
            if let Err(e) = session.close().await {
                debug!(error = %e, "closing stale session failed");
            }
        }

        let result = session.connect().await;
        self.inner.finish_connect(&session, result, true).await
    }

    /// Close the link and stop reconnecting.
    ///
    /// Safe to call repeatedly; only the first call after a connection
    /// publishes `Disconnected`.
    pub async fn close(&self) {
        self.inner.cancel_monitor();

        let slot = lock(&self.inner.slot).take();
        if let Some(slot) = slot {
            slot.pump.abort();
            if let Err(e) = slot.session.close().await {
                debug!(error = %e, "closing session failed");
            }
        }

        self.inner.transition(Transition::Closed);
        self.inner.cancel_monitor();
        info!("link closed");
    }

    /// Throw the session away and connect a new one built from the current
    /// options. Whether the link is wanted is left as it was.
    ///
    /// Does nothing if a connect is already in flight.
    pub async fn force_reconnect(&self) -> ConnectorResult<()> {
        {
            let mut state = self.inner.lock_state();
            if state.connecting {
                debug!("reconnect skipped, connect already in flight");
                return Ok(());
            }
            self.inner.apply(&mut state, Transition::ConnectStarted);
        }

        let (session, previous) = self.inner.replace_session();
        if let Some(previous) = previous {
            previous.pump.abort();
            if let Err(e) = previous.session.close().await {
                debug!(error = %e, "closing replaced session failed");
            }
        }

        let result = session.connect().await;
        self.inner.finish_connect(&session, result, false).await
    }

    /// Send a raw frame over the current session.
    pub async fn send(&self, raw: impl Into<String>) -> ConnectorResult<()> {
        let session = self.inner.current_session().ok_or(ConnectorError::NoSession)?;
        session.send(raw.into()).await.map_err(ConnectorError::Transport)
    }
}

impl<F: SessionFactory> Inner<F> {
    fn lock_state(&self) -> MutexGuard<'_, LinkState> {
        lock(&self.state)
    }

    fn emit(&self, event: ConnectorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn transition(self: &Arc<Self>, transition: Transition) {
        let mut state = self.lock_state();
        self.apply(&mut state, transition);
    }

    /// Applies `transition` and carries out its effects while the state is
    /// still locked, so events go out in transition order.
    fn apply(self: &Arc<Self>, state: &mut LinkState, transition: Transition) {
        let Effects { changed, restart_monitor } = state.apply(transition);
        debug_assert!(state.is_consistent(), "inconsistent link state: {state:?}");

        if let Some(connected) = changed {
            debug!(connected, connection_id = ?state.connection_id, "connection changed");
            self.emit(ConnectorEvent::ConnectionChanged(connected));
            self.emit(if connected { ConnectorEvent::Connected } else { ConnectorEvent::Disconnected });
        }
        if restart_monitor {
            self.restart_monitor();
        }
    }

    async fn finish_connect(
        self: &Arc<Self>,
        session: &Arc<F::Session>,
        result: SessionResult<String>,
        open: bool,
    ) -> ConnectorResult<()> {
        if !self.is_current(session) {
            // Closed or replaced while connecting. The state already moved
            // on and may belong to a newer attempt.
            debug!("discarding connect on a retired session");
            if result.is_ok() {
                if let Err(e) = session.close().await {
                    debug!(error = %e, "closing retired session failed");
                }
            }
            return Err(ConnectorError::Connect(SessionError::ConnectionClosed));
        }

        let mut state = self.lock_state();
        match result {
            Ok(session_id) => {
                info!(session_id = %session_id, "session established");
                self.apply(&mut state, Transition::Established { session_id });
                if open {
                    self.apply(&mut state, Transition::Opened);
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.apply(&mut state, Transition::ConnectFailed);
                Err(ConnectorError::Connect(e))
            }
        }
    }

    fn current_session(&self) -> Option<Arc<F::Session>> {
        lock(&self.slot).as_ref().map(|slot| Arc::clone(&slot.session))
    }

    fn is_current(&self, session: &Arc<F::Session>) -> bool {
        lock(&self.slot).as_ref().is_some_and(|slot| Arc::ptr_eq(&slot.session, session))
    }

    fn session_or_create(self: &Arc<Self>) -> Arc<F::Session> {
        let mut slot = lock(&self.slot);
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(&existing.session);
        }
        let fresh = self.build_session();
        let session = Arc::clone(&fresh.session);
        *slot = Some(fresh);
        session
    }

    /// Installs a new session, handing back the one it replaced.
    fn replace_session(
        self: &Arc<Self>,
    ) -> (Arc<F::Session>, Option<SessionSlot<F::Session>>) {
        let fresh = self.build_session();
        let session = Arc::clone(&fresh.session);
        let previous = lock(&self.slot).replace(fresh);
        (session, previous)
    }

    fn build_session(self: &Arc<Self>) -> SessionSlot<F::Session> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(self.factory.create(&self.options.session, tx));
        debug!(url = %self.options.session.url(), "session created");
        SessionSlot { session, pump: self.spawn_pump(rx) }
    }

    fn spawn_pump(self: &Arc<Self>, mut rx: SessionEventReceiver) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.on_session_event(event);
            }
        })
    }

    fn on_session_event(self: &Arc<Self>, event: SessionEvent) {
        match event {
            SessionEvent::Connected { session_id } => {
                self.transition(Transition::Established { session_id });
            }
            SessionEvent::Failed(err) => {
                match self.options.on_failure {
                    FailurePolicy::Emit => self.emit(ConnectorEvent::Failed(err)),
                    FailurePolicy::Log => warn!(error = %err, "session failed"),
                }
                self.restart_monitor();
            }
            SessionEvent::SocketClose => self.transition(Transition::Lost),
            SessionEvent::Message(raw) => self.emit(ConnectorEvent::Message(raw)),
            SessionEvent::SocketError(err) => {
                debug!(error = %err, "socket error");
                self.emit(ConnectorEvent::Error(ConnectorError::Transport(err)));
                self.restart_monitor();
            }
            SessionEvent::Info(raw) => self.emit(ConnectorEvent::Info(raw)),
        }
    }

    /// Starts the reconnect monitor, replacing any running one.
    fn restart_monitor(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = self.options.reconnect_interval();
        let auto_reconnect = self.options.auto_reconnect;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let reconnect = inner.lock_state().should_reconnect(auto_reconnect);
                if !reconnect {
                    debug!("reconnect monitor stopped");
                    break;
                }

                // The attempt outlives this task if a newer monitor replaces it.
                let manager = ConnectionManager { inner };
                tokio::spawn(async move {
                    info!("reconnecting");
                    if let Err(e) = manager.force_reconnect().await {
                        manager.inner.emit(ConnectorEvent::Error(e));
                    }
                });
            }
        });

        let previous = lock(&self.monitor).replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel_monitor(&self) {
        let monitor = lock(&self.monitor).take();
        if let Some(monitor) = monitor {
            monitor.abort();
        }
    }
}

impl<F: SessionFactory> Drop for Inner<F> {
    fn drop(&mut self) {
        let monitor = self.monitor.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(monitor) = monitor.take() {
            monitor.abort();
        }
        let slot = self.slot.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slot.take() {
            slot.pump.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
