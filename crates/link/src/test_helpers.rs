// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable sessions for manager tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::SessionError;
use crate::session::{
    Session, SessionConfig, SessionEvent, SessionEventSender, SessionFactory, SessionFuture,
};

/// How the next `connect()` on any mock session behaves.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// Handshake succeeds.
    Accept,
    /// Transport refuses.
    Refuse,
    /// Server refuses the handshake.
    Reject,
    /// Never resolves.
    Hang,
    /// Succeeds after a delay.
    Delay(Duration),
}

/// Shared knobs and counters for all sessions built by one [`MockFactory`].
#[derive(Default)]
pub struct MockControl {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    senders: Mutex<Vec<(SessionEventSender, Arc<AtomicBool>)>>,
    sent: Mutex<Vec<String>>,
    created: AtomicUsize,
    connects: AtomicUsize,
    closes: AtomicUsize,
    established: AtomicUsize,
}

impl MockControl {
    /// Script the next connect outcome; unscripted connects are accepted.
    pub fn queue(&self, outcome: ConnectOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliver an event from the most recently created session.
    pub fn inject(&self, event: SessionEvent) {
        let senders = self.senders.lock().unwrap();
        let (tx, _) = senders.last().unwrap();
        tx.send(event).unwrap();
    }

    /// Simulate the newest session's socket going away.
    pub fn drop_link(&self) {
        {
            let senders = self.senders.lock().unwrap();
            let (_, open) = senders.last().unwrap();
            open.store(false, Ordering::SeqCst);
        }
        self.inject(SessionEvent::SocketClose);
    }
}

pub struct MockFactory {
    pub control: Arc<MockControl>,
}

impl MockFactory {
    pub fn new() -> (Self, Arc<MockControl>) {
        let control = Arc::new(MockControl::default());
        (MockFactory { control: Arc::clone(&control) }, control)
    }
}

impl SessionFactory for MockFactory {
    type Session = MockSession;

    fn create(&self, _config: &SessionConfig, events: SessionEventSender) -> MockSession {
        self.control.created.fetch_add(1, Ordering::SeqCst);
        let open = Arc::new(AtomicBool::new(false));
        self.control.senders.lock().unwrap().push((events.clone(), Arc::clone(&open)));
        MockSession { control: Arc::clone(&self.control), events, open }
    }
}

pub struct MockSession {
    control: Arc<MockControl>,
    events: SessionEventSender,
    open: Arc<AtomicBool>,
}

impl MockSession {
    fn accept(&self) -> Result<String, SessionError> {
        let n = self.control.established.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("session-{n}");
        self.open.store(true, Ordering::SeqCst);
        let _ = self.events.send(SessionEvent::Connected { session_id: session_id.clone() });
        Ok(session_id)
    }
}

impl Session for MockSession {
    fn connect(&self) -> SessionFuture<'_, String> {
        Box::pin(async move {
            self.control.connects.fetch_add(1, Ordering::SeqCst);
            let outcome =
                self.control.outcomes.lock().unwrap().pop_front().unwrap_or(ConnectOutcome::Accept);

            match outcome {
                ConnectOutcome::Accept => self.accept(),
                ConnectOutcome::Refuse => Err(SessionError::ConnectionFailed("refused".into())),
                ConnectOutcome::Reject => {
                    let err = SessionError::HandshakeFailed("unsupported version".into());
                    let _ = self.events.send(SessionEvent::Failed(err.clone()));
                    Err(err)
                }
                ConnectOutcome::Hang => std::future::pending().await,
                ConnectOutcome::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    self.accept()
                }
            }
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            self.control.closes.fetch_add(1, Ordering::SeqCst);
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn send(&self, raw: String) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            if !self.open.load(Ordering::SeqCst) {
                return Err(SessionError::ConnectionClosed);
            }
            self.control.sent.lock().unwrap().push(raw);
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
