//! Background thread driving the node session's event loop.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Sender;
use log::{debug, error};

use crate::communication::SignalSlot;
use crate::core::session::{NodeSession, SessionEvent};
use crate::error::{LockstepError, LockstepResult};
use crate::lockstep_internal;
use crate::signal::EngineSignal;

/// Thread lifecycle states for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadState::Stopped => write!(f, "Stopped"),
            ThreadState::Starting => write!(f, "Starting"),
            ThreadState::Running => write!(f, "Running"),
            ThreadState::Stopping => write!(f, "Stopping"),
        }
    }
}

/// Owns the operating thread behind a [`NodeSession`].
///
/// The engine→node slot and the event queue stay shared with this handle
/// so `stop` can always unblock the loop, whether it is parked on the
/// queue or mid-handshake on the slot.
pub struct NodeThread {
    name: String,
    to_node: Arc<SignalSlot<EngineSignal>>,
    events: Sender<SessionEvent>,
    handle: Option<JoinHandle<()>>,
    state: ThreadState,
}

impl NodeThread {
    pub(crate) fn new(
        name: String,
        to_node: Arc<SignalSlot<EngineSignal>>,
        events: Sender<SessionEvent>,
    ) -> Self {
        Self {
            name,
            to_node,
            events,
            handle: None,
            state: ThreadState::Stopped,
        }
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Initialize the session's ports and spawn its event loop.
    ///
    /// Fails if the thread is already running; port registration happens
    /// on the caller's thread so a connect failure is reported before
    /// anything is spawned.
    pub fn start(&mut self, mut session: NodeSession) -> LockstepResult<()> {
        if self.handle.is_some() {
            return Err(LockstepError::session(format!(
                "node thread '{}' is already running",
                self.name
            )));
        }
        self.state = ThreadState::Starting;
        if let Err(err) = session.initialize() {
            self.state = ThreadState::Stopped;
            return Err(err);
        }
        let spawned = thread::Builder::new()
            .name(format!("cosim-node-{}", self.name))
            .spawn(move || session.run());
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = ThreadState::Running;
                debug!("node thread '{}' started", self.name);
                Ok(())
            }
            Err(err) => {
                self.state = ThreadState::Stopped;
                Err(lockstep_internal!("failed to spawn node thread: {}", err))
            }
        }
    }

    /// Unblock the event loop with an exit request and join.
    /// Calling on an already-stopped thread is a no-op.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.state = ThreadState::Stopping;
        // Wake a loop parked mid-handshake on the slot, then one parked on
        // the queue; either path observes the exit request.
        self.to_node.set(EngineSignal::Exit);
        let _ = self.events.send(SessionEvent::EngineRequest);
        if handle.join().is_err() {
            error!("node thread '{}' panicked", self.name);
        }
        self.state = ThreadState::Stopped;
        debug!("node thread '{}' stopped", self.name);
    }
}

impl Drop for NodeThread {
    fn drop(&mut self) {
        self.stop();
    }
}
