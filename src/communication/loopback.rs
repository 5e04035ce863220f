//! In-process bus transport for tests and demos.
//!
//! [`LoopbackBus::new`] returns the link half (handed to the session) and
//! a [`LoopbackRemote`] half that plays the part of the co-simulation
//! master and peers: it requests updates, delivers input snapshots, ends
//! the session, and can inject transport failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::communication::BusLink;
use crate::config::CouplingConfig;
use crate::core::session::{SessionEvent, SessionFault, SessionHandle};
use crate::error::{LockstepError, LockstepResult};

#[derive(Default)]
struct LoopbackShared {
    handle: Mutex<Option<SessionHandle>>,
    published: Mutex<Vec<Vec<f64>>>,
    ports: Mutex<Vec<(String, usize)>>,
    fail_next_publish: AtomicBool,
}

/// The link half given to the session.
pub struct LoopbackBus {
    shared: Arc<LoopbackShared>,
    connected: bool,
}

impl LoopbackBus {
    /// Create a connected pair: the bus link and its remote controller.
    pub fn new() -> (Self, LoopbackRemote) {
        let shared = Arc::new(LoopbackShared::default());
        (
            Self {
                shared: Arc::clone(&shared),
                connected: false,
            },
            LoopbackRemote { shared },
        )
    }
}

impl BusLink for LoopbackBus {
    fn kind(&self) -> &'static str {
        "loopback"
    }

    fn connect(&mut self, _config: &CouplingConfig, handle: SessionHandle) -> LockstepResult<()> {
        *self.shared.handle.lock() = Some(handle);
        self.connected = true;
        Ok(())
    }

    fn register_input_port(&mut self, name: &str, capacity: usize) -> LockstepResult<()> {
        if !self.connected {
            return Err(LockstepError::communication(
                "cannot register a port before connecting",
            ));
        }
        self.shared.ports.lock().push((name.to_string(), capacity));
        Ok(())
    }

    fn register_output_port(&mut self, name: &str, capacity: usize) -> LockstepResult<()> {
        if !self.connected {
            return Err(LockstepError::communication(
                "cannot register a port before connecting",
            ));
        }
        self.shared.ports.lock().push((name.to_string(), capacity));
        Ok(())
    }

    fn publish_outputs(&mut self, values: &[f64]) -> LockstepResult<()> {
        if self.shared.fail_next_publish.swap(false, Ordering::SeqCst) {
            return Err(LockstepError::communication("injected publish failure"));
        }
        self.shared.published.lock().push(values.to_vec());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        *self.shared.handle.lock() = None;
    }
}

/// The remote half: drives the session the way a co-simulation master and
/// its peers would over a real bus.
pub struct LoopbackRemote {
    shared: Arc<LoopbackShared>,
}

impl LoopbackRemote {
    fn handle(&self) -> Option<SessionHandle> {
        self.shared.handle.lock().clone()
    }

    /// Whether the session side has connected.
    pub fn is_connected(&self) -> bool {
        self.shared.handle.lock().is_some()
    }

    /// Block until the session side has connected.
    pub fn wait_connected(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_connected() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Start the simulation run.
    pub fn begin_simulation(&self) -> bool {
        self.post(SessionEvent::Initialization)
    }

    /// Request fresh outputs from the engine.
    pub fn request_output_update(&self, sim_time: f64) -> bool {
        self.post(SessionEvent::UpdateY { sim_time })
    }

    /// Hand the engine its inputs for this step.
    pub fn request_input_update(&self, sim_time: f64) -> bool {
        self.post(SessionEvent::UpdateX { sim_time })
    }

    /// Deliver an input snapshot, as a peer's message would.
    pub fn deliver_inputs(&self, values: &[f64]) -> LockstepResult<usize> {
        match self.handle() {
            Some(handle) => handle.deliver_inputs(values),
            None => Err(LockstepError::communication("loopback not connected")),
        }
    }

    /// End the remote session.
    pub fn end_session(&self) -> bool {
        self.post(SessionEvent::Termination)
    }

    /// Report a transport failure to the session.
    pub fn report_fault<S: Into<String>>(&self, kind: SessionFault, detail: S) -> bool {
        match self.handle() {
            Some(handle) => handle.report_fault(kind, detail),
            None => false,
        }
    }

    /// Make the next `publish_outputs` call fail.
    pub fn inject_publish_failure(&self) {
        self.shared.fail_next_publish.store(true, Ordering::SeqCst);
    }

    /// Snapshots published by the session so far.
    pub fn published(&self) -> Vec<Vec<f64>> {
        self.shared.published.lock().clone()
    }

    /// Block until at least `count` snapshots have been published.
    pub fn wait_published(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.shared.published.lock().len() < count {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Ports the session registered, in registration order.
    pub fn registered_ports(&self) -> Vec<(String, usize)> {
        self.shared.ports.lock().clone()
    }

    fn post(&self, event: SessionEvent) -> bool {
        match self.handle() {
            Some(handle) => handle.post(event),
            None => false,
        }
    }
}
