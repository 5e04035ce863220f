//! Node-side session: lifecycle, port bindings, and remote event handling.
//!
//! The session runs on the background thread owned by
//! [`NodeThread`](crate::core::NodeThread). Everything remote-originated
//! arrives as a [`SessionEvent`] on a bounded queue; the engine side only
//! ever talks to the session through the two signal slots and the exchange
//! buffer.

use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use log::{debug, error, warn};

use crate::communication::{
    BusLink, ExchangeBuffer, SignalSlot, INPUT_PORT, MAX_EXCHANGE_VALUES, OUTPUT_PORT,
};
use crate::config::CouplingConfig;
use crate::error::{LockstepError, LockstepResult};
use crate::signal::{EngineSignal, NodeSignal};

/// Capacity of the session's event queue.
pub(crate) const EVENT_QUEUE_DEPTH: usize = 64;

/// Session lifecycle states. Only the node thread mutates the state after
/// start; the engine observes it through accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Initialized,
    Running,
    Error,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Created => write!(f, "Created"),
            SessionState::Initialized => write!(f, "Initialized"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Error => write!(f, "Error"),
            SessionState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Transport failure classes a bus link can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFault {
    /// Raw bytes could not be parsed into a structured message.
    MessageParse,
    /// A structured message held values of the wrong type or dimension.
    ValueExtract,
    /// Publishing a message failed.
    Send,
    /// A bus-level failure outside any single message.
    Bus,
}

impl SessionFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionFault::MessageParse => "message parse",
            SessionFault::ValueExtract => "value extract",
            SessionFault::Send => "send",
            SessionFault::Bus => "bus",
        }
    }
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote-originated activity delivered to the session's event loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The co-simulation master starts the run.
    Initialization,
    /// The remote side requests fresh outputs.
    UpdateY { sim_time: f64 },
    /// The remote side hands over inputs for the engine to consume.
    UpdateX { sim_time: f64 },
    /// The remote session ended.
    Termination,
    /// The engine deposited a termination-class signal in its slot.
    EngineRequest,
    /// Transport-level failure.
    Fault { kind: SessionFault, detail: String },
    /// Non-fatal condition worth logging.
    Warning { detail: String },
}

/// The transport's way back into a running session.
///
/// Cheap to clone; a bus link receives one at `connect` time and uses it
/// from whatever thread its client library calls back on.
#[derive(Clone)]
pub struct SessionHandle {
    events: Sender<SessionEvent>,
    buffer: Arc<ExchangeBuffer>,
}

impl SessionHandle {
    pub(crate) fn new(events: Sender<SessionEvent>, buffer: Arc<ExchangeBuffer>) -> Self {
        Self { events, buffer }
    }

    /// Queue an event for the session. Returns false once the session has
    /// gone away.
    pub fn post(&self, event: SessionEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Deliver an input snapshot from the bus.
    ///
    /// An oversized vector is rejected as a protocol fault — the snapshot
    /// is not stored, the session is asked to quit — rather than being
    /// silently truncated.
    pub fn deliver_inputs(&self, values: &[f64]) -> LockstepResult<usize> {
        if values.len() > MAX_EXCHANGE_VALUES {
            let detail = format!(
                "input snapshot of {} values exceeds the {} bound",
                values.len(),
                MAX_EXCHANGE_VALUES
            );
            self.post(SessionEvent::Fault {
                kind: SessionFault::ValueExtract,
                detail,
            });
            return Err(LockstepError::BufferOverflow {
                held: values.len(),
                capacity: MAX_EXCHANGE_VALUES,
            });
        }
        Ok(self.buffer.write_inputs(values))
    }

    /// Report a non-fatal transport condition.
    pub fn report_warning<S: Into<String>>(&self, detail: S) -> bool {
        self.post(SessionEvent::Warning {
            detail: detail.into(),
        })
    }

    /// Report a transport failure; the session will quit.
    pub fn report_fault<S: Into<String>>(&self, kind: SessionFault, detail: S) -> bool {
        self.post(SessionEvent::Fault {
            kind,
            detail: detail.into(),
        })
    }
}

/// Node-side half of the coupling: owns the bus link and translates remote
/// events into signals on the node→engine slot, blocking on the
/// engine→node slot until each one is acknowledged.
pub struct NodeSession {
    config: CouplingConfig,
    link: Box<dyn BusLink>,
    /// Engine→node slot; this side is its sole consumer.
    to_node: Arc<SignalSlot<EngineSignal>>,
    /// Node→engine slot; this side is its sole writer.
    to_engine: Arc<SignalSlot<NodeSignal>>,
    buffer: Arc<ExchangeBuffer>,
    events: Receiver<SessionEvent>,
    handle: SessionHandle,
    state: SessionState,
}

impl NodeSession {
    pub(crate) fn new(
        config: CouplingConfig,
        link: Box<dyn BusLink>,
        to_node: Arc<SignalSlot<EngineSignal>>,
        to_engine: Arc<SignalSlot<NodeSignal>>,
        buffer: Arc<ExchangeBuffer>,
        events: Receiver<SessionEvent>,
        handle: SessionHandle,
    ) -> Self {
        Self {
            config,
            link,
            to_node,
            to_engine,
            buffer,
            events,
            handle,
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn node_name(&self) -> &str {
        &self.config.node_name
    }

    /// Connect the bus link and register the two bounded ports. Runs on
    /// the caller's thread, before the event loop is spawned.
    pub fn initialize(&mut self) -> LockstepResult<()> {
        if self.state != SessionState::Created {
            return Err(LockstepError::session(format!(
                "session '{}' already initialized (state {})",
                self.config.node_name, self.state
            )));
        }
        self.link.connect(&self.config, self.handle.clone())?;
        self.link.register_input_port(INPUT_PORT, MAX_EXCHANGE_VALUES)?;
        self.link
            .register_output_port(OUTPUT_PORT, MAX_EXCHANGE_VALUES)?;
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Event loop. Consumes the session; runs until an exit condition,
    /// then disconnects the link.
    pub fn run(mut self) {
        debug!(
            "node session '{}' entering event loop",
            self.config.node_name
        );
        self.state = SessionState::Running;
        while let Ok(event) = self.events.recv() {
            if !self.dispatch(event) {
                break;
            }
        }
        self.link.disconnect();
        debug!(
            "node session '{}' left event loop in state {}",
            self.config.node_name, self.state
        );
    }

    /// Handle one event; returns false when the loop must end.
    fn dispatch(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Initialization => {
                self.on_initialization();
                true
            }
            SessionEvent::UpdateY { sim_time } => self.on_update_y(sim_time),
            SessionEvent::UpdateX { sim_time } => {
                self.on_update_x(sim_time);
                true
            }
            SessionEvent::Termination => {
                self.on_termination();
                false
            }
            SessionEvent::EngineRequest => self.on_engine_request(),
            SessionEvent::Fault { kind, detail } => self.on_fault(kind, &detail),
            SessionEvent::Warning { detail } => {
                warn!("node '{}': {}", self.config.node_name, detail);
                true
            }
        }
    }

    /// Announce a signal to the engine and block until it responds. A
    /// clean `Done` is consumed here; anything else stays pending so the
    /// engine-request handling can pick it up.
    fn announce_and_await(&mut self, signal: NodeSignal) -> EngineSignal {
        self.to_engine.set(signal);
        let reply = self.to_node.wait();
        if reply == EngineSignal::Done {
            self.to_node.reset();
        }
        reply
    }

    /// Called once before the first step.
    fn on_initialization(&mut self) {
        debug!("node '{}' announcing simulation start", self.config.node_name);
        self.announce_and_await(NodeSignal::Start);
    }

    /// The remote peer requests fresh outputs. After the engine
    /// acknowledges, the staged outputs are published to the bus.
    fn on_update_y(&mut self, sim_time: f64) -> bool {
        self.buffer.advance_time(sim_time);
        if self.announce_and_await(NodeSignal::UpdateY) != EngineSignal::Done {
            return true;
        }
        let staged = self.buffer.read_outputs();
        if let Err(err) = self.link.publish_outputs(&staged) {
            return self.on_fault(SessionFault::Send, &err.to_string());
        }
        true
    }

    /// The remote peer hands over inputs; symmetric to `on_update_y` but
    /// nothing is published.
    fn on_update_x(&mut self, sim_time: f64) {
        self.buffer.advance_time(sim_time);
        self.announce_and_await(NodeSignal::UpdateX);
    }

    /// The remote network session ended. Termination is unilateral: the
    /// engine is notified but no acknowledgement is awaited.
    fn on_termination(&mut self) {
        debug!("node '{}' observed remote termination", self.config.node_name);
        self.state = SessionState::Terminated;
        self.to_engine.set(NodeSignal::Terminate);
    }

    /// A termination-class engine signal was queued alongside the slot
    /// update. Returns false when the loop must end.
    fn on_engine_request(&mut self) -> bool {
        match self.to_node.take() {
            EngineSignal::Terminate | EngineSignal::Exit => {
                debug!(
                    "node '{}' stopping on engine request",
                    self.config.node_name
                );
                self.state = SessionState::Terminated;
                false
            }
            _ => true,
        }
    }

    /// Transport failure: mark the session broken and issue an unsolicited
    /// quit so the engine observes the failure on its next poll instead of
    /// hanging forever.
    fn on_fault(&mut self, kind: SessionFault, detail: &str) -> bool {
        error!(
            "{} error on node '{}': {}",
            kind, self.config.node_name, detail
        );
        self.state = SessionState::Error;
        self.ask_engine_to_quit();
        false
    }

    /// Wake the engine with a quit request and hold until it has provably
    /// registered it. A stale engine signal is cleared first so the wait
    /// only releases on a fresh response; `NodeThread::stop` can always
    /// supply one.
    fn ask_engine_to_quit(&mut self) {
        self.to_node.reset();
        self.to_engine.set(NodeSignal::Quit);
        let _ = self.to_node.wait();
    }
}
