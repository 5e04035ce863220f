//! Engine-side orchestration of the two-phase exchange.
//!
//! [`Coupling`] is what the engine holds: it owns both signal slots, the
//! exchange buffer, and the node thread, and runs the per-step rendezvous.
//! Splitting each step into two independent wait/acknowledge pairs lets
//! the node publish a consistent snapshot at one time cut and consume the
//! engine's reaction at a second, later cut.

use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{bounded, Sender};
use log::{debug, info, warn};

use crate::communication::{BusLink, ExchangeBuffer, SignalSlot, MAX_EXCHANGE_VALUES};
use crate::config::CouplingConfig;
use crate::core::session::{NodeSession, SessionEvent, SessionHandle, EVENT_QUEUE_DEPTH};
use crate::core::thread::NodeThread;
use crate::error::{LockstepError, LockstepResult};
use crate::signal::{EngineSignal, NodeSignal};

/// Where the engine stands in the per-step rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolPhase {
    /// Waiting for the node to request outputs.
    AwaitingY,
    /// Moving values through the buffer between two waits.
    Exchanging,
    /// Waiting for the node to hand over inputs.
    AwaitingX,
    /// Terminal; no further exchange is possible on this session.
    Aborted,
}

impl fmt::Display for ProtocolPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolPhase::AwaitingY => write!(f, "AwaitingY"),
            ProtocolPhase::Exchanging => write!(f, "Exchanging"),
            ProtocolPhase::AwaitingX => write!(f, "AwaitingX"),
            ProtocolPhase::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Outcome of one completed rendezvous.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// Both phases completed; the node's inputs and clock were captured.
    Exchanged { inputs: Vec<f64>, sim_time: f64 },
    /// The remote side ended the simulation at the rendezvous point.
    RemoteFinished,
}

/// Engine-side handle to a running coupling session.
pub struct Coupling {
    config: CouplingConfig,
    /// Engine→node slot; this side is its sole writer.
    to_node: Arc<SignalSlot<EngineSignal>>,
    /// Node→engine slot; this side is its sole consumer.
    from_node: Arc<SignalSlot<NodeSignal>>,
    buffer: Arc<ExchangeBuffer>,
    events: Sender<SessionEvent>,
    thread: NodeThread,
    phase: ProtocolPhase,
}

impl Coupling {
    /// Validate the config, wire the channels, start the node thread, and
    /// complete the start handshake with the remote master.
    ///
    /// Blocks (bounded by the configured timeout) until the node announces
    /// the simulation start, so the first [`exchange`](Self::exchange)
    /// always begins at an output rendezvous.
    pub fn start_session(
        config: CouplingConfig,
        link: Box<dyn BusLink>,
    ) -> LockstepResult<Self> {
        config.validate()?;
        if link.kind() != config.transport {
            return Err(LockstepError::config(format!(
                "bus link is '{}' but the configured transport is '{}'",
                link.kind(),
                config.transport
            )));
        }

        let to_node = Arc::new(SignalSlot::new(EngineSignal::None));
        let from_node = Arc::new(SignalSlot::new(NodeSignal::None));
        let buffer = Arc::new(ExchangeBuffer::new());
        let (events, events_rx) = bounded(EVENT_QUEUE_DEPTH);
        let handle = SessionHandle::new(events.clone(), buffer.clone());
        let session = NodeSession::new(
            config.clone(),
            link,
            to_node.clone(),
            from_node.clone(),
            buffer.clone(),
            events_rx,
            handle,
        );
        let mut thread =
            NodeThread::new(config.node_name.clone(), to_node.clone(), events.clone());
        thread.start(session)?;

        let mut coupling = Self {
            config,
            to_node,
            from_node,
            buffer,
            events,
            thread,
            phase: ProtocolPhase::AwaitingY,
        };
        if let Err(err) = coupling.await_start() {
            coupling.stop_session();
            return Err(err);
        }
        info!(
            "coupling session '{}' started",
            coupling.config.node_name
        );
        Ok(coupling)
    }

    /// Run one two-phase rendezvous: publish `outputs`, consume inputs.
    ///
    /// Any signal other than the expected update request ends the call:
    /// cooperative termination becomes [`ExchangeOutcome::RemoteFinished`],
    /// a node-side quit becomes a `Communication` error, an elapsed wait a
    /// retryable `Timeout`, and anything else a `Protocol` violation.
    pub fn exchange(&mut self, outputs: &[f64]) -> LockstepResult<ExchangeOutcome> {
        if self.phase == ProtocolPhase::Aborted {
            return Err(LockstepError::session("coupling session already ended"));
        }
        if !self.thread.is_running() {
            return Err(LockstepError::session("no active coupling session"));
        }

        // Phase one: wait for the output request before exposing anything.
        self.phase = ProtocolPhase::AwaitingY;
        match self.await_node_signal() {
            NodeSignal::UpdateY => {}
            other => return self.translate(other),
        }
        self.phase = ProtocolPhase::Exchanging;
        self.buffer.write_outputs(outputs);
        self.signal_node(EngineSignal::Done);

        // Phase two: wait for the inputs to be handed over.
        self.phase = ProtocolPhase::AwaitingX;
        match self.await_node_signal() {
            NodeSignal::UpdateX => {}
            other => return self.translate(other),
        }
        self.phase = ProtocolPhase::Exchanging;
        let inputs = match self.buffer.read_inputs(MAX_EXCHANGE_VALUES) {
            Ok(values) => values,
            Err(err) => {
                // Oversized input snapshots are fatal; the ack is withheld
                // and the session torn down by the caller.
                self.phase = ProtocolPhase::Aborted;
                return Err(err);
            }
        };
        let sim_time = self.buffer.current_time();
        self.signal_node(EngineSignal::Done);

        self.phase = ProtocolPhase::AwaitingY;
        Ok(ExchangeOutcome::Exchanged { inputs, sim_time })
    }

    /// Stop the node thread and end the session. Idempotent; always
    /// unblocks a session parked anywhere in the handshake.
    pub fn stop_session(&mut self) {
        self.phase = ProtocolPhase::Aborted;
        self.thread.stop();
    }

    /// Current rendezvous phase, for diagnostics.
    pub fn phase(&self) -> ProtocolPhase {
        self.phase
    }

    /// Simulation timestamp of the most recent input snapshot.
    pub fn current_time(&self) -> f64 {
        self.buffer.current_time()
    }

    /// Whether the engine caller should shut down when the remote
    /// simulation finishes, per configuration.
    pub fn quit_on_remote_stop(&self) -> bool {
        self.config.quit_if_remote_stops
    }

    /// Complete the start handshake: the node announces the simulation
    /// start and blocks until the engine acknowledges it.
    fn await_start(&mut self) -> LockstepResult<()> {
        match self.await_node_signal() {
            NodeSignal::Start => {
                self.signal_node(EngineSignal::Done);
                Ok(())
            }
            NodeSignal::Timeout => {
                self.phase = ProtocolPhase::Aborted;
                Err(LockstepError::timeout(
                    "remote node did not announce the simulation start",
                ))
            }
            other => {
                self.phase = ProtocolPhase::Aborted;
                Err(LockstepError::protocol(format!(
                    "expected the start announcement, got {}",
                    other
                )))
            }
        }
    }

    /// Wait (bounded by the configured timeout) for the node's signal and
    /// reset the slot immediately after reading. An elapsed wait maps to
    /// the `Timeout` sentinel and leaves the slot idle.
    fn await_node_signal(&self) -> NodeSignal {
        let signal = self.from_node.wait_for(self.config.timeout());
        self.from_node.reset();
        signal.unwrap_or(NodeSignal::Timeout)
    }

    /// Deposit a signal for the node. Termination-class signals are also
    /// pushed into the session's event queue so the loop observes them
    /// promptly even when it is not blocked on the slot.
    fn signal_node(&self, signal: EngineSignal) {
        self.to_node.set(signal);
        if signal.needs_event() && self.thread.is_running() {
            let _ = self.events.send(SessionEvent::EngineRequest);
        }
    }

    /// Translate a non-update signal observed at a rendezvous point into
    /// the call's result.
    fn translate(&mut self, signal: NodeSignal) -> LockstepResult<ExchangeOutcome> {
        match signal {
            NodeSignal::Terminate => {
                self.phase = ProtocolPhase::Aborted;
                info!(
                    "remote simulation for '{}' finished",
                    self.config.node_name
                );
                Ok(ExchangeOutcome::RemoteFinished)
            }
            NodeSignal::Quit => {
                self.phase = ProtocolPhase::Aborted;
                warn!(
                    "node '{}' requested an abnormal stop",
                    self.config.node_name
                );
                Err(LockstepError::communication(
                    "node requested an abnormal stop",
                ))
            }
            // Recoverable: the phase is left as-is so the caller may retry
            // or abort at its discretion.
            NodeSignal::Timeout => {
                debug!(
                    "no signal from node '{}' within the allotted time",
                    self.config.node_name
                );
                Err(LockstepError::timeout(format!(
                    "no signal from node '{}' within the allotted time",
                    self.config.node_name
                )))
            }
            other => {
                self.phase = ProtocolPhase::Aborted;
                Err(LockstepError::protocol(format!(
                    "unexpected signal {} at a rendezvous point",
                    other
                )))
            }
        }
    }
}

impl Drop for Coupling {
    fn drop(&mut self) {
        self.stop_session();
    }
}
