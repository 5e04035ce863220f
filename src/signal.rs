//! Signal vocabulary exchanged between the engine and node threads.
//!
//! Each direction has its own enum and its own [`SignalSlot`] instance, so
//! cross-direction traffic never contends on one lock.
//!
//! [`SignalSlot`]: crate::communication::SignalSlot

use std::fmt;

/// Signals the engine deposits for the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSignal {
    /// No signal pending (the slot's idle state).
    None,
    Start,
    UpdateY,
    UpdateX,
    /// The engine ends the simulation cooperatively.
    Terminate,
    /// The engine aborts the simulation.
    Quit,
    /// Acknowledgement completing one rendezvous phase.
    Done,
    /// Unblock and exit the node's event loop (used by thread shutdown).
    Exit,
}

impl EngineSignal {
    /// Diagnostic name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineSignal::None => "NONE",
            EngineSignal::Start => "START",
            EngineSignal::UpdateY => "UPDATE_Y",
            EngineSignal::UpdateX => "UPDATE_X",
            EngineSignal::Terminate => "TERMINATE",
            EngineSignal::Quit => "QUIT",
            EngineSignal::Done => "DONE",
            EngineSignal::Exit => "EXIT",
        }
    }

    /// Signals that must end the node's event loop wherever it is blocked.
    pub fn is_termination(&self) -> bool {
        matches!(
            self,
            EngineSignal::Terminate | EngineSignal::Quit | EngineSignal::Exit
        )
    }

    /// Whether depositing this signal must also push an event into the
    /// node's queue. Acks and the idle value are consumed in-line by the
    /// handler that is already waiting for them.
    pub fn needs_event(&self) -> bool {
        !matches!(self, EngineSignal::None | EngineSignal::Done)
    }
}

impl fmt::Display for EngineSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals the node deposits for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSignal {
    /// No signal pending (the slot's idle state).
    None,
    /// The remote master started the simulation.
    Start,
    /// The remote side requests fresh outputs.
    UpdateY,
    /// The remote side hands the engine its inputs.
    UpdateX,
    /// The remote simulation finished normally.
    Terminate,
    /// The node aborts after a transport failure.
    Quit,
    /// Sentinel returned when a bounded wait elapses; never stored in a slot.
    Timeout,
}

impl NodeSignal {
    /// Diagnostic name, exposed to engine callers for log messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeSignal::None => "NONE",
            NodeSignal::Start => "START",
            NodeSignal::UpdateY => "UPDATE_Y",
            NodeSignal::UpdateX => "UPDATE_X",
            NodeSignal::Terminate => "TERMINATE",
            NodeSignal::Quit => "QUIT",
            NodeSignal::Timeout => "TIMEOUT",
        }
    }

    /// Signals that end the simulation for the engine.
    pub fn is_termination(&self) -> bool {
        matches!(self, NodeSignal::Terminate | NodeSignal::Quit)
    }
}

impl fmt::Display for NodeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
