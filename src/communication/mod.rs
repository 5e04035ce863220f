//! Communication layer: the signal mailboxes, the exchange buffer, and the
//! message-bus seam.
//!
//! The wire protocol itself stays outside the crate. A transport plugs in
//! through [`BusLink`]; the crate ships [`LoopbackBus`] for in-process use
//! and expects production deployments to provide an MQTT-backed
//! implementation of the same trait.

pub mod exchange;
pub mod loopback;
pub mod slot;

pub use exchange::{ExchangeBuffer, MAX_EXCHANGE_VALUES};
pub use loopback::{LoopbackBus, LoopbackRemote};
pub use slot::SignalSlot;

use crate::config::CouplingConfig;
use crate::core::session::SessionHandle;
use crate::error::LockstepResult;

/// Name of the single bounded input port every session registers.
pub const INPUT_PORT: &str = "in";
/// Name of the single bounded output port every session registers.
pub const OUTPUT_PORT: &str = "out";

/// Client-side seam to the message bus.
///
/// Implementations deliver remote activity back into the session through
/// the [`SessionHandle`] received at `connect` time: update requests,
/// input snapshots, termination, faults, and warnings all flow through the
/// handle, while the session drives the link for port registration and
/// output publishing.
pub trait BusLink: Send {
    /// Transport kind identifier, matched against
    /// [`CouplingConfig::transport`] at session start.
    fn kind(&self) -> &'static str;

    /// Open the connection and take the handle used to feed remote events
    /// into the node's loop.
    fn connect(&mut self, config: &CouplingConfig, handle: SessionHandle) -> LockstepResult<()>;

    /// Register the single bounded input port.
    fn register_input_port(&mut self, name: &str, capacity: usize) -> LockstepResult<()>;

    /// Register the single bounded output port.
    fn register_output_port(&mut self, name: &str, capacity: usize) -> LockstepResult<()>;

    /// Publish the engine's acknowledged outputs to the bus.
    fn publish_outputs(&mut self, values: &[f64]) -> LockstepResult<()>;

    /// Tear the connection down. Must be safe to call more than once.
    fn disconnect(&mut self);
}
