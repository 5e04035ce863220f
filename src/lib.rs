//! # Lockstep
//!
//! Synchronization core that lets a simulation engine advance in lock-step
//! with a remote co-simulation node reached over a message bus.
//!
//! The engine and the node run on independent threads with no shared call
//! stack; every simulation step is a strict two-phase rendezvous — publish
//! outputs, then consume inputs — before either side may proceed. The
//! crate guarantees exactly-once, race-free signal delivery between the
//! two threads, supports cooperative and unilateral termination, bounds
//! every buffer against oversized messages, and recovers from transport
//! errors without corrupting simulation state.
//!
//! Building blocks, leaf first:
//!
//! - **[`SignalSlot`]**: a single-value mailbox with blocking wait, one
//!   per direction.
//! - **[`ExchangeBuffer`]**: bounded transfer of numeric vectors in both
//!   directions.
//! - **[`NodeSession`]**: the node-side lifecycle — port registration and
//!   per-event handling.
//! - **[`NodeThread`]**: the background thread driving the session's
//!   event loop.
//! - **[`Coupling`]**: the engine-side orchestrator running the two-phase
//!   exchange with timeout and error translation.
//!
//! The wire protocol stays outside the crate: transports plug in through
//! the [`BusLink`] trait, and an in-process [`LoopbackBus`] ships for
//! tests and demos.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use lockstep::{Coupling, CouplingConfig, ExchangeOutcome, LoopbackBus};
//!
//! # fn main() -> lockstep::LockstepResult<()> {
//! let mut config = CouplingConfig::new("plant_model");
//! config.transport = "loopback".to_string();
//! config.timeout_secs = 30;
//!
//! let (link, _remote) = LoopbackBus::new();
//! let mut coupling = Coupling::start_session(config, Box::new(link))?;
//!
//! loop {
//!     match coupling.exchange(&[1.0, 2.0])? {
//!         ExchangeOutcome::Exchanged { inputs, sim_time } => {
//!             // advance the simulation with `inputs` up to `sim_time`
//!             let _ = (inputs, sim_time);
//!         }
//!         ExchangeOutcome::RemoteFinished => break,
//!     }
//! }
//! coupling.stop_session();
//! # Ok(())
//! # }
//! ```

pub mod communication;
pub mod config;
pub mod core;
pub mod error;
pub mod signal;

pub use communication::{
    BusLink, ExchangeBuffer, LoopbackBus, LoopbackRemote, SignalSlot, INPUT_PORT,
    MAX_EXCHANGE_VALUES, OUTPUT_PORT,
};
pub use config::{CouplingConfig, SUPPORTED_TRANSPORTS};
pub use core::{
    Coupling, ExchangeOutcome, NodeSession, NodeThread, ProtocolPhase, SessionEvent,
    SessionFault, SessionHandle, SessionState, ThreadState,
};
pub use error::{LockstepError, LockstepResult};
pub use signal::{EngineSignal, NodeSignal};
