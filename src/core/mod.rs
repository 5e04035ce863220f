//! Core runtime: the node-side session, its background thread, and the
//! engine-side exchange protocol.

pub mod protocol;
pub mod session;
pub mod thread;

pub use protocol::{Coupling, ExchangeOutcome, ProtocolPhase};
pub use session::{NodeSession, SessionEvent, SessionFault, SessionHandle, SessionState};
pub use thread::{NodeThread, ThreadState};
