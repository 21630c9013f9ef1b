//! ft-engine: Local controller for distributed tail sessions
//!
//! The engine connects to a set of remote hosts, dispatches the remote
//! tail producer on each, fans the resulting per-host line streams into
//! a single consumer, and tears everything down on completion or
//! interruption. Hosts that fail to connect are skipped without
//! aborting the session.

pub mod mux;
pub mod router;
pub mod session;
pub mod ssh;
pub mod target;

pub use mux::FanIn;
pub use router::{DispatchHandle, ExecutionContext, Router};
pub use session::{Session, SessionState, SessionSummary};
pub use ssh::SshRouter;
pub use target::Target;
