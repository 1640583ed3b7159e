//! Workflow sessions: the state that survives across HTTP requests.
//!
//! A synchronous submission never creates a session: the engine is drained
//! inline and the result returned to the caller. An asynchronous submission
//! registers a [`WorkflowSession`] in the [`SessionManager`] registry and
//! drains the engine on a background task, publishing every progress event
//! to the session's broadcast hub.

pub mod manager;
pub mod session;

pub use manager::{ResultFetch, SessionManager, WorkflowError};
pub use session::{ProgressReport, WorkflowSession};
