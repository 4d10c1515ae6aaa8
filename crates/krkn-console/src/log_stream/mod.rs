//! Log tailing for scenario jobs.
//!
//! A session follows one (run, job) pair: it opens a stream through a
//! [`krkn_api::LogSource`], splits the bytes into lines and reconnects with
//! bounded exponential backoff while the job is still running.

mod backoff;
mod buffer;
mod controller;
mod session;

pub use backoff::ReconnectPolicy;
pub use buffer::LineBuffer;
pub use controller::{
    LogStreamController, LogStreamRegistry, MAX_ATTEMPTS_REACHED, NO_LOGS, WAITING_FOR_POD,
};
pub use session::{ConnectionState, LogStreamHandle, LogStreamSession};
