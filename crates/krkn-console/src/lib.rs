//! Console core for driving chaos scenarios through the krkn operator.
//!
//! Flux architecture: views dispatch [`actions::Action`]s, the
//! [`stores::WorkflowStore`] reduces them and [`effects::Effects`] performs
//! the I/O, dispatching further actions with the results.

// Flux architecture modules
pub mod actions;
pub mod app;
pub mod dispatcher;
pub mod effects;
pub mod stores;

// Job log tailing
pub mod log_stream;

pub use actions::{Action, Notification, NotificationVariant};
pub use app::{Console, ConsoleHandle};
pub use dispatcher::{ActionReceiver, Dispatcher};
pub use stores::{WorkflowPhase, WorkflowState, WorkflowStore};
