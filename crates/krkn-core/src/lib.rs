pub mod config;
pub mod exceptions;
pub mod forms;
mod macros;
pub mod models;
pub mod settings;

pub use exceptions::{AppError, ErrorKind, GenericError};
pub use settings::{ConsoleSettings, LogTransport, WorkflowVariant};
