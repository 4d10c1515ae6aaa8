use krkn_core::{AppError, GenericError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] GenericError),

    /// The console workflow landed on its error screen
    #[error("{0}")]
    Workflow(AppError),

    #[error("Timed out after {0:?} waiting for {1}")]
    Stalled(std::time::Duration, String),

    #[error("{0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
