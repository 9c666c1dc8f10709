use bsw_core::AsyncError;
use thiserror::Error;

/// Errors of the host port
#[derive(Error, Debug)]
pub enum PortError {
    #[error("failed to spawn task thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("task {0} panicked")]
    TaskPanicked(&'static str),
    #[error("scheduler error: {0}")]
    Async(#[from] AsyncError),
}

pub type PortResult<T> = Result<T, PortError>;
