use thiserror::Error;

/// Errors returned by the [`crate::sync::fifo`] primitive.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FifoError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("queue is full")]
    QueueFull,
    #[error("try again")]
    TryAgain,
    #[error("out of memory")]
    OutOfMemory,
}

impl FifoError {
    #[cold]
    pub fn invalid_argument(message: impl Into<String>) -> FifoError {
        FifoError::InvalidArgument {
            message: message.into(),
        }
    }
}

pub type Result<T, E = FifoError> = std::result::Result<T, E>;
