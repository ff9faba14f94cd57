use derive_more::From;

use std::io;

pub type PoolResult<T> = std::result::Result<T, PoolError>;

#[derive(From, Debug)]
pub enum PoolError {
    /// The operating system refused to spawn a worker thread.
    #[from(ignore)]
    FailedStart(io::Error),
}

impl From<io::Error> for PoolError {
    fn from(value: io::Error) -> Self {
        Self::FailedStart(value)
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FailedStart(err) => Some(err),
        }
    }
}

impl core::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
