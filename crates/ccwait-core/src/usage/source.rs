//! Usage source abstraction.

use thiserror::Error;

use super::types::UsageStatus;

/// Why a usage fetch produced no status
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no OAuth credentials found")]
    NoCredentials,
    #[error("usage endpoint returned HTTP {0}")]
    Status(u16),
    #[error("usage request failed: {0}")]
    Transport(String),
    #[error("malformed usage payload: {0}")]
    Malformed(String),
}

/// Anything that can report the current usage status.
///
/// Implementations carry their own short timeouts; callers treat every error
/// as "status unavailable" and retry on the next poll.
pub trait UsageSource: Send + Sync {
    fn fetch(&self) -> Result<UsageStatus, FetchError>;
}

impl<T: UsageSource + ?Sized> UsageSource for std::sync::Arc<T> {
    fn fetch(&self) -> Result<UsageStatus, FetchError> {
        (**self).fetch()
    }
}
