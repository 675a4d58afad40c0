use domain::DomainError;
use thiserror::Error;

use crate::audience::AudienceError;
use crate::broadcast::BroadcastError;
use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
    #[error("audience error: {0}")]
    Audience(#[from] AudienceError),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
}
