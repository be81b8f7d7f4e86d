use std::sync::Arc;

use super::error::NotificationError;

/// Provider client created once at startup.
///
/// A failed initialization is kept as `Unavailable` so the server still runs
/// and reports the reason on every provider-backed request.
pub enum ProviderHandle<G: ?Sized> {
    Ready(Arc<G>),
    Unavailable { reason: String },
}

impl<G: ?Sized> ProviderHandle<G> {
    pub fn ready(&self) -> Result<&Arc<G>, NotificationError> {
        match self {
            ProviderHandle::Ready(gateway) => Ok(gateway),
            ProviderHandle::Unavailable { reason } => {
                Err(NotificationError::NotInitialized(reason.clone()))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ProviderHandle::Ready(_))
    }
}
