use async_trait::async_trait;

use crate::error::Result;
use crate::platform::BiometricAuthenticator;

/// Hosts without biometric hardware (any terminal session).
pub struct Unavailable;

#[async_trait]
impl BiometricAuthenticator for Unavailable {
    async fn is_available(&self) -> bool {
        false
    }

    async fn authenticate(&self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
