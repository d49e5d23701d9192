use async_trait::async_trait;

use crate::error::Result;

pub mod biometric;
pub mod reminders;
pub mod storage;

pub use reminders::Reminder;

/// Opaque string-by-key persistence provided by the host.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Local notification scheduling provided by the host.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn cancel_all(&self) -> Result<()>;
    async fn schedule(&self, reminder: &Reminder) -> Result<()>;
}

/// Device biometric capability check and challenge.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    async fn is_available(&self) -> bool;
    async fn authenticate(&self, prompt: &str) -> Result<bool>;
}
