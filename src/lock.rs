use tracing::{debug, info, warn};

use crate::error::{Result, TaskdeckError};
use crate::platform::{BiometricAuthenticator, KeyValueStore};

pub const PASSCODE_ENABLED_KEY: &str = "passcodeEnabled";
pub const PASSCODE_KEY: &str = "passcode";
pub const BIOMETRIC_ENABLED_KEY: &str = "biometricEnabled";

pub const MIN_PASSCODE_LEN: usize = 4;
pub const MAX_PASSCODE_LEN: usize = 6;

const UNLOCK_PROMPT: &str = "Unlock Taskdeck";

/// Security settings, each stored under its own key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecuritySettings {
    pub passcode_enabled: bool,
    pub passcode: Option<String>,
    pub biometric_enabled: bool,
}

impl SecuritySettings {
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let passcode_enabled = store.get(PASSCODE_ENABLED_KEY).await?;
        let passcode = store.get(PASSCODE_KEY).await?;
        let biometric_enabled = store.get(BIOMETRIC_ENABLED_KEY).await?;

        Ok(Self {
            passcode_enabled: passcode_enabled.as_deref() == Some("true"),
            passcode: passcode.filter(|p| !p.is_empty()),
            biometric_enabled: biometric_enabled.as_deref() == Some("true"),
        })
    }

    /// The passcode guarding the app, if the lock is on.
    pub fn lock_passcode(&self) -> Option<&str> {
        if self.passcode_enabled {
            self.passcode.as_deref()
        } else {
            None
        }
    }

    pub async fn disable_passcode(store: &dyn KeyValueStore) -> Result<()> {
        store.set(PASSCODE_ENABLED_KEY, "false").await?;
        store.remove(PASSCODE_KEY).await?;
        info!("Passcode lock disabled");
        Ok(())
    }

    /// Turning biometrics on requires the device to support them.
    pub async fn set_biometric(
        store: &dyn KeyValueStore,
        auth: &dyn BiometricAuthenticator,
        enabled: bool,
    ) -> Result<()> {
        if enabled && !auth.is_available().await {
            return Err(TaskdeckError::Biometric(
                "Biometric authentication is not available on this device".into(),
            ));
        }

        store
            .set(BIOMETRIC_ENABLED_KEY, if enabled { "true" } else { "false" })
            .await?;
        info!("Biometric unlock enabled = {}", enabled);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    LockedAwaitingInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    /// Digit accepted, buffer not full yet.
    Pending,
    Unlocked,
    /// Full buffer did not match. Buffer cleared.
    Mismatch,
    /// Input arrived while already unlocked.
    Ignored,
}

/// Gate in front of the app content.
pub struct AppLock {
    state: LockState,
    passcode: Option<String>,
    biometric_enabled: bool,
    buffer: String,
    error: Option<String>,
}

impl AppLock {
    pub fn new(settings: &SecuritySettings) -> Self {
        let passcode = settings.lock_passcode().map(str::to_string);
        let state = if passcode.is_some() {
            LockState::LockedAwaitingInput
        } else {
            LockState::Unlocked
        };

        Self {
            state,
            passcode,
            biometric_enabled: settings.biometric_enabled,
            buffer: String::new(),
            error: None,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::LockedAwaitingInput
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of digits the entry buffer accepts.
    pub fn passcode_len(&self) -> usize {
        self.passcode.as_ref().map_or(0, |p| p.len())
    }

    /// Runs the biometric challenge when it is enabled and the device supports
    /// it. Failures leave the lock engaged for passcode entry.
    pub async fn attempt_biometric(&mut self, auth: &dyn BiometricAuthenticator) -> bool {
        if !self.is_locked() || !self.biometric_enabled {
            return false;
        }
        if !auth.is_available().await {
            debug!("Biometric unlock enabled but unavailable");
            return false;
        }

        match auth.authenticate(UNLOCK_PROMPT).await {
            Ok(true) => {
                info!("Unlocked with biometrics");
                self.unlock();
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!("Biometric auth error: {}", e);
                false
            }
        }
    }

    pub fn enter_digit(&mut self, digit: char) -> Result<LockEvent> {
        if !digit.is_ascii_digit() {
            return Err(TaskdeckError::Validation(format!(
                "Passcode input must be digits, got '{}'",
                digit
            )));
        }

        let expected = match (&self.state, &self.passcode) {
            (LockState::LockedAwaitingInput, Some(passcode)) => passcode.clone(),
            _ => return Ok(LockEvent::Ignored),
        };

        if self.buffer.len() >= expected.len() {
            return Ok(LockEvent::Ignored);
        }

        self.buffer.push(digit);
        self.error = None;

        if self.buffer.len() < expected.len() {
            return Ok(LockEvent::Pending);
        }

        if self.buffer == expected {
            info!("Unlocked with passcode");
            self.unlock();
            Ok(LockEvent::Unlocked)
        } else {
            warn!("Incorrect passcode entered");
            self.buffer.clear();
            self.error = Some("Incorrect passcode".into());
            Ok(LockEvent::Mismatch)
        }
    }

    /// Removes the last entered digit. Does nothing on an empty buffer.
    /// Keypad front ends only; the CLI feeds whole codes.
    #[allow(dead_code)]
    pub fn delete(&mut self) {
        self.buffer.pop();
        self.error = None;
    }

    fn unlock(&mut self) {
        self.state = LockState::Unlocked;
        self.buffer.clear();
        self.error = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Entering,
    Confirming,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupEvent {
    Pending,
    /// First entry accepted, now waiting for the confirmation.
    Confirming,
    /// Confirmation differed. Only the confirmation buffer was cleared.
    Mismatch,
    Complete,
}

/// First-time passcode setup: choose 4 to 6 digits, then type them again.
#[derive(Debug, Clone)]
pub struct PasscodeSetup {
    step: SetupStep,
    passcode: String,
    confirmation: String,
    error: Option<String>,
}

impl Default for PasscodeSetup {
    fn default() -> Self {
        Self::new()
    }
}

impl PasscodeSetup {
    pub fn new() -> Self {
        Self {
            step: SetupStep::Entering,
            passcode: String::new(),
            confirmation: String::new(),
            error: None,
        }
    }

    pub fn step(&self) -> SetupStep {
        self.step
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn entered_len(&self) -> usize {
        match self.step {
            SetupStep::Entering => self.passcode.len(),
            _ => self.confirmation.len(),
        }
    }

    /// Reaching the maximum length moves on to confirmation automatically.
    pub fn enter_digit(&mut self, digit: char) -> Result<SetupEvent> {
        if !digit.is_ascii_digit() {
            return Err(TaskdeckError::Validation(format!(
                "Passcode must be digits, got '{}'",
                digit
            )));
        }
        self.error = None;

        match self.step {
            SetupStep::Entering => {
                if self.passcode.len() < MAX_PASSCODE_LEN {
                    self.passcode.push(digit);
                }
                if self.passcode.len() == MAX_PASSCODE_LEN {
                    self.step = SetupStep::Confirming;
                    return Ok(SetupEvent::Confirming);
                }
                Ok(SetupEvent::Pending)
            }
            SetupStep::Confirming => {
                if self.confirmation.len() < self.passcode.len() {
                    self.confirmation.push(digit);
                }
                if self.confirmation.len() < self.passcode.len() {
                    return Ok(SetupEvent::Pending);
                }

                if self.confirmation == self.passcode {
                    self.step = SetupStep::Complete;
                    Ok(SetupEvent::Complete)
                } else {
                    self.confirmation.clear();
                    self.error = Some("Passcodes do not match".into());
                    Ok(SetupEvent::Mismatch)
                }
            }
            SetupStep::Complete => Ok(SetupEvent::Complete),
        }
    }

    /// Accepts a first entry shorter than the maximum.
    pub fn submit(&mut self) -> Result<SetupEvent> {
        if self.step != SetupStep::Entering {
            return Ok(match self.step {
                SetupStep::Complete => SetupEvent::Complete,
                _ => SetupEvent::Confirming,
            });
        }

        if self.passcode.len() < MIN_PASSCODE_LEN {
            return Err(TaskdeckError::Validation(format!(
                "Passcode must be {} to {} digits",
                MIN_PASSCODE_LEN, MAX_PASSCODE_LEN
            )));
        }

        self.step = SetupStep::Confirming;
        Ok(SetupEvent::Confirming)
    }

    /// Keypad front ends only; the CLI feeds whole codes.
    #[allow(dead_code)]
    pub fn delete(&mut self) {
        match self.step {
            SetupStep::Entering => {
                self.passcode.pop();
            }
            SetupStep::Confirming => {
                self.confirmation.pop();
            }
            SetupStep::Complete => {}
        }
        self.error = None;
    }

    /// Stores the confirmed passcode and turns the lock on.
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        if self.step != SetupStep::Complete {
            return Err(TaskdeckError::Validation("Passcode not confirmed".into()));
        }

        store.set(PASSCODE_KEY, &self.passcode).await?;
        store.set(PASSCODE_ENABLED_KEY, "true").await?;
        info!("Passcode lock enabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::biometric::Unavailable;
    use crate::platform::storage::MemoryStore;
    use async_trait::async_trait;

    struct FakeBiometric {
        succeed: bool,
    }

    #[async_trait]
    impl BiometricAuthenticator for FakeBiometric {
        async fn is_available(&self) -> bool {
            true
        }

        async fn authenticate(&self, _prompt: &str) -> Result<bool> {
            Ok(self.succeed)
        }
    }

    fn locked_with(passcode: &str) -> AppLock {
        AppLock::new(&SecuritySettings {
            passcode_enabled: true,
            passcode: Some(passcode.into()),
            biometric_enabled: false,
        })
    }

    fn enter(lock: &mut AppLock, digits: &str) -> Vec<LockEvent> {
        digits.chars().map(|d| lock.enter_digit(d).unwrap()).collect()
    }

    #[test]
    fn test_unlocked_without_passcode() {
        let lock = AppLock::new(&SecuritySettings::default());
        assert_eq!(lock.state(), LockState::Unlocked);

        let disabled = AppLock::new(&SecuritySettings {
            passcode_enabled: false,
            passcode: Some("1234".into()),
            biometric_enabled: false,
        });
        assert!(!disabled.is_locked());

        let enabled_without_code = AppLock::new(&SecuritySettings {
            passcode_enabled: true,
            passcode: None,
            biometric_enabled: false,
        });
        assert!(!enabled_without_code.is_locked());
    }

    #[test]
    fn test_delete_then_complete_unlocks() {
        let mut lock = locked_with("1234");
        assert_eq!(lock.state(), LockState::LockedAwaitingInput);

        enter(&mut lock, "12");
        lock.delete();
        assert_eq!(lock.buffer(), "1");

        let events = enter(&mut lock, "234");
        assert_eq!(events.last(), Some(&LockEvent::Unlocked));
        assert_eq!(lock.state(), LockState::Unlocked);
        assert_eq!(lock.buffer(), "");
    }

    #[test]
    fn test_wrong_passcode_clears_buffer_and_stays_locked() {
        let mut lock = locked_with("1234");
        let events = enter(&mut lock, "9999");

        assert_eq!(
            events,
            vec![LockEvent::Pending, LockEvent::Pending, LockEvent::Pending, LockEvent::Mismatch]
        );
        assert_eq!(lock.error(), Some("Incorrect passcode"));
        assert_eq!(lock.buffer(), "");
        assert_eq!(lock.state(), LockState::LockedAwaitingInput);

        enter(&mut lock, "1");
        assert!(lock.error().is_none());
    }

    #[test]
    fn test_delete_on_empty_buffer_is_noop() {
        let mut lock = locked_with("1234");
        lock.delete();
        lock.delete();
        assert_eq!(lock.buffer(), "");
        assert!(lock.is_locked());
    }

    #[test]
    fn test_non_digit_rejected() {
        let mut lock = locked_with("1234");
        assert!(lock.enter_digit('a').is_err());
        assert_eq!(lock.buffer(), "");
    }

    #[test]
    fn test_buffer_length_follows_stored_passcode() {
        let mut lock = locked_with("123456");
        assert_eq!(lock.passcode_len(), 6);
        let events = enter(&mut lock, "1234");
        assert!(events.iter().all(|e| *e == LockEvent::Pending));
        enter(&mut lock, "56");
        assert!(!lock.is_locked());
        assert_eq!(lock.enter_digit('1').unwrap(), LockEvent::Ignored);
    }

    #[tokio::test]
    async fn test_biometric_success_unlocks() {
        let mut lock = AppLock::new(&SecuritySettings {
            passcode_enabled: true,
            passcode: Some("1234".into()),
            biometric_enabled: true,
        });
        assert!(lock.attempt_biometric(&FakeBiometric { succeed: true }).await);
        assert_eq!(lock.state(), LockState::Unlocked);
    }

    #[tokio::test]
    async fn test_biometric_failure_or_disabled_stays_locked() {
        let mut enabled = AppLock::new(&SecuritySettings {
            passcode_enabled: true,
            passcode: Some("1234".into()),
            biometric_enabled: true,
        });
        assert!(!enabled.attempt_biometric(&FakeBiometric { succeed: false }).await);
        assert!(!enabled.attempt_biometric(&Unavailable).await);
        assert!(enabled.is_locked());

        let mut disabled = locked_with("1234");
        assert!(!disabled.attempt_biometric(&FakeBiometric { succeed: true }).await);
        assert!(disabled.is_locked());
    }

    #[test]
    fn test_setup_requires_minimum_length() {
        let mut setup = PasscodeSetup::new();
        for d in "123".chars() {
            setup.enter_digit(d).unwrap();
        }
        assert!(setup.submit().is_err());

        setup.enter_digit('4').unwrap();
        assert_eq!(setup.submit().unwrap(), SetupEvent::Confirming);
        assert_eq!(setup.step(), SetupStep::Confirming);
    }

    #[test]
    fn test_setup_auto_confirms_at_max_length() {
        let mut setup = PasscodeSetup::new();
        let events: Vec<SetupEvent> = "123456".chars().map(|d| setup.enter_digit(d).unwrap()).collect();
        assert_eq!(events.last(), Some(&SetupEvent::Confirming));
        assert_eq!(setup.entered_len(), 0);
    }

    #[test]
    fn test_setup_mismatch_retries_confirmation_only() {
        let mut setup = PasscodeSetup::new();
        for d in "2580".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.submit().unwrap();

        let events: Vec<SetupEvent> = "2581".chars().map(|d| setup.enter_digit(d).unwrap()).collect();
        assert_eq!(events.last(), Some(&SetupEvent::Mismatch));
        assert_eq!(setup.step(), SetupStep::Confirming);
        assert_eq!(setup.error(), Some("Passcodes do not match"));
        assert_eq!(setup.entered_len(), 0);

        let events: Vec<SetupEvent> = "2580".chars().map(|d| setup.enter_digit(d).unwrap()).collect();
        assert_eq!(events.last(), Some(&SetupEvent::Complete));
        assert_eq!(setup.step(), SetupStep::Complete);
    }

    #[test]
    fn test_setup_delete_keeps_first_entry_while_confirming() {
        let mut setup = PasscodeSetup::new();
        setup.delete();
        assert_eq!(setup.entered_len(), 0);

        for d in "135".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.delete();
        assert_eq!(setup.entered_len(), 2);
        for d in "57".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.submit().unwrap();

        setup.delete();
        assert_eq!(setup.step(), SetupStep::Confirming);
        assert_eq!(setup.entered_len(), 0);

        for d in "13".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.delete();
        assert_eq!(setup.entered_len(), 1);

        let events: Vec<SetupEvent> = "357".chars().map(|d| setup.enter_digit(d).unwrap()).collect();
        assert_eq!(events.last(), Some(&SetupEvent::Complete));
    }

    #[tokio::test]
    async fn test_setup_delete_then_save_stores_first_entry() {
        let store = MemoryStore::new();
        let mut setup = PasscodeSetup::new();
        for d in "9876".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.submit().unwrap();
        for d in "985".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.delete();
        for d in "76".chars() {
            setup.enter_digit(d).unwrap();
        }
        assert_eq!(setup.step(), SetupStep::Complete);

        setup.save(&store).await.unwrap();
        assert_eq!(store.snapshot(PASSCODE_KEY).as_deref(), Some("9876"));
    }

    #[tokio::test]
    async fn test_setup_save_and_disable() {
        let store = MemoryStore::new();
        let mut setup = PasscodeSetup::new();
        assert!(setup.save(&store).await.is_err());

        for d in "4321".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.submit().unwrap();
        for d in "4321".chars() {
            setup.enter_digit(d).unwrap();
        }
        setup.save(&store).await.unwrap();

        let settings = SecuritySettings::load(&store).await.unwrap();
        assert_eq!(settings.lock_passcode(), Some("4321"));
        assert!(AppLock::new(&settings).is_locked());

        SecuritySettings::disable_passcode(&store).await.unwrap();
        let settings = SecuritySettings::load(&store).await.unwrap();
        assert!(settings.lock_passcode().is_none());
        assert!(store.snapshot(PASSCODE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_biometric_requires_hardware() {
        let store = MemoryStore::new();
        let result = SecuritySettings::set_biometric(&store, &Unavailable, true).await;
        assert!(matches!(result, Err(TaskdeckError::Biometric(_))));

        SecuritySettings::set_biometric(&store, &FakeBiometric { succeed: true }, true)
            .await
            .unwrap();
        assert!(SecuritySettings::load(&store).await.unwrap().biometric_enabled);

        SecuritySettings::set_biometric(&store, &Unavailable, false).await.unwrap();
        assert!(!SecuritySettings::load(&store).await.unwrap().biometric_enabled);
    }
}
