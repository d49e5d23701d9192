use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::{Result, TaskdeckError};
use crate::model::{Task, TaskId};
use crate::platform::Notifier;

const DEFAULT_BODY: &str = "It's time for this task!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub task_id: TaskId,
    pub title: String,
    pub body: String,
    pub trigger_at: DateTime<Utc>,
}

impl Reminder {
    /// A reminder for `task`, if it is incomplete and its reminder time is
    /// still ahead of `now`.
    pub fn for_task(task: &Task, now: DateTime<Utc>) -> Option<Self> {
        if task.completed {
            return None;
        }
        let trigger_at = task.reminder_time.filter(|t| *t > now)?;

        let body = task
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_BODY)
            .to_string();

        Some(Self {
            task_id: task.id.clone(),
            title: format!("Reminder: {}", task.title),
            body,
            trigger_at,
        })
    }
}

pub fn pending_reminders(tasks: &[Task], now: DateTime<Utc>) -> Vec<Reminder> {
    tasks
        .iter()
        .filter_map(|task| Reminder::for_task(task, now))
        .collect()
}

/// Keeps the scheduled reminders as a JSON list on disk for an external
/// notifier (cron, systemd timer, desktop daemon) to pick up.
pub struct ReminderFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ReminderFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Vec<Reminder>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(TaskdeckError::Notification(e.to_string())),
        }
    }

    async fn write(&self, reminders: &[Reminder]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskdeckError::Notification(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(reminders)?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| TaskdeckError::Notification(e.to_string()))
    }
}

#[async_trait]
impl Notifier for ReminderFile {
    fn name(&self) -> &str {
        "reminder-file"
    }

    async fn cancel_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&[]).await
    }

    async fn schedule(&self, reminder: &Reminder) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut reminders = self.read().await?;
        reminders.push(reminder.clone());
        reminders.sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at));
        self.write(&reminders).await
    }
}

/// Used when notifications are disabled in config.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn cancel_all(&self) -> Result<()> {
        Ok(())
    }

    async fn schedule(&self, _reminder: &Reminder) -> Result<()> {
        Ok(())
    }
}
