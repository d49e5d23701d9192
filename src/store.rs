use chrono::Utc;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TaskdeckError};
use crate::model::{
    validate_recurrence, validate_title, Category, CategoryColor, CustomCategory, NewTask, Task,
    TaskId, TaskUpdate,
};
use crate::platform::reminders::pending_reminders;
use crate::platform::{KeyValueStore, Notifier};

pub const TASKS_KEY: &str = "tasks";
pub const CUSTOM_CATEGORIES_KEY: &str = "customCategories";

/// Owns the task collection and the custom categories for the lifetime of the
/// process.
///
/// Every mutation finishes by reconciling custom categories, writing both
/// snapshots to the key-value store and rescheduling reminders. Failures in
/// those hooks are logged and never undo the in-memory change.
pub struct TaskStore {
    storage: Box<dyn KeyValueStore>,
    notifier: Box<dyn Notifier>,
    tasks: Vec<Task>,
    custom_categories: Vec<CustomCategory>,
    initialized: bool,
    last_id: i64,
}

impl TaskStore {
    pub fn new(storage: Box<dyn KeyValueStore>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            storage,
            notifier,
            tasks: Vec::new(),
            custom_categories: Vec::new(),
            initialized: false,
            last_id: 0,
        }
    }

    /// Reads both snapshots. Absent keys mean a first run. Until this succeeds
    /// mutations stay in memory so an empty default never overwrites stored data.
    pub async fn load(&mut self) -> Result<()> {
        let tasks: Vec<Task> = self.read_snapshot(TASKS_KEY).await?.unwrap_or_default();
        let categories: Vec<CustomCategory> = self
            .read_snapshot(CUSTOM_CATEGORIES_KEY)
            .await?
            .unwrap_or_default();

        info!(
            "Loaded {} tasks and {} custom categories from {} store",
            tasks.len(),
            categories.len(),
            self.storage.name()
        );

        self.tasks = tasks;
        self.custom_categories = categories;
        self.last_id = max_numeric_id(&self.tasks);
        self.initialized = true;
        Ok(())
    }

    async fn read_snapshot<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| TaskdeckError::persistence(key, e)),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn custom_categories(&self) -> &[CustomCategory] {
        &self.custom_categories
    }

    pub fn get_task_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskdeckError::NotFound(id.to_string()))
    }

    /// Millisecond timestamp, bumped past the last issued id so two tasks
    /// created within the same millisecond never collide.
    fn next_id(&mut self) -> TaskId {
        let id = Utc::now().timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id.to_string()
    }

    pub async fn add_task(&mut self, draft: NewTask) -> Result<Task> {
        let title = validate_title(&draft.title)?;
        let category = draft.category.normalized()?;
        let recurrence = validate_recurrence(draft.recurrence)?;
        self.register_color(&category, draft.category_color).await?;

        let task = Task {
            id: self.next_id(),
            title,
            description: draft.description,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            priority: draft.priority,
            category,
            due_date: draft.due_date,
            reminder_time: draft.reminder_time,
            tags: draft.tags,
            recurrence,
            custom_category: None,
        };

        debug!("Adding task {} '{}'", task.id, task.title);
        self.tasks.push(task.clone());
        self.after_mutation().await;

        Ok(task)
    }

    /// Merges `update` into the task with `id`. Everything is validated before
    /// the task is touched.
    pub async fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        let index = self.position(id)?;

        let title = update.title.as_deref().map(validate_title).transpose()?;
        let category = update
            .category
            .as_ref()
            .map(Category::normalized)
            .transpose()?;
        let recurrence = update.recurrence.map(validate_recurrence).transpose()?;
        if let Some(ref category) = category {
            self.register_color(category, update.category_color).await?;
        }

        let task = &mut self.tasks[index];
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(completed) = update.completed {
            task.set_completed(completed, Utc::now());
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(category) = category {
            task.category = category;
        }
        if let Some(due_date) = update.due_date {
            task.due_date = due_date;
        }
        if let Some(reminder_time) = update.reminder_time {
            task.reminder_time = reminder_time;
        }
        if let Some(tags) = update.tags {
            task.tags = tags;
        }
        if let Some(recurrence) = recurrence {
            task.recurrence = recurrence;
        }

        let updated = task.clone();
        debug!("Updated task {}", updated.id);
        self.after_mutation().await;

        Ok(updated)
    }

    /// Removes the task with `id`. Returns whether anything was removed.
    pub async fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!("Delete of unknown task {} ignored", id);
            return false;
        }

        debug!("Deleted task {}", id);
        self.after_mutation().await;
        true
    }

    pub async fn toggle_task_completion(&mut self, id: &str) -> Result<Task> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        let completed = !task.completed;
        task.set_completed(completed, Utc::now());

        let toggled = task.clone();
        debug!("Task {} completed = {}", toggled.id, toggled.completed);
        self.after_mutation().await;

        Ok(toggled)
    }

    /// Registers a custom category. Returns `false` when a category with the
    /// same name (ignoring case) already exists.
    pub async fn add_custom_category(&mut self, name: &str, color: CategoryColor) -> Result<bool> {
        let name = match Category::parse(name)? {
            Category::Custom(name) => name,
            Category::BuiltIn(builtin) => {
                return Err(TaskdeckError::Validation(format!(
                    "'{}' is a built-in category",
                    builtin.name()
                )))
            }
        };

        if self
            .custom_categories
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&name))
        {
            return Ok(false);
        }

        debug!("Adding custom category '{}'", name);
        self.custom_categories.push(CustomCategory { name, color });
        if self.initialized {
            self.persist().await;
        }
        Ok(true)
    }

    /// Deletes every task. Custom categories go with them through the usual
    /// reconciliation. Returns how many tasks were removed.
    pub async fn clear_all(&mut self) -> usize {
        let removed = self.tasks.len();
        info!("Clearing all {} tasks", removed);
        self.tasks.clear();
        self.after_mutation().await;
        removed
    }

    /// Records the colour for a custom category the store has not seen yet.
    /// Runs only after a draft or update passed validation, so a rejected
    /// command never leaves a category behind.
    async fn register_color(&mut self, category: &Category, color: Option<CategoryColor>) -> Result<()> {
        if let (Category::Custom(name), Some(color)) = (category, color) {
            self.add_custom_category(name, color).await?;
        }
        Ok(())
    }

    /// Pretty-printed JSON of the whole task collection.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.tasks)?)
    }

    /// Replaces the whole collection with `payload`. Nothing changes unless the
    /// payload parses as a task list.
    pub async fn import_json(&mut self, payload: &str) -> Result<usize> {
        let tasks: Vec<Task> = serde_json::from_str(payload)
            .map_err(|e| TaskdeckError::ImportFormat(e.to_string()))?;

        info!("Importing {} tasks, replacing {}", tasks.len(), self.tasks.len());
        self.tasks = tasks;
        self.last_id = self.last_id.max(max_numeric_id(&self.tasks));
        self.after_mutation().await;

        Ok(self.tasks.len())
    }

    async fn after_mutation(&mut self) {
        self.reconcile_categories();

        if !self.initialized {
            warn!("Store not loaded yet; skipping persistence and reminders");
            return;
        }

        self.persist().await;
        self.reschedule_reminders().await;
    }

    /// Drops custom categories no task references and registers any custom
    /// category a task references but the collection lacks.
    fn reconcile_categories(&mut self) {
        let tasks = &self.tasks;
        self.custom_categories.retain(|cat| {
            let used = tasks.iter().any(|t| t.category.name() == cat.name);
            if !used {
                debug!("Pruning unused category '{}'", cat.name);
            }
            used
        });

        for task in &self.tasks {
            if let Category::Custom(name) = &task.category {
                if !self.custom_categories.iter().any(|c| &c.name == name) {
                    debug!("Registering category '{}' from task {}", name, task.id);
                    self.custom_categories.push(CustomCategory {
                        name: name.clone(),
                        color: CategoryColor::default(),
                    });
                }
            }
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.write_snapshot(TASKS_KEY, &self.tasks).await {
            error!("Failed to save tasks: {}", e);
        }
        if let Err(e) = self
            .write_snapshot(CUSTOM_CATEGORIES_KEY, &self.custom_categories)
            .await
        {
            error!("Failed to save custom categories: {}", e);
        }
    }

    async fn write_snapshot<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.storage.set(key, &json).await
    }

    /// Clears every scheduled reminder, then schedules one per incomplete task
    /// with a future reminder time.
    async fn reschedule_reminders(&self) {
        if let Err(e) = self.notifier.cancel_all().await {
            error!("Notifier '{}' cancel error: {}", self.notifier.name(), e);
            return;
        }

        let reminders = pending_reminders(&self.tasks, Utc::now());
        let notifier = &self.notifier;
        let futures: Vec<_> = reminders
            .iter()
            .map(|reminder| async move { (reminder, notifier.schedule(reminder).await) })
            .collect();

        for (reminder, result) in join_all(futures).await {
            if let Err(e) = result {
                error!(
                    "Notifier '{}' failed to schedule reminder for {}: {}",
                    notifier.name(),
                    reminder.task_id,
                    e
                );
            }
        }

        debug!("Scheduled {} reminders", reminders.len());
    }
}

fn max_numeric_id(tasks: &[Task]) -> i64 {
    tasks
        .iter()
        .filter_map(|t| t.id.parse::<i64>().ok())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuiltInCategory, Priority};
    use crate::platform::storage::MemoryStore;
    use crate::platform::Reminder;
    use crate::recurrence::{RecurrencePattern, RecurrenceRule};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        scheduled: Arc<Mutex<Vec<Reminder>>>,
        cancels: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn cancel_all(&self) -> Result<()> {
            self.scheduled.lock().unwrap().clear();
            *self.cancels.lock().unwrap() += 1;
            Ok(())
        }

        async fn schedule(&self, reminder: &Reminder) -> Result<()> {
            self.scheduled.lock().unwrap().push(reminder.clone());
            Ok(())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: &str) -> Result<()> {
            Err(TaskdeckError::persistence(key, "disk full"))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn loaded_store() -> (TaskStore, MemoryStore, RecordingNotifier) {
        let storage = MemoryStore::new();
        let notifier = RecordingNotifier::default();
        let mut store = TaskStore::new(Box::new(storage.clone()), Box::new(notifier.clone()));
        store.load().await.unwrap();
        (store, storage, notifier)
    }

    fn stored_tasks(storage: &MemoryStore) -> Vec<Task> {
        serde_json::from_str(&storage.snapshot(TASKS_KEY).unwrap()).unwrap()
    }

    fn stored_categories(storage: &MemoryStore) -> Vec<CustomCategory> {
        serde_json::from_str(&storage.snapshot(CUSTOM_CATEGORIES_KEY).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_load_first_run_is_empty() {
        let (store, storage, _) = loaded_store().await;
        assert!(store.is_initialized());
        assert!(store.tasks().is_empty());
        assert!(store.custom_categories().is_empty());
        assert!(storage.snapshot(TASKS_KEY).is_none());
    }

    #[tokio::test]
    async fn test_load_reads_existing_snapshots() {
        let storage = MemoryStore::new();
        storage
            .set(
                TASKS_KEY,
                r#"[{"id":"42","title":"Old","completed":false,"createdAt":"2026-01-01T10:00:00Z","priority":"low","category":"garden"}]"#,
            )
            .await
            .unwrap();
        storage
            .set(CUSTOM_CATEGORIES_KEY, r##"[{"name":"garden","color":"#34C759"}]"##)
            .await
            .unwrap();

        let mut store = TaskStore::new(Box::new(storage), Box::new(RecordingNotifier::default()));
        store.load().await.unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].category, Category::Custom("garden".into()));
        assert_eq!(store.custom_categories()[0].color, CategoryColor::Green);
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_snapshot() {
        let storage = MemoryStore::new();
        storage.set(TASKS_KEY, "not json").await.unwrap();

        let mut store = TaskStore::new(Box::new(storage), Box::new(RecordingNotifier::default()));
        assert!(matches!(
            store.load().await,
            Err(TaskdeckError::Persistence { .. })
        ));
        assert!(!store.is_initialized());
    }

    #[tokio::test]
    async fn test_add_task_assigns_id_and_persists() {
        let (mut store, storage, _) = loaded_store().await;

        let mut draft = NewTask::new("Buy milk", BuiltInCategory::Shopping);
        draft.priority = Priority::High;
        draft.description = Some("2 litres".into());
        let task = store.add_task(draft).await.unwrap();

        assert!(!task.id.is_empty());
        assert!(!task.completed);
        assert!(task.completed_at.is_none());

        let fetched = store.get_task_by_id(&task.id).unwrap();
        assert_eq!(fetched, &task);
        assert_eq!(fetched.title, "Buy milk");
        assert_eq!(fetched.priority, Priority::High);
        assert_eq!(fetched.description.as_deref(), Some("2 litres"));

        assert_eq!(stored_tasks(&storage), vec![task]);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (mut store, _, _) = loaded_store().await;
        let a = store.add_task(NewTask::new("A", BuiltInCategory::Work)).await.unwrap();
        let b = store.add_task(NewTask::new("B", BuiltInCategory::Work)).await.unwrap();
        let c = store.add_task(NewTask::new("C", BuiltInCategory::Work)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
    }

    #[tokio::test]
    async fn test_deleted_ids_are_not_reused() {
        let (mut store, _, _) = loaded_store().await;
        let a = store.add_task(NewTask::new("A", BuiltInCategory::Work)).await.unwrap();
        store.delete_task(&a.id).await;
        let b = store.add_task(NewTask::new("B", BuiltInCategory::Work)).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_add_task_rejects_blank_title() {
        let (mut store, storage, _) = loaded_store().await;
        let result = store.add_task(NewTask::new("   ", BuiltInCategory::Work)).await;
        assert!(matches!(result, Err(TaskdeckError::Validation(_))));
        assert!(store.tasks().is_empty());
        assert!(storage.snapshot(TASKS_KEY).is_none());
    }

    #[tokio::test]
    async fn test_add_task_rejects_missing_category() {
        let (mut store, _, _) = loaded_store().await;
        let result = store
            .add_task(NewTask::new("Title", Category::Custom(String::new())))
            .await;
        assert!(matches!(result, Err(TaskdeckError::Validation(_))));
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_add_task_rejects_malformed_recurrence() {
        let (mut store, _, _) = loaded_store().await;
        let mut rule = RecurrenceRule::new(RecurrencePattern::Weekly);
        rule.selected_days.clear();

        let mut draft = NewTask::new("Gym", BuiltInCategory::Health);
        draft.recurrence = Some(rule);
        assert!(store.add_task(draft).await.is_err());
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_none_recurrence_is_dropped() {
        let (mut store, _, _) = loaded_store().await;
        let mut draft = NewTask::new("Once", BuiltInCategory::Other);
        draft.recurrence = Some(RecurrenceRule::new(RecurrencePattern::None));
        let task = store.add_task(draft).await.unwrap();
        assert!(task.recurrence.is_none());
    }

    #[tokio::test]
    async fn test_custom_category_is_lowercased() {
        let (mut store, storage, _) = loaded_store().await;
        let task = store
            .add_task(NewTask::new("Plant tomatoes", Category::Custom("Garden".into())))
            .await
            .unwrap();

        assert_eq!(task.category, Category::Custom("garden".into()));
        assert_eq!(stored_categories(&storage)[0].name, "garden");
    }

    #[tokio::test]
    async fn test_update_task_merges_fields() {
        let (mut store, _, _) = loaded_store().await;
        let task = store.add_task(NewTask::new("Draft", BuiltInCategory::Work)).await.unwrap();

        let due = Utc::now() + Duration::days(2);
        let updated = store
            .update_task(
                &task.id,
                TaskUpdate {
                    title: Some("Final".into()),
                    due_date: Some(Some(due)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.due_date, Some(due));
        assert_eq!(updated.category, task.category);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_not_found() {
        let (mut store, _, _) = loaded_store().await;
        let result = store.update_task("missing", TaskUpdate::default()).await;
        assert!(matches!(result, Err(TaskdeckError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_update_with_blank_title_changes_nothing() {
        let (mut store, _, _) = loaded_store().await;
        let task = store.add_task(NewTask::new("Keep", BuiltInCategory::Work)).await.unwrap();

        let result = store
            .update_task(
                &task.id,
                TaskUpdate {
                    title: Some(" ".into()),
                    priority: Some(Priority::Low),
                    ..Default::default()
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(store.get_task_by_id(&task.id).unwrap(), &task);
    }

    #[tokio::test]
    async fn test_toggle_sets_and_clears_completed_at() {
        let (mut store, _, _) = loaded_store().await;
        let task = store.add_task(NewTask::new("Run", BuiltInCategory::Health)).await.unwrap();

        let done = store.toggle_task_completion(&task.id).await.unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let undone = store.toggle_task_completion(&task.id).await.unwrap();
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_toggle_unknown_task_is_not_found() {
        let (mut store, _, _) = loaded_store().await;
        assert!(matches!(
            store.toggle_task_completion("nope").await,
            Err(TaskdeckError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let (mut store, storage, _) = loaded_store().await;
        assert!(!store.delete_task("missing").await);
        assert!(storage.snapshot(TASKS_KEY).is_none());
    }

    #[tokio::test]
    async fn test_deleting_last_reference_prunes_custom_category() {
        let (mut store, storage, _) = loaded_store().await;
        store
            .add_custom_category("Garden", CategoryColor::Green)
            .await
            .unwrap();
        let a = store
            .add_task(NewTask::new("Weed", Category::Custom("garden".into())))
            .await
            .unwrap();
        let b = store
            .add_task(NewTask::new("Water", Category::Custom("garden".into())))
            .await
            .unwrap();

        store.delete_task(&a.id).await;
        assert_eq!(store.custom_categories().len(), 1);
        assert_eq!(store.custom_categories()[0].color, CategoryColor::Green);

        store.delete_task(&b.id).await;
        assert!(store.custom_categories().is_empty());
        assert!(stored_categories(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_recategorizing_prunes_old_category() {
        let (mut store, _, _) = loaded_store().await;
        let task = store
            .add_task(NewTask::new("Weed", Category::Custom("garden".into())))
            .await
            .unwrap();

        store
            .update_task(
                &task.id,
                TaskUpdate {
                    category: Some(BuiltInCategory::Home.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(store.custom_categories().is_empty());
    }

    #[tokio::test]
    async fn test_add_custom_category_is_case_insensitive() {
        let (mut store, _, _) = loaded_store().await;
        assert!(store.add_custom_category("garden", CategoryColor::Green).await.unwrap());
        assert!(!store.add_custom_category("GARDEN", CategoryColor::Blue).await.unwrap());
        assert_eq!(store.custom_categories().len(), 1);
    }

    #[tokio::test]
    async fn test_add_custom_category_rejects_builtin_and_blank() {
        let (mut store, _, _) = loaded_store().await;
        assert!(store.add_custom_category("Work", CategoryColor::Red).await.is_err());
        assert!(store.add_custom_category("  ", CategoryColor::Red).await.is_err());
    }

    #[tokio::test]
    async fn test_draft_color_registers_custom_category() {
        let (mut store, storage, _) = loaded_store().await;

        let mut draft = NewTask::new("Plant tulips", Category::Custom("Garden".into()));
        draft.category_color = Some(CategoryColor::Green);
        store.add_task(draft).await.unwrap();

        let expected = vec![CustomCategory {
            name: "garden".into(),
            color: CategoryColor::Green,
        }];
        assert_eq!(store.custom_categories(), expected.as_slice());
        assert_eq!(stored_categories(&storage), expected);

        let mut again = NewTask::new("Weed beds", Category::Custom("garden".into()));
        again.category_color = Some(CategoryColor::Blue);
        store.add_task(again).await.unwrap();
        assert_eq!(store.custom_categories()[0].color, CategoryColor::Green);
    }

    #[tokio::test]
    async fn test_rejected_draft_leaves_no_category() {
        let (mut store, storage, _) = loaded_store().await;

        let mut draft = NewTask::new("  ", Category::Custom("garden".into()));
        draft.category_color = Some(CategoryColor::Green);
        assert!(store.add_task(draft).await.is_err());

        assert!(store.custom_categories().is_empty());
        assert!(storage.snapshot(CUSTOM_CATEGORIES_KEY).is_none());
    }

    #[tokio::test]
    async fn test_update_color_applies_only_when_update_is_valid() {
        let (mut store, storage, _) = loaded_store().await;
        let task = store.add_task(NewTask::new("Weed", BuiltInCategory::Home)).await.unwrap();

        let rejected = store
            .update_task(
                &task.id,
                TaskUpdate {
                    title: Some("".into()),
                    category: Some(Category::Custom("garden".into())),
                    category_color: Some(CategoryColor::Teal),
                    ..Default::default()
                },
            )
            .await;
        assert!(rejected.is_err());
        assert!(store.custom_categories().is_empty());
        assert!(stored_categories(&storage).is_empty());

        store
            .update_task(
                &task.id,
                TaskUpdate {
                    category: Some(Category::Custom("garden".into())),
                    category_color: Some(CategoryColor::Teal),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.custom_categories()[0].color, CategoryColor::Teal);
    }

    #[tokio::test]
    async fn test_clear_all_removes_tasks_categories_and_reminders() {
        let (mut store, storage, notifier) = loaded_store().await;

        let mut draft = NewTask::new("Call mom", Category::Custom("family".into()));
        draft.reminder_time = Some(Utc::now() + Duration::hours(3));
        store.add_task(draft).await.unwrap();
        store.add_task(NewTask::new("Report", BuiltInCategory::Work)).await.unwrap();
        assert_eq!(notifier.scheduled.lock().unwrap().len(), 1);

        assert_eq!(store.clear_all().await, 2);
        assert!(store.tasks().is_empty());
        assert!(store.custom_categories().is_empty());
        assert!(stored_tasks(&storage).is_empty());
        assert!(stored_categories(&storage).is_empty());
        assert!(notifier.scheduled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_keeps_legacy_custom_category_flag() {
        let (mut store, _, _) = loaded_store().await;
        let payload = r#"[{"id":"1","title":"Old","createdAt":"2026-10-01T09:00:00Z","priority":"low","category":"garden","customCategory":true}]"#;

        store.import_json(payload).await.unwrap();
        assert_eq!(store.tasks()[0].custom_category, Some(true));
        assert!(store.export_json().unwrap().contains("\"customCategory\": true"));
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_mutation() {
        let mut store = TaskStore::new(Box::new(BrokenStore), Box::new(RecordingNotifier::default()));
        store.load().await.unwrap();

        let task = store
            .add_task(NewTask::new("Still here", BuiltInCategory::Work))
            .await
            .unwrap();
        assert!(store.get_task_by_id(&task.id).is_some());
    }

    #[tokio::test]
    async fn test_mutation_before_load_is_not_persisted() {
        let storage = MemoryStore::new();
        let mut store = TaskStore::new(Box::new(storage.clone()), Box::new(RecordingNotifier::default()));

        store.add_task(NewTask::new("Early", BuiltInCategory::Work)).await.unwrap();
        assert_eq!(store.tasks().len(), 1);
        assert!(storage.snapshot(TASKS_KEY).is_none());
    }

    #[tokio::test]
    async fn test_reminders_are_rescheduled_without_duplicates() {
        let (mut store, _, notifier) = loaded_store().await;

        let mut draft = NewTask::new("Call mom", BuiltInCategory::Personal);
        draft.reminder_time = Some(Utc::now() + Duration::hours(3));
        let task = store.add_task(draft).await.unwrap();

        let mut past = NewTask::new("Too late", BuiltInCategory::Personal);
        past.reminder_time = Some(Utc::now() - Duration::hours(3));
        store.add_task(past).await.unwrap();

        let scheduled = notifier.scheduled.lock().unwrap().clone();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].task_id, task.id);
        assert_eq!(*notifier.cancels.lock().unwrap(), 2);

        store.toggle_task_completion(&task.id).await.unwrap();
        assert!(notifier.scheduled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_then_import_replaces_collection() {
        let (mut store, storage, _) = loaded_store().await;
        store.add_task(NewTask::new("One", BuiltInCategory::Work)).await.unwrap();
        store
            .add_task(NewTask::new("Two", Category::Custom("garden".into())))
            .await
            .unwrap();
        let exported = store.export_json().unwrap();

        let (mut other, other_storage, _) = loaded_store().await;
        other.add_task(NewTask::new("Replaced", BuiltInCategory::Home)).await.unwrap();

        let count = other.import_json(&exported).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(other.tasks(), store.tasks());
        assert_eq!(other.custom_categories().len(), 1);
        assert_eq!(stored_tasks(&other_storage), stored_tasks(&storage));
    }

    #[tokio::test]
    async fn test_invalid_import_leaves_data_untouched() {
        let (mut store, storage, _) = loaded_store().await;
        for title in ["A", "B", "C"] {
            store.add_task(NewTask::new(title, BuiltInCategory::Work)).await.unwrap();
        }
        let before = store.tasks().to_vec();
        let persisted = storage.snapshot(TASKS_KEY);

        let result = store.import_json("{not json").await;
        assert!(matches!(result, Err(TaskdeckError::ImportFormat(_))));

        let wrong_shape = store.import_json(r#"{"tasks": []}"#).await;
        assert!(matches!(wrong_shape, Err(TaskdeckError::ImportFormat(_))));

        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(storage.snapshot(TASKS_KEY), persisted);
    }
}
