use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};

use crate::calendar::same_week;
use crate::error::{Result, TaskdeckError};
use crate::model::{Category, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    DueDate,
    Priority,
    CreatedAt,
    Title,
}

impl SortBy {
    pub fn name(&self) -> &str {
        match self {
            Self::DueDate => "dueDate",
            Self::Priority => "priority",
            Self::CreatedAt => "createdAt",
            Self::Title => "title",
        }
    }
}

impl FromStr for SortBy {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "duedate" | "due" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            "createdat" | "created" => Ok(Self::CreatedAt),
            "title" => Ok(Self::Title),
            other => Err(TaskdeckError::Validation(format!("Unknown sort order: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterBy {
    #[default]
    All,
    Completed,
    Incomplete,
    Category(Category),
}

impl FilterBy {
    fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.completed,
            Self::Incomplete => !task.completed,
            Self::Category(category) => &task.category == category,
        }
    }
}

impl FromStr for FilterBy {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::Completed),
            "incomplete" | "pending" => Ok(Self::Incomplete),
            _ => Ok(Self::Category(Category::parse(s)?)),
        }
    }
}

impl fmt::Display for FilterBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Completed => f.write_str("completed"),
            Self::Incomplete => f.write_str("incomplete"),
            Self::Category(category) => write!(f, "{}", category),
        }
    }
}

/// View state for a task list. Held by the caller, never persisted.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub search: String,
    pub sort_by: SortBy,
    pub filter_by: FilterBy,
}

/// Applies the text filter, then the status/category filter, then a stable
/// sort on `query.sort_by`.
pub fn filter_and_sort(tasks: &[Task], query: &TaskQuery) -> Vec<Task> {
    let search = query.search.to_lowercase();

    let mut result: Vec<Task> = tasks
        .iter()
        .filter(|task| search.is_empty() || matches_search(task, &search))
        .filter(|task| query.filter_by.matches(task))
        .cloned()
        .collect();

    result.sort_by(|a, b| compare(a, b, query.sort_by));
    result
}

fn matches_search(task: &Task, search_lower: &str) -> bool {
    task.title.to_lowercase().contains(search_lower)
        || task
            .description
            .as_ref()
            .map_or(false, |d| d.to_lowercase().contains(search_lower))
}

fn compare(a: &Task, b: &Task, sort_by: SortBy) -> Ordering {
    match sort_by {
        // Undated tasks go last and keep their relative order.
        SortBy::DueDate => match (a.due_date, b.due_date) {
            (Some(da), Some(db)) => da.cmp(&db),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortBy::Priority => a.priority.cmp(&b.priority),
        SortBy::CreatedAt => b.created_at.cmp(&a.created_at),
        SortBy::Title => compare_titles(&a.title, &b.title),
    }
}

/// Case-folded comparison first, so "apple" sorts next to "Apple" rather than
/// after every capitalized title.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateBucket {
    Today,
    Tomorrow,
    ThisWeek,
    Later,
    NoDueDate,
    Completed,
}

impl DateBucket {
    pub fn label(&self) -> &str {
        match self {
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
            Self::ThisWeek => "This Week",
            Self::Later => "Later",
            Self::NoDueDate => "No Due Date",
            Self::Completed => "Completed",
        }
    }

    pub fn classify(task: &Task, today: NaiveDate) -> Self {
        if task.completed {
            return Self::Completed;
        }

        match task.due_day() {
            None => Self::NoDueDate,
            Some(day) if day == today => Self::Today,
            Some(day) if day == today + Duration::days(1) => Self::Tomorrow,
            Some(day) if same_week(day, today) => Self::ThisWeek,
            Some(_) => Self::Later,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskGroup {
    pub bucket: DateBucket,
    pub tasks: Vec<Task>,
}

impl TaskGroup {
    pub fn label(&self) -> &str {
        self.bucket.label()
    }
}

/// Groups tasks into date buckets in fixed bucket order, keeping the input
/// order within each bucket. Empty buckets are left out.
pub fn group_by_date_bucket(tasks: &[Task], today: NaiveDate) -> Vec<TaskGroup> {
    let mut groups: Vec<TaskGroup> = Vec::new();

    for task in tasks {
        let bucket = DateBucket::classify(task, today);
        match groups.iter_mut().find(|g| g.bucket == bucket) {
            Some(group) => group.tasks.push(task.clone()),
            None => groups.push(TaskGroup {
                bucket,
                tasks: vec![task.clone()],
            }),
        }
    }

    groups.sort_by_key(|g| g.bucket);
    groups
}

/// Tasks whose due date falls on `day` (calendar day view).
pub fn tasks_due_on(tasks: &[Task], day: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.due_day() == Some(day))
        .cloned()
        .collect()
}
