use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskdeckError};
use crate::recurrence::RecurrenceRule;

pub type TaskId = String;

/// Declared high to low so the derived ordering sorts high first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn name(&self) -> &str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "high" | "h" | "p1" => Ok(Self::High),
            "medium" | "m" | "p2" => Ok(Self::Medium),
            "low" | "l" | "p3" => Ok(Self::Low),
            other => Err(TaskdeckError::Validation(format!("Unknown priority: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltInCategory {
    Work,
    Personal,
    Shopping,
    Health,
    Finance,
    Education,
    Home,
    Meetings,
    Travel,
    Social,
    Projects,
    Other,
}

impl BuiltInCategory {
    pub const ALL: [BuiltInCategory; 12] = [
        Self::Work,
        Self::Personal,
        Self::Shopping,
        Self::Health,
        Self::Finance,
        Self::Education,
        Self::Home,
        Self::Meetings,
        Self::Travel,
        Self::Social,
        Self::Projects,
        Self::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Shopping => "shopping",
            Self::Health => "health",
            Self::Finance => "finance",
            Self::Education => "education",
            Self::Home => "home",
            Self::Meetings => "meetings",
            Self::Travel => "travel",
            Self::Social => "social",
            Self::Projects => "projects",
            Self::Other => "other",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// A task category. Stored as a plain string in JSON; built-in names map to
/// `BuiltIn`, anything else is a user-defined `Custom` name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    BuiltIn(BuiltInCategory),
    Custom(String),
}

impl Category {
    /// Normalizes user input: trimmed and lowercased. Built-in names resolve to
    /// their built-in variant.
    pub fn parse(input: &str) -> Result<Self> {
        let name = input.trim().to_lowercase();
        if name.is_empty() {
            return Err(TaskdeckError::Validation("Please select a category".into()));
        }

        Ok(match BuiltInCategory::from_name(&name) {
            Some(builtin) => Self::BuiltIn(builtin),
            None => Self::Custom(name),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::BuiltIn(c) => c.name(),
            Self::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    pub(crate) fn normalized(&self) -> Result<Self> {
        match self {
            Self::BuiltIn(_) => Ok(self.clone()),
            Self::Custom(name) => Self::parse(name),
        }
    }
}

impl From<BuiltInCategory> for Category {
    fn from(c: BuiltInCategory) -> Self {
        Self::BuiltIn(c)
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match BuiltInCategory::from_name(&s) {
            Some(builtin) => Self::BuiltIn(builtin),
            None => Self::Custom(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        match c {
            Category::BuiltIn(builtin) => builtin.name().to_string(),
            Category::Custom(name) => name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Palette available to custom categories. Serialized as the hex value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CategoryColor {
    #[default]
    #[serde(rename = "#FF3B30")]
    Red,
    #[serde(rename = "#FF9500")]
    Orange,
    #[serde(rename = "#FFCC00")]
    Yellow,
    #[serde(rename = "#34C759")]
    Green,
    #[serde(rename = "#00C7BE")]
    Mint,
    #[serde(rename = "#30B0C7")]
    Teal,
    #[serde(rename = "#32ADE6")]
    Cyan,
    #[serde(rename = "#007AFF")]
    Blue,
    #[serde(rename = "#5856D6")]
    Indigo,
    #[serde(rename = "#AF52DE")]
    Purple,
}

impl CategoryColor {
    pub const ALL: [CategoryColor; 10] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Mint,
        Self::Teal,
        Self::Cyan,
        Self::Blue,
        Self::Indigo,
        Self::Purple,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Mint => "mint",
            Self::Teal => "teal",
            Self::Cyan => "cyan",
            Self::Blue => "blue",
            Self::Indigo => "indigo",
            Self::Purple => "purple",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            Self::Red => "#FF3B30",
            Self::Orange => "#FF9500",
            Self::Yellow => "#FFCC00",
            Self::Green => "#34C759",
            Self::Mint => "#00C7BE",
            Self::Teal => "#30B0C7",
            Self::Cyan => "#32ADE6",
            Self::Blue => "#007AFF",
            Self::Indigo => "#5856D6",
            Self::Purple => "#AF52DE",
        }
    }
}

impl FromStr for CategoryColor {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted) || c.hex().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TaskdeckError::Validation(format!("Unknown category color: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCategory {
    pub name: String,
    pub color: CategoryColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    /// Legacy marker written by older clients. Carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_category: Option<bool>,
}

impl Task {
    /// Applies a completion change. `completed_at` is stamped on the
    /// false -> true transition and cleared on true -> false.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed && !self.completed {
            self.completed_at = Some(now);
        } else if !completed {
            self.completed_at = None;
        }
        self.completed = completed;
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.map_or(false, |d| d < now)
    }

    pub fn due_day(&self) -> Option<NaiveDate> {
        self.due_date.as_ref().map(local_day)
    }

    pub fn created_day(&self) -> NaiveDate {
        local_day(&self.created_at)
    }

    /// Calendar day of completion, only for tasks currently marked complete.
    pub fn completed_day(&self) -> Option<NaiveDate> {
        if !self.completed {
            return None;
        }
        self.completed_at.as_ref().map(local_day)
    }
}

/// Calendar day of `ts` in the local timezone.
pub fn local_day(ts: &DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// Draft for a task that does not exist yet; `id` and `created_at` are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Category,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub recurrence: Option<RecurrenceRule>,
    /// Colour to register for a custom category not seen before.
    pub category_color: Option<CategoryColor>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, category: impl Into<Category>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: Priority::default(),
            category: category.into(),
            due_date: None,
            reminder_time: None,
            tags: Vec::new(),
            recurrence: None,
            category_color: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub reminder_time: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub recurrence: Option<Option<RecurrenceRule>>,
    pub category_color: Option<CategoryColor>,
}

pub(crate) fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskdeckError::Validation("Please enter a task title".into()));
    }
    Ok(trimmed.to_string())
}

/// Drops a `none` rule and checks the day selection of the rest.
pub(crate) fn validate_recurrence(rule: Option<RecurrenceRule>) -> Result<Option<RecurrenceRule>> {
    match rule {
        Some(rule) if rule.is_recurring() => {
            rule.validate()?;
            Ok(Some(rule))
        }
        _ => Ok(None),
    }
}
