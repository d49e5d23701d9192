use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskdeckError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    #[default]
    None,
    Daily,
    Weekdays,
    Weekends,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrencePattern {
    pub fn name(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekdays => "weekdays",
            Self::Weekends => "weekends",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl FromStr for RecurrencePattern {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekdays" => Ok(Self::Weekdays),
            "weekends" => Ok(Self::Weekends),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(TaskdeckError::Validation(format!(
                "Unknown recurrence pattern: {}",
                other
            ))),
        }
    }
}

/// Ordered Monday first so a day set iterates in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl FromStr for WeekDay {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mon" | "monday" => Ok(Self::Mon),
            "tue" | "tues" | "tuesday" => Ok(Self::Tue),
            "wed" | "wednesday" => Ok(Self::Wed),
            "thu" | "thurs" | "thursday" => Ok(Self::Thu),
            "fri" | "friday" => Ok(Self::Fri),
            "sat" | "saturday" => Ok(Self::Sat),
            "sun" | "sunday" => Ok(Self::Sun),
            other => Err(TaskdeckError::Validation(format!("Unknown weekday: {}", other))),
        }
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mon => "Mon",
            Self::Tue => "Tue",
            Self::Wed => "Wed",
            Self::Thu => "Thu",
            Self::Fri => "Fri",
            Self::Sat => "Sat",
            Self::Sun => "Sun",
        };
        f.write_str(label)
    }
}

/// Repeat settings captured on a task.
///
/// The rule is metadata only: nothing materializes future occurrences.
/// `selected_days` is non-empty exactly when `pattern` is `Weekly`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub pattern: RecurrencePattern,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub selected_days: BTreeSet<WeekDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<u32>,
}

impl RecurrenceRule {
    pub const DEFAULT_DAY: WeekDay = WeekDay::Mon;

    pub fn new(pattern: RecurrencePattern) -> Self {
        let mut selected_days = BTreeSet::new();
        if pattern == RecurrencePattern::Weekly {
            selected_days.insert(Self::DEFAULT_DAY);
        }

        Self {
            pattern,
            selected_days,
            interval: None,
            end_date: None,
            occurrences: None,
        }
    }

    /// Builds a rule from a pattern and an explicit day list. An empty list on a
    /// weekly rule falls back to the default day; days on any other pattern are
    /// rejected.
    pub fn with_days(pattern: RecurrencePattern, days: &[WeekDay]) -> Result<Self> {
        let mut rule = Self::new(pattern);
        if days.is_empty() {
            return Ok(rule);
        }

        if pattern != RecurrencePattern::Weekly {
            return Err(TaskdeckError::Validation(format!(
                "Day selection only applies to weekly recurrence, not {}",
                pattern.name()
            )));
        }

        rule.selected_days = days.iter().copied().collect();
        Ok(rule)
    }

    pub fn is_recurring(&self) -> bool {
        self.pattern != RecurrencePattern::None
    }

    /// Flips `day` in the selection. Clearing the last day re-adds the default
    /// day so a weekly rule never ends up empty.
    pub fn toggle_day(&mut self, day: WeekDay) -> Result<()> {
        if self.pattern != RecurrencePattern::Weekly {
            return Err(TaskdeckError::Validation(format!(
                "Cannot select days on {} recurrence",
                self.pattern.name()
            )));
        }

        if !self.selected_days.remove(&day) {
            self.selected_days.insert(day);
        }
        if self.selected_days.is_empty() {
            self.selected_days.insert(Self::DEFAULT_DAY);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        match (self.pattern, self.selected_days.is_empty()) {
            (RecurrencePattern::Weekly, true) => Err(TaskdeckError::Validation(
                "Weekly recurrence needs at least one selected day".into(),
            )),
            (RecurrencePattern::Weekly, false) => Ok(()),
            (pattern, false) => Err(TaskdeckError::Validation(format!(
                "Day selection only applies to weekly recurrence, not {}",
                pattern.name()
            ))),
            (_, true) => Ok(()),
        }
    }

    pub fn describe(&self) -> String {
        if self.pattern == RecurrencePattern::Weekly {
            let days: Vec<String> = self.selected_days.iter().map(|d| d.to_string()).collect();
            format!("weekly on {}", days.join(", "))
        } else {
            self.pattern.name().to_string()
        }
    }
}
