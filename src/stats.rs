use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::calendar::{previous_month, same_month, same_week, week_days};
use crate::error::{Result, TaskdeckError};
use crate::model::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Week,
    Month,
    All,
}

impl Timeframe {
    pub fn label(&self) -> &str {
        match self {
            Self::Week => "This Week",
            Self::Month => "This Month",
            Self::All => "All Time",
        }
    }

    /// Whether a task created on `created` falls in the period containing `today`.
    fn contains(&self, created: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Week => same_week(created, today),
            Self::Month => same_month(created, today),
            Self::All => true,
        }
    }

    /// A day inside the period immediately before the one containing `today`.
    fn previous_period(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Week => Some(today - Duration::days(7)),
            Self::Month => Some(previous_month(today)),
            Self::All => None,
        }
    }
}

impl FromStr for Timeframe {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            other => Err(TaskdeckError::Validation(format!("Unknown timeframe: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub weekday: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub timeframe: Timeframe,
    pub total: usize,
    pub completed: usize,
    pub incomplete: usize,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub completion_rate: f64,
    pub previous_completion_rate: f64,
    pub completion_rate_trend: f64,
    pub average_completion_time: f64,
    pub productivity_score: u32,
    pub daily_stats: Vec<DailyCount>,
    pub overdue_tasks: usize,
    pub streak: u32,
}

impl Statistics {
    /// Window-filtered counts (`total`, `completed`, `by_*`, rates) only see
    /// tasks created in `timeframe`. Completion time, daily activity, overdue
    /// count and streak always use the whole collection.
    pub fn compute(tasks: &[Task], timeframe: Timeframe, now: DateTime<Local>) -> Self {
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);

        let window = filter_by_timeframe(tasks, timeframe, today);
        let completed = window.iter().filter(|t| t.completed).count();
        let current_rate = completion_rate(&window);

        let previous_completion_rate = match timeframe.previous_period(today) {
            Some(day) => completion_rate(&filter_by_timeframe(tasks, timeframe, day)),
            None => 0.0,
        };
        let completion_rate_trend = match timeframe {
            Timeframe::All => 0.0,
            _ => current_rate - previous_completion_rate,
        };

        let completed_all_time = tasks.iter().filter(|t| t.completed).count();
        let average_completion_time = average_completion_time(tasks, now_utc);
        let productivity_score = if completed_all_time == 0 {
            0
        } else {
            productivity_score(current_rate, completed_all_time, average_completion_time)
        };

        let mut by_priority = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        for task in &window {
            *by_priority.entry(task.priority).or_insert(0) += 1;
            *by_category.entry(task.category.name().to_string()).or_insert(0) += 1;
        }

        Self {
            timeframe,
            total: window.len(),
            completed,
            incomplete: window.len() - completed,
            by_priority,
            by_category,
            completion_rate: current_rate,
            previous_completion_rate,
            completion_rate_trend,
            average_completion_time,
            productivity_score,
            daily_stats: daily_stats(tasks, today),
            overdue_tasks: tasks.iter().filter(|t| t.is_overdue(now_utc)).count(),
            streak: streak(tasks, today),
        }
    }
}

/// Tasks created within the week or month containing `today`.
pub fn filter_by_timeframe(tasks: &[Task], timeframe: Timeframe, today: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| timeframe.contains(t.created_day(), today))
        .collect()
}

/// Percentage of completed tasks, 0 for an empty list.
pub fn completion_rate(tasks: &[&Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    completed as f64 / tasks.len() as f64 * 100.0
}

/// Mean whole days from creation to completion over every completed task.
/// A completed task with no completion time counts as finishing at `now`.
pub fn average_completion_time(tasks: &[Task], now: DateTime<Utc>) -> f64 {
    let days: Vec<i64> = tasks
        .iter()
        .filter(|t| t.completed)
        .map(|t| (t.completed_at.unwrap_or(now) - t.created_at).num_days())
        .collect();

    if days.is_empty() {
        return 0.0;
    }
    days.iter().sum::<i64>() as f64 / days.len() as f64
}

pub fn productivity_score(completion_rate: f64, completed: usize, average_days: f64) -> u32 {
    let volume = completed.min(10) as f64 * 5.0;
    let speed = (5.0 - average_days).max(0.0) * 4.0;
    let score = (completion_rate * 0.4 + volume + speed).round();
    score.clamp(0.0, 100.0) as u32
}

/// Completions per day for Monday through Sunday of the current week.
pub fn daily_stats(tasks: &[Task], today: NaiveDate) -> Vec<DailyCount> {
    week_days(today)
        .into_iter()
        .map(|day| DailyCount {
            date: day,
            weekday: day.format("%a").to_string(),
            count: tasks.iter().filter(|t| t.completed_day() == Some(day)).count(),
        })
        .collect()
}

/// Consecutive days, ending today, with at least one completion.
pub fn streak(tasks: &[Task], today: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = today;

    while tasks.iter().any(|t| t.completed_day() == Some(day)) {
        count += 1;
        day -= Duration::days(1);
    }

    count
}
