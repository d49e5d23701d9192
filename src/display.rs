use chrono::Local;

use crate::model::{CustomCategory, Priority, Task};
use crate::query::TaskGroup;
use crate::stats::Statistics;

pub fn task_line(task: &Task) -> String {
    let icon = if task.completed { "✓" } else { "☐" };
    let due_str = task
        .due_day()
        .map(|d| format!(" (due {})", d))
        .unwrap_or_default();
    let priority_str = match task.priority {
        Priority::High => " [!]",
        Priority::Medium | Priority::Low => "",
    };

    format!(
        "{} {}{}{} #{}  [{}]",
        icon, task.title, due_str, priority_str, task.category, task.id
    )
}

pub fn task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }
    tasks.iter().map(task_line).collect::<Vec<_>>().join("\n")
}

pub fn grouped_list(groups: &[TaskGroup]) -> String {
    if groups.is_empty() {
        return "No tasks found.".to_string();
    }

    let mut lines = Vec::new();
    for group in groups {
        lines.push(format!("{} ({}):", group.label(), group.tasks.len()));
        for task in &group.tasks {
            lines.push(format!("  {}", task_line(task)));
        }
        lines.push(String::new());
    }
    lines.pop();
    lines.join("\n")
}

pub fn task_details(task: &Task) -> String {
    let mut lines = vec![
        format!("{}  [{}]", task.title, task.id),
        format!("  Status:    {}", if task.completed { "done" } else { "pending" }),
        format!("  Priority:  {}", task.priority.name()),
        format!("  Category:  {}", task.category),
        format!(
            "  Created:   {}",
            task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
    ];

    if let Some(ref description) = task.description {
        lines.insert(1, format!("  {}", description));
    }
    if let Some(completed_at) = task.completed_at {
        lines.push(format!(
            "  Completed: {}",
            completed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    if let Some(due) = task.due_day() {
        lines.push(format!("  Due:       {}", due));
    }
    if let Some(reminder) = task.reminder_time {
        lines.push(format!(
            "  Reminder:  {}",
            reminder.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    if let Some(ref rule) = task.recurrence {
        lines.push(format!("  Repeats:   {}", rule.describe()));
    }
    if !task.tags.is_empty() {
        lines.push(format!("  Tags:      {}", task.tags.join(", ")));
    }

    lines.join("\n")
}

pub fn categories(categories: &[CustomCategory]) -> String {
    if categories.is_empty() {
        return "No custom categories.".to_string();
    }
    categories
        .iter()
        .map(|c| format!("{} {} ({})", c.color.hex(), c.name, c.color.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn statistics(stats: &Statistics) -> String {
    let trend_arrow = if stats.completion_rate_trend > 0.0 {
        "↑"
    } else if stats.completion_rate_trend < 0.0 {
        "↓"
    } else {
        "→"
    };

    let mut lines = vec![
        format!("{}:", stats.timeframe.label()),
        format!(
            "  Tasks:           {} ({} done, {} open)",
            stats.total, stats.completed, stats.incomplete
        ),
        format!(
            "  Completion rate: {:.1}% {} {:.1}%",
            stats.completion_rate,
            trend_arrow,
            stats.completion_rate_trend.abs()
        ),
        format!("  Avg completion:  {:.1} days", stats.average_completion_time),
        format!("  Productivity:    {}/100", stats.productivity_score),
        format!("  Streak:          {} days", stats.streak),
        format!("  Overdue:         {}", stats.overdue_tasks),
        String::new(),
        "By priority:".to_string(),
    ];

    for (priority, count) in &stats.by_priority {
        lines.push(format!("  {:<10} {}", priority.name(), count));
    }

    lines.push(String::new());
    lines.push("By category:".to_string());
    for (category, count) in &stats.by_category {
        lines.push(format!("  {:<10} {}", category, count));
    }

    lines.push(String::new());
    lines.push("Completed this week:".to_string());
    for day in &stats.daily_stats {
        lines.push(format!("  {} {}", day.weekday, "▇".repeat(day.count)));
    }

    lines.join("\n")
}
