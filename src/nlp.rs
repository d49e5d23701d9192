use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::Result;
use crate::model::{Category, Priority};

/// Fields pulled out of a one-line task description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuickAdd {
    pub title: String,
    pub priority: Option<Priority>,
    pub due: Option<NaiveDate>,
    pub category: Option<Category>,
    pub tags: Vec<String>,
}

/// Parses "Review PR #work +urgent (p1) tomorrow".
///
/// `#name` sets the category (first one wins), `+name` adds a tag, `(p1)`..`(p3)`
/// set priority, and today/tomorrow/tmr, weekday names or an ISO date set the
/// due day. Everything else is the title.
pub fn parse_quick_add(text: &str, today: NaiveDate) -> Result<QuickAdd> {
    let mut parsed = QuickAdd::default();
    let mut title_words: Vec<&str> = Vec::new();
    let mut previous: Option<String> = None;

    for word in text.split_whitespace() {
        let lower = word.to_lowercase();
        let after_preposition = matches!(previous.as_deref(), Some("on" | "by"));
        previous = Some(lower.clone());

        if let Some(name) = word.strip_prefix('#').filter(|n| !n.is_empty()) {
            if parsed.category.is_none() {
                parsed.category = Some(Category::parse(name)?);
                continue;
            }
        }

        if let Some(tag) = word.strip_prefix('+').filter(|t| !t.is_empty()) {
            parsed.tags.push(tag.to_string());
            continue;
        }

        if let Some(priority) = priority_marker(&lower) {
            parsed.priority = Some(priority);
            continue;
        }

        if let Some(day) = due_day(&lower, after_preposition, today) {
            // "on friday" drops the preposition unless it is the whole title.
            if after_preposition && title_words.len() > 1 {
                title_words.pop();
            }
            parsed.due = Some(day);
            continue;
        }

        title_words.push(word);
    }

    parsed.title = title_words.join(" ");
    Ok(parsed)
}

fn priority_marker(word: &str) -> Option<Priority> {
    match word {
        "(p1)" => Some(Priority::High),
        "(p2)" => Some(Priority::Medium),
        "(p3)" => Some(Priority::Low),
        _ => None,
    }
}

/// Relative words and ISO dates count anywhere. Weekday names point at the
/// next such day (a week out when it is today). Short forms like "sun" or
/// "wed" only count after "on"/"by".
fn due_day(word: &str, after_preposition: bool, today: NaiveDate) -> Option<NaiveDate> {
    match word {
        "today" => return Some(today),
        "tomorrow" | "tmr" => return Some(today + Duration::days(1)),
        _ => {}
    }

    if let Some((weekday, short)) = weekday_name(word) {
        if short && !after_preposition {
            return None;
        }
        let ahead = (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
        let ahead = if ahead == 0 { 7 } else { ahead };
        return Some(today + Duration::days(i64::from(ahead)));
    }

    NaiveDate::parse_from_str(word, "%Y-%m-%d").ok()
}

fn weekday_name(word: &str) -> Option<(Weekday, bool)> {
    let found = match word {
        "monday" => (Weekday::Mon, false),
        "tuesday" => (Weekday::Tue, false),
        "wednesday" => (Weekday::Wed, false),
        "thursday" => (Weekday::Thu, false),
        "friday" => (Weekday::Fri, false),
        "saturday" => (Weekday::Sat, false),
        "sunday" => (Weekday::Sun, false),
        "mon" => (Weekday::Mon, true),
        "tue" | "tues" => (Weekday::Tue, true),
        "wed" => (Weekday::Wed, true),
        "thu" | "thurs" => (Weekday::Thu, true),
        "fri" => (Weekday::Fri, true),
        "sat" => (Weekday::Sat, true),
        "sun" => (Weekday::Sun, true),
        _ => return None,
    };
    Some(found)
}
