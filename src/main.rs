use std::process::ExitCode;

use chrono::{Local, Utc};
use clap::{CommandFactory, Parser};
use tracing::{debug, info};

mod calendar;
mod cli;
mod config;
mod display;
mod error;
mod lock;
mod model;
mod nlp;
mod platform;
mod query;
mod recurrence;
mod stats;
mod store;

use cli::{Cli, Command, PasscodeAction, TaskFields, Toggle};
use config::Config;
use error::{Result, TaskdeckError};
use lock::{AppLock, LockEvent, LockState, PasscodeSetup, SecuritySettings, SetupEvent, SetupStep};
use model::{Category, NewTask, TaskUpdate};
use nlp::parse_quick_add;
use platform::biometric::Unavailable;
use platform::reminders::{NullNotifier, ReminderFile};
use platform::storage::FileStore;
use platform::{KeyValueStore, Notifier};
use query::{filter_and_sort, group_by_date_bucket, tasks_due_on, FilterBy, SortBy, TaskQuery};
use recurrence::{RecurrencePattern, RecurrenceRule, WeekDay};
use stats::{Statistics, Timeframe};
use store::TaskStore;

fn setup_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    info!("Starting taskdeck v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(cli, config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let security = FileStore::new(config.data_dir());

    if cli.command.needs_unlock() {
        unlock(&security, cli.passcode.as_deref()).await?;
    }

    match cli.command {
        Command::Add { text, fields } => {
            let mut store = open_store(&config).await?;
            let draft = build_new_task(&text.join(" "), &fields)?;
            let task = store.add_task(draft).await?;
            println!("✓ Created task: {} (ID: {})", task.title, task.id);
        }
        Command::List {
            search,
            sort,
            filter,
            grouped,
            on,
            format,
        } => {
            let store = open_store(&config).await?;
            let query = TaskQuery {
                search,
                sort_by: match sort {
                    Some(s) => s,
                    None => config.general.default_sort.parse::<SortBy>()?,
                },
                filter_by: match filter {
                    Some(f) => f,
                    None => config.general.default_filter.parse::<FilterBy>()?,
                },
            };
            debug!(
                "Listing with sort={} filter={}",
                query.sort_by.name(),
                query.filter_by
            );

            let mut tasks = filter_and_sort(store.tasks(), &query);
            if let Some(ref day) = on {
                tasks = tasks_due_on(&tasks, calendar::parse_day(day)?);
            }

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&tasks)?),
                _ if grouped => {
                    let today = Local::now().date_naive();
                    println!("{}", display::grouped_list(&group_by_date_bucket(&tasks, today)));
                }
                _ => println!("{}", display::task_list(&tasks)),
            }
        }
        Command::Show { id } => {
            let store = open_store(&config).await?;
            let task = store
                .get_task_by_id(&id)
                .ok_or_else(|| TaskdeckError::NotFound(id.clone()))?;
            println!("{}", display::task_details(task));
        }
        Command::Edit {
            id,
            title,
            fields,
            clear_due,
            clear_reminder,
            toggle_day,
        } => {
            let mut store = open_store(&config).await?;
            let current = store
                .get_task_by_id(&id)
                .ok_or_else(|| TaskdeckError::NotFound(id.clone()))?
                .recurrence
                .clone();
            let mut update = build_update(title, &fields, clear_due, clear_reminder)?;
            if !toggle_day.is_empty() {
                let rule = toggle_days(update.recurrence.take(), current, &toggle_day)?;
                update.recurrence = Some(Some(rule));
            }
            let task = store.update_task(&id, update).await?;
            println!("✓ Updated task: {} (ID: {})", task.title, task.id);
        }
        Command::Toggle { id } => {
            let mut store = open_store(&config).await?;
            let task = store.toggle_task_completion(&id).await?;
            if task.completed {
                println!("✓ Completed: {}", task.title);
            } else {
                println!("☐ Reopened: {}", task.title);
            }
        }
        Command::Delete { id } => {
            let mut store = open_store(&config).await?;
            if !store.delete_task(&id).await {
                return Err(TaskdeckError::NotFound(id));
            }
            println!("✓ Deleted task {}", id);
        }
        Command::Categories => {
            let store = open_store(&config).await?;
            println!("{}", display::categories(store.custom_categories()));
        }
        Command::Stats { timeframe, format } => {
            let store = open_store(&config).await?;
            let timeframe = match timeframe {
                Some(t) => t,
                None => config.statistics.default_timeframe.parse::<Timeframe>()?,
            };
            let stats = Statistics::compute(store.tasks(), timeframe, Local::now());

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
                _ => println!("{}", display::statistics(&stats)),
            }
        }
        Command::Export { output } => {
            let store = open_store(&config).await?;
            let json = store.export_json()?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    println!("✓ Exported {} tasks to {}", store.tasks().len(), path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Import { path } => {
            let mut store = open_store(&config).await?;
            let payload = tokio::fs::read_to_string(&path).await?;
            let count = store.import_json(&payload).await?;
            println!("✓ Imported {} tasks", count);
        }
        Command::Reset { yes } => {
            if !yes {
                return Err(TaskdeckError::Validation(
                    "Reset deletes every task and cannot be undone; pass --yes to confirm".into(),
                ));
            }
            let mut store = open_store(&config).await?;
            let removed = store.clear_all().await;
            println!("✓ Deleted {} tasks", removed);
        }
        Command::Passcode { action } => match action {
            PasscodeAction::Set { code, confirm } => {
                let setup = confirm_passcode(&code, &confirm)?;
                setup.save(&security).await?;
                println!("✓ Passcode lock enabled");
            }
            PasscodeAction::Disable => {
                SecuritySettings::disable_passcode(&security).await?;
                println!("✓ Passcode lock disabled");
            }
        },
        Command::Biometric { action } => {
            let enabled = matches!(action, Toggle::Enable);
            SecuritySettings::set_biometric(&security, &Unavailable, enabled).await?;
            println!("✓ Biometric unlock {}", if enabled { "enabled" } else { "disabled" });
        }
        Command::Config => {
            let config_toml = toml::to_string_pretty(&config).map_err(|e| {
                TaskdeckError::Config(format!("Failed to serialize config: {}", e))
            })?;
            println!("{}", config_toml);
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<TaskStore> {
    let notifier: Box<dyn Notifier> = if config.notifications.enabled {
        Box::new(ReminderFile::new(config.reminders_path()))
    } else {
        Box::new(NullNotifier)
    };

    let mut store = TaskStore::new(Box::new(FileStore::new(config.data_dir())), notifier);
    store.load().await?;
    Ok(store)
}

/// Biometrics first, then the `--passcode` digits.
async fn unlock(security: &dyn KeyValueStore, passcode: Option<&str>) -> Result<()> {
    let settings = SecuritySettings::load(security).await?;
    let mut lock = AppLock::new(&settings);

    if !lock.is_locked() || lock.attempt_biometric(&Unavailable).await {
        return Ok(());
    }

    let code = passcode.ok_or(TaskdeckError::Locked)?;
    if code.len() != lock.passcode_len() {
        return Err(TaskdeckError::Validation("Incorrect passcode".into()));
    }

    for digit in code.chars() {
        if lock.enter_digit(digit)? == LockEvent::Mismatch {
            let message = lock.error().unwrap_or("Incorrect passcode").to_string();
            return Err(TaskdeckError::Validation(message));
        }
    }

    match lock.state() {
        LockState::Unlocked => {
            debug!("Unlocked with passcode");
            Ok(())
        }
        LockState::LockedAwaitingInput => Err(TaskdeckError::Locked),
    }
}

fn confirm_passcode(code: &str, confirm: &str) -> Result<PasscodeSetup> {
    if !(lock::MIN_PASSCODE_LEN..=lock::MAX_PASSCODE_LEN).contains(&code.len()) {
        return Err(TaskdeckError::Validation(format!(
            "Passcode must be {} to {} digits",
            lock::MIN_PASSCODE_LEN,
            lock::MAX_PASSCODE_LEN
        )));
    }
    let mismatch = || TaskdeckError::Validation("Passcodes do not match".into());
    if confirm.len() != code.len() {
        return Err(mismatch());
    }

    let mut setup = PasscodeSetup::new();
    for digit in code.chars() {
        setup.enter_digit(digit)?;
    }
    setup.submit()?;

    for digit in confirm.chars() {
        if setup.enter_digit(digit)? == SetupEvent::Mismatch {
            let message = setup.error().unwrap_or("Passcodes do not match").to_string();
            return Err(TaskdeckError::Validation(message));
        }
    }

    if setup.step() != SetupStep::Complete {
        return Err(mismatch());
    }
    Ok(setup)
}

fn recurrence_from(fields: &TaskFields) -> Result<Option<RecurrenceRule>> {
    match (fields.repeat, fields.days.is_empty()) {
        (Some(pattern), _) => Ok(Some(RecurrenceRule::with_days(pattern, &fields.days)?)),
        (None, false) => Ok(Some(RecurrenceRule::with_days(
            RecurrencePattern::Weekly,
            &fields.days,
        )?)),
        (None, true) => Ok(None),
    }
}

/// Flips `days` on the weekly rule being set by this edit, or on the task's
/// current rule.
fn toggle_days(
    edited: Option<Option<RecurrenceRule>>,
    current: Option<RecurrenceRule>,
    days: &[WeekDay],
) -> Result<RecurrenceRule> {
    let mut rule = match edited {
        Some(rule) => rule,
        None => current,
    }
    .ok_or_else(|| TaskdeckError::Validation("Task has no weekly recurrence to change".into()))?;

    for day in days {
        rule.toggle_day(*day)?;
    }
    Ok(rule)
}

/// `--color` only names the colour of a custom category.
fn check_color(category: Option<&Category>, fields: &TaskFields) -> Result<()> {
    match (category, fields.color) {
        (_, None) => Ok(()),
        (Some(category), Some(_)) if category.is_custom() => Ok(()),
        (Some(category), Some(_)) => Err(TaskdeckError::Validation(format!(
            "'{}' is a built-in category and has no colour",
            category
        ))),
        (None, Some(_)) => Err(TaskdeckError::Validation("--color needs --category".into())),
    }
}

fn build_new_task(text: &str, fields: &TaskFields) -> Result<NewTask> {
    let today = Local::now().date_naive();
    let quick = parse_quick_add(text, today)?;

    let category = match fields.category {
        Some(ref name) => Category::parse(name)?,
        None => quick.category.clone().ok_or_else(|| {
            TaskdeckError::Validation("Please select a category (#name or --category)".into())
        })?,
    };
    check_color(Some(&category), fields)?;

    let due_day = match fields.due {
        Some(ref day) => Some(calendar::parse_day(day)?),
        None => quick.due,
    };
    let reminder_time = fields
        .remind
        .as_deref()
        .map(calendar::parse_local_datetime)
        .transpose()?;
    if let Some(remind_at) = reminder_time {
        if remind_at <= Utc::now() {
            info!("Reminder time is in the past, no notification will fire");
        }
    }

    let mut tags = quick.tags;
    tags.extend(fields.tags.iter().cloned());

    let mut draft = NewTask::new(quick.title, category);
    draft.description = fields.description.clone();
    draft.priority = fields.priority.or(quick.priority).unwrap_or_default();
    draft.due_date = due_day.map(calendar::end_of_day);
    draft.reminder_time = reminder_time;
    draft.tags = tags;
    draft.recurrence = recurrence_from(fields)?;
    draft.category_color = fields.color;
    Ok(draft)
}

fn build_update(
    title: Option<String>,
    fields: &TaskFields,
    clear_due: bool,
    clear_reminder: bool,
) -> Result<TaskUpdate> {
    let mut update = TaskUpdate {
        title,
        description: fields.description.clone().map(Some),
        priority: fields.priority,
        category_color: fields.color,
        ..Default::default()
    };

    if let Some(ref name) = fields.category {
        update.category = Some(Category::parse(name)?);
    }
    check_color(update.category.as_ref(), fields)?;

    if clear_due {
        update.due_date = Some(None);
    } else if let Some(ref day) = fields.due {
        update.due_date = Some(Some(calendar::end_of_day(calendar::parse_day(day)?)));
    }

    if clear_reminder {
        update.reminder_time = Some(None);
    } else if let Some(ref at) = fields.remind {
        update.reminder_time = Some(Some(calendar::parse_local_datetime(at)?));
    }

    if !fields.tags.is_empty() {
        update.tags = Some(fields.tags.clone());
    }

    if fields.repeat.is_some() || !fields.days.is_empty() {
        update.recurrence = Some(recurrence_from(fields)?);
    }

    Ok(update)
}
