use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::model::{CategoryColor, Priority};
use crate::query::{FilterBy, SortBy};
use crate::recurrence::{RecurrencePattern, WeekDay};
use crate::stats::Timeframe;

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "Personal tasks, calendar buckets and statistics")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (default: ~/.config/taskdeck/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Passcode used to unlock when the app lock is on
    #[arg(long, global = true)]
    pub passcode: Option<String>,
}

#[derive(clap::Args, Default)]
pub struct TaskFields {
    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,

    /// high, medium, low
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Built-in or custom category name
    #[arg(short, long)]
    pub category: Option<String>,

    /// Colour for a new custom category (red, orange, ..., purple)
    #[arg(long)]
    pub color: Option<CategoryColor>,

    /// Due day (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Reminder time (YYYY-MM-DD HH:MM, local)
    #[arg(long)]
    pub remind: Option<String>,

    /// none, daily, weekdays, weekends, weekly, monthly, yearly
    #[arg(long)]
    pub repeat: Option<RecurrencePattern>,

    /// Days for weekly recurrence (mon,wed,...)
    #[arg(long, value_delimiter = ',')]
    pub days: Vec<WeekDay>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a task ("Buy milk tomorrow #shopping +dairy (p1)")
    Add {
        text: Vec<String>,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// List tasks
    List {
        /// Case-insensitive text in title or description
        #[arg(short, long, default_value = "")]
        search: String,

        /// dueDate, priority, createdAt, title (default from config)
        #[arg(long)]
        sort: Option<SortBy>,

        /// all, completed, incomplete or a category (default from config)
        #[arg(short, long)]
        filter: Option<FilterBy>,

        /// Group into Today / Tomorrow / This Week / Later / No Due Date / Completed
        #[arg(short, long)]
        grouped: bool,

        /// Only tasks due on this day (YYYY-MM-DD)
        #[arg(long)]
        on: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show one task
    Show { id: String },

    /// Change fields of a task
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        fields: TaskFields,

        /// Remove the due day
        #[arg(long)]
        clear_due: bool,

        /// Remove the reminder
        #[arg(long)]
        clear_reminder: bool,

        /// Flip days in the task's weekly recurrence (mon,wed,...)
        #[arg(long, value_delimiter = ',')]
        toggle_day: Vec<WeekDay>,
    },

    /// Toggle a task between done and pending
    Toggle { id: String },

    /// Delete a task
    Delete { id: String },

    /// List custom categories
    Categories,

    /// Completion statistics
    Stats {
        /// week, month, all (default from config)
        #[arg(short, long)]
        timeframe: Option<Timeframe>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Write all tasks as JSON
    Export {
        /// File to write (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all tasks with a JSON backup
    Import { path: PathBuf },

    /// Delete every task
    Reset {
        /// Required: the deletion cannot be undone
        #[arg(long)]
        yes: bool,
    },

    /// Manage the passcode lock
    Passcode {
        #[command(subcommand)]
        action: PasscodeAction,
    },

    /// Manage biometric unlock
    Biometric {
        #[command(subcommand)]
        action: Toggle,
    },

    /// Print the active config (resolved, with defaults)
    Config,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum PasscodeAction {
    /// Set a 4 to 6 digit passcode
    Set {
        code: String,

        /// The same code again
        #[arg(long)]
        confirm: String,
    },

    /// Turn the passcode lock off
    Disable,
}

#[derive(Subcommand)]
pub enum Toggle {
    Enable,
    Disable,
}

impl Command {
    /// Commands that never touch task data skip the lock.
    pub fn needs_unlock(&self) -> bool {
        !matches!(self, Command::Config | Command::Completions { .. })
    }
}
