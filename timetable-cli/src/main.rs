mod commands;
mod store;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use timetable_core::{Day, Offering, Theme};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "timetable")]
#[command(about = "Personal timetable builder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Timetable dataset (JSON)
    #[arg(short, long, global = true, default_value = "data/monsoon-2025.json")]
    data: PathBuf,

    /// State file holding the selection and theme
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List courses whose slot is still free
    Courses {
        /// Case-insensitive name filter
        #[arg(short, long)]
        search: Option<String>,

        /// Only courses on this day (includes taken slots)
        #[arg(long)]
        day: Option<Day>,

        /// Only courses in this slot (includes taken slots)
        #[arg(long)]
        slot: Option<String>,
    },

    /// Quick search over every unselected course
    Search {
        term: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Add a course to the timetable
    Select {
        day: Day,
        slot: String,
        name: String,

        /// Swap out the course already occupying the slot
        #[arg(short, long)]
        replace: bool,
    },

    /// Remove a course from the timetable
    Remove { day: Day, slot: String, name: String },

    /// Remove every selected course
    Clear,

    /// Print the weekly grid and the selected courses
    Show,

    /// List courses clashing with the selection
    Conflicts {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Write the timetable as an ICS calendar
    Export {
        /// Output file path (defaults to a name derived from the dataset)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// First day to schedule from (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Reminder before each class, in minutes
        #[arg(long)]
        reminder_minutes: Option<u32>,

        /// Timezone hint for calendar clients, e.g. Asia/Kolkata
        #[arg(long)]
        timezone: Option<String>,
    },

    /// Show or change the colour theme
    Theme { mode: Option<ThemeMode> },

    /// Check the dataset's slot times
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeMode {
    Light,
    Dark,
    Toggle,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("timetable_cli={log_level},timetable_core={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let open = || commands::Session::open(&cli.data, cli.state.clone());

    match cli.command {
        Commands::Courses { search, day, slot } => {
            commands::courses_command(&open()?, search.as_deref(), day, slot)
        }
        Commands::Search { term, limit } => commands::search_command(&open()?, &term, limit),
        Commands::Select {
            day,
            slot,
            name,
            replace,
        } => commands::select_command(&mut open()?, Offering::new(day, slot, name), replace),
        Commands::Remove { day, slot, name } => {
            commands::remove_command(&mut open()?, day, slot, name)
        }
        Commands::Clear => commands::clear_command(&mut open()?),
        Commands::Show => commands::show_command(&open()?),
        Commands::Conflicts { search } => commands::conflicts_command(&open()?, search.as_deref()),
        Commands::Export {
            output,
            today,
            reminder_minutes,
            timezone,
        } => commands::export_command(
            &open()?,
            commands::ExportParams {
                output,
                today,
                reminder_minutes,
                timezone,
            },
        ),
        Commands::Theme { mode } => commands::theme_command(
            &mut open()?,
            mode.map(|mode| match mode {
                ThemeMode::Light => commands::ThemeChange::Set(Theme::Light),
                ThemeMode::Dark => commands::ThemeChange::Set(Theme::Dark),
                ThemeMode::Toggle => commands::ThemeChange::Toggle,
            }),
        ),
        Commands::Validate => commands::validate_command(&cli.data),
    }
}
