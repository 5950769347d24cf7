use std::{fmt::Write as _, fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use timetable_core::{Error, prelude::*};

use crate::store::JsonFileStore;

const APP_NAME: &str = "timetable";
const CELL_WIDTH: usize = 22;

/// Dataset plus the engine restored from the user's state file
pub struct Session {
    pub config: TimetableConfig,
    pub engine: Engine,
}

impl Session {
    pub fn open(data: &Path, state: Option<PathBuf>) -> Result<Self> {
        let config = TimetableConfig::from_path(data)?;
        let store = match state {
            Some(path) => JsonFileStore::new(path),
            None => JsonFileStore::with_default_dir(APP_NAME)?,
        };
        tracing::debug!("using state file {}", store.path().display());

        let engine = Engine::new(&config.courses, Box::new(store), Box::new(LogThemeSink));
        Ok(Self { config, engine })
    }
}

/// Terminal output has no styling to switch, so the theme is only reported
struct LogThemeSink;

impl ThemeSink for LogThemeSink {
    fn apply(&self, theme: Theme) {
        tracing::debug!("theme: {}", theme.as_str());
    }
}

pub enum ThemeChange {
    Set(Theme),
    Toggle,
}

/// Export command parameters
pub struct ExportParams {
    pub output: Option<PathBuf>,
    pub today: Option<NaiveDate>,
    pub reminder_minutes: Option<u32>,
    pub timezone: Option<String>,
}

pub fn courses_command(
    session: &Session,
    search: Option<&str>,
    day: Option<Day>,
    slot: Option<String>,
) -> Result<()> {
    let filter = match (day, slot) {
        (Some(day), Some(slot)) => Some(FilterMode::Intersection(day, slot)),
        (Some(day), None) => Some(FilterMode::Day(day)),
        (None, Some(slot)) => Some(FilterMode::Slot(slot)),
        (None, None) => None,
    };

    let term = search.unwrap_or("");
    let courses = match &filter {
        Some(filter) => {
            println!("{}", filter.title());
            let needle = term.to_lowercase();
            session
                .engine
                .browse(filter)
                .into_iter()
                .filter(|o| o.name.to_lowercase().contains(&needle))
                .collect()
        }
        None => session.engine.filter_available(term),
    };

    if courses.is_empty() {
        println!("No available courses found.");
    }
    for offering in &courses {
        println!("{}", describe(offering));
    }
    Ok(())
}

pub fn search_command(session: &Session, term: &str, limit: usize) -> Result<()> {
    let hits = session.engine.search(term, limit);
    if hits.is_empty() {
        println!("No courses match '{term}'.");
    }
    for hit in hits {
        match hit.replaces {
            Some(previous) => println!(
                "{}  REPLACES: {}",
                describe(&hit.offering),
                previous.name
            ),
            None => println!("{}", describe(&hit.offering)),
        }
    }
    Ok(())
}

pub fn select_command(session: &mut Session, offering: Offering, replace: bool) -> Result<()> {
    let result = if replace {
        session.engine.replace(&offering)
    } else {
        session.engine.select(&offering)
    };
    match result {
        Ok(SelectOutcome::Added) => println!("✓ Added {offering}"),
        Ok(SelectOutcome::Occupied(occupants)) => {
            for o in occupants {
                println!("{} {} is taken by {}", o.day, o.slot, o.name);
            }
            println!("Use --replace to swap it for {}", offering.name);
        }
        Ok(SelectOutcome::Replaced(previous)) => {
            println!("✓ Added {offering}");
            for p in previous {
                println!("  replaced {}", p.name);
            }
        }
        Ok(SelectOutcome::AlreadySelected) => println!("{offering} is already selected"),
        Err(e) if e.is_recoverable() => println!("{e}"),
        Err(e) => return Err(e.into()),
    }
    print_conflicts(&session.engine.conflicting_snapshot());
    Ok(())
}

pub fn remove_command(session: &mut Session, day: Day, slot: String, name: String) -> Result<()> {
    let offering = Offering::new(day, slot, name);
    if session.engine.remove(&offering) {
        println!("✓ Removed {offering}");
    } else {
        println!("{offering} was not selected");
    }
    Ok(())
}

pub fn clear_command(session: &mut Session) -> Result<()> {
    let count = session.engine.selected().len();
    session.engine.clear();
    println!("✓ Cleared {count} courses");
    Ok(())
}

pub fn show_command(session: &Session) -> Result<()> {
    print!("{}", render_grid(&session.engine, &session.config.timeslots));

    println!();
    println!("SELECTED");
    if session.engine.selected().is_empty() {
        println!("  No courses selected.");
    }
    for offering in session.engine.selected() {
        println!("  {}", describe(offering));
    }

    let clashes = session.engine.selection_conflicts();
    if !clashes.is_empty() {
        println!();
        println!("! CONFLICTS");
        for (first, second) in clashes {
            println!("  {} - {}: {} VS {}", first.day, first.slot, first.name, second.name);
        }
    }
    Ok(())
}

pub fn conflicts_command(session: &Session, search: Option<&str>) -> Result<()> {
    let conflicting = session.engine.filter_conflicting(search.unwrap_or(""));
    if conflicting.is_empty() {
        println!("No conflicting courses.");
        return Ok(());
    }
    print_conflicts(&conflicting);
    Ok(())
}

pub fn export_command(session: &Session, params: ExportParams) -> Result<()> {
    let projector = Projector::from_config(&session.config);
    let options = IcsOptions {
        calendar_name: Some(session.config.name.clone()),
        timezone: params.timezone,
        reminder_minutes: params.reminder_minutes,
    };
    let today = params.today.unwrap_or_else(|| Local::now().date_naive());

    let export = match session.engine.export(&projector, &options, today) {
        Ok(export) => export,
        Err(e @ (Error::NothingToExport | Error::SemesterEnded(_))) => {
            println!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to export timetable"),
    };

    let output = params
        .output
        .unwrap_or_else(|| PathBuf::from(&export.file_name));
    fs::write(&output, &export.content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "✓ Exported {} events until {} to {}",
        export.event_count,
        projector.semester_end(),
        output.display()
    );
    Ok(())
}

pub fn theme_command(session: &mut Session, change: Option<ThemeChange>) -> Result<()> {
    match change {
        Some(ThemeChange::Set(theme)) => session.engine.set_theme(theme),
        Some(ThemeChange::Toggle) => {
            session.engine.toggle_theme();
        }
        None => {}
    }
    println!("Theme: {}", session.engine.theme().as_str());
    Ok(())
}

pub fn validate_command(data: &Path) -> Result<()> {
    let config = TimetableConfig::from_path(data)?;
    config
        .validate()
        .with_context(|| format!("{} is not a usable timetable", data.display()))?;

    println!("✓ {} is valid", data.display());
    for slot in config.timeslots.slots() {
        let time = config.timeslots.resolve(slot)?;
        println!("  {slot}: {} - {}", time.start.format("%H:%M"), time.end.format("%H:%M"));
    }
    println!("  {} offerings, semester ends {}", config.courses.len(), config.semester_end);
    Ok(())
}

fn describe(offering: &Offering) -> String {
    let badge = offering
        .duration()
        .badge()
        .map(|b| format!(" [{b}]"))
        .unwrap_or_default();
    format!("{:<9} {:<3} {}{}", offering.day, offering.slot, offering.name, badge)
}

fn print_conflicts(conflicting: &[Offering]) {
    if conflicting.is_empty() {
        return;
    }
    println!("Now conflicting:");
    for offering in conflicting {
        println!("  {}", describe(offering));
    }
}

/// Days as rows, slots as columns
pub fn render_grid(engine: &Engine, timeslots: &SlotTimeTable) -> String {
    let slots: Vec<&str> = timeslots.slots().collect();
    let mut out = String::new();

    let _ = write!(out, "{:<10}", "");
    for slot in &slots {
        let label = timeslots.label(slot).unwrap_or_default();
        let _ = write!(out, "| {:<width$}", format!("{slot} {label}"), width = CELL_WIDTH);
    }
    out.push('\n');

    for day in Day::ALL {
        let _ = write!(out, "{:<10}", day.as_str());
        for slot in &slots {
            let occupants = engine.selected_at(day, slot);
            let cell = match occupants.as_slice() {
                [] => String::new(),
                [only] => truncate(&only.name),
                many => format!("CONFLICT ({})", many.len()),
            };
            let _ = write!(out, "| {cell:<width$}", width = CELL_WIDTH);
        }
        out.push('\n');
    }
    out
}

fn truncate(name: &str) -> String {
    if name.chars().count() <= CELL_WIDTH {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(CELL_WIDTH - 1).collect();
        short.push('…');
        short
    }
}
