use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

use crate::{
    CalendarExport, Error, IcsOptions, Offering, RecurrenceRule, RecurringEvent, Result,
    config::TimetableConfig, ics::IcsWriter, slot::SlotTimeTable,
};

/// Turns selected offerings into weekly calendar events
#[derive(Debug, Clone)]
pub struct Projector {
    slot_times: SlotTimeTable,
    semester_end: NaiveDate,
    holidays: Vec<NaiveDate>,
}

impl Projector {
    /// Projector with no holidays
    pub fn new(slot_times: SlotTimeTable, semester_end: NaiveDate) -> Self {
        Self {
            slot_times,
            semester_end,
            holidays: Vec::new(),
        }
    }

    /// Projector over a dataset's slot times, end date and holidays
    pub fn from_config(config: &TimetableConfig) -> Self {
        Self::new(config.timeslots.clone(), config.semester_end)
            .with_holidays(config.holidays.clone())
    }

    /// Dates to leave out of every recurrence
    #[must_use]
    pub fn with_holidays(mut self, holidays: Vec<NaiveDate>) -> Self {
        self.holidays = holidays;
        self
    }

    /// First date no event may fall on
    pub const fn semester_end(&self) -> NaiveDate {
        self.semester_end
    }

    /// Events for one offering: its own day plus the paired day
    ///
    /// Anchors falling on or after the semester end produce no event.
    pub fn project(&self, offering: &Offering, today: NaiveDate) -> Result<Vec<RecurringEvent>> {
        let mut events = Vec::with_capacity(2);
        for weekday in [offering.day.weekday(), offering.day.paired_weekday()] {
            if let Some(event) = self.project_on(offering, weekday, today)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Project a single weekday occurrence of an offering
    pub fn project_on(
        &self,
        offering: &Offering,
        weekday: Weekday,
        today: NaiveDate,
    ) -> Result<Option<RecurringEvent>> {
        let time = self.slot_times.resolve(&offering.slot)?;
        let date = next_occurrence(today, weekday);

        if date >= self.semester_end {
            tracing::debug!(
                "skipping {} on {:?}: first occurrence {} is past the semester end {}",
                offering.name,
                weekday,
                date,
                self.semester_end
            );
            return Ok(None);
        }

        let exception_dates = self
            .holidays
            .iter()
            .filter(|holiday| {
                holiday.weekday() == weekday && **holiday >= date && **holiday < self.semester_end
            })
            .map(|holiday| holiday.and_time(time.start))
            .collect();

        Ok(Some(RecurringEvent {
            summary: offering.name.clone(),
            slot: offering.slot.clone(),
            weekday,
            start: date.and_time(time.start),
            end: date.and_time(time.end),
            recurrence: Some(RecurrenceRule {
                until: Some(self.semester_end.and_time(NaiveTime::MIN)),
                exception_dates,
            }),
        }))
    }

    /// Events for the whole selection
    pub fn project_all(
        &self,
        selected: &[Offering],
        today: NaiveDate,
    ) -> Result<Vec<RecurringEvent>> {
        if selected.is_empty() {
            return Err(Error::NothingToExport);
        }

        let mut events = Vec::with_capacity(selected.len() * 2);
        for offering in selected {
            events.extend(self.project(offering, today)?);
        }

        if events.is_empty() {
            return Err(Error::SemesterEnded(self.semester_end));
        }
        Ok(events)
    }

    /// Project and render the selection as a downloadable calendar
    pub fn export(
        &self,
        selected: &[Offering],
        options: &IcsOptions,
        today: NaiveDate,
    ) -> Result<CalendarExport> {
        let events = self.project_all(selected, today)?;
        let writer = IcsWriter::new(options.clone());
        let content = writer.generate(&events)?;

        tracing::info!(
            "exported {} events for {} selected courses",
            events.len(),
            selected.len()
        );

        Ok(CalendarExport {
            file_name: export_file_name(options.calendar_name.as_deref()),
            content,
            event_count: events.len(),
        })
    }
}

/// The given weekday on or after `today`
pub fn next_occurrence(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    today + Duration::days(i64::from(ahead))
}

/// `"IIITH Timetable"` → `"iiith-timetable.ics"`
pub fn export_file_name(calendar_name: Option<&str>) -> String {
    let slug = calendar_name
        .unwrap_or("timetable")
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "timetable.ics".to_string()
    } else {
        format!("{slug}.ics")
    }
}
