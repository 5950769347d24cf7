use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{IcsOptions, RecurrenceRule, RecurringEvent, Result};

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const MAX_LINE_OCTETS: usize = 75;

/// ICS calendar writer
pub struct IcsWriter {
    options: IcsOptions,
}

impl IcsWriter {
    /// Writer with the given calendar options
    pub const fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    /// Render all events into one VCALENDAR document
    pub fn generate(&self, events: &[RecurringEvent]) -> Result<String> {
        let mut ics_content = String::new();

        push_line(&mut ics_content, "BEGIN:VCALENDAR");
        push_line(&mut ics_content, "VERSION:2.0");
        push_line(&mut ics_content, "PRODID:-//Timetable Builder//Course Calendar//EN");
        push_line(&mut ics_content, "CALSCALE:GREGORIAN");
        push_line(&mut ics_content, "METHOD:PUBLISH");

        if let Some(ref name) = self.options.calendar_name {
            push_line(&mut ics_content, &format!("X-WR-CALNAME:{}", escape_text(name)));
        }

        if let Some(ref timezone) = self.options.timezone {
            push_line(&mut ics_content, &format!("X-WR-TIMEZONE:{timezone}"));
        }

        for event in events {
            self.add_event(&mut ics_content, event);
        }

        push_line(&mut ics_content, "END:VCALENDAR");

        Ok(ics_content)
    }

    fn add_event(&self, ics_content: &mut String, event: &RecurringEvent) {
        let uid = format!("{}@timetable", Uuid::new_v4());
        let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

        push_line(ics_content, "BEGIN:VEVENT");
        push_line(ics_content, &format!("UID:{uid}"));
        push_line(ics_content, &format!("DTSTAMP:{dtstamp}"));
        push_line(ics_content, &format!("DTSTART:{}", local(event.start)));
        push_line(ics_content, &format!("DTEND:{}", local(event.end)));
        push_line(ics_content, &format!("SUMMARY:{}", escape_text(&event.summary)));

        if let Some(ref recurrence) = event.recurrence {
            add_recurrence_rule(ics_content, recurrence);
        }

        if let Some(reminder_minutes) = self.options.reminder_minutes {
            push_line(ics_content, "BEGIN:VALARM");
            push_line(ics_content, "ACTION:DISPLAY");
            push_line(
                ics_content,
                &format!("DESCRIPTION:{}", escape_text(&event.summary)),
            );
            push_line(ics_content, &format!("TRIGGER:-PT{reminder_minutes}M"));
            push_line(ics_content, "END:VALARM");
        }

        push_line(ics_content, "END:VEVENT");
    }
}

impl Default for IcsWriter {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

fn local(time: NaiveDateTime) -> String {
    time.format(LOCAL_FORMAT).to_string()
}

fn add_recurrence_rule(ics_content: &mut String, recurrence: &RecurrenceRule) {
    let mut rrule = String::from("RRULE:FREQ=WEEKLY");

    if let Some(until) = recurrence.until {
        rrule.push_str(&format!(";UNTIL={}", local(until)));
    }

    push_line(ics_content, &rrule);

    for exception_date in &recurrence.exception_dates {
        push_line(ics_content, &format!("EXDATE:{}", local(*exception_date)));
    }
}

/// Escape TEXT values
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Append a content line, folded at 75 octets
fn push_line(ics_content: &mut String, line: &str) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            ics_content.push_str("\r\n ");
            // the leading space counts towards the continuation line
            width = 1;
        }
        ics_content.push(ch);
        width += len;
    }
    ics_content.push_str("\r\n");
}
