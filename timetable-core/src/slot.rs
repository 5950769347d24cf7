use std::{collections::BTreeMap, sync::LazyLock};

use chrono::NaiveTime;
use regex::Regex;
use serde::Deserialize;

use crate::{Error, Result};

/// Hours below this value without an AM/PM marker are afternoon hours
pub const AFTERNOON_THRESHOLD: u32 = 8;

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2}):(\d{2})\s*([AaPp][Mm])?\s*$").expect("clock time pattern")
});

/// Start and end time of day of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTime {
    /// Start of the class
    pub start: NaiveTime,
    /// End of the class
    pub end: NaiveTime,
}

impl SlotTime {
    /// Length of the class
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Slot code → human readable "start-end" range, e.g. `"T1": "8:30 - 9:55"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SlotTimeTable {
    entries: BTreeMap<String, String>,
}

impl SlotTimeTable {
    /// Add or overwrite a slot's range text
    pub fn insert(&mut self, slot: impl Into<String>, range: impl Into<String>) {
        self.entries.insert(slot.into(), range.into());
    }

    /// Raw range text, as shown in the grid header
    pub fn label(&self, slot: &str) -> Option<&str> {
        self.entries.get(slot).map(String::as_str)
    }

    /// Slot codes in lexical order
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether the slot has a configured range
    pub fn contains(&self, slot: &str) -> bool {
        self.entries.contains_key(slot)
    }

    /// Parse the slot's range into clock times
    pub fn resolve(&self, slot: &str) -> Result<SlotTime> {
        let raw = self
            .entries
            .get(slot)
            .ok_or_else(|| Error::UnknownSlot(slot.to_string()))?;
        parse_time_range(slot, raw)
    }

    /// Resolve every entry and make sure each range moves forward in time
    ///
    /// The afternoon rule is a guess about the data, so the whole table is
    /// checked rather than trusting it per lookup.
    pub fn validate(&self) -> Result<()> {
        for (slot, raw) in &self.entries {
            let time = parse_time_range(slot, raw)?;
            if time.end <= time.start {
                return Err(Error::InvalidTimeRange {
                    slot: slot.clone(),
                    value: raw.clone(),
                    reason: format!("ends at {} before it starts at {}", time.end, time.start),
                });
            }
        }
        tracing::debug!("validated {} slot time entries", self.entries.len());
        Ok(())
    }
}

impl<S: Into<String>, R: Into<String>> FromIterator<(S, R)> for SlotTimeTable {
    fn from_iter<I: IntoIterator<Item = (S, R)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(slot, range)| (slot.into(), range.into()))
                .collect(),
        }
    }
}

/// Parse `"9:00AM-10:20AM"`, `"8:30 - 9:55"` and friends
pub fn parse_time_range(slot: &str, raw: &str) -> Result<SlotTime> {
    let invalid = |reason: &str| Error::InvalidTimeRange {
        slot: slot.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| invalid("expected 'start-end'"))?;

    Ok(SlotTime {
        start: parse_clock_time(start).map_err(|reason| invalid(&reason))?,
        end: parse_clock_time(end).map_err(|reason| invalid(&reason))?,
    })
}

fn parse_clock_time(text: &str) -> std::result::Result<NaiveTime, String> {
    let caps = CLOCK_TIME
        .captures(text)
        .ok_or_else(|| format!("'{}' is not a h:mm time", text.trim()))?;

    let hour: u32 = caps[1]
        .parse()
        .map_err(|_| format!("bad hour in '{}'", text.trim()))?;
    let minute: u32 = caps[2]
        .parse()
        .map_err(|_| format!("bad minute in '{}'", text.trim()))?;

    let hour = match caps.get(3).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(meridiem) => {
            if hour == 0 || hour > 12 {
                return Err(format!("hour {hour} out of range for a 12-hour clock"));
            }
            match (meridiem.as_str(), hour) {
                ("AM", 12) => 0,
                ("PM", 12) => 12,
                ("PM", h) => h + 12,
                (_, h) => h,
            }
        }
        None if hour < AFTERNOON_THRESHOLD => hour + 12,
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| format!("{hour}:{minute:02} is not a valid time of day"))
}
