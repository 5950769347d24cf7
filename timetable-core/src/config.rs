use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{Catalog, Error, Result, slot::SlotTimeTable, types::DEFAULT_CALENDAR_NAME};

/// A semester's timetable dataset
///
/// ```json
/// {
///   "name": "IIITH Timetable",
///   "semester_end": "2025-11-20",
///   "holidays": ["2025-10-02"],
///   "timeslots": { "T1": "8:30 - 9:55" },
///   "courses": { "Monday": { "T1": ["Compilers"] } }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableConfig {
    /// Calendar name used for exports
    #[serde(default = "default_name")]
    pub name: String,
    /// First day with no more classes
    pub semester_end: NaiveDate,
    /// Days without classes
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Slot code → time range
    pub timeslots: SlotTimeTable,
    /// Course offerings per day and slot
    pub courses: Catalog,
}

fn default_name() -> String {
    DEFAULT_CALENDAR_NAME.to_string()
}

impl TimetableConfig {
    /// Parse a dataset document
    pub fn from_json(json_data: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_data)?)
    }

    /// Read and parse a dataset file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|err| {
            Error::Config(format!(
                "Cannot read timetable dataset {}: {}",
                path_ref.display(),
                err
            ))
        })?;
        let config = Self::from_json(&content)?;
        tracing::debug!(
            "loaded dataset '{}' from {}: {} offerings",
            config.name,
            path_ref.display(),
            config.courses.len()
        );
        Ok(config)
    }

    /// Check that every slot the catalog uses has a parseable time range
    pub fn validate(&self) -> Result<()> {
        if let Some(missing) = self
            .courses
            .slot_codes()
            .find(|slot| !self.timeslots.contains(slot))
        {
            return Err(Error::UnknownSlot(missing.to_string()));
        }
        self.timeslots.validate()
    }
}
