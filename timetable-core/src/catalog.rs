use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{Day, Offering, Result};

/// Course names per slot code
type DaySchedule = BTreeMap<String, Vec<String>>;

/// Read-only course catalog: day → slot → course names
///
/// Days iterate in teaching order and slots in slot-code order; course
/// names keep the order of the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawCatalog")]
pub struct Catalog {
    days: BTreeMap<Day, DaySchedule>,
}

// `null` at any level means "nothing scheduled there"
type RawCatalog = BTreeMap<Day, Option<BTreeMap<String, Option<Vec<String>>>>>;

impl From<RawCatalog> for Catalog {
    fn from(raw: RawCatalog) -> Self {
        let days = raw
            .into_iter()
            .map(|(day, slots)| {
                let schedule = slots
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(slot, names)| (slot, names.unwrap_or_default()))
                    .collect();
                (day, schedule)
            })
            .collect();
        Self { days }
    }
}

impl Catalog {
    /// Parse the nested day → slot → names JSON document
    pub fn from_json(json_data: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_data)?)
    }

    /// Append a course to a cell, keeping insertion order within the cell
    pub fn add(&mut self, day: Day, slot: impl Into<String>, name: impl Into<String>) {
        self.days
            .entry(day)
            .or_default()
            .entry(slot.into())
            .or_default()
            .push(name.into());
    }

    /// Every slot code referenced by at least one day
    pub fn slot_codes(&self) -> impl Iterator<Item = &str> {
        let mut codes: Vec<&str> = self
            .days
            .values()
            .flat_map(|slots| slots.keys().map(String::as_str))
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes.into_iter()
    }

    /// Flatten into one ordered list of offerings
    pub fn offerings(&self) -> Vec<Offering> {
        self.days
            .iter()
            .flat_map(|(day, slots)| {
                slots.iter().flat_map(move |(slot, names)| {
                    names.iter().map(move |name| Offering::new(*day, slot, name))
                })
            })
            .collect()
    }

    /// Number of (day, slot, name) entries, duplicates included
    pub fn len(&self) -> usize {
        self.days
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether no course is scheduled anywhere
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
