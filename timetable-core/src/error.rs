use thiserror::Error;

/// Errors raised by the timetable core
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed dataset or state document
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a file failed
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A slot code with no entry in the slot-time table
    #[error("No slot time configured for slot code: {0}")]
    UnknownSlot(String),

    /// A slot-time entry that does not parse or runs backwards
    #[error("Invalid time range for slot {slot}: '{value}' ({reason})")]
    InvalidTimeRange {
        /// Slot code
        slot: String,
        /// Raw range text
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// Selection of an offering the catalog does not contain
    #[error("Offering is not part of the catalog: {0}")]
    UnknownOffering(String),

    /// Export with an empty selection
    #[error("Nothing to export: select at least one course first")]
    NothingToExport,

    /// Export after the last teaching day
    #[error("The semester already ended on {0}")]
    SemesterEnded(chrono::NaiveDate),

    /// Unusable dataset, path or value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the condition is reported to the user rather than treated as a failure
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NothingToExport | Self::UnknownOffering(_) | Self::SemesterEnded(_)
        )
    }
}

/// Result type used throughout the core
pub type Result<T> = std::result::Result<T, Error>;
