//! Timetable Core Library
//!
//! Course catalog loading, the course selection engine and calendar export
//! for the personal timetable builder.

/// Course catalog and its flattening into offerings
pub mod catalog;
/// Timetable dataset document
pub mod config;
/// Selection state machine
pub mod engine;
/// Error types
pub mod error;
/// ICS rendering
pub mod ics;
/// Offering to calendar event projection
pub mod projector;
/// Slot-time table and time range parsing
pub mod slot;
/// Persistence and theme capabilities
pub mod store;
/// Shared data model
pub mod types;

// Re-export core types and error handling
pub use catalog::Catalog;
pub use error::{Error, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        catalog::*, config::*, engine::*, ics::*, projector::*, slot::*, store::*, types::*,
    };
}
