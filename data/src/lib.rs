//! Event, skill and condition data for the scanner.
//!
//! Everything here is read-only after loading: JSON files from the events
//! directory, parsed once and cached.

use indexmap::IndexMap;

pub mod catalog;
pub mod matcher;
pub mod similarity;
pub mod skills;
mod structs;

pub use catalog::{CharacterIndex, EventCatalog};
pub use matcher::{EventMatch, FuzzyEventMatcher};
pub use skills::{SkillIndex, SkillInfo};
pub use structs::*;

/// Option label → effect text, in display order. Effect text may span lines.
pub type EventOptions = IndexMap<String, String>;

/// Event name → options.
pub type EventMap = IndexMap<String, EventOptions>;
