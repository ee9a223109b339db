//! Core data models for the eligibility lookup.

pub mod geoid;
pub mod record;
pub mod state;

pub use record::{Coordinate, ResultRecord, ZoneStatus};
pub use state::{State, STATES};
