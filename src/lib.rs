//! Tract Lookup - census tract and incentive-zone eligibility for coordinates
//!
//! This library provides the loaders, spatial join and export shared by the
//! lookup and serve binaries.

pub mod config;
pub mod eligibility;
pub mod error;
pub mod fetch;
pub mod input;
pub mod models;
pub mod output;
pub mod pip;
pub mod pipeline;
pub mod service;
pub mod tracts;
pub mod zones;

pub use error::{Error, Result};
pub use models::{Coordinate, ResultRecord, State, ZoneStatus};
pub use pipeline::{LookupReport, LookupWarning};
pub use service::LookupService;
