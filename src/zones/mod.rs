//! State incentive-zone programs and their polygon loaders.

mod loader;
mod registry;

pub use loader::{zone_layer, RemoteZoneLoader, ZoneLayer, ZoneLayerSource};
pub use registry::{programs_for, ZoneCheck, ZoneProgram, ZoneSource, ZONE_PROGRAMS};
