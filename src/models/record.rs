//! Input coordinates and per-coordinate lookup results.

use serde::{Serialize, Serializer};

/// A validated WGS84 coordinate from the input file
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Coerce raw cell text into a coordinate
    pub fn parse(latitude: &str, longitude: &str) -> Option<Self> {
        let lat = latitude.trim().parse::<f64>().ok()?;
        let lon = longitude.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }

    /// (x, y) order used by the geometry layers
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Value of a yes/no program column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneStatus {
    Yes,
    No,
    /// The coordinate's tract is outside the program's state
    NotApplicable,
}

impl ZoneStatus {
    pub fn from_bool(value: bool) -> Self {
        if value {
            ZoneStatus::Yes
        } else {
            ZoneStatus::No
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneStatus::Yes => "Yes",
            ZoneStatus::No => "No",
            ZoneStatus::NotApplicable => "N/A",
        }
    }
}

impl std::fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ZoneStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One output row per input coordinate.
///
/// `zones` is aligned with the zone column labels of the report that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub geoid: Option<String>,
    pub state: Option<&'static str>,
    pub nmtc_eligibility: Option<String>,
    pub opportunity_zone: Option<String>,
    pub usda_eligible: Option<ZoneStatus>,
    pub zones: Vec<ZoneStatus>,
}
