//! Joining coordinates against tracts, eligibility flags and zone layers.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::eligibility::EligibilityTable;
use crate::models::geoid::{state_fips, state_for_geoid};
use crate::models::{Coordinate, ResultRecord, State, ZoneStatus};
use crate::tracts::TractSet;
use crate::zones::{programs_for, ZoneCheck, ZoneLayer, ZoneLayerSource, ZoneProgram};

/// Columns present in every report, before the zone columns
pub const BASE_COLUMNS: [&str; 7] = [
    "latitude",
    "longitude",
    "GEOID",
    "State",
    "NMTC Eligibility",
    "Opportunity Zone",
    "USDA Eligible",
];

/// Reference data shared by every coordinate of a request
pub struct ReferenceData<'a> {
    pub tracts: &'a TractSet,
    pub eligibility: &'a EligibilityTable,
    /// USDA ineligible areas; the USDA column stays empty without it
    pub usda: Option<&'a ZoneLayer>,
}

/// Non-fatal conditions collected while processing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupWarning {
    UnmatchedCoordinates { coordinates: Vec<Coordinate> },
    ZoneUnavailable { label: &'static str, message: String },
    UsdaUnavailable { message: String },
}

impl fmt::Display for LookupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupWarning::UnmatchedCoordinates { coordinates } => {
                write!(f, "{} coordinates matched no census tract:", coordinates.len())?;
                for c in coordinates {
                    write!(f, " {}", c)?;
                }
                Ok(())
            }
            LookupWarning::ZoneUnavailable { label, message } => {
                write!(f, "{} could not be loaded and was skipped: {}", label, message)
            }
            LookupWarning::UsdaUnavailable { message } => {
                write!(f, "USDA eligibility unavailable: {}", message)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupReport {
    /// Labels of the zone columns, aligned with each record's `zones`
    pub zone_columns: Vec<&'static str>,
    pub records: Vec<ResultRecord>,
    pub warnings: Vec<LookupWarning>,
}

impl LookupReport {
    /// Full header: base columns then zone columns
    pub fn columns(&self) -> Vec<&'static str> {
        BASE_COLUMNS
            .iter()
            .copied()
            .chain(self.zone_columns.iter().copied())
            .collect()
    }
}

/// Run the whole join for one batch of coordinates.
///
/// Zone layers that fail to load are reported as warnings and their columns
/// left out; nothing here is fatal.
pub async fn process_coordinates<L: ZoneLayerSource>(
    coordinates: &[Coordinate],
    reference: &ReferenceData<'_>,
    states: &[&'static State],
    zones: &L,
) -> LookupReport {
    let mut warnings = Vec::new();

    let tracts: Vec<_> = coordinates
        .iter()
        .map(|c| reference.tracts.locate(c.to_point()))
        .collect();

    let unmatched: Vec<Coordinate> = coordinates
        .iter()
        .zip(&tracts)
        .filter(|(_, tract)| tract.is_none())
        .map(|(c, _)| *c)
        .collect();
    if !unmatched.is_empty() {
        let warning = LookupWarning::UnmatchedCoordinates {
            coordinates: unmatched,
        };
        warn!("{}", warning);
        warnings.push(warning);
    }

    let mut records: Vec<ResultRecord> = coordinates
        .iter()
        .zip(&tracts)
        .map(|(c, tract)| {
            let geoid = tract.map(|t| t.geoid.clone());
            let flags = geoid.as_deref().and_then(|g| reference.eligibility.get(g));
            ResultRecord {
                latitude: c.latitude,
                longitude: c.longitude,
                state: geoid.as_deref().and_then(state_for_geoid).map(|s| s.name),
                nmtc_eligibility: flags.and_then(|f| f.nmtc_eligibility.clone()),
                opportunity_zone: flags.and_then(|f| f.opportunity_zone.clone()),
                usda_eligible: reference
                    .usda
                    .map(|layer| ZoneStatus::from_bool(!layer.contains_wgs84(c.to_point()))),
                geoid,
                zones: Vec::new(),
            }
        })
        .collect();

    let mut zone_columns = Vec::new();
    for program in programs_for(states) {
        let statuses: Vec<ZoneStatus> = match program.check {
            ZoneCheck::CountyMembership { .. } => records
                .iter()
                .map(|r| {
                    applicable(program, r, |geoid| {
                        program.county_member(geoid).unwrap_or(false)
                    })
                })
                .collect(),
            ZoneCheck::Spatial { .. } => match zones.load_zone(program).await {
                Ok(layer) => records
                    .iter()
                    .zip(coordinates)
                    .map(|(r, c)| applicable(program, r, |_| layer.contains_wgs84(c.to_point())))
                    .collect(),
                Err(e) => {
                    let warning = LookupWarning::ZoneUnavailable {
                        label: program.label,
                        message: e.to_string(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
            },
        };

        zone_columns.push(program.label);
        for (record, status) in records.iter_mut().zip(statuses) {
            record.zones.push(status);
        }
    }

    info!(
        "Processed {} coordinates ({} matched a tract, {} zone columns)",
        records.len(),
        records.iter().filter(|r| r.geoid.is_some()).count(),
        zone_columns.len()
    );

    LookupReport {
        zone_columns,
        records,
        warnings,
    }
}

/// Yes/No only where the record's tract lies in the program's state
fn applicable<F>(program: &ZoneProgram, record: &ResultRecord, member: F) -> ZoneStatus
where
    F: FnOnce(&str) -> bool,
{
    match record.geoid.as_deref() {
        Some(geoid) if state_fips(geoid) == Some(program.state_fips) => {
            ZoneStatus::from_bool(member(geoid))
        }
        _ => ZoneStatus::NotApplicable,
    }
}
