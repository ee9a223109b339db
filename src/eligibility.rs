//! Static tract-level eligibility flags (NMTC, Opportunity Zone).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::geoid::normalize_geoid;

/// Labels for one tract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityFlags {
    pub nmtc_eligibility: Option<String>,
    pub opportunity_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlagRow {
    #[serde(rename = "GEOID")]
    geoid: String,
    #[serde(rename = "NMTC_Eligibility", default)]
    nmtc_eligibility: Option<String>,
    #[serde(rename = "Opportunity_Zone", default)]
    opportunity_zone: Option<String>,
}

/// GEOID → eligibility labels
#[derive(Debug, Clone, Default)]
pub struct EligibilityTable {
    rows: HashMap<String, EligibilityFlags>,
}

impl EligibilityTable {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        info!("Loading eligibility flags from {}", path.display());
        let table = Self::from_reader(File::open(path)?)?;
        info!("Loaded eligibility flags for {} tracts", table.len());
        Ok(table)
    }

    /// Parse the CSV; other columns are ignored and rows with an unusable
    /// GEOID are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = HashMap::new();
        let mut skipped = 0usize;
        for result in csv_reader.deserialize::<FlagRow>() {
            let row = result?;
            let Some(geoid) = normalize_geoid(&row.geoid) else {
                skipped += 1;
                continue;
            };
            rows.insert(
                geoid,
                EligibilityFlags {
                    nmtc_eligibility: non_empty(row.nmtc_eligibility),
                    opportunity_zone: non_empty(row.opportunity_zone),
                },
            );
        }
        if skipped > 0 {
            debug!("Skipped {} eligibility rows with an invalid GEOID", skipped);
        }

        Ok(Self { rows })
    }

    pub fn get(&self, geoid: &str) -> Option<&EligibilityFlags> {
        self.rows.get(geoid)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(String, EligibilityFlags)> for EligibilityTable {
    fn from_iter<I: IntoIterator<Item = (String, EligibilityFlags)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
