//! Declarative table of state incentive-zone programs.
//!
//! Output columns are built by walking [`ZONE_PROGRAMS`] in order, so the
//! table order is the column order.

use serde::Serialize;

use crate::models::geoid::county_fips;
use crate::models::State;

/// Where a program's polygons come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneSource {
    /// One ArcGIS REST layer (`/query` URL)
    MapService { endpoint: &'static str },
    /// Several layers whose polygons together form the zone
    MapServiceLayers { endpoints: &'static [&'static str] },
    /// A pre-built file in the dataset repository
    Repository { filename: &'static str },
}

/// How membership is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ZoneCheck {
    /// Point-in-polygon against a fetched layer
    Spatial { source: ZoneSource },
    /// Tract's county (first 5 GEOID digits) is in a fixed list
    CountyMembership {
        #[serde(skip)]
        counties: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneProgram {
    /// Stable key used for caching
    pub id: &'static str,
    /// FIPS code of the jurisdiction
    pub state_fips: &'static str,
    /// Output column label
    pub label: &'static str,
    pub check: ZoneCheck,
}

impl ZoneProgram {
    pub fn state(&self) -> Option<&'static State> {
        State::from_fips(self.state_fips)
    }

    /// Membership test for county-list programs; `None` for spatial ones
    pub fn county_member(&self, geoid: &str) -> Option<bool> {
        match self.check {
            ZoneCheck::CountyMembership { counties } => {
                Some(county_fips(geoid).is_some_and(|c| counties.contains(&c)))
            }
            ZoneCheck::Spatial { .. } => None,
        }
    }
}

/// Programs of the selected states, in table order
pub fn programs_for<'a>(
    states: &'a [&'static State],
) -> impl Iterator<Item = &'static ZoneProgram> + 'a {
    ZONE_PROGRAMS
        .iter()
        .filter(move |p| states.iter().any(|s| s.fips == p.state_fips))
}

const fn map_service(endpoint: &'static str) -> ZoneCheck {
    ZoneCheck::Spatial {
        source: ZoneSource::MapService { endpoint },
    }
}

pub static ZONE_PROGRAMS: &[ZoneProgram] = &[
    ZoneProgram {
        id: "al-ez",
        state_fips: "01",
        label: "AL Enterprise Zone",
        check: ZoneCheck::CountyMembership {
            counties: AL_ENTERPRISE_ZONE_COUNTIES,
        },
    },
    ZoneProgram {
        id: "co-ez",
        state_fips: "08",
        label: "CO Enterprise Zone",
        check: map_service(
            "https://gis.colorado.gov/public/rest/services/OEDIT/Enterprise_Zones/MapServer/2/query",
        ),
    },
    ZoneProgram {
        id: "co-erez",
        state_fips: "08",
        label: "CO Enhanced Rural Enterprise Zone",
        check: map_service(
            "https://gis.colorado.gov/public/rest/services/OEDIT/Enterprise_Zones/MapServer/1/query",
        ),
    },
    ZoneProgram {
        id: "fl-rjtc",
        state_fips: "12",
        label: "FL Rural Job Tax Credit",
        check: ZoneCheck::CountyMembership {
            counties: FL_RURAL_JOB_TAX_CREDIT_COUNTIES,
        },
    },
    ZoneProgram {
        id: "fl-rao",
        state_fips: "12",
        label: "FL Rural Area of Opportunity",
        check: map_service(
            "https://services1.arcgis.com/nRHtyn3uE1kyzoYc/ArcGIS/rest/services/Rural_Areas_of_Opportunity/FeatureServer/0/query",
        ),
    },
    ZoneProgram {
        id: "hi-ez",
        state_fips: "15",
        label: "HI Enterprise Zone",
        check: map_service(
            "https://geodata.hawaii.gov/arcgis/rest/services/BusinessEconomy/MapServer/4/query",
        ),
    },
    ZoneProgram {
        id: "il-ez",
        state_fips: "17",
        label: "IL Enterprise Zone",
        check: map_service(
            "https://aglomaps.revenue.illinois.gov/arcgis/rest/services/EZ_Zone_Admin_2025/MapServer/0/query",
        ),
    },
    ZoneProgram {
        id: "md-ez",
        state_fips: "24",
        label: "MD Enterprise Zone",
        check: map_service(
            "https://mdgeodata.md.gov/imap/rest/services/BusinessEconomy/MD_IncentiveZones/FeatureServer/5/query",
        ),
    },
    ZoneProgram {
        id: "mo-eez",
        state_fips: "29",
        label: "MO Enhanced Enterprise Zone",
        check: ZoneCheck::Spatial {
            source: ZoneSource::MapServiceLayers {
                endpoints: &[
                    "https://gis.mo.gov/arcgis/rest/services/DED/EEZ/MapServer/1/query",
                    "https://gis.mo.gov/arcgis/rest/services/DED/EEZ/MapServer/2/query",
                ],
            },
        },
    },
    ZoneProgram {
        id: "ne-ihub",
        state_fips: "31",
        label: "NE iHub",
        check: map_service(
            "https://gis.ne.gov/Agency/rest/services/IHubEligibleDED/FeatureServer/0/query",
        ),
    },
    ZoneProgram {
        id: "ne-ez",
        state_fips: "31",
        label: "NE Enterprise Zone",
        check: map_service(
            "https://gis.ne.gov/Agency/rest/services/EntprznsDED/FeatureServer/0/query",
        ),
    },
    ZoneProgram {
        id: "tx-ez",
        state_fips: "48",
        label: "TX Enterprise Zone",
        check: ZoneCheck::Spatial {
            source: ZoneSource::Repository {
                filename: "TEZ_2020_complete.parquet",
            },
        },
    },
    ZoneProgram {
        id: "va-ez",
        state_fips: "51",
        label: "VA Enterprise Zone",
        check: map_service(
            "https://maps.vedp.org/arcgis/rest/services/OpenData/OpenDataLayers/MapServer/3/query",
        ),
    },
];

/// Counties with Alabama enterprise zones
const AL_ENTERPRISE_ZONE_COUNTIES: &[&str] = &[
    "01005", "01007", "01011", "01013", "01017", "01019", "01021", "01023", "01025", "01027",
    "01029", "01031", "01033", "01035", "01037", "01039", "01041", "01045", "01047", "01053",
    "01057", "01059", "01061", "01063", "01065", "01067", "01071", "01075", "01079", "01085",
    "01087", "01091", "01093", "01099", "01105", "01107", "01109", "01111", "01113", "01119",
    "01123", "01129", "01131", "01133",
];

/// Florida Rural Job Tax Credit counties
const FL_RURAL_JOB_TAX_CREDIT_COUNTIES: &[&str] = &[
    "12003", "12045", "12079", "12047", "12089", "12007", "12049", "12093", "12013", "12051",
    "12023", "12055", "12107", "12027", "12059", "12029", "12035", "12037", "12039", "12041",
    "12043", "12063", "12065", "12067", "12075", "12077", "12121", "12123", "12125", "12129",
    "12131", "12133",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_ids_unique_and_states_known() {
        for (i, program) in ZONE_PROGRAMS.iter().enumerate() {
            assert!(program.state().is_some(), "{} has unknown state", program.id);
            assert!(
                ZONE_PROGRAMS[i + 1..].iter().all(|p| p.id != program.id),
                "duplicate id {}",
                program.id
            );
        }
    }

    #[test]
    fn test_county_lists_belong_to_their_state() {
        for program in ZONE_PROGRAMS {
            if let ZoneCheck::CountyMembership { counties } = program.check {
                assert!(counties.iter().all(|c| c.len() == 5 && c.starts_with(program.state_fips)));
            }
        }
    }

    #[test]
    fn test_programs_for_keeps_table_order() {
        let states = vec![
            State::parse("Florida").unwrap(),
            State::parse("Colorado").unwrap(),
        ];
        let labels: Vec<&str> = programs_for(&states).map(|p| p.label).collect();
        assert_eq!(
            labels,
            vec![
                "CO Enterprise Zone",
                "CO Enhanced Rural Enterprise Zone",
                "FL Rural Job Tax Credit",
                "FL Rural Area of Opportunity",
            ]
        );

        let none = vec![State::parse("Ohio").unwrap()];
        assert_eq!(programs_for(&none).count(), 0);
    }

    #[test]
    fn test_county_membership() {
        let al = ZONE_PROGRAMS.iter().find(|p| p.id == "al-ez").unwrap();
        assert_eq!(al.county_member("01005950100"), Some(true));
        assert_eq!(al.county_member("01003010100"), Some(false));
        assert_eq!(al.county_member("010"), Some(false));

        let co = ZONE_PROGRAMS.iter().find(|p| p.id == "co-ez").unwrap();
        assert_eq!(co.county_member("08031000100"), None);
    }
}
