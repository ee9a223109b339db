//! Census tract identifier helpers.
//!
//! A tract GEOID is 11 digits: 2-digit state FIPS, 3-digit county FIPS,
//! 6-digit tract code.

use super::State;

pub const GEOID_LEN: usize = 11;

/// Normalize a raw GEOID value.
///
/// Spreadsheet tools often store GEOIDs as numbers and strip the leading
/// zero of states like Alabama ("01..."), so all-digit values shorter than
/// 11 characters are left-padded.
pub fn normalize_geoid(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > GEOID_LEN {
        return None;
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>width$}", trimmed, width = GEOID_LEN))
}

/// Leading 2 digits of a GEOID
pub fn state_fips(geoid: &str) -> Option<&str> {
    geoid.get(..2)
}

/// Leading 5 digits of a GEOID (state + county)
pub fn county_fips(geoid: &str) -> Option<&str> {
    geoid.get(..5)
}

pub fn state_for_geoid(geoid: &str) -> Option<&'static State> {
    state_fips(geoid).and_then(State::from_fips)
}
