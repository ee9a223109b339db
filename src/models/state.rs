//! US states and territories keyed by FIPS code.

use serde::Serialize;

use crate::error::{Error, Result};

/// A state (or DC / territory) that has census tracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct State {
    pub name: &'static str,
    /// USPS abbreviation
    pub abbr: &'static str,
    /// 2-digit FIPS code, the leading two digits of every GEOID in the state
    pub fips: &'static str,
}

const fn state(name: &'static str, abbr: &'static str, fips: &'static str) -> State {
    State { name, abbr, fips }
}

pub static STATES: &[State] = &[
    state("Alabama", "AL", "01"),
    state("Alaska", "AK", "02"),
    state("American Samoa", "AS", "60"),
    state("Arizona", "AZ", "04"),
    state("Arkansas", "AR", "05"),
    state("California", "CA", "06"),
    state("Colorado", "CO", "08"),
    state("Connecticut", "CT", "09"),
    state("Delaware", "DE", "10"),
    state("District of Columbia", "DC", "11"),
    state("Florida", "FL", "12"),
    state("Georgia", "GA", "13"),
    state("Guam", "GU", "66"),
    state("Hawaii", "HI", "15"),
    state("Idaho", "ID", "16"),
    state("Illinois", "IL", "17"),
    state("Indiana", "IN", "18"),
    state("Iowa", "IA", "19"),
    state("Kansas", "KS", "20"),
    state("Kentucky", "KY", "21"),
    state("Louisiana", "LA", "22"),
    state("Maine", "ME", "23"),
    state("Maryland", "MD", "24"),
    state("Massachusetts", "MA", "25"),
    state("Michigan", "MI", "26"),
    state("Minnesota", "MN", "27"),
    state("Mississippi", "MS", "28"),
    state("Missouri", "MO", "29"),
    state("Montana", "MT", "30"),
    state("Nebraska", "NE", "31"),
    state("Nevada", "NV", "32"),
    state("New Hampshire", "NH", "33"),
    state("New Jersey", "NJ", "34"),
    state("New Mexico", "NM", "35"),
    state("New York", "NY", "36"),
    state("North Carolina", "NC", "37"),
    state("North Dakota", "ND", "38"),
    state("North Mariana Islands", "MP", "69"),
    state("Ohio", "OH", "39"),
    state("Oklahoma", "OK", "40"),
    state("Oregon", "OR", "41"),
    state("Pennsylvania", "PA", "42"),
    state("Puerto Rico", "PR", "72"),
    state("Rhode Island", "RI", "44"),
    state("South Carolina", "SC", "45"),
    state("South Dakota", "SD", "46"),
    state("Tennessee", "TN", "47"),
    state("Texas", "TX", "48"),
    state("Utah", "UT", "49"),
    state("Vermont", "VT", "50"),
    state("Virgin Islands", "VI", "78"),
    state("Virginia", "VA", "51"),
    state("Washington", "WA", "53"),
    state("West Virginia", "WV", "54"),
    state("Wisconsin", "WI", "55"),
    state("Wyoming", "WY", "56"),
];

impl State {
    pub fn from_fips(fips: &str) -> Option<&'static State> {
        STATES.iter().find(|s| s.fips == fips)
    }

    /// Resolve a user-supplied state by name, abbreviation or FIPS code
    pub fn parse(input: &str) -> Result<&'static State> {
        let needle = input.trim();
        STATES
            .iter()
            .find(|s| {
                s.name.eq_ignore_ascii_case(needle)
                    || s.abbr.eq_ignore_ascii_case(needle)
                    || s.fips == needle
            })
            .ok_or_else(|| Error::UnknownState(needle.to_string()))
    }

    /// Parse a list of selections, each possibly comma separated.
    ///
    /// Duplicates are dropped; the first occurrence keeps its position.
    pub fn parse_list<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<&'static State>> {
        let mut states: Vec<&'static State> = Vec::new();
        for input in inputs {
            for part in input.as_ref().split(',').filter(|p| !p.trim().is_empty()) {
                let state = Self::parse(part)?;
                if !states.contains(&state) {
                    states.push(state);
                }
            }
        }
        if states.is_empty() {
            return Err(Error::NoStatesSelected);
        }
        Ok(states)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_name_abbr_and_fips() {
        assert_eq!(State::parse("colorado").unwrap().fips, "08");
        assert_eq!(State::parse(" FL ").unwrap().name, "Florida");
        assert_eq!(State::parse("01").unwrap().abbr, "AL");
        assert!(matches!(
            State::parse("Atlantis"),
            Err(Error::UnknownState(_))
        ));
    }

    #[test]
    fn test_parse_list_dedups_and_keeps_order() {
        let states = State::parse_list(&["Texas,CO", "tx"]).unwrap();
        let names: Vec<&str> = states.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Texas", "Colorado"]);
    }

    #[test]
    fn test_parse_list_empty() {
        let empty: [&str; 1] = [" , "];
        assert!(matches!(
            State::parse_list(&empty),
            Err(Error::NoStatesSelected)
        ));
    }

    #[test]
    fn test_fips_codes_unique() {
        for (i, a) in STATES.iter().enumerate() {
            assert_eq!(a.fips.len(), 2);
            assert!(STATES[i + 1..].iter().all(|b| b.fips != a.fips));
        }
    }
}
