use std::collections::{HashMap, HashSet};

use bevy_derive::Deref;
use multimap::MultiMap;
use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    csv::{parse_csv, CsvError, Row},
    Fix,
};

pub const FACILITY_ALIAS_PREFIX: &str = "ZZ_";

/// Named points, several per id when a designator is not unique. Insertion
/// order of each id's candidates follows the table.
#[derive(Clone, Debug, Default, Deref, Serialize)]
pub struct PointTable(pub MultiMap<String, Fix>);

/// Representative centre of an ARTCC, FIR or TRACON, keyed by facility code.
#[derive(Clone, Debug, Default, Deref, Serialize)]
pub struct FacilityCenters(pub HashMap<String, Fix>);

fn parse_fix(row: &Row) -> Option<Fix> {
    let [id, lat, lon, ..] = row.as_slice() else {
        trace!("skipping short point row {row:?}");
        return None;
    };
    let id = id.to_uppercase();
    if id.is_empty() {
        return None;
    }

    match (lat.parse::<f64>(), lon.parse::<f64>()) {
        (Ok(lat), Ok(lon)) => Some(Fix::new(id, lat, lon)),
        _ => {
            trace!("skipping point {id} with invalid coordinate {lat},{lon}");
            None
        }
    }
}

pub fn parse_points_csv(content: &[u8]) -> Result<PointTable, CsvError> {
    Ok(PointTable(
        parse_csv(content)?
            .iter()
            .filter_map(parse_fix)
            .map(|fix| (fix.designator.clone(), fix))
            .collect(),
    ))
}

pub fn parse_facility_centers_csv(content: &[u8]) -> Result<FacilityCenters, CsvError> {
    Ok(FacilityCenters(parse_csv(content)?.iter().filter_map(parse_fix).fold(
        HashMap::new(),
        |mut acc, fix| {
            if acc.contains_key(&fix.designator) {
                warn!("duplicate facility centre {}, keeping first", fix.designator);
            } else {
                acc.insert(fix.designator.clone(), fix);
            }
            acc
        },
    )))
}

impl PointTable {
    pub fn from_fixes(fixes: impl IntoIterator<Item = Fix>) -> Self {
        Self(
            fixes
                .into_iter()
                .map(|fix| (fix.designator.to_uppercase(), fix))
                .collect(),
        )
    }

    /// `XXX` for every `ZZ_XXX` alias
    pub fn facility_codes(&self) -> HashSet<String> {
        self.keys()
            .filter_map(|id| id.strip_prefix(FACILITY_ALIAS_PREFIX))
            .filter(|code| !code.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

impl FacilityCenters {
    pub fn from_fixes(fixes: impl IntoIterator<Item = Fix>) -> Self {
        Self(
            fixes
                .into_iter()
                .map(|fix| (fix.designator.to_uppercase(), fix))
                .collect(),
        )
    }
}
