//! Name to point resolution.
//!
//! Designators are not unique: the same five-letter name can exist on
//! several continents. With route context at hand, the candidate closest to
//! the neighbours wins, measured as the plain sum of latitude and longitude
//! differences. A chosen candidate that is implausibly far from its
//! neighbours is rejected.

use geo::Point;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    coordinate::parse_coordinate,
    geodesy::{haversine_km, midpoint},
    points::FACILITY_ALIAS_PREFIX,
    reference::ReferenceData,
    Fix,
};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub enum Resolution {
    Found(Fix),
    /// A candidate exists but lies further than `limit_km` from a neighbour.
    Rejected {
        candidate: Fix,
        distance_km: f64,
        limit_km: f64,
    },
    NotFound,
}

impl Resolution {
    pub fn found(self) -> Option<Fix> {
        match self {
            Resolution::Found(fix) => Some(fix),
            Resolution::Rejected { .. } | Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

enum Candidates<'a> {
    Table(&'a [Fix]),
    Coordinate(Fix),
    FacilityCenter(&'a Fix),
    None,
}

/// Candidate with the smallest `|Δlat| + |Δlon|` to the neighbours' midpoint,
/// or to the only neighbour given. Without neighbours the first candidate.
pub fn select_candidate<'a>(
    candidates: &'a [Fix],
    previous: Option<Point>,
    next: Option<Point>,
) -> Option<&'a Fix> {
    let reference = match (previous, next) {
        (Some(previous), Some(next)) => midpoint(previous, next),
        (Some(neighbour), None) | (None, Some(neighbour)) => neighbour,
        (None, None) => return candidates.first(),
    };

    candidates.iter().min_by(|a, b| {
        let error = |fix: &Fix| {
            (fix.lat() - reference.y()).abs() + (fix.lon() - reference.x()).abs()
        };
        error(a).total_cmp(&error(b))
    })
}

impl ReferenceData {
    fn table(&self, key: &str) -> Option<&[Fix]> {
        self.points
            .get_vec(key)
            .map(Vec::as_slice)
            .filter(|fixes| !fixes.is_empty())
    }

    fn candidates(&self, name: &str) -> Candidates {
        let table = if name.starts_with(FACILITY_ALIAS_PREFIX) {
            self.table(name)
        } else if self.is_facility(name) {
            self.table(&format!("{FACILITY_ALIAS_PREFIX}{name}"))
                .or_else(|| self.table(name))
        } else {
            self.table(name)
        };

        if let Some(fixes) = table {
            Candidates::Table(fixes)
        } else if let Some(coordinate) = parse_coordinate(name) {
            Candidates::Coordinate(Fix {
                designator: name.to_string(),
                coordinate,
            })
        } else if let Some(center) = self.facility_centers.get(name) {
            Candidates::FacilityCenter(center)
        } else {
            Candidates::None
        }
    }

    /// Number of points `name` could resolve to. A coordinate or facility
    /// centre counts as one.
    pub fn candidate_count(&self, name: &str) -> usize {
        match self.candidates(&name.to_uppercase()) {
            Candidates::Table(fixes) => fixes.len(),
            Candidates::Coordinate(_) | Candidates::FacilityCenter(_) => 1,
            Candidates::None => 0,
        }
    }

    fn check_distance(
        &self,
        candidate: Fix,
        previous: Option<&Fix>,
        next: Option<&Fix>,
    ) -> Resolution {
        let settings = &self.settings;
        let limit_km = match (previous, next) {
            (Some(previous), Some(next)) => settings.max_reasonable_distance_km.min(
                settings.neighbour_distance_factor
                    * haversine_km(previous.coordinate, next.coordinate),
            ),
            _ => settings.max_reasonable_distance_km,
        };

        let too_far = previous
            .into_iter()
            .chain(next)
            .map(|neighbour| haversine_km(candidate.coordinate, neighbour.coordinate))
            .find(|distance_km| *distance_km > limit_km);

        match too_far {
            Some(distance_km) => {
                debug!(
                    "rejecting {} at {:?}, {distance_km:.0} km from a neighbour exceeds {limit_km:.0} km",
                    candidate.designator, candidate.coordinate
                );
                Resolution::Rejected {
                    candidate,
                    distance_km,
                    limit_km,
                }
            }
            None => Resolution::Found(candidate),
        }
    }

    /// Resolves `name` to a point, using the resolved neighbours to pick
    /// between equally named candidates and to reject implausible ones.
    /// Facility centres go through the same distance check.
    pub fn resolve(&self, name: &str, previous: Option<&Fix>, next: Option<&Fix>) -> Resolution {
        let name = name.to_uppercase();
        let resolution = match self.candidates(&name) {
            Candidates::Table(fixes) => select_candidate(
                fixes,
                previous.map(|fix| fix.coordinate),
                next.map(|fix| fix.coordinate),
            )
            .map_or(Resolution::NotFound, |fix| {
                self.check_distance(fix.clone(), previous, next)
            }),
            Candidates::Coordinate(fix) => self.check_distance(fix, previous, next),
            Candidates::FacilityCenter(center) => {
                self.check_distance(center.clone(), previous, next)
            }
            Candidates::None => Resolution::NotFound,
        };
        trace!("resolved {name}: {resolution:?}");
        resolution
    }

    pub fn resolve_point(
        &self,
        name: &str,
        previous: Option<&Fix>,
        next: Option<&Fix>,
    ) -> Option<Fix> {
        self.resolve(name, previous, next).found()
    }
}
