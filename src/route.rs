use geo::{Coord, LineString};
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    airway::{ExpandedToken, TokenSource},
    geodesy::{great_circle_path, haversine_nm},
    points::FACILITY_ALIAS_PREFIX,
    reference::ReferenceData,
    token::{correct_procedure_markers, is_procedure_shorthand, tokenize, RouteToken},
    Fix,
};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ResolvedRoutePoint {
    pub fix: Fix,
    /// index into the fully expanded token stream
    pub source_token_index: usize,
    pub mandatory: bool,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum SegmentStyle {
    /// both endpoints inside a mandatory span
    Solid,
    Dashed,
    /// airport or facility endpoint joined to the route body
    Fan,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Segment {
    pub from: Fix,
    pub to: Fix,
    pub style: SegmentStyle,
    pub path: LineString,
}

impl Segment {
    pub fn is_solid(&self) -> bool {
        self.style == SegmentStyle::Solid
    }

    pub fn is_fan(&self) -> bool {
        self.style == SegmentStyle::Fan
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct ParsedRoute {
    pub route_text: String,
    pub color: Option<String>,
    pub points: Vec<ResolvedRoutePoint>,
    pub segments: Vec<Segment>,
}

/// Mandatory state of every expanded token. Tokens spliced in for an airway
/// are solid when the nearest original tokens on both sides are.
fn solid_mask(expanded: &[ExpandedToken], tokens: &[RouteToken]) -> Vec<bool> {
    let known: Vec<Option<bool>> = expanded
        .iter()
        .map(|token| match token.source {
            TokenSource::Original(i) => Some(tokens.get(i).is_some_and(|token| token.mandatory)),
            TokenSource::Airway(_) => None,
        })
        .collect();

    known
        .iter()
        .enumerate()
        .map(|(i, state)| {
            state.unwrap_or_else(|| {
                let before = known[..i].iter().rev().find_map(|state| *state);
                let after = known[i + 1..].iter().find_map(|state| *state);
                match (before, after) {
                    (Some(before), Some(after)) => before && after,
                    (Some(side), None) | (None, Some(side)) => side,
                    (None, None) => false,
                }
            })
        })
        .collect()
}

impl ReferenceData {
    fn resolve_token(&self, name: &str, previous: Option<&Fix>, next: Option<&Fix>) -> Option<Fix> {
        if is_procedure_shorthand(name) && !self.points.contains_key(name) {
            let root = name.get(..5)?;
            if !self.points.contains_key(root)
                && !self.points.contains_key(&format!("{FACILITY_ALIAS_PREFIX}{root}"))
            {
                trace!("dropping procedure {name} without a root fix");
                return None;
            }
            return self.resolve_point(root, previous, next);
        }
        self.resolve_point(name, previous, next).or_else(|| {
            let center = self.facility_centers.get(name).cloned();
            if center.is_some() {
                trace!("falling back to the facility centre of {name}");
            }
            center
        })
    }

    fn resolve_tokens(&self, names: &[String], mask: &[bool]) -> Vec<ResolvedRoutePoint> {
        let mut points: Vec<ResolvedRoutePoint> = Vec::with_capacity(names.len());

        for (i, name) in names.iter().enumerate() {
            let previous = points.last().map(|point| &point.fix);
            let next = names.get(i + 1).and_then(|next_name| {
                let current = (self.candidate_count(name) == 1)
                    .then(|| self.resolve_point(name, None, None))
                    .flatten();
                self.resolve_point(next_name, previous, current.as_ref())
            });

            match self.resolve_token(name, previous, next.as_ref()) {
                Some(fix) => points.push(ResolvedRoutePoint {
                    fix,
                    source_token_index: i,
                    mandatory: mask.get(i).copied().unwrap_or_default(),
                }),
                None => debug!("can't find fix {name}, dropping it"),
            }
        }
        points
    }

    fn segment(&self, from: &Fix, to: &Fix, style: SegmentStyle) -> Segment {
        let settings = &self.settings;
        let distance_nm = haversine_nm(from.coordinate, to.coordinate);
        let path = if distance_nm > settings.great_circle_threshold_nm {
            great_circle_path(from.coordinate, to.coordinate, settings.great_circle_points)
        } else {
            LineString::from(vec![Coord::from(from.coordinate), Coord::from(to.coordinate)])
        };

        Segment {
            from: from.clone(),
            to: to.clone(),
            style,
            path,
        }
    }

    fn chain(&self, points: &[ResolvedRoutePoint]) -> Vec<Segment> {
        points
            .iter()
            .tuple_windows()
            .map(|(from, to)| {
                let style = if from.mandatory && to.mandatory {
                    SegmentStyle::Solid
                } else {
                    SegmentStyle::Dashed
                };
                self.segment(&from.fix, &to.fix, style)
            })
            .collect()
    }

    /// Leading and trailing airports fan to the first and last navigation
    /// point, the navigation points in between are chained.
    fn build_segments(&self, points: &[ResolvedRoutePoint]) -> Vec<Segment> {
        if points.len() < 2 {
            return vec![];
        }

        let is_navigation =
            |point: &ResolvedRoutePoint| !self.is_airport_ident(&point.fix.designator);
        let (Some(first_nav), Some(last_nav)) = (
            points.iter().position(is_navigation),
            points.iter().rposition(is_navigation),
        ) else {
            return self.chain(points);
        };
        if first_nav == 0 && last_nav == points.len() - 1 {
            return self.chain(points);
        }

        let first = &points[first_nav].fix;
        let last = &points[last_nav].fix;
        points[..first_nav]
            .iter()
            .map(|airport| self.segment(&airport.fix, first, SegmentStyle::Fan))
            .chain(self.chain(&points[first_nav..=last_nav]))
            .chain(
                points[last_nav + 1..]
                    .iter()
                    .map(|airport| self.segment(last, &airport.fix, SegmentStyle::Fan)),
            )
            .collect()
    }

    /// Parses a single route line, `BODY[;COLOR]`: expands CDRs, procedures
    /// and airways, resolves every token against its neighbours and builds
    /// the segments.
    pub fn parse_route(&self, line: &str) -> ParsedRoute {
        let (body, color) = match line.split_once(';') {
            Some((body, color)) => (body, Some(color.trim()).filter(|color| !color.is_empty())),
            None => (line, None),
        };
        let route_text = body.split_whitespace().join(" ").to_uppercase();

        let body = correct_procedure_markers(&self.cdrs.expand(&route_text));
        let tokens = tokenize(&body);
        let tokens = self.departures.expand(&tokens, |code| self.is_facility(code));
        let tokens = self.arrivals.expand(&tokens);

        let texts: Vec<String> = tokens.iter().map(|token| token.text.clone()).collect();
        let expanded = self.airways().expand_with_sources(&texts);
        let mask = solid_mask(&expanded, &tokens);
        let names: Vec<String> = expanded.into_iter().map(|token| token.text).collect();
        trace!("expanded {route_text} to {}", names.join(" "));

        let points = self.resolve_tokens(&names, &mask);
        let segments = self.build_segments(&points);

        ParsedRoute {
            route_text,
            color: color.map(ToString::to_string),
            points,
            segments,
        }
    }
}
