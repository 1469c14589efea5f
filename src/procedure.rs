//! Departure (DP) and arrival (STAR) procedures from the full-route tables.
//!
//! A DP route row is keyed by the procedure's computer code (`DEEZZ5.DEEZZ`)
//! and its transition code (`DEEZZ5.CANDR`); a STAR row by its STAR code
//! (`LENDY8.LENDY`) and transition code (`DPK.LENDY8`). Route tokens naming
//! either are replaced by the procedure's fixes.

use std::collections::HashMap;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    csv::{field, parse_csv, CsvError, Header, Row},
    points::FACILITY_ALIAS_PREFIX,
    token::RouteToken,
};

static TRANSITION_FIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{3,6}$").unwrap());
static US_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());

#[derive(Error, Debug)]
pub enum ProcedureError {
    #[error("failed to parse procedure routes: {0}")]
    Csv(#[from] CsvError),
    #[error("procedure routes are missing the {0} column")]
    MissingColumn(&'static str),
}

/// Effective date as a sortable `YYYYMMDD` number, 0 if absent.
fn parse_eff_date(value: &str) -> u64 {
    if let Some(captures) = US_DATE_RE.captures(value.trim()) {
        let part = |i: usize| captures[i].parse::<u64>().unwrap_or(0);
        return part(3) * 10_000 + part(1) * 100 + part(2);
    }
    value
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

fn split_points(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_uppercase).collect()
}

/// airport part of `KJFK/04L|13R` style group entries
fn group_airports(group: &str) -> Vec<String> {
    group
        .split_whitespace()
        .filter_map(|entry| entry.split('/').next())
        .filter(|airport| !airport.is_empty())
        .map(str::to_uppercase)
        .unique()
        .collect()
}

fn required(header: &Header, column: &'static str) -> Result<usize, ProcedureError> {
    header
        .position(&[column])
        .ok_or(ProcedureError::MissingColumn(column))
}

/// Whether `origin` is one of `airports`, also trying it with the `K` prefix
/// added or removed.
fn serves(airports: &[String], origin: &str) -> bool {
    let stripped = (origin.len() == 4 && origin.starts_with('K'))
        .then(|| origin[1..].to_string());
    let prefixed = (origin.len() == 3).then(|| format!("K{origin}"));

    std::iter::once(origin.to_string())
        .chain(stripped)
        .chain(prefixed)
        .any(|candidate| airports.contains(&candidate))
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DepartureRoute {
    pub code: String,
    pub name: String,
    pub eff_date: u64,
    pub origins: Vec<String>,
    pub transition_code: String,
    pub route_points: Vec<String>,
}

/// A departure procedure, merged over all of its route rows.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DepartureProcedure {
    pub code: String,
    pub name: String,
    pub served_airports: Vec<String>,
    pub eff_date: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DepartureProcedures {
    routes: Vec<DepartureRoute>,
    by_code: HashMap<String, DepartureProcedure>,
    /// `DEEZZ5` -> latest code
    by_left: HashMap<String, String>,
    /// `DEEZZ` -> latest code
    by_root: HashMap<String, String>,
    /// `DEEZZ#.DEEZZ` -> latest code
    by_pattern: HashMap<String, (String, u64)>,
    routes_by_transition: HashMap<String, Vec<usize>>,
    routes_by_code: HashMap<String, Vec<usize>>,
}

fn root_letters(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_ascii_digit() && *c != '#')
        .collect()
}

/// First 3-4 character token that isn't a facility placeholder.
fn route_origin<'a>(
    tokens: &'a [RouteToken],
    is_facility: &impl Fn(&str) -> bool,
) -> Option<&'a str> {
    tokens
        .iter()
        .map(|token| token.text.as_str())
        .filter(|text| !text.starts_with(FACILITY_ALIAS_PREFIX) && !is_facility(text))
        .find(|text| matches!(text.len(), 3 | 4))
}

pub fn parse_dp_csv(content: &[u8]) -> Result<DepartureProcedures, ProcedureError> {
    let rows = parse_csv(content)?;
    let Some((header, rows)) = rows.split_first() else {
        return Ok(DepartureProcedures::default());
    };
    let header = Header::new(header);

    let code = required(&header, "DP_COMPUTER_CODE")?;
    let origins = required(&header, "ORIG_GROUP")?;
    let transition = required(&header, "TRANSITION_COMPUTER_CODE")?;
    let points = required(&header, "ROUTE_POINTS")?;
    let eff_date = header.position(&["EFF_DATE"]);
    let name = header.position(&["DP_NAME"]);

    let parse_row = |row: &Row| {
        let code = field(row, Some(code)).to_uppercase();
        let origins = group_airports(field(row, Some(origins)));
        (!code.is_empty() && !origins.is_empty()).then(|| DepartureRoute {
            code,
            name: field(row, name).to_uppercase(),
            eff_date: parse_eff_date(field(row, eff_date)),
            origins,
            transition_code: field(row, Some(transition)).to_uppercase(),
            route_points: split_points(field(row, Some(points))),
        })
    };

    Ok(DepartureProcedures::new(
        rows.iter().filter_map(parse_row).collect(),
    ))
}

impl DepartureProcedures {
    pub fn new(routes: Vec<DepartureRoute>) -> Self {
        let mut procedures = Self::default();
        for (index, route) in routes.iter().enumerate() {
            procedures.insert(index, route);
        }
        procedures.routes = routes;
        procedures
    }

    fn insert(&mut self, index: usize, route: &DepartureRoute) {
        let procedure = self
            .by_code
            .entry(route.code.clone())
            .or_insert_with(|| DepartureProcedure {
                code: route.code.clone(),
                name: route.name.clone(),
                served_airports: vec![],
                eff_date: route.eff_date,
            });
        procedure.eff_date = procedure.eff_date.max(route.eff_date);
        for origin in &route.origins {
            if !procedure.served_airports.contains(origin) {
                procedure.served_airports.push(origin.clone());
            }
        }

        if let Some((left, right)) = route.code.split_once('.') {
            let newer = |by: &HashMap<String, String>, key: &str| {
                by.get(key)
                    .and_then(|code| self.by_code.get(code))
                    .is_none_or(|existing| route.eff_date > existing.eff_date)
            };
            let root = root_letters(left);
            let replace_left = newer(&self.by_left, left);
            let replace_root = !root.is_empty() && newer(&self.by_root, &root);

            if replace_left {
                self.by_left.insert(left.to_string(), route.code.clone());
            }
            if replace_root {
                self.by_root.insert(root.clone(), route.code.clone());
            }
            if !root.is_empty() {
                let pattern = format!("{root}#.{right}");
                if self
                    .by_pattern
                    .get(&pattern)
                    .is_none_or(|(_, eff_date)| route.eff_date > *eff_date)
                {
                    self.by_pattern
                        .insert(pattern, (route.code.clone(), route.eff_date));
                }
            }
        }

        if !route.transition_code.is_empty() {
            self.routes_by_transition
                .entry(route.transition_code.clone())
                .or_default()
                .push(index);
        }
        self.routes_by_code
            .entry(route.code.clone())
            .or_default()
            .push(index);
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn served(&self, code: &str, origin: &str) -> Option<&DepartureProcedure> {
        self.by_code
            .get(code)
            .filter(|procedure| serves(&procedure.served_airports, origin))
    }

    /// The procedure a route token refers to, tolerating outdated version
    /// numbers and `#` placeholders. It has to serve `origin`.
    pub fn lookup(&self, token: &str, origin: &str) -> Option<&DepartureProcedure> {
        let by_root = |root: &str| {
            self.by_root
                .get(root)
                .and_then(|code| self.served(code, origin))
        };

        self.served(token, origin)
            .or_else(|| {
                let (left, right) = token.split_once('.')?;
                let root = root_letters(left);
                if root.is_empty() {
                    return None;
                }
                self.by_pattern
                    .get(&format!("{root}#.{right}"))
                    .and_then(|(code, _)| self.served(code, origin))
                    .or_else(|| by_root(&root))
            })
            .or_else(|| {
                self.by_left
                    .get(token)
                    .and_then(|code| self.served(code, origin))
            })
            .or_else(|| {
                token
                    .contains(|c: char| c.is_ascii_digit() || c == '#')
                    .then(|| by_root(&root_letters(token)))
                    .flatten()
            })
    }

    fn longest_sequence<'a>(
        &'a self,
        indices: impl DoubleEndedIterator<Item = &'a usize>,
        origin: &str,
    ) -> Option<Vec<String>> {
        indices
            .filter_map(|index| self.routes.get(*index))
            .filter(|route| route.origins.is_empty() || serves(&route.origins, origin))
            // first of equally long routes wins
            .rev()
            .max_by_key(|route| route.route_points.len())
            .map(|route| {
                std::iter::once(origin.to_string())
                    .chain(route.route_points.iter().cloned())
                    .collect()
            })
    }

    fn transition_sequence(&self, transition: &str, origin: &str) -> Option<Vec<String>> {
        self.longest_sequence(self.routes_by_transition.get(transition)?.iter(), origin)
    }

    fn procedure_sequence(&self, code: &str, origin: &str) -> Option<Vec<String>> {
        self.longest_sequence(self.routes_by_code.get(code)?.iter(), origin)
    }

    /// Fixes replacing `token`, starting at the origin, and whether the
    /// following token was used as the transition.
    fn sequence_for(
        &self,
        token: &str,
        next: Option<&RouteToken>,
        origin: &str,
    ) -> Option<(Vec<String>, bool)> {
        if !token.contains(|c: char| c.is_ascii_digit() || c == '#') {
            return None;
        }
        let procedure = self.lookup(token, origin)?;
        trace!("{token} is departure procedure {}", procedure.code);

        let left = procedure
            .code
            .split_once('.')
            .map_or_else(|| token.split('.').next().unwrap_or(token), |(left, _)| left);
        let (transition, uses_next) = match token.split_once('.') {
            Some((_, right)) => (Some(format!("{left}.{right}")), false),
            None => match next.filter(|next| TRANSITION_FIX_RE.is_match(&next.text)) {
                Some(next) => (Some(format!("{left}.{}", next.text)), true),
                None => (None, false),
            },
        };

        transition
            .and_then(|transition| self.transition_sequence(&transition, origin))
            .map(|sequence| (sequence, uses_next))
            .or_else(|| {
                self.procedure_sequence(&procedure.code, origin)
                    .map(|sequence| (sequence, false))
            })
    }

    /// Replaces departure procedure tokens by their route, each inserted fix
    /// inheriting the procedure token's mandatory state.
    pub fn expand(
        &self,
        tokens: &[RouteToken],
        is_facility: impl Fn(&str) -> bool,
    ) -> Vec<RouteToken> {
        if self.is_empty() {
            return tokens.to_vec();
        }
        let Some(origin) = route_origin(tokens, &is_facility) else {
            return tokens.to_vec();
        };

        let mut expanded: Vec<RouteToken> = Vec::with_capacity(tokens.len());
        let mut skip_next = false;
        for (i, token) in tokens.iter().enumerate() {
            if skip_next {
                skip_next = false;
                continue;
            }

            match self.sequence_for(&token.text, tokens.get(i + 1), origin) {
                Some((sequence, uses_next)) => {
                    debug!("expanded {} to {}", token.text, sequence.join(" "));
                    skip_next = uses_next;
                    let repeated_origin = expanded
                        .last()
                        .is_some_and(|previous| sequence.first() == Some(&previous.text));
                    expanded.extend(
                        sequence
                            .into_iter()
                            .skip(usize::from(repeated_origin))
                            .map(|text| RouteToken::new(text, token.mandatory)),
                    );
                }
                None => expanded.push(token.clone()),
            }
        }
        expanded
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ArrivalRoute {
    pub star_code: String,
    pub arrival_name: String,
    pub eff_date: u64,
    pub dest_group: String,
    pub transition_code: String,
    pub route_points: Vec<String>,
}

impl ArrivalRoute {
    /// An empty destination group serves every destination.
    fn serves(&self, destination: &str) -> bool {
        let airports = group_airports(&self.dest_group);
        airports.is_empty() || airports.iter().any(|airport| airport == destination)
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ArrivalProcedures {
    routes: Vec<ArrivalRoute>,
    by_transition: HashMap<String, Vec<usize>>,
    by_code: HashMap<String, Vec<usize>>,
}

pub fn parse_star_csv(content: &[u8]) -> Result<ArrivalProcedures, ProcedureError> {
    let rows = parse_csv(content)?;
    let Some((header, rows)) = rows.split_first() else {
        return Ok(ArrivalProcedures::default());
    };
    let header = Header::new(header);

    let code = required(&header, "STAR_COMPUTER_CODE")?;
    let transition = required(&header, "TRANSITION_COMPUTER_CODE")?;
    let dest_group = required(&header, "DEST_GROUP")?;
    let points = required(&header, "ROUTE_POINTS")?;
    let eff_date = header.position(&["EFF_DATE"]);
    let name = header.position(&["ARRIVAL_NAME"]);

    let parse_row = |row: &Row| {
        let transition_code = field(row, Some(transition)).to_uppercase();
        let route_points = split_points(field(row, Some(points)));
        (!transition_code.is_empty() && !route_points.is_empty()).then(|| ArrivalRoute {
            star_code: field(row, Some(code)).to_uppercase(),
            arrival_name: field(row, name).to_uppercase(),
            eff_date: parse_eff_date(field(row, eff_date)),
            dest_group: field(row, Some(dest_group)).to_uppercase(),
            transition_code,
            route_points,
        })
    };

    Ok(ArrivalProcedures::new(
        rows.iter().filter_map(parse_row).collect(),
    ))
}

impl ArrivalProcedures {
    pub fn new(routes: Vec<ArrivalRoute>) -> Self {
        let mut by_transition: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_code: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, route) in routes.iter().enumerate() {
            by_transition
                .entry(route.transition_code.clone())
                .or_default()
                .push(index);
            if !route.star_code.is_empty() {
                by_code
                    .entry(route.star_code.clone())
                    .or_default()
                    .push(index);
            }
        }

        Self {
            routes,
            by_transition,
            by_code,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Latest effective route for a transition or STAR code, preferring
    /// routes serving `destination`.
    pub fn lookup(&self, token: &str, destination: Option<&str>) -> Option<&ArrivalRoute> {
        let candidates: Vec<_> = self
            .by_transition
            .get(token)
            .into_iter()
            .chain(self.by_code.get(token))
            .flatten()
            .filter_map(|index| self.routes.get(*index))
            .collect();

        let serving: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|route| destination.is_none_or(|destination| route.serves(destination)))
            .collect();

        let chosen = if serving.is_empty() {
            candidates
        } else {
            serving
        };
        chosen.into_iter().max_by_key(|route| route.eff_date)
    }

    /// Replaces arrival procedure tokens by their fixes. The destination is
    /// the last token of the route.
    pub fn expand(&self, tokens: &[RouteToken]) -> Vec<RouteToken> {
        if self.is_empty() {
            return tokens.to_vec();
        }
        let destination = tokens.last().map(|token| token.text.as_str());

        tokens
            .iter()
            .flat_map(|token| match self.lookup(&token.text, destination) {
                Some(route) => {
                    debug!("expanded {} to {}", token.text, route.route_points.join(" "));
                    route
                        .route_points
                        .iter()
                        .map(|point| RouteToken::new(point.clone(), token.mandatory))
                        .collect()
                }
                None => vec![token.clone()],
            })
            .collect()
    }
}
