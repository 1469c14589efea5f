//! Route sections of VATCSCC reroute advisories.
//!
//! Three layouts are understood below the `ROUTES:` line:
//!
//! ```text
//! FROM:                                  ORIG   DEST   ROUTE
//! ORIG     ROUTE - ORIGIN SEGMENTS       JFK    ORD    >MERIT J60 PSB<
//! JFK LGA  >MERIT J60 PSB<                      MDW    >MERIT J60 DJB<
//! TO:
//! DEST     ROUTE - DESTINATION SEGMENTS
//! ORD      PSB J146 GIJ
//! ```
//!
//! and the `ORIG ... ROUTE SEGMENTS` / `DEST ... ROUTE SEGMENTS` pair of
//! blocks, whose columns are separated by at least two spaces. A route line
//! is produced for every origin and destination combination.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::{playbook::airport_code, token::strip_markers};

pub const ADVISORY_MARKER: &str = "VATCSCC ADVZY";
const TMI_ID: &str = "TMI ID";
const SEPARATOR: &str = "----";
const ROUTE_SEGMENTS: &str = "ROUTE SEGMENTS";

static COLUMN_GAP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static ENDPOINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{3,4}$").unwrap());

pub fn is_advisory(text: &str) -> bool {
    text.to_uppercase().contains(ADVISORY_MARKER)
}

/// Upper-cased advisory blocks, each starting at its `VATCSCC ADVZY` line.
pub fn split_advisories(text: &str) -> Vec<String> {
    let upper = text.to_uppercase();
    let starts: Vec<usize> = upper.match_indices(ADVISORY_MARKER).map(|(i, _)| i).collect();
    if starts.is_empty() {
        return vec![upper];
    }

    starts
        .iter()
        .zip(starts.iter().skip(1).copied().chain([upper.len()]))
        .map(|(&start, end)| upper[start..end].trim().to_string())
        .filter(|block| !block.is_empty())
        .collect()
}

/// Route lines of every advisory in `text`.
pub fn parse_advisories(text: &str) -> Vec<String> {
    split_advisories(text)
        .iter()
        .flat_map(|block| parse_advisory_routes(block))
        .collect()
}

/// Route lines of a single advisory block.
pub fn parse_advisory_routes(block: &str) -> Vec<String> {
    let lines: Vec<String> = block.lines().map(str::to_uppercase).collect();
    let Some(routes) = lines
        .iter()
        .position(|line| line.contains("ROUTES:") || line.contains("ROUTE:"))
    else {
        debug!("advisory without a route section");
        return vec![];
    };
    let lines: Vec<&str> = lines[routes + 1..].iter().map(String::as_str).collect();

    let routes = if lines.iter().any(|line| line.trim().starts_with("FROM:")) {
        parse_from_to(&lines)
    } else {
        let table = parse_route_table(&lines);
        if table.is_empty() && lines.iter().any(|line| line.contains(ROUTE_SEGMENTS)) {
            parse_route_segments(&lines)
        } else {
            table
        }
    };
    debug!("advisory with {} routes", routes.len());
    routes
}

fn is_endpoint(token: &str) -> bool {
    ENDPOINT_RE.is_match(token) && !(token.len() == 3 && token.starts_with('Z'))
}

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(ToString::to_string).collect()
}

/// Origin segment followed by the destination segment, the shared junction
/// fix only once.
fn join_segments(origin: &[String], destination: &[String]) -> Vec<String> {
    let shared = origin
        .last()
        .zip(destination.first())
        .is_some_and(|(last, first)| strip_markers(last) == strip_markers(first));

    origin
        .iter()
        .chain(destination.iter().skip(usize::from(shared)))
        .cloned()
        .collect()
}

/// Every origin × destination route, endpoints around the route tokens.
fn route_combinations(
    origins: &[String],
    destinations: &[String],
    route: &[String],
) -> Vec<String> {
    let origins: Vec<Option<&String>> = if origins.is_empty() {
        vec![None]
    } else {
        origins.iter().map(Some).collect()
    };
    let destinations: Vec<Option<&String>> = if destinations.is_empty() {
        vec![None]
    } else {
        destinations.iter().map(Some).collect()
    };

    origins
        .iter()
        .cartesian_product(destinations.iter())
        .map(|(&origin, &destination)| origin.into_iter().chain(route).chain(destination).join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Segment text without a trailing `;COLOR`
fn without_color(segment: &str) -> &str {
    segment.split(';').next().unwrap_or_default().trim()
}

fn skipped(line: &str, header: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with(header) || line.starts_with(SEPARATOR)
}

struct Leg {
    endpoints: Vec<String>,
    route: Vec<String>,
}

fn parse_from_to(lines: &[&str]) -> Vec<String> {
    let from = lines.iter().position(|line| line.trim().starts_with("FROM:"));
    let to = lines.iter().position(|line| line.trim().starts_with("TO:"));
    let (Some(from), Some(to)) = (from, to) else {
        return vec![];
    };
    if to <= from {
        return vec![];
    }

    let origins: Vec<Leg> = lines[from + 1..to]
        .iter()
        .filter(|line| !skipped(line, "ORIG"))
        .filter_map(|line| {
            let (prefix, segment) = line.split_at(line.find('>')?);
            let segment = without_color(segment);
            (!segment.is_empty()).then(|| Leg {
                endpoints: prefix
                    .split_whitespace()
                    .filter(|token| is_endpoint(token))
                    .map(airport_code)
                    .collect(),
                route: tokens(segment),
            })
        })
        .collect();

    let destinations: Vec<Leg> = lines[to + 1..]
        .iter()
        .take_while(|line| !line.trim().starts_with(TMI_ID))
        .filter(|line| !skipped(line, "DEST"))
        .filter_map(|line| {
            let (destination, segment) = line.trim().split_once(char::is_whitespace)?;
            let segment = without_color(segment);
            (is_endpoint(destination) && !segment.is_empty()).then(|| Leg {
                endpoints: vec![airport_code(destination)],
                route: tokens(segment),
            })
        })
        .collect();

    origins
        .iter()
        .cartesian_product(destinations.iter())
        .map(|(origin, destination)| {
            origin
                .endpoints
                .iter()
                .chain(&join_segments(&origin.route, &destination.route))
                .chain(&destination.endpoints)
                .join(" ")
        })
        .collect()
}

fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start.min(end)..end).unwrap_or_default()
}

fn endpoints(field: &str) -> Vec<String> {
    field.split_whitespace().map(airport_code).collect()
}

/// `ORIG DEST ROUTE` table, either single-spaced or column aligned. An empty
/// ORIG column in an aligned table repeats the previous row's origins.
fn parse_route_table(lines: &[&str]) -> Vec<String> {
    let Some(header_index) = lines.iter().position(|line| {
        let line = line.trim();
        line.starts_with("ORIG") && line.contains("DEST") && line.contains("ROUTE")
    }) else {
        return vec![];
    };
    let header = lines[header_index].trim_end();
    let rows = lines[header_index + 1..]
        .iter()
        .take_while(|line| !line.trim().starts_with(TMI_ID))
        .filter(|line| !line.trim().is_empty() && !line.trim().starts_with(SEPARATOR));

    if !COLUMN_GAP_RE.is_match(header) {
        trace!("single-spaced route table");
        return rows
            .filter_map(|line| match tokens(line).as_slice() {
                [origin, destination, route @ ..] if !route.is_empty() => Some(route_combinations(
                    &endpoints(origin),
                    &endpoints(destination),
                    route,
                )),
                _ => None,
            })
            .flatten()
            .collect();
    }

    let (Some(dest_column), Some(route_column)) = (header.find("DEST"), header.find("ROUTE")) else {
        return vec![];
    };
    trace!("aligned route table, DEST at {dest_column}, ROUTE at {route_column}");

    let mut current_origins: Vec<String> = vec![];
    let mut routes = vec![];
    for line in rows {
        let route = tokens(column(line, route_column, line.len()));
        if route.is_empty() {
            continue;
        }
        let origins = endpoints(column(line, 0, dest_column));
        let origins = if origins.is_empty() {
            current_origins.clone()
        } else {
            current_origins.clone_from(&origins);
            origins
        };
        let destinations = endpoints(column(line, dest_column, route_column));
        if origins.is_empty() && destinations.is_empty() {
            continue;
        }
        routes.extend(route_combinations(&origins, &destinations, &route));
    }
    routes
}

fn segment_legs(lines: &[&str]) -> Vec<Leg> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty() && !line.trim().starts_with(SEPARATOR))
        .filter_map(|line| {
            let mut columns = COLUMN_GAP_RE.split(line.trim_end());
            let endpoints = endpoints(columns.next()?);
            let route = tokens(columns.next()?);
            (!route.is_empty()).then_some(Leg { endpoints, route })
        })
        .collect()
}

/// `ORIG ... ROUTE SEGMENTS` and `DEST ... ROUTE SEGMENTS` blocks.
fn parse_route_segments(lines: &[&str]) -> Vec<String> {
    let Some(orig_header) = lines
        .iter()
        .position(|line| line.trim().starts_with("ORIG") && line.contains(ROUTE_SEGMENTS))
    else {
        return vec![];
    };
    let Some(dest_header) = lines.iter().enumerate().skip(orig_header + 1).find_map(|(i, line)| {
        (line.trim().starts_with("DEST") && line.contains(ROUTE_SEGMENTS)).then_some(i)
    }) else {
        return vec![];
    };

    let origins = segment_legs(&lines[orig_header + 1..dest_header]);
    let destination_lines: Vec<&str> = lines[dest_header + 1..]
        .iter()
        .take_while(|line| !line.trim().starts_with(TMI_ID))
        .copied()
        .collect();
    let destinations = segment_legs(&destination_lines);

    origins
        .iter()
        .cartesian_product(destinations.iter())
        .flat_map(|(origin, destination)| {
            route_combinations(
                &origin.endpoints,
                &destination.endpoints,
                &join_segments(&origin.route, &destination.route),
            )
        })
        .collect()
}
