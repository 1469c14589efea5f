//! Token level rules shared by the expanders and the route builder: mandatory
//! markers and the classification of a single route token.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{coordinate::parse_coordinate, points::FACILITY_ALIAS_PREFIX};

pub const MANDATORY_OPEN: char = '>';
pub const MANDATORY_CLOSE: char = '<';
pub const PLAYBOOK_PREFIX: &str = "PB.";

static PROCEDURE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3,6}\d$").unwrap());
static SHORTHAND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}\d$").unwrap());

pub fn strip_markers(token: &str) -> String {
    token.replace([MANDATORY_OPEN, MANDATORY_CLOSE], "")
}

/// `>BODY<`, returning `BODY`
pub fn strip_wrapper(body: &str) -> Option<&str> {
    body.strip_prefix(MANDATORY_OPEN)
        .and_then(|inner| inner.strip_suffix(MANDATORY_CLOSE))
        .map(str::trim)
}

pub fn wrap_mandatory(body: &str) -> String {
    if strip_wrapper(body).is_some() {
        body.to_string()
    } else {
        format!("{MANDATORY_OPEN}{body}{MANDATORY_CLOSE}")
    }
}

/// DP/STAR designator shape: 3-6 letters and a version digit
pub fn is_procedure_shaped(token: &str) -> bool {
    PROCEDURE_RE.is_match(token)
}

/// Shorthand like `BIGGY5` that names a procedure after its first fix
pub fn is_procedure_shorthand(token: &str) -> bool {
    SHORTHAND_RE.is_match(token)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TokenClass {
    PlaybookDirective,
    /// `ZZ_` prefixed pseudo-fix
    FacilityAlias,
    /// ARTCC/FIR/TRACON code
    Facility,
    Coordinate,
    Airport,
    Procedure,
    Fix,
}

impl TokenClass {
    /// Classifies an upper-case token, marker-free. `is_facility` tells
    /// whether a code names a known facility.
    pub fn of(token: &str, is_facility: impl Fn(&str) -> bool) -> Self {
        if token.starts_with(PLAYBOOK_PREFIX) {
            TokenClass::PlaybookDirective
        } else if token.starts_with(FACILITY_ALIAS_PREFIX) {
            TokenClass::FacilityAlias
        } else if is_facility(token) {
            TokenClass::Facility
        } else if parse_coordinate(token).is_some() {
            TokenClass::Coordinate
        } else if token.len() == 4 {
            TokenClass::Airport
        } else if is_procedure_shaped(token) {
            TokenClass::Procedure
        } else {
            TokenClass::Fix
        }
    }

    /// Route endpoint placeholders that get fanned to the route body
    pub fn is_airport(self) -> bool {
        matches!(
            self,
            TokenClass::FacilityAlias | TokenClass::Facility | TokenClass::Airport
        )
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RouteToken {
    pub text: String,
    pub mandatory: bool,
}

impl RouteToken {
    pub fn new(text: impl Into<String>, mandatory: bool) -> Self {
        Self {
            text: text.into(),
            mandatory,
        }
    }
}

/// Splits a route body on whitespace, strips the markers and tracks whether
/// each token lies in a `>` ... `<` span. A token carrying both markers is
/// mandatory on its own and leaves the span state as it was.
pub fn tokenize(body: &str) -> Vec<RouteToken> {
    body.split_whitespace()
        .scan(false, |inside, raw| {
            let mandatory = match (raw.contains(MANDATORY_OPEN), raw.contains(MANDATORY_CLOSE)) {
                (true, true) => true,
                (true, false) => {
                    *inside = true;
                    true
                }
                (false, true) => {
                    *inside = false;
                    true
                }
                (false, false) => *inside,
            };
            let text = strip_markers(raw).to_uppercase();
            Some((!text.is_empty()).then(|| RouteToken::new(text, mandatory)))
        })
        .flatten()
        .collect()
}

/// Procedures never sit inside a mandatory span: a `>` on a procedure moves
/// to the token after it, a `<` to the token before it.
pub fn correct_procedure_markers(body: &str) -> String {
    let mut tokens: Vec<String> = body.split_whitespace().map(ToString::to_string).collect();

    for i in 0..tokens.len() {
        if !is_procedure_shaped(&strip_markers(&tokens[i]).to_uppercase()) {
            continue;
        }
        if tokens[i].contains(MANDATORY_OPEN) && i + 1 < tokens.len() {
            tokens[i] = tokens[i].replace(MANDATORY_OPEN, "");
            tokens[i + 1].insert(0, MANDATORY_OPEN);
        }
        if tokens[i].contains(MANDATORY_CLOSE) && i > 0 {
            tokens[i] = tokens[i].replace(MANDATORY_CLOSE, "");
            tokens[i - 1].push(MANDATORY_CLOSE);
        }
    }

    tokens.into_iter().join(" ")
}
