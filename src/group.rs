//! Free-form route input: bracketed groups carrying a colour and a mandatory
//! flag for the lines below them, playbook directives and advisories.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    advisory::{is_advisory, parse_advisories},
    playbook::{Playbook, PlaybookDirective},
    token::{strip_wrapper, wrap_mandatory, PLAYBOOK_PREFIX},
};

static GROUP_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(>?)\s*\[([^\]]+)\]\s*(<?)\s*(?:;(.+))?$").unwrap());

const LEGACY_MANDATORY: &str = "><";

/// A single route line ready for parsing. `body` carries its markers.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RouteLine {
    pub body: String,
    pub color: Option<String>,
    pub mandatory: bool,
}

impl RouteLine {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            color: None,
            mandatory: false,
        }
    }
}

impl fmt::Display for RouteLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.color {
            Some(color) => write!(f, "{};{color}", self.body),
            None => write!(f, "{}", self.body),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct GroupHeader {
    color: Option<String>,
    mandatory: bool,
}

fn color_of(text: &str) -> Option<String> {
    Some(text.trim().to_uppercase()).filter(|color| !color.is_empty())
}

/// `[NAME]`, `[NAME];COLOR`, `>[NAME]<`, `>[NAME]<;COLOR` or the older
/// `[NAME><;COLOR]`
fn parse_group_header(line: &str) -> Option<GroupHeader> {
    if let Some(inner) = line.strip_prefix('[').and_then(|line| line.strip_suffix(']')) {
        if inner.contains(LEGACY_MANDATORY) || inner.contains(';') {
            return Some(GroupHeader {
                color: inner.split_once(';').and_then(|(_, color)| color_of(color)),
                mandatory: inner.contains(LEGACY_MANDATORY),
            });
        }
    }

    GROUP_HEADER_RE.captures(line).map(|captures| GroupHeader {
        color: captures.get(4).and_then(|color| color_of(color.as_str())),
        mandatory: !captures[1].is_empty() || !captures[3].is_empty(),
    })
}

#[derive(Debug, Default)]
struct Groups {
    current: Option<GroupHeader>,
    lines: Vec<String>,
}

impl Groups {
    /// Applies the current group's colour, unless the line has its own, and
    /// its mandatory wrapper.
    fn push(mut self, line: &str) -> Self {
        if let Some(header) = parse_group_header(line) {
            debug!("route group {header:?}");
            self.current = Some(header);
            return self;
        }

        let (body, color) = match line.split_once(';') {
            Some((body, color)) => (body.trim(), color_of(color)),
            None => (line, None),
        };
        let group = self.current.as_ref();
        let body = if group.is_some_and(|group| group.mandatory) {
            wrap_mandatory(body)
        } else {
            body.to_string()
        };
        let color = color.or_else(|| group.and_then(|group| group.color.clone()));

        self.lines.push(match color {
            Some(color) => format!("{body};{color}"),
            None => body,
        });
        self
    }
}

/// Resolves group headers into per-line modifiers.
pub fn expand_groups(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold(Groups::default(), Groups::push)
        .lines
}

fn route_lines(line: &str, playbook: &Playbook) -> Vec<RouteLine> {
    let (body, color) = match line.split_once(';') {
        Some((body, color)) => (body.trim(), color_of(color)),
        None => (line, None),
    };
    let (entry, mandatory) = match strip_wrapper(body) {
        Some(inner) => (inner, true),
        None => (body, false),
    };
    let entry = entry.to_uppercase();

    if let Some(directive) = entry.strip_prefix(PLAYBOOK_PREFIX) {
        let routes = PlaybookDirective::parse(directive.trim())
            .map(|directive| playbook.expand(&directive, mandatory, None))
            .unwrap_or_default();
        if routes.is_empty() {
            warn!("no playbook routes matched for {entry}");
        }
        return routes
            .into_iter()
            .map(|body| RouteLine {
                body,
                color: color.clone(),
                mandatory,
            })
            .collect();
    }

    vec![RouteLine {
        body: if mandatory { wrap_mandatory(&entry) } else { entry },
        color,
        mandatory,
    }]
}

/// Every route line of a free-form input. Text containing a VATCSCC
/// advisory is read as advisories only, otherwise as grouped route lines
/// with playbook directives expanded.
pub fn collect_route_lines(raw: &str, playbook: &Playbook) -> Vec<RouteLine> {
    if is_advisory(raw) {
        return parse_advisories(raw).into_iter().map(RouteLine::new).collect();
    }

    expand_groups(raw)
        .iter()
        .flat_map(|line| route_lines(line, playbook))
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{collect_route_lines, expand_groups, parse_group_header, GroupHeader, RouteLine};
    use crate::playbook::{Playbook, PlaybookRoute};

    fn playbook() -> Playbook {
        Playbook::from_routes([PlaybookRoute {
            play_name: "ABI".to_string(),
            play_name_normalized: "ABI".to_string(),
            full_route: "KBWI LDN J6 HVQ KSLC".to_string(),
            origin_airports: vec!["KBWI".to_string()],
            ..PlaybookRoute::default()
        }])
    }

    #[test]
    fn test_group_headers() {
        assert_eq!(
            parse_group_header("[EAST]"),
            Some(GroupHeader {
                color: None,
                mandatory: false
            })
        );
        assert_eq!(
            parse_group_header(">[EAST]<;red"),
            Some(GroupHeader {
                color: Some("RED".to_string()),
                mandatory: true
            })
        );
        assert_eq!(
            parse_group_header("[east] ; Blue"),
            Some(GroupHeader {
                color: Some("BLUE".to_string()),
                mandatory: false
            })
        );
        assert_eq!(
            parse_group_header("[EAST><;GREEN]"),
            Some(GroupHeader {
                color: Some("GREEN".to_string()),
                mandatory: true
            })
        );
        assert_eq!(parse_group_header("KJFK MERIT KBOS"), None);
    }

    #[test]
    fn test_expand_groups() {
        let text = "KJFK MERIT KBOS
>[NORTH]<;RED
KJFK GREKI KBOS
KLGA HAARP KBOS;BLUE

[SOUTH]
KJFK WAVEY KMIA
";

        assert_eq_sorted!(
            expand_groups(text),
            vec![
                "KJFK MERIT KBOS".to_string(),
                ">KJFK GREKI KBOS<;RED".to_string(),
                ">KLGA HAARP KBOS<;BLUE".to_string(),
                "KJFK WAVEY KMIA".to_string(),
            ]
        );
    }

    #[test]
    fn test_collect_route_lines() {
        let text = ">[PLAYS]<;YELLOW
PB.ABI.BWI
>kjfk merit kbos<
PB.NOPE";

        assert_eq_sorted!(
            collect_route_lines(text, &playbook()),
            vec![
                RouteLine {
                    body: "KBWI >LDN J6 HVQ< KSLC".to_string(),
                    color: Some("YELLOW".to_string()),
                    mandatory: true,
                },
                RouteLine {
                    body: ">KJFK MERIT KBOS<".to_string(),
                    color: Some("YELLOW".to_string()),
                    mandatory: true,
                },
            ]
        );
    }

    #[test]
    fn test_display() {
        let line = RouteLine {
            body: ">KJFK MERIT KBOS<".to_string(),
            color: Some("RED".to_string()),
            mandatory: true,
        };

        assert_eq!(line.to_string(), ">KJFK MERIT KBOS<;RED");
        assert_eq!(RouteLine::new("KJFK KBOS").to_string(), "KJFK KBOS");
    }

    #[test]
    fn test_advisory_input() {
        let text = "vatcssc notice\nVATCSCC ADVZY 001 DCC 03/15/2024 ROUTE RQD
ROUTES:
ORIG DEST ROUTE
JFK ORD MERIT J60 PSB
TMI ID: RRDCC001";

        assert_eq!(
            collect_route_lines(text, &Playbook::default()),
            vec![RouteLine::new("KJFK MERIT J60 PSB KORD")]
        );
    }
}
