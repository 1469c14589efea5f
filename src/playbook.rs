use bevy_derive::Deref;
use itertools::Itertools;
use multimap::MultiMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    csv::{field, parse_csv, split_list, CsvError, Header},
    token::{MANDATORY_CLOSE, MANDATORY_OPEN},
};

const PLAY_COLUMNS: &[&str] = &["play_name", "play"];
const ROUTE_COLUMNS: &[&str] = &["full_route", "route string", "route", "route_string"];
const ORIGIN_AIRPORT_COLUMNS: &[&str] = &["origins", "origin", "origin_airports", "origin_bases"];
const ORIGIN_TRACON_COLUMNS: &[&str] = &["origin_tracons", "origin_tracon"];
const ORIGIN_ARTCC_COLUMNS: &[&str] = &["origin_artccs", "origin_artcc"];
const DEST_AIRPORT_COLUMNS: &[&str] = &["destinations", "dest", "dest_airports", "dest_bases"];
const DEST_TRACON_COLUMNS: &[&str] = &["dest_tracons", "dest_tracon"];
const DEST_ARTCC_COLUMNS: &[&str] = &["dest_artccs", "dest_artcc"];

#[derive(Error, Debug)]
pub enum PlaybookError {
    #[error("failed to parse playbook routes: {0}")]
    Csv(#[from] CsvError),
    #[error("playbook routes are missing a {0} column")]
    MissingColumn(&'static str),
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct PlaybookRoute {
    pub play_name: String,
    pub play_name_normalized: String,
    pub full_route: String,
    pub origin_airports: Vec<String>,
    pub origin_tracons: Vec<String>,
    pub origin_artccs: Vec<String>,
    pub dest_airports: Vec<String>,
    pub dest_tracons: Vec<String>,
    pub dest_artccs: Vec<String>,
}

/// Playbook routes grouped by normalized play name, in table order.
#[derive(Clone, Debug, Default, Deref, Serialize)]
pub struct Playbook(MultiMap<String, PlaybookRoute>);

pub fn normalize_play_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_uppercase()
}

/// Airport spelling of a filter token: three-letter codes outside the `Z`
/// range are domestic IATA codes and get the `K` prefix.
pub(crate) fn airport_code(token: &str) -> String {
    if token.len() == 3
        && token.chars().all(|c| c.is_ascii_alphabetic())
        && !token.starts_with('Z')
    {
        format!("K{token}")
    } else {
        token.to_string()
    }
}

pub fn parse_playbook_csv(content: &[u8]) -> Result<Playbook, PlaybookError> {
    let rows = parse_csv(content)?;
    let Some((header, rows)) = rows.split_first() else {
        return Ok(Playbook::default());
    };
    let header = Header::new(header);

    let play = header
        .position(PLAY_COLUMNS)
        .ok_or(PlaybookError::MissingColumn("Play"))?;
    let route = header
        .position(ROUTE_COLUMNS)
        .ok_or(PlaybookError::MissingColumn("Route String"))?;
    let origin_airports = header.position(ORIGIN_AIRPORT_COLUMNS);
    let origin_tracons = header.position(ORIGIN_TRACON_COLUMNS);
    let origin_artccs = header.position(ORIGIN_ARTCC_COLUMNS);
    let dest_airports = header.position(DEST_AIRPORT_COLUMNS);
    let dest_tracons = header.position(DEST_TRACON_COLUMNS);
    let dest_artccs = header.position(DEST_ARTCC_COLUMNS);

    Ok(Playbook(
        rows.iter()
            .filter_map(|row| {
                let play_name = field(row, Some(play));
                let full_route = field(row, Some(route));
                if play_name.is_empty()
                    || full_route.is_empty()
                    || play_name.eq_ignore_ascii_case("nan")
                {
                    return None;
                }

                let route = PlaybookRoute {
                    play_name: play_name.to_string(),
                    play_name_normalized: normalize_play_name(play_name),
                    full_route: full_route.to_uppercase(),
                    origin_airports: split_list(field(row, origin_airports)),
                    origin_tracons: split_list(field(row, origin_tracons)),
                    origin_artccs: split_list(field(row, origin_artccs)),
                    dest_airports: split_list(field(row, dest_airports)),
                    dest_tracons: split_list(field(row, dest_tracons)),
                    dest_artccs: split_list(field(row, dest_artccs)),
                };
                Some((route.play_name_normalized.clone(), route))
            })
            .collect(),
    ))
}

/// `PLAY[.ORIGINS[.DESTINATIONS]]`, the part after `PB.`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PlaybookDirective {
    pub play: String,
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
}

impl PlaybookDirective {
    pub fn parse(body: &str) -> Option<Self> {
        let mut parts = body.split('.');
        let play = normalize_play_name(parts.next()?);
        if play.is_empty() {
            return None;
        }

        Some(Self {
            play,
            origins: parts.next().map(split_list).unwrap_or_default(),
            destinations: parts.next().map(split_list).unwrap_or_default(),
        })
    }
}

fn matches_filter(
    filter: &[String],
    airports: &[String],
    tracons: &[String],
    artccs: &[String],
) -> bool {
    filter.iter().all(|token| {
        airports.contains(&airport_code(token))
            || tracons.contains(token)
            || artccs.contains(token)
    })
}

impl PlaybookRoute {
    pub fn matches(&self, directive: &PlaybookDirective) -> bool {
        matches_filter(
            &directive.origins,
            &self.origin_airports,
            &self.origin_tracons,
            &self.origin_artccs,
        ) && matches_filter(
            &directive.destinations,
            &self.dest_airports,
            &self.dest_tracons,
            &self.dest_artccs,
        )
    }

    /// Route text with the mandatory span around everything but the
    /// endpoints and an optional `;COLOR` suffix.
    pub fn route_line(&self, mandatory: bool, color: Option<&str>) -> String {
        let mut route = if mandatory {
            let mut tokens: Vec<_> = self
                .full_route
                .split_whitespace()
                .map(ToString::to_string)
                .collect();
            if tokens.len() > 2 {
                let last_interior = tokens.len() - 2;
                tokens[1].insert(0, MANDATORY_OPEN);
                tokens[last_interior].push(MANDATORY_CLOSE);
                tokens.join(" ")
            } else {
                format!("{MANDATORY_OPEN}{}{MANDATORY_CLOSE}", tokens.join(" "))
            }
        } else {
            self.full_route.split_whitespace().join(" ")
        };

        if let Some(color) = color {
            route.push(';');
            route.push_str(color);
        }
        route
    }
}

impl Playbook {
    pub fn from_routes(routes: impl IntoIterator<Item = PlaybookRoute>) -> Self {
        Self(
            routes
                .into_iter()
                .map(|route| (route.play_name_normalized.clone(), route))
                .collect(),
        )
    }

    pub fn routes<'a>(
        &'a self,
        directive: &'a PlaybookDirective,
    ) -> impl Iterator<Item = &'a PlaybookRoute> {
        self.get_vec(&directive.play)
            .into_iter()
            .flatten()
            .filter(|route| route.matches(directive))
    }

    /// Route lines of every play route passing the directive's filters.
    pub fn expand(
        &self,
        directive: &PlaybookDirective,
        mandatory: bool,
        color: Option<&str>,
    ) -> Vec<String> {
        if !self.contains_key(&directive.play) {
            warn!("unknown play {}", directive.play);
            return vec![];
        }

        let routes: Vec<_> = self
            .routes(directive)
            .map(|route| route.route_line(mandatory, color))
            .collect();
        debug!("play {} expanded to {} routes", directive.play, routes.len());
        routes
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{normalize_play_name, parse_playbook_csv, Playbook, PlaybookDirective, PlaybookError};

    const PLAYBOOK: &[u8] = b"Play,Route String,Origins,Origin_TRACONs,Origin_ARTCCs,Destinations,Dest_TRACONs,Dest_ARTCCs
ABI,KBWI LDN J6 HVQ KSLC,KBWI,PCT,ZDC,KSLC,S56,ZLC
ABI,KJFK MERIT J60 KLAX,\"KJFK, KLGA\",N90,ZNY,KLAX,SCT,ZLA
ABI,KSFO,KSFO,NCT,ZOA,,,
nan,KJFK KBOS,,,,,,
CAN-AM 1,KBOS BRUWN KDTW,KBOS,A90,ZBW,KDTW,D21,ZOB
";

    fn playbook() -> Playbook {
        parse_playbook_csv(PLAYBOOK).unwrap()
    }

    fn directive(body: &str) -> PlaybookDirective {
        PlaybookDirective::parse(body).unwrap()
    }

    #[test]
    fn test_parse_playbook() {
        let playbook = playbook();

        assert_eq!(playbook.get_vec("ABI").map(Vec::len), Some(3));
        assert!(playbook.get("NAN").is_none());
        let canam = playbook.get("CANAM1").unwrap();
        assert_eq!(canam.play_name, "CAN-AM 1");
        assert_eq!(canam.origin_tracons, vec!["A90"]);
        assert_eq_sorted!(
            playbook.get_vec("ABI").unwrap()[1].origin_airports,
            vec!["KJFK".to_string(), "KLGA".to_string()]
        );
    }

    #[test]
    fn test_missing_columns() {
        assert!(matches!(
            parse_playbook_csv(b"Name,Route\nABI,KJFK KBOS\n"),
            Err(PlaybookError::MissingColumn("Play"))
        ));
        assert!(parse_playbook_csv(b"").unwrap().is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_play_name("Can-Am_1 north"), "CANAM1NORTH");
        assert_eq!(
            directive("can am 1.bos"),
            PlaybookDirective {
                play: "CANAM1".to_string(),
                origins: vec!["BOS".to_string()],
                destinations: vec![],
            }
        );
        assert_eq!(PlaybookDirective::parse(".KJFK"), None);
    }

    #[test]
    fn test_filters() {
        let playbook = playbook();

        assert_eq!(playbook.expand(&directive("ABI"), false, None).len(), 3);
        assert_eq!(
            playbook.expand(&directive("ABI.BWI"), false, None),
            vec!["KBWI LDN J6 HVQ KSLC"]
        );
        assert_eq!(
            playbook.expand(&directive("ABI.N90"), false, None),
            vec!["KJFK MERIT J60 KLAX"]
        );
        assert_eq!(
            playbook.expand(&directive("ABI..ZLC"), false, None),
            vec!["KBWI LDN J6 HVQ KSLC"]
        );
        assert_eq!(
            playbook.expand(&directive("ABI.ZNY.KLAX"), false, None),
            vec!["KJFK MERIT J60 KLAX"]
        );
        // every filter token has to match
        assert!(playbook.expand(&directive("ABI.KJFK KBWI"), false, None).is_empty());
        assert!(playbook.expand(&directive("NOPE"), false, None).is_empty());
    }

    #[test]
    fn test_mandatory_and_color() {
        let playbook = playbook();

        assert_eq!(
            playbook.expand(&directive("ABI.KBWI"), true, Some("RED")),
            vec!["KBWI >LDN J6 HVQ< KSLC;RED"]
        );
        assert_eq!(
            playbook.expand(&directive("ABI.NCT"), true, None),
            vec![">KSFO<"]
        );
    }
}
