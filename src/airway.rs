use std::collections::HashMap;

use bevy_derive::Deref;
use serde::Serialize;
use tracing::{trace, warn};

use crate::csv::{parse_csv, CsvError};

/// One line of the airway table: designator and its fixes in published order.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AirwayRow {
    pub airway: String,
    pub fixes: Vec<String>,
}

impl AirwayRow {
    pub fn new(airway: &str, fixes: &str) -> Self {
        Self {
            airway: airway.trim().to_uppercase(),
            fixes: fixes.split_whitespace().map(str::to_uppercase).collect(),
        }
    }
}

/// `airway,"FIX FIX FIX"` rows. Unquoted fix lists that were split at commas
/// are joined back together.
pub fn parse_awys_csv(content: &[u8]) -> Result<Vec<AirwayRow>, CsvError> {
    Ok(parse_csv(content)?
        .into_iter()
        .filter_map(|row| match row.as_slice() {
            [airway, fixes @ ..] if !airway.is_empty() && !fixes.is_empty() => {
                Some(AirwayRow::new(airway, &fixes.join(" ")))
            }
            _ => None,
        })
        .filter(|row| !row.fixes.is_empty())
        .collect())
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Airway {
    pub id: String,
    pub fixes: Vec<String>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl Airway {
    pub fn new(id: impl Into<String>, fixes: Vec<String>) -> Self {
        let positions = fixes
            .iter()
            .enumerate()
            .rev()
            .map(|(position, fix)| (fix.clone(), position))
            .collect();
        Self {
            id: id.into(),
            fixes,
            positions,
        }
    }

    /// Index of the first occurrence of `fix`
    pub fn position(&self, fix: &str) -> Option<usize> {
        self.positions.get(fix).copied()
    }

    /// Fixes strictly between `from` and `to` in travel direction. `None` if
    /// either fix is not on the airway or both are adjacent.
    pub fn intermediate_fixes(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let from = self.position(from)?;
        let to = self.position(to)?;
        if from.abs_diff(to) <= 1 {
            return None;
        }

        Some(if from < to {
            self.fixes[from + 1..to].to_vec()
        } else {
            self.fixes[to + 1..from].iter().rev().cloned().collect()
        })
    }
}

/// Where a token of an expanded route comes from.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum TokenSource {
    /// index into the unexpanded tokens
    Original(usize),
    /// spliced in for the airway token at this index
    Airway(usize),
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandedToken {
    pub text: String,
    pub source: TokenSource,
}

#[derive(Clone, Debug, Default, Deref, Serialize)]
pub struct AirwayIndex(HashMap<String, Airway>);

impl AirwayIndex {
    pub fn build(rows: &[AirwayRow]) -> Self {
        Self(rows.iter().fold(HashMap::new(), |mut acc, row| {
            if acc.contains_key(&row.airway) {
                warn!("duplicate airway {}, keeping first definition", row.airway);
            } else {
                acc.insert(
                    row.airway.clone(),
                    Airway::new(row.airway.clone(), row.fixes.clone()),
                );
            }
            acc
        }))
    }

    pub fn expand(&self, tokens: &[String]) -> Vec<String> {
        self.expand_with_sources(tokens)
            .into_iter()
            .map(|token| token.text)
            .collect()
    }

    /// Replaces every interior `FIX AIRWAY FIX` airway token by the fixes in
    /// between. Neighbours are always the unexpanded tokens, so consecutive
    /// airways (`A J1 B J2 C`) both expand.
    pub fn expand_with_sources(&self, tokens: &[String]) -> Vec<ExpandedToken> {
        tokens
            .iter()
            .enumerate()
            .flat_map(|(i, token)| {
                let inserted = (i > 0 && i + 1 < tokens.len())
                    .then(|| self.get(&token.to_uppercase()))
                    .flatten()
                    .and_then(|airway| {
                        let from = tokens[i - 1].to_uppercase();
                        let to = tokens[i + 1].to_uppercase();
                        let fixes = airway.intermediate_fixes(&from, &to);
                        if fixes.is_none() {
                            trace!("keeping {token} literally between {from} and {to}");
                        }
                        fixes
                    });

                match inserted {
                    Some(fixes) => fixes
                        .into_iter()
                        .map(|text| ExpandedToken {
                            text,
                            source: TokenSource::Airway(i),
                        })
                        .collect::<Vec<_>>(),
                    None => vec![ExpandedToken {
                        text: token.clone(),
                        source: TokenSource::Original(i),
                    }],
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{parse_awys_csv, AirwayIndex, AirwayRow, ExpandedToken, TokenSource};

    fn tokens(route: &str) -> Vec<String> {
        route.split_whitespace().map(ToString::to_string).collect()
    }

    fn index() -> AirwayIndex {
        AirwayIndex::build(&[
            AirwayRow::new("J48", "A B C D E"),
            AirwayRow::new("J6", "E F G B H"),
            AirwayRow::new("J48", "X Y Z"),
        ])
    }

    #[test]
    fn test_parse_awys() {
        let rows = parse_awys_csv(b"J48,\"CSN  MOL\tBURNI\"\nq812,LAKES,PONCT,DUNKK\nEMPTY,\n").unwrap();

        assert_eq_sorted!(
            rows,
            vec![
                AirwayRow {
                    airway: "J48".to_string(),
                    fixes: tokens("CSN MOL BURNI"),
                },
                AirwayRow {
                    airway: "Q812".to_string(),
                    fixes: tokens("LAKES PONCT DUNKK"),
                },
            ]
        );
    }

    #[test]
    fn test_expand_forward_and_reverse() {
        let index = index();

        assert_eq!(index.expand(&tokens("A J48 D")), tokens("A B C D"));
        assert_eq!(index.expand(&tokens("D J48 A")), tokens("D C B A"));
        assert_eq!(index.expand(&tokens("A J48 E J6 H")), tokens("A B C D E F G B H"));
    }

    #[test]
    fn test_literal_passthrough() {
        let index = index();

        // adjacent, unknown endpoint, airway at the route edge
        assert_eq!(index.expand(&tokens("A J48 B")), tokens("A J48 B"));
        assert_eq!(index.expand(&tokens("A J48 Q")), tokens("A J48 Q"));
        assert_eq!(index.expand(&tokens("J48 A D")), tokens("J48 A D"));
        // duplicate airway id keeps the first row
        assert_eq!(index.expand(&tokens("X J48 Z")), tokens("X J48 Z"));
    }

    #[test]
    fn test_first_occurrence() {
        let index = index();

        // B appears twice on J6, its first position (3) is used
        assert_eq!(index["J6"].position("B"), Some(3));
        assert_eq!(index.expand(&tokens("E J6 B")), tokens("E F G B"));
    }

    #[test]
    fn test_idempotent() {
        let index = index();
        let expanded = index.expand(&tokens("KJFK A J48 D KBOS"));

        assert_eq!(expanded, tokens("KJFK A B C D KBOS"));
        assert_eq!(index.expand(&expanded), expanded);
    }

    #[test]
    fn test_sources() {
        assert_eq_sorted!(
            index().expand_with_sources(&tokens("A J48 D")),
            vec![
                ExpandedToken {
                    text: "A".to_string(),
                    source: TokenSource::Original(0)
                },
                ExpandedToken {
                    text: "B".to_string(),
                    source: TokenSource::Airway(1)
                },
                ExpandedToken {
                    text: "C".to_string(),
                    source: TokenSource::Airway(1)
                },
                ExpandedToken {
                    text: "D".to_string(),
                    source: TokenSource::Original(2)
                },
            ]
        );
    }
}
