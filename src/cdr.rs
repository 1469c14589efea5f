use std::collections::HashMap;

use bevy_derive::Deref;
use itertools::Itertools;
use serde::Serialize;
use tracing::trace;

use crate::{
    csv::{parse_csv, CsvError},
    token::{strip_markers, MANDATORY_CLOSE, MANDATORY_OPEN},
};

/// Coded departure routes, code -> literal route text.
#[derive(Clone, Debug, Default, Deref, Serialize)]
pub struct CdrMap(HashMap<String, String>);

/// `code,route text` rows; later rows override earlier ones.
pub fn parse_cdrs_csv(content: &[u8]) -> Result<CdrMap, CsvError> {
    Ok(CdrMap(
        parse_csv(content)?
            .into_iter()
            .filter_map(|row| match row.as_slice() {
                [code, route @ ..] => {
                    let code = code.to_uppercase();
                    let route = route.join(",").trim().to_string();
                    (!code.is_empty() && !route.is_empty()).then_some((code, route))
                }
                [] => None,
            })
            .collect(),
    ))
}

impl CdrMap {
    pub fn from_pairs<C: Into<String>, R: Into<String>>(
        pairs: impl IntoIterator<Item = (C, R)>,
    ) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(code, route)| (code.into().to_uppercase(), route.into()))
                .collect(),
        )
    }

    /// Expansion tokens of a single route token, with the token's markers
    /// moved to the first and last expansion token.
    fn expand_token(&self, token: &str) -> Option<Vec<String>> {
        let code = strip_markers(token).to_uppercase();
        let expansion = self.get(&code)?;
        trace!("expanding CDR {code}");

        let mut tokens: Vec<_> = expansion
            .split_whitespace()
            .map(str::to_uppercase)
            .collect();
        if token.contains(MANDATORY_OPEN) {
            if let Some(first) = tokens.first_mut() {
                first.insert(0, MANDATORY_OPEN);
            }
        }
        if token.contains(MANDATORY_CLOSE) {
            if let Some(last) = tokens.last_mut() {
                last.push(MANDATORY_CLOSE);
            }
        }
        Some(tokens)
    }

    /// A body consisting of one CDR code is replaced by its route, otherwise
    /// every token naming a code is substituted in place.
    pub fn expand(&self, body: &str) -> String {
        let tokens: Vec<_> = body.split_whitespace().collect();
        match tokens.as_slice() {
            [code] => self
                .expand_token(code)
                .map_or_else(|| code.to_uppercase(), |expansion| expansion.join(" ")),
            tokens => tokens
                .iter()
                .flat_map(|token| {
                    self.expand_token(token)
                        .unwrap_or_else(|| vec![token.to_uppercase()])
                })
                .join(" "),
        }
    }
}
