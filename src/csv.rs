use std::io;

use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use thiserror::Error;

use super::read_to_string;

#[derive(Parser)]
#[grammar = "pest/csv.pest"]
pub struct CsvParser;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("failed to parse csv table: {0}")]
    Parse(#[from] pest::error::Error<Rule>),
    #[error("failed to read csv table: {0}")]
    FileRead(#[from] io::Error),
}

pub type Row = Vec<String>;

fn parse_field(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|value| match value.as_rule() {
            Rule::quoted_inner => value.as_str().replace("\"\"", "\""),
            _ => value.as_str().to_string(),
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn parse_row(pair: Pair<Rule>) -> Row {
    pair.into_inner().map(parse_field).collect()
}

/// Splits csv content into rows of trimmed fields, dropping rows without any content.
pub fn parse_csv(content: &[u8]) -> Result<Vec<Row>, CsvError> {
    let unparsed_file = read_to_string(content)?;

    Ok(CsvParser::parse(Rule::file, &unparsed_file)?
        .flat_map(Pair::into_inner)
        .filter(|pair| matches!(pair.as_rule(), Rule::row))
        .map(parse_row)
        .filter(|row| row.iter().any(|field| !field.is_empty()))
        .collect())
}

/// Lower-cased column names of a headered table.
#[derive(Clone, Debug)]
pub(crate) struct Header(Vec<String>);

impl Header {
    pub(crate) fn new(row: &[String]) -> Self {
        Self(
            row.iter()
                .map(|column| column.replace('"', "").trim().to_lowercase())
                .collect(),
        )
    }

    /// first alias present in the header wins
    pub(crate) fn position(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            let alias = alias.to_lowercase();
            self.0.iter().position(|column| *column == alias)
        })
    }
}

pub(crate) fn field(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|index| row.get(index))
        .map_or("", |value| value.trim())
}

/// Upper-cased list entries separated by whitespace or commas.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|entry| !entry.is_empty())
        .map(str::to_uppercase)
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{parse_csv, split_list, Header};

    #[test]
    fn test_quoted_fields() {
        let csv = b"Play,Route String,Origins\r
ABI,\"KBWI >LDN J6 HVQ< KSLC\",\"KBWI KDCA\"\r
\"SAY \"\"HI\"\"\",\"A\nB\",\r
,,\r
";

        let rows = parse_csv(csv).unwrap();

        assert_eq_sorted!(
            rows,
            vec![
                vec![
                    "Play".to_string(),
                    "Route String".to_string(),
                    "Origins".to_string()
                ],
                vec![
                    "ABI".to_string(),
                    "KBWI >LDN J6 HVQ< KSLC".to_string(),
                    "KBWI KDCA".to_string()
                ],
                vec!["SAY \"HI\"".to_string(), "A\nB".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_missing_trailing_newline() {
        let rows = parse_csv(b"MERIT,40.0,-74.0\nMERIT,41.0,-70.0").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["MERIT", "41.0", "-70.0"]);
    }

    #[test]
    fn test_header_aliases() {
        let header = Header::new(&[
            "\"PLAY\"".to_string(),
            "full_route".to_string(),
            "Origin_TRACONs".to_string(),
        ]);

        assert_eq!(header.position(&["play_name", "play"]), Some(0));
        assert_eq!(header.position(&["route string", "full_route"]), Some(1));
        assert_eq!(header.position(&["origin_tracons", "origin_tracon"]), Some(2));
        assert_eq!(header.position(&["dest_artccs"]), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" kbwi, KDCA  n90 "), vec!["KBWI", "KDCA", "N90"]);
        assert!(split_list("").is_empty());
    }
}
