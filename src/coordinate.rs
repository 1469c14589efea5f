//! Ad-hoc coordinate waypoints as they appear in oceanic and international
//! route strings.
//!
//! | format          | example        | position             |
//! |-----------------|----------------|----------------------|
//! | NAT slash       | `51/53`        | 51°N 053°W           |
//! | NAT half-degree | `H5250`        | 52°30'N 050°W        |
//! | ICAO slash      | `5230N/05000W` | 52°30'N 050°W        |
//! | ICAO compact    | `7500N13400W`  | 75°N 134°W           |
//! | ARINC 424       | `5275N`, `75N70` | 52°N 075°W, 75°N 170°W |
//!
//! The ARINC letter encodes the quadrant of both axes, see [`ARINC_QUADRANTS`].

use std::fmt::Display;

use geo::{point, Point};
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::Serialize;

static NAT_SLASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2,3})$").unwrap());
static NAT_HALF_DEGREE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^H(\d{2})(\d{2})$").unwrap());
static ICAO_LAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})?([NS])$").unwrap());
static ICAO_LON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2,3})(\d{2})?([EW])$").unwrap());
static ICAO_COMPACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})?([NS])(\d{3})(\d{2})?([EW])$").unwrap());
static ARINC_TRAILING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})([NSEW])$").unwrap());
static ARINC_INFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})([NSEW])(\d{2})$").unwrap());

/// (latitude sign, longitude sign) per ARINC quadrant letter
pub static ARINC_QUADRANTS: phf::Map<&'static str, (f64, f64)> = phf_map! {
    "N" => (1.0, -1.0),
    "E" => (1.0, 1.0),
    "S" => (-1.0, -1.0),
    "W" => (-1.0, 1.0),
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CoordinateFormat {
    NatSlash,
    NatHalfDegree,
    IcaoSlash,
    IcaoCompact,
    ArincFiveChar,
}

impl Display for CoordinateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CoordinateFormat::NatSlash => "NAT slash",
            CoordinateFormat::NatHalfDegree => "NAT half-degree",
            CoordinateFormat::IcaoSlash => "ICAO slash",
            CoordinateFormat::IcaoCompact => "ICAO compact",
            CoordinateFormat::ArincFiveChar => "ARINC five-char",
        })
    }
}

fn degrees(captures: &regex::Captures, index: usize) -> Option<f64> {
    captures.get(index).and_then(|m| m.as_str().parse().ok())
}

fn degrees_minutes(captures: &regex::Captures, deg: usize, min: usize) -> Option<f64> {
    let minutes = captures
        .get(min)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    degrees(captures, deg).map(|degrees| degrees + minutes / 60.0)
}

fn hemisphere_sign(hemisphere: &str) -> f64 {
    if matches!(hemisphere, "S" | "W") {
        -1.0
    } else {
        1.0
    }
}

fn parse_latitude(part: &str) -> Option<f64> {
    ICAO_LAT_RE.captures(part).and_then(|captures| {
        degrees_minutes(&captures, 1, 2).map(|lat| hemisphere_sign(&captures[3]) * lat)
    })
}

fn parse_longitude(part: &str) -> Option<f64> {
    ICAO_LON_RE.captures(part).and_then(|captures| {
        degrees_minutes(&captures, 1, 2).map(|lon| hemisphere_sign(&captures[3]) * lon)
    })
}

/// whole degrees and minutes, rounded to the nearest minute
fn to_deg_min(value: f64) -> (u32, u32) {
    let total_minutes = (value.abs() * 60.0).round() as u32;
    (total_minutes / 60, total_minutes % 60)
}

impl CoordinateFormat {
    /// Order in which ambiguous tokens are tried.
    pub const PRIORITY: [CoordinateFormat; 5] = [
        CoordinateFormat::NatSlash,
        CoordinateFormat::NatHalfDegree,
        CoordinateFormat::IcaoSlash,
        CoordinateFormat::IcaoCompact,
        CoordinateFormat::ArincFiveChar,
    ];

    pub fn parse(self, token: &str) -> Option<Point> {
        match self {
            CoordinateFormat::NatSlash => NAT_SLASH_RE.captures(token).and_then(|captures| {
                let lat = degrees(&captures, 1)?;
                let lon = degrees(&captures, 2)?;
                Some(point! { x: -lon, y: lat })
            }),
            CoordinateFormat::NatHalfDegree => {
                NAT_HALF_DEGREE_RE.captures(token).and_then(|captures| {
                    let lat = degrees(&captures, 1)?;
                    let lon = degrees(&captures, 2)?;
                    Some(point! { x: -lon, y: lat + 0.5 })
                })
            }
            CoordinateFormat::IcaoSlash => {
                let (lat, lon) = token.split_once('/')?;
                if lon.contains('/') {
                    return None;
                }
                Some(point! { x: parse_longitude(lon)?, y: parse_latitude(lat)? })
            }
            CoordinateFormat::IcaoCompact => {
                ICAO_COMPACT_RE.captures(token).and_then(|captures| {
                    let lat = hemisphere_sign(&captures[3]) * degrees_minutes(&captures, 1, 2)?;
                    let lon = hemisphere_sign(&captures[6]) * degrees_minutes(&captures, 4, 5)?;
                    Some(point! { x: lon, y: lat })
                })
            }
            CoordinateFormat::ArincFiveChar => {
                let (lat, lon, letter) =
                    if let Some(captures) = ARINC_TRAILING_RE.captures(token) {
                        (
                            degrees(&captures, 1)?,
                            degrees(&captures, 2)?,
                            captures.get(3)?.as_str(),
                        )
                    } else {
                        let captures = ARINC_INFIX_RE.captures(token)?;
                        (
                            degrees(&captures, 1)?,
                            100.0 + degrees(&captures, 3)?,
                            captures.get(2)?.as_str(),
                        )
                    };
                let (lat_sign, lon_sign) = ARINC_QUADRANTS.get(letter)?;
                Some(point! { x: lon_sign * lon, y: lat_sign * lat })
            }
        }
    }

    /// Canonical token for `coordinate` in this format, rounded to the format's
    /// precision. `None` if the position can't be expressed.
    pub fn format(self, coordinate: Point) -> Option<String> {
        let (lat, lon) = (coordinate.y(), coordinate.x());
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }

        match self {
            CoordinateFormat::NatSlash => (lat >= 0.0 && lon <= 0.0).then(|| {
                let lon = (-lon).round() as u32;
                if lon < 100 {
                    format!("{:02}/{lon:02}", lat.round() as u32)
                } else {
                    format!("{:02}/{lon:03}", lat.round() as u32)
                }
            }),
            CoordinateFormat::NatHalfDegree => {
                let lon = (-lon).round();
                (lat >= 0.0 && (0.0..100.0).contains(&lon))
                    .then(|| format!("H{:02}{:02}", lat.floor() as u32, lon as u32))
            }
            CoordinateFormat::IcaoSlash | CoordinateFormat::IcaoCompact => {
                let (lat_deg, lat_min) = to_deg_min(lat);
                let (lon_deg, lon_min) = to_deg_min(lon);
                let n_s = if lat >= 0.0 { 'N' } else { 'S' };
                let e_w = if lon >= 0.0 { 'E' } else { 'W' };
                let separator = if self == CoordinateFormat::IcaoSlash {
                    "/"
                } else {
                    ""
                };
                Some(format!(
                    "{lat_deg:02}{lat_min:02}{n_s}{separator}{lon_deg:03}{lon_min:02}{e_w}"
                ))
            }
            CoordinateFormat::ArincFiveChar => {
                let letter = match (lat >= 0.0, lon >= 0.0) {
                    (true, false) => 'N',
                    (true, true) => 'E',
                    (false, false) => 'S',
                    (false, true) => 'W',
                };
                let lat = lat.abs().round() as u32;
                let lon = lon.abs().round() as u32;
                if lon < 100 {
                    Some(format!("{lat:02}{lon:02}{letter}"))
                } else {
                    Some(format!("{lat:02}{letter}{:02}", lon - 100))
                }
            }
        }
    }
}

/// Tries every [`CoordinateFormat`] in priority order.
pub fn parse_coordinate_with_format(token: &str) -> Option<(CoordinateFormat, Point)> {
    let token = token.trim().to_uppercase();
    CoordinateFormat::PRIORITY
        .into_iter()
        .find_map(|format| format.parse(&token).map(|coordinate| (format, coordinate)))
}

pub fn parse_coordinate(token: &str) -> Option<Point> {
    parse_coordinate_with_format(token).map(|(_, coordinate)| coordinate)
}
