use std::io;

use geo::Point;
use serde::Serialize;
use tracing::warn;

pub mod advisory;
pub mod airway;
pub mod cdr;
pub mod coordinate;
pub mod csv;
pub mod geodesy;
pub mod group;
pub mod playbook;
pub mod points;
pub mod procedure;
pub mod reference;
pub mod resolver;
pub mod route;
pub mod settings;
pub mod token;

pub use reference::{ReferenceData, ReferenceDataError};
pub use resolver::Resolution;
pub use route::{ParsedRoute, ResolvedRoutePoint, Segment, SegmentStyle};

fn read_to_string(contents: &[u8]) -> Result<String, io::Error> {
    String::from_utf8(contents.to_vec()).or_else(|_| {
        let (string, _, errors) = encoding_rs::WINDOWS_1252.decode(contents);
        if errors {
            warn!("errors while decoding win-1252");
        }
        Ok(string.to_string())
    })
}

/// A named point: fix, navaid, airport, facility alias or an ad-hoc coordinate.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Fix {
    pub designator: String,
    pub coordinate: Point,
}

impl Fix {
    pub fn new(designator: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            designator: designator.into(),
            coordinate: Point::new(lon, lat),
        }
    }

    pub fn lat(&self) -> f64 {
        self.coordinate.y()
    }

    pub fn lon(&self) -> f64 {
        self.coordinate.x()
    }
}

#[cfg(test)]
mod test {
    use super::{read_to_string, Fix};

    #[test]
    fn test_fix_axes() {
        let fix = Fix::new("MERIT", 41.381_944, -73.137_5);
        assert!((fix.lat() - 41.381_944).abs() < f64::EPSILON);
        assert!((fix.lon() + 73.137_5).abs() < f64::EPSILON);
        assert_eq!(fix.coordinate.x(), fix.lon());
    }

    #[test]
    fn test_win1252_fallback() {
        let decoded = read_to_string(b"ZZ_\xC4RR,1,2").unwrap();
        assert_eq!(decoded, "ZZ_\u{c4}RR,1,2");
    }
}
