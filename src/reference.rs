use std::{collections::HashSet, io, path::Path, sync::OnceLock};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    airway::{parse_awys_csv, AirwayIndex, AirwayRow},
    cdr::{parse_cdrs_csv, CdrMap},
    csv::CsvError,
    group::collect_route_lines,
    playbook::{parse_playbook_csv, Playbook, PlaybookError},
    points::{parse_facility_centers_csv, parse_points_csv, FacilityCenters, PointTable},
    procedure::{
        parse_dp_csv, parse_star_csv, ArrivalProcedures, DepartureProcedures, ProcedureError,
    },
    route::ParsedRoute,
    settings::{Settings, SettingsError},
    token::TokenClass,
};

pub const POINTS_FILE: &str = "points.csv";
pub const FACILITY_CENTERS_FILE: &str = "facility_centers.csv";
pub const AIRWAYS_FILE: &str = "awys.csv";
pub const CDRS_FILE: &str = "cdrs.csv";
pub const PLAYBOOK_FILE: &str = "playbook_routes.csv";
pub const DEPARTURES_FILE: &str = "dp_full_routes.csv";
pub const ARRIVALS_FILE: &str = "star_full_routes.csv";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum ReferenceDataError {
    #[error("reference table: {0}")]
    Csv(#[from] CsvError),
    #[error("playbook_routes.csv: {0}")]
    Playbook(#[from] PlaybookError),
    #[error("procedure table: {0}")]
    Procedure(#[from] ProcedureError),
    #[error("settings.json: {0}")]
    Settings(#[from] SettingsError),
    #[error("failed to read file: {0}")]
    FileRead(#[from] io::Error),
}

pub type ReferenceDataResult = Result<ReferenceData, ReferenceDataError>;

/// All reference tables a route is resolved against. Read-only once built;
/// the airway index is derived from the airway rows on first use.
#[derive(Debug, Default, Serialize)]
pub struct ReferenceData {
    pub(crate) points: PointTable,
    pub(crate) facility_codes: HashSet<String>,
    pub(crate) facility_centers: FacilityCenters,
    pub(crate) cdrs: CdrMap,
    pub(crate) playbook: Playbook,
    pub(crate) departures: DepartureProcedures,
    pub(crate) arrivals: ArrivalProcedures,
    pub(crate) settings: Settings,
    airway_rows: Vec<AirwayRow>,
    #[serde(skip)]
    airway_index: OnceLock<AirwayIndex>,
}

fn read_optional(dir: &Path, file: &str) -> Result<Option<Vec<u8>>, io::Error> {
    let path = dir.join(file);
    if path.exists() {
        fs_err::read(path).map(Some)
    } else {
        warn!("{} not found, continuing without it", path.display());
        Ok(None)
    }
}

impl ReferenceData {
    pub fn new(points: PointTable) -> Self {
        Self {
            facility_codes: points.facility_codes(),
            points,
            ..Self::default()
        }
    }

    pub fn with_facility_centers(mut self, facility_centers: FacilityCenters) -> Self {
        self.facility_centers = facility_centers;
        self
    }

    pub fn with_airways(mut self, airway_rows: Vec<AirwayRow>) -> Self {
        self.airway_rows = airway_rows;
        self.airway_index = OnceLock::new();
        self
    }

    pub fn with_cdrs(mut self, cdrs: CdrMap) -> Self {
        self.cdrs = cdrs;
        self
    }

    pub fn with_playbook(mut self, playbook: Playbook) -> Self {
        self.playbook = playbook;
        self
    }

    pub fn with_departures(mut self, departures: DepartureProcedures) -> Self {
        self.departures = departures;
        self
    }

    pub fn with_arrivals(mut self, arrivals: ArrivalProcedures) -> Self {
        self.arrivals = arrivals;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Loads the tables from their usual file names in `dir`. Only the
    /// points table is required.
    pub fn from_dir(dir: impl AsRef<Path>) -> ReferenceDataResult {
        let dir = dir.as_ref();
        let mut data = Self::new(parse_points_csv(&fs_err::read(dir.join(POINTS_FILE))?)?);

        if let Some(content) = read_optional(dir, FACILITY_CENTERS_FILE)? {
            data = data.with_facility_centers(parse_facility_centers_csv(&content)?);
        }
        if let Some(content) = read_optional(dir, AIRWAYS_FILE)? {
            data = data.with_airways(parse_awys_csv(&content)?);
        }
        if let Some(content) = read_optional(dir, CDRS_FILE)? {
            data = data.with_cdrs(parse_cdrs_csv(&content)?);
        }
        if let Some(content) = read_optional(dir, PLAYBOOK_FILE)? {
            data = data.with_playbook(parse_playbook_csv(&content)?);
        }
        if let Some(content) = read_optional(dir, DEPARTURES_FILE)? {
            data = data.with_departures(parse_dp_csv(&content)?);
        }
        if let Some(content) = read_optional(dir, ARRIVALS_FILE)? {
            data = data.with_arrivals(parse_star_csv(&content)?);
        }
        let settings_path = dir.join(SETTINGS_FILE);
        if settings_path.exists() {
            data = data.with_settings(Settings::load(&settings_path)?);
        }

        debug!(
            "loaded {} point ids, {} airways, {} CDRs, {} plays",
            data.points.len(),
            data.airway_rows.len(),
            data.cdrs.len(),
            data.playbook.len()
        );
        Ok(data)
    }

    pub fn points(&self) -> &PointTable {
        &self.points
    }

    pub fn facility_centers(&self) -> &FacilityCenters {
        &self.facility_centers
    }

    pub fn cdrs(&self) -> &CdrMap {
        &self.cdrs
    }

    pub fn playbook(&self) -> &Playbook {
        &self.playbook
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Built from the airway rows on first use.
    pub fn airways(&self) -> &AirwayIndex {
        self.airway_index
            .get_or_init(|| AirwayIndex::build(&self.airway_rows))
    }

    /// ARTCC/FIR/TRACON code, either from a `ZZ_` alias or a facility centre
    pub fn is_facility(&self, code: &str) -> bool {
        self.facility_codes.contains(code) || self.facility_centers.contains_key(code)
    }

    pub fn classify(&self, token: &str) -> TokenClass {
        TokenClass::of(token, |code| self.is_facility(code))
    }

    /// Airports and facility placeholders are fanned to the route body.
    pub fn is_airport_ident(&self, designator: &str) -> bool {
        TokenClass::of(designator, |code| self.facility_centers.contains_key(code)).is_airport()
    }

    pub fn expand_airway_notation(&self, tokens: &[String]) -> Vec<String> {
        self.airways().expand(tokens)
    }

    /// Parses free-form input: advisories, route groups, playbook directives
    /// and plain route lines, one parsed route per resulting line.
    pub fn parse_input(&self, input: &str) -> Vec<ParsedRoute> {
        collect_route_lines(input, &self.playbook)
            .iter()
            .map(|line| self.parse_route(&line.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::ReferenceData;
    use crate::{
        airway::AirwayRow,
        points::{FacilityCenters, PointTable},
        Fix,
    };

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
    }

    #[test]
    fn test_from_dir() {
        let data = ReferenceData::from_dir(data_dir()).unwrap();

        assert_eq!(data.points().get_vec("MERIT").map(Vec::len), Some(2));
        assert!(data.is_facility("ZNY"));
        assert!(data.is_facility("N90"));
        assert!(data.airways().contains_key("J48"));
        assert!(data.cdrs().contains_key("RNGRZ"));
        assert!(data.playbook().contains_key("ABI"));
        assert!((data.settings().max_reasonable_distance_km - 4000.0).abs() < f64::EPSILON);
        assert_eq!(data.settings().great_circle_points, 20);
    }

    #[test]
    fn test_missing_points() {
        assert!(ReferenceData::from_dir(data_dir().join("nonexistent")).is_err());
    }

    #[test]
    fn test_airport_idents() {
        let data = ReferenceData::new(PointTable::from_fixes([Fix::new("ZZ_ZNY", 40.8, -73.0)]))
            .with_facility_centers(FacilityCenters::from_fixes([Fix::new("N90", 40.7, -73.9)]));

        assert!(data.is_airport_ident("KJFK"));
        assert!(data.is_airport_ident("ZZ_ZNY"));
        assert!(data.is_airport_ident("N90"));
        assert!(!data.is_airport_ident("MERIT"));
        assert!(!data.is_airport_ident("5230N/05000W"));
        // ZNY is a facility through its alias, but has no centre
        assert!(!data.is_airport_ident("ZNY"));
    }

    #[test]
    fn test_lazy_airway_index() {
        let data = ReferenceData::default()
            .with_airways(vec![AirwayRow::new("J48", "A B C D E")]);

        assert!(std::ptr::eq(data.airways(), data.airways()));
        assert_eq!(
            data.expand_airway_notation(&["A".into(), "J48".into(), "D".into()]),
            vec!["A", "B", "C", "D"]
        );
    }
}
