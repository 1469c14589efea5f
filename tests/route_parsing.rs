use std::{path::PathBuf, thread};

use pretty_assertions_sorted::assert_eq_sorted;
use route_parser::{
    group::collect_route_lines, Fix, ParsedRoute, ReferenceData, Resolution, SegmentStyle,
};

fn reference_data() -> ReferenceData {
    ReferenceData::from_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")).unwrap()
}

fn designators(route: &ParsedRoute) -> Vec<&str> {
    route
        .points
        .iter()
        .map(|point| point.fix.designator.as_str())
        .collect()
}

fn styles(route: &ParsedRoute) -> Vec<SegmentStyle> {
    route.segments.iter().map(|segment| segment.style).collect()
}

#[test]
fn test_cdr() {
    let data = reference_data();
    let route = data.parse_route("RNGRZ");

    assert_eq!(route.route_text, "RNGRZ");
    assert_eq!(designators(&route), vec!["KJFK", "MERIT", "CAMRN", "KBOS"]);
    assert!((route.points[1].fix.lat() - 41.381_944).abs() < 1e-9);
    assert_eq!(
        styles(&route),
        vec![SegmentStyle::Fan, SegmentStyle::Dashed, SegmentStyle::Fan]
    );
}

#[test]
fn test_cdr_markers() {
    let data = reference_data();
    let route = data.parse_route("JFKBOS1");

    assert_eq!(designators(&route), vec!["KJFK", "GREKI", "HFD", "KBOS"]);
    assert_eq!(
        styles(&route),
        vec![SegmentStyle::Fan, SegmentStyle::Solid, SegmentStyle::Fan]
    );
}

#[test]
fn test_dropped_token() {
    let data = reference_data();
    let route = data.parse_route("KJFK XXXXX KBOS");

    assert_eq!(designators(&route), vec!["KJFK", "KBOS"]);
    assert_eq!(route.segments.len(), 1);
}

#[test]
fn test_sanity_rejection() {
    let data = reference_data();
    let kjfk = Fix::new("KJFK", 40.639_751, -73.778_925);
    let kbos = Fix::new("KBOS", 42.362_976, -71.006);

    assert!(matches!(
        data.resolve("SYDNY", Some(&kjfk), Some(&kbos)),
        Resolution::Rejected { .. }
    ));
    assert_eq!(data.resolve("XXXXX", Some(&kjfk), Some(&kbos)), Resolution::NotFound);
    assert_eq!(designators(&data.parse_route("KJFK SYDNY KBOS")), vec!["KJFK", "KBOS"]);
}

#[test]
fn test_airway_and_playbook() {
    let data = reference_data();
    let routes = data.parse_input("PB.ABI.JFK");

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].route_text, "KJFK MERIT J48 BOS KBOS");
    assert_eq!(
        designators(&routes[0]),
        vec!["KJFK", "MERIT", "HFD", "PUT", "BOS", "KBOS"]
    );
    assert_eq!(
        styles(&routes[0]),
        vec![
            SegmentStyle::Fan,
            SegmentStyle::Dashed,
            SegmentStyle::Dashed,
            SegmentStyle::Dashed,
            SegmentStyle::Fan,
        ]
    );

    let routes = data.parse_input(">PB.ABI.JFK<;green");
    assert_eq!(routes[0].route_text, "KJFK >MERIT J48 BOS< KBOS");
    assert_eq!(routes[0].color.as_deref(), Some("GREEN"));
    assert_eq!(
        styles(&routes[0]),
        vec![
            SegmentStyle::Fan,
            SegmentStyle::Solid,
            SegmentStyle::Solid,
            SegmentStyle::Solid,
            SegmentStyle::Fan,
        ]
    );

    assert_eq!(data.parse_input("PB.ABI").len(), 2);
    assert!(data.parse_input("PB.ABI.ORD").is_empty());
}

#[test]
fn test_idempotent_expansion() {
    let data = reference_data();
    let tokens = |route: &str| -> Vec<String> {
        route.split_whitespace().map(ToString::to_string).collect()
    };

    let expanded = data.expand_airway_notation(&tokens("KJFK MERIT J48 BOS KBOS"));
    assert_eq!(expanded, tokens("KJFK MERIT HFD PUT BOS KBOS"));
    assert_eq!(data.expand_airway_notation(&expanded), expanded);
    assert_eq!(
        data.expand_airway_notation(&tokens("BOS J48 MERIT")),
        tokens("BOS PUT HFD MERIT")
    );
}

#[test]
fn test_departure_procedure() {
    let data = reference_data();
    let route = data.parse_route("KJFK DEEZZ5 CANDR MERIT KBOS");

    assert_eq!(
        designators(&route),
        vec!["KJFK", "DEEZZ", "HEERO", "CANDR", "MERIT", "KBOS"]
    );
}

#[test]
fn test_arrival_procedure() {
    let data = reference_data();
    let route = data.parse_route("KBOS PUT HFD DPK.LENDY8 KJFK");

    assert_eq!(
        designators(&route),
        vec!["KBOS", "PUT", "HFD", "DPK", "ROBER", "LENDY", "KJFK"]
    );
}

#[test]
fn test_groups_and_colors() {
    let data = reference_data();
    let routes = data.parse_input("[EAST];red\nRNGRZ\nKJFK XXXXX KBOS;BLUE\n");

    assert_eq!(
        routes
            .iter()
            .map(|route| route.color.as_deref())
            .collect::<Vec<_>>(),
        vec![Some("RED"), Some("BLUE")]
    );
    assert_eq!(routes[0].points.len(), 4);
}

#[test]
fn test_advisory() {
    let data = reference_data();
    let text = "VATCSCC ADVZY 007 DCC 03/15/2024 ROUTE RQD
NAME: BOS_EAST
ROUTES:
ORIG DEST ROUTE
---- ---- -----
JFK BOS >MERIT J48 BOS<
TMI ID: RRDCC007";

    let lines = collect_route_lines(text, data.playbook());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].body, "KJFK >MERIT J48 BOS< KBOS");

    let routes = data.parse_input(text);
    assert_eq!(
        designators(&routes[0]),
        vec!["KJFK", "MERIT", "HFD", "PUT", "BOS", "KBOS"]
    );
    assert_eq!(routes[0].segments.iter().filter(|segment| segment.is_solid()).count(), 3);
}

#[test]
fn test_great_circle_settings() {
    let data = reference_data();
    let route = data.parse_route("MERIT KORD");

    assert_eq!(route.segments.len(), 1);
    assert!(route.segments[0].is_fan());
    assert_eq!(route.segments[0].path.0.len(), 20);
}

#[test]
fn test_parallel_parses() {
    let data = reference_data();

    let (a, b) = thread::scope(|scope| {
        let a = scope.spawn(|| data.parse_route("RNGRZ"));
        let b = scope.spawn(|| data.parse_route("KJFK XXXXX KBOS"));
        (a.join().unwrap(), b.join().unwrap())
    });

    assert_eq_sorted!(a, data.parse_route("RNGRZ"));
    assert_eq!(b.points.len(), 2);
}

#[test]
fn test_serialize() {
    let data = reference_data();
    let json = serde_json::to_value(data.parse_route("RNGRZ;RED")).unwrap();

    assert_eq!(json["color"], "RED");
    assert_eq!(json["points"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["segments"][0]["style"], "Fan");
}
