use std::{env::args_os, fs, io};

use geojson::{feature::Id, Feature, FeatureCollection};
use route_parser::ReferenceData;
use serde_json::Map;

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let data_path = args_os()
        .nth(1)
        .expect("missing argument: path to reference data directory");
    let input_path = args_os()
        .nth(2)
        .expect("missing argument: path to route input text");
    let geojson_path = args_os().nth(3);

    let data = ReferenceData::from_dir(data_path).expect("unsuccessful load of reference data");
    let input = fs::read_to_string(input_path).unwrap();
    let routes = data.parse_input(&input);

    match geojson_path {
        Some(geojson_path) => {
            let feature_collection = FeatureCollection::from_iter(routes.iter().enumerate().flat_map(
                |(i, route)| {
                    route.segments.iter().map(move |segment| Feature {
                        id: Some(Id::String(format!(
                            "{i}-{}-{}",
                            segment.from.designator, segment.to.designator
                        ))),
                        geometry: Some((&segment.path).into()),
                        properties: Some(Map::from_iter(vec![
                            ("route".to_string(), route.route_text.clone().into()),
                            ("color".to_string(), route.color.clone().into()),
                            ("style".to_string(), format!("{:?}", segment.style).into()),
                        ])),
                        ..Default::default()
                    })
                },
            ));
            fs::write(geojson_path, feature_collection.to_string()).expect("could not write .geojson");
        }
        None => println!("{}", serde_json::to_string(&routes).unwrap()),
    }
}
