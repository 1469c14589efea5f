use std::{env::args_os, fs};

use route_parser::airway::{parse_awys_csv, AirwayIndex};

fn main() {
    let path = args_os().nth(1).expect("missing argument: path to awys.csv");
    let rows = parse_awys_csv(&fs::read(path).unwrap()).expect("unsuccessful parse");

    println!("{}", serde_json::to_string(&AirwayIndex::build(&rows)).unwrap());
}
