use std::env::args;

use route_parser::coordinate::parse_coordinate_with_format;

fn main() {
    for token in args().skip(1) {
        match parse_coordinate_with_format(&token) {
            Some((format, point)) => println!("{token}: {format} {:.6} {:.6}", point.y(), point.x()),
            None => println!("{token}: not a coordinate"),
        }
    }
}
