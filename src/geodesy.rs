use geo::{point, Coord, Haversine, InterpolatePoint, LineString, Point};
use uom::si::{
    f64::Length,
    length::{kilometer, nautical_mile},
};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn central_angle(from: Point, to: Point) -> f64 {
    let dlat = (to.y() - from.y()).to_radians();
    let dlon = (to.x() - from.x()).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + from.y().to_radians().cos() * to.y().to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

/// Great-circle distance on a sphere of [`EARTH_RADIUS_KM`].
pub fn haversine_distance(from: Point, to: Point) -> Length {
    Length::new::<kilometer>(EARTH_RADIUS_KM * central_angle(from, to))
}

pub fn haversine_km(from: Point, to: Point) -> f64 {
    haversine_distance(from, to).get::<kilometer>()
}

pub fn haversine_nm(from: Point, to: Point) -> f64 {
    haversine_distance(from, to).get::<nautical_mile>()
}

/// Arithmetic mean of both positions in degrees, used as a cheap reference
/// position between two route neighbours.
pub fn midpoint(a: Point, b: Point) -> Point {
    point! { x: (a.x() + b.x()) / 2.0, y: (a.y() + b.y()) / 2.0 }
}

/// `points` positions along the great circle from `from` to `to`, both
/// endpoints included.
pub fn great_circle_path(from: Point, to: Point, points: usize) -> LineString {
    let angle = central_angle(from, to);
    if points < 2 || angle.sin().abs() < f64::EPSILON {
        return LineString::from(vec![Coord::from(from), Coord::from(to)]);
    }

    (0..points)
        .map(|i| {
            let ratio = i as f64 / (points - 1) as f64;
            Coord::from(Haversine::point_at_ratio_between(from, to, ratio))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use geo::point;
    use itertools::Itertools;

    use super::{great_circle_path, haversine_km, haversine_nm, midpoint};

    #[test]
    fn test_haversine() {
        let jfk = point! { x: -73.778_9, y: 40.639_8 };
        let lhr = point! { x: -0.461_9, y: 51.470_6 };

        let km = haversine_km(jfk, lhr);
        assert!((km - 5540.0).abs() < 15.0, "{km}");
        assert!((haversine_nm(jfk, lhr) - km / 1.852).abs() < 1e-6);
        assert!(haversine_km(jfk, jfk).abs() < f64::EPSILON);
    }

    #[test]
    fn test_midpoint() {
        let mid = midpoint(point! { x: -74.1, y: 40.1 }, point! { x: -74.2, y: 40.2 });
        assert!((mid.x() + 74.15).abs() < 1e-9);
        assert!((mid.y() - 40.15).abs() < 1e-9);
    }

    #[test]
    fn test_great_circle_path() {
        let from = point! { x: -73.778_9, y: 40.639_8 };
        let to = point! { x: -0.461_9, y: 51.470_6 };

        let path = great_circle_path(from, to, 50);
        let coords: Vec<_> = path.coords().collect();

        assert_eq!(coords.len(), 50);
        assert!((coords[0].x - from.x()).abs() < 1e-9 && (coords[0].y - from.y()).abs() < 1e-9);
        assert!((coords[49].x - to.x()).abs() < 1e-9 && (coords[49].y - to.y()).abs() < 1e-9);
        // the arc bulges north of both endpoints
        assert!(coords.iter().any(|c| c.y > 52.0));

        // evenly spaced along the arc
        let step = haversine_km(from, to) / 49.0;
        assert!(path
            .points()
            .tuple_windows()
            .all(|(a, b)| (haversine_km(a, b) - step).abs() < 1e-3));
    }

    #[test]
    fn test_degenerate_path() {
        let p = point! { x: 10.0, y: 50.0 };
        assert_eq!(great_circle_path(p, p, 50).coords().count(), 2);
    }
}
