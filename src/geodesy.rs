// The MIT License (MIT)
//
// Copyright (c) 2024 Ricardo Cernic
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

//! Pure spherical-earth geodesy: distance, bearing, destination point, curvature.

use crate::types::Coordinate;

/// Mean Earth radius, meters (WGS-84 sphere approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn sind(v: f64) -> f64 {
    v.to_radians().sin()
}

fn cosd(v: f64) -> f64 {
    v.to_radians().cos()
}

fn constrain_360(angle: f64) -> f64 {
    ((angle % 360.0) + 360.0) % 360.0
}

/// Great-circle distance between two points, in meters.
pub fn haversine(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + cosd(a.lat) * cosd(b.lat) * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Initial forward bearing from `a` to `b`, degrees in `[0, 360)`.
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    let d_lng = (b.lng - a.lng).to_radians();
    let y = d_lng.sin() * cosd(b.lat);
    let x = cosd(a.lat) * sind(b.lat) - sind(a.lat) * cosd(b.lat) * d_lng.cos();
    constrain_360(y.atan2(x).to_degrees())
}

/// Destination point from `origin` travelling `distance_m` along `bearing_deg`.
/// Longitude is normalized to `[-180, 180)`.
pub fn destination_point(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lng.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    let lng = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
    Coordinate::new(phi2.to_degrees(), lng)
}

/// Drop below the tangent plane at distance `distance_m`, small-angle approximation.
pub fn curvature_drop(distance_m: f64) -> f64 {
    distance_m * distance_m / (2.0 * EARTH_RADIUS_M)
}

const COMPASS_LABELS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Nearest of the 16 compass points for a bearing in degrees.
pub fn azimuth_to_compass(deg: f64) -> &'static str {
    let normalized = constrain_360(deg);
    let index = ((normalized / 22.5).round() as usize) % 16;
    COMPASS_LABELS[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn destination_point_round_trips_through_haversine() {
        let origin = Coordinate::new(45.5231, -122.6765);
        for bearing_deg in [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0] {
            for distance in [500.0, 2_000.0, 10_000.0, 20_000.0] {
                let dest = destination_point(origin, bearing_deg, distance);
                let measured = haversine(origin, dest);
                let rel_err = (measured - distance).abs() / distance;
                assert!(rel_err < 0.001, "bearing {bearing_deg} distance {distance} rel_err {rel_err}");
            }
        }
    }

    #[test]
    fn compass_cardinals_are_exact() {
        assert_eq!(azimuth_to_compass(0.0), "N");
        assert_eq!(azimuth_to_compass(90.0), "E");
        assert_eq!(azimuth_to_compass(180.0), "S");
        assert_eq!(azimuth_to_compass(270.0), "W");
    }

    #[test]
    fn compass_midpoints_round_trip() {
        for (i, label) in COMPASS_LABELS.iter().enumerate() {
            let deg = i as f64 * 22.5;
            assert_eq!(azimuth_to_compass(deg), *label);
        }
    }

    #[test]
    fn bearing_due_north_increases_latitude() {
        let origin = Coordinate::new(10.0, 10.0);
        let north = destination_point(origin, 0.0, 1_000.0);
        assert!(north.lat > origin.lat);
        assert_approx_eq!(bearing(origin, north), 0.0, 1e-6);

        let east = destination_point(origin, 90.0, 1_000.0);
        assert!(east.lng > origin.lng);

        let south = destination_point(origin, 180.0, 1_000.0);
        assert!(south.lat < origin.lat);

        let west = destination_point(origin, 270.0, 1_000.0);
        assert!(west.lng < origin.lng);
    }

    #[test]
    fn curvature_drop_matches_formula() {
        assert_approx_eq!(curvature_drop(5_000.0), 5_000.0 * 5_000.0 / (2.0 * EARTH_RADIUS_M), 1e-9);
    }
}
