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

//! Hex-packed candidate grid generation within a geodesic radius.

use crate::geodesy::{destination_point, haversine};
use crate::types::Coordinate;

/// Default nominal spacing between grid points, meters.
pub const DEFAULT_SPACING_M: f64 = 350.0;

/// Generates a near-hexagonal lattice of points within `radius_m` of `center`.
///
/// Rows are offset by half the column spacing on alternating rows so the lattice
/// approximates hexagonal packing while staying a simple row/column enumeration.
/// `radius_m <= 0.0` yields an empty grid.
pub fn generate_grid(center: Coordinate, radius_m: f64, spacing_m: f64) -> Vec<Coordinate> {
    if radius_m <= 0.0 {
        return Vec::new();
    }

    let row_spacing = spacing_m * 3f64.sqrt() / 2.0;
    let max_row = (radius_m / row_spacing).ceil() as i64;
    let max_col = (radius_m / spacing_m).ceil() as i64;

    let mut points = Vec::new();
    for r in -max_row..=max_row {
        let y = r as f64 * row_spacing;
        let x_offset = if r % 2 != 0 { spacing_m / 2.0 } else { 0.0 };
        for c in -max_col..=max_col {
            let x = c as f64 * spacing_m + x_offset;
            let dist = (x * x + y * y).sqrt();
            if dist > radius_m {
                continue;
            }
            let point = if dist == 0.0 {
                center
            } else {
                let bearing_deg = x.atan2(y).to_degrees();
                destination_point(center, bearing_deg, dist)
            };
            points.push(point);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_for_nonpositive_radius() {
        let center = Coordinate::new(45.0, -122.0);
        assert!(generate_grid(center, 0.0, DEFAULT_SPACING_M).is_empty());
        assert!(generate_grid(center, -10.0, DEFAULT_SPACING_M).is_empty());
    }

    #[test]
    fn all_points_within_radius() {
        let center = Coordinate::new(45.5231, -122.6765);
        let radius = 3_000.0;
        for point in generate_grid(center, radius, DEFAULT_SPACING_M) {
            assert!(haversine(center, point) <= radius + 1e-6);
        }
    }

    #[test]
    fn point_count_scales_with_expected_packing_density() {
        let center = Coordinate::new(0.0, 0.0);
        let radius = 5_000.0;
        let spacing = DEFAULT_SPACING_M;
        let points = generate_grid(center, radius, spacing);
        let expected = std::f64::consts::PI * radius * radius / (spacing * spacing * 3f64.sqrt() / 2.0);
        let ratio = points.len() as f64 / expected;
        assert!((0.85..=1.15).contains(&ratio), "ratio was {ratio}, count {}", points.len());
    }
}
