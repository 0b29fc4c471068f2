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

//! Low-precision solar ephemeris: sun times, azimuth and altitude for a
//! location and date. Treated by the rest of the pipeline as an opaque
//! library call, per the oracle's contract.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

use crate::types::{Mode, SunData};

const SUNRISE_SUNSET_ALTITUDE: f64 = -0.833_33; // refraction + solar disk radius
const GOLDEN_HOUR_ALTITUDE: f64 = 6.0;
const CIVIL_TWILIGHT_ALTITUDE: f64 = -6.0;
const GRID_POINTS: usize = 288; // 5-minute resolution across a day

fn sind(v: f64) -> f64 {
    v.to_radians().sin()
}

fn cosd(v: f64) -> f64 {
    v.to_radians().cos()
}

fn constrain_360(angle: f64) -> f64 {
    ((angle % 360.0) + 360.0) % 360.0
}

/// Julian Day (Meeus, *Astronomical Algorithms* ch. 7) from a UTC instant.
fn jd_from_datetime(dt: DateTime<Utc>) -> f64 {
    let day_decimal = dt.day() as f64
        + (dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3_600.0) / 24.0;
    let (year, month) = if dt.month() > 2 {
        (dt.year() as i64, dt.month() as i64)
    } else {
        (dt.year() as i64 - 1, dt.month() as i64 + 12)
    };
    let a = (year as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (year + 4716) as f64).floor() + (30.600_1 * (month + 1) as f64).floor() + day_decimal
        + b
        - 1524.5
}

fn datetime_from_jd(jd: f64) -> DateTime<Utc> {
    let unix_seconds = (jd - 2_440_587.5) * 86_400.0;
    DateTime::<Utc>::from_timestamp(unix_seconds.floor() as i64, 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
}

/// Sun's apparent geocentric right ascension and declination (degrees) at `jd`.
fn sun_ra_dec(jd: f64) -> (f64, f64) {
    let n = jd - 2_451_545.0;
    let mut l = constrain_360(280.460 + 0.985_647_4 * n);
    let mut g = constrain_360(357.528 + 0.985_600_3 * n).to_radians();
    if l < 0.0 {
        l += 360.0;
    }
    if g < 0.0 {
        g += 2.0 * PI;
    }
    let lambda = (l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin()).to_radians();
    let eps = (23.439 - 0.000_000_4 * n).to_radians();
    let mut ra = (eps.cos() * lambda.sin()).atan2(lambda.cos());
    let dec = (eps.sin() * lambda.sin()).asin();
    if ra < 0.0 {
        ra += 2.0 * PI;
    }
    (ra.to_degrees(), dec.to_degrees())
}

fn gmst(jd: f64) -> f64 {
    let t = (jd - 2_451_545.0) / 36_525.0;
    constrain_360(
        280.460_618_37 + 360.985_647_366_29 * (jd - 2_451_545.0) + 0.000_387_933 * t * t
            - t * t * t / 38_710_000.0,
    )
}

fn hour_angle(lng: f64, ra: f64, jd: f64) -> f64 {
    constrain_360(gmst(jd) + lng - ra)
}

/// Altitude and azimuth (south-referenced, positive westward — the Meeus convention)
/// of the sun at `jd` for an observer at `lat`/`lng`.
fn sun_alt_az_raw(lat: f64, lng: f64, jd: f64) -> (f64, f64) {
    let (ra, dec) = sun_ra_dec(jd);
    let ha = hour_angle(lng, ra, jd);
    let x = -cosd(ha) * cosd(dec) * sind(lat) + sind(dec) * cosd(lat);
    let y = -sind(ha) * cosd(dec);
    let z = cosd(ha) * cosd(dec) * cosd(lat) + sind(dec) * sind(lat);
    let r = (x * x + y * y).sqrt();
    let alt = z.atan2(r).to_degrees();
    let az = constrain_360(y.atan2(x).to_degrees());
    (alt, az)
}

/// Converts the oracle's internal south-referenced azimuth to a compass bearing.
fn to_compass(south_referenced_az: f64) -> f64 {
    constrain_360(south_referenced_az + 180.0)
}

fn altitude_grid(lat: f64, lng: f64, jd_start: f64, jd_end: f64, points: usize) -> Vec<(f64, f64)> {
    let step = (jd_end - jd_start) / points as f64;
    (0..=points)
        .map(|i| {
            let jd = jd_start + step * i as f64;
            let (alt, _) = sun_alt_az_raw(lat, lng, jd);
            (jd, alt)
        })
        .collect()
}

fn linear_crossing_interpolation(jd_before: f64, jd_after: f64, alt_before: f64, alt_after: f64, target: f64) -> f64 {
    let slope = (alt_after - alt_before) / (jd_after - jd_before);
    jd_after - (alt_after - target) / slope
}

/// Finds the first crossing of `target_altitude` in the given direction within the grid.
fn find_crossing(grid: &[(f64, f64)], target_altitude: f64, rising: bool) -> Option<f64> {
    for w in grid.windows(2) {
        let (jd_before, alt_before) = w[0];
        let (jd_after, alt_after) = w[1];
        let crosses = if rising {
            alt_before < target_altitude && alt_after >= target_altitude
        } else {
            alt_before > target_altitude && alt_after <= target_altitude
        };
        if crosses {
            return Some(linear_crossing_interpolation(
                jd_before,
                jd_after,
                alt_before,
                alt_after,
                target_altitude,
            ));
        }
    }
    None
}

fn solar_noon(grid: &[(f64, f64)]) -> f64 {
    grid.iter()
        .copied()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(jd, _)| jd)
        .unwrap_or(grid[grid.len() / 2].0)
}

/// Computes sun times, target-time azimuth/altitude for `local_noon` at `(lat, lng)`.
///
/// `local_noon` anchors the calendar day the grid search scans; its own time-of-day
/// component does not otherwise affect the result.
pub fn sun_data(lat: f64, lng: f64, local_noon: DateTime<Utc>, mode: Mode) -> SunData {
    let jd_noon = jd_from_datetime(local_noon);
    let jd_start = jd_noon.floor() - 0.5;
    let jd_end = jd_start + 1.0;
    let grid = altitude_grid(lat, lng, jd_start, jd_end, GRID_POINTS);

    let sunrise_jd = find_crossing(&grid, SUNRISE_SUNSET_ALTITUDE, true).unwrap_or(jd_start);
    let sunset_jd = find_crossing(&grid, SUNRISE_SUNSET_ALTITUDE, false).unwrap_or(jd_end);
    let dawn_jd = find_crossing(&grid, CIVIL_TWILIGHT_ALTITUDE, true).unwrap_or(jd_start);
    let dusk_jd = find_crossing(&grid, CIVIL_TWILIGHT_ALTITUDE, false).unwrap_or(jd_end);
    let morning_golden_end_jd =
        find_crossing(&grid, GOLDEN_HOUR_ALTITUDE, true).unwrap_or(sunrise_jd);
    let evening_golden_start_jd =
        find_crossing(&grid, GOLDEN_HOUR_ALTITUDE, false).unwrap_or(sunset_jd);
    let noon_jd = solar_noon(&grid);

    let (golden_hour_start_jd, golden_hour_end_jd, target_jd) = match mode {
        Mode::Sunset => (evening_golden_start_jd, sunset_jd, sunset_jd),
        Mode::Sunrise => (sunrise_jd, morning_golden_end_jd, sunrise_jd),
    };

    let (alt, raw_az) = sun_alt_az_raw(lat, lng, target_jd);

    SunData {
        mode,
        target_time: datetime_from_jd(target_jd),
        sunrise_time: datetime_from_jd(sunrise_jd),
        sunset_time: datetime_from_jd(sunset_jd),
        golden_hour_start: datetime_from_jd(golden_hour_start_jd),
        golden_hour_end: datetime_from_jd(golden_hour_end_jd),
        solar_noon: datetime_from_jd(noon_jd),
        dawn: datetime_from_jd(dawn_jd),
        dusk: datetime_from_jd(dusk_jd),
        azimuth: to_compass(raw_az),
        altitude: alt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn azimuth_is_in_compass_range() {
        let noon = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let data = sun_data(45.5231, -122.6765, noon, Mode::Sunset);
        assert!((0.0..360.0).contains(&data.azimuth));
        assert!(data.azimuth > 180.0 && data.azimuth < 360.0);
    }

    #[test]
    fn summer_solstice_sunset_azimuth_exceeds_equinox_portland() {
        let lat = 45.5231;
        let lng = -122.6765;
        let solstice_noon = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let equinox_noon = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

        let solstice = sun_data(lat, lng, solstice_noon, Mode::Sunset);
        let equinox = sun_data(lat, lng, equinox_noon, Mode::Sunset);

        assert!(solstice.azimuth > equinox.azimuth);
        assert!((180.0..360.0).contains(&solstice.azimuth));
        assert!((180.0..360.0).contains(&equinox.azimuth));
    }

    #[test]
    fn sunrise_mode_uses_sunrise_as_target() {
        let noon = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let data = sun_data(45.5231, -122.6765, noon, Mode::Sunrise);
        assert_eq!(data.target_time, data.sunrise_time);
    }
}
