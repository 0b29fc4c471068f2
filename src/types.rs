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

//! Shared data model: coordinates, candidates, obstruction and sun results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point on the WGS-84-approximated sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Sunset or sunrise mode, selecting which horizon event drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sunset,
    Sunrise,
}

/// A grid point after elevation resolution; `elevation` is `None` on lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevatedPoint {
    pub coordinate: Coordinate,
    pub elevation: Option<f64>,
}

/// A sample along a viewshed ray, with exact nominal distance from the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaySample {
    pub coordinate: Coordinate,
    pub distance: f64,
    pub elevation: f64,
}

/// A grid point that survived generation and elevation resolution: its elevation is
/// always present, which is what distinguishes it from an `ElevatedPoint`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub coordinate: Coordinate,
    pub elevation: f64,
}

/// Result of sweeping a candidate's viewshed ray for terrain obstruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstruction {
    pub obstruction_angle: f64,
    pub max_blocker_distance: f64,
    pub max_blocker_elevation: f64,
    pub is_clear: bool,
}

/// Coarse view-quality label derived from `Obstruction::is_clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewQuality {
    Clear,
    Obstructed,
}

impl ViewQuality {
    pub fn from_is_clear(is_clear: bool) -> Self {
        if is_clear {
            ViewQuality::Clear
        } else {
            ViewQuality::Obstructed
        }
    }
}

/// A fully analyzed candidate, ready for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedCandidate {
    pub coordinate: Coordinate,
    pub elevation: f64,
    pub obstruction_angle: f64,
    pub max_blocker_distance: f64,
    pub max_blocker_elevation: f64,
    pub is_clear: bool,
    pub sun_azimuth: f64,
    pub sun_altitude: f64,
    pub view_quality: ViewQuality,
}

/// A scored, ranked candidate: the final pipeline output row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub coordinate: Coordinate,
    pub elevation: f64,
    pub obstruction_angle: f64,
    pub max_blocker_distance: f64,
    pub max_blocker_elevation: f64,
    pub is_clear: bool,
    pub sun_azimuth: f64,
    pub sun_altitude: f64,
    pub view_quality: ViewQuality,
    pub score: u8,
    pub rank: u32,
}

/// Sun ephemeris data for a location and target date, in the mode's orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SunData {
    pub mode: Mode,
    pub target_time: DateTime<Utc>,
    pub sunrise_time: DateTime<Utc>,
    pub sunset_time: DateTime<Utc>,
    pub golden_hour_start: DateTime<Utc>,
    pub golden_hour_end: DateTime<Utc>,
    pub solar_noon: DateTime<Utc>,
    pub dawn: DateTime<Utc>,
    pub dusk: DateTime<Utc>,
    /// Compass bearing, degrees, 0 = true north, increasing clockwise, in [0, 360).
    pub azimuth: f64,
    /// Degrees above (+) or below (-) the local horizon.
    pub altitude: f64,
}
