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

//! Pipeline configuration: per-run request parameters and tunable options,
//! with an optional YAML file as an alternative to constructing them in code.

use std::error::Error;
use std::fs::File;
use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::grid::DEFAULT_SPACING_M;
use crate::scorer::ScoringOptions;
use crate::types::{Coordinate, Mode};
use crate::viewshed::{
    CURVATURE_THRESHOLD_M, HORIZON_MARGIN_DEG, RAY_MAX_DISTANCE_M, RAY_SAMPLE_SPACING_M,
};

pub fn default_radius_m() -> f64 {
    10_000.0
}

pub fn default_grid_spacing_m() -> f64 {
    DEFAULT_SPACING_M
}

pub fn default_mode() -> Mode {
    Mode::Sunset
}

pub fn default_ray_sample_spacing_m() -> f64 {
    RAY_SAMPLE_SPACING_M
}

pub fn default_ray_max_distance_m() -> f64 {
    RAY_MAX_DISTANCE_M
}

pub fn default_curvature_threshold_m() -> f64 {
    CURVATURE_THRESHOLD_M
}

pub fn default_horizon_margin_deg() -> f64 {
    HORIZON_MARGIN_DEG
}

pub fn default_elevation_batch_size() -> usize {
    200
}

pub fn default_elevation_concurrency() -> usize {
    2
}

/// Tunable knobs shared by the grid, viewshed, and scoring stages.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineOptions {
    #[serde(default = "default_grid_spacing_m")]
    pub grid_spacing_m: f64,
    #[serde(default = "default_ray_sample_spacing_m")]
    pub ray_sample_spacing_m: f64,
    #[serde(default = "default_ray_max_distance_m")]
    pub ray_max_distance_m: f64,
    #[serde(default = "default_curvature_threshold_m")]
    pub curvature_threshold_m: f64,
    #[serde(default = "default_horizon_margin_deg")]
    pub horizon_margin_deg: f64,
    #[serde(default = "default_elevation_batch_size")]
    pub elevation_batch_size: usize,
    #[serde(default = "default_elevation_concurrency")]
    pub elevation_concurrency: usize,
    /// Runs Phase B of the viewshed sweep sequentially instead of on the
    /// rayon worker pool; for tests and environments without a thread pool.
    #[serde(default)]
    pub single_threaded: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            grid_spacing_m: default_grid_spacing_m(),
            ray_sample_spacing_m: default_ray_sample_spacing_m(),
            ray_max_distance_m: default_ray_max_distance_m(),
            curvature_threshold_m: default_curvature_threshold_m(),
            horizon_margin_deg: default_horizon_margin_deg(),
            elevation_batch_size: default_elevation_batch_size(),
            elevation_concurrency: default_elevation_concurrency(),
            single_threaded: false,
        }
    }
}

impl PipelineOptions {
    pub(crate) fn scoring_options(&self, center: Coordinate, radius_m: f64) -> ScoringOptions {
        ScoringOptions {
            center: Some(center),
            max_radius_m: radius_m,
        }
    }

    pub(crate) fn viewshed_options(&self) -> crate::viewshed::ViewshedOptions {
        crate::viewshed::ViewshedOptions {
            ray_sample_spacing_m: self.ray_sample_spacing_m,
            ray_max_distance_m: self.ray_max_distance_m,
            curvature_threshold_m: self.curvature_threshold_m,
            horizon_margin_deg: self.horizon_margin_deg,
            single_threaded: self.single_threaded,
        }
    }
}

/// A single pipeline invocation: where to search, when, and in which mode.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub center: Coordinate,
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    pub local_noon: DateTime<Utc>,
    #[serde(default)]
    pub options: PipelineOptions,
}

/// Loads a `RunRequest` from a YAML file. Unlike the teacher's
/// `load_from_yaml`, a missing file is an error here: `center`/`local_noon`
/// have no sensible process-wide defaults the way observer coordinates did.
pub fn load_from_yaml(file_path: &str) -> Result<RunRequest, Box<dyn Error>> {
    let mut contents = String::new();
    let mut file = File::open(file_path)?;
    file.read_to_string(&mut contents)?;
    let request: RunRequest = serde_yaml::from_str(&contents)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_options_default_matches_module_constants() {
        let options = PipelineOptions::default();
        assert_eq!(options.ray_sample_spacing_m, RAY_SAMPLE_SPACING_M);
        assert_eq!(options.ray_max_distance_m, RAY_MAX_DISTANCE_M);
    }

    #[test]
    fn run_request_deserializes_with_defaults() {
        let yaml = "center:\n  lat: 45.5231\n  lng: -122.6765\nlocal_noon: 2024-06-20T19:00:00Z\n";
        let request: RunRequest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.radius_m, default_radius_m());
        assert_eq!(request.mode, Mode::Sunset);
    }
}
