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

//! Orchestrates a full viewpoint-finding run: solar → grid → elevation →
//! viewshed → score, with coarse progress milestones and cooperative
//! cancellation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{PipelineOptions, RunRequest};
use crate::elevation::ElevationService;
use crate::error::PipelineError;
use crate::grid::generate_grid;
use crate::scorer;
use crate::solar;
use crate::types::{Candidate, Coordinate, ScoredCandidate, SunData};
use crate::viewshed;

/// Progress milestones, percent complete in `[0, 100]`.
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// Long-lived handles a caller constructs once and reuses across runs, so
/// caches persist between invocations per §5's "shared across runs" rule.
#[derive(Clone)]
pub struct PipelineHandles {
    pub elevation_service: Arc<dyn ElevationService>,
}

impl PipelineHandles {
    pub fn new(elevation_service: Arc<dyn ElevationService>) -> Self {
        Self { elevation_service }
    }
}

/// Full result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub sun: SunData,
    pub candidates: Vec<ScoredCandidate>,
}

fn scale(local_completed: u64, local_total: u64, range_start: u8, range_end: u8) -> u8 {
    if local_total == 0 {
        return range_end;
    }
    let span = (range_end - range_start) as f64;
    let fraction = local_completed as f64 / local_total as f64;
    (range_start as f64 + span * fraction).round() as u8
}

/// Runs the full pipeline for `request`, reporting coarse milestones through
/// `progress` and honoring `cancel`. One-run-at-a-time is the caller's
/// responsibility: cancel a prior token before starting a new run.
pub async fn run_pipeline(
    request: RunRequest,
    handles: &PipelineHandles,
    progress: &ProgressFn<'_>,
    cancel: &CancellationToken,
) -> Result<PipelineOutput, PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let sun = solar::sun_data(
        request.center.lat,
        request.center.lng,
        request.local_noon,
        request.mode,
    );
    progress(10);

    let grid = generate_grid(
        request.center,
        request.radius_m,
        request.options.grid_spacing_m,
    );
    log::debug!("generated {} candidate grid points", grid.len());

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    // Elevation fetch: 10-50%.
    let candidates = resolve_candidate_grid(&grid, handles, progress, cancel).await?;

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    // Ray elevation fetch: 50-80%. Obstruction sweep: 80-95%.
    let analyzed = resolve_viewshed(
        &candidates,
        sun.azimuth,
        sun.altitude,
        handles,
        &request.options,
        progress,
        cancel,
    )
    .await?;

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    // Ranking: 95-100%.
    let scoring_options = request
        .options
        .scoring_options(request.center, request.radius_m);
    let ranked = scorer::rank(&analyzed, &scoring_options);
    progress(100);

    Ok(PipelineOutput { sun, candidates: ranked })
}

async fn resolve_candidate_grid(
    grid: &[Coordinate],
    handles: &PipelineHandles,
    progress: &ProgressFn<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<Candidate>, PipelineError> {
    let sub_progress = |completed: u64, total: u64| {
        progress(scale(completed, total, 10, 50));
    };

    let elevated = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        result = handles.elevation_service.resolve(grid, &sub_progress) => result?,
    };

    Ok(grid
        .iter()
        .zip(elevated)
        .filter_map(|(coordinate, point)| {
            point.elevation.map(|elevation| Candidate {
                coordinate: *coordinate,
                elevation,
            })
        })
        .collect())
}

async fn resolve_viewshed(
    candidates: &[Candidate],
    sun_azimuth: f64,
    sun_altitude: f64,
    handles: &PipelineHandles,
    options: &PipelineOptions,
    progress: &ProgressFn<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<crate::types::AnalyzedCandidate>, PipelineError> {
    let viewshed_options = options.viewshed_options();
    let ray_progress = |completed: u64, total: u64| {
        progress(scale(completed, total, 50, 80));
    };
    let sweep_progress = |completed: u64, total: u64| {
        progress(scale(completed, total, 80, 95));
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = viewshed::analyze(
            candidates,
            sun_azimuth,
            sun_altitude,
            handles.elevation_service.as_ref(),
            &viewshed_options,
            &ray_progress,
            &sweep_progress,
        ) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_maps_sub_progress_into_a_milestone_range() {
        assert_eq!(scale(0, 100, 10, 50), 10);
        assert_eq!(scale(100, 100, 10, 50), 50);
        assert_eq!(scale(50, 100, 10, 50), 30);
    }

    #[test]
    fn scale_with_zero_total_reports_range_end() {
        assert_eq!(scale(0, 0, 50, 95), 95);
    }
}
