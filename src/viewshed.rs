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

//! Ray-cast viewshed analysis: for each candidate, sweep a single ray along
//! the solar azimuth and compute how much terrain obstructs the horizon.

use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::elevation::{ElevationService, ProgressFn};
use crate::error::PipelineError;
use crate::geodesy::{curvature_drop, destination_point};
use crate::types::{
    AnalyzedCandidate, Candidate, Coordinate, ElevatedPoint, Obstruction, RaySample, ViewQuality,
};

pub const RAY_SAMPLE_SPACING_M: f64 = 300.0;
pub const RAY_MAX_DISTANCE_M: f64 = 8_000.0;
pub const CURVATURE_THRESHOLD_M: f64 = 2_000.0;
pub const HORIZON_MARGIN_DEG: f64 = 0.5;

/// Tunable viewshed parameters; defaults match the constants above.
#[derive(Debug, Clone, Copy)]
pub struct ViewshedOptions {
    pub ray_sample_spacing_m: f64,
    pub ray_max_distance_m: f64,
    pub curvature_threshold_m: f64,
    pub horizon_margin_deg: f64,
    /// Run Phase B on the calling thread instead of the rayon pool; used in
    /// tests and environments without a worker facility.
    pub single_threaded: bool,
}

impl Default for ViewshedOptions {
    fn default() -> Self {
        Self {
            ray_sample_spacing_m: RAY_SAMPLE_SPACING_M,
            ray_max_distance_m: RAY_MAX_DISTANCE_M,
            curvature_threshold_m: CURVATURE_THRESHOLD_M,
            horizon_margin_deg: HORIZON_MARGIN_DEG,
            single_threaded: false,
        }
    }
}

fn ray_distances(options: &ViewshedOptions) -> Vec<f64> {
    let mut distances = Vec::new();
    let mut d = options.ray_sample_spacing_m;
    while d <= options.ray_max_distance_m + 1e-6 {
        distances.push(d);
        d += options.ray_sample_spacing_m;
    }
    distances
}

/// Phase A + B: resolves ray elevations via `elevation_service`, then sweeps
/// each candidate's samples for terrain obstruction (§4.5). `ray_progress`
/// covers Phase A (elevation fetch), `sweep_progress` covers Phase B
/// (obstruction sweep) — the two are separate milestones, not one band.
pub async fn analyze(
    candidates: &[Candidate],
    sun_azimuth: f64,
    sun_altitude: f64,
    elevation_service: &dyn ElevationService,
    options: &ViewshedOptions,
    ray_progress: &ProgressFn<'_>,
    sweep_progress: &ProgressFn<'_>,
) -> Result<Vec<AnalyzedCandidate>, PipelineError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let distances = ray_distances(options);

    // Phase A: expand every candidate's ray into flat coordinate + distance lists.
    let mut flat_points: Vec<Coordinate> = Vec::with_capacity(candidates.len() * distances.len());
    let mut flat_distances: Vec<f64> = Vec::with_capacity(flat_points.capacity());
    for candidate in candidates {
        for &distance in &distances {
            flat_points.push(destination_point(candidate.coordinate, sun_azimuth, distance));
            flat_distances.push(distance);
        }
    }

    // Per spec.md §4.7/§7, ray-elevation failures are never fatal for the run
    // (only the candidate-grid elevation fetch is) — even total failure here
    // degrades to zero surviving samples per candidate rather than aborting.
    let elevated = match elevation_service.resolve(&flat_points, ray_progress).await {
        Ok(elevated) => elevated,
        Err(PipelineError::AllElevationsFailed) => flat_points
            .iter()
            .map(|&coordinate| ElevatedPoint {
                coordinate,
                elevation: None,
            })
            .collect(),
        Err(err) => return Err(err),
    };
    ray_progress(flat_points.len() as u64, flat_points.len() as u64);

    let samples_per_candidate = distances.len();
    let mut dropped = 0usize;
    let total_samples = elevated.len();

    // Phase B input: per-candidate list of samples that resolved.
    let mut per_candidate_samples: Vec<Vec<RaySample>> = Vec::with_capacity(candidates.len());
    for chunk_idx in 0..candidates.len() {
        let start = chunk_idx * samples_per_candidate;
        let end = start + samples_per_candidate;
        let mut samples = Vec::with_capacity(samples_per_candidate);
        for i in start..end {
            match elevated[i].elevation {
                Some(elevation) => samples.push(RaySample {
                    coordinate: flat_points[i],
                    distance: flat_distances[i],
                    elevation,
                }),
                None => dropped += 1,
            }
        }
        per_candidate_samples.push(samples);
    }

    if dropped > 0 {
        // Non-fatal per the error taxonomy: logged, never returned as `Err`.
        log::warn!(
            "{}",
            PipelineError::RayElevationsPartial {
                dropped,
                total: total_samples,
            }
        );
    }

    // Phase B is CPU-bound; run it off the async executor's thread (§5's
    // worker-pool note) via rayon inside a blocking task, with a sequential
    // fallback for callers that ask for deterministic ordering (tests). The
    // blocking closure must be `'static`, so progress is relayed through a
    // shared atomic counter that this async fn polls rather than calling
    // `sweep_progress` directly from inside the worker pool.
    let owned_candidates: Vec<Candidate> = candidates.to_vec();
    let options = *options;
    let total = owned_candidates.len() as u64;

    let results = if options.single_threaded {
        let completed = AtomicU64::new(0);
        owned_candidates
            .iter()
            .zip(per_candidate_samples.iter())
            .map(|(candidate, samples)| {
                let analyzed = build_analyzed(candidate, samples, sun_azimuth, sun_altitude, &options);
                let c = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if c % 100 == 0 || c == total {
                    sweep_progress(c, total);
                }
                analyzed
            })
            .collect()
    } else {
        // Kept for the `AnalysisFailure` fallback (§7: "Fall back to
        // in-orchestrator computation; log"), since the rayon closure below
        // takes ownership of its own copies.
        let candidates_for_fallback = owned_candidates.clone();
        let samples_for_fallback = per_candidate_samples.clone();

        let completed = Arc::new(AtomicU64::new(0));
        let completed_for_worker = Arc::clone(&completed);
        let worker = tokio::task::spawn_blocking(move || {
            owned_candidates
                .par_iter()
                .zip(per_candidate_samples.par_iter())
                .map(|(candidate, samples)| {
                    let analyzed =
                        build_analyzed(candidate, samples, sun_azimuth, sun_altitude, &options);
                    completed_for_worker.fetch_add(1, Ordering::Relaxed);
                    analyzed
                })
                .collect::<Vec<_>>()
        });
        tokio::pin!(worker);

        let mut reported = 0u64;
        let results = loop {
            tokio::select! {
                biased;
                joined = &mut worker => {
                    match joined {
                        Ok(result) => break result,
                        Err(join_err) => {
                            log::warn!(
                                "{}",
                                PipelineError::AnalysisFailure(join_err.to_string())
                            );
                            break candidates_for_fallback
                                .iter()
                                .zip(samples_for_fallback.iter())
                                .map(|(candidate, samples)| {
                                    build_analyzed(candidate, samples, sun_azimuth, sun_altitude, &options)
                                })
                                .collect();
                        }
                    }
                }
                _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {
                    let c = completed.load(Ordering::Relaxed);
                    if c - reported >= 100 {
                        sweep_progress(c, total);
                        reported = c;
                    }
                }
            }
        };
        sweep_progress(total, total);
        results
    };

    Ok(results)
}

fn build_analyzed(
    candidate: &Candidate,
    samples: &[RaySample],
    sun_azimuth: f64,
    sun_altitude: f64,
    options: &ViewshedOptions,
) -> AnalyzedCandidate {
    let obstruction = sweep_obstruction(candidate.elevation, samples, options);
    AnalyzedCandidate {
        coordinate: candidate.coordinate,
        elevation: candidate.elevation,
        obstruction_angle: obstruction.obstruction_angle,
        max_blocker_distance: obstruction.max_blocker_distance,
        max_blocker_elevation: obstruction.max_blocker_elevation,
        is_clear: obstruction.is_clear,
        sun_azimuth,
        sun_altitude,
        view_quality: ViewQuality::from_is_clear(obstruction.is_clear),
    }
}

/// Sweeps one candidate's ray samples for terrain obstruction.
fn sweep_obstruction(
    candidate_elevation: f64,
    samples: &[RaySample],
    options: &ViewshedOptions,
) -> Obstruction {
    let mut max_angle = f64::NEG_INFINITY;
    let mut max_blocker_distance = 0.0;
    let mut max_blocker_elevation = 0.0;

    for sample in samples {
        let mut terrain = sample.elevation;
        if sample.distance > options.curvature_threshold_m {
            terrain -= curvature_drop(sample.distance);
        }
        let delta = terrain - candidate_elevation;
        let angle = delta.atan2(sample.distance).to_degrees();
        if angle > max_angle {
            max_angle = angle;
            max_blocker_distance = sample.distance;
            max_blocker_elevation = sample.elevation; // pre-curvature, per the obstruction record
        }
    }

    if samples.is_empty() {
        return Obstruction {
            obstruction_angle: -90.0,
            max_blocker_distance: 0.0,
            max_blocker_elevation: 0.0,
            is_clear: true,
        };
    }

    let is_clear = max_angle < options.horizon_margin_deg;
    Obstruction {
        obstruction_angle: max_angle,
        max_blocker_distance,
        max_blocker_elevation,
        is_clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_samples(elevation: f64, options: &ViewshedOptions) -> Vec<RaySample> {
        ray_distances(options)
            .into_iter()
            .map(|d| RaySample {
                coordinate: Coordinate::new(0.0, 0.0),
                distance: d,
                elevation,
            })
            .collect()
    }

    fn sample_near(samples: &mut [RaySample], distance: f64, elevation: f64) {
        for s in samples.iter_mut() {
            if (s.distance - distance).abs() < 1.0 {
                s.elevation = elevation;
            }
        }
    }

    #[test]
    fn flat_plain_is_clear() {
        let options = ViewshedOptions::default();
        let samples = flat_samples(100.0, &options);
        let obstruction = sweep_obstruction(100.0, &samples, &options);
        assert!(obstruction.obstruction_angle < 1.0);
        assert!(obstruction.is_clear);
    }

    #[test]
    fn ridge_at_600m_1km_away_is_obstructed() {
        let options = ViewshedOptions::default();
        let mut samples = flat_samples(100.0, &options);
        sample_near(&mut samples, 1_000.0, 600.0);
        let obstruction = sweep_obstruction(100.0, &samples, &options);
        assert!(!obstruction.is_clear);
        assert_eq!(obstruction.max_blocker_distance, 1_000.0);
        let expected = (500f64).atan2(1_000.0).to_degrees();
        assert!((obstruction.obstruction_angle - expected).abs() < 1e-6);
    }

    #[test]
    fn empty_samples_yield_maximally_clear_result() {
        let options = ViewshedOptions::default();
        let obstruction = sweep_obstruction(100.0, &[], &options);
        assert_eq!(obstruction.obstruction_angle, -90.0);
        assert_eq!(obstruction.max_blocker_distance, 0.0);
        assert!(obstruction.is_clear);
    }

    #[test]
    fn curvature_correction_clears_a_small_blocker_at_5km() {
        let options = ViewshedOptions::default();
        let mut samples = flat_samples(100.0, &options);
        sample_near(&mut samples, 5_000.0, 101.0); // +1 m over candidate elevation
        let obstruction = sweep_obstruction(100.0, &samples, &options);
        assert!(
            obstruction.is_clear,
            "curvature_drop(5000) ~= 1.96m should clear a +1m blocker"
        );
    }

    #[test]
    fn obstruction_angle_is_monotonic_in_blocker_height() {
        let options = ViewshedOptions::default();
        let mut low = flat_samples(100.0, &options);
        let mut high = flat_samples(100.0, &options);
        sample_near(&mut low, 1_000.0, 300.0);
        sample_near(&mut high, 1_000.0, 600.0);
        let low_obstruction = sweep_obstruction(100.0, &low, &options);
        let high_obstruction = sweep_obstruction(100.0, &high, &options);
        assert!(high_obstruction.obstruction_angle > low_obstruction.obstruction_angle);
    }

    #[test]
    fn zero_candidates_short_circuits_without_touching_the_elevation_service() {
        use crate::elevation::ElevationCache;
        use async_trait::async_trait;

        struct Unreachable {
            cache: ElevationCache,
        }

        #[async_trait]
        impl ElevationService for Unreachable {
            async fn resolve(
                &self,
                _points: &[Coordinate],
                _progress: &ProgressFn<'_>,
            ) -> Result<Vec<ElevatedPoint>, PipelineError> {
                panic!("should not be called for an empty candidate list");
            }

            fn cache(&self) -> &ElevationCache {
                &self.cache
            }
        }

        let service = Unreachable {
            cache: ElevationCache::new(),
        };
        let options = ViewshedOptions::default();

        let result = futures::executor::block_on(analyze(
            &[],
            270.0,
            1.0,
            &service,
            &options,
            &|_, _| {},
            &|_, _| {},
        ));
        assert!(result.unwrap().is_empty());
    }
}
