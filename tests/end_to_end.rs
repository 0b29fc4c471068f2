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

//! End-to-end pipeline scenarios driven through `run_pipeline` against a
//! fake, in-memory elevation service (no network).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use viewfinder::config::{PipelineOptions, RunRequest};
use viewfinder::elevation::{ElevationCache, ElevationService, ProgressFn};
use viewfinder::error::PipelineError;
use viewfinder::pipeline::{run_pipeline, PipelineHandles};
use viewfinder::types::{Coordinate, ElevatedPoint, Mode};

/// An elevation service backed by a closure over `(lat, lng) -> elevation`,
/// for deterministic fixtures (flat plains, single ridges).
struct FakeElevationService<F> {
    terrain: F,
    cache: ElevationCache,
}

impl<F> FakeElevationService<F>
where
    F: Fn(Coordinate) -> f64 + Send + Sync,
{
    fn new(terrain: F) -> Self {
        Self {
            terrain,
            cache: ElevationCache::new(),
        }
    }
}

#[async_trait]
impl<F> ElevationService for FakeElevationService<F>
where
    F: Fn(Coordinate) -> f64 + Send + Sync,
{
    async fn resolve(
        &self,
        points: &[Coordinate],
        progress: &ProgressFn<'_>,
    ) -> Result<Vec<ElevatedPoint>, PipelineError> {
        let total = points.len() as u64;
        let results = points
            .iter()
            .enumerate()
            .map(|(i, &coordinate)| {
                progress(i as u64 + 1, total);
                ElevatedPoint {
                    coordinate,
                    elevation: Some((self.terrain)(coordinate)),
                }
            })
            .collect();
        Ok(results)
    }

    fn cache(&self) -> &ElevationCache {
        &self.cache
    }
}

fn portland() -> Coordinate {
    Coordinate::new(45.5231, -122.6765)
}

#[tokio::test]
async fn flat_plain_every_candidate_is_clear() {
    let elevation_service: Arc<dyn ElevationService> =
        Arc::new(FakeElevationService::new(|_| 100.0));
    let handles = PipelineHandles::new(elevation_service);
    let cancel = CancellationToken::new();

    let request = RunRequest {
        center: portland(),
        radius_m: 1_000.0,
        mode: Mode::Sunset,
        local_noon: Utc.with_ymd_and_hms(2024, 6, 21, 20, 0, 0).unwrap(),
        options: PipelineOptions {
            grid_spacing_m: 500.0,
            single_threaded: true,
            ..PipelineOptions::default()
        },
    };

    let output = run_pipeline(request, &handles, &|_| {}, &cancel)
        .await
        .expect("pipeline run should succeed");

    assert!(!output.candidates.is_empty());
    for candidate in &output.candidates {
        assert!(candidate.is_clear, "flat terrain should leave every candidate clear");
    }

    let mut ranks: Vec<u32> = output.candidates.iter().map(|c| c.rank).collect();
    ranks.sort();
    let expected: Vec<u32> = (1..=ranks.len() as u32).collect();
    assert_eq!(ranks, expected);
}

#[tokio::test]
async fn cancelled_token_aborts_before_elevation_fetch() {
    let elevation_service: Arc<dyn ElevationService> =
        Arc::new(FakeElevationService::new(|_| 100.0));
    let handles = PipelineHandles::new(elevation_service);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let request = RunRequest {
        center: portland(),
        radius_m: 1_000.0,
        mode: Mode::Sunset,
        local_noon: Utc.with_ymd_and_hms(2024, 6, 21, 20, 0, 0).unwrap(),
        options: PipelineOptions::default(),
    };

    let result = run_pipeline(request, &handles, &|_| {}, &cancel).await;
    assert!(matches!(result, Err(PipelineError::Cancelled)));
}

#[tokio::test]
async fn all_elevations_missing_is_fatal() {
    struct AlwaysMissing {
        cache: ElevationCache,
    }

    #[async_trait]
    impl ElevationService for AlwaysMissing {
        async fn resolve(
            &self,
            points: &[Coordinate],
            _progress: &ProgressFn<'_>,
        ) -> Result<Vec<ElevatedPoint>, PipelineError> {
            if points.is_empty() {
                return Ok(Vec::new());
            }
            Err(PipelineError::AllElevationsFailed)
        }

        fn cache(&self) -> &ElevationCache {
            &self.cache
        }
    }

    let elevation_service: Arc<dyn ElevationService> = Arc::new(AlwaysMissing {
        cache: ElevationCache::new(),
    });
    let handles = PipelineHandles::new(elevation_service);
    let cancel = CancellationToken::new();

    let request = RunRequest {
        center: portland(),
        radius_m: 1_000.0,
        mode: Mode::Sunset,
        local_noon: Utc.with_ymd_and_hms(2024, 6, 21, 20, 0, 0).unwrap(),
        options: PipelineOptions::default(),
    };

    let result = run_pipeline(request, &handles, &|_| {}, &cancel).await;
    assert!(matches!(result, Err(PipelineError::AllElevationsFailed)));
}
