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

//! Bulk elevation resolution with caching and pluggable provider/tile strategies.

pub mod provider;
pub mod tile;

use async_trait::async_trait;
use moka::sync::Cache;

use crate::error::PipelineError;
use crate::types::{Coordinate, ElevatedPoint};

/// Progress callback: `(completed, total)`, `completed` includes cache hits.
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Rounds a coordinate to 5 decimal places (~1.1 m at the equator) for cache keying.
fn cache_key(c: Coordinate) -> (i32, i32) {
    (
        (c.lat * 100_000.0).round() as i32,
        (c.lng * 100_000.0).round() as i32,
    )
}

/// Process-lifetime cache of resolved elevations, keyed by rounded coordinate.
///
/// Backed by `moka`, which is safe for concurrent reads/writes without caller-side
/// locking. Append-only in normal operation; `clear()` exists for tests.
#[derive(Clone)]
pub struct ElevationCache {
    inner: Cache<(i32, i32), f64>,
}

impl ElevationCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().max_capacity(2_000_000).build(),
        }
    }

    pub fn get(&self, coordinate: Coordinate) -> Option<f64> {
        self.inner.get(&cache_key(coordinate))
    }

    pub fn insert(&self, coordinate: Coordinate, elevation: f64) {
        self.inner.insert(cache_key(coordinate), elevation);
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for ElevationCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves elevations for arbitrary points in bulk, preserving input order.
#[async_trait]
pub trait ElevationService: Send + Sync {
    async fn resolve(
        &self,
        points: &[Coordinate],
        progress: &ProgressFn<'_>,
    ) -> Result<Vec<ElevatedPoint>, PipelineError>;

    fn cache(&self) -> &ElevationCache;
}

/// Splits `points` into cache hits (already resolved) and the indices still missing,
/// preserving the original positions so a strategy only has to resolve the misses.
pub(crate) fn partition_cache_hits(
    points: &[Coordinate],
    cache: &ElevationCache,
) -> (Vec<Option<f64>>, Vec<usize>) {
    let mut results = Vec::with_capacity(points.len());
    let mut misses = Vec::new();
    for (i, point) in points.iter().enumerate() {
        match cache.get(*point) {
            Some(elevation) => results.push(Some(elevation)),
            None => {
                results.push(None);
                misses.push(i);
            }
        }
    }
    (results, misses)
}

/// Assembles the final `ElevatedPoint` vector, failing the whole call if every
/// point resolved to `None`.
pub(crate) fn finish(
    points: &[Coordinate],
    results: Vec<Option<f64>>,
) -> Result<Vec<ElevatedPoint>, PipelineError> {
    let any_resolved = results.iter().any(Option::is_some);
    if !points.is_empty() && !any_resolved {
        return Err(PipelineError::AllElevationsFailed);
    }
    Ok(points
        .iter()
        .zip(results)
        .map(|(coordinate, elevation)| ElevatedPoint {
            coordinate: *coordinate,
            elevation,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_skips_resolution() {
        let cache = ElevationCache::new();
        let point = Coordinate::new(45.5231, -122.6765);
        cache.insert(point, 123.4);
        let (results, misses) = partition_cache_hits(&[point], &cache);
        assert_eq!(results, vec![Some(123.4)]);
        assert!(misses.is_empty());
    }

    #[test]
    fn rounding_groups_nearby_coordinates() {
        let cache = ElevationCache::new();
        let a = Coordinate::new(45.00001, -122.00001);
        let b = Coordinate::new(45.000009, -122.000009);
        cache.insert(a, 10.0);
        assert_eq!(cache.get(b), Some(10.0));
    }

    #[test]
    fn all_failed_resolution_is_an_error() {
        let points = vec![Coordinate::new(0.0, 0.0)];
        let result = finish(&points, vec![None]);
        assert!(matches!(result, Err(PipelineError::AllElevationsFailed)));
    }

    #[test]
    fn partial_failure_is_not_fatal() {
        let points = vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)];
        let result = finish(&points, vec![Some(5.0), None]).unwrap();
        assert_eq!(result[0].elevation, Some(5.0));
        assert_eq!(result[1].elevation, None);
    }
}
