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

//! Batched-HTTP elevation provider strategy: a primary provider returning
//! elevations in request order, with a secondary object-list provider as
//! fallback. Requests are chunked and fanned out across a bounded pool of
//! concurrent batches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{finish, partition_cache_hits, ElevationCache, ElevationService, ProgressFn};
use crate::error::PipelineError;
use crate::types::{Coordinate, ElevatedPoint};
use crate::util::{bounded_concurrency, chunked, retry_backoff};

const DEFAULT_BATCH_SIZE: usize = 200;
const DEFAULT_CONCURRENCY: usize = 2;
const RETRY_ATTEMPTS: u32 = 2;
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_FACTOR: f64 = 2.0;

#[derive(Debug, Deserialize)]
struct PrimaryResponse {
    elevation: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct SecondaryLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct SecondaryRequest {
    locations: Vec<SecondaryLocation>,
}

#[derive(Debug, Deserialize)]
struct SecondaryResult {
    elevation: f64,
}

#[derive(Debug, Deserialize)]
struct SecondaryResponse {
    results: Vec<SecondaryResult>,
}

/// HTTP-batch elevation provider. `primary_url`/`fallback_url` are the base
/// endpoints described in the external-interfaces contract: the primary
/// returns an ordered `{"elevation": [..]}` array, the fallback an unordered
/// `{"results": [{"elevation": ..}]}` list re-zipped against the request.
pub struct ProviderElevationService {
    client: reqwest::Client,
    primary_url: String,
    fallback_url: Option<String>,
    cache: ElevationCache,
    batch_size: usize,
    concurrency: usize,
}

impl ProviderElevationService {
    pub fn new(primary_url: impl Into<String>, fallback_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            primary_url: primary_url.into(),
            fallback_url,
            cache: ElevationCache::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    async fn fetch_primary(&self, batch: &[Coordinate]) -> Result<Vec<f64>, PipelineError> {
        let coords = batch
            .iter()
            .map(|c| format!("{},{}", c.lat, c.lng))
            .collect::<Vec<_>>()
            .join("|");
        let url = format!("{}?locations={}", self.primary_url, coords);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::ProviderTransient(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PipelineError::ProviderTransient(format!(
                "primary provider returned {}",
                response.status()
            )));
        }
        let body: PrimaryResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ProviderTransient(e.to_string()))?;
        if body.elevation.len() != batch.len() {
            return Err(PipelineError::ProviderTransient(
                "primary provider returned mismatched elevation count".into(),
            ));
        }
        Ok(body.elevation)
    }

    async fn fetch_fallback(&self, batch: &[Coordinate]) -> Result<Vec<f64>, PipelineError> {
        let Some(url) = &self.fallback_url else {
            return Err(PipelineError::ProviderExhausted {
                batch_size: batch.len(),
            });
        };
        let request = SecondaryRequest {
            locations: batch
                .iter()
                .map(|c| SecondaryLocation {
                    latitude: c.lat,
                    longitude: c.lng,
                })
                .collect(),
        };
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::ProviderTransient(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PipelineError::ProviderTransient(format!(
                "fallback provider returned {}",
                response.status()
            )));
        }
        let body: SecondaryResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ProviderTransient(e.to_string()))?;
        if body.results.len() != batch.len() {
            return Err(PipelineError::ProviderTransient(
                "fallback provider returned mismatched result count".into(),
            ));
        }
        Ok(body.results.into_iter().map(|r| r.elevation).collect())
    }

    /// Resolves one batch, trying the primary provider with retries, then the
    /// fallback, then giving up (every entry resolves to `None`).
    async fn resolve_batch(&self, batch: &[Coordinate]) -> Vec<Option<f64>> {
        let primary = retry_backoff(RETRY_ATTEMPTS, RETRY_BASE, RETRY_FACTOR, || {
            self.fetch_primary(batch)
        })
        .await;

        match primary {
            Ok(elevations) => elevations.into_iter().map(Some).collect(),
            Err(_) => match self.fetch_fallback(batch).await {
                Ok(elevations) => elevations.into_iter().map(Some).collect(),
                Err(_) => vec![None; batch.len()],
            },
        }
    }
}

#[async_trait]
impl ElevationService for ProviderElevationService {
    async fn resolve(
        &self,
        points: &[Coordinate],
        progress: &ProgressFn<'_>,
    ) -> Result<Vec<ElevatedPoint>, PipelineError> {
        let (mut results, miss_indices) = partition_cache_hits(points, &self.cache);
        let total = points.len() as u64;
        let hits = total - miss_indices.len() as u64;

        let completed = Arc::new(AtomicU64::new(hits));
        progress(completed.load(Ordering::Relaxed), total);

        if miss_indices.is_empty() {
            return finish(points, results);
        }

        let miss_points: Vec<Coordinate> = miss_indices.iter().map(|&i| points[i]).collect();
        let batches = chunked(&miss_points, self.batch_size);
        let index_batches = chunked(&miss_indices, self.batch_size);

        let semaphore = bounded_concurrency(self.concurrency);
        let mut handles = Vec::new();
        for (batch, batch_indices) in batches.into_iter().zip(index_batches.into_iter()) {
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(&completed);
            // Borrows `self`; polled concurrently by `join_all` below rather than
            // spawned onto the runtime, so no `'static` bound is needed.
            let batch_len = batch.len() as u64;
            let fut = async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                let resolved = self.resolve_batch(&batch).await;
                completed.fetch_add(batch_len, Ordering::Relaxed);
                (batch_indices, resolved)
            };
            handles.push(fut);
        }

        let outcomes = futures::future::join_all(handles).await;
        for (batch_indices, resolved) in outcomes {
            for (idx, elevation) in batch_indices.into_iter().zip(resolved) {
                if let Some(elevation) = elevation {
                    self.cache.insert(points[idx], elevation);
                }
                results[idx] = elevation;
            }
            progress(completed.load(Ordering::Relaxed), total);
        }

        finish(points, results)
    }

    fn cache(&self) -> &ElevationCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batching_respects_configured_size() {
        let points: Vec<Coordinate> = (0..250).map(|i| Coordinate::new(i as f64, 0.0)).collect();
        let batches = chunked(&points, DEFAULT_BATCH_SIZE);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 200);
        assert_eq!(batches[1].len(), 50);
    }
}
