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

//! Slippy-map tile elevation strategy: one HTTPS fetch per distinct terrain
//! tile, decoded per the Terrarium RGB encoding, with in-flight requests for
//! the same tile coalesced onto a single fetch.

use async_trait::async_trait;
use image::GenericImageView;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::OnceCell;

use super::{finish, partition_cache_hits, ElevationCache, ElevationService, ProgressFn};
use crate::error::PipelineError;
use crate::types::{Coordinate, ElevatedPoint};

const TILE_SIZE: f64 = 256.0;
const DEFAULT_ZOOM: u8 = 12; // ~9.5 km/tile at the equator

type TileKey = (u8, u32, u32);

struct DecodedTile {
    pixels: Vec<(u8, u8, u8)>, // row-major, TILE_SIZE x TILE_SIZE
}

impl DecodedTile {
    fn elevation_at(&self, px: usize, py: usize) -> f64 {
        let (r, g, b) = self.pixels[py * TILE_SIZE as usize + px];
        r as f64 * 256.0 + g as f64 + b as f64 / 256.0 - 32_768.0
    }
}

/// Slippy-map `(z, x, y)` for a coordinate at `zoom`.
fn tile_index(coordinate: Coordinate, zoom: u8) -> TileKey {
    let n = 2f64.powi(zoom as i32);
    let x = ((coordinate.lng + 180.0) / 360.0 * n).floor() as u32;
    let lat_rad = coordinate.lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor() as u32;
    (zoom, x, y)
}

/// Pixel-in-tile coordinates for a point known to fall within tile `(zoom, tile_x, tile_y)`.
fn pixel_in_tile(coordinate: Coordinate, zoom: u8, tile_x: u32, tile_y: u32) -> (usize, usize) {
    let n = 2f64.powi(zoom as i32);
    let x_merc = (coordinate.lng + 180.0) / 360.0 * n;
    let lat_rad = coordinate.lat.to_radians();
    let y_merc = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n;

    let px = ((x_merc - tile_x as f64) * TILE_SIZE).floor().clamp(0.0, 255.0) as usize;
    let py = ((y_merc - tile_y as f64) * TILE_SIZE).floor().clamp(0.0, 255.0) as usize;
    (px, py)
}

/// Tile-based elevation provider over a Terrarium-encoded tileset.
///
/// `tile_url_template` must contain literal `{z}`, `{x}`, `{y}` placeholders,
/// e.g. `https://elevation-tiles-prod.s3.amazonaws.com/terrarium/{z}/{x}/{y}.png`.
pub struct TileElevationService {
    client: reqwest::Client,
    tile_url_template: String,
    zoom: u8,
    cache: ElevationCache,
    in_flight: StdMutex<HashMap<TileKey, Arc<OnceCell<Option<Arc<DecodedTile>>>>>>,
}

impl TileElevationService {
    pub fn new(tile_url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            tile_url_template: tile_url_template.into(),
            zoom: DEFAULT_ZOOM,
            cache: ElevationCache::new(),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    fn tile_url(&self, key: TileKey) -> String {
        self.tile_url_template
            .replace("{z}", &key.0.to_string())
            .replace("{x}", &key.1.to_string())
            .replace("{y}", &key.2.to_string())
    }

    async fn fetch_tile(&self, key: TileKey) -> Option<Arc<DecodedTile>> {
        let response = self.client.get(self.tile_url(key)).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let bytes = response.bytes().await.ok()?;
        let image = image::load_from_memory(&bytes).ok()?;
        let (width, height) = image.dimensions();
        if width as f64 != TILE_SIZE || height as f64 != TILE_SIZE {
            return None;
        }
        let rgb = image.to_rgb8();
        let pixels = rgb.pixels().map(|p| (p[0], p[1], p[2])).collect();
        Some(Arc::new(DecodedTile { pixels }))
    }

    /// Returns the decoded tile for `key`, fetching it once even if many
    /// callers request it concurrently: the cache value is a shared
    /// `OnceCell` future, not the resolved tile, per the coalescing rule.
    async fn get_or_fetch_tile(&self, key: TileKey) -> Option<Arc<DecodedTile>> {
        let cell = {
            let mut guard = self.in_flight.lock().expect("in-flight tile map poisoned");
            guard
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_init(|| self.fetch_tile(key)).await.clone()
    }

}

#[async_trait]
impl ElevationService for TileElevationService {
    async fn resolve(
        &self,
        points: &[Coordinate],
        progress: &ProgressFn<'_>,
    ) -> Result<Vec<ElevatedPoint>, PipelineError> {
        let (mut results, miss_indices) = partition_cache_hits(points, &self.cache);
        let total = points.len() as u64;
        let mut completed = total - miss_indices.len() as u64;
        progress(completed, total);

        // Group misses by the tile they fall into so each distinct tile is
        // fetched at most once, regardless of how many points land in it.
        let mut by_tile: HashMap<TileKey, Vec<usize>> = HashMap::new();
        for &idx in &miss_indices {
            let key = tile_index(points[idx], self.zoom);
            by_tile.entry(key).or_default().push(idx);
        }

        for (key, indices) in by_tile {
            let tile = self.get_or_fetch_tile(key).await;
            for idx in indices {
                let elevation = tile.as_ref().map(|t| {
                    let (px, py) = pixel_in_tile(points[idx], key.0, key.1, key.2);
                    t.elevation_at(px, py)
                });
                if let Some(elevation) = elevation {
                    self.cache.insert(points[idx], elevation);
                }
                results[idx] = elevation;
                completed += 1;
            }
            progress(completed, total);
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
    fn tile_index_is_stable_within_a_tile() {
        let a = Coordinate::new(45.50, -122.65);
        let b = Coordinate::new(45.51, -122.64);
        assert_eq!(tile_index(a, DEFAULT_ZOOM), tile_index(b, DEFAULT_ZOOM));
    }

    #[test]
    fn pixel_in_tile_is_clamped_to_byte_range() {
        let coordinate = Coordinate::new(45.5231, -122.6765);
        let key = tile_index(coordinate, DEFAULT_ZOOM);
        let (px, py) = pixel_in_tile(coordinate, key.0, key.1, key.2);
        assert!(px <= 255);
        assert!(py <= 255);
    }

    #[test]
    fn terrarium_decode_matches_formula() {
        let tile = DecodedTile {
            pixels: vec![(10, 20, 128); (TILE_SIZE * TILE_SIZE) as usize],
        };
        let expected = 10.0 * 256.0 + 20.0 + 128.0 / 256.0 - 32_768.0;
        assert_eq!(tile.elevation_at(0, 0), expected);
    }
}
