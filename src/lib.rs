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

//! Finds the best nearby viewpoints for watching sunset or sunrise over
//! terrain: given a center point and search radius, generates a hex-packed
//! candidate grid, resolves terrain elevation, sweeps each candidate's view
//! toward the sun for terrain obstruction, and scores/ranks the results.

pub mod config;
pub mod elevation;
pub mod error;
pub mod geocoder;
pub mod geodesy;
pub mod grid;
pub mod pipeline;
pub mod scorer;
pub mod solar;
pub mod types;
pub mod util;
pub mod viewshed;

pub use config::{PipelineOptions, RunRequest};
pub use error::PipelineError;
pub use pipeline::{run_pipeline, PipelineHandles, PipelineOutput};
pub use types::{
    AnalyzedCandidate, Candidate, Coordinate, ElevatedPoint, Mode, Obstruction, RaySample,
    ScoredCandidate, SunData, ViewQuality,
};
