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

//! Error taxonomy for the viewpoint-finding pipeline.

use thiserror::Error;

/// Errors that can surface from `run_pipeline` or any of its stages.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("provider request failed, will retry: {0}")]
    ProviderTransient(String),

    #[error("provider exhausted retries for a batch of {batch_size} points")]
    ProviderExhausted { batch_size: usize },

    #[error("elevation data unavailable for the candidate grid")]
    AllElevationsFailed,

    #[error("{dropped} of {total} ray samples could not be resolved and were dropped")]
    RayElevationsPartial { dropped: usize, total: usize },

    #[error("viewshed analysis failed: {0}")]
    AnalysisFailure(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tile decode error: {0}")]
    TileDecode(String),
}
