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

//! Small shared helpers: retry with exponential backoff, chunking, bounded
//! concurrency.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

/// Retries `op` up to `max_attempts` times with exponential backoff
/// (`base * factor^attempt`), returning the last error if all attempts fail.
pub async fn retry_backoff<T, E, F, Fut>(
    max_attempts: u32,
    base: Duration,
    factor: f64,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(err);
                }
                let delay = base.mul_f64(factor.powi(attempt as i32 - 1));
                log::warn!("attempt {attempt} failed, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Splits `items` into chunks of at most `size` elements.
pub fn chunked<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    use itertools::Itertools;
    items.iter().cloned().chunks(size).into_iter().map(|c| c.collect()).collect()
}

/// Builds a `Semaphore`-backed concurrency bound shareable across spawned or
/// concurrently-polled futures via `Arc::clone`.
pub fn bounded_concurrency(limit: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(limit))
}
