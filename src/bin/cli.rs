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

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Parser;
use log::LevelFilter;
use tokio_util::sync::CancellationToken;

use viewfinder::config::{PipelineOptions, RunRequest};
use viewfinder::elevation::tile::TileElevationService;
use viewfinder::pipeline::{run_pipeline, PipelineHandles};
use viewfinder::scorer::verdict;
use viewfinder::types::{Coordinate, Mode};

/// Finds the best nearby viewpoints for watching sunset or sunrise over terrain.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Center latitude, degrees.
    #[arg(long)]
    lat: f64,

    /// Center longitude, degrees.
    #[arg(long)]
    lng: f64,

    /// Search radius in meters.
    #[arg(long, default_value_t = 10_000.0)]
    radius: f64,

    /// "sunset" or "sunrise".
    #[arg(long, default_value = "sunset")]
    mode: String,

    /// Target date, YYYY-MM-DD (UTC, evaluated at local noon-equivalent UTC midday).
    #[arg(long)]
    date: Option<String>,

    /// Candidate grid spacing in meters.
    #[arg(long, default_value_t = 350.0)]
    spacing: f64,

    /// Terrain tile URL template, with {z}/{x}/{y} placeholders.
    #[arg(
        long,
        default_value = "https://elevation-tiles-prod.s3.amazonaws.com/terrarium/{z}/{x}/{y}.png"
    )]
    tile_url: String,

    /// Maximum rows printed.
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn parse_mode(raw: &str) -> Result<Mode, String> {
    match raw.to_lowercase().as_str() {
        "sunset" => Ok(Mode::Sunset),
        "sunrise" => Ok(Mode::Sunrise),
        other => Err(format!("unrecognized mode: {other} (expected sunset or sunrise)")),
    }
}

fn parse_local_noon(raw: Option<&str>) -> Result<DateTime<Utc>, String> {
    match raw {
        Some(date) => {
            let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| format!("invalid --date {date}: {e}"))?;
            naive
                .and_hms_opt(12, 0, 0)
                .and_then(|dt| Utc.from_local_datetime(&dt).single())
                .ok_or_else(|| format!("could not build a UTC timestamp from {date}"))
        }
        None => Ok(Utc::now()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .expect("logger already initialized");

    let cli = Cli::parse();

    let mode = match parse_mode(&cli.mode) {
        Ok(mode) => mode,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let local_noon = match parse_local_noon(cli.date.as_deref()) {
        Ok(dt) => dt,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let request = RunRequest {
        center: Coordinate::new(cli.lat, cli.lng),
        radius_m: cli.radius,
        mode,
        local_noon,
        options: PipelineOptions {
            grid_spacing_m: cli.spacing,
            ..PipelineOptions::default()
        },
    };

    let elevation_service = Arc::new(TileElevationService::new(cli.tile_url.clone()));
    let handles = PipelineHandles::new(elevation_service);
    let cancel = CancellationToken::new();

    let progress = |percent: u8| log::info!("progress: {percent}%");

    match run_pipeline(request, &handles, &progress, &cancel).await {
        Ok(output) => {
            println!(
                "Sun data ({:?}): target {} azimuth {:.1}\u{b0} altitude {:.1}\u{b0}",
                output.sun.mode, output.sun.target_time, output.sun.azimuth, output.sun.altitude
            );
            println!("{:<5} {:<22} {:<6} {:<6} {}", "rank", "coordinate", "score", "elev", "verdict");
            for candidate in output.candidates.iter().take(cli.top) {
                println!(
                    "{:<5} {:<22} {:<6} {:<6.0} {}",
                    candidate.rank,
                    format!("{:.4},{:.4}", candidate.coordinate.lat, candidate.coordinate.lng),
                    candidate.score,
                    candidate.elevation,
                    verdict(candidate),
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("pipeline run failed: {err}");
            ExitCode::FAILURE
        }
    }
}
