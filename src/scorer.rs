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

//! Composite scoring and ranking of analyzed candidates.

use crate::geodesy::haversine;
use crate::types::{AnalyzedCandidate, Coordinate, ScoredCandidate};

/// Inputs to `score` beyond the candidate itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoringOptions {
    pub center: Option<Coordinate>,
    pub max_radius_m: f64,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            center: None,
            max_radius_m: 1.0,
        }
    }
}

fn obstruction_component(candidate: &AnalyzedCandidate) -> f64 {
    if candidate.is_clear {
        (40.0 + 4.0 * -candidate.obstruction_angle).clamp(0.0, 40.0)
    } else {
        (20.0 - 4.0 * candidate.obstruction_angle).max(0.0)
    }
}

fn elevation_component(candidate: &AnalyzedCandidate) -> f64 {
    30.0 * (candidate.elevation / 1000.0).min(1.0)
}

fn center_proximity_component(candidate: &AnalyzedCandidate, options: &ScoringOptions) -> f64 {
    match options.center {
        Some(center) => {
            let distance = haversine(center, candidate.coordinate);
            15.0 * (1.0 - (distance / options.max_radius_m).min(1.0))
        }
        None => 10.0,
    }
}

fn clearance_margin_component(candidate: &AnalyzedCandidate) -> f64 {
    if candidate.obstruction_angle < 0.0 {
        (5.0 * candidate.obstruction_angle.abs()).min(15.0)
    } else {
        0.0
    }
}

/// Composite score in `[0, 100]`: obstruction (0-40) + elevation (0-30) +
/// center proximity (0-15) + clearance margin (0-15), clamped and rounded.
pub fn score(candidate: &AnalyzedCandidate, options: &ScoringOptions) -> u8 {
    let total = obstruction_component(candidate)
        + elevation_component(candidate)
        + center_proximity_component(candidate, options)
        + clearance_margin_component(candidate);
    total.round().clamp(0.0, 100.0) as u8
}

/// Scores every candidate and assigns a dense rank (`1..=N`) by descending score.
pub fn rank(candidates: &[AnalyzedCandidate], options: &ScoringOptions) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|c| ScoredCandidate {
            coordinate: c.coordinate,
            elevation: c.elevation,
            obstruction_angle: c.obstruction_angle,
            max_blocker_distance: c.max_blocker_distance,
            max_blocker_elevation: c.max_blocker_elevation,
            is_clear: c.is_clear,
            sun_azimuth: c.sun_azimuth,
            sun_altitude: c.sun_altitude,
            view_quality: c.view_quality,
            score: score(c, options),
            rank: 0,
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    for (i, candidate) in scored.iter_mut().enumerate() {
        candidate.rank = (i + 1) as u32;
    }
    scored
}

fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

/// Human-readable summary of a candidate's view, for external presentation.
pub fn verdict(candidate: &ScoredCandidate) -> String {
    if candidate.is_clear {
        format!(
            "Unobstructed sunset view from {}m elevation",
            candidate.elevation.round() as i64
        )
    } else {
        format!(
            "Blocked by terrain {} away ({:.1}\u{b0} obstruction)",
            format_distance(candidate.max_blocker_distance),
            candidate.obstruction_angle
        )
    }
}

/// Maps a score to a presentation color band.
pub fn score_color(score: u8) -> &'static str {
    match score {
        70..=100 => "#22c55e",
        45..=69 => "#eab308",
        25..=44 => "#f97316",
        _ => "#ef4444",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViewQuality;

    fn candidate(elevation: f64, obstruction_angle: f64, is_clear: bool) -> AnalyzedCandidate {
        AnalyzedCandidate {
            coordinate: Coordinate::new(0.0, 0.0),
            elevation,
            obstruction_angle,
            max_blocker_distance: if is_clear { 0.0 } else { 1000.0 },
            max_blocker_elevation: if is_clear { 0.0 } else { 600.0 },
            is_clear,
            sun_azimuth: 270.0,
            sun_altitude: 1.0,
            view_quality: ViewQuality::from_is_clear(is_clear),
        }
    }

    #[test]
    fn score_is_within_bounds() {
        let options = ScoringOptions::default();
        let c = candidate(2500.0, -10.0, true);
        let s = score(&c, &options);
        assert!(s <= 100);
    }

    #[test]
    fn clear_candidate_scores_higher_than_obstructed_at_same_elevation() {
        let options = ScoringOptions::default();
        let clear = candidate(500.0, -2.0, true);
        let obstructed = candidate(500.0, 26.57, false);
        assert!(score(&clear, &options) > score(&obstructed, &options));
    }

    #[test]
    fn rank_is_a_dense_descending_permutation() {
        let options = ScoringOptions::default();
        let candidates = vec![
            candidate(100.0, 26.57, false),
            candidate(900.0, -5.0, true),
            candidate(300.0, 0.2, true),
        ];
        let ranked = rank(&candidates, &options);
        let mut ranks: Vec<u32> = ranked.iter().map(|c| c.rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3]);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn verdict_formats_sub_kilometer_distances_in_meters() {
        let c = ScoredCandidate {
            coordinate: Coordinate::new(0.0, 0.0),
            elevation: 100.0,
            obstruction_angle: 2.5,
            max_blocker_distance: 500.0,
            max_blocker_elevation: 150.0,
            is_clear: false,
            sun_azimuth: 270.0,
            sun_altitude: 1.0,
            view_quality: ViewQuality::Obstructed,
            score: 10,
            rank: 1,
        };
        assert!(verdict(&c).contains("500m"));
    }

    #[test]
    fn verdict_formats_multi_kilometer_distances_with_one_decimal() {
        let c = ScoredCandidate {
            coordinate: Coordinate::new(0.0, 0.0),
            elevation: 100.0,
            obstruction_angle: 2.5,
            max_blocker_distance: 3200.0,
            max_blocker_elevation: 150.0,
            is_clear: false,
            sun_azimuth: 270.0,
            sun_altitude: 1.0,
            view_quality: ViewQuality::Obstructed,
            score: 10,
            rank: 1,
        };
        let text = verdict(&c);
        assert!(text.contains("Blocked"));
        assert!(text.contains("3.2km"));
    }

    #[test]
    fn score_color_bands_match_reference_scenarios() {
        assert_eq!(score_color(80), "#22c55e");
        assert_eq!(score_color(55), "#eab308");
        assert_eq!(score_color(35), "#f97316");
        assert_eq!(score_color(10), "#ef4444");
    }
}
