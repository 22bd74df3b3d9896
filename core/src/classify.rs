use crate::types::{DecoderParams, Interval, IntervalKind, Symbol};
use serde::{Deserialize, Serialize};
use tracing::trace;

// ITU ratios in units: inter-element gap, letter gap, word gap
const INTRA_GAP_UNITS: f64 = 1.0;
const LETTER_GAP_UNITS: f64 = 3.0;
const WORD_GAP_UNITS: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassifierMethod {
    KMeans,
    FixedRatio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub symbols: Vec<Symbol>,
    /// Estimated dot length in samples
    pub unit: f64,
    pub method: ClassifierMethod,
}

/// Deterministic two-cluster k-means over one-dimensional values.
///
/// Seeds the centroids with the minimum and maximum so repeated runs agree.
/// Returns `(short, long)` centroids, or `None` when the values do not split
/// into two populated clusters at least `min_separation` apart (as a ratio).
pub fn two_means(values: &[f64], max_iterations: usize, min_separation: f64) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }

    let mut short = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut long = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(long > short) {
        return None;
    }

    for _ in 0..max_iterations {
        let (mut short_sum, mut short_count) = (0.0, 0usize);
        let (mut long_sum, mut long_count) = (0.0, 0usize);
        for &v in values {
            if (v - short).abs() <= (v - long).abs() {
                short_sum += v;
                short_count += 1;
            } else {
                long_sum += v;
                long_count += 1;
            }
        }
        if short_count == 0 || long_count == 0 {
            return None;
        }

        let next_short = short_sum / short_count as f64;
        let next_long = long_sum / long_count as f64;
        let converged = next_short == short && next_long == long;
        short = next_short;
        long = next_long;
        if converged {
            break;
        }
    }

    if short <= 0.0 || long / short < min_separation {
        return None;
    }
    Some((short, long))
}

fn nearest_gap(duration: f64, unit: f64) -> Symbol {
    let candidates = [
        (INTRA_GAP_UNITS, Symbol::IntraSpace),
        (LETTER_GAP_UNITS, Symbol::LetterSpace),
        (WORD_GAP_UNITS, Symbol::WordSpace),
    ];
    // Ties resolve to the shorter gap
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if (duration - candidate.0 * unit).abs() < (duration - best.0 * unit).abs() {
            best = *candidate;
        }
    }
    best.1
}

fn classify_clustered(intervals: &[Interval], short: f64, long: f64) -> Vec<Symbol> {
    intervals
        .iter()
        .map(|interval| {
            let duration = interval.duration as f64;
            match interval.kind {
                IntervalKind::On => {
                    if (duration - short).abs() <= (duration - long).abs() {
                        Symbol::Dot
                    } else {
                        Symbol::Dash
                    }
                }
                IntervalKind::Off => nearest_gap(duration, short),
            }
        })
        .collect()
}

/// Fixed-ratio classification against the shortest observed interval.
///
/// Needs no iteration and no seeding, so the same intervals always give the
/// same symbols.
pub fn classify_fixed_ratio(intervals: &[Interval]) -> Classification {
    let unit = intervals
        .iter()
        .map(|i| i.duration)
        .filter(|&d| d > 0)
        .min()
        .unwrap_or(0) as f64;

    if unit == 0.0 {
        return Classification {
            symbols: Vec::new(),
            unit,
            method: ClassifierMethod::FixedRatio,
        };
    }

    let symbols = intervals
        .iter()
        .map(|interval| {
            let span = (interval.duration as f64 / unit).round() as usize;
            match interval.kind {
                IntervalKind::On if span >= 2 => Symbol::Dash,
                IntervalKind::On => Symbol::Dot,
                IntervalKind::Off if span == 3 => Symbol::LetterSpace,
                IntervalKind::Off if span > 3 => Symbol::WordSpace,
                IntervalKind::Off => Symbol::IntraSpace,
            }
        })
        .collect();

    Classification {
        symbols,
        unit,
        method: ClassifierMethod::FixedRatio,
    }
}

/// Classify on-intervals as dot/dash and off-intervals as gap types.
///
/// Clusters the on-interval lengths first; when they do not form two distinct
/// groups (e.g. a window holding only dots) the fixed-ratio rules apply.
pub fn classify(intervals: &[Interval], params: &DecoderParams) -> Classification {
    let on_durations: Vec<f64> = intervals
        .iter()
        .filter(|i| i.kind == IntervalKind::On)
        .map(|i| i.duration as f64)
        .collect();

    match two_means(
        &on_durations,
        params.kmeans_max_iterations,
        params.kmeans_min_separation,
    ) {
        Some((short, long)) => {
            trace!(short, long, "on-intervals clustered");
            Classification {
                symbols: classify_clustered(intervals, short, long),
                unit: short,
                method: ClassifierMethod::KMeans,
            }
        }
        None => {
            trace!(count = on_durations.len(), "clustering failed, using fixed ratios");
            classify_fixed_ratio(intervals)
        }
    }
}
