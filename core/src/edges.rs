use crate::peaks::{detect_extrema, ExtremumKind};
use crate::types::{Direction, Interval, IntervalKind, Transition};

/// Discrete first difference, one sample shorter than the input
pub fn first_difference(source: &[f64]) -> Vec<f64> {
    source.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Locate tone onsets and offsets in a power envelope.
///
/// Steepest rises become `Rising` transitions and steepest falls become
/// `Falling` ones; the sequence alternates and starts with `Rising`. Fewer
/// than two transitions carry no timing information and yield nothing.
pub fn extract_transitions(envelope: &[f64], threshold: f64) -> Vec<Transition> {
    let diff = first_difference(envelope);
    let transitions: Vec<Transition> = detect_extrema(&diff, threshold)
        .into_iter()
        .map(|e| Transition {
            index: e.index,
            direction: match e.kind {
                ExtremumKind::Max => Direction::Rising,
                ExtremumKind::Min => Direction::Falling,
            },
        })
        .collect();

    if transitions.len() < 2 {
        return Vec::new();
    }
    transitions
}

/// Durations between consecutive transitions.
///
/// A span that opens with a rising edge is tone-present, one that opens with
/// a falling edge is tone-absent.
pub fn intervals(transitions: &[Transition]) -> Vec<Interval> {
    transitions
        .windows(2)
        .map(|pair| Interval {
            duration: pair[1].index.saturating_sub(pair[0].index),
            kind: match pair[0].direction {
                Direction::Rising => IntervalKind::On,
                Direction::Falling => IntervalKind::Off,
            },
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Rectangular envelope from alternating (on, length) runs
    pub(crate) fn keyed_envelope(runs: &[(bool, usize)]) -> Vec<f64> {
        runs.iter()
            .flat_map(|&(on, len)| std::iter::repeat(if on { 1.0 } else { 0.0 }).take(len))
            .collect()
    }

    #[test]
    fn test_rectangular_pulse() {
        let envelope = keyed_envelope(&[(false, 100), (true, 50), (false, 100)]);
        let transitions = extract_transitions(&envelope, 0.5);
        assert_eq!(
            transitions,
            vec![
                Transition {
                    index: 99,
                    direction: Direction::Rising
                },
                Transition {
                    index: 149,
                    direction: Direction::Falling
                },
            ]
        );
        let spans = intervals(&transitions);
        assert_eq!(
            spans,
            vec![Interval {
                duration: 50,
                kind: IntervalKind::On
            }]
        );
    }

    #[test]
    fn test_transitions_alternate() {
        let envelope = keyed_envelope(&[
            (false, 40),
            (true, 30),
            (false, 30),
            (true, 90),
            (false, 90),
            (true, 30),
            (false, 210),
            (true, 90),
            (false, 40),
        ]);
        // Cascaded smoothing turns each step into a ramp whose slope has a
        // single steepest sample, the way the envelope extractor does it
        let smoothed = (0..4).fold(envelope, |env, _| crate::envelope::moving_average(&env, 7));
        let transitions = extract_transitions(&smoothed, 0.5);
        assert_eq!(transitions.len(), 8);
        assert_eq!(transitions[0].direction, Direction::Rising);
        for pair in transitions.windows(2) {
            assert_ne!(pair[0].direction, pair[1].direction);
        }

        let durations: Vec<usize> = intervals(&transitions).iter().map(|i| i.duration).collect();
        let expected = [30, 30, 90, 90, 30, 210, 90];
        assert_eq!(durations.len(), expected.len());
        for (got, want) in durations.iter().zip(expected) {
            assert!(got.abs_diff(want) <= 1, "{durations:?}");
        }
    }

    #[test]
    fn test_degenerate_envelopes() {
        assert!(extract_transitions(&[], 0.5).is_empty());
        assert!(extract_transitions(&[0.0; 500], 0.5).is_empty());
        // A lone onset with no offset is not enough
        let envelope = keyed_envelope(&[(false, 100), (true, 100)]);
        assert!(extract_transitions(&envelope, 0.5).is_empty());
    }
}
