// Hysteresis extremum detector shared by the spectral and edge stages

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremumKind {
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub index: usize,
    pub value: f64,
    pub kind: ExtremumKind,
}

/// Largest absolute value in the sequence
pub fn peak_magnitude(values: &[f64]) -> f64 {
    values.iter().fold(0.0f64, |peak, v| peak.max(v.abs()))
}

/// Find alternating local maxima and minima.
///
/// A maximum is reported once the sequence has fallen `threshold * max|v|`
/// below the running maximum; the detector then looks for a minimum that the
/// sequence rises the same distance above. Detection always starts by looking
/// for a maximum, so the output reads `Max, Min, Max, ...`.
pub fn detect_extrema(values: &[f64], threshold: f64) -> Vec<Extremum> {
    let delta = peak_magnitude(values) * threshold;
    if delta <= 0.0 || !delta.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut mx = f64::NEG_INFINITY;
    let mut mn = f64::INFINITY;
    let mut mx_pos = 0;
    let mut mn_pos = 0;
    let mut look_for_max = true;

    for (i, &value) in values.iter().enumerate() {
        if value > mx {
            mx = value;
            mx_pos = i;
        }
        if value < mn {
            mn = value;
            mn_pos = i;
        }

        if look_for_max {
            if value < mx - delta {
                result.push(Extremum {
                    index: mx_pos,
                    value: mx,
                    kind: ExtremumKind::Max,
                });
                mn = value;
                mn_pos = i;
                look_for_max = false;
            }
        } else if value > mn + delta {
            result.push(Extremum {
                index: mn_pos,
                value: mn,
                kind: ExtremumKind::Min,
            });
            mx = value;
            mx_pos = i;
            look_for_max = true;
        }
    }

    result
}
