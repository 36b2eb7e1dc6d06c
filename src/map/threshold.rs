use serde::{Deserialize, Serialize};

use crate::{dataset::MAX_RISK_LEVEL, error::DashboardError};

/// How a percentile falls between two sorted samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentileMethod {
    /// The sample at `floor((n - 1) * p / 100)`; always an observed value.
    #[default]
    Lower,
    /// Linear interpolation between the two neighbouring samples.
    Linear,
}

impl PercentileMethod {
    pub fn to_str(&self) -> &'static str {
        match self {
            PercentileMethod::Lower => "lower",
            PercentileMethod::Linear => "linear",
        }
    }
}

/// Reject percentiles above 100.
pub fn check_percentile(p: u8) -> Result<(), DashboardError> {
    if p <= 100 { Ok(()) } else { Err(DashboardError::InvalidSelection(format!("percentile {p} is outside 0..=100"))) }
}

/// Sort and dedup accepted risk levels, rejecting anything above the scale.
pub fn check_levels(levels: &[u8]) -> Result<Vec<u8>, DashboardError> {
    if let Some(bad) = levels.iter().find(|&&level| level > MAX_RISK_LEVEL) {
        return Err(DashboardError::InvalidSelection(format!("heat risk level {bad} is outside 0..={MAX_RISK_LEVEL}")));
    }
    let mut levels = levels.to_vec();
    levels.sort_unstable();
    levels.dedup();
    Ok(levels)
}

/// `p`th percentile of the present values. None when every value is missing.
pub fn percentile(values: &[Option<f64>], p: u8, method: PercentileMethod) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() { return None }
    sorted.sort_unstable_by(f64::total_cmp);

    let rank = (sorted.len() - 1) as f64 * f64::from(p.min(100)) / 100.0;
    let lo = rank.floor() as usize;
    Some(match method {
        PercentileMethod::Lower => sorted[lo],
        PercentileMethod::Linear => {
            let hi = (lo + 1).min(sorted.len() - 1);
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    })
}

/// Highlight rows whose value reaches `threshold` and whose risk level is accepted.
/// Missing values are never highlighted.
pub fn highlight_flags(values: &[Option<f64>], levels: &[u8], threshold: Option<f64>, accepted: &[u8]) -> Vec<bool> {
    debug_assert_eq!(values.len(), levels.len());
    let Some(threshold) = threshold else { return vec![false; values.len()] };
    values.iter().zip(levels)
        .map(|(value, level)| value.is_some_and(|v| v >= threshold) && accepted.contains(level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> { values.iter().copied().map(Some).collect() }

    #[test]
    fn lower_and_linear_percentiles() {
        let values = some(&[5.0, 1.0, 3.0, 2.0, 4.0]);
        assert_eq!(percentile(&values, 60, PercentileMethod::Lower), Some(3.0));
        let linear = percentile(&values, 60, PercentileMethod::Linear).unwrap();
        assert!((linear - 3.4).abs() < 1e-9);
        assert_eq!(percentile(&values, 0, PercentileMethod::Linear), Some(1.0));
        assert_eq!(percentile(&values, 100, PercentileMethod::Lower), Some(5.0));
    }

    #[test]
    fn missing_values_are_ignored() {
        let values = vec![None, Some(2.0), Some(f64::NAN), Some(4.0)];
        assert_eq!(percentile(&values, 100, PercentileMethod::Lower), Some(4.0));
        assert_eq!(percentile(&[None, None], 50, PercentileMethod::Lower), None);
    }

    #[test]
    fn highlight_needs_value_and_level() {
        let values = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let levels = [0, 1, 2, 2, 2];
        let threshold = percentile(&values, 60, PercentileMethod::Lower);
        let flags = highlight_flags(&values, &levels, threshold, &[2]);
        assert_eq!(flags, vec![false, false, true, true, true]);

        assert_eq!(highlight_flags(&[None], &[2], Some(0.0), &[2]), vec![false]);
        assert_eq!(highlight_flags(&values, &levels, None, &[2]), vec![false; 5]);
    }

    #[test]
    fn selections_are_checked() {
        assert!(check_percentile(101).is_err());
        assert_eq!(check_levels(&[4, 2, 2, 3]).unwrap(), vec![2, 3, 4]);
        assert!(matches!(check_levels(&[5]), Err(DashboardError::InvalidSelection(_))));
    }
}
