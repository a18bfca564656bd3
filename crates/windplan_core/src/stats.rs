//! Nearest-rank percentile extraction for Monte Carlo trial sets.
//!
//! Percentiles are computed by indexing into the sorted sample array rather
//! than interpolating between points, so every reported value is one that an
//! actual trial produced.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// The five semantic percentile labels, in ascending order.
///
/// Labels are stable names decoupled from the numeric percentile they
/// currently represent; `PercentileSpec::legend` recovers the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PercentileLabel {
    ExtremeLower,
    LowerBound,
    Primary,
    UpperBound,
    ExtremeUpper,
}

impl PercentileLabel {
    pub const ALL: [PercentileLabel; 5] = [
        PercentileLabel::ExtremeLower,
        PercentileLabel::LowerBound,
        PercentileLabel::Primary,
        PercentileLabel::UpperBound,
        PercentileLabel::ExtremeUpper,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PercentileLabel::ExtremeLower => "Pextreme_lower",
            PercentileLabel::LowerBound => "Plower_bound",
            PercentileLabel::Primary => "Pprimary",
            PercentileLabel::UpperBound => "Pupper_bound",
            PercentileLabel::ExtremeUpper => "Pextreme_upper",
        }
    }
}

/// The five percentiles a run reports, each 1-99 and strictly increasing.
///
/// Drives both the nearest-rank computation and the semantic relabeling of
/// formatted results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileSpec {
    pub extreme_lower: u8,
    pub lower_bound: u8,
    pub primary: u8,
    pub upper_bound: u8,
    pub extreme_upper: u8,
}

impl Default for PercentileSpec {
    fn default() -> Self {
        Self {
            extreme_lower: 5,
            lower_bound: 25,
            primary: 50,
            upper_bound: 75,
            extreme_upper: 95,
        }
    }
}

impl PercentileSpec {
    /// Validate and build a spec, aggregating every violated constraint.
    pub fn new(
        extreme_lower: u8,
        lower_bound: u8,
        primary: u8,
        upper_bound: u8,
        extreme_upper: u8,
    ) -> Result<Self, ConfigurationError> {
        let spec = Self {
            extreme_lower,
            lower_bound,
            primary,
            upper_bound,
            extreme_upper,
        };
        let errors = spec.violations();
        if errors.is_empty() {
            Ok(spec)
        } else {
            Err(ConfigurationError { errors })
        }
    }

    /// All constraint violations of this spec (empty when valid)
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("extreme_lower", self.extreme_lower),
            ("lower_bound", self.lower_bound),
            ("primary", self.primary),
            ("upper_bound", self.upper_bound),
            ("extreme_upper", self.extreme_upper),
        ] {
            if !(1..=99).contains(&value) {
                errors.push(format!("percentile {name} must be in 1..=99, got {value}"));
            }
        }
        let ordered = self.extreme_lower < self.lower_bound
            && self.lower_bound < self.primary
            && self.primary < self.upper_bound
            && self.upper_bound < self.extreme_upper;
        if !ordered {
            errors.push("percentiles must be strictly increasing".to_string());
        }
        errors
    }

    /// Numeric percentile behind a semantic label
    #[must_use]
    pub fn rank(&self, label: PercentileLabel) -> u8 {
        match label {
            PercentileLabel::ExtremeLower => self.extreme_lower,
            PercentileLabel::LowerBound => self.lower_bound,
            PercentileLabel::Primary => self.primary,
            PercentileLabel::UpperBound => self.upper_bound,
            PercentileLabel::ExtremeUpper => self.extreme_upper,
        }
    }

    /// The fixed dictionary from nearest-rank labels (`"P5"`, ...) to semantic
    /// labels, in ascending order.
    #[must_use]
    pub fn legend(&self) -> Vec<(String, PercentileLabel)> {
        PercentileLabel::ALL
            .iter()
            .map(|&label| (format!("P{}", self.rank(label)), label))
            .collect()
    }
}

/// A value per semantic percentile label.
///
/// The fixed five-field record replaces the original string-keyed percentile
/// maps, so consumers cannot miss a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bands<T = f64> {
    pub extreme_lower: T,
    pub lower_bound: T,
    pub primary: T,
    pub upper_bound: T,
    pub extreme_upper: T,
}

impl<T> Bands<T> {
    #[must_use]
    pub fn get(&self, label: PercentileLabel) -> &T {
        match label {
            PercentileLabel::ExtremeLower => &self.extreme_lower,
            PercentileLabel::LowerBound => &self.lower_bound,
            PercentileLabel::Primary => &self.primary,
            PercentileLabel::UpperBound => &self.upper_bound,
            PercentileLabel::ExtremeUpper => &self.extreme_upper,
        }
    }

    /// Build a banded record by evaluating `f` once per label, in order
    pub fn build<E>(
        mut f: impl FnMut(PercentileLabel) -> Result<T, E>,
    ) -> Result<Self, E> {
        Ok(Self {
            extreme_lower: f(PercentileLabel::ExtremeLower)?,
            lower_bound: f(PercentileLabel::LowerBound)?,
            primary: f(PercentileLabel::Primary)?,
            upper_bound: f(PercentileLabel::UpperBound)?,
            extreme_upper: f(PercentileLabel::ExtremeUpper)?,
        })
    }
}

/// Nearest-rank percentile of an ascending-sorted slice.
///
/// `index = floor(k/100 * n)` clamped to `n - 1`; an empty slice yields 0.0.
#[must_use]
pub fn percentile_of_sorted(sorted: &[f64], percentile: u8) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let index = ((f64::from(percentile) / 100.0) * n as f64).floor() as usize;
    sorted[index.min(n - 1)]
}

/// Reduce an unordered sample set to the five requested percentile bands
#[must_use]
pub fn bands_of(samples: &[f64], spec: &PercentileSpec) -> Bands {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Bands {
        extreme_lower: percentile_of_sorted(&sorted, spec.extreme_lower),
        lower_bound: percentile_of_sorted(&sorted, spec.lower_bound),
        primary: percentile_of_sorted(&sorted, spec.primary),
        upper_bound: percentile_of_sorted(&sorted, spec.upper_bound),
        extreme_upper: percentile_of_sorted(&sorted, spec.extreme_upper),
    }
}

/// Per-year bands for a set of annual series.
///
/// Percentiles are computed independently for each project year, yielding
/// per-year uncertainty envelopes rather than one lifetime percentile
/// broadcast across years. Trials shorter than the longest series simply do
/// not contribute to the missing years.
#[must_use]
pub fn series_bands(series: &[&[f64]], spec: &PercentileSpec) -> Vec<Bands> {
    let years = series.iter().map(|s| s.len()).max().unwrap_or(0);
    (0..years)
        .map(|year| {
            let samples: Vec<f64> = series
                .iter()
                .filter_map(|s| s.get(year).copied())
                .collect();
            bands_of(&samples, spec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_rank_empty_is_zero() {
        assert_eq!(percentile_of_sorted(&[], 10), 0.0);
        assert_eq!(percentile_of_sorted(&[], 50), 0.0);
        assert_eq!(percentile_of_sorted(&[], 90), 0.0);
    }

    #[test]
    fn test_nearest_rank_indexing() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        // floor(50/100 * 4) = 2 -> third element
        assert_eq!(percentile_of_sorted(&sorted, 50), 3.0);
        // floor(99/100 * 4) = 3, clamped to 3
        assert_eq!(percentile_of_sorted(&sorted, 99), 4.0);
        assert_eq!(percentile_of_sorted(&sorted, 1), 1.0);
    }

    #[test]
    fn test_nearest_rank_reports_observed_values() {
        let sorted = [10.0, 20.0];
        // No interpolation: every result is an element of the input
        for p in 1..=99 {
            let v = percentile_of_sorted(&sorted, p);
            assert!(v == 10.0 || v == 20.0);
        }
    }

    #[test]
    fn test_spec_default_matches_standard_set() {
        let spec = PercentileSpec::default();
        assert_eq!(spec.extreme_lower, 5);
        assert_eq!(spec.primary, 50);
        assert_eq!(spec.extreme_upper, 95);
        assert!(spec.violations().is_empty());
    }

    #[test]
    fn test_spec_rejects_unordered() {
        let err = PercentileSpec::new(5, 50, 25, 75, 95).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].contains("strictly increasing"));
    }

    #[test]
    fn test_spec_aggregates_all_violations() {
        let err = PercentileSpec::new(0, 25, 50, 75, 100).unwrap_err();
        // Two range violations; ordering itself holds
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_legend_mapping() {
        let spec = PercentileSpec::default();
        let legend = spec.legend();
        assert_eq!(legend[0], ("P5".to_string(), PercentileLabel::ExtremeLower));
        assert_eq!(legend[2], ("P50".to_string(), PercentileLabel::Primary));
        assert_eq!(
            legend[4],
            ("P95".to_string(), PercentileLabel::ExtremeUpper)
        );
    }

    #[test]
    fn test_bands_are_monotone() {
        let samples: Vec<f64> = (0..100).map(|i| f64::from(i) * 1.5).collect();
        let bands = bands_of(&samples, &PercentileSpec::default());
        assert!(bands.extreme_lower <= bands.lower_bound);
        assert!(bands.lower_bound <= bands.primary);
        assert!(bands.primary <= bands.upper_bound);
        assert!(bands.upper_bound <= bands.extreme_upper);
    }

    #[test]
    fn test_series_bands_per_year() {
        let a = [1.0, 10.0];
        let b = [2.0, 20.0];
        let c = [3.0, 30.0];
        let bands = series_bands(&[&a, &b, &c], &PercentileSpec::default());
        assert_eq!(bands.len(), 2);
        // Year bands come from that year's samples only
        assert_eq!(bands[0].primary, 2.0);
        assert_eq!(bands[1].primary, 20.0);
    }

    #[test]
    fn test_series_bands_ragged_lengths() {
        let a = [1.0];
        let b = [2.0, 20.0];
        let bands = series_bands(&[&a, &b], &PercentileSpec::default());
        assert_eq!(bands.len(), 2);
        // Only the longer trial contributes to year 2
        assert_eq!(bands[1].primary, 20.0);
    }
}
