//! Nonparametric estimators of total clonotype richness.
//!
//! Both estimators work on the abundance frequencies of a sample, that is, on the number of
//! clonotypes observed with each read count.

use std::{collections::HashMap, fmt, num::NonZeroUsize};

use crate::{utils::binomial, ClonotypeTable};

use super::{non_empty, EmptySampleError};

/// The number of clonotypes with each read count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frequencies {
    clonotypes: usize,
    by_count: HashMap<u64, usize>,
}

impl Frequencies {
    /// Counts the abundance frequencies of a table.
    pub fn from_table(table: &ClonotypeTable) -> Self {
        table.iter_counts().collect()
    }

    /// Returns the number of clonotypes observed with exactly `count` reads.
    pub fn get(&self, count: u64) -> usize {
        self.by_count.get(&count).copied().unwrap_or(0)
    }

    /// Returns the total number of clonotypes.
    pub fn observed(&self) -> usize {
        self.clonotypes
    }

    /// Returns the number of singletons.
    pub fn singletons(&self) -> usize {
        self.get(1)
    }

    /// Returns the number of doubletons.
    pub fn doubletons(&self) -> usize {
        self.get(2)
    }
}

impl FromIterator<u64> for Frequencies {
    fn from_iter<T: IntoIterator<Item = u64>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Frequencies::default(), |mut frequencies, count| {
                *frequencies.by_count.entry(count).or_insert(0) += 1;
                frequencies.clonotypes += 1;
                frequencies
            })
    }
}

/// The bias-corrected Chao1 richness estimate and its standard deviation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chao1 {
    /// Estimated richness.
    pub estimate: f64,
    /// Standard deviation of the estimate.
    pub std: f64,
}

impl Chao1 {
    /// Computes the Chao1 estimate of a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        non_empty(table).map(|table| Self::from_frequencies(&Frequencies::from_table(table)))
    }

    pub(crate) fn from_frequencies(frequencies: &Frequencies) -> Self {
        let observed = frequencies.observed() as f64;
        let f1 = frequencies.singletons() as f64;
        let f2 = frequencies.doubletons() as f64;

        // The +1 keeps the estimate finite without doubletons
        let f0 = f1 * (f1 - 1.0) / 2.0 / (f2 + 1.0);

        let g = f2 + 1.0;
        let variance = f0
            + f1 * (2.0 * f1 - 1.0).powi(2) / 4.0 / g.powi(2)
            + f1.powi(2) * f2 * (f1 - 1.0).powi(2) / 4.0 / g.powi(4);

        Self {
            estimate: observed + f0,
            std: variance.sqrt(),
        }
    }
}

/// Parameters of the Efron-Thisted estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EfronThistedParams {
    max_depth: NonZeroUsize,
    cv_threshold: f64,
}

impl EfronThistedParams {
    /// Default maximum extrapolation depth.
    pub const DEFAULT_MAX_DEPTH: usize = 20;

    /// Default coefficient of variation at which extrapolation stops.
    pub const DEFAULT_CV_THRESHOLD: f64 = 0.05;

    /// Creates new parameters.
    pub fn new(max_depth: NonZeroUsize, cv_threshold: f64) -> Self {
        Self {
            max_depth,
            cv_threshold,
        }
    }

    /// Returns the maximum extrapolation depth.
    pub fn max_depth(&self) -> usize {
        self.max_depth.get()
    }

    /// Returns the coefficient of variation at which extrapolation stops.
    pub fn cv_threshold(&self) -> f64 {
        self.cv_threshold
    }
}

impl Default for EfronThistedParams {
    fn default() -> Self {
        Self {
            max_depth: NonZeroUsize::new(Self::DEFAULT_MAX_DEPTH).unwrap(),
            cv_threshold: Self::DEFAULT_CV_THRESHOLD,
        }
    }
}

/// The Efron-Thisted richness estimate.
///
/// The estimate extrapolates the number of unseen clonotypes from the number of clonotypes seen
/// once, twice, and so on up to some depth. Deeper extrapolation uses more of the frequency
/// spectrum but increases the variance, so depths are tried in increasing order until the
/// coefficient of variation reaches a threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EfronThisted {
    /// Estimated richness.
    pub estimate: f64,
    /// Standard deviation of the estimate.
    pub std: f64,
    /// Depth at which extrapolation stopped.
    pub depth: usize,
    /// Whether the maximum depth was used without reaching the threshold.
    pub exhausted: bool,
}

impl EfronThisted {
    /// Computes the Efron-Thisted estimate of a table.
    pub fn from_table(
        table: &ClonotypeTable,
        params: EfronThistedParams,
    ) -> Result<Self, EmptySampleError> {
        non_empty(table)
            .map(|table| Self::from_frequencies(&Frequencies::from_table(table), params))
    }

    pub(crate) fn from_frequencies(frequencies: &Frequencies, params: EfronThistedParams) -> Self {
        let mut last = None;

        for depth in 1..=params.max_depth() {
            let (estimate, std) = Self::extrapolate(frequencies, depth);

            if std / estimate >= params.cv_threshold() {
                return Self {
                    estimate,
                    std,
                    depth,
                    exhausted: false,
                };
            }

            last = Some((estimate, std));
        }

        // Maximum depth is non-zero, so at least one depth has been tried
        let (estimate, std) = last.unwrap_or((f64::NAN, f64::NAN));

        Self {
            estimate,
            std,
            depth: params.max_depth(),
            exhausted: true,
        }
    }

    fn extrapolate(frequencies: &Frequencies, depth: usize) -> (f64, f64) {
        let mut h = vec![0.0; depth];
        let mut nx = vec![0.0; depth];

        for y in 1..=depth {
            nx[y - 1] = frequencies.get(y as u64) as f64;

            // Alternating binomial weights
            for x in 1..=y {
                let coefficient = binomial((y - 1) as u64, (x - 1) as u64);
                if x % 2 == 1 {
                    h[x - 1] += coefficient;
                } else {
                    h[x - 1] -= coefficient;
                }
            }
        }

        let unseen = h.iter().zip(&nx).map(|(h, n)| h * n).sum::<f64>();
        let variance = h.iter().zip(&nx).map(|(h, n)| h * h * n).sum::<f64>();

        (frequencies.observed() as f64 + unseen, variance.sqrt())
    }

    /// Returns an informational note if extrapolation used the maximum depth.
    pub fn exhausted(&self) -> Option<ConvergenceExhausted> {
        self.exhausted.then_some(ConvergenceExhausted { depth: self.depth })
    }
}

/// The Efron-Thisted estimator used the maximum depth without reaching its threshold.
///
/// This is informational: the estimate at the maximum depth is still reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConvergenceExhausted {
    depth: usize,
}

impl fmt::Display for ConvergenceExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Efron-Thisted extrapolation reached maximum depth {} without reaching threshold",
            self.depth
        )
    }
}

impl std::error::Error for ConvergenceExhausted {}

#[cfg(test)]
mod tests {
    use super::*;

    fn frequencies(counts: &[u64]) -> Frequencies {
        counts.iter().copied().collect()
    }

    #[test]
    fn test_frequencies() {
        let frequencies = frequencies(&[1, 1, 2, 5, 1]);

        assert_eq!(frequencies.observed(), 5);
        assert_eq!(frequencies.singletons(), 3);
        assert_eq!(frequencies.doubletons(), 1);
        assert_eq!(frequencies.get(5), 1);
        assert_eq!(frequencies.get(3), 0);
    }

    #[test]
    fn test_chao1_without_rare_clonotypes() {
        let chao1 = Chao1::from_frequencies(&frequencies(&[3, 4, 10]));

        assert_eq!(chao1.estimate, 3.0);
        assert_eq!(chao1.std, 0.0);
    }

    #[test]
    fn test_chao1_without_doubletons() {
        // f1 = 3, f2 = 0, so f0 = 3 * 2 / 2 / 1 = 3
        let chao1 = Chao1::from_frequencies(&frequencies(&[1, 1, 1, 7]));

        assert_approx_eq!(chao1.estimate, 7.0);
    }

    #[test]
    fn test_chao1() {
        // f1 = 4, f2 = 2, so f0 = 4 * 3 / 2 / 3 = 2
        let chao1 = Chao1::from_frequencies(&frequencies(&[1, 1, 1, 1, 2, 2, 9]));

        assert_approx_eq!(chao1.estimate, 9.0);

        let variance = 2.0 + 4.0 * 49.0 / 4.0 / 9.0 + 16.0 * 2.0 * 9.0 / 4.0 / 81.0;
        assert_approx_eq!(chao1.std, f64::sqrt(variance));
    }

    #[test]
    fn test_efron_thisted_stops_at_first_depth() {
        // Depth 1: h = [1], nx = [2], so S = 4 + 2 = 6 and D = sqrt(2), with CV ≈ 0.236
        let et = EfronThisted::from_frequencies(
            &frequencies(&[1, 1, 3, 4]),
            EfronThistedParams::default(),
        );

        assert_approx_eq!(et.estimate, 6.0);
        assert_approx_eq!(et.std, f64::sqrt(2.0));
        assert_eq!(et.depth, 1);
        assert_eq!(et.exhausted(), None);
    }

    #[test]
    fn test_efron_thisted_second_depth() {
        // Depth 1: S = 201 + 1, D = 1, CV < 0.05
        // Depth 2: h = [2, -1], nx = [1, 100], so S = 201 + 2 - 100 = 103 and
        // D = sqrt(4 + 100), with CV ≈ 0.099
        let mut counts = vec![1];
        counts.extend([2; 100]);
        counts.extend([50; 100]);
        let et =
            EfronThisted::from_frequencies(&frequencies(&counts), EfronThistedParams::default());

        assert_approx_eq!(et.estimate, 103.0);
        assert_approx_eq!(et.std, f64::sqrt(104.0));
        assert_eq!(et.depth, 2);
    }

    #[test]
    fn test_efron_thisted_exhausted() {
        // Without clonotypes of count at most the maximum depth, nothing is extrapolated
        let et = EfronThisted::from_frequencies(
            &frequencies(&[100, 200, 300]),
            EfronThistedParams::default(),
        );

        assert_eq!(et.estimate, 3.0);
        assert_eq!(et.std, 0.0);
        assert_eq!(et.depth, 20);
        assert_eq!(et.exhausted(), Some(ConvergenceExhausted { depth: 20 }));
    }

    #[test]
    fn test_efron_thisted_custom_depth() {
        let params = EfronThistedParams::new(NonZeroUsize::new(3).unwrap(), 0.05);

        let et = EfronThisted::from_frequencies(&frequencies(&[100, 200]), params);

        assert_eq!(et.depth, 3);
        assert!(et.exhausted);
    }

    #[test]
    fn test_efron_thisted_deep_extrapolation() {
        let params = EfronThistedParams::new(NonZeroUsize::new(80).unwrap(), 0.05);

        let et = EfronThisted::from_frequencies(&frequencies(&[100, 200]), params);

        assert_eq!(et.estimate, 2.0);
        assert_eq!(et.std, 0.0);
        assert_eq!(et.depth, 80);
        assert!(et.exhausted);
    }

    #[test]
    fn test_euler_weights() {
        // At depth 3, h = [1 + 1 + 1, -1 - 2, 1] = [3, -3, 1]
        let frequencies = frequencies(&[1, 2, 3]);

        let (estimate, std) = EfronThisted::extrapolate(&frequencies, 3);

        assert_approx_eq!(estimate, 3.0 + 3.0 - 3.0 + 1.0);
        assert_approx_eq!(std, f64::sqrt(9.0 + 9.0 + 1.0));
    }
}
