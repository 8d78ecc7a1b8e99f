//! Diversity indices of a single sample.
//!
//! Every index is a pure function of one [`ClonotypeTable`] and is computed from read fractions,
//! except for the richness estimators in [`richness`], which are computed from read counts.
//! All indices are undefined for an empty sample, and fail with an [`EmptySampleError`].

use std::fmt;

use crate::{utils::is_close, ClonotypeTable};

pub mod richness;
pub use richness::{Chao1, ConvergenceExhausted, EfronThisted, EfronThistedParams, Frequencies};

/// Relative tolerance used when testing whether a cumulative fraction equals one half.
pub const D50_TOLERANCE: f64 = 1e-9;

fn non_empty(table: &ClonotypeTable) -> Result<&ClonotypeTable, EmptySampleError> {
    if table.is_empty() {
        Err(EmptySampleError {
            sample_id: table.sample_id().to_string(),
        })
    } else {
        Ok(table)
    }
}

/// The number of clonotypes in a sample.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Observed(pub usize);

impl Observed {
    /// Computes the index for the sample in a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        non_empty(table).map(|table| Self(table.len()))
    }
}

/// Shannon entropy of the read fractions, in nats.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Entropy(pub f64);

impl Entropy {
    /// Computes the index for the sample in a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        non_empty(table).map(|table| Self::from_fractions(table.iter_fractions()))
    }

    fn from_fractions<I>(fractions: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        // Empty clonotypes contribute nothing, taking 0 ln 0 = 0
        Self(
            -fractions
                .into_iter()
                .filter(|&p| p > 0.0)
                .map(|p| p * p.ln())
                .sum::<f64>(),
        )
    }
}

/// The Shannon-Wiener diversity, or exponential of the [`Entropy`].
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct ShannonWiener(pub f64);

impl ShannonWiener {
    /// Computes the index for the sample in a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        Entropy::from_table(table).map(|entropy| Self(entropy.0.exp()))
    }
}

/// The [`Entropy`] divided by its maximum for the observed number of clonotypes.
///
/// This is not finite for samples with a single clonotype.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct NormalizedShannonWiener(pub f64);

impl NormalizedShannonWiener {
    /// Computes the index for the sample in a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        let entropy = Entropy::from_table(table)?;
        let observed = Observed::from_table(table)?;

        Ok(Self::from_entropy(entropy, observed))
    }

    fn from_entropy(entropy: Entropy, observed: Observed) -> Self {
        Self(entropy.0 / (observed.0 as f64).ln())
    }
}

/// The inverse of the Simpson concentration, that is, of the sum of squared read fractions.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct InverseSimpson(pub f64);

impl InverseSimpson {
    /// Computes the index for the sample in a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        non_empty(table).map(|table| Self::from_fractions(table.iter_fractions()))
    }

    fn from_fractions<I>(fractions: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self(1.0 / fractions.into_iter().map(|p| p * p).sum::<f64>())
    }
}

/// The Gini index as reported for repertoires, `1 + 1 / InverseSimpson`.
///
/// Note that this is not the Gini coefficient of the abundance distribution.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Gini(pub f64);

impl Gini {
    /// Computes the index for the sample in a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        InverseSimpson::from_table(table).map(Self::from_inverse_simpson)
    }

    fn from_inverse_simpson(inverse_simpson: InverseSimpson) -> Self {
        Self(1.0 - (-1.0 / inverse_simpson.0))
    }
}

/// The smallest number of most abundant clonotypes accounting for half of the reads.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct D50(pub usize);

impl D50 {
    /// Computes the index for the sample in a table.
    pub fn from_table(table: &ClonotypeTable) -> Result<Self, EmptySampleError> {
        non_empty(table).map(|table| Self::from_fractions(table.iter_fractions()))
    }

    /// Computes d50 from fractions in rank order.
    ///
    /// If a cumulative sum equals one half within [`D50_TOLERANCE`], the first such rank is used.
    /// Otherwise, the first rank where the cumulative sum exceeds one half is used.
    fn from_fractions<I>(fractions: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let cumulative = fractions
            .into_iter()
            .scan(0.0, |sum, p| {
                *sum += p;
                Some(*sum)
            })
            .collect::<Vec<_>>();

        let rank = cumulative
            .iter()
            .position(|&sum| is_close(sum, 0.5, D50_TOLERANCE))
            .or_else(|| cumulative.iter().position(|&sum| sum >= 0.5))
            // Validated fractions always reach one half
            .unwrap_or(cumulative.len() - 1);

        Self(rank + 1)
    }
}

/// All diversity indices of one sample.
#[derive(Clone, Debug, PartialEq)]
pub struct DiversityResult {
    /// Sample identifier.
    pub sample_id: String,
    /// Observed diversity.
    pub observed: Observed,
    /// Shannon-Wiener diversity.
    pub shannon_wiener: ShannonWiener,
    /// Normalized Shannon-Wiener index.
    pub normalized_shannon_wiener: NormalizedShannonWiener,
    /// Inverse Simpson index.
    pub inverse_simpson: InverseSimpson,
    /// Gini index.
    pub gini: Gini,
    /// Chao1 estimate.
    pub chao1: Chao1,
    /// d50.
    pub d50: D50,
    /// Efron-Thisted estimate.
    pub efron_thisted: EfronThisted,
}

/// Computes all diversity indices of a sample.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiversityEstimator {
    efron_thisted: EfronThistedParams,
}

impl DiversityEstimator {
    /// Creates a new estimator.
    pub fn new(efron_thisted: EfronThistedParams) -> Self {
        Self { efron_thisted }
    }

    /// Computes all indices for the sample in the table.
    pub fn estimate(&self, table: &ClonotypeTable) -> Result<DiversityResult, EmptySampleError> {
        let sample_id = table.sample_id();

        let observed = Observed::from_table(table)?;
        let entropy = Entropy::from_fractions(table.iter_fractions());
        let inverse_simpson = InverseSimpson::from_fractions(table.iter_fractions());
        let frequencies = Frequencies::from_table(table);

        let normalized_shannon_wiener = NormalizedShannonWiener::from_entropy(entropy, observed);
        if !normalized_shannon_wiener.0.is_finite() {
            log::warn!(
                "Normalized Shannon-Wiener index undefined for sample '{sample_id}' \
                with {} clonotype(s)",
                observed.0
            );
        }

        let efron_thisted = EfronThisted::from_frequencies(&frequencies, self.efron_thisted);
        if let Some(exhausted) = efron_thisted.exhausted() {
            log::debug!("{exhausted} for sample '{sample_id}'");
        }

        Ok(DiversityResult {
            sample_id: sample_id.to_string(),
            observed,
            shannon_wiener: ShannonWiener(entropy.0.exp()),
            normalized_shannon_wiener,
            inverse_simpson,
            gini: Gini::from_inverse_simpson(inverse_simpson),
            chao1: Chao1::from_frequencies(&frequencies),
            d50: D50::from_fractions(table.iter_fractions()),
            efron_thisted,
        })
    }
}

/// An error associated with computing an index for a sample without clonotypes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmptySampleError {
    sample_id: String,
}

impl fmt::Display for EmptySampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sample '{}' has no clonotypes", self.sample_id)
    }
}

impl std::error::Error for EmptySampleError {}
