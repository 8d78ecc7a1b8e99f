//! Overlap metrics between pairs of samples.
//!
//! Two samples are compared by joining their clonotype tables on the clonotype key: only
//! clonotypes present in both samples contribute. The join is computed once per ordered pair,
//! and every metric is derived from it.

use std::{fmt, str::FromStr};

use crate::{criterion::IdentityCriterion, utils::round_decimals, ClonotypeTable};

/// Number of decimals to which the Pearson correlation is rounded.
pub const PEARSON_DECIMALS: i32 = 8;

/// A metric of overlap between two samples.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum OverlapMetric {
    /// Number of clonotypes present in both samples.
    SharedClonotypes,
    /// Pearson correlation of the read fractions of shared clonotypes.
    Pearson,
    /// Number of shared clonotypes divided by the product of the numbers of clonotypes.
    RelativeDiversity,
    /// Geometric mean of the total read fractions of shared clonotypes in either sample.
    F1Index,
    /// Sum of geometric means of the read fractions of each shared clonotype.
    F2Index,
    /// Number of shared clonotypes divided by the number of clonotypes in either sample.
    JaccardIndex,
}

impl OverlapMetric {
    /// All metrics, in canonical order.
    pub const ALL: [OverlapMetric; 6] = [
        OverlapMetric::SharedClonotypes,
        OverlapMetric::Pearson,
        OverlapMetric::RelativeDiversity,
        OverlapMetric::F1Index,
        OverlapMetric::F2Index,
        OverlapMetric::JaccardIndex,
    ];

    /// Returns the name of the metric, as used in report headers and file names.
    pub fn name(&self) -> &'static str {
        match self {
            OverlapMetric::SharedClonotypes => "SharedClonotypes",
            OverlapMetric::Pearson => "Pearson",
            OverlapMetric::RelativeDiversity => "RelativeDiversity",
            OverlapMetric::F1Index => "F1Index",
            OverlapMetric::F2Index => "F2Index",
            OverlapMetric::JaccardIndex => "JaccardIndex",
        }
    }
}

impl fmt::Display for OverlapMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OverlapMetric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseMetricError(s.to_string()))
    }
}

/// An error associated with parsing an overlap metric.
#[derive(Debug, Eq, PartialEq)]
pub struct ParseMetricError(String);

impl fmt::Display for ParseMetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown overlap metric '{}'", self.0)
    }
}

impl std::error::Error for ParseMetricError {}

/// The inner join of two clonotype tables.
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    n1: usize,
    n2: usize,
    matched: Vec<(f64, f64)>,
}

impl Join {
    /// Joins two tables grouped under the same criterion.
    ///
    /// Matched read fraction pairs are ordered by clonotype key.
    pub fn new(a: &ClonotypeTable, b: &ClonotypeTable) -> Result<Self, CriterionMismatchError> {
        if a.criterion() != b.criterion() {
            return Err(CriterionMismatchError {
                left: a.criterion(),
                right: b.criterion(),
            });
        }

        let mut matched = a
            .iter()
            .filter_map(|(key, x)| b.get(key).map(|y| (key, x.read_fraction, y.read_fraction)))
            .collect::<Vec<_>>();
        matched.sort_by(|x, y| x.0.cmp(y.0));

        Ok(Self {
            n1: a.len(),
            n2: b.len(),
            matched: matched.into_iter().map(|(_, x, y)| (x, y)).collect(),
        })
    }

    /// Returns the number of clonotypes in the first sample.
    pub fn n1(&self) -> usize {
        self.n1
    }

    /// Returns the number of clonotypes in the second sample.
    pub fn n2(&self) -> usize {
        self.n2
    }

    /// Returns the number of shared clonotypes.
    pub fn shared(&self) -> usize {
        self.matched.len()
    }

    fn is_disjoint(&self) -> bool {
        self.matched.is_empty()
    }

    fn pearson(&self) -> f64 {
        if self.is_disjoint() {
            return 0.0;
        }

        let n = self.shared() as f64;
        let (sum_x, sum_y) = self
            .matched
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let (mean_x, mean_y) = (sum_x / n, sum_y / n);

        let (ss_x, ss_y, ss_xy) =
            self.matched
                .iter()
                .fold((0.0, 0.0, 0.0), |(ss_x, ss_y, ss_xy), (x, y)| {
                    let (dx, dy) = (x - mean_x, y - mean_y);
                    (ss_x + dx * dx, ss_y + dy * dy, ss_xy + dx * dy)
                });

        let denominator = (ss_x / n * ss_y / n).sqrt();
        let r = if denominator == 0.0 {
            0.0
        } else {
            (ss_xy / n / denominator).clamp(-1.0, 1.0)
        };

        // Only exact perfect anticorrelation is reported as no correlation
        let r = if r == -1.0 { 0.0 } else { r };
        round_decimals(r, PEARSON_DECIMALS) + 0.0
    }

    fn relative_diversity(&self) -> f64 {
        if self.is_disjoint() {
            0.0
        } else {
            self.shared() as f64 / self.n1 as f64 / self.n2 as f64
        }
    }

    fn f1(&self) -> f64 {
        if self.is_disjoint() {
            0.0
        } else {
            let (sum_x, sum_y) = self
                .matched
                .iter()
                .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
            (sum_x * sum_y).sqrt()
        }
    }

    fn f2(&self) -> f64 {
        if self.is_disjoint() {
            0.0
        } else {
            self.matched.iter().map(|(x, y)| (x * y).sqrt()).sum()
        }
    }

    fn jaccard(&self) -> f64 {
        if self.is_disjoint() {
            0.0
        } else {
            let shared = self.shared();
            shared as f64 / (self.n1 + self.n2 - shared) as f64
        }
    }
}

/// All overlap metrics of an ordered pair of samples.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlapResult {
    /// Identifier of the first sample.
    pub sample_id_1: String,
    /// Identifier of the second sample.
    pub sample_id_2: String,
    /// Number of clonotypes in the first sample.
    pub n1: usize,
    /// Number of clonotypes in the second sample.
    pub n2: usize,
    /// Number of shared clonotypes.
    pub shared_clonotypes: usize,
    /// Pearson correlation, see [`OverlapMetric::Pearson`].
    pub pearson: f64,
    /// Relative diversity, see [`OverlapMetric::RelativeDiversity`].
    pub relative_diversity: f64,
    /// F1 index, see [`OverlapMetric::F1Index`].
    pub f1_index: f64,
    /// F2 index, see [`OverlapMetric::F2Index`].
    pub f2_index: f64,
    /// Jaccard index, see [`OverlapMetric::JaccardIndex`].
    pub jaccard_index: f64,
}

impl OverlapResult {
    /// Returns the value of a metric.
    pub fn get(&self, metric: OverlapMetric) -> f64 {
        match metric {
            OverlapMetric::SharedClonotypes => self.shared_clonotypes as f64,
            OverlapMetric::Pearson => self.pearson,
            OverlapMetric::RelativeDiversity => self.relative_diversity,
            OverlapMetric::F1Index => self.f1_index,
            OverlapMetric::F2Index => self.f2_index,
            OverlapMetric::JaccardIndex => self.jaccard_index,
        }
    }
}

/// Computes overlap metrics between two samples.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlapEstimator;

impl OverlapEstimator {
    /// Computes all metrics for the ordered pair `(a, b)`.
    pub fn estimate(
        &self,
        a: &ClonotypeTable,
        b: &ClonotypeTable,
    ) -> Result<OverlapResult, CriterionMismatchError> {
        let join = Join::new(a, b)?;

        log::trace!(
            "Joined '{}' ({}) and '{}' ({}) on {} shared clonotypes",
            a.sample_id(),
            join.n1(),
            b.sample_id(),
            join.n2(),
            join.shared(),
        );

        Ok(OverlapResult {
            sample_id_1: a.sample_id().to_string(),
            sample_id_2: b.sample_id().to_string(),
            n1: join.n1(),
            n2: join.n2(),
            shared_clonotypes: join.shared(),
            pearson: join.pearson(),
            relative_diversity: join.relative_diversity(),
            f1_index: join.f1(),
            f2_index: join.f2(),
            jaccard_index: join.jaccard(),
        })
    }
}

/// An error associated with comparing tables grouped under different criteria.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CriterionMismatchError {
    left: IdentityCriterion,
    right: IdentityCriterion,
}

impl fmt::Display for CriterionMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let CriterionMismatchError { left, right } = self;
        write!(
            f,
            "cannot compare clonotypes grouped by {left} with clonotypes grouped by {right}"
        )
    }
}

impl std::error::Error for CriterionMismatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::table::tests::{record, table};

    fn estimate(a: &ClonotypeTable, b: &ClonotypeTable) -> OverlapResult {
        OverlapEstimator.estimate(a, b).unwrap()
    }

    fn sample_a() -> ClonotypeTable {
        table("A", &[("KEY1", 3, 0.6), ("KEY2", 1, 0.4)])
    }

    fn sample_b() -> ClonotypeTable {
        table("B", &[("KEY1", 2, 0.5), ("KEY3", 1, 0.5)])
    }

    #[test]
    fn test_single_shared_clonotype() {
        let result = estimate(&sample_a(), &sample_b());

        assert_eq!(result.sample_id_1, "A");
        assert_eq!(result.sample_id_2, "B");
        assert_eq!(result.shared_clonotypes, 1);
        assert_eq!((result.n1, result.n2), (2, 2));
        assert_approx_eq!(result.relative_diversity, 0.25);
        assert_approx_eq!(result.jaccard_index, 1.0 / 3.0);
        assert_approx_eq!(result.f1_index, 0.3f64.sqrt());
        assert_approx_eq!(result.f2_index, 0.3f64.sqrt());
        // A single point has no variance
        assert_eq!(result.pearson, 0.0);
    }

    #[test]
    fn test_disjoint() {
        let a = table("A", &[("KEY1", 1, 0.5), ("KEY2", 1, 0.5)]);
        let b = table("B", &[("KEY3", 1, 1.0)]);

        let result = estimate(&a, &b);

        for metric in OverlapMetric::ALL {
            assert_eq!(result.get(metric), 0.0, "{metric}");
        }
    }

    #[test]
    fn test_ordered_pairs_agree() {
        let a = table(
            "A",
            &[("KEY1", 5, 0.5), ("KEY2", 3, 0.3), ("KEY3", 1, 0.1), ("KEY4", 1, 0.1)],
        );
        let b = table("B", &[("KEY1", 4, 0.4), ("KEY2", 4, 0.4), ("KEY3", 2, 0.2)]);

        let ab = estimate(&a, &b);
        let ba = estimate(&b, &a);

        assert_eq!((ab.n1, ab.n2), (4, 3));
        assert_eq!((ba.n1, ba.n2), (3, 4));
        assert_eq!(ab.shared_clonotypes, ba.shared_clonotypes);
        for metric in OverlapMetric::ALL {
            assert_approx_eq!(ab.get(metric), ba.get(metric), epsilon = 1e-12);
        }
        assert_approx_eq!(ab.relative_diversity, 3.0 / 4.0 / 3.0);
    }

    #[test]
    fn test_pearson() {
        let a = table("A", &[("KEY1", 5, 0.5), ("KEY2", 3, 0.3), ("KEY3", 2, 0.2)]);
        let b = table("B", &[("KEY1", 6, 0.6), ("KEY2", 1, 0.1), ("KEY3", 3, 0.3)]);

        // Centered values are [5, -1, -4] / 30 and [8, -7, -1] / 30
        let expected = 51.0 / (42.0 * 114.0f64).sqrt();
        assert_approx_eq!(estimate(&a, &b).pearson, expected, epsilon = 1e-8);
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let a = table("A", &[("KEY1", 6, 0.6), ("KEY2", 4, 0.4)]);
        let b = table("B", &[("KEY1", 7, 0.7), ("KEY2", 3, 0.3)]);

        assert_eq!(estimate(&a, &b).pearson, 1.0);
    }

    #[test]
    fn test_pearson_perfect_anticorrelation_is_zero() {
        let a = table("A", &[("KEY1", 3, 0.75), ("KEY2", 1, 0.25)]);
        let b = table("B", &[("KEY1", 1, 0.25), ("KEY2", 3, 0.75)]);

        assert_eq!(estimate(&a, &b).pearson, 0.0);
    }

    #[test]
    fn test_pearson_near_anticorrelation_rounds_to_minus_one() {
        let a = table("A", &[("KEY1", 3, 0.3), ("KEY2", 3, 0.3), ("KEY3", 4, 0.4)]);
        let b = table(
            "B",
            &[("KEY1", 4, 0.4), ("KEY2", 4, 0.40000001), ("KEY3", 2, 0.19999999)],
        );

        assert_eq!(estimate(&a, &b).pearson, -1.0);
    }

    #[test]
    fn test_pearson_rounded() {
        let a = table("A", &[("KEY1", 5, 0.5), ("KEY2", 3, 0.3), ("KEY3", 2, 0.2)]);
        let b = table("B", &[("KEY1", 6, 0.6), ("KEY2", 1, 0.1), ("KEY3", 3, 0.3)]);

        let pearson = estimate(&a, &b).pearson;

        assert_eq!(pearson, round_decimals(pearson, PEARSON_DECIMALS));
    }

    #[test]
    fn test_criterion_mismatch() {
        let a = sample_a();
        let b = ClonotypeTable::build(
            "B",
            vec![record("KEY1", 1, 1.0)],
            IdentityCriterion::Cdr3AaVj,
        )
        .unwrap();

        assert_eq!(
            OverlapEstimator.estimate(&a, &b),
            Err(CriterionMismatchError {
                left: IdentityCriterion::Cdr3Aa,
                right: IdentityCriterion::Cdr3AaVj,
            })
        );
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!("F2Index".parse(), Ok(OverlapMetric::F2Index));
        assert_eq!("jaccardindex".parse(), Ok(OverlapMetric::JaccardIndex));
        assert!("F3Index".parse::<OverlapMetric>().is_err());
    }
}
