//! Evaluation of many samples at once.
//!
//! Each sample, or ordered pair of samples, is an independent item. Items are evaluated in
//! parallel on the current rayon thread pool, and an item that fails does not affect the others:
//! every function here returns the [`Outcomes`] of all items, with successes in canonical order.

use std::{fmt, path::PathBuf};

use rayon::prelude::*;

use crate::{
    diversity::{DiversityEstimator, DiversityResult, EmptySampleError},
    overlap::{CriterionMismatchError, OverlapEstimator, OverlapResult},
    table::io::{Builder, ReadError},
    ClonotypeTable,
};

/// A sample to be read from a path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Source {
    /// Sample identifier.
    pub sample_id: String,
    /// Path to the clonotype table.
    pub path: PathBuf,
}

impl Source {
    /// Creates a new source.
    pub fn new(sample_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            sample_id: sample_id.into(),
            path: path.into(),
        }
    }
}

/// The outcomes of evaluating a batch of items.
#[derive(Debug)]
pub struct Outcomes<T> {
    /// Results of items evaluated successfully.
    pub successes: Vec<T>,
    /// Items that failed.
    pub failures: Vec<Failure>,
}

impl<T> Outcomes<T> {
    fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (String, Result<T, Error>)>,
    {
        let (successes, mut failures) = results.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut successes, mut failures), (item, result)| {
                match result {
                    Ok(v) => successes.push(v),
                    Err(error) => failures.push(Failure { item, error }),
                }
                (successes, failures)
            },
        );
        failures.sort_by(|a: &Failure, b| a.item.cmp(&b.item));

        Self {
            successes,
            failures,
        }
    }

    /// Returns `true` if no item failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An item that failed.
#[derive(Debug)]
pub struct Failure {
    /// Identifier of the item.
    pub item: String,
    /// Reason for the failure.
    pub error: Error,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.item, self.error.kind(), self.error)
    }
}

/// Reads all sources into tables.
///
/// Successful tables are sorted by sample.
pub fn load(sources: &[Source], builder: &Builder) -> Outcomes<ClonotypeTable> {
    let results = sources
        .par_iter()
        .map(|source| {
            let result = builder
                .read_from_path(&source.sample_id, &source.path)
                .map_err(|e| Error::Read {
                    path: source.path.clone(),
                    source: e,
                });
            (source.sample_id.clone(), result)
        })
        .collect::<Vec<_>>();

    let mut outcomes = Outcomes::from_results(results);
    outcomes
        .successes
        .sort_by(|a, b| a.sample_id().cmp(b.sample_id()));

    log::info!(
        "Loaded {} of {} samples",
        outcomes.successes.len(),
        sources.len()
    );

    outcomes
}

/// Computes the diversity of each table.
///
/// Results are sorted by sample.
pub fn diversity(
    tables: &[ClonotypeTable],
    estimator: &DiversityEstimator,
) -> Outcomes<DiversityResult> {
    let results = tables
        .par_iter()
        .map(|table| {
            let result = estimator.estimate(table).map_err(Error::from);
            (table.sample_id().to_string(), result)
        })
        .collect::<Vec<_>>();

    let mut outcomes = Outcomes::from_results(results);
    outcomes
        .successes
        .sort_by(|a, b| a.sample_id.cmp(&b.sample_id));
    outcomes
}

/// Computes the overlap of every ordered pair of distinct tables.
///
/// With `n` tables, there are `n * (n - 1)` pairs. Results are sorted by pair.
pub fn overlap(tables: &[ClonotypeTable]) -> Outcomes<OverlapResult> {
    let pairs = ordered_pairs(tables.len());
    log::info!(
        "Computing overlap of {} ordered pairs of {} samples",
        pairs.len(),
        tables.len()
    );

    let results = pairs
        .into_par_iter()
        .map(|(i, j)| {
            let (a, b) = (&tables[i], &tables[j]);
            let item = format!("{}:{}", a.sample_id(), b.sample_id());
            (item, OverlapEstimator.estimate(a, b).map_err(Error::from))
        })
        .collect::<Vec<_>>();

    let mut outcomes = Outcomes::from_results(results);
    outcomes.successes.sort_by(|a, b| {
        (&a.sample_id_1, &a.sample_id_2).cmp(&(&b.sample_id_1, &b.sample_id_2))
    });
    outcomes
}

fn ordered_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect()
}

/// An error associated with a single item of a batch.
#[derive(Debug)]
pub enum Error {
    /// Failed to read a table from a path.
    Read { path: PathBuf, source: ReadError },
    /// Sample without clonotypes.
    EmptySample(EmptySampleError),
    /// Tables grouped under different criteria.
    CriterionMismatch(CriterionMismatchError),
}

impl Error {
    /// Returns a short name for the kind of error.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Read { source, .. } => match source {
                ReadError::Io(_) => "I/O error",
                ReadError::Csv(_) => "parse error",
                ReadError::Malformed(_) => "malformed input",
            },
            Error::EmptySample(_) => "empty sample",
            Error::CriterionMismatch(_) => "criterion mismatch",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read { path, source } => {
                write!(f, "failed to read '{}': {source}", path.display())
            }
            Error::EmptySample(e) => write!(f, "{e}"),
            Error::CriterionMismatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<EmptySampleError> for Error {
    fn from(e: EmptySampleError) -> Self {
        Self::EmptySample(e)
    }
}

impl From<CriterionMismatchError> for Error {
    fn from(e: CriterionMismatchError) -> Self {
        Self::CriterionMismatch(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        criterion::IdentityCriterion,
        table::{
            tests::{record, table},
            ClonotypeRecord,
        },
    };

    fn tables() -> Vec<ClonotypeTable> {
        vec![
            table("C", &[("KEY1", 1, 1.0)]),
            table("A", &[("KEY1", 3, 0.6), ("KEY2", 1, 0.4)]),
            table("B", &[("KEY1", 2, 0.5), ("KEY3", 1, 0.5)]),
        ]
    }

    #[test]
    fn test_ordered_pairs() {
        assert!(ordered_pairs(0).is_empty());
        assert!(ordered_pairs(1).is_empty());
        assert_eq!(
            ordered_pairs(3),
            [(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)]
        );
    }

    #[test]
    fn test_diversity_sorted_by_sample() {
        let outcomes = diversity(&tables(), &DiversityEstimator::default());

        assert!(outcomes.is_complete());
        let samples = outcomes
            .successes
            .iter()
            .map(|r| r.sample_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(samples, ["A", "B", "C"]);
    }

    #[test]
    fn test_diversity_empty_sample_fails_alone() {
        let records = Vec::<ClonotypeRecord>::new();
        let empty = ClonotypeTable::build("D", records, IdentityCriterion::Cdr3Aa).unwrap();
        let mut tables = tables();
        tables.push(empty);

        let outcomes = diversity(&tables, &DiversityEstimator::default());

        assert_eq!(outcomes.successes.len(), 3);
        assert_eq!(outcomes.failures.len(), 1);
        assert_eq!(outcomes.failures[0].item, "D");
        assert_eq!(outcomes.failures[0].error.kind(), "empty sample");
    }

    #[test]
    fn test_overlap_all_ordered_pairs() {
        let outcomes = overlap(&tables());

        assert!(outcomes.is_complete());
        let pairs = outcomes
            .successes
            .iter()
            .map(|r| (r.sample_id_1.as_str(), r.sample_id_2.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            [
                ("A", "B"),
                ("A", "C"),
                ("B", "A"),
                ("B", "C"),
                ("C", "A"),
                ("C", "B"),
            ]
        );
    }

    #[test]
    fn test_overlap_criterion_mismatch() {
        let nt = ClonotypeTable::build(
            "N",
            [record("CASSA", 1, 1.0)],
            IdentityCriterion::Cdr3Nt,
        )
        .unwrap();
        let mut tables = tables();
        tables.truncate(1);
        tables.push(nt);

        let outcomes = overlap(&tables);

        assert!(outcomes.successes.is_empty());
        let items = outcomes
            .failures
            .iter()
            .map(|f| f.item.as_str())
            .collect::<Vec<_>>();
        assert_eq!(items, ["C:N", "N:C"]);
        assert!(outcomes
            .failures
            .iter()
            .all(|f| f.error.kind() == "criterion mismatch"));
    }

    #[test]
    fn test_load_missing_file() {
        let sources = [Source::new("missing", "/nonexistent/missing.tsv")];

        let outcomes = load(&sources, &Builder::default());

        assert!(outcomes.successes.is_empty());
        let failure = &outcomes.failures[0];
        assert_eq!(failure.item, "missing");
        assert_eq!(failure.error.kind(), "I/O error");
        assert!(failure
            .to_string()
            .starts_with("missing (I/O error): failed to read '/nonexistent/missing.tsv': "));
    }
}
