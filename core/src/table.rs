//! Clonotype tables.
//!
//! A [`ClonotypeTable`] holds the clonotypes of a single sample, grouped under an
//! [`IdentityCriterion`]. Tables are built once from raw [`ClonotypeRecord`]s and are immutable
//! afterwards.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::criterion::{Alphabet, IdentityCriterion, SequenceKey};

pub mod io;

/// Maximum allowed deviation of the sum of read fractions from one.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Column names of clonotype tables.
pub mod column {
    /// Read count.
    pub const READ_COUNT: &str = "readCount";
    /// Read fraction.
    pub const READ_FRACTION: &str = "readFraction";
    /// CDR3 nucleotide sequence.
    pub const CDR3_NT: &str = "nSeqCDR3";
    /// CDR3 amino acid sequence.
    pub const CDR3_AA: &str = "aaSeqCDR3";
    /// V hits with score.
    pub const V_HITS: &str = "allVHitsWithScore";
    /// J hits with score.
    pub const J_HITS: &str = "allJHitsWithScore";
}

/// A raw row of a clonotype table, before grouping.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ClonotypeRecord {
    /// Number of reads.
    #[serde(rename = "readCount", alias = "cloneCount")]
    pub read_count: f64,
    /// Share of the reads of the sample.
    #[serde(rename = "readFraction", alias = "cloneFraction")]
    pub read_fraction: f64,
    /// CDR3 nucleotide sequence.
    #[serde(rename = "nSeqCDR3", default)]
    pub cdr3_nt: Option<String>,
    /// CDR3 amino acid sequence.
    #[serde(rename = "aaSeqCDR3", default)]
    pub cdr3_aa: Option<String>,
    /// V hits, e.g. `TRBV12-3*00(1234)`.
    #[serde(rename = "allVHitsWithScore", default)]
    pub v_hits: Option<String>,
    /// J hits, e.g. `TRBJ2-7*00(300)`.
    #[serde(rename = "allJHitsWithScore", default)]
    pub j_hits: Option<String>,
}

impl ClonotypeRecord {
    fn cdr3(&self, alphabet: Alphabet) -> Option<&str> {
        match alphabet {
            Alphabet::Nucleotide => self.cdr3_nt.as_deref(),
            Alphabet::AminoAcid => self.cdr3_aa.as_deref(),
        }
    }
}

/// The abundance of a clonotype.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Abundance {
    /// Number of reads.
    pub read_count: u64,
    /// Share of the reads of the sample.
    pub read_fraction: f64,
}

impl Abundance {
    fn add(&mut self, other: Abundance) {
        self.read_count += other.read_count;
        self.read_fraction += other.read_fraction;
    }
}

/// The clonotypes of one sample.
///
/// Clonotypes are stored in descending order of read fraction, with ties kept in the order in
/// which their keys were first encountered. The position of a clonotype in this order is its
/// rank, starting from one.
#[derive(Clone, Debug, PartialEq)]
pub struct ClonotypeTable {
    sample_id: String,
    criterion: IdentityCriterion,
    clonotypes: IndexMap<SequenceKey, Abundance>,
}

impl ClonotypeTable {
    /// Builds a table by grouping records under the provided criterion.
    ///
    /// Records sharing a key are merged by summing their read counts and fractions. An empty
    /// iterator gives an empty table.
    pub fn build<I>(
        sample_id: impl Into<String>,
        records: I,
        criterion: IdentityCriterion,
    ) -> Result<Self, MalformedInputError>
    where
        I: IntoIterator<Item = ClonotypeRecord>,
    {
        let sample_id = sample_id.into();
        let mut clonotypes: IndexMap<SequenceKey, Abundance> = IndexMap::new();
        let mut fraction_sum = 0.0;
        let mut rows = 0;

        for (i, record) in records.into_iter().enumerate() {
            let row = i + 1;
            let abundance = Self::validate_abundance(&record, row)?;
            let key = Self::key(&record, criterion, row)?;

            fraction_sum += abundance.read_fraction;
            clonotypes.entry(key).or_default().add(abundance);
            rows = row;
        }

        if rows > 0 && (fraction_sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
            return Err(MalformedInputError::FractionSum { sum: fraction_sum });
        }

        clonotypes.sort_by(|_, a, _, b| b.read_fraction.total_cmp(&a.read_fraction));

        log::debug!(
            "Grouped {rows} rows into {} clonotypes by {criterion} for sample '{sample_id}'",
            clonotypes.len(),
        );

        Ok(Self {
            sample_id,
            criterion,
            clonotypes,
        })
    }

    fn validate_abundance(
        record: &ClonotypeRecord,
        row: usize,
    ) -> Result<Abundance, MalformedInputError> {
        let count = record.read_count;
        if !count.is_finite() || count < 0.0 || count.fract() != 0.0 {
            return Err(MalformedInputError::InvalidCount { row, value: count });
        }

        let fraction = record.read_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(MalformedInputError::InvalidFraction {
                row,
                value: fraction,
            });
        }

        Ok(Abundance {
            read_count: count as u64,
            read_fraction: fraction,
        })
    }

    fn key(
        record: &ClonotypeRecord,
        criterion: IdentityCriterion,
        row: usize,
    ) -> Result<SequenceKey, MalformedInputError> {
        let missing = |column| MalformedInputError::MissingValue { row, column };

        let cdr3 = record.cdr3(criterion.alphabet()).ok_or_else(|| {
            missing(match criterion.alphabet() {
                Alphabet::Nucleotide => column::CDR3_NT,
                Alphabet::AminoAcid => column::CDR3_AA,
            })
        })?;

        if criterion.uses_genes() {
            let v_hits = record
                .v_hits
                .as_deref()
                .ok_or_else(|| missing(column::V_HITS))?;
            let j_hits = record
                .j_hits
                .as_deref()
                .ok_or_else(|| missing(column::J_HITS))?;

            Ok(criterion.key(cdr3, v_hits, j_hits))
        } else {
            Ok(criterion.key(cdr3, "", ""))
        }
    }

    /// Returns the criterion used to group the clonotypes.
    pub fn criterion(&self) -> IdentityCriterion {
        self.criterion
    }

    /// Returns the abundance of the clonotype with the provided key, if present.
    pub fn get(&self, key: &SequenceKey) -> Option<&Abundance> {
        self.clonotypes.get(key)
    }

    /// Returns true if the table has no clonotypes.
    pub fn is_empty(&self) -> bool {
        self.clonotypes.is_empty()
    }

    /// Returns an iterator over clonotypes in rank order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&SequenceKey, &Abundance)> {
        self.clonotypes.iter()
    }

    /// Returns an iterator over read fractions in rank order.
    pub fn iter_fractions(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.clonotypes.values().map(|a| a.read_fraction)
    }

    /// Returns an iterator over read counts in rank order.
    pub fn iter_counts(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        self.clonotypes.values().map(|a| a.read_count)
    }

    /// Returns the number of clonotypes.
    pub fn len(&self) -> usize {
        self.clonotypes.len()
    }

    /// Returns the sample identifier.
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }
}

/// An error associated with malformed input rows.
#[derive(Debug, PartialEq)]
pub enum MalformedInputError {
    /// A required column is absent from the header.
    MissingColumn {
        /// Name of the column.
        column: &'static str,
    },
    /// A value required by the identity criterion is missing.
    MissingValue {
        /// Row number, starting from one after the header.
        row: usize,
        /// Name of the column.
        column: &'static str,
    },
    /// A read count is negative, fractional or not finite.
    InvalidCount {
        /// Row number, starting from one after the header.
        row: usize,
        /// Offending value.
        value: f64,
    },
    /// A read fraction lies outside of [0, 1].
    InvalidFraction {
        /// Row number, starting from one after the header.
        row: usize,
        /// Offending value.
        value: f64,
    },
    /// The read fractions do not sum to one.
    FractionSum {
        /// Sum of read fractions.
        sum: f64,
    },
}

impl fmt::Display for MalformedInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedInputError::MissingColumn { column } => {
                write!(f, "required column '{column}' not found in header")
            }
            MalformedInputError::MissingValue { row, column } => {
                write!(f, "missing value in column '{column}' on row {row}")
            }
            MalformedInputError::InvalidCount { row, value } => {
                write!(f, "invalid read count {value} on row {row}")
            }
            MalformedInputError::InvalidFraction { row, value } => {
                write!(f, "invalid read fraction {value} on row {row}")
            }
            MalformedInputError::FractionSum { sum } => write!(
                f,
                "read fractions sum to {sum}, expected 1 within {FRACTION_SUM_TOLERANCE}"
            ),
        }
    }
}

impl std::error::Error for MalformedInputError {}
