#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Diversity and overlap statistics for immune repertoires.
//!
//! This serves as the core library implementation for the `clonal` CLI, but can also be used as a
//! free-standing library for working with clonotype tables.
//!
//! # Overview
//!
//! The core struct is a [`ClonotypeTable`], which holds the clonotypes of a single sample after
//! grouping rows under an [`IdentityCriterion`]. Diversity indices are computed from one table by
//! a [`DiversityEstimator`], while overlap metrics are computed from an ordered pair of tables by
//! an [`OverlapEstimator`]. The [`batch`] module evaluates many samples in parallel, and the
//! [`report`] module assembles results into tables.
//!
//! # Example
//!
//! Let's read a small table grouped by CDR3 amino acid sequence, and compute its diversity.
//!
//! ```
//! use clonal_core::{table::io::Builder, DiversityEstimator, IdentityCriterion};
//!
//! let src = "readCount\treadFraction\taaSeqCDR3\n\
//!            2\t0.5\tCASSLGF\n\
//!            1\t0.25\tCASSPGF\n\
//!            1\t0.25\tCASSLGF\n";
//!
//! let table = Builder::default()
//!     .set_criterion(IdentityCriterion::Cdr3Aa)
//!     .read("donor1", src.as_bytes())?;
//!
//! let diversity = DiversityEstimator::default().estimate(&table)?;
//!
//! assert_eq!(diversity.observed.0, 2);
//! assert_eq!(diversity.d50.0, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(test)]
#[macro_use]
pub(crate) mod approx;

pub mod batch;

pub mod criterion;
pub use criterion::IdentityCriterion;

pub mod diversity;
pub use diversity::DiversityEstimator;

pub mod overlap;
pub use overlap::OverlapEstimator;

pub mod report;

pub mod table;
pub use table::ClonotypeTable;

pub mod utils;
