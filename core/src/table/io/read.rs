//! Utilities for reading clonotype tables.

use std::{fmt, fs, io, path::Path};

use flate2::bufread::MultiGzDecoder;

use crate::{
    criterion::{Alphabet, IdentityCriterion},
    table::{column, ClonotypeRecord, ClonotypeTable, MalformedInputError},
};

use super::CompressionMethod;

/// Alternative names accepted for the abundance columns.
const ALIASES: [(&str, &str); 2] = [
    (column::READ_COUNT, "cloneCount"),
    (column::READ_FRACTION, "cloneFraction"),
];

/// A builder to read a clonotype table.
#[derive(Clone, Copy, Debug, Default)]
pub struct Builder {
    criterion: IdentityCriterion,
    compression_method: Option<Option<CompressionMethod>>,
}

impl Builder {
    /// Reads a table for the provided sample from a reader.
    pub fn read<R>(&self, sample_id: &str, mut reader: R) -> Result<ClonotypeTable, ReadError>
    where
        R: io::BufRead,
    {
        let compression_method = match self.compression_method {
            Some(compression_method) => compression_method,
            None => CompressionMethod::detect(&mut reader)?,
        };

        match compression_method {
            Some(CompressionMethod::Gzip) => {
                self.read_uncompressed(sample_id, MultiGzDecoder::new(reader))
            }
            None => self.read_uncompressed(sample_id, reader),
        }
    }

    /// Reads a table for the provided sample from a path.
    pub fn read_from_path<P>(&self, sample_id: &str, path: P) -> Result<ClonotypeTable, ReadError>
    where
        P: AsRef<Path>,
    {
        let reader = fs::File::open(path).map(io::BufReader::new)?;

        self.read(sample_id, reader)
    }

    fn read_uncompressed<R>(&self, sample_id: &str, reader: R) -> Result<ClonotypeTable, ReadError>
    where
        R: io::Read,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .from_reader(reader);

        check_columns(reader.headers()?, self.criterion)?;

        let records = reader
            .deserialize::<ClonotypeRecord>()
            .collect::<Result<Vec<_>, _>>()?;

        ClonotypeTable::build(sample_id, records, self.criterion).map_err(ReadError::from)
    }

    /// Set compression method.
    ///
    /// If unset, the compression method will automatically be detected when reading.
    pub fn set_compression_method(mut self, compression_method: Option<CompressionMethod>) -> Self {
        self.compression_method = Some(compression_method);
        self
    }

    /// Set the criterion used to group clonotypes.
    pub fn set_criterion(mut self, criterion: IdentityCriterion) -> Self {
        self.criterion = criterion;
        self
    }
}

fn check_columns(
    headers: &csv::StringRecord,
    criterion: IdentityCriterion,
) -> Result<(), MalformedInputError> {
    let mut required = vec![column::READ_COUNT, column::READ_FRACTION];
    required.push(match criterion.alphabet() {
        Alphabet::Nucleotide => column::CDR3_NT,
        Alphabet::AminoAcid => column::CDR3_AA,
    });
    if criterion.uses_genes() {
        required.extend([column::V_HITS, column::J_HITS]);
    }

    let present = |name: &str| headers.iter().any(|header| header == name);
    let alias = |name: &str| {
        ALIASES
            .iter()
            .find(|(column, _)| *column == name)
            .map(|&(_, alias)| alias)
    };

    match required
        .into_iter()
        .find(|&column| !present(column) && !alias(column).is_some_and(present))
    {
        Some(column) => Err(MalformedInputError::MissingColumn { column }),
        None => Ok(()),
    }
}

/// An error associated with reading a clonotype table.
#[derive(Debug)]
pub enum ReadError {
    /// I/O error.
    Io(io::Error),
    /// Tab-separated parsing error.
    Csv(csv::Error),
    /// Parsed input does not describe a valid table.
    Malformed(MalformedInputError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "{e}"),
            ReadError::Csv(e) => write!(f, "{e}"),
            ReadError::Malformed(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for ReadError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<MalformedInputError> for ReadError {
    fn from(e: MalformedInputError) -> Self {
        Self::Malformed(e)
    }
}
