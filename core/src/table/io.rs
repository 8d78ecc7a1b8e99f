//! Reading clonotype tables.
//!
//! Clonotype tables are read from tab-separated files with a header line, as exported by common
//! repertoire assembly tools. Each file holds a single sample. Files may optionally be gzipped,
//! in which case this is detected automatically.

use std::{io, path::Path};

pub mod read;
pub use read::{Builder, ReadError};

/// A compression method for input tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMethod {
    /// Gzip, including multi-member files such as BGZF.
    Gzip,
}

impl CompressionMethod {
    const GZIP_MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];

    /// Detects the compression method from the start of a stream, without consuming it.
    pub fn detect<R>(reader: &mut R) -> io::Result<Option<Self>>
    where
        R: io::BufRead,
    {
        let src = reader.fill_buf()?;

        Ok(Self::detect_bytes(src))
    }

    fn detect_bytes(src: &[u8]) -> Option<Self> {
        src.get(..Self::GZIP_MAGIC_NUMBER.len())
            .filter(|&magic| magic == Self::GZIP_MAGIC_NUMBER)
            .map(|_| CompressionMethod::Gzip)
    }
}

/// Returns the sample identifier for a path.
///
/// The identifier is the file name up to its first `.`, so that `donor1.clones.tsv.gz` becomes
/// `donor1`.
pub fn sample_id_from_path<P>(path: P) -> Option<String>
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|id| !id.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_gzip() {
        assert_eq!(
            CompressionMethod::detect_bytes(&[0x1f, 0x8b, 0x08]),
            Some(CompressionMethod::Gzip)
        );
        assert_eq!(CompressionMethod::detect_bytes(b"readCount\t"), None);
        assert_eq!(CompressionMethod::detect_bytes(&[0x1f]), None);
    }

    #[test]
    fn test_sample_id_from_path() {
        assert_eq!(
            sample_id_from_path("data/donor1.clones.tsv.gz").as_deref(),
            Some("donor1")
        );
        assert_eq!(sample_id_from_path("A.tsv").as_deref(), Some("A"));
        assert_eq!(sample_id_from_path(".hidden.tsv"), None);
    }
}
