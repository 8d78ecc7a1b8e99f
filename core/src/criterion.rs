//! Identity criteria for grouping and matching clonotypes.

use std::{fmt, str::FromStr};

/// The rule deciding when two clonotypes are considered the same.
///
/// Clonotypes are matched on their CDR3 sequence, either as nucleotides or amino acids, and
/// optionally additionally on their V and J genes.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum IdentityCriterion {
    /// CDR3 nucleotide sequence.
    Cdr3Nt,
    /// CDR3 amino acid sequence.
    Cdr3Aa,
    /// CDR3 nucleotide sequence, V gene and J gene.
    #[default]
    Cdr3NtVj,
    /// CDR3 amino acid sequence, V gene and J gene.
    Cdr3AaVj,
}

impl IdentityCriterion {
    /// All criteria, in the order they are usually reported.
    pub const ALL: [IdentityCriterion; 4] = [
        IdentityCriterion::Cdr3NtVj,
        IdentityCriterion::Cdr3Nt,
        IdentityCriterion::Cdr3Aa,
        IdentityCriterion::Cdr3AaVj,
    ];

    /// Returns the alphabet of the CDR3 sequence used by the criterion.
    pub fn alphabet(&self) -> Alphabet {
        match self {
            IdentityCriterion::Cdr3Nt | IdentityCriterion::Cdr3NtVj => Alphabet::Nucleotide,
            IdentityCriterion::Cdr3Aa | IdentityCriterion::Cdr3AaVj => Alphabet::AminoAcid,
        }
    }

    /// Returns true if V and J genes are part of the identity.
    pub fn uses_genes(&self) -> bool {
        matches!(
            self,
            IdentityCriterion::Cdr3NtVj | IdentityCriterion::Cdr3AaVj
        )
    }

    /// Returns the canonical name, e.g. `CDR3|aa|V|J`.
    pub fn name(&self) -> &'static str {
        match self {
            IdentityCriterion::Cdr3Nt => "CDR3|nt",
            IdentityCriterion::Cdr3Aa => "CDR3|aa",
            IdentityCriterion::Cdr3NtVj => "CDR3|nt|V|J",
            IdentityCriterion::Cdr3AaVj => "CDR3|aa|V|J",
        }
    }

    /// Builds the key of a clonotype under this criterion.
    ///
    /// The V and J hits are only inspected if the criterion uses genes, in which case they are
    /// reduced to their gene name.
    pub fn key(&self, cdr3: &str, v_hits: &str, j_hits: &str) -> SequenceKey {
        let genes = self.uses_genes().then(|| Genes {
            v: gene_name(v_hits).to_string(),
            j: gene_name(j_hits).to_string(),
        });

        SequenceKey {
            cdr3: cdr3.to_string(),
            genes,
        }
    }
}

impl fmt::Display for IdentityCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IdentityCriterion {
    type Err = ParseCriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|criterion| criterion.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| ParseCriterionError(s.to_string()))
    }
}

/// An error associated with parsing an identity criterion.
#[derive(Debug, Eq, PartialEq)]
pub struct ParseCriterionError(String);

impl fmt::Display for ParseCriterionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = IdentityCriterion::ALL.map(|c| c.name()).join(", ");

        write!(
            f,
            "failed to parse '{}' as identity criterion (expected one of {names})",
            self.0
        )
    }
}

impl std::error::Error for ParseCriterionError {}

/// The alphabet of a CDR3 sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Alphabet {
    /// Nucleotides.
    Nucleotide,
    /// Amino acids.
    AminoAcid,
}

/// The V and J genes of a clonotype, without allele.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Genes {
    /// V gene.
    pub v: String,
    /// J gene.
    pub j: String,
}

/// The identity of a clonotype under some [`IdentityCriterion`].
///
/// Keys order lexicographically by CDR3 first, then V gene, then J gene.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SequenceKey {
    /// CDR3 sequence, in the alphabet of the criterion.
    pub cdr3: String,
    /// Genes, if the criterion uses genes.
    pub genes: Option<Genes>,
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.genes {
            Some(Genes { v, j }) => write!(f, "{}|{v}|{j}", self.cdr3),
            None => f.write_str(&self.cdr3),
        }
    }
}

/// Reduces a hit string such as `TRBV12-3*00(1234),TRBV12-4*00(997)` to its gene name.
///
/// Everything from the first allele separator onwards is dropped.
pub fn gene_name(hits: &str) -> &str {
    hits.split('*').next().unwrap_or(hits).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_criterion() {
        assert_eq!("CDR3|nt".parse(), Ok(IdentityCriterion::Cdr3Nt));
        assert_eq!("cdr3|AA|v|j".parse(), Ok(IdentityCriterion::Cdr3AaVj));
        assert!("CDR3|aa|V".parse::<IdentityCriterion>().is_err());
    }

    #[test]
    fn test_display_roundtrips() {
        for criterion in IdentityCriterion::ALL {
            assert_eq!(criterion.to_string().parse(), Ok(criterion));
        }
    }

    #[test]
    fn test_gene_name() {
        assert_eq!(gene_name("TRBV12-3*00(1234),TRBV12-4*00(997)"), "TRBV12-3");
        assert_eq!(gene_name("TRBJ2-7*00(300)"), "TRBJ2-7");
        assert_eq!(gene_name("TRBJ2-7"), "TRBJ2-7");
    }

    #[test]
    fn test_key_without_genes() {
        let key = IdentityCriterion::Cdr3Aa.key("CASSF", "TRBV1*01", "TRBJ1*01");

        assert_eq!(key.genes, None);
        assert_eq!(key.to_string(), "CASSF");
    }

    #[test]
    fn test_key_with_genes() {
        let key = IdentityCriterion::Cdr3AaVj.key("CASSF", "TRBV1*01(10)", "TRBJ1-2*01(5)");

        assert_eq!(key.to_string(), "CASSF|TRBV1|TRBJ1-2");
    }
}
