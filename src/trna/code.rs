/// NCBI genetic code tables
///
/// Each table is the 64-letter amino acid string in NCBI order
/// (first base TCAG slowest, third base TCAG fastest). `*` marks stops.
use std::collections::BTreeSet;

use crate::error::Error;

const TABLES: &[(u8, &str, &[u8; 64])] = &[
    (
        1,
        "Standard",
        b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    (
        2,
        "Vertebrate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG",
    ),
    (
        3,
        "Yeast Mitochondrial",
        b"FFLLSSSSYY**CCWWTTTTPPPPHHQQRRRRIIMMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    (
        4,
        "Mold Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    (
        5,
        "Invertebrate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSSSVVVVAAAADDEEGGGG",
    ),
    (
        9,
        "Echinoderm Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
    ),
    (
        13,
        "Ascidian Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSGGVVVVAAAADDEEGGGG",
    ),
    (
        14,
        "Alternative Flatworm Mitochondrial",
        b"FFLLSSSSYYY*CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
    ),
];

fn base_index(base: u8) -> Option<usize> {
    match base.to_ascii_uppercase() {
        b'T' | b'U' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

/// A codon → amino acid translation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneticCode {
    pub id: u8,
    pub name: &'static str,
    amino_acids: &'static [u8; 64],
}

impl GeneticCode {
    pub fn from_id(id: u8) -> Result<Self, Error> {
        TABLES
            .iter()
            .find(|(table_id, _, _)| *table_id == id)
            .map(|&(id, name, amino_acids)| Self {
                id,
                name,
                amino_acids,
            })
            .ok_or_else(|| {
                let known: Vec<String> = TABLES.iter().map(|(i, _, _)| i.to_string()).collect();
                Error::Parameter(format!(
                    "unsupported genetic code {id}; known codes: {}",
                    known.join(", ")
                ))
            })
    }

    /// Translate one codon. Stops and ambiguous bases give `None`.
    pub fn translate(&self, codon: &[u8]) -> Option<char> {
        let [b1, b2, b3] = codon else {
            return None;
        };
        let idx = base_index(*b1)? * 16 + base_index(*b2)? * 4 + base_index(*b3)?;
        match self.amino_acids[idx] {
            b'*' => None,
            aa => Some(aa as char),
        }
    }

    /// Every amino acid some codon encodes (stops excluded).
    pub fn amino_acids(&self) -> BTreeSet<char> {
        self.amino_acids
            .iter()
            .filter(|&&aa| aa != b'*')
            .map(|&aa| aa as char)
            .collect()
    }
}
