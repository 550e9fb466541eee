pub mod fasta;

use std::collections::HashMap;

/// Abundance given to sequences produced by merging.
pub const MERGED_ABUNDANCE: f64 = 32767.0;

/// An assembled sequence under consideration as a genome fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRecord {
    pub id: String,
    /// Uppercase nucleotide symbols
    pub residues: Vec<u8>,
    /// Coverage-depth weight (`multi=` in the FASTA header)
    pub abundance: f64,
    /// Set once the ends are found to overlap each other
    pub circular: bool,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, residues: impl Into<Vec<u8>>, abundance: f64) -> Self {
        let mut residues = residues.into();
        residues.make_ascii_uppercase();
        Self {
            id: id.into(),
            residues,
            abundance,
            circular: false,
        }
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Header flag: 3 for circular sequences, 1 otherwise.
    pub fn flag(&self) -> u8 {
        if self.circular {
            3
        } else {
            1
        }
    }
}

/// Reverse complement of a nucleotide string (IUPAC ambiguity codes kept).
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' | b'U' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            b'R' => b'Y',
            b'Y' => b'R',
            b'K' => b'M',
            b'M' => b'K',
            b'B' => b'V',
            b'V' => b'B',
            b'D' => b'H',
            b'H' => b'D',
            b'a' => b't',
            b't' | b'u' => b'a',
            b'c' => b'g',
            b'g' => b'c',
            other => other,
        })
        .collect()
}

/// An ordered set of sequences with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequencePool {
    records: Vec<SequenceRecord>,
    index: HashMap<String, usize>,
}

impl SequencePool {
    /// Build a pool. Later records with an already-seen id are ignored.
    pub fn new(records: impl IntoIterator<Item = SequenceRecord>) -> Self {
        let mut pool = Self::default();
        for rec in records {
            if pool.index.contains_key(&rec.id) {
                log::warn!("Duplicate sequence id '{}' ignored", rec.id);
                continue;
            }
            pool.index.insert(rec.id.clone(), pool.records.len());
            pool.records.push(rec);
        }
        pool
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SequenceRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<SequenceRecord> {
        self.records
    }

    /// New pool keeping the records that satisfy `pred`, in order.
    pub fn filter(&self, pred: impl Fn(&SequenceRecord) -> bool) -> Self {
        Self::new(self.records.iter().filter(|r| pred(r)).cloned())
    }
}

impl FromIterator<SequenceRecord> for SequencePool {
    fn from_iter<I: IntoIterator<Item = SequenceRecord>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a SequencePool {
    type Item = &'a SequenceRecord;
    type IntoIter = std::slice::Iter<'a, SequenceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
