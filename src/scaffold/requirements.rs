/// Required gene sets per clade
///
/// JSON of the form `{ "<clade>": { "<gene>": <expected length>, ... } }`.
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::error::Error;
use crate::io::open_input;

/// Genes one clade's genome is expected to carry exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRequirements {
    pub clade: String,
    lengths: BTreeMap<String, u64>,
}

impl GeneRequirements {
    pub fn new(clade: impl Into<String>, lengths: BTreeMap<String, u64>) -> Self {
        Self {
            clade: clade.into(),
            lengths,
        }
    }

    /// Pick `clade` out of a requirement table.
    pub fn from_reader<R: Read>(reader: R, clade: &str) -> Result<Self, Error> {
        let mut table: BTreeMap<String, BTreeMap<String, u64>> = serde_json::from_reader(reader)?;
        let lengths = table.remove(clade).ok_or_else(|| {
            Error::Parameter(format!(
                "clade '{clade}' not in requirement table (known: {})",
                table.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;
        if lengths.is_empty() {
            return Err(Error::EmptyInput(format!(
                "clade '{clade}' requires no genes"
            )));
        }
        Ok(Self::new(clade, lengths))
    }

    pub fn from_file(path: &Path, clade: &str) -> Result<Self, Error> {
        Self::from_reader(open_input(path)?, clade)
    }

    pub fn expected_length(&self, gene: &str) -> Option<u64> {
        self.lengths.get(gene).copied()
    }

    /// Gene ids in sorted order.
    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.lengths.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "Arthropoda": { "cox1": 1530, "nad1": 930 },
        "Chordata": { "cox1": 1545 },
        "Empty": {}
    }"#;

    #[test]
    fn loads_clade() {
        let req = GeneRequirements::from_reader(TABLE.as_bytes(), "Arthropoda").unwrap();
        assert_eq!(req.len(), 2);
        assert_eq!(req.expected_length("nad1"), Some(930));
        assert_eq!(req.genes().collect::<Vec<_>>(), vec!["cox1", "nad1"]);
    }

    #[test]
    fn unknown_clade_lists_known() {
        let err = GeneRequirements::from_reader(TABLE.as_bytes(), "Mollusca").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Mollusca"));
        assert!(msg.contains("Chordata"));
    }

    #[test]
    fn empty_clade_rejected() {
        let err = GeneRequirements::from_reader(TABLE.as_bytes(), "Empty").unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = GeneRequirements::from_reader("{ not json".as_bytes(), "x").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
