use std::fmt;

use serde::{Serialize, Serializer};

/// Structured identity of a reference query.
///
/// Reference proteins and profiles are named
/// `<acc>_<acc>_<acc>_<gene>_<genus>_<species>`. The id is split once when a
/// hit is ingested; every later stage compares the typed fields. Ids that do
/// not follow the convention are their own gene name and carry no species.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId {
    raw: String,
    accession: String,
    gene: String,
    species: Option<String>,
}

impl QueryId {
    pub fn parse(raw: &str) -> Self {
        let tokens: Vec<&str> = raw.split('_').collect();
        if tokens.len() < 4 {
            return Self {
                raw: raw.to_string(),
                accession: String::new(),
                gene: raw.to_string(),
                species: None,
            };
        }

        let species = match &tokens[4..] {
            [] => None,
            [genus] => Some(genus.to_string()),
            [genus, epithet, ..] => Some(format!("{genus} {epithet}")),
        };

        Self {
            raw: raw.to_string(),
            accession: tokens[..3].join("_"),
            gene: tokens[3].to_string(),
            species,
        }
    }

    /// The id exactly as the aligner reported it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn accession(&self) -> &str {
        &self.accession
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    /// "Genus species", when the id carries one.
    pub fn species(&self) -> Option<&str> {
        self.species.as_deref()
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for QueryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
