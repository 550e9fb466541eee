/// Taxonomy predicate over washed protein-search hits
///
/// A target sequence survives when one of its hits comes from a reference
/// species whose lineage agrees with the required taxon deeply enough. Rank
/// lookup itself is a collaborator behind [`RankLookup`]; a TSV-backed
/// implementation is provided.
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::path::Path;

use crate::error::Error;
use crate::io::open_input;
use crate::table::AlignmentTable;

/// Ranks in lineage order, shallowest first.
pub const RANKS: [&str; 7] = [
    "kingdom", "phylum", "class", "order", "family", "genus", "species",
];

/// Names at each of the seven ranks; `None` where the rank is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    names: [Option<String>; 7],
}

impl Lineage {
    pub fn new(names: [Option<String>; 7]) -> Self {
        Self { names }
    }

    pub fn name_at(&self, rank: usize) -> Option<&str> {
        self.names.get(rank)?.as_deref()
    }

    /// Rank at which `name` itself sits in this lineage.
    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_deref() == Some(name))
    }

    /// Deepest rank at which both lineages name the same known taxon.
    pub fn deepest_shared_rank(&self, other: &Lineage) -> Option<usize> {
        (0..RANKS.len())
            .rev()
            .find(|&i| matches!((self.name_at(i), other.name_at(i)), (Some(a), Some(b)) if a == b))
    }
}

/// Lineage lookup by taxon or species name.
pub trait RankLookup {
    fn lineage(&self, name: &str) -> Option<Lineage>;
}

/// Lineages read from a TSV: `name`, then one column per rank.
/// `NA` or an empty cell marks an unknown rank.
#[derive(Debug, Default)]
pub struct TsvLineageLookup {
    lineages: HashMap<String, Lineage>,
}

impl TsvLineageLookup {
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(reader);

        let mut lineages = HashMap::new();
        for result in rdr.records() {
            let record = result?;
            let Some(name) = record.get(0).map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            let mut names: [Option<String>; 7] = Default::default();
            for (rank, slot) in names.iter_mut().enumerate() {
                *slot = record
                    .get(rank + 1)
                    .map(str::trim)
                    .filter(|v| !v.is_empty() && *v != "NA")
                    .map(str::to_string);
            }
            lineages.insert(name.to_string(), Lineage::new(names));
        }

        log::info!("Loaded {} lineages", lineages.len());
        Ok(Self { lineages })
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_reader(open_input(path)?)
    }
}

impl RankLookup for TsvLineageLookup {
    /// Exact name first, then the first word (genus of a binomial).
    fn lineage(&self, name: &str) -> Option<Lineage> {
        if let Some(lineage) = self.lineages.get(name) {
            return Some(lineage.clone());
        }
        let genus = name.split(' ').next()?;
        self.lineages.get(genus).cloned()
    }
}

/// The required taxon, resolved once.
#[derive(Debug, Clone)]
pub struct TaxonFilter {
    pub taxon: String,
    lineage: Lineage,
    rank: usize,
    relaxing: usize,
}

impl TaxonFilter {
    pub fn new(taxon: &str, lookup: &dyn RankLookup, relaxing: usize) -> Result<Self, Error> {
        let lineage = lookup
            .lineage(taxon)
            .ok_or_else(|| Error::Parameter(format!("taxon '{taxon}' not found in lineage table")))?;
        let rank = lineage.rank_of(taxon).ok_or_else(|| {
            Error::Parameter(format!("taxon '{taxon}' does not name a rank of its own lineage"))
        })?;
        log::info!("Required taxon {} at rank {}", taxon, RANKS[rank]);
        Ok(Self {
            taxon: taxon.to_string(),
            lineage,
            rank,
            relaxing,
        })
    }

    /// Whether a species with `lineage` is close enough to the required taxon.
    pub fn accepts(&self, lineage: &Lineage) -> bool {
        let matched = lineage
            .deepest_shared_rank(&self.lineage)
            .map_or(-1, |r| r as i64);
        matched + self.relaxing as i64 >= self.rank as i64
    }
}

/// Target sequences of a washed table with at least one hit from an
/// accepted species.
pub fn filter_by_taxonomy(
    washed: &AlignmentTable,
    filter: &TaxonFilter,
    lookup: &dyn RankLookup,
) -> BTreeSet<String> {
    let mut cache: HashMap<&str, bool> = HashMap::new();
    let mut kept = BTreeSet::new();

    for (target, records) in washed.group_by_target() {
        let accepted = records.iter().copied().any(|rec| {
            let Some(species) = rec.query.species() else {
                return false;
            };
            *cache.entry(species).or_insert_with(|| match lookup.lineage(species) {
                Some(lineage) => filter.accepts(&lineage),
                None => {
                    log::warn!("Species {} skipped: no lineage found", species);
                    false
                }
            })
        });
        if accepted {
            kept.insert(target.to_string());
        }
    }

    log::info!(
        "{} of {} sequences pass the taxonomy filter",
        kept.len(),
        washed.target_ids().len()
    );
    kept
}
