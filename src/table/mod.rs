/// Normalized alignment tables
///
/// Every selection stage in the crate consumes the same record shape: one
/// hit between a query (a gene/protein profile or a sequence) and a target
/// sequence. Raw rows are normalized exactly once here:
/// - exact duplicate rows are dropped (first occurrence wins)
/// - rows at or below the identity/score floors are dropped
/// - target coordinates are oriented so `target_start <= target_end`, with
///   the original orientation kept in `on_plus_strand`
/// - short tails (query span below a fraction of the query's furthest end)
///   are dropped
mod query_id;

pub use query_id::QueryId;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::error::Error;
use crate::params::Parameters;

/// One row in the fixed 12-column shape the aligner collaborator produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub query_id: String,
    pub target_id: String,
    pub identity_pct: f64,
    pub align_len: u64,
    pub mismatches: u64,
    pub gaps: u64,
    pub query_start: i64,
    pub query_end: i64,
    pub target_start: i64,
    pub target_end: i64,
    pub evalue: f64,
    pub score: f64,
}

impl RawHit {
    /// Field tuple used for exact-duplicate detection.
    fn dedup_key(&self) -> (String, String, [u64; 3], [i64; 4], [u64; 3]) {
        (
            self.query_id.clone(),
            self.target_id.clone(),
            [self.align_len, self.mismatches, self.gaps],
            [
                self.query_start,
                self.query_end,
                self.target_start,
                self.target_end,
            ],
            [
                self.identity_pct.to_bits(),
                self.evalue.to_bits(),
                self.score.to_bits(),
            ],
        )
    }
}

/// A single oriented alignment hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentRecord {
    #[serde(rename = "qseq")]
    pub query: QueryId,
    #[serde(rename = "sseq")]
    pub target_id: String,
    #[serde(rename = "ident")]
    pub identity_pct: f64,
    #[serde(rename = "length")]
    pub align_len: u64,
    #[serde(rename = "mismatch")]
    pub mismatches: u64,
    #[serde(rename = "gap")]
    pub gaps: u64,
    #[serde(rename = "qstart")]
    pub query_start: i64,
    #[serde(rename = "qend")]
    pub query_end: i64,
    /// Leftmost target coordinate (always <= `target_end`)
    #[serde(rename = "sstart")]
    pub target_start: i64,
    #[serde(rename = "send")]
    pub target_end: i64,
    pub evalue: f64,
    pub score: f64,
    /// False when the raw hit ran right-to-left on the target
    #[serde(rename = "plus")]
    pub on_plus_strand: bool,
}

impl AlignmentRecord {
    /// Orient a raw hit. The strand flag is derived here and nowhere else.
    pub fn from_raw(raw: RawHit) -> Self {
        let on_plus_strand = raw.target_end > raw.target_start;
        let (target_start, target_end) = if raw.target_start > raw.target_end {
            (raw.target_end, raw.target_start)
        } else {
            (raw.target_start, raw.target_end)
        };

        Self {
            query: QueryId::parse(&raw.query_id),
            target_id: raw.target_id,
            identity_pct: raw.identity_pct,
            align_len: raw.align_len,
            mismatches: raw.mismatches,
            gaps: raw.gaps,
            query_start: raw.query_start,
            query_end: raw.query_end,
            target_start,
            target_end,
            evalue: raw.evalue,
            score: raw.score,
            on_plus_strand,
        }
    }

    /// Restore the row as the aligner reported it.
    pub fn to_raw(&self) -> RawHit {
        RawHit {
            query_id: self.query.as_str().to_string(),
            target_id: self.target_id.clone(),
            identity_pct: self.identity_pct,
            align_len: self.align_len,
            mismatches: self.mismatches,
            gaps: self.gaps,
            query_start: self.query_start,
            query_end: self.query_end,
            target_start: self.raw_target_start(),
            target_end: self.raw_target_end(),
            evalue: self.evalue,
            score: self.score,
        }
    }

    pub fn target_span(&self) -> i64 {
        self.target_end - self.target_start
    }

    pub fn query_span(&self) -> i64 {
        self.query_end - self.query_start
    }

    /// Target start in the aligner's original orientation.
    pub fn raw_target_start(&self) -> i64 {
        if self.on_plus_strand {
            self.target_start
        } else {
            self.target_end
        }
    }

    /// Target end in the aligner's original orientation.
    pub fn raw_target_end(&self) -> i64 {
        if self.on_plus_strand {
            self.target_end
        } else {
            self.target_start
        }
    }
}

/// Thresholds applied by [`AlignmentTable::normalize`].
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Rows must have identity strictly above this percentage
    pub identity_min: f64,
    /// Rows must have score strictly above this value
    pub score_min: f64,
    /// Minimum query span as a fraction of the query's furthest end
    pub tail_fraction: f64,
    /// A query needs more than this many hits before its shared maximum is used
    pub qmax_min_hits: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            identity_min: 30.0,
            score_min: 25.0,
            tail_fraction: 0.25,
            qmax_min_hits: 2,
        }
    }
}

impl From<&Parameters> for NormalizeOptions {
    fn from(params: &Parameters) -> Self {
        Self {
            identity_min: params.identity_min,
            score_min: params.score_min,
            ..Self::default()
        }
    }
}

/// An owned, immutable-by-convention table of oriented hits.
///
/// Filtering always produces a new table; nothing mutates a table in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentTable {
    records: Vec<AlignmentRecord>,
}

impl AlignmentTable {
    pub fn new(records: Vec<AlignmentRecord>) -> Self {
        Self { records }
    }

    /// Orient raw hits without any filtering.
    pub fn from_raw_hits(raw: impl IntoIterator<Item = RawHit>) -> Self {
        Self::new(raw.into_iter().map(AlignmentRecord::from_raw).collect())
    }

    /// Full normalization of an aligner's output stream.
    ///
    /// Fails with `EmptyInput` when the stream yields no rows at all; a table
    /// that becomes empty through filtering is returned as-is.
    pub fn normalize(
        raw: impl IntoIterator<Item = RawHit>,
        opts: &NormalizeOptions,
    ) -> Result<Self, Error> {
        let raw: Vec<RawHit> = raw.into_iter().collect();
        if raw.is_empty() {
            return Err(Error::EmptyInput(
                "alignment source yielded no rows".to_string(),
            ));
        }
        let n_raw = raw.len();

        let mut seen = HashSet::new();
        let records: Vec<AlignmentRecord> = raw
            .into_iter()
            .filter(|hit| seen.insert(hit.dedup_key()))
            .filter(|hit| hit.identity_pct > opts.identity_min && hit.score > opts.score_min)
            .map(AlignmentRecord::from_raw)
            .collect();

        // Per-query furthest end, only trusted once a query has enough hits
        let mut per_query: HashMap<&str, (usize, i64)> = HashMap::new();
        for rec in &records {
            let entry = per_query.entry(rec.query.as_str()).or_insert((0, i64::MIN));
            entry.0 += 1;
            entry.1 = entry.1.max(rec.query_end);
        }
        let keep: Vec<bool> = records
            .iter()
            .map(|rec| {
                let (count, max_end) = per_query[rec.query.as_str()];
                let qmax = if count > opts.qmax_min_hits {
                    max_end
                } else {
                    rec.query_end
                };
                rec.query_span() as f64 >= qmax as f64 * opts.tail_fraction
            })
            .collect();

        let records: Vec<AlignmentRecord> = records
            .into_iter()
            .zip(keep)
            .filter_map(|(rec, keep)| keep.then_some(rec))
            .collect();

        log::debug!(
            "Normalized alignment table: {} raw rows -> {} records",
            n_raw,
            records.len()
        );

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AlignmentRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AlignmentRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<AlignmentRecord> {
        self.records
    }

    /// New table holding the records that satisfy `pred`.
    pub fn filter(&self, pred: impl Fn(&AlignmentRecord) -> bool) -> Self {
        Self {
            records: self.records.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }

    /// Records grouped by target sequence, groups in id order, records in
    /// table order within each group.
    pub fn group_by_target(&self) -> BTreeMap<&str, Vec<&AlignmentRecord>> {
        let mut groups: BTreeMap<&str, Vec<&AlignmentRecord>> = BTreeMap::new();
        for rec in &self.records {
            groups.entry(rec.target_id.as_str()).or_default().push(rec);
        }
        groups
    }

    /// Distinct target sequence ids.
    pub fn target_ids(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.target_id.as_str()).collect()
    }

    /// Rows restored to the aligner's original orientation.
    pub fn to_raw_hits(&self) -> Vec<RawHit> {
        self.records.iter().map(AlignmentRecord::to_raw).collect()
    }
}

impl<'a> IntoIterator for &'a AlignmentTable {
    type Item = &'a AlignmentRecord;
    type IntoIter = std::slice::Iter<'a, AlignmentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
