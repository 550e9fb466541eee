/// Gene candidates derived from gene-profile hits
use std::collections::HashSet;

use serde::Serialize;

use crate::error::Error;
use crate::genome::SequencePool;
use crate::params::Parameters;
use crate::scaffold::requirements::GeneRequirements;
use crate::table::{AlignmentRecord, AlignmentTable};

/// One (gene, sequence) pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneCandidate {
    pub gene_id: String,
    pub sequence_id: String,
    /// Hit score times sequence abundance
    pub weighted_score: f64,
    pub query_start: i64,
    pub query_end: i64,
    pub complete: bool,
}

impl GeneCandidate {
    /// Gene bases this candidate resolves.
    pub fn resolved_len(&self) -> i64 {
        (self.query_end - self.query_start).abs()
    }

    pub fn span(&self) -> (i64, i64) {
        (
            self.query_start.min(self.query_end),
            self.query_start.max(self.query_end),
        )
    }
}

#[derive(Debug, Clone)]
pub struct CandidateOptions {
    /// Aligned fraction of the expected length counted as complete
    pub full_ratio: f64,
    /// Isolated alignments at or below this fraction are noise
    pub min_valid_ratio: f64,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        Self {
            full_ratio: 0.9,
            min_valid_ratio: 0.3,
        }
    }
}

impl From<&Parameters> for CandidateOptions {
    fn from(params: &Parameters) -> Self {
        Self {
            full_ratio: params.full_ratio,
            min_valid_ratio: params.min_valid_ratio,
        }
    }
}

/// Completeness of one hit; `None` when the hit is discarded as noise.
///
/// A short hit still counts as complete when it is "isolated": the bases it
/// misses could not have been cut off at either sequence end.
fn classify(
    rec: &AlignmentRecord,
    expected: u64,
    seq_len: usize,
    opts: &CandidateOptions,
) -> Option<bool> {
    let align_len = rec.align_len as f64;
    let expected_f = expected as f64;
    if align_len >= expected_f * opts.full_ratio {
        return Some(true);
    }

    let missing = expected as i64 - rec.align_len as i64;
    let isolated = rec.query_start > missing && seq_len as i64 - rec.query_end > missing;
    if !isolated {
        return Some(false);
    }
    if align_len <= expected_f * opts.min_valid_ratio {
        log::warn!(
            "Ignoring {} on {}: only {} of {} bases aligned",
            rec.query.gene(),
            rec.target_id,
            rec.align_len,
            (expected_f * opts.min_valid_ratio) as u64
        );
        return None;
    }
    Some(true)
}

/// Build candidates from gene-profile hits against `pool`.
///
/// Candidates keep table order. Only the first kept hit of each
/// (sequence, gene) pair is used; genes outside the requirement set are skipped. A hit on a
/// sequence missing from `pool` is an `InconsistentRecord`.
pub fn build_candidates(
    table: &AlignmentTable,
    pool: &SequencePool,
    requirements: &GeneRequirements,
    opts: &CandidateOptions,
) -> Result<Vec<GeneCandidate>, Error> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (row, rec) in table.iter().enumerate() {
        let gene = rec.query.gene();
        let Some(expected) = requirements.expected_length(gene) else {
            log::debug!("{} is not a required gene, skipped", gene);
            continue;
        };
        let seq = pool
            .get(&rec.target_id)
            .ok_or_else(|| Error::InconsistentRecord {
                record: format!("hit #{} ({})", row + 1, rec.query),
                sequence: rec.target_id.clone(),
            })?;
        if seen.contains(&(rec.target_id.as_str(), gene)) {
            continue;
        }

        // noise hits do not claim the pair
        let Some(complete) = classify(rec, expected, seq.len(), opts) else {
            continue;
        };
        seen.insert((rec.target_id.as_str(), gene));

        candidates.push(GeneCandidate {
            gene_id: gene.to_string(),
            sequence_id: rec.target_id.clone(),
            weighted_score: rec.score * seq.abundance,
            query_start: rec.query_start,
            query_end: rec.query_end,
            complete,
        });
    }

    log::info!(
        "{} gene candidates ({} complete)",
        candidates.len(),
        candidates.iter().filter(|c| c.complete).count()
    );
    Ok(candidates)
}
