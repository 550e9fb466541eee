/// Two-phase greedy gene assignment
///
/// Phase one walks sequences from most to fewest candidate genes and locks
/// each complete gene to the first sequence that offers it. Phase two
/// gathers, for every gene without a lock, the fragment candidates of
/// sequences that hold no lock themselves, and removes overlapping
/// fragments until the remaining ones tile the gene.
use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::Error;
use crate::params::Parameters;
use crate::scaffold::candidate::GeneCandidate;
use crate::scaffold::requirements::GeneRequirements;

/// Final state of one gene slot.
///
/// Serializes as `null`, a sequence id, or a list of sequence ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Assignment {
    Unassigned,
    Complete(String),
    Fragmented(Vec<String>),
}

impl Assignment {
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unassigned)
    }

    /// Sequence ids this slot draws on.
    pub fn sequence_ids(&self) -> &[String] {
        match self {
            Self::Unassigned => &[],
            Self::Complete(id) => std::slice::from_ref(id),
            Self::Fragmented(ids) => ids,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignOptions {
    /// Overlap tolerated between fragments of one gene
    pub fragment_overlap: i64,
    pub max_iterations: usize,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            fragment_overlap: 0,
            max_iterations: 10_000,
        }
    }
}

impl From<&Parameters> for AssignOptions {
    fn from(params: &Parameters) -> Self {
        Self {
            fragment_overlap: params.fragment_overlap,
            max_iterations: params.max_iterations,
        }
    }
}

/// Assign every required gene.
///
/// Fails with `EmptyResult` when there are no candidates to assign from.
pub fn assign_genes(
    candidates: &[GeneCandidate],
    requirements: &GeneRequirements,
    opts: &AssignOptions,
) -> Result<BTreeMap<String, Assignment>, Error> {
    if candidates.is_empty() {
        return Err(Error::EmptyResult(
            "no gene candidates left after filtering".to_string(),
        ));
    }

    // Sequences in first-seen order, then stable-sorted by gene count
    let mut by_sequence: Vec<(&str, Vec<&GeneCandidate>)> = Vec::new();
    for cand in candidates {
        match by_sequence.iter_mut().find(|(id, _)| *id == cand.sequence_id) {
            Some((_, list)) => list.push(cand),
            None => by_sequence.push((cand.sequence_id.as_str(), vec![cand])),
        }
    }
    by_sequence.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut locks: BTreeMap<&str, &str> = BTreeMap::new();
    let mut lock_holders: HashSet<&str> = HashSet::new();
    for &(seq, ref cands) in &by_sequence {
        for cand in cands.iter().filter(|c| c.complete) {
            if locks.contains_key(cand.gene_id.as_str()) {
                continue;
            }
            locks.insert(cand.gene_id.as_str(), seq);
            lock_holders.insert(seq);
            log::debug!("{} locked to {}", cand.gene_id, seq);
        }
    }

    let mut assignments = BTreeMap::new();
    for gene in requirements.genes() {
        if let Some(seq) = locks.get(gene) {
            assignments.insert(gene.to_string(), Assignment::Complete(seq.to_string()));
            continue;
        }

        let fragments: Vec<&GeneCandidate> = by_sequence
            .iter()
            .filter(|(seq, _)| !lock_holders.contains(seq))
            .flat_map(|(_, cands)| cands.iter().copied())
            .filter(|c| c.gene_id == gene && !c.complete)
            .collect();

        if fragments.is_empty() {
            assignments.insert(gene.to_string(), Assignment::Unassigned);
            continue;
        }

        log::info!("Gene {} is fragmented, reconciling {} fragments", gene, fragments.len());
        let kept = reconcile_fragments(&fragments, opts.fragment_overlap, opts.max_iterations)?;

        let recovered: i64 = kept.iter().map(|&i| fragments[i].resolved_len()).sum();
        if let Some(expected) = requirements.expected_length(gene) {
            log::info!(
                "Recovered {} bp of {}, ratio {:.3}",
                recovered,
                gene,
                recovered as f64 / expected as f64
            );
        }

        let mut ordered: Vec<&GeneCandidate> = kept.iter().map(|&i| fragments[i]).collect();
        ordered.sort_by_key(|c| c.span());
        let mut ids = Vec::new();
        let mut seen = BTreeSet::new();
        for cand in ordered {
            if seen.insert(cand.sequence_id.as_str()) {
                ids.push(cand.sequence_id.clone());
            }
        }
        assignments.insert(gene.to_string(), Assignment::Fragmented(ids));
    }

    Ok(assignments)
}

/// Whether `loser` should give way to `other` in a fragment conflict.
fn loses_to(loser: &GeneCandidate, other: &GeneCandidate) -> bool {
    match loser.weighted_score.partial_cmp(&other.weighted_score) {
        Some(std::cmp::Ordering::Less) => true,
        Some(std::cmp::Ordering::Greater) => false,
        _ => loser.resolved_len() < other.resolved_len(),
    }
}

/// Remove overlapping fragments of one gene until none overlap beyond
/// `tolerance`.
///
/// Both endpoints of every fragment go on one position-sorted list. The
/// first adjacent pair from different sequences whose spans overlap by
/// more than `tolerance` is a conflict; the weaker fragment (lower weighted
/// score, then fewer resolved bases, then later in input) is removed and
/// the scan restarts. Returns surviving indices in input order.
pub fn reconcile_fragments(
    fragments: &[&GeneCandidate],
    tolerance: i64,
    max_iterations: usize,
) -> Result<Vec<usize>, Error> {
    let mut markers: Vec<(i64, usize)> = fragments
        .iter()
        .enumerate()
        .flat_map(|(i, f)| {
            let (start, end) = f.span();
            [(start, i), (end, i)]
        })
        .collect();
    markers.sort_by_key(|&(pos, _)| pos);

    let mut alive = vec![true; fragments.len()];
    let mut iterations = 0;

    loop {
        let live: Vec<usize> = markers
            .iter()
            .map(|&(_, i)| i)
            .filter(|&i| alive[i])
            .collect();

        let conflict = live.windows(2).find_map(|w| {
            let (a, b) = (fragments[w[0]], fragments[w[1]]);
            if a.sequence_id == b.sequence_id {
                return None;
            }
            let overlap = a.span().1.min(b.span().1) - a.span().0.max(b.span().0);
            (overlap > tolerance).then_some((w[0], w[1], overlap))
        });
        let Some((a, b, overlap)) = conflict else {
            break;
        };

        iterations += 1;
        if iterations > max_iterations {
            return Err(Error::NoConvergence {
                stage: "fragment reconciliation",
                iterations: max_iterations,
            });
        }

        let (first, second) = (a.min(b), a.max(b));
        let drop = if loses_to(fragments[first], fragments[second]) {
            first
        } else {
            second
        };
        log::debug!(
            "Fragments of {} on {} and {} overlap by {}, dropping {}",
            fragments[a].gene_id,
            fragments[a].sequence_id,
            fragments[b].sequence_id,
            overlap,
            fragments[drop].sequence_id
        );
        alive[drop] = false;
    }

    Ok((0..fragments.len()).filter(|&i| alive[i]).collect())
}
