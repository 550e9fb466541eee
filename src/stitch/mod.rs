/// Fixpoint stitching of sequences with overlapping ends
///
/// One pass aligns the pool (against itself, or against a reference pool),
/// keeps hits that sit at a sequence start and are long enough, and then
/// walks them in order: each hit whose two sequences are both still
/// untouched this pass merges them into a new `M<n>` sequence. Passes
/// repeat until one merges nothing.
pub mod aligner;

pub use aligner::{Aligner, EndOverlapAligner};

use std::borrow::Cow;
use std::collections::HashSet;

use crate::error::Error;
use crate::genome::{reverse_complement, SequencePool, SequenceRecord, MERGED_ABUNDANCE};
use crate::params::Parameters;
use crate::table::{AlignmentRecord, AlignmentTable, RawHit};

#[derive(Debug, Clone)]
pub struct StitchOptions {
    /// Minimum alignment length for a merge
    pub overlapped_len: u64,
    /// An overlap must start within this many bases of a sequence start
    pub search_range: i64,
    pub max_iterations: usize,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            overlapped_len: 50,
            search_range: 5,
            max_iterations: 10_000,
        }
    }
}

impl From<&Parameters> for StitchOptions {
    fn from(params: &Parameters) -> Self {
        Self {
            overlapped_len: params.merge_overlap,
            search_range: params.search_range,
            max_iterations: params.max_iterations,
        }
    }
}

/// Whether a hit joins two different sequences at an end.
///
/// Coordinates are checked as the aligner reported them: either both
/// subject coordinates or the query start lie within `search_range` of
/// position 1.
pub fn is_end_overlap(rec: &AlignmentRecord, opts: &StitchOptions) -> bool {
    let sr = opts.search_range;
    rec.query.as_str() != rec.target_id
        && rec.align_len >= opts.overlapped_len
        && ((rec.raw_target_start() < sr && rec.raw_target_end() < sr) || rec.query_start < sr)
}

fn clamp(pos: i64, len: usize) -> usize {
    pos.clamp(0, len as i64) as usize
}

/// Join `que` and `sub` at the alignment boundary.
///
/// A sequence the alignment fully covers is absorbed by the other. A
/// minus-strand subject is reverse-complemented first. The result is never
/// shorter than either input.
pub fn splice(que: &SequenceRecord, sub: &SequenceRecord, hit: &AlignmentRecord) -> Vec<u8> {
    let alen = hit.align_len as usize;
    if alen >= que.len() {
        return sub.residues.clone();
    }
    if alen >= sub.len() {
        return que.residues.clone();
    }

    let sub_len = sub.len() as i64;
    let (sub_res, ss, se): (Cow<'_, [u8]>, i64, i64) = if hit.on_plus_strand {
        (
            Cow::Borrowed(sub.residues.as_slice()),
            hit.raw_target_start() - 1,
            hit.raw_target_end(),
        )
    } else {
        (
            Cow::Owned(reverse_complement(&sub.residues)),
            sub_len - hit.raw_target_start(),
            sub_len - hit.raw_target_end() + 1,
        )
    };
    let qs = hit.query_start - 1;
    let qe = clamp(hit.query_end, que.len());
    let se = clamp(se, sub_res.len());

    let joined: Vec<u8> = if qs > ss {
        [&que.residues[..qe], &sub_res[se..]].concat()
    } else {
        [&sub_res[..se], &que.residues[qe..]].concat()
    };

    if joined.len() < que.len() {
        que.residues.clone()
    } else if joined.len() < sub.len() {
        sub.residues.clone()
    } else {
        joined
    }
}

/// Merges sequence pools, numbering merged sequences across calls.
pub struct Stitcher<'a, A: Aligner + ?Sized> {
    aligner: &'a A,
    opts: StitchOptions,
    next_id: usize,
}

impl<'a, A: Aligner + ?Sized> Stitcher<'a, A> {
    pub fn new(aligner: &'a A, opts: StitchOptions) -> Self {
        Self {
            aligner,
            opts,
            next_id: 0,
        }
    }

    /// Merged sequences produced so far.
    pub fn merged_count(&self) -> usize {
        self.next_id
    }

    /// One pass over `hits`. Returns the merged sequences and the ids they
    /// consumed.
    fn merge_pass(
        &mut self,
        queries: &SequencePool,
        subjects: &SequencePool,
        hits: Vec<RawHit>,
    ) -> Result<(Vec<SequenceRecord>, HashSet<String>), Error> {
        let candidates = AlignmentTable::from_raw_hits(hits).filter(|r| is_end_overlap(r, &self.opts));

        let mut merged = Vec::new();
        let mut done: HashSet<String> = HashSet::new();
        for rec in &candidates {
            let q_id = rec.query.as_str();
            if done.contains(q_id) || done.contains(&rec.target_id) {
                continue;
            }
            let que = queries.get(q_id).ok_or_else(|| Error::InconsistentRecord {
                record: format!("overlap {} x {}", q_id, rec.target_id),
                sequence: q_id.to_string(),
            })?;
            let sub = subjects
                .get(&rec.target_id)
                .ok_or_else(|| Error::InconsistentRecord {
                    record: format!("overlap {} x {}", q_id, rec.target_id),
                    sequence: rec.target_id.clone(),
                })?;

            let residues = splice(que, sub, rec);
            let id = format!("M{}", self.next_id);
            self.next_id += 1;
            log::debug!(
                "Overlapped: {}:({},{},{}) & {}:({},{},{}) of length {}, into {}:{}",
                que.id,
                rec.query_start,
                rec.query_end,
                que.len(),
                sub.id,
                rec.raw_target_start(),
                rec.raw_target_end(),
                sub.len(),
                rec.align_len,
                id,
                residues.len()
            );

            merged.push(SequenceRecord::new(id, residues, MERGED_ABUNDANCE));
            done.insert(que.id.clone());
            done.insert(sub.id.clone());
        }

        Ok((merged, done))
    }

    fn check_passes(&self, passes: usize, stage: &'static str) -> Result<(), Error> {
        if passes > self.opts.max_iterations {
            return Err(Error::NoConvergence {
                stage,
                iterations: self.opts.max_iterations,
            });
        }
        Ok(())
    }

    /// Merge a pool against itself until no end overlaps remain.
    pub fn merge_sequences(&mut self, mut pool: SequencePool) -> Result<SequencePool, Error> {
        let mut passes = 0;
        loop {
            let hits = self.aligner.align(&pool, &pool)?;
            let (merged, done) = self.merge_pass(&pool, &pool, hits)?;
            if merged.is_empty() {
                break;
            }
            passes += 1;
            self.check_passes(passes, "sequence merging")?;

            log::info!("Merge pass {}: {} merged sequences", passes, merged.len());
            let rest = pool.filter(|s| !done.contains(&s.id));
            pool = merged.into_iter().chain(rest.into_records()).collect();
        }
        Ok(pool)
    }

    /// Merge a pool against a reference pool.
    ///
    /// Every cycle self-merges the pool first, then merges it against the
    /// reference; consumed sequences leave both pools. Stops when a cycle
    /// changes neither.
    pub fn merge_partial(
        &mut self,
        mut pool: SequencePool,
        mut reference: SequencePool,
    ) -> Result<(SequencePool, SequencePool), Error> {
        let mut passes = 0;
        loop {
            let before = self.next_id;
            pool = self.merge_sequences(pool)?;
            let self_merged = self.next_id > before;

            let hits = self.aligner.align(&pool, &reference)?;
            let (merged, done) = self.merge_pass(&pool, &reference, hits)?;
            if !self_merged && merged.is_empty() {
                break;
            }
            passes += 1;
            self.check_passes(passes, "partial merging")?;

            log::info!(
                "Partial merge cycle {}: {} merged against the reference",
                passes,
                merged.len()
            );
            let rest = pool.filter(|s| !done.contains(&s.id));
            pool = merged.into_iter().chain(rest.into_records()).collect();
            reference = reference.filter(|s| !done.contains(&s.id));
        }
        Ok((pool, reference))
    }

    /// Mark a lone sequence circular when its start overlaps its end.
    pub fn remark_circular(&self, pool: SequencePool) -> Result<SequencePool, Error> {
        if pool.len() != 1 {
            return Ok(pool);
        }
        let hits = self.aligner.align(&pool, &pool)?;
        let table = AlignmentTable::from_raw_hits(hits);

        let mut records = pool.into_records();
        let seq = &mut records[0];
        let len = seq.len() as i64;
        let circular = table.iter().any(|rec| {
            let (ss, se) = (rec.raw_target_start(), rec.raw_target_end());
            rec.query.as_str() == seq.id
                && rec.target_id == seq.id
                && ((rec.query_start == 1 && se == len) || (ss == 1 && rec.query_end == len))
                && rec.query_start != ss
                && rec.align_len >= self.opts.overlapped_len
        });
        if circular {
            log::info!("{} is circular", seq.id);
            seq.circular = true;
        }
        Ok(SequencePool::new(records))
    }
}
