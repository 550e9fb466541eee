/// Aligner collaborator used by the stitcher
///
/// Any producer of 12-column hits can drive stitching. The built-in
/// [`EndOverlapAligner`] finds exact end overlaps only, which is what
/// stitching consumes.
use crate::error::Error;
use crate::genome::{reverse_complement, SequencePool, SequenceRecord};
use crate::table::RawHit;

pub trait Aligner {
    /// Align every query sequence against every subject sequence.
    fn align(&self, query: &SequencePool, subject: &SequencePool) -> Result<Vec<RawHit>, Error>;
}

/// KMP failure function: `fail[i]` is the length of the longest proper
/// border of `s[..=i]`.
fn failure_function(s: &[u8]) -> Vec<usize> {
    let mut fail = vec![0usize; s.len()];
    let mut k = 0;
    for i in 1..s.len() {
        while k > 0 && s[i] != s[k] {
            k = fail[k - 1];
        }
        if s[i] == s[k] {
            k += 1;
        }
        fail[i] = k;
    }
    fail
}

/// Longest suffix of `left` equal to a prefix of `right`.
pub fn suffix_prefix_overlap(left: &[u8], right: &[u8]) -> usize {
    if left.is_empty() || right.is_empty() {
        return 0;
    }
    let mut joined = Vec::with_capacity(left.len() + right.len() + 1);
    joined.extend_from_slice(right);
    joined.push(0);
    joined.extend_from_slice(left);
    failure_function(&joined).last().copied().unwrap_or(0)
}

/// Longest proper border: a prefix that is also a suffix, shorter than `s`.
pub fn self_border(s: &[u8]) -> usize {
    failure_function(s).last().copied().unwrap_or(0)
}

/// Reports exact end overlaps in BLAST coordinates (1-based, inclusive;
/// subject start > end on the minus strand).
#[derive(Debug, Clone)]
pub struct EndOverlapAligner {
    /// Overlaps shorter than this are not reported
    pub min_overlap: usize,
}

impl EndOverlapAligner {
    pub fn new(min_overlap: usize) -> Self {
        Self {
            min_overlap: min_overlap.max(1),
        }
    }

    fn hit(
        &self,
        query: &SequenceRecord,
        subject: &SequenceRecord,
        query_span: (usize, usize),
        subject_span: (usize, usize),
    ) -> RawHit {
        let len = query_span.1 - query_span.0 + 1;
        RawHit {
            query_id: query.id.clone(),
            target_id: subject.id.clone(),
            identity_pct: 100.0,
            align_len: len as u64,
            mismatches: 0,
            gaps: 0,
            query_start: query_span.0 as i64,
            query_end: query_span.1 as i64,
            target_start: subject_span.0 as i64,
            target_end: subject_span.1 as i64,
            evalue: 0.0,
            score: 2.0 * len as f64,
        }
    }

    fn pair_hits(&self, q: &SequenceRecord, s: &SequenceRecord, out: &mut Vec<RawHit>) {
        let (lq, ls) = (q.len(), s.len());

        if q.id == s.id {
            let k = self_border(&q.residues);
            if k >= self.min_overlap {
                out.push(self.hit(q, s, (lq - k + 1, lq), (1, k)));
            }
            return;
        }

        // query end runs into subject start
        let k = suffix_prefix_overlap(&q.residues, &s.residues);
        if k >= self.min_overlap {
            out.push(self.hit(q, s, (lq - k + 1, lq), (1, k)));
        }

        // subject end runs into query start
        let k = suffix_prefix_overlap(&s.residues, &q.residues);
        if k >= self.min_overlap {
            out.push(self.hit(q, s, (1, k), (ls - k + 1, ls)));
        }

        // query end runs into the reverse complement of the subject
        let rc = reverse_complement(&s.residues);
        let k = suffix_prefix_overlap(&q.residues, &rc);
        if k >= self.min_overlap {
            out.push(self.hit(q, s, (lq - k + 1, lq), (ls, ls - k + 1)));
        }

        // reverse complement of the subject runs into query start
        let k = suffix_prefix_overlap(&rc, &q.residues);
        if k >= self.min_overlap {
            out.push(self.hit(q, s, (1, k), (k, 1)));
        }
    }
}

impl Aligner for EndOverlapAligner {
    fn align(&self, query: &SequencePool, subject: &SequencePool) -> Result<Vec<RawHit>, Error> {
        let mut hits = Vec::new();
        for q in query {
            for s in subject {
                self.pair_hits(q, s, &mut hits);
            }
        }
        log::debug!(
            "End-overlap search: {} x {} sequences, {} hits",
            query.len(),
            subject.len(),
            hits.len()
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_lengths() {
        assert_eq!(suffix_prefix_overlap(b"AAACGT", b"CGTTTT"), 3);
        assert_eq!(suffix_prefix_overlap(b"ACGT", b"TTTT"), 1);
        assert_eq!(suffix_prefix_overlap(b"ACGT", b"GGGG"), 0);
        // capped by the shorter sequence
        assert_eq!(suffix_prefix_overlap(b"ACGTACGT", b"ACGT"), 4);
        assert_eq!(suffix_prefix_overlap(b"", b"ACGT"), 0);
    }

    #[test]
    fn border_is_proper() {
        assert_eq!(self_border(b"ACGTTTACG"), 3);
        assert_eq!(self_border(b"AAAA"), 3);
        assert_eq!(self_border(b"ACGT"), 0);
    }

    #[test]
    fn plus_strand_hits_in_blast_coordinates() {
        let a = SequenceRecord::new("A", b"GGGGGACGTAC".to_vec(), 1.0);
        let b = SequenceRecord::new("B", b"ACGTACTTTTT".to_vec(), 1.0);
        let pool = SequencePool::new(vec![a, b]);
        let hits = EndOverlapAligner::new(4).align(&pool, &pool).unwrap();

        let ab = hits
            .iter()
            .find(|h| h.query_id == "A" && h.target_id == "B")
            .unwrap();
        assert_eq!((ab.query_start, ab.query_end), (6, 11));
        assert_eq!((ab.target_start, ab.target_end), (1, 6));
        assert_eq!(ab.align_len, 6);

        let ba = hits
            .iter()
            .find(|h| h.query_id == "B" && h.target_id == "A" && h.query_start == 1)
            .unwrap();
        assert_eq!((ba.target_start, ba.target_end), (6, 11));
    }

    #[test]
    fn minus_strand_hit_runs_backwards() {
        // rc(B) = AAAAACGTACGG starts with the tail of A
        let a = SequenceRecord::new("A", b"TTTTTTAAAAACGT".to_vec(), 1.0);
        let b = SequenceRecord::new("B", b"CCGTACGTTTTT".to_vec(), 1.0);
        let hits = EndOverlapAligner::new(6)
            .align(&SequencePool::new(vec![a]), &SequencePool::new(vec![b]))
            .unwrap();
        let minus = hits.iter().find(|h| h.target_start > h.target_end).unwrap();
        assert_eq!((minus.query_start, minus.query_end), (7, 14));
        assert_eq!((minus.target_start, minus.target_end), (12, 5));
    }

    #[test]
    fn self_hit_reports_border() {
        let s = SequenceRecord::new("C", b"ACGTAAAAAAACGT".to_vec(), 1.0);
        let pool = SequencePool::new(vec![s]);
        let hits = EndOverlapAligner::new(4).align(&pool, &pool).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].query_start, hits[0].query_end), (11, 14));
        assert_eq!((hits[0].target_start, hits[0].target_end), (1, 4));
    }
}
