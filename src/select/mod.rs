/// Dominant-interval selection over hits grouped by target sequence
///
/// Within each target, the highest-scoring remaining hit is always taken
/// next, and every remaining hit that overlaps it beyond the tolerance is
/// discarded. This is greedy by score, not an optimal interval schedule.
///
/// Tolerance depends on gene identity:
/// - same gene as the selected hit: no overlap tolerated (cutoff 0)
/// - different gene: `min(selected span, candidate span) * overlap_ratio`
use crate::params::Parameters;
use crate::table::{AlignmentRecord, AlignmentTable};

/// Tunables for [`select_dominant`].
#[derive(Debug, Clone)]
pub struct SelectOptions {
    pub overlap_ratio: f64,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self { overlap_ratio: 0.5 }
    }
}

impl From<&Parameters> for SelectOptions {
    fn from(params: &Parameters) -> Self {
        Self {
            overlap_ratio: params.overlap_ratio,
        }
    }
}

/// Coordinate overlap of two target spans (negative when disjoint).
pub fn span_overlap(a: &AlignmentRecord, b: &AlignmentRecord) -> i64 {
    a.target_end.min(b.target_end) - a.target_start.max(b.target_start)
}

/// Largest overlap `candidate` may have with `selected` and still survive.
pub fn overlap_cutoff(
    selected: &AlignmentRecord,
    candidate: &AlignmentRecord,
    overlap_ratio: f64,
) -> f64 {
    if selected.query.gene() == candidate.query.gene() {
        return 0.0;
    }
    let selected_len = selected.target_span() + 1;
    selected_len.min(candidate.target_span()) as f64 * overlap_ratio
}

/// Select the dominant, near-non-overlapping hits of every target.
///
/// Groups are emitted in target id order; within a group, hits appear in
/// the order they were selected (highest score first). Equal scores are
/// resolved by position in the start-sorted group, then by table order.
pub fn select_dominant(table: &AlignmentTable, opts: &SelectOptions) -> AlignmentTable {
    let mut selected = Vec::new();

    for (target, mut group) in table.group_by_target() {
        group.sort_by_key(|rec| rec.target_start);
        let before = selected.len();
        select_group(&group, opts.overlap_ratio, &mut selected);
        log::debug!(
            "{}: kept {} of {} hits",
            target,
            selected.len() - before,
            group.len()
        );
    }

    AlignmentTable::new(selected)
}

fn select_group(group: &[&AlignmentRecord], overlap_ratio: f64, out: &mut Vec<AlignmentRecord>) {
    let mut alive = vec![true; group.len()];

    loop {
        let mut best: Option<usize> = None;
        for (i, rec) in group.iter().enumerate() {
            if !alive[i] {
                continue;
            }
            match best {
                Some(b) if group[b].score >= rec.score => {}
                _ => best = Some(i),
            }
        }
        let Some(best) = best else { break };

        let winner = group[best];
        alive[best] = false;
        out.push(winner.clone());

        for (i, rec) in group.iter().enumerate() {
            if !alive[i] {
                continue;
            }
            let cutoff = overlap_cutoff(winner, rec, overlap_ratio);
            if span_overlap(winner, rec) as f64 > cutoff {
                alive[i] = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::hit;

    fn table(hits: Vec<crate::table::RawHit>) -> AlignmentTable {
        AlignmentTable::from_raw_hits(hits)
    }

    #[test]
    fn contained_lower_score_dropped() {
        let t = table(vec![
            hit("a_b_c_cox1_X_y", "ctg", (1, 90), (10, 100), 50.0),
            hit("a_b_c_cox2_X_y", "ctg", (1, 70), (20, 90), 30.0),
        ]);
        let out = select_dominant(&t, &SelectOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out.records()[0].score, 50.0);
    }

    #[test]
    fn same_gene_has_no_tolerance() {
        // Overlap of 10 between two nad1 hits: dropped even though small.
        let t = table(vec![
            hit("a_b_c_nad1_X_y", "ctg", (1, 100), (1, 300), 90.0),
            hit("a_b_c_nad1_X_z", "ctg", (1, 100), (290, 600), 80.0),
        ]);
        let out = select_dominant(&t, &SelectOptions::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn different_gene_tolerates_shared_overlap() {
        // Overlap 10 against cutoff min(300, 310) * 0.5 = 150.
        let t = table(vec![
            hit("a_b_c_nad1_X_y", "ctg", (1, 100), (1, 300), 90.0),
            hit("a_b_c_nad2_X_y", "ctg", (1, 100), (290, 600), 80.0),
        ]);
        let out = select_dominant(&t, &SelectOptions::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn adjacent_same_gene_hits_survive() {
        let t = table(vec![
            hit("a_b_c_nad1_X_y", "ctg", (1, 100), (1, 300), 90.0),
            hit("a_b_c_nad1_X_y", "ctg", (101, 200), (300, 600), 80.0),
        ]);
        let out = select_dominant(&t, &SelectOptions::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn groups_are_independent() {
        let t = table(vec![
            hit("a_b_c_cox1_X_y", "ctg2", (1, 90), (10, 100), 50.0),
            hit("a_b_c_cox1_X_y", "ctg1", (1, 90), (10, 100), 40.0),
        ]);
        let out = select_dominant(&t, &SelectOptions::default());
        let targets: Vec<_> = out.iter().map(|r| r.target_id.as_str()).collect();
        assert_eq!(targets, vec!["ctg1", "ctg2"]);
    }

    #[test]
    fn ties_go_to_leftmost() {
        let t = table(vec![
            hit("a_b_c_cox1_X_right", "ctg", (1, 90), (50, 140), 50.0),
            hit("a_b_c_cox1_X_left", "ctg", (1, 90), (10, 100), 50.0),
        ]);
        let out = select_dominant(&t, &SelectOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out.records()[0].target_start, 10);
    }

    #[test]
    fn reverse_hits_compared_in_oriented_space() {
        let t = table(vec![
            hit("a_b_c_cox1_X_y", "ctg", (1, 90), (100, 10), 50.0),
            hit("a_b_c_cox1_X_y", "ctg", (1, 70), (20, 90), 30.0),
        ]);
        let out = select_dominant(&t, &SelectOptions::default());
        assert_eq!(out.len(), 1);
        assert!(!out.records()[0].on_plus_strand);
    }

    #[test]
    fn survivors_respect_cutoffs() {
        // Deterministic pseudo-random hits over a few genes
        let genes = ["cox1", "cox2", "nad1", "nad4"];
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        let hits: Vec<_> = (0..60)
            .map(|i| {
                let start = (next() % 2000) as i64 + 1;
                let len = (next() % 400) as i64 + 20;
                let gene = genes[(next() % 4) as usize];
                let score = (next() % 500) as f64;
                hit(
                    &format!("a_b_c_{gene}_X_{i}"),
                    if i % 2 == 0 { "ctgA" } else { "ctgB" },
                    (1, len),
                    (start, start + len),
                    score,
                )
            })
            .collect();
        let opts = SelectOptions::default();
        let out = select_dominant(&table(hits), &opts);
        for (target, group) in out.group_by_target() {
            for (i, a) in group.iter().enumerate() {
                for b in group.iter().skip(i + 1) {
                    // Earlier-selected `a` screened every later survivor
                    let cutoff = overlap_cutoff(a, b, opts.overlap_ratio);
                    assert!(
                        span_overlap(a, b) as f64 <= cutoff,
                        "{target}: {} and {} overlap too much",
                        a.query,
                        b.query
                    );
                }
            }
        }
    }
}
