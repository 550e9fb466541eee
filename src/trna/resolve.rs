/// Pairwise overlap elimination for structural gene calls
///
/// Both endpoints of every call are placed on one position-sorted marker
/// list. Adjacent markers belonging to different calls conflict when
///   dist = max(left span) - min(right span)
/// is at least the cutoff and no longer than one of the two calls. The
/// lower-scoring call is removed and the scan restarts, until a full scan
/// finds nothing.
use crate::error::Error;
use crate::trna::TrnaCall;

/// Whether the call owning the earlier marker conflicts with the later one.
pub fn conflicts(left: &TrnaCall, right: &TrnaCall, overlap_cutoff: i64) -> bool {
    let dist = left.span_end() - right.span_start();
    dist >= overlap_cutoff && (dist <= left.length() || dist <= right.length())
}

/// Marker list over a set of calls: (position, call index), position-sorted.
///
/// Equal positions keep call order, so the sort is deterministic.
fn markers(calls: &[TrnaCall]) -> Vec<(i64, usize)> {
    let mut markers: Vec<(i64, usize)> = calls
        .iter()
        .enumerate()
        .flat_map(|(i, call)| [(call.seqfrom, i), (call.seqto, i)])
        .collect();
    markers.sort_by_key(|&(pos, _)| pos);
    markers
}

/// First adjacent pair of live markers that conflicts, as (left, right).
pub fn find_conflict(
    calls: &[TrnaCall],
    alive: &[bool],
    overlap_cutoff: i64,
) -> Option<(usize, usize)> {
    let live: Vec<usize> = markers(calls)
        .into_iter()
        .map(|(_, i)| i)
        .filter(|&i| alive[i])
        .collect();

    live.windows(2).find_map(|w| {
        let (a, b) = (w[0], w[1]);
        (a != b && conflicts(&calls[a], &calls[b], overlap_cutoff)).then_some((a, b))
    })
}

/// Remove conflicting calls until none remain.
///
/// Returns the surviving call indices in input order. On equal scores the
/// call owning the earlier marker is kept.
pub fn resolve_conflicts(
    calls: &[TrnaCall],
    overlap_cutoff: i64,
    max_iterations: usize,
) -> Result<Vec<usize>, Error> {
    let mut alive = vec![true; calls.len()];
    let mut iterations = 0;

    while let Some((left, right)) = find_conflict(calls, &alive, overlap_cutoff) {
        iterations += 1;
        if iterations > max_iterations {
            return Err(Error::NoConvergence {
                stage: "tRNA conflict resolution",
                iterations: max_iterations,
            });
        }

        let drop = if calls[left].score >= calls[right].score {
            right
        } else {
            left
        };
        log::debug!(
            "Conflict of {} and {}, removing {} (scores {}, {}; overlap {})",
            calls[left].amino,
            calls[right].amino,
            calls[drop].amino,
            calls[left].score,
            calls[right].score,
            calls[left].span_end() - calls[right].span_start()
        );
        alive[drop] = false;
    }

    Ok((0..calls.len()).filter(|&i| alive[i]).collect())
}
