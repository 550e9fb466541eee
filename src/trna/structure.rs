/// WUSS secondary-structure decomposition
///
/// Only the pieces needed to read an anticodon are modelled: base pairs,
/// the multiloop closed by the acceptor stem, and the hairpin loops hanging
/// off it. Pseudoknot letters and every non-bracket symbol are unpaired.

/// A base pair, as column indices into the alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub open: usize,
    pub close: usize,
}

/// Column partner of every paired position.
fn pair_table(structure: &[u8]) -> Option<Vec<Option<usize>>> {
    let mut partner = vec![None; structure.len()];
    let mut stack = Vec::new();

    for (i, &c) in structure.iter().enumerate() {
        match c {
            b'<' | b'(' | b'[' | b'{' => stack.push(i),
            b'>' | b')' | b']' | b'}' => {
                let j = stack.pop()?;
                partner[i] = Some(j);
                partner[j] = Some(i);
            }
            _ => {}
        }
    }

    stack.is_empty().then_some(partner)
}

/// Pairs directly enclosed by the open interval `(lo, hi)`.
fn children(partner: &[Option<usize>], lo: usize, hi: usize) -> Vec<Pair> {
    let mut out = Vec::new();
    let mut k = lo;
    while k < hi {
        match partner[k] {
            Some(m) if m > k && m < hi => {
                out.push(Pair { open: k, close: m });
                k = m + 1;
            }
            _ => k += 1,
        }
    }
    out
}

/// Follow a stem inward until it branches or closes a loop.
fn innermost(partner: &[Option<usize>], mut pair: Pair) -> (Pair, Vec<Pair>) {
    loop {
        let kids = children(partner, pair.open + 1, pair.close);
        if kids.len() == 1 {
            pair = kids[0];
        } else {
            return (pair, kids);
        }
    }
}

/// Hairpin loops of the first multiloop, in 5'→3' order.
///
/// Returns `None` when the structure is unbalanced or has no multiloop
/// under a single closing stem.
pub fn multiloop_hairpins(structure: &str) -> Option<Vec<Pair>> {
    let partner = pair_table(structure.as_bytes())?;
    let top = children(&partner, 0, structure.len());
    let [outer] = top.as_slice() else {
        return None;
    };

    let (_, branches) = innermost(&partner, *outer);
    if branches.len() < 2 {
        return None;
    }

    Some(
        branches
            .into_iter()
            .filter_map(|branch| {
                let (end, kids) = innermost(&partner, branch);
                kids.is_empty().then_some(end)
            })
            .collect(),
    )
}

/// Anticodon of a cloverleaf alignment.
///
/// The second hairpin of the multiloop is the anticodon arm; its loop must
/// span exactly 7 columns and the anticodon (loop columns 2..5) must be
/// gap-free.
pub fn anticodon(structure: &str, sequence: &str) -> Option<String> {
    if structure.len() != sequence.len() {
        return None;
    }
    let hairpins = multiloop_hairpins(structure)?;
    let center = hairpins.get(1)?;

    let loop_seq = &sequence.as_bytes()[center.open + 1..center.close];
    if loop_seq.len() != 7 {
        return None;
    }

    let triplet = &loop_seq[2..5];
    if triplet.iter().any(|&b| matches!(b, b'-' | b'.' | b'~')) {
        log::debug!(
            "Unreadable anticodon in loop {}",
            String::from_utf8_lossy(loop_seq)
        );
        return None;
    }

    Some(String::from_utf8_lossy(triplet).to_ascii_uppercase())
}
