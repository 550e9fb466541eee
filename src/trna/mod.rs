/// tRNA calls from structural search hits
///
/// Pipeline:
/// - decode each hit's anticodon from its secondary structure
/// - resolve overlapping calls per target sequence, best score wins
/// - drop structurally identical duplicates
/// - give every survivor a gene-slot key (amino acid letter, with a counter
///   suffix for the second and later calls of the same amino acid)
/// - report amino acids of the genetic code with no call
pub mod code;
pub mod resolve;
pub mod structure;

pub use code::GeneticCode;
pub use resolve::resolve_conflicts;

use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::genome::reverse_complement;
use crate::io::{create_output, open_input};
use crate::params::Parameters;

/// One hit from the structural-search collaborator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuralHit {
    pub target: String,
    pub seqfrom: i64,
    pub seqto: i64,
    pub score: f64,
    /// WUSS secondary structure, one symbol per alignment column
    pub structure: String,
    /// Target residues aligned to `structure`
    pub sequence: String,
}

/// A positioned tRNA call with its decoded amino acid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrnaCall {
    pub target_id: String,
    pub seqfrom: i64,
    pub seqto: i64,
    pub score: f64,
    pub amino: char,
}

impl TrnaCall {
    pub fn span_start(&self) -> i64 {
        self.seqfrom.min(self.seqto)
    }

    pub fn span_end(&self) -> i64 {
        self.seqfrom.max(self.seqto)
    }

    pub fn length(&self) -> i64 {
        self.span_end() - self.span_start()
    }
}

/// Decode a hit into a call, or `None` when the anticodon is unreadable.
pub fn decode_call(hit: &StructuralHit, code: &GeneticCode) -> Option<TrnaCall> {
    let anticodon = structure::anticodon(&hit.structure, &hit.sequence)?;
    let codon = reverse_complement(anticodon.as_bytes());
    let amino = code.translate(&codon)?;

    Some(TrnaCall {
        target_id: hit.target.clone(),
        seqfrom: hit.seqfrom,
        seqto: hit.seqto,
        score: hit.score,
        amino,
    })
}

#[derive(Debug, Clone)]
pub struct TrnaOptions {
    /// Smallest overlap distance treated as a conflict
    pub overlap_cutoff: i64,
    pub max_iterations: usize,
}

impl Default for TrnaOptions {
    fn default() -> Self {
        Self {
            overlap_cutoff: 40,
            max_iterations: 10_000,
        }
    }
}

impl From<&Parameters> for TrnaOptions {
    fn from(params: &Parameters) -> Self {
        Self {
            overlap_cutoff: params.trna_overlap_cutoff,
            max_iterations: params.max_iterations,
        }
    }
}

/// Final tRNA gene slots and the amino acids nothing was found for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrnaReport {
    pub slots: BTreeMap<String, TrnaCall>,
    pub missing: Vec<char>,
}

/// Key calls by amino acid; repeats get `L2`, `L3`, ...
pub fn assign_slots(calls: Vec<TrnaCall>) -> BTreeMap<String, TrnaCall> {
    let mut slots: BTreeMap<String, TrnaCall> = BTreeMap::new();
    for call in calls {
        let base = call.amino.to_string();
        let key = if slots.contains_key(&base) {
            let n = slots.keys().filter(|k| k.starts_with(&base)).count();
            format!("{base}{}", n + 1)
        } else {
            base
        };
        slots.insert(key, call);
    }
    slots
}

/// Resolve structural hits into tRNA gene slots.
pub fn resolve_trnas(
    hits: &[StructuralHit],
    code: &GeneticCode,
    opts: &TrnaOptions,
) -> Result<TrnaReport, Error> {
    if hits.is_empty() {
        return Err(Error::EmptyInput("no structural hits to resolve".to_string()));
    }

    let mut by_target: BTreeMap<&str, Vec<TrnaCall>> = BTreeMap::new();
    for hit in hits {
        match decode_call(hit, code) {
            Some(call) => by_target.entry(hit.target.as_str()).or_default().push(call),
            None => log::debug!(
                "Discarded fold on {} ({}..{}): no readable anticodon",
                hit.target,
                hit.seqfrom,
                hit.seqto
            ),
        }
    }

    let mut survivors = Vec::new();
    for (target, calls) in by_target {
        let kept = resolve_conflicts(&calls, opts.overlap_cutoff, opts.max_iterations)?;
        log::debug!("{}: {} of {} tRNA calls kept", target, kept.len(), calls.len());
        survivors.extend(kept.into_iter().map(|i| calls[i].clone()));
    }

    let mut seen = HashSet::new();
    survivors.retain(|c| seen.insert((c.target_id.clone(), c.seqfrom, c.seqto, c.amino)));
    survivors.sort_by(|a, b| {
        (a.target_id.as_str(), a.span_start(), a.seqfrom)
            .cmp(&(b.target_id.as_str(), b.span_start(), b.seqfrom))
    });

    let slots = assign_slots(survivors);
    let missing: Vec<char> = code
        .amino_acids()
        .into_iter()
        .filter(|aa| !slots.contains_key(&aa.to_string()))
        .collect();

    log::info!(
        "Resolved {} tRNA genes; {} amino acids missing",
        slots.len(),
        missing.len()
    );
    if !missing.is_empty() {
        log::warn!(
            "Missing tRNAs: {}",
            missing.iter().map(char::to_string).collect::<Vec<_>>().join(", ")
        );
    }

    Ok(TrnaReport { slots, missing })
}

/// Read structural hits from a TSV with a header row
/// (`target seqfrom seqto score structure sequence`).
pub fn read_structural_hits<R: BufRead>(reader: R) -> Result<Vec<StructuralHit>, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .from_reader(reader);
    let mut hits = Vec::new();
    for result in rdr.deserialize() {
        hits.push(result?);
    }
    Ok(hits)
}

pub fn read_structural_hits_file(path: &Path) -> Result<Vec<StructuralHit>, Error> {
    read_structural_hits(open_input(path)?)
}

#[derive(Serialize)]
struct SlotRow<'a> {
    slot: &'a str,
    target_id: &'a str,
    seqfrom: i64,
    seqto: i64,
    score: f64,
    amino: char,
}

impl<'a> SlotRow<'a> {
    fn new(slot: &'a str, call: &'a TrnaCall) -> Self {
        Self {
            slot,
            target_id: &call.target_id,
            seqfrom: call.seqfrom,
            seqto: call.seqto,
            score: call.score,
            amino: call.amino,
        }
    }
}

/// Write one TSV row per slot, followed by a `# missing:` comment line.
pub fn write_report<W: Write>(mut writer: W, report: &TrnaReport) -> Result<(), Error> {
    {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(&mut writer);
        for (slot, call) in &report.slots {
            wtr.serialize(SlotRow::new(slot, call))?;
        }
        wtr.flush()?;
    }
    let missing: Vec<String> = report.missing.iter().map(char::to_string).collect();
    writeln!(writer, "# missing: {}", missing.join(","))?;
    Ok(())
}

pub fn write_report_file(path: &Path, report: &TrnaReport) -> Result<(), Error> {
    let writer = create_output(path)?;
    write_report(writer, report).map_err(|e| match e {
        Error::Io { source, .. } => Error::io(source, path),
        other => other,
    })
}
