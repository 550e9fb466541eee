/// Scaffold picking from gene-profile hits
///
/// Stages, in order:
/// - keep contigs with at least one profile hit
/// - split by abundance; low-abundance contigs and their hits are dropped
/// - derive gene candidates and assign gene slots
/// - collect the picked contigs
pub mod assign;
pub mod candidate;
pub mod requirements;

pub use assign::{assign_genes, reconcile_fragments, AssignOptions, Assignment};
pub use candidate::{build_candidates, CandidateOptions, GeneCandidate};
pub use requirements::GeneRequirements;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use crate::error::Error;
use crate::genome::SequencePool;
use crate::io::create_output;
use crate::params::Parameters;
use crate::stats::AssignmentSummary;
use crate::table::AlignmentTable;

#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    /// Abundance floor
    pub multi: f64,
    pub candidate: CandidateOptions,
    pub assign: AssignOptions,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            multi: 10.0,
            candidate: CandidateOptions::default(),
            assign: AssignOptions::default(),
        }
    }
}

impl From<&Parameters> for ScaffoldOptions {
    fn from(params: &Parameters) -> Self {
        Self {
            multi: params.multi,
            candidate: CandidateOptions::from(params),
            assign: AssignOptions::from(params),
        }
    }
}

#[derive(Debug)]
pub struct ScaffoldResult {
    pub assignments: BTreeMap<String, Assignment>,
    /// High-abundance contigs named by some assignment, in pool order
    pub picked: SequencePool,
    pub high: SequencePool,
    pub low: SequencePool,
    pub summary: AssignmentSummary,
}

/// Pick the contigs that carry the required genes.
pub fn find_scaffolds(
    profile_hits: &AlignmentTable,
    contigs: &SequencePool,
    requirements: &GeneRequirements,
    opts: &ScaffoldOptions,
) -> Result<ScaffoldResult, Error> {
    let targets = profile_hits.target_ids();
    if let Some(missing) = targets.iter().find(|id| !contigs.contains(id)) {
        return Err(Error::InconsistentRecord {
            record: "gene-profile hit table".to_string(),
            sequence: missing.to_string(),
        });
    }

    let with_hits = contigs.filter(|s| targets.contains(s.id.as_str()));
    if with_hits.is_empty() {
        return Err(Error::EmptyInput(
            "no contig has a gene-profile hit".to_string(),
        ));
    }
    log::info!(
        "{} of {} contigs have gene-profile hits",
        with_hits.len(),
        contigs.len()
    );

    let high = with_hits.filter(|s| s.abundance >= opts.multi);
    let low = with_hits.filter(|s| s.abundance < opts.multi);
    log::info!(
        "{} records of high abundance, {} records of low abundance with multi {}",
        high.len(),
        low.len(),
        opts.multi
    );

    let hits_high = profile_hits.filter(|r| high.contains(&r.target_id));
    let candidates = build_candidates(&hits_high, &high, requirements, &opts.candidate)?;
    let assignments = assign_genes(&candidates, requirements, &opts.assign)?;

    let selected: BTreeSet<&str> = assignments
        .values()
        .flat_map(|a| a.sequence_ids().iter().map(String::as_str))
        .collect();
    let picked = high.filter(|s| selected.contains(s.id.as_str()));

    let summary = AssignmentSummary::from_assignments(&assignments);
    let found: Vec<&str> = assignments
        .iter()
        .filter(|(_, a)| a.is_assigned())
        .map(|(g, _)| g.as_str())
        .collect();
    log::info!("Genes found: {}", found.join(", "));
    log::info!("Picked {} contigs", picked.len());

    Ok(ScaffoldResult {
        assignments,
        picked,
        high,
        low,
        summary,
    })
}

/// Write the assignment map as pretty JSON, genes in sorted order.
pub fn write_assignments_json<W: Write>(
    mut writer: W,
    assignments: &BTreeMap<String, Assignment>,
) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut writer, assignments)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_assignments_json_file(
    path: &Path,
    assignments: &BTreeMap<String, Assignment>,
) -> Result<(), Error> {
    let mut writer = create_output(path)?;
    write_assignments_json(&mut writer, assignments)?;
    writer.flush().map_err(|e| Error::io(e, path))
}
