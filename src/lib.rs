pub mod error;
pub mod params;

pub mod genome;
pub mod io;
pub mod scaffold;
pub mod select;
pub mod stats;
pub mod stitch;
pub mod table;
pub mod taxonomy;
pub mod trna;

use log::info;

use crate::genome::fasta::{parse_fasta_file, write_fasta_file};
use crate::io::hits::{
    read_nhmmer_tblout_file, read_tabular_hits_file, write_records_csv_file,
};
use crate::params::{HitFormat, MergeMethod, Parameters, RunMode};
use crate::scaffold::{find_scaffolds, write_assignments_json_file, GeneRequirements, ScaffoldOptions};
use crate::select::{select_dominant, SelectOptions};
use crate::stitch::{EndOverlapAligner, StitchOptions, Stitcher};
use crate::table::{AlignmentTable, NormalizeOptions};
use crate::taxonomy::{filter_by_taxonomy, TaxonFilter, TsvLineageLookup};
use crate::trna::{read_structural_hits_file, resolve_trnas, write_report_file, GeneticCode, TrnaOptions};

/// Top-level dispatcher. Called from `main()` after CLI parsing.
pub fn run(params: &Parameters) -> anyhow::Result<()> {
    params.validate()?;

    info!("mitoscaf v{}", env!("CARGO_PKG_VERSION"));
    info!("runMode: {}", params.run_mode);
    info!("outFileNamePrefix: {}", params.out_file_name_prefix.display());

    match params.run_mode {
        RunMode::WashHits => wash_hits(params),
        RunMode::FindScaffolds => find_scaffolds_mode(params),
        RunMode::MergeSequences => merge_sequences_mode(params),
        RunMode::MergePartial => merge_partial_mode(params),
        RunMode::ResolveTrna => resolve_trna_mode(params),
    }
}

/// Normalize a 12-column hit table and keep the dominant hits per target.
fn read_washed(path: &std::path::Path, params: &Parameters) -> anyhow::Result<AlignmentTable> {
    let raw = read_tabular_hits_file(path)?;
    let table = AlignmentTable::normalize(raw, &NormalizeOptions::from(params))?;
    let washed = select_dominant(&table, &SelectOptions::from(params));
    info!(
        "Washed {}: {} normalized -> {} dominant hits",
        path.display(),
        table.len(),
        washed.len()
    );
    Ok(washed)
}

fn wash_hits(params: &Parameters) -> anyhow::Result<()> {
    let hits_in = params
        .hits_in
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--hitsIn is required"))?;

    let washed = match params.hits_format {
        HitFormat::Blast => read_washed(hits_in, params)?,
        HitFormat::Tblout => {
            let raw = read_nhmmer_tblout_file(hits_in)?;
            let table = AlignmentTable::normalize(raw, &NormalizeOptions::from(params))?;
            select_dominant(&table, &SelectOptions::from(params))
        }
    };

    let out = params.output_path("washed.csv");
    write_records_csv_file(&out, &washed)?;
    info!("Wrote {} records to {}", washed.len(), out.display());
    Ok(())
}

fn find_scaffolds_mode(params: &Parameters) -> anyhow::Result<()> {
    let (Some(hits_in), Some(contigs_in), Some(required_in), Some(clade)) = (
        params.hits_in.as_deref(),
        params.contigs_in.as_deref(),
        params.required_genes_in.as_deref(),
        params.clade.as_deref(),
    ) else {
        anyhow::bail!("findScaffolds needs --hitsIn, --contigsIn, --requiredGenesIn and --clade");
    };

    let contigs = parse_fasta_file(contigs_in)?;
    info!("Loaded {} contigs from {}", contigs.len(), contigs_in.display());

    let requirements = GeneRequirements::from_file(required_in, clade)?;
    info!(
        "Clade {}: {} required genes",
        requirements.clade,
        requirements.len()
    );

    let mut profile_hits = match params.hits_format {
        HitFormat::Blast => read_washed(hits_in, params)?,
        HitFormat::Tblout => AlignmentTable::from_raw_hits(read_nhmmer_tblout_file(hits_in)?),
    };

    if let Some(taxon) = params.taxa.as_deref() {
        let (Some(taxa_hits_in), Some(lineage_in)) =
            (params.taxa_hits_in.as_deref(), params.lineage_in.as_deref())
        else {
            anyhow::bail!("--taxa needs --taxaHitsIn and --lineageIn");
        };

        let lookup = TsvLineageLookup::from_file(lineage_in)?;
        let filter = TaxonFilter::new(taxon, &lookup, params.relaxing)?;
        let washed = read_washed(taxa_hits_in, params)?;
        let kept = filter_by_taxonomy(&washed, &filter, &lookup);

        let taxa_table = washed.filter(|r| kept.contains(&r.target_id));
        write_records_csv_file(&params.output_path("taxa.csv"), &taxa_table)?;
        profile_hits = profile_hits.filter(|r| kept.contains(&r.target_id));
    }

    let result = find_scaffolds(
        &profile_hits,
        &contigs,
        &requirements,
        &ScaffoldOptions::from(params),
    )?;

    write_fasta_file(&params.output_path("abundance.high.fa"), &result.high)?;
    write_fasta_file(&params.output_path("abundance.low.fa"), &result.low)?;
    write_assignments_json_file(&params.output_path("candidates.json"), &result.assignments)?;

    let aligner = EndOverlapAligner::new(params.merge_overlap as usize);
    let mut stitcher = Stitcher::new(&aligner, StitchOptions::from(params));
    let picked = match params.merge_method {
        MergeMethod::None => result.picked,
        MergeMethod::Global => stitcher.merge_sequences(result.picked)?,
        MergeMethod::Partial => {
            let reference = contigs.filter(|s| !result.picked.contains(&s.id));
            stitcher.merge_partial(result.picked, reference)?.0
        }
    };
    info!(
        "Merge method {}: {} merged sequences",
        params.merge_method,
        stitcher.merged_count()
    );

    let picked = stitcher.remark_circular(picked)?;
    let out = params.output_path("picked.fa");
    write_fasta_file(&out, &picked)?;
    info!("Wrote {} picked sequences to {}", picked.len(), out.display());

    result.summary.print_summary();
    Ok(())
}

fn merge_sequences_mode(params: &Parameters) -> anyhow::Result<()> {
    let contigs_in = params
        .contigs_in
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--contigsIn is required"))?;
    let pool = parse_fasta_file(contigs_in)?;
    let n_in = pool.len();

    let aligner = EndOverlapAligner::new(params.merge_overlap as usize);
    let mut stitcher = Stitcher::new(&aligner, StitchOptions::from(params));
    let merged = stitcher.merge_sequences(pool)?;
    let merged = stitcher.remark_circular(merged)?;
    info!(
        "Merged {} sequences: {} in, {} out",
        stitcher.merged_count(),
        n_in,
        merged.len()
    );

    let out = params.output_path("merged.fa");
    write_fasta_file(&out, &merged)?;
    info!("Wrote {}", out.display());
    Ok(())
}

fn merge_partial_mode(params: &Parameters) -> anyhow::Result<()> {
    let (Some(contigs_in), Some(reference_in)) =
        (params.contigs_in.as_deref(), params.reference_in.as_deref())
    else {
        anyhow::bail!("mergePartial needs --contigsIn and --referenceIn");
    };
    let pool = parse_fasta_file(contigs_in)?;
    let reference = parse_fasta_file(reference_in)?;

    let aligner = EndOverlapAligner::new(params.merge_overlap as usize);
    let mut stitcher = Stitcher::new(&aligner, StitchOptions::from(params));
    let (merged, reference) = stitcher.merge_partial(pool, reference)?;
    let merged = stitcher.remark_circular(merged)?;
    info!(
        "Merged {} sequences, {} reference sequences left unused",
        stitcher.merged_count(),
        reference.len()
    );

    let out = params.output_path("merged.fa");
    write_fasta_file(&out, &merged)?;
    info!("Wrote {}", out.display());
    Ok(())
}

fn resolve_trna_mode(params: &Parameters) -> anyhow::Result<()> {
    let trna_hits_in = params
        .trna_hits_in
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--trnaHitsIn is required"))?;

    let code = GeneticCode::from_id(params.genetic_code)?;
    let hits = read_structural_hits_file(trna_hits_in)?;
    info!("Loaded {} structural hits", hits.len());

    let report = resolve_trnas(&hits, &code, &TrnaOptions::from(params))?;
    info!("Resolved {} tRNA slots", report.slots.len());
    if !report.missing.is_empty() {
        let missing: Vec<String> = report.missing.iter().map(char::to_string).collect();
        log::warn!("No tRNA found for: {}", missing.join(", "));
    }

    let out = params.output_path("trna.tsv");
    write_report_file(&out, &report)?;
    info!("Wrote {}", out.display());
    Ok(())
}
