use std::path::PathBuf;

use clap::Parser;

use crate::trna::GeneticCode;

// ---------------------------------------------------------------------------
// Run mode enum
// ---------------------------------------------------------------------------

/// Pipeline stage selected with `--runMode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    WashHits,
    FindScaffolds,
    MergeSequences,
    MergePartial,
    ResolveTrna,
}

impl std::str::FromStr for RunMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "washHits" => Ok(Self::WashHits),
            "findScaffolds" => Ok(Self::FindScaffolds),
            "mergeSequences" => Ok(Self::MergeSequences),
            "mergePartial" => Ok(Self::MergePartial),
            "resolveTrna" => Ok(Self::ResolveTrna),
            _ => Err(format!(
                "unknown runMode '{s}'; expected one of washHits, findScaffolds, \
                 mergeSequences, mergePartial, resolveTrna"
            )),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WashHits => write!(f, "washHits"),
            Self::FindScaffolds => write!(f, "findScaffolds"),
            Self::MergeSequences => write!(f, "mergeSequences"),
            Self::MergePartial => write!(f, "mergePartial"),
            Self::ResolveTrna => write!(f, "resolveTrna"),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge method
// ---------------------------------------------------------------------------

/// How `findScaffolds` stitches sequences.
///
/// Both run after gene assignment. `global` self-merges the picked
/// sequences; `partial` also merges them against every other input contig,
/// including contigs without a profile hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeMethod {
    None,
    Global,
    Partial,
}

impl Default for MergeMethod {
    fn default() -> Self {
        Self::Partial
    }
}

impl std::str::FromStr for MergeMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "global" => Ok(Self::Global),
            "partial" => Ok(Self::Partial),
            _ => Err(format!("unknown mergeMethod value: '{s}'")),
        }
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Global => write!(f, "global"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

// ---------------------------------------------------------------------------
// Hit table format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitFormat {
    /// 12-column BLAST tabular (`-outfmt 6`)
    Blast,
    /// nhmmer `--tblout`
    Tblout,
}

impl std::str::FromStr for HitFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blast" => Ok(Self::Blast),
            "tblout" => Ok(Self::Tblout),
            _ => Err(format!("unknown hitsFormat value: '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters struct
// ---------------------------------------------------------------------------

/// mitoscaf command-line parameters, in `--camelCase` form.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mitoscaf",
    about = "Conflict-free gene and scaffold selection from redundant alignment hits",
    version
)]
pub struct Parameters {
    // ── Run ─────────────────────────────────────────────────────────────
    /// Run mode: washHits, findScaffolds, mergeSequences, mergePartial or resolveTrna
    #[arg(long = "runMode", default_value = "findScaffolds")]
    pub run_mode: RunMode,

    /// Output file name prefix (including path)
    #[arg(long = "outFileNamePrefix", default_value = "./")]
    pub out_file_name_prefix: PathBuf,

    // ── Inputs ──────────────────────────────────────────────────────────
    /// Alignment hit table (washHits input, findScaffolds gene-profile hits)
    #[arg(long = "hitsIn")]
    pub hits_in: Option<PathBuf>,

    /// Format of --hitsIn: blast or tblout
    #[arg(long = "hitsFormat", default_value = "blast")]
    pub hits_format: HitFormat,

    /// Contig pool in FASTA form
    #[arg(long = "contigsIn")]
    pub contigs_in: Option<PathBuf>,

    /// Reference pool for mergePartial
    #[arg(long = "referenceIn")]
    pub reference_in: Option<PathBuf>,

    /// Gene requirement table (JSON: clade -> gene -> expected length)
    #[arg(long = "requiredGenesIn")]
    pub required_genes_in: Option<PathBuf>,

    /// Clade whose gene requirement set is used
    #[arg(long = "clade")]
    pub clade: Option<String>,

    /// Structural search hits for resolveTrna (TSV with header)
    #[arg(long = "trnaHitsIn")]
    pub trna_hits_in: Option<PathBuf>,

    // ── Taxonomy ────────────────────────────────────────────────────────
    /// Required taxon name; enables the taxonomy filter
    #[arg(long = "taxa")]
    pub taxa: Option<String>,

    /// Protein-search hits (12-column tabular) used by the taxonomy filter
    #[arg(long = "taxaHitsIn")]
    pub taxa_hits_in: Option<PathBuf>,

    /// Lineage table (TSV: name, kingdom, phylum, class, order, family, genus, species)
    #[arg(long = "lineageIn")]
    pub lineage_in: Option<PathBuf>,

    /// Ranks the taxonomy match may fall short of the required taxon's rank
    #[arg(long = "relaxing", default_value_t = 0)]
    pub relaxing: usize,

    // ── Hit filtering ───────────────────────────────────────────────────
    /// Rows must have identity strictly above this percentage
    #[arg(long = "identityMin", default_value_t = 30.0)]
    pub identity_min: f64,

    /// Rows must have score strictly above this value
    #[arg(long = "scoreMin", default_value_t = 25.0)]
    pub score_min: f64,

    /// Fraction of the overlap allowance tolerated between selected hits
    #[arg(long = "overlapRatio", default_value_t = 0.5)]
    pub overlap_ratio: f64,

    // ── Gene assignment ─────────────────────────────────────────────────
    /// Aligned fraction of the expected length counted as a complete gene
    #[arg(long = "fullRatio", default_value_t = 0.9)]
    pub full_ratio: f64,

    /// Isolated alignments at or below this fraction are ignored
    #[arg(long = "minValidRatio", default_value_t = 0.3)]
    pub min_valid_ratio: f64,

    /// Abundance floor; lower-abundance contigs are dropped
    #[arg(long = "multi", default_value_t = 10.0)]
    pub multi: f64,

    /// Overlap tolerated between fragments of one gene
    #[arg(long = "fragmentOverlap", default_value_t = 0)]
    pub fragment_overlap: i64,

    // ── Merging ─────────────────────────────────────────────────────────
    /// Merge method: none, global or partial
    #[arg(long = "mergeMethod", default_value = "partial")]
    pub merge_method: MergeMethod,

    /// Minimum alignment length for two ends to be merged
    #[arg(long = "mergeOverlap", default_value_t = 50)]
    pub merge_overlap: u64,

    /// Distance from a sequence start within which an overlap counts as an end overlap
    #[arg(long = "searchRange", default_value_t = 5)]
    pub search_range: i64,

    // ── tRNA ────────────────────────────────────────────────────────────
    /// Smallest overlap distance treated as a tRNA conflict
    #[arg(long = "trnaOverlapCutoff", default_value_t = 40)]
    pub trna_overlap_cutoff: i64,

    /// NCBI genetic code table id
    #[arg(long = "geneticCode", default_value_t = 9)]
    pub genetic_code: u8,

    // ── Safety ──────────────────────────────────────────────────────────
    /// Iteration ceiling for every fixpoint loop
    #[arg(long = "maxIterations", default_value_t = 10000)]
    pub max_iterations: usize,
}

impl Parameters {
    /// `{prefix}{name}`: the prefix is not a directory unless it
    /// ends with a separator.
    pub fn output_path(&self, name: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.out_file_name_prefix.display(), name))
    }

    /// Validate parameter combinations that clap alone cannot enforce.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        use crate::error::Error;

        let require = |value: bool, flag: &str| {
            if value {
                Ok(())
            } else {
                Err(Error::Parameter(format!(
                    "--{flag} is required when --runMode {}",
                    self.run_mode
                )))
            }
        };

        match self.run_mode {
            RunMode::WashHits => require(self.hits_in.is_some(), "hitsIn")?,
            RunMode::FindScaffolds => {
                require(self.hits_in.is_some(), "hitsIn")?;
                require(self.contigs_in.is_some(), "contigsIn")?;
                require(self.required_genes_in.is_some(), "requiredGenesIn")?;
                require(self.clade.is_some(), "clade")?;
                if self.taxa.is_some() {
                    require(self.taxa_hits_in.is_some(), "taxaHitsIn")?;
                    require(self.lineage_in.is_some(), "lineageIn")?;
                }
            }
            RunMode::MergeSequences => require(self.contigs_in.is_some(), "contigsIn")?,
            RunMode::MergePartial => {
                require(self.contigs_in.is_some(), "contigsIn")?;
                require(self.reference_in.is_some(), "referenceIn")?;
            }
            RunMode::ResolveTrna => require(self.trna_hits_in.is_some(), "trnaHitsIn")?,
        }

        for (name, value) in [
            ("overlapRatio", self.overlap_ratio),
            ("fullRatio", self.full_ratio),
            ("minValidRatio", self.min_valid_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::Parameter(format!(
                    "--{name} must be in (0, 1], got {value}"
                )));
            }
        }

        if self.min_valid_ratio > self.full_ratio {
            return Err(Error::Parameter(
                "--minValidRatio must not exceed --fullRatio".into(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(Error::Parameter("--maxIterations must be >= 1".into()));
        }

        if self.search_range < 1 {
            return Err(Error::Parameter("--searchRange must be >= 1".into()));
        }

        GeneticCode::from_id(self.genetic_code)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
