use std::path::PathBuf;

/// Errors that can occur in mitoscaf.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("FASTA parsing error: {0}")]
    Fasta(String),

    #[error("hit table error: {0}")]
    Table(String),

    #[error("gene requirement table error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required table or sequence pool is empty after filtering.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Selection finished with nothing left to report.
    #[error("empty result: {0}")]
    EmptyResult(String),

    /// A record names a sequence that is absent from the accompanying pool.
    #[error("record {record} refers to unknown sequence '{sequence}'")]
    InconsistentRecord { record: String, sequence: String },

    /// A fixpoint loop hit its iteration ceiling.
    #[error("{stage} did not converge within {iterations} iterations")]
    NoConvergence { stage: &'static str, iterations: usize },
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Table(err.to_string())
    }
}
