use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MetseaError {
    #[error("invalid compound id: {0}")]
    InvalidCompoundId(String),

    #[error("invalid pathway id: {0}")]
    InvalidPathwayId(String),

    #[error("invalid organism code: {0}")]
    InvalidOrganism(String),

    #[error("unsupported adjustment method: {0}")]
    InvalidAdjustMethod(String),

    #[error("minimum shared-metabolite threshold must be at least 1, got {0}")]
    InvalidMinShared(usize),

    #[error("p-value out of [0, 1] range: {0}")]
    InvalidPValue(f64),

    #[error("pathway catalog is empty: no pathway member sets")]
    EmptyCatalog,

    #[error("no organism given: pass --organism or set \"organism\" in metsea.json")]
    MissingOrganism,

    #[error("no query compounds given: pass --query or set \"query\" in metsea.json")]
    MissingQuery,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read query file at {0}")]
    QueryRead(PathBuf),

    #[error("KEGG request failed: {0}")]
    KeggHttp(String),

    #[error("KEGG returned status {status}: {message}")]
    KeggStatus { status: u16, message: String },

    #[error("missing cached KEGG table {0} (run `metsea fetch` first, or drop --offline)")]
    TableNotCached(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("table export failed: {0}")]
    TableExport(String),
}
