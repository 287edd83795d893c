use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FiberplanError {
    #[error("unknown assigner '{0}' (expected naive, draining or new)")]
    UnknownAssigner(String),

    #[error("unknown kernel '{0}' (expected parabolic, linear or gaussian)")]
    UnknownKernel(String),

    #[error("invalid planner parameter: {0}")]
    InvalidParameter(String),

    #[error("could not open target file '{path}': {source}")]
    CatalogOpen {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("error opening output file '{path}': {source}")]
    ReportOpen {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}
