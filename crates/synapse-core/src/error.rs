use thiserror::Error;

use crate::format::FORMAT_VERSION;

/// Rejections surfaced by the core. Missing IDs are never errors: operations
/// on an unknown node or edge are silent no-ops.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported format version {0} (this build reads version {FORMAT_VERSION})")]
    UnsupportedVersion(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
