use std::path::PathBuf;

use crate::block::BlockId;

pub type CompileResult<T> = Result<T, CompileError>;

/// Caller-supplied input rejected at the entity/project boundary.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("sprite name cannot be empty")]
    EmptySpriteName,

    #[error("sprite name '{0}' is already used in this project")]
    DuplicateSprite(String),

    #[error("'{0}' is a stage and cannot be added as a sprite")]
    StageAsSprite(String),

    #[error("sprite '{name}' was built with the {found} dialect but the project uses {expected}")]
    DialectMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("block {block} has a dangling {link} reference to {target}")]
    DanglingReference {
        block: BlockId,
        link: &'static str,
        target: BlockId,
    },

    #[error("invalid costume '{name}': {reason}")]
    InvalidCostume { name: String, reason: String },
}

/// Failure while writing or reading a project package.
#[derive(thiserror::Error, Debug)]
pub enum PackageError {
    #[error("failed to encode project document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("i/o error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to move finished package into place at '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset name '{0}' is reserved or empty")]
    ReservedEntry(String),

    #[error("'{path}' is not a valid project package: {reason}")]
    InvalidPackage { path: PathBuf, reason: String },
}

impl PackageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPackage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
