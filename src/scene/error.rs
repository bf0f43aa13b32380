//! Error types for scene load/save and parsing

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by scene I/O and parsing.
///
/// Lookup misses (unknown class, tag, or ID) are never errors; those are
/// `Option` results on the scene API. Only catastrophic conditions reach
/// this type.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The target file could not be opened for reading or writing.
    #[error("cannot open file {path}: {source}")]
    CannotOpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to an already-open file failed partway through.
    #[error("failed writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document text is not well-formed enough to walk.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A commit was requested with no target URL set on the scene.
    #[error("no URL set for scene")]
    NoUrl,
}

/// Coarse error code retained on the scene after a failed operation,
/// mirroring the last-error query pattern of the save/load layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    CannotOpenFile,
    Write,
    Parse,
    NoUrl,
}

impl SceneError {
    /// The coarse code stored on the scene for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SceneError::CannotOpenFile { .. } => ErrorCode::CannotOpenFile,
            SceneError::Write { .. } => ErrorCode::Write,
            SceneError::Parse { .. } => ErrorCode::Parse,
            SceneError::NoUrl => ErrorCode::NoUrl,
        }
    }
}
