use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::concat::ConcatError;

pub type AssemblyResult<T> = Result<T, AssemblyError>;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no clips available for assembly")]
    NoAssetsAvailable,
    #[error("no clip produced a usable duration")]
    NoUsableDurations,
    #[error("concatenation failed: {0}")]
    ConcatenationFailed(#[from] ConcatError),
    #[error("failed to write {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
}
