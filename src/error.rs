//! Error types returned by the drag engine

use std::path::PathBuf;

use crate::backend::DisplayError;

#[derive(Debug, thiserror::Error)]
pub enum DragError {
    #[error(transparent)]
    Display(#[from] DisplayError),

    /// The fixed atom vocabulary could not be interned as a whole
    #[error("failed to intern XDND atoms: {0}")]
    InternAtoms(#[source] DisplayError),

    #[error("no window titled {0:?}")]
    WindowNotFound(String),

    /// `start_drag*` was called while a session is Dragging or Dropped
    #[error("drag already in progress")]
    AlreadyInProgress,

    #[error("failed to write drag payload to {path}: {source}")]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = DragError> = std::result::Result<T, E>;
