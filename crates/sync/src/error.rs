use slitmask_client::MaskApiError;
use slitmask_core::error::CoreError;

use crate::state::SessionState;

/// Errors surfaced by editor operations. None of them poison the
/// coordinator: it stays usable after any single failure.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] MaskApiError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The operation is not allowed in the current session state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("No catalog list is loaded")]
    NoCatalogList,

    /// At least one object update was rejected. Updates that succeeded are
    /// not rolled back.
    #[error("{failed} of {total} object updates failed; first error: {first}")]
    SaveFailed {
        failed: usize,
        total: usize,
        #[source]
        first: MaskApiError,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
