//! Error types for the compositor client
//!
//! Only recoverable conditions live here. Misuse of handles (using a surface
//! after its last reference was released, releasing a display more often than
//! it was acquired, attaching a second keyboard) is a programming error and
//! panics at the call site instead.

use thiserror::Error;

/// Recoverable failures reported by the client layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The windowing backend did not hand out a context
    #[error("windowing backend could not create a context")]
    ContextUnavailable,

    /// The context was created but refused to start
    #[error("windowing context failed to start: {detail}")]
    StartFailed { detail: String },

    /// `DisplayRegistry::install_global` was called after the global
    /// registry already existed
    #[error("a process-wide display registry is already installed")]
    RegistryAlreadyInstalled,
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
