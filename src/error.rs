//! Error types for GhostRelay

use thiserror::Error;

/// Result type alias for GhostRelay operations
pub type Result<T> = std::result::Result<T, Error>;

/// GhostRelay error type
#[derive(Error, Debug)]
pub enum Error {
    // Platform / handle errors
    #[error("Failed to open process {pid}: {reason}")]
    ProcessOpen { pid: u32, reason: String },

    #[error("Handle duplication failed: {0}")]
    Duplicate(String),

    #[error("Failed to close handle: {0}")]
    HandleClose(String),

    // Setup errors
    #[error("GPU device creation failed: {0}")]
    DeviceCreation(String),

    #[error("Video engine creation failed: {0}")]
    EngineCreation(String),

    #[error("Video engine setup failed: {0}")]
    EngineSetup(String),

    #[error("Failed to attach media source: {0}")]
    SourceAttach(String),

    // Lifecycle errors
    #[error("Renderer is already streaming")]
    AlreadyStreaming,

    // Playback errors
    #[error("Video engine reported error (status {status:#010x})")]
    Engine { status: u32 },

    // General errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Expected under rapid surface changes or a foreground process going away.
    /// Callers log these and carry on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ProcessOpen { .. } | Error::Duplicate(_) | Error::HandleClose(_)
        )
    }

    /// The renderer is unusable after this error and must be torn down
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DeviceCreation(_)
                | Error::EngineCreation(_)
                | Error::EngineSetup(_)
                | Error::SourceAttach(_)
                | Error::Engine { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::Duplicate("gone".into()).is_transient());
        assert!(!Error::Duplicate("gone".into()).is_fatal());
        assert!(Error::Engine { status: 0xC00D_36B2 }.is_fatal());
        assert!(Error::EngineSetup("load".into()).is_fatal());
        assert!(!Error::AlreadyStreaming.is_fatal());
    }

    #[test]
    fn test_engine_status_display() {
        let err = Error::Engine { status: 0x8007_000E };
        assert_eq!(
            err.to_string(),
            "Video engine reported error (status 0x8007000e)"
        );
    }
}
