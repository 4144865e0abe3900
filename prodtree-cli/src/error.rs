//! CLI-specific error types and exit code mapping

use prodtree_core::error::ProdtreeError;
use prodtree_engine::EngineError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure reported by the CLI itself.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error.
    #[error("{0}")]
    Core(#[from] ProdtreeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                   |
    /// |------|---------------------------|
    /// | 0    | Success                   |
    /// | 1    | General / command error   |
    /// | 2    | Configuration error       |
    /// | 4    | Policy violation          |
    /// | 5    | Resolution error          |
    /// | 10   | IO error                  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
            Self::Core(e) => match e {
                ProdtreeError::Config(_) => 2,
                ProdtreeError::Policy(_) => 4,
                ProdtreeError::Resolution(_) => 5,
                ProdtreeError::Io { .. } => 10,
                ProdtreeError::Descriptor(_) => 1,
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        Self::Core(e.into())
    }
}
