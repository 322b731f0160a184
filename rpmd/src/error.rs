//! Error types for the integrator kernel.

use thiserror::Error;

/// Errors raised by the ring-polymer integrator.
///
/// All of these are fatal to the current step. There is no retry and no
/// rollback: after a failed step the ensemble state is unspecified and the
/// caller should restart from a checkpoint.
#[derive(Debug, Error)]
pub enum RpmdError {
    /// A contraction refers to a force group outside [0, 31].
    #[error("force group must be between 0 and 31, got {0}")]
    InvalidForceGroup(u32),

    /// A contraction asks for an unusable number of copies.
    #[error("number of copies for a contraction must be between 1 and {total}, got {copies}")]
    InvalidContractionCopies { copies: usize, total: usize },

    /// A configuration parameter failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The periodic box changed during a force evaluation.
    #[error(
        "standard barostats cannot be used with the ring-polymer integrator; \
         use the RPMD-aware barostat instead"
    )]
    BarostatMovedBox,

    /// Ring-polymer contraction was requested for an open chain.
    #[error("contractions are not implemented for the open path")]
    OpenPathContraction,

    /// The external physics engine reported a failure.
    #[error("physics engine failure: {0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, RpmdError>;
