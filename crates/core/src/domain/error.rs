use thiserror::Error;

/// Errors that cross the core boundary. Everything transient
/// (per-source failures, timeouts, malformed rows) is absorbed and
/// logged where it happens; these two indicate a caller contract
/// violation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Instrument code unknown to every tier including fundamentals.
    #[error("instrument not found: {0}")]
    NotFound(String),

    /// Unrecognized investor archetype or otherwise unusable profile.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
}
