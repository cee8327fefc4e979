//! Error types for the Drill environment abstraction.

use thiserror::Error;

/// Errors that can occur while talking to a game session.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The session refused to apply a scenario state
    #[error("Scenario state rejected: {0}")]
    StateRejected(String),

    /// The session could not start the requested match
    #[error("Match setup failed: {0}")]
    MatchSetup(String),

    /// A debug drawing call failed
    #[error("Render error: {0}")]
    RenderError(String),
}

impl EnvError {
    /// Creates a state-rejected error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::StateRejected(msg.into())
    }

    /// Creates a render error.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::RenderError(msg.into())
    }
}
