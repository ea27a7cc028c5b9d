#![forbid(unsafe_code)]

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskdeckError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("invalid date '{input}': {msg}")]
    InvalidDate { input: String, msg: String },

    #[error("invalid priority {0}: must be 1, 2 or 3")]
    InvalidPriority(u8),

    #[error("invalid status '{0}': must be todo, doing or done")]
    InvalidStatus(String),

    #[error("no task with id {0}")]
    TaskNotFound(i64),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("{0}")]
    Other(String),
}

/// Required fields missing on creation. Every failed check contributes one
/// message, so the user sees all of them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ValidationError {
    messages: Vec<String>,
}

impl ValidationError {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages.join("; "))
    }
}
