use serde::{Deserialize, Serialize};

use crate::db::{EngineError, ErrorCategory};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub message: String,
    pub statement: String,
    pub category: ErrorCategory,
    pub logged_at: chrono::DateTime<chrono::Utc>,
}

/// Statements the engine kept rejecting after every repair attempt, in the
/// order they were given up on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorLog {
    entries: Vec<ErrorLogEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, statement: &str, error: &EngineError) {
        tracing::error!("Giving up on `{}`\n{}", statement, error.display_full());

        self.entries.push(ErrorLogEntry {
            message: error.message.clone(),
            statement: statement.to_string(),
            category: error.category,
            logged_at: chrono::Utc::now(),
        });
    }

    pub fn entries(&self) -> &[ErrorLogEntry] {
        &self.entries
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
