use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

/// Categorized error types for statement rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Syntax errors (SQLSTATE 42601 - syntax_error, etc.)
    Syntax,
    /// Semantic errors (missing table/column, ambiguous reference)
    Semantic,
    /// Execution/runtime errors (division by zero, constraint violation)
    Execution,
    /// Transaction state errors (e.g., transaction aborted)
    Transaction,
    /// Connection/communication errors
    Connection,
    /// Unknown or unclassified errors
    Unknown,
}

impl ErrorCategory {
    /// Rejections the gateway may try to repair. Everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Syntax | ErrorCategory::Semantic | ErrorCategory::Execution
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax Error"),
            ErrorCategory::Semantic => write!(f, "Semantic Error"),
            ErrorCategory::Execution => write!(f, "Execution Error"),
            ErrorCategory::Transaction => write!(f, "Transaction Error"),
            ErrorCategory::Connection => write!(f, "Connection Error"),
            ErrorCategory::Unknown => write!(f, "Error"),
        }
    }
}

/// A statement rejected by the relational engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    /// Categorized error type
    pub category: ErrorCategory,
    /// SQLSTATE error code (e.g., "42601" for syntax_error), empty when unknown
    pub code: String,
    /// Primary error message as reported by the engine
    pub message: String,
    /// Optional detail providing more context
    pub detail: Option<String>,
    /// Optional hint suggesting a fix
    pub hint: Option<String>,
    /// Computed line number (1-based) from the error position, if available
    pub line: Option<usize>,
    /// Computed column number (1-based) from the error position, if available
    pub col: Option<usize>,
}

impl EngineError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        EngineError {
            category,
            code: String::new(),
            message: message.into(),
            detail: None,
            hint: None,
            line: None,
            col: None,
        }
    }

    /// Create an EngineError from a tokio_postgres error, using the statement
    /// text to compute line/column from the byte position.
    pub fn from_pg_error(err: &tokio_postgres::Error, statement: &str) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code().code().to_string();
            let position = db_err.position().and_then(|p| match p {
                tokio_postgres::error::ErrorPosition::Original(pos) => Some(*pos),
                tokio_postgres::error::ErrorPosition::Internal { .. } => None,
            });
            let (line, col) = match position {
                Some(pos) => byte_offset_to_line_col(statement, pos as usize),
                None => (None, None),
            };

            EngineError {
                category: categorize_sqlstate(&code),
                code,
                message: db_err.message().to_string(),
                detail: db_err.detail().map(|s| s.to_string()),
                hint: db_err.hint().map(|s| s.to_string()),
                line,
                col,
            }
        } else {
            // Non-database error (connection, protocol, etc.)
            let category = if err.is_closed() || err.source().is_some() {
                ErrorCategory::Connection
            } else {
                ErrorCategory::Unknown
            };
            let mut engine_error = EngineError::new(category, err.to_string());
            engine_error.detail = err.source().map(|e| e.to_string());
            engine_error
        }
    }

    /// Create an EngineError from a rusqlite error.
    ///
    /// Prepare-time rejections (syntax errors, unknown tables and columns)
    /// arrive as `SqlInputError` and carry the offending offset; step-time
    /// rejections arrive as `SqliteFailure`.
    pub fn from_sqlite_error(err: &rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let (failure, message, position) = match err {
            rusqlite::Error::SqlInputError {
                error,
                msg,
                sql,
                offset,
            } => {
                let position = usize::try_from(*offset)
                    .ok()
                    .map(|offset| byte_offset_to_line_col(sql, offset + 1));
                (Some(error), msg.clone(), position)
            }
            rusqlite::Error::SqliteFailure(error, Some(message)) => {
                (Some(error), message.clone(), None)
            }
            rusqlite::Error::SqliteFailure(error, None) => (Some(error), err.to_string(), None),
            other => (None, other.to_string(), None),
        };

        let category = match failure.map(|f| f.code) {
            Some(ErrorCode::Unknown) if message.contains("syntax error") => ErrorCategory::Syntax,
            Some(ErrorCode::Unknown) => ErrorCategory::Semantic,
            Some(
                ErrorCode::ConstraintViolation
                | ErrorCode::TypeMismatch
                | ErrorCode::TooBig
                | ErrorCode::ParameterOutOfRange,
            ) => ErrorCategory::Execution,
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => ErrorCategory::Transaction,
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt,
            ) => ErrorCategory::Connection,
            _ => ErrorCategory::Unknown,
        };

        let mut engine_error = EngineError::new(category, message);
        if let Some(failure) = failure {
            engine_error.code = failure.extended_code.to_string();
        }
        if let Some((line, col)) = position {
            engine_error.line = line;
            engine_error.col = col;
        }
        engine_error
    }

    /// Format as a rich multi-line string for the error log.
    pub fn display_full(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("{}: {}", self.category, self.message));

        if let (Some(line), Some(col)) = (self.line, self.col) {
            lines.push(format!("  at line {}, column {}", line, col));
        }

        if !self.code.is_empty() {
            lines.push(format!("  Code: {}", self.code));
        }

        if let Some(detail) = &self.detail {
            lines.push(format!("  Detail: {}", detail));
        }

        if let Some(hint) = &self.hint {
            lines.push(format!("  Hint: {}", hint));
        }

        lines.join("\n")
    }
}

/// Convert a 1-based byte offset in a statement to (line, column) both 1-based.
fn byte_offset_to_line_col(statement: &str, byte_pos: usize) -> (Option<usize>, Option<usize>) {
    if byte_pos == 0 || statement.is_empty() {
        return (Some(1), Some(1));
    }
    let target = (byte_pos - 1).min(statement.len());
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in statement.char_indices() {
        if i >= target {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (Some(line), Some(col))
}

/// Categorize a SQLSTATE code into an ErrorCategory.
fn categorize_sqlstate(code: &str) -> ErrorCategory {
    if code.len() < 2 {
        return ErrorCategory::Unknown;
    }
    let class = &code[..2];
    match class {
        // Class 42: Syntax Error or Access Rule Violation
        "42" => {
            if code == "42601" || code == "42000" {
                ErrorCategory::Syntax
            } else {
                // 42P01 = undefined_table, 42703 = undefined_column, etc.
                ErrorCategory::Semantic
            }
        }
        // Class 0A: Feature Not Supported
        "0A" => ErrorCategory::Semantic,
        // Class 22: Data Exception
        "22" => ErrorCategory::Execution,
        // Class 23: Integrity Constraint Violation
        "23" => ErrorCategory::Execution,
        "25" | "40" => ErrorCategory::Transaction,
        "08" => ErrorCategory::Connection,
        "53" | "54" | "55" | "57" => ErrorCategory::Execution,
        _ => ErrorCategory::Unknown,
    }
}
