use std::collections::HashSet;
use tracing::debug;

use super::repair::propose_fix;
use super::{ErrorLog, EvalError};
use crate::db::SqlBackend;

/// Submits statements to the engine and drives the repair loop.
///
/// A rejected statement is rewritten by the repair advisor and submitted
/// again until it runs, or until the advisor proposes text that was already
/// tried. Only rejections whose category is recoverable enter the loop; any
/// other rejection aborts the run.
pub struct ExecutionGateway<'a, B: SqlBackend + ?Sized> {
    backend: &'a mut B,
    error_log: &'a mut ErrorLog,
}

impl<'a, B: SqlBackend + ?Sized> ExecutionGateway<'a, B> {
    pub fn new(backend: &'a mut B, error_log: &'a mut ErrorLog) -> Self {
        Self { backend, error_log }
    }

    /// Returns `Ok(false)` when the statement could not be made to run. The
    /// last rejection is then in the error log.
    pub async fn try_execute(&mut self, statement: &str) -> Result<bool, EvalError> {
        let mut attempt = statement.to_string();
        let mut attempted = HashSet::new();

        loop {
            let error = match self.backend.execute(&attempt).await {
                Ok(()) => return Ok(true),
                Err(error) => error,
            };

            if !error.category.is_recoverable() {
                return Err(EvalError::Fatal {
                    statement: attempt,
                    source: error,
                });
            }

            let fixed = propose_fix(&attempt, &error.message);
            attempted.insert(attempt);
            if attempted.contains(&fixed) {
                self.error_log.record(statement, &error);
                return Ok(false);
            }

            debug!("Retrying with repaired statement: {}", fixed);
            attempt = fixed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fake::FakeBackend;
    use crate::db::{EngineError, ErrorCategory};

    #[tokio::test]
    async fn test_success_runs_once() {
        let mut backend = FakeBackend::new();
        let mut log = ErrorLog::new();
        let ok = ExecutionGateway::new(&mut backend, &mut log)
            .try_execute("SELECT * FROM T;")
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(backend.executed, vec!["SELECT * FROM T;"]);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_repaired_statement_succeeds() {
        let mut backend = FakeBackend::new().reject(
            "COUNT(E)",
            EngineError::new(ErrorCategory::Semantic, "Column \"E\" not found"),
        );
        let mut log = ErrorLog::new();
        let ok = ExecutionGateway::new(&mut backend, &mut log)
            .try_execute("SELECT COUNT(E) FROM EMP E;")
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(
            backend.executed,
            vec!["SELECT COUNT(E) FROM EMP E;", "SELECT COUNT(E.*) FROM EMP E;"]
        );
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_unfixable_statement_stops_at_fixed_point() {
        let mut backend = FakeBackend::new().reject(
            "FROM NOWHERE",
            EngineError::new(ErrorCategory::Semantic, "no such table: NOWHERE"),
        );
        let mut log = ErrorLog::new();
        let ok = ExecutionGateway::new(&mut backend, &mut log)
            .try_execute("SELECT * FROM NOWHERE;")
            .await
            .unwrap();
        assert!(!ok);
        assert_eq!(backend.executed.len(), 1);
        assert_eq!(log.messages(), vec!["no such table: NOWHERE"]);
        assert_eq!(log.entries()[0].statement, "SELECT * FROM NOWHERE;");
    }

    #[tokio::test]
    async fn test_repair_that_still_fails_is_logged_once() {
        let mut backend = FakeBackend::new().reject(
            "SEQUENCE",
            EngineError::new(ErrorCategory::Syntax, "syntax error at or near \"START\""),
        );
        let mut log = ErrorLog::new();
        let ok = ExecutionGateway::new(&mut backend, &mut log)
            .try_execute("CREATE SEQUENCE S START 1;")
            .await
            .unwrap();
        assert!(!ok);
        assert_eq!(
            backend.executed,
            vec!["CREATE SEQUENCE S START 1;", "CREATE SEQUENCE S START WITH 1;"]
        );
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_unrecoverable_category_is_fatal() {
        let mut backend = FakeBackend::new().reject(
            "SELECT",
            EngineError::new(ErrorCategory::Connection, "connection reset"),
        );
        let mut log = ErrorLog::new();
        let result = ExecutionGateway::new(&mut backend, &mut log)
            .try_execute("SELECT 1;")
            .await;
        assert!(matches!(result, Err(EvalError::Fatal { .. })));
        assert!(log.is_empty());
    }
}
