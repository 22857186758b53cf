use crate::db::EngineError;

/// Errors that abort an evaluation run.
///
/// Recoverable engine rejections never surface here: they end up in the
/// run's [`ErrorLog`](super::ErrorLog) instead.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("{} is not retried, aborting on `{statement}`: {source}", .source.category)]
    Fatal {
        statement: String,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Catalog(#[from] anyhow::Error),
}
