use serde::Serialize;
use tracing::{info, warn};

use super::criterion::Ledger;
use super::error::EvalError;
use super::error_log::ErrorLog;
use super::extract::extract;
use super::gateway::ExecutionGateway;
use super::introspect::introspect_table;
use super::model::RelationalModel;
use super::score::ScoreCalculator;
use super::statement::{prepare_for_engine, StatementKind};
use super::stats::Statistics;
use crate::db::SqlBackend;

/// Outcome of one graded solution.
#[derive(Debug, Serialize)]
pub struct Evaluation {
    pub ledger: Ledger,
    pub model: RelationalModel,
    pub errors: ErrorLog,
    pub statistics: Statistics,
}

impl Evaluation {
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.messages()
    }

    pub fn statistics_lines(&self) -> Vec<String> {
        self.statistics.lines()
    }
}

/// Grades solutions against one backend.
///
/// The backend is closed at the end of every [`evaluate`](Self::evaluate)
/// call, so an evaluator grades a single solution.
pub struct SolutionEvaluator<B: SqlBackend> {
    backend: B,
}

impl<B: SqlBackend> SolutionEvaluator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn evaluate(
        &mut self,
        ledger: Ledger,
        solution: &str,
    ) -> Result<Evaluation, EvalError> {
        info!("Evaluating solution on {}", self.backend.name());
        let result = self.run(ledger, solution).await;

        if let Err(e) = self.backend.close().await {
            warn!("Failed to close {} backend: {:#}", self.backend.name(), e);
        }
        result
    }

    async fn run(&mut self, mut ledger: Ledger, solution: &str) -> Result<Evaluation, EvalError> {
        let statements: Vec<(Option<StatementKind>, String)> = extract(solution)
            .into_iter()
            .map(|s| (StatementKind::classify(&s), s))
            .collect();
        let (schema, others): (Vec<_>, Vec<_>) = statements
            .iter()
            .partition(|(kind, _)| kind.is_some_and(StatementKind::is_schema_defining));
        info!(
            "Extracted {} statements ({} schema-defining)",
            statements.len(),
            schema.len()
        );

        let mut errors = ErrorLog::new();
        let mut statistics = Statistics::default();
        let mut calculator = ScoreCalculator::new(&mut ledger);

        for (kind, statement) in schema.into_iter().chain(others) {
            if let Some(kind) = kind {
                statistics.record_read(*kind);
            }
            let prepared = prepare_for_engine(statement);
            let executed = ExecutionGateway::new(&mut self.backend, &mut errors)
                .try_execute(&prepared)
                .await?;

            match kind {
                Some(kind) if executed => {
                    info!("Executed {} statement", kind);
                    statistics.record_executed(*kind);
                    match kind {
                        StatementKind::CreateTable => calculator.score_create_table(&prepared),
                        StatementKind::InsertInto => calculator.score_insert(),
                        k if k.is_select() => calculator.score_select(&prepared, true),
                        _ => {}
                    }
                }
                Some(kind) if kind.is_select() => calculator.score_select(&prepared, false),
                _ => {}
            }
        }

        info!("Reading back the schema");
        let create_tables_read = statistics.create_table.read;
        let mut model = RelationalModel::new();
        for name in self.backend.table_names().await? {
            let schema = introspect_table(&mut self.backend, &name).await?;
            if schema.has_primary_key() {
                calculator.calculate_primary_key(create_tables_read);
            } else {
                calculator.add_table_without_primary_key(&name);
            }
            model.add_table(schema.into_table());
        }

        let has_create_table = statements
            .iter()
            .any(|(kind, _)| *kind == Some(StatementKind::CreateTable));
        if has_create_table {
            calculator.calculate_relational_model(&model);
        }

        info!(
            "Evaluation finished: {} tables, {} unrecoverable errors",
            model.len(),
            errors.len()
        );
        Ok(Evaluation {
            ledger,
            model,
            errors,
            statistics,
        })
    }
}
