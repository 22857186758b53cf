use crate::eval::{keys, Evaluation, Ledger};

const RULE: &str = "------------------------------------------------------------------------------------------------------------------";

/// Score table with one row per rubric item and a total line. The relational
/// model is graded by hand, so it has no row and does not count towards the
/// total.
pub fn score_table(ledger: &Ledger) -> String {
    let mut output = String::new();

    output.push_str(RULE);
    output.push('\n');
    output.push_str(&format!(
        "{:>40} {:>10} {:>14} {:>15} {:>11} {:>13}\n",
        "description", "maxScore", "certainScore", "possibleScore", "queryType", "occurrences"
    ));
    output.push_str(RULE);
    output.push('\n');

    let graded = move || ledger.iter().filter(|(key, _)| *key != keys::RELATIONAL_MODEL);

    for (key, criterion) in graded() {
        output.push_str(&format!(
            "{:>40} {:>7} {:>12.1} {:>15.1} {:>14} {:>11}\n",
            key,
            criterion.max_score(),
            round_tenth(criterion.score()),
            round_tenth(criterion.possible_score()),
            criterion.query_type(),
            criterion.occurrences()
        ));
    }

    let max: u32 = graded().map(|(_, c)| c.max_score()).sum();
    let score: f64 = graded().map(|(_, c)| c.score()).sum();
    let possible: f64 = graded().map(|(_, c)| c.possible_score()).sum();

    output.push_str(RULE);
    output.push('\n');
    output.push_str(&format!(
        "{:>40}{:>8} {:>12.1} {:>15.1}\n",
        "TOTAL SCORE",
        max,
        round_tenth(score),
        round_tenth(possible)
    ));

    output
}

pub fn statistics(evaluation: &Evaluation) -> String {
    let mut output = String::new();
    for line in evaluation.statistics_lines() {
        output.push_str(&line);
        output.push('\n');
    }
    output
}

pub fn errors(evaluation: &Evaluation) -> String {
    let mut output = String::new();
    for entry in evaluation.errors.entries() {
        output.push_str(&format!("[{}] {}\n", entry.category, entry.message));
        output.push_str(&format!("    {}\n", entry.statement.replace('\n', "\n    ")));
    }
    output
}

pub fn to_json(evaluation: &Evaluation) -> String {
    serde_json::to_string_pretty(evaluation).unwrap_or_else(|_| "{}".to_string())
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EngineError, ErrorCategory};
    use crate::eval::{Criterion, ErrorLog, RelationalModel, Statistics};

    fn evaluation() -> Evaluation {
        let mut ledger: Ledger = [
            (keys::CONDITION, Criterion::new(2, "SELECT")),
            (keys::PRIMARY_KEYS, Criterion::new(1, "DDL")),
            (keys::RELATIONAL_MODEL, Criterion::new(5, "MODEL")),
        ]
        .into_iter()
        .collect();
        ledger.get_mut(keys::CONDITION).unwrap().credit(1.0, false);
        ledger.get_mut(keys::PRIMARY_KEYS).unwrap().credit(1.0 / 3.0, true);

        let mut errors = ErrorLog::new();
        errors.record(
            "SELECT *\nFROM MISSING;",
            &EngineError::new(ErrorCategory::Semantic, "no such table: MISSING"),
        );

        Evaluation {
            ledger,
            model: RelationalModel::new(),
            errors,
            statistics: Statistics::default(),
        }
    }

    #[test]
    fn test_score_table_rows_and_total() {
        let table = score_table(&evaluation().ledger);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[1].trim_start().starts_with("description"));
        assert!(lines
            .iter()
            .any(|l| l.contains("condition on the data") && l.contains("0.0") && l.contains("1.0")));
        assert!(lines
            .iter()
            .any(|l| l.contains("defining primary keys of tables") && l.contains("0.3")));
        assert!(!table.contains("relational model"));

        let total = lines.last().unwrap();
        assert!(total.contains("TOTAL SCORE"));
        assert!(total.contains(" 3 "));
        assert!(total.ends_with("1.3"));
    }

    #[test]
    fn test_statistics_block() {
        let text = statistics(&evaluation());
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("CREATE TABLE: 0 read / 0 executed\n"));
    }

    #[test]
    fn test_errors_block_indents_statement() {
        let text = errors(&evaluation());
        assert_eq!(
            text,
            "[Semantic Error] no such table: MISSING\n    SELECT *\n    FROM MISSING;\n"
        );
    }

    #[test]
    fn test_json_report() {
        let json = to_json(&evaluation());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ledger"]["condition on the data"]["possibleScore"], 1.0);
        assert_eq!(value["errors"]["entries"][0]["category"], "Semantic");
        assert_eq!(value["statistics"]["select"]["read"], 0);
    }
}
