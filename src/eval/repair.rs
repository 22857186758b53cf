//! Heuristic rewrites for common dialect mistakes.
//!
//! Each fix is keyed on the engine's error message. When no fix applies the
//! statement comes back unchanged, which callers treat as "cannot repair".

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref JOIN_USING: Regex =
        Regex::new(r"JOIN\s+(\w+)\s+(AS\s+\w+\s+)?USING\s*\(\s*[^()]+\s*\)").expect("valid regex");
    static ref INTERVAL_LITERAL: Regex =
        Regex::new(r#"INTERVAL\s+['"](\d+)\s+(YEAR|MONTH|DAY|HOUR|MINUTE|SECOND)S?["']"#)
            .expect("valid regex");
    static ref SEQUENCE_START: Regex =
        Regex::new(r"\bSTART\b(\s+WITH\b)?").expect("valid regex");
    static ref SEQUENCE_INCREMENT: Regex =
        Regex::new(r"\bINCREMENT\b(\s+BY\b)?").expect("valid regex");
    static ref CREATE_SEQUENCE: Regex =
        Regex::new(r"^\s*CREATE\s+SEQUENCE\b").expect("valid regex");
}

/// Propose a rewritten statement for the failure described by `message`.
pub fn propose_fix(statement: &str, message: &str) -> String {
    if let Some(column) = missing_column(message) {
        return fix_missing_column(statement, &column);
    }
    if is_interval_error(message) {
        return INTERVAL_LITERAL
            .replace_all(statement, "INTERVAL '${1}' ${2}")
            .into_owned();
    }
    if is_sequence_error(statement, message) {
        return fix_sequence_options(statement);
    }
    statement.to_string()
}

/// Name of the column an engine could not resolve, if `message` says so.
fn missing_column(message: &str) -> Option<String> {
    if let Some(rest) = message.split("no such column: ").nth(1) {
        let name = rest.split_whitespace().next().unwrap_or("");
        return (!name.is_empty()).then(|| name.to_string());
    }

    let lowered = message.to_lowercase();
    let unresolved = lowered.contains("column")
        && (lowered.contains("not found") || lowered.contains("does not exist"));
    if !unresolved {
        return None;
    }

    let mut quoted = message.split('"');
    quoted.next()?;
    let name = quoted.next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// A table alias passed to `COUNT(...)` is read as a column. Counting the
/// alias's rows needs `COUNT(alias.*)`. `JOIN ... USING (...)` is rewritten to
/// a natural join in the same pass since it is the other common source of
/// unresolved columns.
fn fix_missing_column(statement: &str, column: &str) -> String {
    let count = Regex::new(&format!(
        r"(?i)\bCOUNT\s*\(\s*({})\s*\)",
        regex::escape(column)
    ));
    let fixed = match count {
        Ok(count) => count.replacen(statement, 1, "COUNT(${1}.*)").into_owned(),
        Err(_) => statement.to_string(),
    };
    JOIN_USING
        .replace_all(&fixed, "NATURAL JOIN ${1} ${2}")
        .into_owned()
}

fn is_interval_error(message: &str) -> bool {
    message.contains("Cannot parse \"INTERVAL\" constant")
        || message
            .to_lowercase()
            .contains("invalid input syntax for type interval")
}

fn is_sequence_error(statement: &str, message: &str) -> bool {
    let mentions_option = message.contains("START") || message.contains("INCREMENT");
    let about_sequence =
        message.contains("CREATE SEQUENCE") || CREATE_SEQUENCE.is_match(statement);
    mentions_option && about_sequence
}

/// `START n` becomes `START WITH n`, `INCREMENT n` becomes `INCREMENT BY n`.
fn fix_sequence_options(statement: &str) -> String {
    let fixed = SEQUENCE_START.replace_all(statement, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            "START WITH".to_string()
        }
    });
    SEQUENCE_INCREMENT
        .replace_all(&fixed, |caps: &Captures| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                "INCREMENT BY".to_string()
            }
        })
        .into_owned()
}
