//! Rubric rules.
//!
//! Each rule looks at one statement (or, for the key and model rules, at the
//! introspected schema), credits its ledger entry and appends the statement to
//! the entry's description with the keywords that triggered the rule wrapped
//! in `<span>`. Statements that never ran are credited towards the possible
//! score only and marked `uncertain` in the description.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use tracing::warn;

use super::criterion::{Criterion, Ledger};
use super::model::RelationalModel;

/// Ledger keys the rules credit.
pub mod keys {
    pub const PRIMARY_KEYS: &str = "defining primary keys of tables";
    pub const INTEGRITY_CONSTRAINTS: &str = "using integrity constraints";
    pub const ON_UPDATE_DELETE: &str = "using ON UPDATE/DELETE for foreign key";
    pub const INSERT_INTO: &str = "statements to fill tables by data";
    pub const OUTER_JOIN: &str = "outer join of tables";
    pub const INNER_JOIN: &str = "inner join of tables";
    pub const CONDITION: &str = "condition on the data";
    pub const AGGREGATION: &str = "aggregation";
    pub const SORTING: &str = "sorting and pagination";
    pub const SET_OPERATIONS: &str = "set operations";
    pub const INNER_SELECT: &str = "inner SELECT";
    pub const RELATIONAL_MODEL: &str = "corresponding to the relational model";
}

const AGGREGATE_FUNCTIONS: [&str; 5] = ["COUNT", "AVG", "SUM", "MIN", "MAX"];

fn keyword_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("keyword pattern must compile")
}

lazy_static! {
    static ref INTEGRITY_KEYWORDS: Regex =
        keyword_regex(r"\b(?:REFERENCES|CHECK|UNIQUE|NOT\s+NULL)\b");
    static ref ON_UPDATE_DELETE: Regex = keyword_regex(r"\bON\s+(?:UPDATE|DELETE)\b");
    static ref OUTER_JOIN: Regex =
        keyword_regex(r"\b(?:LEFT|RIGHT|FULL)\s+(?:OUTER\s+)?JOIN\b");
    static ref ANY_JOIN: Regex =
        keyword_regex(r"\b((?:LEFT|RIGHT|FULL)\s+(?:OUTER\s+)?)?((?:INNER\s+)?JOIN)\b");
    static ref WHERE: Regex = keyword_regex(r"\bWHERE\b");
    static ref AGGREGATE_CALL: Regex = keyword_regex(r"\b(COUNT|AVG|SUM|MIN|MAX)\(");
    static ref GROUPING: Regex = keyword_regex(r"\b(?:GROUP\s+BY|HAVING)\b");
    static ref SORTING: Regex = keyword_regex(r"\b(?:ORDER\s+BY|LIMIT|OFFSET)\b");
    static ref SET_OPERATION: Regex =
        keyword_regex(r"\b(?:UNION(?:\s+ALL)?|INTERSECT|EXCEPT)\b");
    static ref SELECT: Regex = keyword_regex(r"\bSELECT\b");
}

/// Per-run memory of which aggregation forms were already credited.
#[derive(Debug, Default)]
struct AggregationCredit {
    functions: BTreeSet<&'static str>,
    grouping: bool,
}

/// Applies the rubric rules to one run's ledger.
pub struct ScoreCalculator<'a> {
    ledger: &'a mut Ledger,
    aggregation: AggregationCredit,
}

impl<'a> ScoreCalculator<'a> {
    pub fn new(ledger: &'a mut Ledger) -> Self {
        Self {
            ledger,
            aggregation: AggregationCredit::default(),
        }
    }

    fn criterion(&mut self, key: &str) -> Option<&mut Criterion> {
        let criterion = self.ledger.get_mut(key);
        if criterion.is_none() {
            warn!("Rubric has no criterion '{}', skipping rule", key);
        }
        criterion
    }

    /// A CREATE TABLE statement that ran.
    pub fn score_create_table(&mut self, statement: &str) {
        if ON_UPDATE_DELETE.is_match(statement) {
            self.calculate_on_update_delete(statement);
        }
        if INTEGRITY_KEYWORDS.is_match(statement) {
            self.calculate_integrity_constraints(statement);
        }
    }

    /// An INSERT statement that ran.
    pub fn score_insert(&mut self) {
        if let Some(criterion) = self.criterion(keys::INSERT_INTO) {
            criterion.credit_full(true);
            criterion.count_occurrence();
        }
    }

    /// A SELECT statement, `certain` when the engine accepted it.
    pub fn score_select(&mut self, statement: &str, certain: bool) {
        if statement.contains("JOIN") {
            self.calculate_join(statement, certain);
        }
        if WHERE.is_match(statement) {
            self.calculate_condition(statement, certain);
        }
        if has_aggregate_function(statement) || has_grouping(statement) {
            self.calculate_aggregation(statement, certain);
        }
        if SORTING.is_match(statement) {
            self.calculate_sorting(statement, certain);
        }
        if SET_OPERATION.is_match(statement) {
            self.calculate_set_operations(statement, certain);
        }
        self.calculate_inner_select(statement, certain);
    }

    /// One table with a declared primary key, out of `create_table_count`
    /// CREATE TABLE statements read.
    pub fn calculate_primary_key(&mut self, create_table_count: usize) {
        if create_table_count == 0 {
            return;
        }
        if let Some(criterion) = self.criterion(keys::PRIMARY_KEYS) {
            criterion.credit(1.0 / create_table_count as f64, true);
            criterion.count_occurrence();
        }
    }

    pub fn add_table_without_primary_key(&mut self, table: &str) {
        if let Some(criterion) = self.criterion(keys::PRIMARY_KEYS) {
            criterion.describe(&format!(" [{}]", table));
        }
    }

    pub fn calculate_integrity_constraints(&mut self, statement: &str) {
        if let Some(criterion) = self.criterion(keys::INTEGRITY_CONSTRAINTS) {
            criterion.credit(0.5, true);
            criterion.describe(&annotate(statement, &[&*INTEGRITY_KEYWORDS], true));
            criterion.count_occurrence();
        }
    }

    pub fn calculate_on_update_delete(&mut self, statement: &str) {
        if let Some(criterion) = self.criterion(keys::ON_UPDATE_DELETE) {
            criterion.credit(1.0, true);
            criterion.describe(&format!(" [{}]", table_name_of(statement)));
            criterion.count_occurrence();
        }
    }

    /// Outer and inner joins are credited independently; one statement can
    /// satisfy both.
    pub fn calculate_join(&mut self, statement: &str, certain: bool) {
        let joins = statement.matches("JOIN").count();
        let outer = OUTER_JOIN.find_iter(statement).count();

        if outer > 0 {
            if let Some(criterion) = self.criterion(keys::OUTER_JOIN) {
                criterion.credit_full(certain);
                criterion.describe(&annotate(statement, &[&*OUTER_JOIN], certain));
                criterion.count_occurrence();
            }
        }

        if joins > outer {
            if let Some(criterion) = self.criterion(keys::INNER_JOIN) {
                criterion.credit_full(certain);
                criterion.describe(&annotate_inner_joins(statement, certain));
                criterion.count_occurrence();
            }
        }
    }

    pub fn calculate_condition(&mut self, statement: &str, certain: bool) {
        self.flat_rule(keys::CONDITION, statement, &WHERE, certain);
    }

    /// An aggregate function earns one point the first time any aggregate
    /// function is seen in the run. Combined with GROUP BY and HAVING it earns
    /// full credit every time. GROUP BY with HAVING alone earns one point the
    /// first time it is seen.
    pub fn calculate_aggregation(&mut self, statement: &str, certain: bool) {
        let functions: Vec<&'static str> = AGGREGATE_FUNCTIONS
            .into_iter()
            .filter(|f| statement.contains(&format!("{}(", f)))
            .collect();
        let grouping = has_grouping(statement);
        let first_function = self.aggregation.functions.is_empty();
        let first_grouping = !self.aggregation.grouping;

        if let Some(criterion) = self.criterion(keys::AGGREGATION) {
            if !functions.is_empty() {
                if grouping {
                    criterion.credit_full(certain);
                } else if first_function {
                    criterion.credit(1.0, certain);
                }
            } else if grouping && first_grouping {
                criterion.credit(1.0, certain);
            }
            criterion.describe(&annotate_aggregation(statement, certain));
            criterion.count_occurrence();
        }

        self.aggregation.functions.extend(functions);
        self.aggregation.grouping |= grouping;
    }

    pub fn calculate_sorting(&mut self, statement: &str, certain: bool) {
        self.flat_rule(keys::SORTING, statement, &SORTING, certain);
    }

    pub fn calculate_set_operations(&mut self, statement: &str, certain: bool) {
        self.flat_rule(keys::SET_OPERATIONS, statement, &SET_OPERATION, certain);
    }

    /// Fires when the statement holds more SELECTs than its set-operation
    /// branches account for.
    pub fn calculate_inner_select(&mut self, statement: &str, certain: bool) {
        let selects = statement.matches("SELECT").count();
        let branches = 1
            + statement.matches("UNION").count()
            + statement.matches("INTERSECT").count()
            + statement.matches("EXCEPT").count();

        if selects > branches {
            self.flat_rule(keys::INNER_SELECT, statement, &SELECT, certain);
        }
    }

    pub fn calculate_relational_model(&mut self, model: &RelationalModel) {
        if let Some(criterion) = self.criterion(keys::RELATIONAL_MODEL) {
            for table in model.tables() {
                criterion.describe(&table.to_html());
                criterion.describe("<br>");
            }
            criterion.add_occurrences(model.len() as u32);
        }
    }

    fn flat_rule(&mut self, key: &str, statement: &str, keywords: &Regex, certain: bool) {
        if let Some(criterion) = self.criterion(key) {
            criterion.credit_full(certain);
            criterion.describe(&annotate(statement, &[keywords], certain));
            criterion.count_occurrence();
        }
    }
}

fn has_aggregate_function(statement: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|f| statement.contains(&format!("{}(", f)))
}

fn has_grouping(statement: &str) -> bool {
    statement.contains("GROUP BY") && statement.contains("HAVING")
}

/// Last word of the statement's first line, ignoring a trailing `(`.
fn table_name_of(statement: &str) -> &str {
    let first_line = statement.split(['\r', '\n']).next().unwrap_or("");
    let trimmed = first_line.trim_end_matches([' ', '\t', '(']);
    trimmed.rsplit(' ').next().unwrap_or("")
}

fn annotate(statement: &str, keywords: &[&Regex], certain: bool) -> String {
    let mut text = statement.to_string();
    for keyword in keywords {
        text = keyword.replace_all(&text, "<span>$0</span>").into_owned();
    }
    finish_annotation(&text, certain)
}

/// Highlights aggregate function names (not their opening parenthesis) and
/// the grouping clauses.
fn annotate_aggregation(statement: &str, certain: bool) -> String {
    let text = AGGREGATE_CALL.replace_all(statement, "<span>${1}</span>(");
    let text = GROUPING.replace_all(&text, "<span>$0</span>");
    finish_annotation(&text, certain)
}

/// Highlights inner joins only, leaving outer joins as they are.
fn annotate_inner_joins(statement: &str, certain: bool) -> String {
    let text = ANY_JOIN.replace_all(statement, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            format!("<span>{}</span>", &caps[2])
        }
    });
    finish_annotation(&text, certain)
}

fn finish_annotation(text: &str, certain: bool) -> String {
    let text = text.replace("\r\n", "<br>").replace('\n', "<br>");
    if certain {
        format!("{}<br><br>", text)
    } else {
        format!("<span class=\"uncertain\">{}</span><br><br>", text)
    }
}
