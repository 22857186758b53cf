use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Statement families the pipeline tells apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatementKind {
    CreateSequence,
    AlterTable,
    DeleteFrom,
    DropTable,
    CreateTable,
    InsertInto,
    Select,
    /// SELECT combining branches with UNION, INTERSECT or EXCEPT.
    SetOperationSelect,
}

impl StatementKind {
    /// Classify a statement by its leading keywords. Whitespace between the
    /// keywords may be any run of blanks or newlines.
    pub fn classify(statement: &str) -> Option<Self> {
        let mut words = statement.split_whitespace();
        let first = words.next()?;
        let second = words.next().unwrap_or("");

        match (first, second) {
            ("CREATE", "SEQUENCE") => Some(Self::CreateSequence),
            ("CREATE", "TABLE") => Some(Self::CreateTable),
            ("ALTER", "TABLE") => Some(Self::AlterTable),
            ("DELETE", "FROM") => Some(Self::DeleteFrom),
            ("DROP", "TABLE") => Some(Self::DropTable),
            ("INSERT", "INTO") => Some(Self::InsertInto),
            ("SELECT", _) if has_set_operator(statement) => Some(Self::SetOperationSelect),
            ("SELECT", _) => Some(Self::Select),
            _ => None,
        }
    }

    /// Schema-defining statements run before everything else so that data
    /// manipulation finds its tables. ALTER TABLE is not one of them: it
    /// usually targets tables created further down the text.
    pub fn is_schema_defining(self) -> bool {
        matches!(
            self,
            Self::CreateSequence | Self::DropTable | Self::CreateTable
        )
    }

    pub fn is_select(self) -> bool {
        matches!(self, Self::Select | Self::SetOperationSelect)
    }
}

fn has_set_operator(statement: &str) -> bool {
    SET_OPERATOR.is_match(statement)
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CreateSequence => "CREATE SEQUENCE",
            Self::AlterTable => "ALTER TABLE",
            Self::DeleteFrom => "DELETE FROM",
            Self::DropTable => "DROP TABLE",
            Self::CreateTable => "CREATE TABLE",
            Self::InsertInto => "INSERT INTO",
            Self::Select => "SELECT",
            Self::SetOperationSelect => "SELECT (set operation)",
        };
        write!(f, "{}", label)
    }
}

lazy_static! {
    static ref SET_OPERATOR: Regex =
        Regex::new(r"\b(?:UNION|INTERSECT|EXCEPT)\b").expect("valid regex");
    static ref DOTTED_DATE: Regex =
        Regex::new(r"\b(\d{4})\.(\d{2})\.(\d{2})\b").expect("valid regex");
    static ref WITH_OIDS: Regex =
        Regex::new(r"\bWITH\b\s*\(\s*\bOIDS\b\s*=\s*\bFALSE\b\s*\)").expect("valid regex");
    static ref KEY_BEFORE_DEFAULT: Regex =
        Regex::new(r"(PRIMARY KEY)(\s+)((?:\w+\s+)*)(DEFAULT NEXTVAL\('[^']+'\))")
            .expect("valid regex");
}

/// Rewrite vendor-specific spellings into something the engine accepts:
///
/// - `YYYY.MM.DD` dates become `YYYY-MM-DD`
/// - `WITH (OIDS=FALSE)` is dropped
/// - `PRIMARY KEY ... DEFAULT NEXTVAL('seq')` is reordered so the default
///   comes first
pub fn prepare_for_engine(statement: &str) -> String {
    let prepared = DOTTED_DATE.replace_all(statement, "$1-$2-$3");
    let prepared = WITH_OIDS.replace_all(&prepared, "");
    let prepared = KEY_BEFORE_DEFAULT.replace_all(&prepared, "${4}${2}${3}${1}");
    prepared.into_owned()
}
