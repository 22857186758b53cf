//! Statement extraction from free text.
//!
//! Text pulled out of a student's PDF is not a SQL script: statements sit
//! between prose, headings and page numbers. Instead of parsing, the extractor
//! runs five statement-family patterns over one normalized buffer, in a fixed
//! priority order:
//!
//! ```text
//! CREATE SEQUENCE / ALTER TABLE / DELETE FROM
//! DROP TABLE
//! CREATE TABLE
//! INSERT INTO
//! SELECT            (over the text with every accepted INSERT cut out)
//! ```
//!
//! Matches are concatenated family by family, so the result is ordered by
//! family first and source position second.

use regex::Regex;
use lazy_static::lazy_static;
use std::ops::Range;

/// Longest statement body (in characters) the infrequent-statement, CREATE
/// TABLE and INSERT families accept.
pub const MAX_STATEMENT_SPAN: usize = 1400;

/// Longest SELECT body after `FROM` (in characters).
pub const MAX_SELECT_SPAN: usize = 1300;

/// Bare or quoted identifier.
const IDENT: &str = r#"(?:[\w-]+|['"](?:\s*[\w-]+)+['"])"#;

/// Anything up to the next semicolon that is not inside a quoted literal.
const BODY_UNQUOTED: &str = r"(?:[^;']|'[^']+')+";
const BODY: &str = r"(?:[^;']|'[^']*')+";

/// A statement family pattern with a bounded body span.
///
/// The regex captures the span-limited part of the statement as `body`. A
/// match whose body exceeds `max_body` is not extracted; the search resumes one
/// character after the start of the rejected match.
struct SpanPattern {
    regex: Regex,
    max_body: Option<usize>,
}

impl SpanPattern {
    fn new(pattern: &str, max_body: Option<usize>) -> Self {
        Self {
            regex: Regex::new(pattern).expect("statement pattern must compile"),
            max_body,
        }
    }

    fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut pos = 0;

        while pos <= text.len() {
            let Some(caps) = self.regex.captures_at(text, pos) else {
                break;
            };
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(pos..pos);
            let within_bound = match (self.max_body, caps.name("body")) {
                (Some(max), Some(body)) => body.as_str().chars().count() <= max,
                _ => true,
            };

            if within_bound {
                pos = if whole.is_empty() { whole.end + 1 } else { whole.end };
                spans.push(whole);
            } else {
                pos = next_char_boundary(text, whole.start);
            }
        }

        spans
    }
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text[from..]
        .chars()
        .next()
        .map(|c| from + c.len_utf8())
        .unwrap_or(text.len() + 1)
}

lazy_static! {
    static ref INFREQUENT: SpanPattern = SpanPattern::new(
        &format!(
            r"\b(?:CREATE\s+SEQUENCE|ALTER\s+TABLE|DELETE\s+FROM)\b(?P<body>{BODY_UNQUOTED});"
        ),
        Some(MAX_STATEMENT_SPAN),
    );

    static ref DROP_TABLE: SpanPattern = SpanPattern::new(
        &format!(r"\bDROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?{IDENT};"),
        None,
    );

    static ref CREATE_TABLE: SpanPattern = SpanPattern::new(
        &format!(
            r#"(?s)\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?['"]?(?:[\w-]+.)?{IDENT}['"]?\s*\((?P<body>{BODY});"#
        ),
        Some(MAX_STATEMENT_SPAN),
    );

    static ref INSERT_INTO: SpanPattern = SpanPattern::new(
        &format!(r"\bINSERT\s+INTO\s+{IDENT}(?P<body>{BODY_UNQUOTED});"),
        Some(MAX_STATEMENT_SPAN),
    );

    static ref SELECT: SpanPattern = select_pattern();
}

fn select_pattern() -> SpanPattern {
    let column = format!(
        r"(?:(?:{IDENT}\.)?(?:\*|{IDENT})|[\w-]+\s*\(\s*(?:{IDENT}\.)?(?:\*|{IDENT})\s*\))(?:\s+(?:AS\s+)?[\w-]+)?"
    );
    let concatenated = format!(r#"{column}(?:\s+\|\|\s+(?:{column}|["']?[^"']*["']?))*"#);
    SpanPattern::new(
        &format!(
            r"\bSELECT\s+(?:ALL\s+|DISTINCT\s+)?{concatenated}(?:\s*,\s*{concatenated})*\s+FROM(?P<body>{BODY});"
        ),
        Some(MAX_SELECT_SPAN),
    )
}

/// Repair typography and PDF artefacts that break the statement patterns.
///
/// Curly quotes become ASCII quotes, Unicode line separators become newlines,
/// and the two control characters PDF text extraction leaves in place of the
/// `ffi`/`ff` ligatures are expanded back to letters.
pub fn normalize(text: &str) -> String {
    text.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2019}', "'")
        .replace('\u{2028}', "\n")
        .replace('\u{001E}', "FFI")
        .replace('\u{001B}', "FF")
}

/// Extract candidate statements from raw solution text.
pub fn extract(text: &str) -> Vec<String> {
    let text = normalize(text);
    let mut statements = Vec::new();

    for pattern in [&*INFREQUENT, &*DROP_TABLE, &*CREATE_TABLE] {
        statements.extend(collect(&text, &pattern.find_spans(&text)));
    }

    let inserts = INSERT_INTO.find_spans(&text);
    statements.extend(collect(&text, &inserts));

    let without_inserts = cut_spans(&text, &inserts);
    statements.extend(collect(
        &without_inserts,
        &SELECT.find_spans(&without_inserts),
    ));

    tracing::debug!("Extracted {} statements", statements.len());
    statements
}

fn collect(text: &str, spans: &[Range<usize>]) -> Vec<String> {
    spans.iter().map(|span| text[span.clone()].to_string()).collect()
}

/// `text` with every span removed. Spans must be sorted and disjoint.
fn cut_spans(text: &str, spans: &[Range<usize>]) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut last = 0;
    for span in spans {
        kept.push_str(&text[last..span.start]);
        last = span.end;
    }
    kept.push_str(&text[last..]);
    kept
}
