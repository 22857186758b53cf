use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A set of columns identifying a row: the declared primary key or a
/// UNIQUE NOT NULL candidate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferentialConstraint {
    pub name: String,
    pub columns: BTreeSet<String>,
    pub ref_table: String,
    pub ref_columns: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_keys: Vec<PrimaryKey>,
    pub references: Vec<ReferentialConstraint>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_keys: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn add_primary_key(&mut self, columns: Vec<String>) {
        self.primary_keys.push(PrimaryKey { columns });
    }

    pub fn add_reference(&mut self, reference: ReferentialConstraint) {
        self.references.push(reference);
    }

    /// Same layout as [`Display`](fmt::Display), with the table name marked
    /// up and line breaks as `<br>`.
    pub fn to_html(&self) -> String {
        self.render(&format!("<span>{}</span>", self.name), "<br>")
    }

    fn render(&self, name: &str, newline: &str) -> String {
        let mut out = format!("--> TABLE {} {}{}", name, bracketed(&self.columns), newline);
        for key in &self.primary_keys {
            out.push_str(&format!("--- primary key {}{}", bracketed(&key.columns), newline));
        }
        for reference in &self.references {
            out.push_str(&format!(
                "--- reference {} {} => {} {}{}",
                name,
                bracketed(&reference.columns),
                reference.ref_table,
                bracketed(&reference.ref_columns),
                newline
            ));
        }
        out
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&self.name, "\n"))
    }
}

fn bracketed<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.into_iter().map(String::as_str).collect();
    format!("[{}]", joined.join(", "))
}

/// Tables recovered from the engine catalog after a run, in catalog order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationalModel {
    tables: Vec<Table>,
}

impl RelationalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl fmt::Display for RelationalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            write!(f, "{}", table)?;
        }
        Ok(())
    }
}
