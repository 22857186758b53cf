use serde::Serialize;

use super::statement::StatementKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FamilyCount {
    pub read: usize,
    pub executed: usize,
}

/// Read and executed counts for the statement families the report shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub create_table: FamilyCount,
    pub insert_into: FamilyCount,
    pub select: FamilyCount,
}

impl Statistics {
    fn family_mut(&mut self, kind: StatementKind) -> Option<&mut FamilyCount> {
        match kind {
            StatementKind::CreateTable => Some(&mut self.create_table),
            StatementKind::InsertInto => Some(&mut self.insert_into),
            StatementKind::Select | StatementKind::SetOperationSelect => Some(&mut self.select),
            _ => None,
        }
    }

    pub fn record_read(&mut self, kind: StatementKind) {
        if let Some(family) = self.family_mut(kind) {
            family.read += 1;
        }
    }

    pub fn record_executed(&mut self, kind: StatementKind) {
        if let Some(family) = self.family_mut(kind) {
            family.executed += 1;
        }
    }

    pub fn lines(&self) -> Vec<String> {
        [
            ("CREATE TABLE", self.create_table),
            ("INSERT INTO", self.insert_into),
            ("SELECT", self.select),
        ]
        .into_iter()
        .map(|(label, count)| format!("{}: {} read / {} executed", label, count.read, count.executed))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines() {
        let mut stats = Statistics::default();
        stats.record_read(StatementKind::CreateTable);
        stats.record_read(StatementKind::CreateTable);
        stats.record_executed(StatementKind::CreateTable);
        stats.record_read(StatementKind::SetOperationSelect);
        stats.record_read(StatementKind::Select);
        stats.record_executed(StatementKind::Select);
        stats.record_read(StatementKind::DropTable);

        assert_eq!(
            stats.lines(),
            vec![
                "CREATE TABLE: 2 read / 1 executed",
                "INSERT INTO: 0 read / 0 executed",
                "SELECT: 2 read / 1 executed",
            ]
        );
    }
}
