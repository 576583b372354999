use crate::domain::model::{Record, Table};
use std::collections::{BTreeMap, BTreeSet};

pub const GRAND_TOTAL: &str = "Grand Total";

/// Count pivot: rows × columns, labels sorted, zeros filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotCount {
    counts: BTreeMap<String, BTreeMap<String, u64>>,
    column_labels: BTreeSet<String>,
}

impl PivotCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, row: &str, column: &str) {
        *self
            .counts
            .entry(row.to_string())
            .or_default()
            .entry(column.to_string())
            .or_insert(0) += 1;
        self.column_labels.insert(column.to_string());
    }

    pub fn total(&self) -> u64 {
        self.counts.values().flat_map(|cols| cols.values()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Renders the pivot with a trailing `Grand Total` column and row.
    pub fn to_table(&self, index_name: &str) -> Table {
        let mut columns = vec![index_name.to_string()];
        columns.extend(self.column_labels.iter().cloned());
        columns.push(GRAND_TOTAL.to_string());
        let mut table = Table::new(columns);

        let mut column_totals: BTreeMap<&str, u64> = BTreeMap::new();
        for (row_label, cols) in &self.counts {
            let mut record = Record::new().with(index_name, row_label.as_str());
            let mut row_total = 0;
            for label in &self.column_labels {
                let count = cols.get(label).copied().unwrap_or(0);
                *column_totals.entry(label.as_str()).or_insert(0) += count;
                row_total += count;
                record.set(label, count);
            }
            record.set(GRAND_TOTAL, row_total);
            table.push(record);
        }

        let mut totals = Record::new().with(index_name, GRAND_TOTAL);
        for label in &self.column_labels {
            totals.set(label, column_totals.get(label.as_str()).copied().unwrap_or(0));
        }
        totals.set(GRAND_TOTAL, self.total());
        table.push(totals);

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pivot_with_grand_totals() {
        let mut pivot = PivotCount::new();
        pivot.add("MSC", "40'");
        pivot.add("MSC", "20'");
        pivot.add("MSC", "40'");
        pivot.add("ACME", "20'");

        let table = pivot.to_table("POL Agent");
        assert_eq!(table.columns, vec!["POL Agent", "20'", "40'", "Grand Total"]);
        assert_eq!(table.len(), 3);

        let cells: Vec<Vec<String>> = table.rows.iter().map(|r| table.row_cells(r)).collect();
        assert_eq!(cells[0], vec!["ACME", "1", "0", "1"]);
        assert_eq!(cells[1], vec!["MSC", "1", "2", "3"]);
        assert_eq!(cells[2], vec!["Grand Total", "2", "2", "4"]);
    }

    #[test]
    fn test_empty_pivot_has_only_total_row() {
        let table = PivotCount::new().to_table("POL Agent");
        assert_eq!(table.columns, vec!["POL Agent", "Grand Total"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.row_cells(&table.rows[0]), vec!["Grand Total", "0"]);
    }
}
