use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.data.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    /// Non-blank trimmed text. Numbers are rendered, nulls are `None`.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.data.get(column)? {
            Value::Null => None,
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            other => Some(cell_text(other)),
        }
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        match self.data.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }
}

/// Column-ordered rows as loaded from a spreadsheet export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_columns(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    /// Appends a column name unless it is already present.
    pub fn add_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Cells of one row in column order, as display text.
    pub fn row_cells(&self, record: &Record) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| record.get(c).map(cell_text).unwrap_or_default())
            .collect()
    }
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Float cell, `Null` when not finite.
pub fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: &str, value: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTable {
    pub file_stem: String,
    pub title: String,
    pub table: Table,
}

impl NamedTable {
    pub fn new(file_stem: &str, title: &str, table: Table) -> Self {
        Self {
            file_stem: file_stem.to_string(),
            title: title.to_string(),
            table,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportOutput {
    pub name: String,
    pub metrics: Vec<Metric>,
    pub tables: Vec<NamedTable>,
    pub notes: Vec<String>,
}

impl ReportOutput {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn metric(&mut self, label: &str, value: impl ToString) {
        self.metrics.push(Metric::new(label, value));
    }

    pub fn table(&mut self, file_stem: &str, title: &str, table: Table) {
        self.tables.push(NamedTable::new(file_stem, title, table));
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn find_table(&self, file_stem: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.file_stem == file_stem)
            .map(|t| &t.table)
    }

    pub fn find_metric(&self, label: &str) -> Option<&str> {
        self.metrics
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_text_trims_and_skips_blank() {
        let record = Record::new()
            .with("Agent", "  ACME ")
            .with("Blank", "   ")
            .with("Null", Value::Null)
            .with("Count", 3);

        assert_eq!(record.text("Agent").as_deref(), Some("ACME"));
        assert_eq!(record.text("Blank"), None);
        assert_eq!(record.text("Null"), None);
        assert_eq!(record.text("Count").as_deref(), Some("3"));
        assert_eq!(record.text("Missing"), None);
    }

    #[test]
    fn test_record_number_parses_strings() {
        let record = Record::new()
            .with("Ageing", " 12.5 ")
            .with("Thousands", "1,200")
            .with("Bad", "n/a")
            .with("Native", 7);

        assert_eq!(record.number("Ageing"), Some(12.5));
        assert_eq!(record.number("Thousands"), Some(1200.0));
        assert_eq!(record.number("Bad"), None);
        assert_eq!(record.number("Native"), Some(7.0));
    }

    #[test]
    fn test_row_cells_follow_column_order() {
        let mut table = Table::from_columns(&["b", "a"]);
        table.push(Record::new().with("a", 1).with("b", "x"));

        assert_eq!(table.row_cells(&table.rows[0]), vec!["x", "1"]);
    }

    #[test]
    fn test_number_value_rejects_nan() {
        assert_eq!(number_value(f64::NAN), Value::Null);
        assert_eq!(cell_text(&number_value(2.5)), "2.5");
    }
}
