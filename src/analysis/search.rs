use crate::analysis::columns::Columns;
use crate::analysis::values::require_columns;
use crate::domain::model::{Record, ReportOutput, Table};
use crate::domain::ports::Report;
use crate::utils::error::{DepotError, Result};
use std::collections::HashSet;

/// Splits pasted container numbers on commas and whitespace, upper-cased,
/// first occurrence kept.
pub fn parse_container_list(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .map(|part| part.trim().to_uppercase())
        .filter(|part| !part.is_empty())
        .filter(|part| seen.insert(part.clone()))
        .collect()
}

pub struct ContainerSearch {
    pub input: String,
    pub containers: Vec<String>,
    pub columns: Columns,
}

impl ContainerSearch {
    pub fn new(input: &str, raw_list: &str, columns: Columns) -> Self {
        Self {
            input: input.to_string(),
            containers: parse_container_list(raw_list),
            columns,
        }
    }

    pub fn analyse(&self, table: &Table) -> Result<ReportOutput> {
        let c = &self.columns;
        require_columns(
            table,
            &[c.company.as_str(), c.container.as_str()],
            &self.input,
        )?;

        let wanted: HashSet<&str> = self.containers.iter().map(String::as_str).collect();
        let mut found_numbers: HashSet<String> = HashSet::new();
        let mut found = Table::from_columns(&[c.company.as_str(), c.container.as_str()]);

        for record in &table.rows {
            let Some(number) = record.text(&c.container).map(|n| n.to_uppercase()) else {
                continue;
            };
            if !wanted.contains(number.as_str()) {
                continue;
            }
            found.push(
                Record::new()
                    .with(&c.company, record.get(&c.company).cloned().unwrap_or_default())
                    .with(&c.container, record.get(&c.container).cloned().unwrap_or_default()),
            );
            found_numbers.insert(number);
        }

        let missing: Vec<&str> = self
            .containers
            .iter()
            .map(String::as_str)
            .filter(|n| !found_numbers.contains(*n))
            .collect();

        let mut output = ReportOutput::new("search");
        output.metric("Searched", self.containers.len());
        output.metric("Found", found.len());
        if found.is_empty() {
            output.note("No matching containers found.");
        } else {
            output.note(format!("{} container(s) found.", found.len()));
        }
        if !missing.is_empty() {
            output.note(format!("Not found: {}", missing.join(", ")));
        }
        output.table("container_search", "Container Search", found);

        Ok(output)
    }
}

impl Report for ContainerSearch {
    fn name(&self) -> &str {
        "search"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn build(&self, tables: Vec<Table>) -> Result<ReportOutput> {
        let table = tables
            .first()
            .ok_or_else(|| DepotError::processing("Container search needs one input table"))?;
        self.analyse(table)
    }
}
