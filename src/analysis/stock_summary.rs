use crate::analysis::columns::Columns;
use crate::analysis::pivot::PivotCount;
use crate::analysis::values::{matches_any, matches_selection, require_columns};
use crate::domain::model::{Record, ReportOutput, Table};
use crate::domain::ports::Report;
use crate::utils::error::{DepotError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockFilters {
    pub region: Option<String>,
    pub port: Option<String>,
    pub activity_mode: Option<String>,
    /// Container types to keep; empty keeps all.
    pub types: Vec<String>,
}

pub struct StockSummaryReport {
    pub input: String,
    pub filters: StockFilters,
    pub columns: Columns,
}

impl StockSummaryReport {
    fn selected(&self, record: &Record) -> bool {
        let c = &self.columns;
        matches_selection(record, &c.region_name, self.filters.region.as_deref())
            && matches_selection(record, &c.pol_port, self.filters.port.as_deref())
            && matches_selection(record, &c.activity_mode, self.filters.activity_mode.as_deref())
            && matches_any(record, &c.container_type, &self.filters.types)
    }

    fn required_columns(&self) -> Vec<&str> {
        let c = &self.columns;
        let mut required = vec![c.container.as_str(), c.pol_agent.as_str(), c.size.as_str()];
        if self.filters.region.is_some() {
            required.push(&c.region_name);
        }
        if self.filters.port.is_some() {
            required.push(&c.pol_port);
        }
        if self.filters.activity_mode.is_some() {
            required.push(&c.activity_mode);
        }
        if !self.filters.types.is_empty() {
            required.push(&c.container_type);
        }
        required
    }

    pub fn analyse(&self, table: &Table) -> Result<ReportOutput> {
        require_columns(table, &self.required_columns(), &self.input)?;

        let mut pivot = PivotCount::new();
        let mut matched = 0usize;
        for record in table.rows.iter().filter(|r| self.selected(r)) {
            matched += 1;
            // Pivot counts rows with a container number, agent and size.
            if record.text(&self.columns.container).is_none() {
                continue;
            }
            let (Some(agent), Some(size)) = (
                record.text(&self.columns.pol_agent),
                record.text(&self.columns.size),
            ) else {
                continue;
            };
            pivot.add(&agent, &size);
        }
        tracing::debug!("{} of {} rows match the selection", matched, table.len());

        let mut output = ReportOutput::new("summary");
        output.metric("Matching Rows", matched);
        output.metric("Containers", pivot.total());
        if pivot.is_empty() {
            output.note("No containers match the selected region, port, mode and type.");
        }
        output.table(
            "container_summary",
            "Container Summary",
            pivot.to_table(&self.columns.pol_agent),
        );

        Ok(output)
    }
}

impl Report for StockSummaryReport {
    fn name(&self) -> &str {
        "summary"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn build(&self, tables: Vec<Table>) -> Result<ReportOutput> {
        let table = tables
            .first()
            .ok_or_else(|| DepotError::processing("Container summary needs one input table"))?;
        self.analyse(table)
    }
}
