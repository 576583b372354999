//! FIFO compliance: was a container released while an older container of the
//! same group was still sitting in the depot?

use crate::analysis::columns::Columns;
use crate::analysis::values::{percentage, record_datetime, require_columns, round_to};
use crate::domain::model::{number_value, Record, ReportOutput, Table};
use crate::domain::ports::Report;
use crate::utils::error::{DepotError, Result};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

pub const STATUS_COLUMN: &str = "FIFO Status";
pub const REASON_COLUMN: &str = "FIFO Break Reason";
/// Worksheet read from workbook inputs unless `--sheet` names another.
pub const FIFO_SHEET: &str = "DRY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FifoStatus {
    InDepot,
    Compliant,
    Breach,
}

impl FifoStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FifoStatus::InDepot => "In Depot",
            FifoStatus::Compliant => "Yes",
            FifoStatus::Breach => "No",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FifoVerdict {
    pub status: FifoStatus,
    pub reason: String,
}

/// One depot visit. A `None` group component never matches another visit.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub group: Vec<Option<String>>,
    pub in_date: NaiveDateTime,
    pub out_date: Option<NaiveDateTime>,
}

impl Movement {
    fn comparable_key(&self) -> Option<Vec<&str>> {
        self.group.iter().map(|part| part.as_deref()).collect()
    }
}

/// Same verdicts as comparing every released visit against every in-depot
/// visit of its group, via the earliest in-depot IN DATE per group.
pub fn assess_movements(movements: &[Movement]) -> Vec<FifoVerdict> {
    let mut oldest_in_depot: HashMap<Vec<&str>, NaiveDateTime> = HashMap::new();
    for movement in movements.iter().filter(|m| m.out_date.is_none()) {
        if let Some(key) = movement.comparable_key() {
            oldest_in_depot
                .entry(key)
                .and_modify(|oldest| {
                    if movement.in_date < *oldest {
                        *oldest = movement.in_date;
                    }
                })
                .or_insert(movement.in_date);
        }
    }

    movements
        .iter()
        .map(|movement| {
            if movement.out_date.is_none() {
                return FifoVerdict {
                    status: FifoStatus::InDepot,
                    reason: "Still in depot".to_string(),
                };
            }

            let older_still_inside = movement
                .comparable_key()
                .and_then(|key| oldest_in_depot.get(&key))
                .is_some_and(|oldest| *oldest < movement.in_date);

            if older_still_inside {
                FifoVerdict {
                    status: FifoStatus::Breach,
                    reason: format!(
                        "Older box still in depot (IN < {})",
                        movement.in_date.date().format("%Y-%m-%d")
                    ),
                }
            } else {
                FifoVerdict {
                    status: FifoStatus::Compliant,
                    reason: "Released in FIFO order".to_string(),
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSummary {
    pub key: Vec<String>,
    pub in_depot: usize,
    pub breaches: usize,
    pub compliant: usize,
}

impl GroupSummary {
    pub fn total_released(&self) -> usize {
        self.compliant + self.breaches
    }

    pub fn fifo_pct(&self) -> f64 {
        round_to(percentage(self.compliant, self.total_released()), 2)
    }

    fn count(&mut self, status: FifoStatus) {
        match status {
            FifoStatus::InDepot => self.in_depot += 1,
            FifoStatus::Compliant => self.compliant += 1,
            FifoStatus::Breach => self.breaches += 1,
        }
    }
}

/// Per-group counts, best compliance first. Blank keys form their own group.
pub fn summarize(movements: &[Movement], verdicts: &[FifoVerdict]) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<Vec<String>, GroupSummary> = BTreeMap::new();
    for (movement, verdict) in movements.iter().zip(verdicts) {
        let key: Vec<String> = movement
            .group
            .iter()
            .map(|part| part.clone().unwrap_or_default())
            .collect();
        groups
            .entry(key.clone())
            .or_insert_with(|| GroupSummary {
                key,
                ..Default::default()
            })
            .count(verdict.status);
    }

    let mut summaries: Vec<GroupSummary> = groups.into_values().collect();
    summaries.sort_by(|a, b| b.fifo_pct().total_cmp(&a.fifo_pct()));
    summaries
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FifoTotals {
    pub containers: usize,
    pub released: usize,
    pub in_depot: usize,
    pub overall_pct: f64,
}

pub fn totals(summaries: &[GroupSummary]) -> FifoTotals {
    let compliant: usize = summaries.iter().map(|s| s.compliant).sum();
    let breaches: usize = summaries.iter().map(|s| s.breaches).sum();
    let in_depot: usize = summaries.iter().map(|s| s.in_depot).sum();
    let released = compliant + breaches;

    FifoTotals {
        containers: released + in_depot,
        released,
        in_depot,
        overall_pct: round_to(compliant as f64 / released.max(1) as f64 * 100.0, 2),
    }
}

pub struct FifoReport {
    pub input: String,
    pub group_by: Vec<String>,
    pub columns: Columns,
}

impl FifoReport {
    pub fn new(input: &str, group_by: Vec<String>, columns: Columns) -> Self {
        let group_by = if group_by.is_empty() {
            vec![columns.pol_agent.clone()]
        } else {
            group_by
        };
        Self {
            input: input.to_string(),
            group_by,
            columns,
        }
    }

    fn movement(&self, record: &Record) -> Option<Movement> {
        Some(Movement {
            group: self.group_by.iter().map(|c| record.text(c)).collect(),
            in_date: record_datetime(record, &self.columns.in_date)?,
            out_date: record_datetime(record, &self.columns.out_date),
        })
    }

    pub fn analyse(&self, table: &Table) -> Result<ReportOutput> {
        let mut required = vec![
            self.columns.container.as_str(),
            self.columns.in_date.as_str(),
            self.columns.out_date.as_str(),
        ];
        required.extend(self.group_by.iter().map(String::as_str));
        require_columns(table, &required, &self.input)?;

        let mut kept: Vec<&Record> = Vec::with_capacity(table.len());
        let mut movements = Vec::with_capacity(table.len());
        for record in &table.rows {
            if let Some(movement) = self.movement(record) {
                kept.push(record);
                movements.push(movement);
            }
        }
        let dropped = table.len() - kept.len();
        if dropped > 0 {
            tracing::warn!("Dropped {} rows without a valid {}", dropped, self.columns.in_date);
        }

        let verdicts = assess_movements(&movements);
        tracing::debug!("Assessed {} container movements", verdicts.len());

        let mut status_table = Table::new(table.columns.clone());
        status_table.add_column(STATUS_COLUMN);
        status_table.add_column(REASON_COLUMN);
        let mut exceptions = Table::new(status_table.columns.clone());

        for (record, verdict) in kept.iter().zip(&verdicts) {
            let row = (*record)
                .clone()
                .with(STATUS_COLUMN, verdict.status.label())
                .with(REASON_COLUMN, verdict.reason.as_str());
            if verdict.status == FifoStatus::Breach {
                exceptions.push(row.clone());
            }
            status_table.push(row);
        }

        let summaries = summarize(&movements, &verdicts);
        let totals = totals(&summaries);

        let mut summary_table = Table::new(self.group_by.clone());
        for column in ["In Depot", "No", "Yes", "Total Released", "FIFO %"] {
            summary_table.add_column(column);
        }
        for summary in &summaries {
            let mut record = Record::new();
            for (column, value) in self.group_by.iter().zip(&summary.key) {
                record.set(column, value.as_str());
            }
            record.set("In Depot", summary.in_depot);
            record.set("No", summary.breaches);
            record.set("Yes", summary.compliant);
            record.set("Total Released", summary.total_released());
            record.set("FIFO %", number_value(summary.fifo_pct()));
            summary_table.push(record);
        }

        let mut output = ReportOutput::new("fifo");
        output.metric("Total Containers", totals.containers);
        output.metric("Released", totals.released);
        output.metric("In Depot", totals.in_depot);
        output.metric("Overall FIFO %", format!("{}%", totals.overall_pct));
        output.table(
            "fifo_summary",
            &format!("{} wise FIFO Compliance", self.group_by.join(" / ")),
            summary_table,
        );
        output.table("fifo_exceptions", "Containers that Broke FIFO", exceptions);
        output.table("fifo_status", "Raw Data (with FIFO Status)", status_table);
        if dropped > 0 {
            output.note(format!(
                "{} rows skipped: {} missing or unreadable",
                dropped, self.columns.in_date
            ));
        }

        Ok(output)
    }
}

impl Report for FifoReport {
    fn name(&self) -> &str {
        "fifo"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn build(&self, tables: Vec<Table>) -> Result<ReportOutput> {
        let table = tables
            .first()
            .ok_or_else(|| DepotError::processing("FIFO report needs one input table"))?;
        self.analyse(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn movement(agent: Option<&str>, in_day: u32, out_day: Option<u32>) -> Movement {
        Movement {
            group: vec![agent.map(str::to_string)],
            in_date: day(in_day),
            out_date: out_day.map(day),
        }
    }

    fn composite(
        agent: Option<&str>,
        port: Option<&str>,
        in_day: u32,
        out_day: Option<u32>,
    ) -> Movement {
        Movement {
            group: vec![agent.map(str::to_string), port.map(str::to_string)],
            in_date: day(in_day),
            out_date: out_day.map(day),
        }
    }

    // Reference all-pairs check the grouped version must agree with.
    fn assess_pairwise(movements: &[Movement]) -> Vec<FifoStatus> {
        movements
            .iter()
            .map(|row| {
                if row.out_date.is_none() {
                    return FifoStatus::InDepot;
                }
                let breach = movements.iter().any(|other| {
                    let same_group = row
                        .group
                        .iter()
                        .zip(&other.group)
                        .all(|(a, b)| a.is_some() && a == b);
                    same_group && other.in_date < row.in_date && other.out_date.is_none()
                });
                if breach {
                    FifoStatus::Breach
                } else {
                    FifoStatus::Compliant
                }
            })
            .collect()
    }

    #[test]
    fn test_release_before_older_box_breaks_fifo() {
        let movements = vec![
            movement(Some("ACME"), 1, None),
            movement(Some("ACME"), 3, Some(10)),
            movement(Some("ACME"), 1, Some(4)),
        ];
        let verdicts = assess_movements(&movements);

        assert_eq!(verdicts[0].status, FifoStatus::InDepot);
        assert_eq!(verdicts[0].reason, "Still in depot");
        assert_eq!(verdicts[1].status, FifoStatus::Breach);
        assert_eq!(verdicts[1].reason, "Older box still in depot (IN < 2025-05-03)");
        // Same IN DATE is not older.
        assert_eq!(verdicts[2].status, FifoStatus::Compliant);
        assert_eq!(verdicts[2].reason, "Released in FIFO order");
    }

    #[test]
    fn test_other_groups_do_not_interfere() {
        let movements = vec![
            movement(Some("ACME"), 1, None),
            movement(Some("MSC"), 5, Some(6)),
        ];
        let verdicts = assess_movements(&movements);
        assert_eq!(verdicts[1].status, FifoStatus::Compliant);
    }

    #[test]
    fn test_blank_group_never_matches() {
        let movements = vec![movement(None, 1, None), movement(None, 5, Some(6))];
        let verdicts = assess_movements(&movements);
        assert_eq!(verdicts[0].status, FifoStatus::InDepot);
        assert_eq!(verdicts[1].status, FifoStatus::Compliant);
    }

    #[test]
    fn test_grouped_check_matches_pairwise_reference() {
        let agents = [Some("A"), Some("B"), None];
        let mut movements = Vec::new();
        for i in 0..60u32 {
            let agent = agents[(i % 3) as usize];
            let in_day = 1 + (i * 7) % 20;
            let out_day = if i % 4 == 0 { None } else { Some(in_day + 1 + i % 5) };
            movements.push(movement(agent, in_day, out_day));
        }

        let grouped: Vec<FifoStatus> = assess_movements(&movements)
            .into_iter()
            .map(|v| v.status)
            .collect();
        assert_eq!(grouped, assess_pairwise(&movements));
    }

    #[test]
    fn test_summary_sorted_by_compliance() {
        let movements = vec![
            movement(Some("E"), 4, Some(5)),
            movement(Some("A"), 1, None),
            movement(Some("A"), 2, Some(3)),
            movement(Some("B"), 2, Some(3)),
            movement(Some("C"), 2, None),
            movement(Some("D"), 6, Some(7)),
        ];
        let verdicts = assess_movements(&movements);
        let summaries = summarize(&movements, &verdicts);

        // Equal FIFO % keeps the keys in ascending order.
        let keys: Vec<&str> = summaries.iter().map(|s| s.key[0].as_str()).collect();
        assert_eq!(keys, vec!["B", "D", "E", "A", "C"]);
        assert!(summaries[..3].iter().all(|s| s.fifo_pct() == 100.0));
        assert_eq!(summaries[3].breaches, 1);
        assert_eq!(summaries[4].total_released(), 0);
        assert_eq!(summaries[4].fifo_pct(), 0.0);

        let totals = totals(&summaries);
        assert_eq!(totals.containers, 6);
        assert_eq!(totals.released, 4);
        assert_eq!(totals.in_depot, 2);
        assert_eq!(totals.overall_pct, 75.0);
    }

    #[test]
    fn test_composite_key_separates_ports() {
        let movements = vec![
            composite(Some("A"), Some("P1"), 1, None),
            composite(Some("A"), Some("P2"), 5, Some(6)),
            composite(Some("A"), Some("P1"), 3, Some(4)),
            composite(Some("A"), None, 1, None),
            composite(Some("A"), None, 5, Some(6)),
        ];
        let statuses: Vec<FifoStatus> = assess_movements(&movements)
            .into_iter()
            .map(|v| v.status)
            .collect();

        assert_eq!(
            statuses,
            vec![
                FifoStatus::InDepot,
                FifoStatus::Compliant,
                FifoStatus::Breach,
                FifoStatus::InDepot,
                FifoStatus::Compliant,
            ]
        );

        let verdicts = assess_movements(&movements);
        let summaries = summarize(&movements, &verdicts);
        let blank_port = summaries
            .iter()
            .find(|s| s.key == vec!["A".to_string(), String::new()])
            .unwrap();
        assert_eq!(blank_port.in_depot, 1);
        assert_eq!(blank_port.compliant, 1);
        assert_eq!(summaries.len(), 3);
    }

    #[test]
    fn test_composite_check_matches_pairwise_reference() {
        let agents = [Some("A"), Some("B"), None];
        let ports = [Some("P1"), Some("P2"), None];
        let mut movements = Vec::new();
        for i in 0..90u32 {
            let agent = agents[(i % 3) as usize];
            let port = ports[((i / 3) % 3) as usize];
            let in_day = 1 + (i * 11) % 20;
            let out_day = if i % 5 == 0 { None } else { Some(in_day + 1 + i % 6) };
            movements.push(composite(agent, port, in_day, out_day));
        }

        let grouped: Vec<FifoStatus> = assess_movements(&movements)
            .into_iter()
            .map(|v| v.status)
            .collect();
        assert_eq!(grouped, assess_pairwise(&movements));
        assert!(grouped.contains(&FifoStatus::Breach));
    }

    #[test]
    fn test_report_tables_and_dropped_rows() {
        let mut table = Table::from_columns(&["Container #", "POL Agent", "IN DATE", "OUT DATE"]);
        table.push(
            Record::new()
                .with("Container #", "TRLU1")
                .with("POL Agent", "ACME")
                .with("IN DATE", "2025-05-01"),
        );
        table.push(
            Record::new()
                .with("Container #", "TRLU2")
                .with("POL Agent", "ACME")
                .with("IN DATE", "2025-05-02")
                .with("OUT DATE", "2025-05-03"),
        );
        table.push(
            Record::new()
                .with("Container #", "TRLU3")
                .with("POL Agent", "ACME")
                .with("IN DATE", "garbage"),
        );

        let report = FifoReport::new("myt.csv", vec![], Columns::default());
        let output = report.analyse(&table).unwrap();

        assert_eq!(output.find_metric("Total Containers"), Some("2"));
        assert_eq!(output.find_metric("Overall FIFO %"), Some("0%"));
        assert_eq!(output.notes.len(), 1);

        let exceptions = output.find_table("fifo_exceptions").unwrap();
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions.rows[0].text("Container #").as_deref(), Some("TRLU2"));

        let status = output.find_table("fifo_status").unwrap();
        assert_eq!(status.columns.last().map(String::as_str), Some(REASON_COLUMN));
        assert_eq!(status.rows[0].text(STATUS_COLUMN).as_deref(), Some("In Depot"));
    }

    #[test]
    fn test_missing_group_column_is_reported() {
        let table = Table::from_columns(&["Container #", "IN DATE", "OUT DATE"]);
        let report = FifoReport::new("myt.csv", vec!["POL Port".to_string()], Columns::default());
        let err = report.analyse(&table).unwrap_err();
        assert!(err.to_string().contains("POL Port"));
    }
}
