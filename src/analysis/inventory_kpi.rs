//! Delay-based inventory KPIs: how long after the physical activity was it
//! keyed into the system, classified and broken down by the port mapping.

use crate::analysis::columns::Columns;
use crate::analysis::values::{
    floor_days, matches_any, mean, percentage, record_datetime, require_columns, round_to,
};
use crate::domain::model::{number_value, Record, ReportOutput, Table};
use crate::domain::ports::Report;
use crate::utils::error::{DepotError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub const DELAY_COLUMN: &str = "Delay (Days)";
pub const PERFORMANCE_COLUMN: &str = "Performance";
pub const MONTH_COLUMN: &str = "Month";
pub const WEEK_COLUMN: &str = "Week";
pub const DATE_COLUMN: &str = "Date";
const DAILY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Performance {
    Excellent,
    Good,
    Average,
    NeedImprovement,
    Missing,
}

impl Performance {
    pub const ALL: [Performance; 5] = [
        Performance::Excellent,
        Performance::Good,
        Performance::Average,
        Performance::NeedImprovement,
        Performance::Missing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Performance::Excellent => "Excellent",
            Performance::Good => "Good",
            Performance::Average => "Average",
            Performance::NeedImprovement => "Need Improvement",
            Performance::Missing => "Missing",
        }
    }
}

/// Delay bands: `<= excellent_max`, `< good_below`, `< average_below`, rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiThresholds {
    pub excellent_max: f64,
    pub good_below: f64,
    pub average_below: f64,
}

impl Default for KpiThresholds {
    fn default() -> Self {
        Self {
            excellent_max: 2.0,
            good_below: 3.0,
            average_below: 4.0,
        }
    }
}

impl KpiThresholds {
    pub fn classify(&self, delay: Option<i64>) -> Performance {
        let Some(delay) = delay else {
            return Performance::Missing;
        };
        let delay = delay as f64;
        if delay <= self.excellent_max {
            Performance::Excellent
        } else if delay < self.good_below {
            Performance::Good
        } else if delay < self.average_below {
            Performance::Average
        } else {
            Performance::NeedImprovement
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiFilters {
    pub regions: Vec<String>,
    pub leads: Vec<String>,
    pub subordinates: Vec<String>,
    pub ports: Vec<String>,
}

#[derive(Debug, Clone)]
struct Scored {
    record: Record,
    delay: Option<i64>,
    performance: Performance,
    activity_date: Option<NaiveDateTime>,
}

pub struct InventoryKpiReport {
    pub activity_input: String,
    pub mapping_input: String,
    pub filters: KpiFilters,
    pub thresholds: KpiThresholds,
    pub columns: Columns,
}

impl InventoryKpiReport {
    fn mapping_columns(&self) -> [&str; 3] {
        [
            self.columns.region.as_str(),
            self.columns.lead.as_str(),
            self.columns.subordinate.as_str(),
        ]
    }

    /// Scores every activity row and left-joins the port mapping onto it.
    fn merge(&self, activity: &Table, mapping: &Table) -> (Table, Vec<Scored>) {
        let c = &self.columns;

        let mut by_port: HashMap<String, Vec<&Record>> = HashMap::new();
        for record in &mapping.rows {
            if let Some(port) = record.text(&c.pol_port) {
                by_port.entry(port).or_default().push(record);
            }
        }

        let mut merged = Table::new(activity.columns.clone());
        merged.add_column(DELAY_COLUMN);
        merged.add_column(PERFORMANCE_COLUMN);
        let joined: Vec<&String> = mapping
            .columns
            .iter()
            .filter(|col| **col != c.pol_port && !activity.has_column(col))
            .collect();
        for column in &joined {
            merged.add_column(column);
        }
        merged.add_column(MONTH_COLUMN);
        merged.add_column(WEEK_COLUMN);
        merged.add_column(DATE_COLUMN);

        let mut scored = Vec::with_capacity(activity.len());
        for record in &activity.rows {
            let activity_date = record_datetime(record, &c.activity_date);
            let system_date = record_datetime(record, &c.system_date);
            let delay = activity_date
                .zip(system_date)
                .map(|(activity, system)| floor_days(activity, system));
            let performance = self.thresholds.classify(delay);

            let mut base = record
                .clone()
                .with(DELAY_COLUMN, delay.map(Value::from).unwrap_or_default())
                .with(PERFORMANCE_COLUMN, performance.label());
            let (month, week, date) = match activity_date {
                Some(at) => (
                    Value::from(at.format("%Y-%m").to_string()),
                    Value::from(at.format("%G-W%V").to_string()),
                    Value::from(at.format("%Y-%m-%d").to_string()),
                ),
                None => (Value::Null, Value::Null, Value::Null),
            };
            base.set(MONTH_COLUMN, month);
            base.set(WEEK_COLUMN, week);
            base.set(DATE_COLUMN, date);

            let matches = record
                .text(&c.pol_port)
                .and_then(|port| by_port.get(&port))
                .filter(|rows| !rows.is_empty());

            let rows: Vec<Record> = match matches {
                Some(mapping_rows) => mapping_rows
                    .iter()
                    .map(|mapping_row| {
                        let mut row = base.clone();
                        for column in &joined {
                            row.set(column, mapping_row.get(column).cloned().unwrap_or_default());
                        }
                        row
                    })
                    .collect(),
                None => {
                    let mut row = base;
                    for column in &joined {
                        row.set(column, Value::Null);
                    }
                    vec![row]
                }
            };

            for row in rows {
                scored.push(Scored {
                    record: row,
                    delay,
                    performance,
                    activity_date,
                });
            }
        }

        (merged, scored)
    }

    fn selected(&self, record: &Record) -> bool {
        let c = &self.columns;
        matches_any(record, &c.region, &self.filters.regions)
            && matches_any(record, &c.lead, &self.filters.leads)
            && matches_any(record, &c.subordinate, &self.filters.subordinates)
            && matches_any(record, &c.pol_port, &self.filters.ports)
    }

    pub fn analyse(&self, activity: &Table, mapping: &Table) -> Result<ReportOutput> {
        let c = &self.columns;
        require_columns(
            activity,
            &[
                c.activity_date.as_str(),
                c.system_date.as_str(),
                c.pol_port.as_str(),
            ],
            &self.activity_input,
        )?;
        let mut mapping_required = vec![c.pol_port.as_str()];
        mapping_required.extend(self.mapping_columns());
        require_columns(mapping, &mapping_required, &self.mapping_input)?;

        let (mut merged, scored) = self.merge(activity, mapping);
        let filtered: Vec<&Scored> = scored.iter().filter(|s| self.selected(&s.record)).collect();
        tracing::info!(
            "Scored {} activities, {} after filters",
            scored.len(),
            filtered.len()
        );

        let mut output = ReportOutput::new("kpi");
        output.metric("Total Activities", filtered.len());
        for performance in Performance::ALL {
            let count = filtered
                .iter()
                .filter(|s| s.performance == performance)
                .count();
            output.metric(performance.label(), count);
        }

        for (stem, title, column) in [
            ("by_subordinate", "Breakdown by Subordinate", &c.subordinate),
            ("by_lead", "Breakdown by Lead", &c.lead),
            ("by_region", "Breakdown by Region", &c.region),
        ] {
            output.table(stem, title, breakdown(&filtered, column));
        }

        output.table(
            "monthly_performance",
            "Monthly Average Performance",
            period_shares(&filtered, MONTH_COLUMN, |at| at.format("%Y-%m").to_string()),
        );
        output.table(
            "weekly_performance",
            "Weekly Average Performance",
            period_shares(&filtered, WEEK_COLUMN, |at| at.format("%G-W%V").to_string()),
        );
        let mut daily = period_shares(&filtered, DATE_COLUMN, |at| {
            at.format("%Y-%m-%d").to_string()
        });
        let skip = daily.len().saturating_sub(DAILY_WINDOW);
        daily.rows = daily.rows.split_off(skip);
        output.table(
            "daily_performance",
            "Daily Average Performance (Last 10 Days)",
            daily,
        );

        merged.rows = filtered.iter().map(|s| s.record.clone()).collect();
        output.table(
            "filtered_inventory_kpis",
            "Detailed Activity Records",
            merged,
        );

        Ok(output)
    }
}

/// Activity count, average delay and class counts per value of `column`.
/// Rows with a blank key are left out.
fn breakdown(rows: &[&Scored], column: &str) -> Table {
    let mut groups: BTreeMap<String, Vec<&Scored>> = BTreeMap::new();
    for scored in rows {
        if let Some(key) = scored.record.text(column) {
            groups.entry(key).or_default().push(*scored);
        }
    }

    let mut table = Table::from_columns(&[column, "Total_Activities", "Average_Delay"]);
    for performance in Performance::ALL {
        table.add_column(performance.label());
    }

    for (key, members) in groups {
        let delays: Vec<f64> = members.iter().filter_map(|s| s.delay).map(|d| d as f64).collect();
        let mut record = Record::new()
            .with(column, key)
            .with("Total_Activities", delays.len())
            .with(
                "Average_Delay",
                mean(delays)
                    .map(|avg| number_value(round_to(avg, 2)))
                    .unwrap_or_default(),
            );
        for performance in Performance::ALL {
            let count = members
                .iter()
                .filter(|s| s.performance == performance)
                .count();
            record.set(performance.label(), count);
        }
        table.push(record);
    }

    table
}

/// Percentage of each class within each period, one decimal place.
fn period_shares(
    rows: &[&Scored],
    period_column: &str,
    period_of: impl Fn(NaiveDateTime) -> String,
) -> Table {
    let mut periods: BTreeMap<String, BTreeMap<Performance, usize>> = BTreeMap::new();
    for scored in rows {
        if let Some(at) = scored.activity_date {
            *periods
                .entry(period_of(at))
                .or_default()
                .entry(scored.performance)
                .or_insert(0) += 1;
        }
    }

    let mut table = Table::from_columns(&[period_column]);
    for performance in Performance::ALL {
        table.add_column(performance.label());
    }

    for (period, counts) in periods {
        let total: usize = counts.values().sum();
        let mut record = Record::new().with(period_column, period);
        for performance in Performance::ALL {
            let count = counts.get(&performance).copied().unwrap_or(0);
            record.set(
                performance.label(),
                number_value(round_to(percentage(count, total), 1)),
            );
        }
        table.push(record);
    }

    table
}

impl Report for InventoryKpiReport {
    fn name(&self) -> &str {
        "kpi"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.activity_input.clone(), self.mapping_input.clone()]
    }

    fn build(&self, tables: Vec<Table>) -> Result<ReportOutput> {
        match tables.as_slice() {
            [activity, mapping, ..] => self.analyse(activity, mapping),
            _ => Err(DepotError::processing(
                "Inventory KPIs need an activity table and a POL port mapping table",
            )),
        }
    }
}
