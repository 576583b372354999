//! Picks the POL agent(s) that should supply a requested number of empty
//! containers, preferring the longest-idle stock.

use crate::analysis::columns::Columns;
use crate::analysis::values::{matches_any, mean, require_columns, round_to};
use crate::domain::model::{number_value, Record, ReportOutput, Table};
use crate::domain::ports::Report;
use crate::utils::error::{DepotError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const EMPTY_MODE: &str = "Empty";

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRequest {
    pub port: String,
    pub size: String,
    pub quantity: usize,
    /// Allowed container types; empty allows all.
    pub types: Vec<String>,
}

/// Empty stock held by one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStock {
    pub agent: String,
    pub available: usize,
    ageing: Vec<Option<f64>>,
}

impl AgentStock {
    pub fn average_ageing(&self) -> Option<f64> {
        mean(self.ageing.iter().flatten().copied())
    }

    /// Mean ageing of the `quantity` oldest containers.
    pub fn oldest_average(&self, quantity: usize) -> Option<f64> {
        let mut sorted = self.ageing.clone();
        sorted.sort_by(|a, b| match (a, b) {
            (Some(a), Some(b)) => b.total_cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        mean(sorted.into_iter().take(quantity).flatten())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentShare {
    pub agent: String,
    pub available: usize,
    pub average_ageing: Option<f64>,
}

impl From<&AgentStock> for AgentShare {
    fn from(stock: &AgentStock) -> Self {
        Self {
            agent: stock.agent.clone(),
            available: stock.available,
            average_ageing: stock.average_ageing(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// One agent covers the whole quantity.
    Single(AgentShare),
    /// Several agents together cover the quantity.
    Combined(Vec<AgentShare>),
    /// Nobody can cover it; `shortlist` is what could be gathered.
    Unfulfilled { shortlist: Vec<AgentShare> },
}

impl Assignment {
    pub fn shares(&self) -> &[AgentShare] {
        match self {
            Assignment::Single(share) => std::slice::from_ref(share),
            Assignment::Combined(shares) => shares,
            Assignment::Unfulfilled { shortlist } => shortlist,
        }
    }
}

pub fn candidate_stock(
    table: &Table,
    request: &AssignmentRequest,
    columns: &Columns,
) -> Vec<AgentStock> {
    let mut agents: BTreeMap<String, AgentStock> = BTreeMap::new();
    let selected = table.rows.iter().filter(|record| {
        record.text(&columns.pol_port).as_deref() == Some(request.port.trim())
            && record.text(&columns.size).as_deref() == Some(request.size.trim())
            && record.text(&columns.activity_mode).as_deref() == Some(EMPTY_MODE)
            && matches_any(record, &columns.container_type, &request.types)
    });

    for record in selected {
        let Some(agent) = record.text(&columns.pol_agent) else {
            continue;
        };
        let stock = agents.entry(agent.clone()).or_insert_with(|| AgentStock {
            agent,
            available: 0,
            ageing: Vec::new(),
        });
        if record.text(&columns.container).is_some() {
            stock.available += 1;
        }
        stock.ageing.push(record.number(&columns.ageing_days));
    }

    agents.into_values().collect()
}

pub fn assign(stock: &[AgentStock], quantity: usize) -> Assignment {
    let suitable: Vec<&AgentStock> = stock.iter().filter(|s| s.available >= quantity).collect();

    if !suitable.is_empty() {
        let mut best: Option<&AgentStock> = None;
        let mut highest = 0.0;
        for candidate in suitable {
            if let Some(average) = candidate.oldest_average(quantity) {
                if average > highest {
                    highest = average;
                    best = Some(candidate);
                }
            }
        }
        return match best {
            Some(agent) => Assignment::Single(agent.into()),
            None => Assignment::Unfulfilled {
                shortlist: Vec::new(),
            },
        };
    }

    let mut by_availability: Vec<&AgentStock> = stock.iter().collect();
    by_availability.sort_by(|a, b| b.available.cmp(&a.available));

    let mut gathered = 0;
    let mut shortlist = Vec::new();
    for agent in by_availability {
        if gathered >= quantity {
            break;
        }
        gathered += agent.available;
        shortlist.push(AgentShare::from(agent));
    }

    if gathered >= quantity {
        Assignment::Combined(shortlist)
    } else {
        Assignment::Unfulfilled { shortlist }
    }
}

pub struct AssignmentReport {
    pub input: String,
    pub request: AssignmentRequest,
    pub columns: Columns,
}

impl AssignmentReport {
    pub fn analyse(&self, table: &Table) -> Result<ReportOutput> {
        let c = &self.columns;
        let mut required = vec![
            c.container.as_str(),
            c.pol_port.as_str(),
            c.pol_agent.as_str(),
            c.size.as_str(),
            c.activity_mode.as_str(),
            c.ageing_days.as_str(),
        ];
        if !self.request.types.is_empty() {
            required.push(&c.container_type);
        }
        require_columns(table, &required, &self.input)?;

        let stock = candidate_stock(table, &self.request, c);
        let assignment = assign(&stock, self.request.quantity);
        tracing::debug!(
            "{} agents hold matching empty stock; outcome: {:?}",
            stock.len(),
            assignment
        );

        let mut output = ReportOutput::new("assign");
        output.metric("Requested", self.request.quantity);
        output.metric(
            "Available",
            stock.iter().map(|s| s.available).sum::<usize>(),
        );

        match &assignment {
            Assignment::Single(share) => {
                output.metric("Assigned Agent", &share.agent);
                output.note(format!(
                    "Assigned Agent: {} - Available Containers: {}",
                    share.agent, share.available
                ));
            }
            Assignment::Combined(shares) => {
                output.metric("Assigned Agents", shares.len());
                output.note("The following agents can collectively fulfill the request:");
                for share in shares {
                    output.note(format!(
                        "{} - Average Aging: {} Days",
                        share.agent,
                        share
                            .average_ageing
                            .map(|a| format!("{:.2}", a))
                            .unwrap_or_else(|| "n/a".to_string())
                    ));
                }
            }
            Assignment::Unfulfilled { .. } => {
                output.metric("Assigned Agents", 0);
                if stock.is_empty() {
                    output.note("No containers available for the selected port, size, and type.");
                } else {
                    output.note("No agent has sufficient containers to fulfill the request.");
                }
            }
        }

        let shares = assignment.shares();
        if !shares.is_empty() {
            let mut report = Table::from_columns(&[
                "Agent Name",
                "Available Containers",
                "Average Aging",
            ]);
            for share in shares {
                report.push(
                    Record::new()
                        .with("Agent Name", share.agent.as_str())
                        .with("Available Containers", share.available)
                        .with(
                            "Average Aging",
                            share
                                .average_ageing
                                .map(|a| number_value(round_to(a, 2)))
                                .unwrap_or_default(),
                        ),
                );
            }
            output.table("agent_report", "Agent Assignment", report);
        }

        Ok(output)
    }
}

impl Report for AssignmentReport {
    fn name(&self) -> &str {
        "assign"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn build(&self, tables: Vec<Table>) -> Result<ReportOutput> {
        let table = tables
            .first()
            .ok_or_else(|| DepotError::processing("Agent assignment needs one input table"))?;
        self.analyse(table)
    }
}
