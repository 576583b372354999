use crate::analysis::columns::Columns;
use crate::analysis::values::{floor_days, format_datetime, parse_datetime, require_columns};
use crate::domain::model::{Record, ReportOutput, Table};
use crate::domain::ports::Report;
use crate::utils::error::{DepotError, Result};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_ORIGIN: &str = "NOVOROSSIYSK";

#[derive(Debug, Clone, PartialEq)]
pub struct Voyage {
    pub vessel: String,
    pub from: String,
    pub to: String,
    pub departure: Option<NaiveDateTime>,
    pub arrival: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoyageFilters {
    /// Vessels to keep; empty keeps all.
    pub vessels: Vec<String>,
    pub from: Option<NaiveDate>,
    /// Inclusive last day.
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub vessel: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub days: i64,
}

/// Rows with any blank voyage field are dropped before anything else.
pub fn voyages(table: &Table, columns: &Columns) -> Vec<Voyage> {
    table
        .rows
        .iter()
        .filter_map(|record| {
            let departure_text = record.text(&columns.departure)?;
            let arrival_text = record.text(&columns.arrival)?;
            Some(Voyage {
                vessel: record.text(&columns.vessel)?,
                from: record.text(&columns.port_of_loading)?,
                to: record.text(&columns.unloading_port)?,
                departure: parse_datetime(&departure_text),
                arrival: parse_datetime(&arrival_text),
            })
        })
        .collect()
}

/// Default window: earliest departure to latest arrival.
pub fn data_span(voyages: &[Voyage]) -> Option<(NaiveDate, NaiveDate)> {
    let start = voyages.iter().filter_map(|v| v.departure).min()?;
    let end = voyages.iter().filter_map(|v| v.arrival).max()?;
    Some((start.date(), end.date()))
}

pub fn filter_voyages(voyages: &[Voyage], filters: &VoyageFilters) -> Vec<Voyage> {
    let span = data_span(voyages);
    let Some(from) = filters.from.or(span.map(|(start, _)| start)) else {
        return Vec::new();
    };
    let Some(to) = filters.to.or(span.map(|(_, end)| end)) else {
        return Vec::new();
    };
    let window_start = from.and_time(NaiveTime::MIN);
    let window_end = to
        .checked_add_days(Days::new(1))
        .unwrap_or(to)
        .and_time(NaiveTime::MIN);

    voyages
        .iter()
        .filter(|v| filters.vessels.is_empty() || filters.vessels.contains(&v.vessel))
        .filter(|v| match (v.departure, v.arrival) {
            (Some(departure), Some(arrival)) => departure >= window_start && arrival < window_end,
            _ => false,
        })
        .cloned()
        .collect()
}

/// First departure to last arrival over the legs touching `origin`.
pub fn round_trip(voyages: &[Voyage], vessel: &str, origin: &str) -> Option<RoundTrip> {
    let mut legs: Vec<&Voyage> = voyages
        .iter()
        .filter(|v| v.vessel == vessel && (v.from == origin || v.to == origin))
        .collect();
    if legs.len() < 2 {
        return None;
    }
    legs.sort_by_key(|v| v.departure);

    let start = legs.first()?.departure?;
    let end = legs.last()?.arrival?;
    Some(RoundTrip {
        vessel: vessel.to_string(),
        start,
        end,
        days: floor_days(start, end),
    })
}

pub fn port_calls(voyages: &[Voyage]) -> BTreeMap<(String, String), usize> {
    let mut calls = BTreeMap::new();
    for voyage in voyages {
        *calls
            .entry((voyage.to.clone(), voyage.vessel.clone()))
            .or_insert(0) += 1;
    }
    calls
}

/// Distinct vessels per unloading port.
pub fn intersection_ports(voyages: &[Voyage]) -> BTreeMap<String, usize> {
    let mut vessels: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for voyage in voyages {
        vessels
            .entry(voyage.to.clone())
            .or_default()
            .insert(voyage.vessel.as_str());
    }
    vessels
        .into_iter()
        .map(|(port, set)| (port, set.len()))
        .collect()
}

/// How often each port appears as a loading or unloading port, busiest first.
pub fn port_ranking(voyages: &[Voyage]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for voyage in voyages {
        *counts.entry(voyage.from.as_str()).or_insert(0) += 1;
        *counts.entry(voyage.to.as_str()).or_insert(0) += 1;
    }
    let mut ranking: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(port, count)| (port.to_string(), count))
        .collect();
    ranking.sort_by(|a, b| b.1.cmp(&a.1));
    ranking
}

/// Directed port-to-port edges with voyage counts.
pub fn route_network(voyages: &[Voyage]) -> BTreeMap<(String, String), usize> {
    let mut edges = BTreeMap::new();
    for voyage in voyages {
        *edges
            .entry((voyage.from.clone(), voyage.to.clone()))
            .or_insert(0) += 1;
    }
    edges
}

pub struct VesselReport {
    pub input: String,
    pub filters: VoyageFilters,
    pub origin: String,
    pub columns: Columns,
}

impl VesselReport {
    pub fn analyse(&self, table: &Table) -> Result<ReportOutput> {
        let c = &self.columns;
        require_columns(
            table,
            &[
                c.vessel.as_str(),
                c.port_of_loading.as_str(),
                c.unloading_port.as_str(),
                c.departure.as_str(),
                c.arrival.as_str(),
            ],
            &self.input,
        )?;

        let all = voyages(table, c);
        let selected = filter_voyages(&all, &self.filters);
        tracing::info!(
            "{} complete voyages, {} inside the selection",
            all.len(),
            selected.len()
        );

        let vessels: BTreeSet<&str> = if self.filters.vessels.is_empty() {
            all.iter().map(|v| v.vessel.as_str()).collect()
        } else {
            self.filters.vessels.iter().map(String::as_str).collect()
        };

        let mut output = ReportOutput::new("vessel");
        output.metric("Voyages", selected.len());
        output.metric("Vessels", vessels.len());

        let mut trips = Table::from_columns(&["Vessel", "Origin", "First Departure", "Last Arrival", "Days"]);
        for vessel in &vessels {
            match round_trip(&selected, vessel, &self.origin) {
                Some(trip) => {
                    output.note(format!(
                        "{}: round-trip from {} took {} days.",
                        vessel, self.origin, trip.days
                    ));
                    trips.push(
                        Record::new()
                            .with("Vessel", trip.vessel.as_str())
                            .with("Origin", self.origin.as_str())
                            .with("First Departure", format_datetime(trip.start))
                            .with("Last Arrival", format_datetime(trip.end))
                            .with("Days", trip.days),
                    );
                }
                None => output.note(format!(
                    "{}: not enough {} data for round-trip calculation.",
                    vessel, self.origin
                )),
            }
        }
        output.table("round_trips", "Round-trip Analysis", trips);

        let mut calls = Table::from_columns(&[c.unloading_port.as_str(), "Vessel", "Calls"]);
        for ((port, vessel), count) in port_calls(&selected) {
            calls.push(
                Record::new()
                    .with(&c.unloading_port, port)
                    .with("Vessel", vessel)
                    .with("Calls", count),
            );
        }
        output.table("port_calls", "Port Call Frequency", calls);

        let mut shared = Table::from_columns(&[c.unloading_port.as_str(), "Unique Vessels"]);
        for (port, count) in intersection_ports(&selected) {
            shared.push(
                Record::new()
                    .with(&c.unloading_port, port)
                    .with("Unique Vessels", count),
            );
        }
        output.table("intersection_ports", "Intersection Ports", shared);

        let mut ranking = Table::from_columns(&["Port", "Frequency"]);
        for (port, count) in port_ranking(&selected) {
            ranking.push(Record::new().with("Port", port).with("Frequency", count));
        }
        output.table("port_ranking", "Important Ports", ranking);

        let edges = route_network(&selected);
        let nodes: BTreeSet<&str> = edges
            .keys()
            .flat_map(|(from, to)| [from.as_str(), to.as_str()])
            .collect();
        output.metric("Ports", nodes.len());
        output.metric("Routes", edges.len());
        let mut network = Table::from_columns(&["From", "To", "Voyages"]);
        for ((from, to), count) in &edges {
            network.push(
                Record::new()
                    .with("From", from.as_str())
                    .with("To", to.as_str())
                    .with("Voyages", *count),
            );
        }
        output.table("route_network", "Route Network", network);

        Ok(output)
    }
}

impl Report for VesselReport {
    fn name(&self) -> &str {
        "vessel"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn build(&self, tables: Vec<Table>) -> Result<ReportOutput> {
        let table = tables
            .first()
            .ok_or_else(|| DepotError::processing("Vessel analysis needs one input table"))?;
        self.analyse(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voyage_table(rows: &[(&str, &str, &str, &str, &str)]) -> Table {
        let mut table = Table::from_columns(&[
            "Vessel",
            "Port of loading",
            "Unloading port",
            "Departure",
            "Arrival",
        ]);
        for (vessel, from, to, departure, arrival) in rows {
            table.push(
                Record::new()
                    .with("Vessel", *vessel)
                    .with("Port of loading", *from)
                    .with("Unloading port", *to)
                    .with("Departure", *departure)
                    .with("Arrival", *arrival),
            );
        }
        table
    }

    fn sample() -> Table {
        voyage_table(&[
            ("AMETIST", "NOVOROSSIYSK", "MERSIN", "2025-01-01", "2025-01-05"),
            ("AMETIST", "MERSIN", "HAIFA", "2025-01-06", "2025-01-08"),
            ("AMETIST", "HAIFA", "NOVOROSSIYSK", "2025-01-09", "2025-01-15 18:00"),
            ("OPAL", "AMBARLI", "HAIFA", "2025-01-03", "2025-01-04"),
            ("OPAL", "HAIFA", "", "2025-01-05", "2025-01-06"),
        ])
    }

    fn report(filters: VoyageFilters) -> VesselReport {
        VesselReport {
            input: "ametist.csv".to_string(),
            filters,
            origin: DEFAULT_ORIGIN.to_string(),
            columns: Columns::default(),
        }
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let all = voyages(&sample(), &Columns::default());
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_round_trip_days() {
        let all = voyages(&sample(), &Columns::default());
        let trip = round_trip(&all, "AMETIST", DEFAULT_ORIGIN).unwrap();
        assert_eq!(trip.days, 14);
        assert!(round_trip(&all, "OPAL", DEFAULT_ORIGIN).is_none());
    }

    #[test]
    fn test_date_window_includes_whole_last_day() {
        let all = voyages(&sample(), &Columns::default());
        let filters = VoyageFilters {
            vessels: vec![],
            from: NaiveDate::from_ymd_opt(2025, 1, 2),
            to: NaiveDate::from_ymd_opt(2025, 1, 15),
        };
        let selected = filter_voyages(&all, &filters);
        let routes: Vec<(&str, &str)> = selected
            .iter()
            .map(|v| (v.from.as_str(), v.to.as_str()))
            .collect();
        assert_eq!(
            routes,
            vec![("MERSIN", "HAIFA"), ("HAIFA", "NOVOROSSIYSK"), ("AMBARLI", "HAIFA")]
        );
    }

    #[test]
    fn test_unparseable_dates_fall_outside_window() {
        let table = voyage_table(&[
            ("OPAL", "AMBARLI", "HAIFA", "2025-01-03", "2025-01-04"),
            ("OPAL", "HAIFA", "GEBZE", "soon", "2025-01-06"),
        ]);
        let all = voyages(&table, &Columns::default());
        assert_eq!(all.len(), 2);
        assert_eq!(filter_voyages(&all, &VoyageFilters::default()).len(), 1);
    }

    #[test]
    fn test_port_statistics() {
        let all = voyages(&sample(), &Columns::default());

        let ranking = port_ranking(&all);
        assert_eq!(ranking[0], ("HAIFA".to_string(), 3));

        let shared = intersection_ports(&all);
        assert_eq!(shared.get("HAIFA"), Some(&2));
        assert_eq!(shared.get("MERSIN"), Some(&1));

        let calls = port_calls(&all);
        assert_eq!(calls.get(&("HAIFA".to_string(), "OPAL".to_string())), Some(&1));

        assert_eq!(route_network(&all).len(), 4);
    }

    #[test]
    fn test_report_for_selected_vessel() {
        let output = report(VoyageFilters {
            vessels: vec!["AMETIST".to_string()],
            ..Default::default()
        })
        .analyse(&sample())
        .unwrap();

        assert_eq!(output.find_metric("Voyages"), Some("3"));
        assert_eq!(output.find_metric("Ports"), Some("3"));
        let trips = output.find_table("round_trips").unwrap();
        assert_eq!(
            trips.row_cells(&trips.rows[0]),
            vec!["AMETIST", "NOVOROSSIYSK", "2025-01-01", "2025-01-15 18:00:00", "14"]
        );
    }

    #[test]
    fn test_missing_vessel_gets_note() {
        let output = report(VoyageFilters {
            vessels: vec!["GHOST".to_string()],
            ..Default::default()
        })
        .analyse(&sample())
        .unwrap();
        assert_eq!(output.find_metric("Voyages"), Some("0"));
        assert!(output.notes[0].starts_with("GHOST: not enough"));
    }
}
