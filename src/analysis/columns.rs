use serde::{Deserialize, Serialize};

/// Spreadsheet header names. Exports differ between depots, so every name is
/// overridable from the `[columns]` section of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub container: String,
    pub company: String,
    pub pol_agent: String,
    pub pol_port: String,
    pub size: String,
    pub container_type: String,
    pub activity_mode: String,
    pub ageing_days: String,
    pub region_name: String,
    pub in_date: String,
    pub out_date: String,
    pub activity_date: String,
    pub system_date: String,
    pub region: String,
    pub lead: String,
    pub subordinate: String,
    pub vessel: String,
    pub port_of_loading: String,
    pub unloading_port: String,
    pub departure: String,
    pub arrival: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            container: "Container #".to_string(),
            company: "Company".to_string(),
            pol_agent: "POL Agent".to_string(),
            pol_port: "POL Port".to_string(),
            size: "Size".to_string(),
            container_type: "Type".to_string(),
            activity_mode: "Activity Mode".to_string(),
            ageing_days: "Ageing Days".to_string(),
            region_name: "Region Name".to_string(),
            in_date: "IN DATE".to_string(),
            out_date: "OUT DATE".to_string(),
            activity_date: "Activity Date".to_string(),
            system_date: "System Date".to_string(),
            region: "Region".to_string(),
            lead: "Lead".to_string(),
            subordinate: "subordinate".to_string(),
            vessel: "Vessel".to_string(),
            port_of_loading: "Port of loading".to_string(),
            unloading_port: "Unloading port".to_string(),
            departure: "Departure".to_string(),
            arrival: "Arrival".to_string(),
        }
    }
}
