use crate::analysis::assignment::{AssignmentReport, AssignmentRequest, EMPTY_MODE};
use crate::analysis::fifo::{FifoReport, FIFO_SHEET};
use crate::analysis::inventory_kpi::{InventoryKpiReport, KpiFilters};
use crate::analysis::search::ContainerSearch;
use crate::analysis::stock_summary::{StockFilters, StockSummaryReport};
use crate::analysis::vessel::{VesselReport, VoyageFilters};
use crate::app::jobs::ReportJob;
use crate::config::settings::Settings;
use crate::core::source::{SheetSelection, SUPPORTED_EXTENSIONS};
use crate::utils::error::{DepotError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "depot-kpi")]
#[command(version)]
#[command(about = "Container depot and shipping KPI reports from spreadsheet exports")]
pub struct CliConfig {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output directory, overrides [output].path
    #[arg(long, global = true)]
    pub output: Option<String>,

    /// Bundle the report files into one zip archive
    #[arg(long, global = true)]
    pub bundle: bool,

    /// Output formats (csv, tsv, json), overrides [output].formats
    #[arg(long, global = true, value_delimiter = ',')]
    pub format: Vec<String>,

    /// Worksheet to read from .xlsx/.xls inputs. Defaults to DRY for fifo, else the first sheet
    #[arg(long, global = true)]
    pub sheet: Option<String>,

    /// Rows shown per table on the console
    #[arg(long, global = true)]
    pub preview_rows: Option<usize>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// FIFO compliance of released containers
    Fifo(FifoArgs),
    /// Container counts by agent and size
    Summary(SummaryArgs),
    /// Pick the agent(s) to supply empty containers
    Assign(AssignArgs),
    /// Inventory activity KPIs by team and period
    Kpi(KpiArgs),
    /// Vessel voyages, round trips and port network
    Vessel(VesselArgs),
    /// Look up containers by number
    Search(SearchArgs),
}

#[derive(Debug, Clone, Args)]
pub struct FifoArgs {
    #[arg(long)]
    pub input: String,

    /// Grouping column; repeat for a composite key. Defaults to the POL agent column.
    #[arg(long = "group-by")]
    pub group_by: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SummaryArgs {
    #[arg(long)]
    pub input: String,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub port: Option<String>,

    #[arg(long, default_value = EMPTY_MODE, conflicts_with = "all_modes")]
    pub activity_mode: String,

    /// Count containers in every activity mode
    #[arg(long)]
    pub all_modes: bool,

    /// Named container category from the settings file
    #[arg(long, conflicts_with = "types")]
    pub category: Option<String>,

    #[arg(long = "type")]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct AssignArgs {
    #[arg(long)]
    pub input: String,

    #[arg(long)]
    pub port: String,

    #[arg(long)]
    pub size: String,

    #[arg(long)]
    pub quantity: usize,

    #[arg(long, conflicts_with = "types")]
    pub category: Option<String>,

    #[arg(long = "type")]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct KpiArgs {
    /// Inventory activity export
    #[arg(long)]
    pub activity: String,

    /// Port to region/lead/subordinate mapping export
    #[arg(long)]
    pub mapping: String,

    #[arg(long = "region")]
    pub regions: Vec<String>,

    #[arg(long = "lead")]
    pub leads: Vec<String>,

    #[arg(long = "subordinate")]
    pub subordinates: Vec<String>,

    #[arg(long = "port")]
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct VesselArgs {
    #[arg(long)]
    pub input: String,

    /// Vessel to report on; repeat for several. Defaults to every vessel.
    #[arg(long = "vessel")]
    pub vessels: Vec<String>,

    /// First departure day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last departure day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Round-trip origin port, overrides [vessel].origin
    #[arg(long)]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    #[arg(long)]
    pub input: String,

    /// Container numbers separated by commas or whitespace
    #[arg(long)]
    pub containers: String,
}

impl CliConfig {
    /// Settings file values with command-line flags layered on top.
    pub fn load_settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => {
                tracing::info!("Loading settings from {}", path.display());
                Settings::from_file(path)?
            }
            None => Settings::default(),
        };
        self.apply_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(output) = &self.output {
            settings.output.path = output.clone();
        }
        if self.bundle {
            settings.output.bundle = true;
        }
        if !self.format.is_empty() {
            settings.output.formats = self.format.clone();
        }
        if let Some(rows) = self.preview_rows {
            settings.output.preview_rows = rows;
        }
        if let Command::Vessel(VesselArgs {
            origin: Some(origin),
            ..
        }) = &self.command
        {
            settings.vessel.origin = origin.clone();
        }
    }

    pub fn sheet_selection(&self) -> SheetSelection {
        match (&self.sheet, &self.command) {
            (Some(name), _) => SheetSelection::Named(name.clone()),
            (None, Command::Fifo(_)) => SheetSelection::Preferred(FIFO_SHEET.to_string()),
            (None, _) => SheetSelection::First,
        }
    }

    fn input_files(&self) -> Vec<(&'static str, &str)> {
        match &self.command {
            Command::Fifo(args) => vec![("fifo.input", args.input.as_str())],
            Command::Summary(args) => vec![("summary.input", args.input.as_str())],
            Command::Assign(args) => vec![("assign.input", args.input.as_str())],
            Command::Kpi(args) => vec![
                ("kpi.activity", args.activity.as_str()),
                ("kpi.mapping", args.mapping.as_str()),
            ],
            Command::Vessel(args) => vec![("vessel.input", args.input.as_str())],
            Command::Search(args) => vec![("search.input", args.input.as_str())],
        }
    }

    /// Builds the report job for the selected subcommand.
    pub fn into_job(self, settings: &Settings) -> Result<ReportJob> {
        let columns = settings.columns.clone();

        let job = match self.command {
            Command::Fifo(args) => {
                ReportJob::Fifo(FifoReport::new(&args.input, args.group_by, columns))
            }
            Command::Summary(args) => {
                let types = match &args.category {
                    Some(category) => settings.categories.resolve(category)?,
                    None => args.types,
                };
                ReportJob::Summary(StockSummaryReport {
                    input: args.input,
                    filters: StockFilters {
                        region: args.region,
                        port: args.port,
                        activity_mode: (!args.all_modes).then_some(args.activity_mode),
                        types,
                    },
                    columns,
                })
            }
            Command::Assign(args) => {
                let types = match &args.category {
                    Some(category) => settings.categories.resolve(category)?,
                    None => args.types,
                };
                ReportJob::Assign(AssignmentReport {
                    input: args.input,
                    request: AssignmentRequest {
                        port: args.port,
                        size: args.size,
                        quantity: args.quantity,
                        types,
                    },
                    columns,
                })
            }
            Command::Kpi(args) => ReportJob::Kpi(InventoryKpiReport {
                activity_input: args.activity,
                mapping_input: args.mapping,
                filters: KpiFilters {
                    regions: args.regions,
                    leads: args.leads,
                    subordinates: args.subordinates,
                    ports: args.ports,
                },
                thresholds: settings.kpi,
                columns,
            }),
            Command::Vessel(args) => ReportJob::Vessel(VesselReport {
                input: args.input,
                filters: VoyageFilters {
                    vessels: args.vessels,
                    from: args.from,
                    to: args.to,
                },
                origin: args.origin.unwrap_or_else(|| settings.vessel.origin.clone()),
                columns,
            }),
            Command::Search(args) => {
                ReportJob::Search(ContainerSearch::new(&args.input, &args.containers, columns))
            }
        };
        Ok(job)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        for (field, file) in self.input_files() {
            validation::validate_file_extension(field, file, SUPPORTED_EXTENSIONS)?;
        }

        match &self.command {
            Command::Assign(args) => {
                validation::validate_positive_number("assign.quantity", args.quantity, 1)?;
                validation::validate_non_empty_string("assign.port", &args.port)?;
                validation::validate_non_empty_string("assign.size", &args.size)?;
            }
            Command::Vessel(VesselArgs {
                from: Some(from),
                to: Some(to),
                ..
            }) if from > to => {
                return Err(DepotError::InvalidConfigValueError {
                    field: "vessel.from".to_string(),
                    value: from.to_string(),
                    reason: format!("Start date is after the end date {}", to),
                });
            }
            Command::Search(args) => {
                validation::validate_non_empty_string("search.containers", &args.containers)?;
            }
            _ => {}
        }

        if let Some(rows) = self.preview_rows {
            validation::validate_positive_number("preview_rows", rows, 1)?;
        }
        if let Some(sheet) = &self.sheet {
            validation::validate_non_empty_string("sheet", sheet)?;
        }
        Ok(())
    }
}
