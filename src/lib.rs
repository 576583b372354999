pub mod analysis;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::app::jobs::ReportJob;
pub use crate::config::Settings;
pub use crate::core::{
    engine::{ReportEngine, ReportRun},
    export::{OutputFormat, ReportWriter},
    pipeline::ReportPipeline,
    storage::LocalStorage,
};
pub use crate::domain::model::{Record, ReportOutput, Table};
pub use crate::utils::error::{DepotError, Result};
