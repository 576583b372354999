pub mod engine;
pub mod export;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod storage;

pub use crate::domain::model::{Record, ReportOutput, Table};
pub use crate::domain::ports::{Pipeline, Report, Storage};
pub use crate::utils::error::Result;
