use crate::analysis::assignment::AssignmentReport;
use crate::analysis::fifo::FifoReport;
use crate::analysis::inventory_kpi::InventoryKpiReport;
use crate::analysis::search::ContainerSearch;
use crate::analysis::stock_summary::StockSummaryReport;
use crate::analysis::vessel::VesselReport;
use crate::core::engine::{ReportEngine, ReportRun};
use crate::core::export::ReportWriter;
use crate::core::pipeline::ReportPipeline;
use crate::core::source::TableSource;
use crate::core::{Report, Storage};
use crate::utils::error::Result;

/// One report ready to run, as selected on the command line.
pub enum ReportJob {
    Fifo(FifoReport),
    Summary(StockSummaryReport),
    Assign(AssignmentReport),
    Kpi(InventoryKpiReport),
    Vessel(VesselReport),
    Search(ContainerSearch),
}

impl ReportJob {
    pub fn name(&self) -> &str {
        match self {
            ReportJob::Fifo(report) => report.name(),
            ReportJob::Summary(report) => report.name(),
            ReportJob::Assign(report) => report.name(),
            ReportJob::Kpi(report) => report.name(),
            ReportJob::Vessel(report) => report.name(),
            ReportJob::Search(report) => report.name(),
        }
    }

    pub async fn run<S: Storage>(
        self,
        source: TableSource<S>,
        writer: ReportWriter,
        monitor_enabled: bool,
    ) -> Result<ReportRun> {
        match self {
            ReportJob::Fifo(report) => execute(source, writer, report, monitor_enabled).await,
            ReportJob::Summary(report) => execute(source, writer, report, monitor_enabled).await,
            ReportJob::Assign(report) => execute(source, writer, report, monitor_enabled).await,
            ReportJob::Kpi(report) => execute(source, writer, report, monitor_enabled).await,
            ReportJob::Vessel(report) => execute(source, writer, report, monitor_enabled).await,
            ReportJob::Search(report) => execute(source, writer, report, monitor_enabled).await,
        }
    }
}

async fn execute<S: Storage, R: Report>(
    source: TableSource<S>,
    writer: ReportWriter,
    report: R,
    monitor_enabled: bool,
) -> Result<ReportRun> {
    let pipeline = ReportPipeline::from_source(source, writer, report);
    ReportEngine::new_with_monitoring(pipeline, monitor_enabled)
        .run()
        .await
}
