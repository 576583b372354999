use crate::core::{Pipeline, ReportOutput};
use crate::utils::error::Result;
use crate::utils::monitor::PhaseMonitor;

#[derive(Debug, Clone)]
pub struct ReportRun {
    pub output_path: String,
    pub report: ReportOutput,
}

pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitor: PhaseMonitor,
}

fn written_rows(report: &ReportOutput) -> usize {
    report.tables.iter().map(|named| named.table.len()).sum()
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: PhaseMonitor::new(monitor_enabled),
        }
    }

    pub fn monitor(&self) -> &PhaseMonitor {
        &self.monitor
    }

    pub async fn run(&self) -> Result<ReportRun> {
        tracing::info!("Loading input tables...");
        self.monitor.start_phase();
        let tables = self.pipeline.extract().await?;
        let input_rows = tables.iter().map(|t| t.len()).sum::<usize>();
        tracing::info!("Loaded {} table(s), {} rows", tables.len(), input_rows);
        self.monitor.finish_phase("Extract", input_rows);

        tracing::info!("Building report...");
        self.monitor.start_phase();
        let report = self.pipeline.transform(tables).await?;
        tracing::info!(
            "Built {} report with {} table(s)",
            report.name,
            report.tables.len()
        );
        self.monitor.finish_phase("Transform", written_rows(&report));

        tracing::info!("Writing report files...");
        self.monitor.start_phase();
        let output_path = self.pipeline.load(&report).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.finish_phase("Load", written_rows(&report));
        self.monitor.log_summary();

        Ok(ReportRun {
            output_path,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Table;
    use crate::domain::model::Record;

    struct FixedPipeline;

    #[async_trait::async_trait]
    impl Pipeline for FixedPipeline {
        async fn extract(&self) -> Result<Vec<Table>> {
            let mut stock = Table::from_columns(&["Container #"]);
            for number in ["A1", "A2", "A3"] {
                stock.push(Record::new().with("Container #", number));
            }
            Ok(vec![stock, Table::from_columns(&["Port"])])
        }

        async fn transform(&self, data: Vec<Table>) -> Result<ReportOutput> {
            let mut output = ReportOutput::new("fixed");
            output.table("first", "First", data[0].clone());
            output.table("empty", "Empty", data[1].clone());
            Ok(output)
        }

        async fn load(&self, output: &ReportOutput) -> Result<String> {
            Ok(format!("out/{}", output.name))
        }
    }

    #[tokio::test]
    async fn test_run_records_rows_per_phase() {
        let engine = ReportEngine::new(FixedPipeline);
        let run = engine.run().await.unwrap();
        assert_eq!(run.output_path, "out/fixed");

        let phases: Vec<(&str, usize)> = engine
            .monitor()
            .phases()
            .iter()
            .map(|stats| (stats.phase, stats.rows))
            .collect();
        assert_eq!(phases, vec![("Extract", 3), ("Transform", 3), ("Load", 3)]);
    }
}
