use crate::core::export::ReportWriter;
use crate::core::source::TableSource;
use crate::core::{Pipeline, Report, ReportOutput, Storage, Table};
use crate::utils::error::Result;

/// Runs any `Report`: load its inputs, build it, write its tables.
pub struct ReportPipeline<S: Storage, R: Report> {
    source: TableSource<S>,
    writer: ReportWriter,
    report: R,
}

impl<S: Storage, R: Report> ReportPipeline<S, R> {
    pub fn new(storage: S, writer: ReportWriter, report: R) -> Self {
        Self::from_source(TableSource::new(storage), writer, report)
    }

    pub fn from_source(source: TableSource<S>, writer: ReportWriter, report: R) -> Self {
        Self {
            source,
            writer,
            report,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, R: Report> Pipeline for ReportPipeline<S, R> {
    async fn extract(&self) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        for path in self.report.inputs() {
            tracing::debug!("Loading {} for the {} report", path, self.report.name());
            let table = self.source.load(&path).await?;
            tables.push(Table::clone(&table));
        }
        Ok(tables)
    }

    async fn transform(&self, data: Vec<Table>) -> Result<ReportOutput> {
        self.report.build(data)
    }

    async fn load(&self, output: &ReportOutput) -> Result<String> {
        self.writer.write(self.source.storage(), output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::columns::Columns;
    use crate::analysis::search::ContainerSearch;
    use crate::core::export::OutputFormat;
    use crate::utils::error::DepotError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                DepotError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn pipeline(storage: MockStorage) -> ReportPipeline<MockStorage, ContainerSearch> {
        ReportPipeline::new(
            storage,
            ReportWriter::new("out", vec![OutputFormat::Csv], false),
            ContainerSearch::new("activity.csv", "TRLU1", Columns::default()),
        )
    }

    #[tokio::test]
    async fn test_extract_loads_declared_inputs() {
        let storage = MockStorage::default();
        storage
            .put("activity.csv", "Company,Container #\nGulf,TRLU1\n")
            .await;

        let tables = pipeline(storage).extract().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec!["Company", "Container #"]);
    }

    #[tokio::test]
    async fn test_extract_missing_input_fails() {
        let result = pipeline(MockStorage::default()).extract().await;
        assert!(matches!(result, Err(DepotError::IoError(_))));
    }

    #[tokio::test]
    async fn test_transform_then_load_writes_tables() {
        let storage = MockStorage::default();
        storage
            .put("activity.csv", "Company,Container #\nGulf,trlu1\n")
            .await;
        let pipeline = pipeline(storage.clone());

        let tables = pipeline.extract().await.unwrap();
        let output = pipeline.transform(tables).await.unwrap();
        let path = pipeline.load(&output).await.unwrap();

        assert_eq!(path, "out/search");
        let csv = storage.get_file("out/search/container_search.csv").await.unwrap();
        assert_eq!(String::from_utf8(csv).unwrap(), "Company,Container #\nGulf,trlu1\n");
        assert!(storage.get_file("out/search/summary.json").await.is_some());
    }
}
