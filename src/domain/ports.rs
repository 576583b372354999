use crate::domain::model::{ReportOutput, Table};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A report computation over already loaded input tables.
pub trait Report: Send + Sync {
    fn name(&self) -> &str;

    /// Input file paths, in the order `build` expects them.
    fn inputs(&self) -> Vec<String>;

    fn build(&self, tables: Vec<Table>) -> Result<ReportOutput>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Table>>;
    async fn transform(&self, data: Vec<Table>) -> Result<ReportOutput>;
    async fn load(&self, output: &ReportOutput) -> Result<String>;
}
