use crate::domain::model::{ReportOutput, Table};
use crate::domain::ports::Storage;
use crate::utils::error::{DepotError, Result};
use serde_json::{json, Map, Value};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["csv", "tsv", "json"];

    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            other => Err(DepotError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: other.to_string(),
                reason: format!(
                    "Unsupported format. Valid formats: {}",
                    Self::NAMES.join(", ")
                ),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

pub fn render_delimited(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for record in &table.rows {
        writer.write_record(table.row_cells(record))?;
    }
    writer
        .into_inner()
        .map_err(|e| DepotError::processing(format!("Failed to flush table buffer: {}", e.error())))
}

pub fn render_json(table: &Table) -> Result<Vec<u8>> {
    let rows: Vec<Map<String, Value>> = table
        .rows
        .iter()
        .map(|record| {
            table
                .columns
                .iter()
                .map(|column| {
                    (
                        column.clone(),
                        record.get(column).cloned().unwrap_or(Value::Null),
                    )
                })
                .collect()
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&rows)?)
}

pub fn render_summary(output: &ReportOutput) -> Result<Vec<u8>> {
    let metrics: Map<String, Value> = output
        .metrics
        .iter()
        .map(|m| (m.label.clone(), Value::String(m.value.clone())))
        .collect();
    let tables: Vec<Value> = output
        .tables
        .iter()
        .map(|t| json!({ "file": t.file_stem, "title": t.title, "rows": t.table.len() }))
        .collect();

    Ok(serde_json::to_vec_pretty(&json!({
        "report": output.name,
        "metrics": metrics,
        "tables": tables,
        "notes": output.notes,
    }))?)
}

/// Writes report tables as files under `<output_dir>/<report>/`, or as one
/// `<output_dir>/<report>.zip` when bundling.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: String,
    formats: Vec<OutputFormat>,
    bundle: bool,
}

impl ReportWriter {
    pub fn new(output_dir: &str, formats: Vec<OutputFormat>, bundle: bool) -> Self {
        let formats = if formats.is_empty() {
            vec![OutputFormat::Csv]
        } else {
            formats
        };
        Self {
            output_dir: output_dir.trim_end_matches('/').to_string(),
            formats,
            bundle,
        }
    }

    /// File names and contents, relative to the report directory.
    pub fn render_files(&self, output: &ReportOutput) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::new();
        for named in &output.tables {
            for format in &self.formats {
                let data = match format {
                    OutputFormat::Csv => render_delimited(&named.table, b',')?,
                    OutputFormat::Tsv => render_delimited(&named.table, b'\t')?,
                    OutputFormat::Json => render_json(&named.table)?,
                };
                files.push((format!("{}.{}", named.file_stem, format.extension()), data));
            }
        }
        files.push(("summary.json".to_string(), render_summary(output)?));
        Ok(files)
    }

    pub async fn write<S: Storage>(&self, storage: &S, output: &ReportOutput) -> Result<String> {
        let files = self.render_files(output)?;

        if self.bundle {
            let path = format!("{}/{}.zip", self.output_dir, output.name);
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file(name.as_str(), SimpleFileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };

            tracing::debug!("Writing ZIP file ({} bytes) to {}", zip_data.len(), path);
            storage.write_file(&path, &zip_data).await?;
            return Ok(path);
        }

        let directory = format!("{}/{}", self.output_dir, output.name);
        for (name, data) in &files {
            let path = format!("{}/{}", directory, name);
            tracing::debug!("Writing {} ({} bytes)", path, data.len());
            storage.write_file(&path, data).await?;
        }
        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MemoryStorage {
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
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn sample_output() -> ReportOutput {
        let mut table = Table::from_columns(&["POL Agent", "FIFO %"]);
        table.push(Record::new().with("POL Agent", "ACME, LLC").with("FIFO %", 87.5));
        table.push(Record::new().with("POL Agent", "MSC"));

        let mut output = ReportOutput::new("fifo");
        output.metric("Overall FIFO %", "87.5%");
        output.note("1 rows skipped");
        output.table("fifo_summary", "Agent wise FIFO Compliance", table);
        output
    }

    #[test]
    fn test_render_delimited_quotes_and_blanks() {
        let output = sample_output();
        let csv = render_delimited(&output.tables[0].table, b',').unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "POL Agent,FIFO %\n\"ACME, LLC\",87.5\nMSC,\n"
        );

        let tsv = render_delimited(&output.tables[0].table, b'\t').unwrap();
        assert!(String::from_utf8(tsv).unwrap().starts_with("POL Agent\tFIFO %\n"));
    }

    #[test]
    fn test_render_json_rows() {
        let output = sample_output();
        let json: Value = serde_json::from_slice(&render_json(&output.tables[0].table).unwrap()).unwrap();
        assert_eq!(json[0]["POL Agent"], "ACME, LLC");
        assert_eq!(json[1]["FIFO %"], Value::Null);
    }

    #[test]
    fn test_unknown_output_format() {
        assert!(OutputFormat::parse("xlsx").is_err());
        assert_eq!(OutputFormat::parse(" JSON ").unwrap(), OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_write_plain_files() {
        let storage = MemoryStorage::default();
        let writer = ReportWriter::new("out/", vec![OutputFormat::Csv, OutputFormat::Json], false);

        let path = writer.write(&storage, &sample_output()).await.unwrap();
        assert_eq!(path, "out/fifo");

        let files = storage.files.lock().await;
        let mut names: Vec<&String> = files.keys().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["out/fifo/fifo_summary.csv", "out/fifo/fifo_summary.json", "out/fifo/summary.json"]
        );

        let summary: Value = serde_json::from_slice(&files["out/fifo/summary.json"]).unwrap();
        assert_eq!(summary["metrics"]["Overall FIFO %"], "87.5%");
        assert_eq!(summary["tables"][0]["rows"], 2);
    }

    #[tokio::test]
    async fn test_write_bundle() {
        let storage = MemoryStorage::default();
        let writer = ReportWriter::new("out", vec![], true);

        let path = writer.write(&storage, &sample_output()).await.unwrap();
        assert_eq!(path, "out/fifo.zip");

        let zip_bytes = storage.read_file("out/fifo.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut file_names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        file_names.sort();
        assert_eq!(file_names, vec!["fifo_summary.csv", "summary.json"]);

        let mut content = String::new();
        archive
            .by_name("fifo_summary.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.contains("\"ACME, LLC\",87.5"));
    }
}
