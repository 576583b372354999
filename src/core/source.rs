use crate::analysis::values::format_datetime;
use crate::domain::model::{Record, Table};
use crate::domain::ports::Storage;
use crate::utils::error::{DepotError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt", "xlsx", "xlsm", "xls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    Csv,
    Tsv,
    Workbook,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "tsv" | "txt" => Ok(InputFormat::Tsv),
            "xlsx" | "xlsm" | "xls" => Ok(InputFormat::Workbook),
            _ => Err(DepotError::UnsupportedFormatError {
                path: path.to_string(),
                extension,
            }),
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            InputFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Which worksheet of a workbook input to read. Delimited inputs ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum SheetSelection {
    #[default]
    First,
    /// This sheet, or the first one when the workbook has no sheet by that name.
    Preferred(String),
    Named(String),
}

impl SheetSelection {
    fn pick(&self, names: &[String], source_name: &str) -> Result<String> {
        let first = names.first().cloned();
        let picked = match self {
            SheetSelection::First => first,
            SheetSelection::Preferred(name) => names
                .iter()
                .find(|candidate| *candidate == name)
                .cloned()
                .or(first),
            SheetSelection::Named(name) => {
                return names
                    .iter()
                    .find(|candidate| *candidate == name)
                    .cloned()
                    .ok_or_else(|| DepotError::MissingSheetError {
                        sheet: name.clone(),
                        source_name: source_name.to_string(),
                        available: names.join(", "),
                    })
            }
        };
        picked.ok_or_else(|| DepotError::MissingSheetError {
            sheet: "(first sheet)".to_string(),
            source_name: source_name.to_string(),
            available: String::new(),
        })
    }
}

/// Header names trimmed; repeats become `Size.1`, `Size.2`, ...
fn unique_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .map(|header| {
            let name = header.trim().to_string();
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{}.{}", name, *count - 1)
            }
        })
        .collect()
}

/// Parses a delimited export. Headers are trimmed and de-duplicated
/// (`Size`, `Size.1`, ...), blank cells become `Null`, short rows are padded.
pub fn parse_table(bytes: &[u8], format: InputFormat) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns = unique_headers(reader.headers()?.iter());

    let mut table = Table::new(columns);
    for result in reader.records() {
        let row = result?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut record = Record::new();
        for (index, column) in table.columns.iter().enumerate() {
            let value = match row.get(index) {
                Some(cell) if !cell.trim().is_empty() => Value::String(cell.to_string()),
                _ => Value::Null,
            };
            record.set(column, value);
        }
        table.rows.push(record);
    }

    Ok(table)
}

/// Workbook cells as the same text cells a delimited export would give.
/// Whole numbers drop the `.0`; dates print the way report tables print them.
fn workbook_cell(cell: &Data) -> Value {
    let text = match cell {
        Data::Empty | Data::Error(_) => return Value::Null,
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
        Data::Int(number) => number.to_string(),
        Data::Float(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
            format!("{}", *number as i64)
        }
        Data::Float(number) => number.to_string(),
        Data::Bool(flag) => flag.to_string(),
        Data::DateTime(stamp) => match stamp.as_datetime() {
            Some(at) => format_datetime(at),
            None => return Value::Null,
        },
    };
    if text.trim().is_empty() {
        Value::Null
    } else {
        Value::String(text)
    }
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let header_cells: Vec<String> = rows
        .next()
        .map(|header| {
            header
                .iter()
                .map(|cell| match workbook_cell(cell) {
                    Value::String(text) => text,
                    _ => String::new(),
                })
                .collect()
        })
        .unwrap_or_default();
    let mut table = Table::new(unique_headers(header_cells.iter().map(String::as_str)));

    for row in rows {
        let values: Vec<Value> = row.iter().map(workbook_cell).collect();
        if values.iter().all(Value::is_null) {
            continue;
        }
        let mut record = Record::new();
        for (index, column) in table.columns.iter().enumerate() {
            record.set(column, values.get(index).cloned().unwrap_or(Value::Null));
        }
        table.rows.push(record);
    }
    table
}

/// Reads one worksheet of an xlsx/xlsm/xls workbook.
pub fn parse_workbook(bytes: &[u8], sheet: &SheetSelection, source_name: &str) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let names = workbook.sheet_names();
    let name = sheet.pick(&names, source_name)?;
    tracing::debug!("Reading sheet '{}' of {}", name, source_name);

    let range = workbook.worksheet_range(&name)?;
    Ok(range_to_table(&range))
}

fn content_key(bytes: &[u8], format: InputFormat, sheet: &SheetSelection) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format.hash(&mut hasher);
    if format == InputFormat::Workbook {
        sheet.hash(&mut hasher);
    }
    hasher.finish()
}

/// Loads tables through `Storage`, parsing identical file content only once.
pub struct TableSource<S: Storage> {
    storage: S,
    sheet: SheetSelection,
    cache: Mutex<HashMap<u64, Arc<Table>>>,
}

impl<S: Storage> TableSource<S> {
    pub fn new(storage: S) -> Self {
        Self::with_sheet(storage, SheetSelection::First)
    }

    pub fn with_sheet(storage: S, sheet: SheetSelection) -> Self {
        Self {
            storage,
            sheet,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn load(&self, path: &str) -> Result<Arc<Table>> {
        let format = InputFormat::from_path(path)?;
        let bytes = self.storage.read_file(path).await?;
        let key = content_key(&bytes, format, &self.sheet);

        if let Some(table) = self.lock_cache().get(&key) {
            tracing::debug!("Reusing parsed table for {}", path);
            return Ok(Arc::clone(table));
        }

        let table = match format {
            InputFormat::Workbook => parse_workbook(&bytes, &self.sheet, path)?,
            _ => parse_table(&bytes, format)?,
        };
        let table = Arc::new(table);
        tracing::debug!(
            "Parsed {} ({} bytes): {} rows, {} columns",
            path,
            bytes.len(),
            table.len(),
            table.columns.len()
        );
        self.lock_cache().insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn cached_tables(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Arc<Table>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
