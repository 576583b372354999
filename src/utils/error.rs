use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepotError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported input format '{extension}' for {path}")]
    UnsupportedFormatError { path: String, extension: String },

    #[error("Sheet '{sheet}' not found in {source_name}")]
    MissingSheetError {
        sheet: String,
        source_name: String,
        available: String,
    },

    #[error("Column '{column}' not found in {source_name}")]
    MissingColumnError { column: String, source_name: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DepotError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn missing_column(column: &str, source_name: &str) -> Self {
        Self::MissingColumnError {
            column: column.to_string(),
            source_name: source_name.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CsvError(_)
            | Self::SpreadsheetError(_)
            | Self::UnsupportedFormatError { .. }
            | Self::MissingSheetError { .. }
            | Self::MissingColumnError { .. } => ErrorCategory::Input,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::ProcessingError { .. } | Self::SerializationError(_) => {
                ErrorCategory::Processing
            }
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for the binary.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::CsvError(_) => "Check that the file is a well-formed CSV/TSV export with a header row",
            Self::SpreadsheetError(_) => "Open the workbook in a spreadsheet program and save it again as .xlsx",
            Self::UnsupportedFormatError { .. } => {
                "Pass a .csv, .tsv, .txt, .xlsx, .xlsm or .xls file"
            }
            Self::MissingSheetError { .. } => "Pick one of the listed sheets with --sheet",
            Self::MissingColumnError { .. } => {
                "Check the header row, or map the column name in the [columns] section of the config file"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Review the command-line flags and the config file values"
            }
            Self::ProcessingError { .. } | Self::SerializationError(_) => {
                "Run with --verbose to see which rows were involved"
            }
            Self::IoError(_) => "Check that the file exists and the output directory is writable",
            Self::ZipError(_) => "Retry without --bundle to write plain files",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingColumnError {
                column,
                source_name,
            } => format!("The file {} has no '{}' column", source_name, column),
            Self::UnsupportedFormatError { path, .. } => {
                format!(
                    "Cannot read {}: only CSV, TSV and Excel workbooks are supported",
                    path
                )
            }
            Self::MissingSheetError {
                sheet,
                source_name,
                available,
            } => format!(
                "The workbook {} has no sheet named '{}' (sheets: {})",
                source_name, sheet, available
            ),
            Self::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DepotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_is_input_error() {
        let err = DepotError::missing_column("IN DATE", "myt.csv");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().contains("IN DATE"));
    }

    #[test]
    fn test_config_errors_use_exit_code_two() {
        let err = DepotError::InvalidConfigValueError {
            field: "quantity".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_sheet_lists_available_sheets() {
        let err = DepotError::MissingSheetError {
            sheet: "DRY".to_string(),
            source_name: "stock.xlsx".to_string(),
            available: "Sheet1, REEFER".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.user_friendly_message().contains("Sheet1, REEFER"));
    }

    #[test]
    fn test_io_error_is_critical() {
        let err = DepotError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing.csv",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }
}
