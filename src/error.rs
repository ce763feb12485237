use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Config directory not found at {0}. Run 'opsreport init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Data source unavailable for {dataset}: {reason}")]
    SourceUnavailable { dataset: String, reason: String },

    #[error("Malformed {dataset} payload: {reason}")]
    MalformedPayload { dataset: String, reason: String },

    #[error("Unknown dataset '{0}'. Use one of: aging, compliance, sla, trends")]
    UnknownDataset(String),

    #[error("Unknown filter '{slot}' for {dataset}. Run 'opsreport filters {dataset}' to list them.")]
    UnknownFilterSlot { dataset: String, slot: String },

    #[error("Invalid value '{value}' for filter '{slot}'. Expected one of: {expected}")]
    InvalidFilterValue {
        slot: String,
        value: String,
        expected: String,
    },

    #[error("Invalid filter '{0}'. Expected 'slot=value' (e.g., 'status=overdue')")]
    InvalidFilterSpec(String),

    #[error("Invalid range '{0}'. Use one of: week, month, quarter, year")]
    InvalidRange(String),

    #[error("Invalid export format '{0}'. Use 'csv' or 'pdf'")]
    InvalidFormat(String),

    #[error("Failed to serialize rows: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Print surface unavailable: {0}")]
    RenderSurfaceUnavailable(String),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to print report: {0}")]
    PrintFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
