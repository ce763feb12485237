use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::report::TimeRange;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub source: SourceSettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub print: PrintSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Http,
    Fixtures,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fixtures_dir: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default)]
    pub default_range: TimeRange,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            currency_symbol: default_currency_symbol(),
            default_range: TimeRange::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrintSettings {
    #[serde(default = "default_typst_bin")]
    pub typst_bin: String,
    #[serde(default = "default_cleanup_timeout_secs")]
    pub cleanup_timeout_secs: u64,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            typst_bin: default_typst_bin(),
            cleanup_timeout_secs: default_cleanup_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> usize {
    10
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_output_dir() -> String {
    "exports".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_typst_bin() -> String {
    "typst".to_string()
}

fn default_cleanup_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.report.page_size == 0 {
            return Err(ReportError::InvalidSetting {
                key: "report.page_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        self.delimiter()?;
        match self.source.kind {
            SourceKind::Http if self.source.base_url.is_none() => {
                Err(ReportError::InvalidSetting {
                    key: "source.base_url".to_string(),
                    reason: "required when source.kind = \"http\"".to_string(),
                })
            }
            SourceKind::Fixtures if self.source.fixtures_dir.is_none() => {
                Err(ReportError::InvalidSetting {
                    key: "source.fixtures_dir".to_string(),
                    reason: "required when source.kind = \"fixtures\"".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// The export delimiter as a single byte.
    pub fn delimiter(&self) -> Result<u8> {
        match self.export.delimiter.as_bytes() {
            [b] if *b != b'"' && *b != b'\n' => Ok(*b),
            _ => Err(ReportError::InvalidSetting {
                key: "export.delimiter".to_string(),
                reason: format!(
                    "'{}' is not a single ASCII character other than a quote or newline",
                    self.export.delimiter
                ),
            }),
        }
    }
}
