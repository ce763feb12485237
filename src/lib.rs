pub mod config;
pub mod error;
pub mod export;
pub mod pdf;
pub mod report;
pub mod source;

pub use config::{Config, SourceKind};
pub use error::{ReportError, Result};
pub use report::{Dashboard, DatasetId, DatasetView, TimeRange};
pub use source::DataSource;
