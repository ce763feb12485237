use std::fs;
use std::path::PathBuf;

use super::{
    decode, decode_records, DataSource, RawAgingRecord, RawCompliance, RawSlaBreaches,
    RawSummary, RawTrendPoint,
};
use crate::error::{ReportError, Result};
use crate::report::TimeRange;

/// Offline source reading one JSON file per dataset from a directory.
///
/// Range-scoped payloads look for `<name>_<range>.json` first and fall back
/// to `<name>.json`.
pub struct FixtureSource {
    dir: PathBuf,
}

impl FixtureSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn read(&self, dataset: &str, candidates: &[String]) -> Result<String> {
        for name in candidates {
            let path = self.dir.join(name);
            if path.exists() {
                log::debug!("reading fixture {}", path.display());
                return Ok(fs::read_to_string(&path)?);
            }
        }
        Err(ReportError::SourceUnavailable {
            dataset: dataset.to_string(),
            reason: format!("no {} in {}", candidates.join(" or "), self.dir.display()),
        })
    }

    fn read_ranged(&self, dataset: &str, range: TimeRange) -> Result<String> {
        self.read(
            dataset,
            &[
                format!("{dataset}_{range}.json"),
                format!("{dataset}.json"),
            ],
        )
    }
}

impl DataSource for FixtureSource {
    fn fetch_aging(&self) -> Result<Vec<RawAgingRecord>> {
        decode_records("aging", &self.read("aging", &["aging.json".to_string()])?)
    }

    fn fetch_compliance(&self) -> Result<RawCompliance> {
        decode(
            "compliance",
            &self.read("compliance", &["compliance.json".to_string()])?,
        )
    }

    fn fetch_sla_breaches(&self) -> Result<RawSlaBreaches> {
        decode("sla", &self.read("sla", &["sla_breaches.json".to_string()])?)
    }

    fn fetch_summary(&self, range: TimeRange) -> Result<RawSummary> {
        decode("summary", &self.read_ranged("summary", range)?)
    }

    fn fetch_trends(&self, range: TimeRange) -> Result<Vec<RawTrendPoint>> {
        decode_records("trends", &self.read_ranged("trends", range)?)
    }
}
