use std::time::Duration;
use ureq::Agent;

use super::{
    decode, decode_records, DataSource, RawAgingRecord, RawCompliance, RawSlaBreaches,
    RawSummary, RawTrendPoint,
};
use crate::error::{ReportError, Result};
use crate::report::TimeRange;

/// Remote reporting API reached over HTTP.
pub struct HttpSource {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: String, token: Option<String>, timeout_secs: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn get(&self, dataset: &str, path: &str, range: Option<TimeRange>) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("GET {url}");

        let mut request = self.agent.get(&url);
        if let Some(range) = range {
            request = request.query("range", range.as_str());
        }
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let unavailable = |e: ureq::Error| ReportError::SourceUnavailable {
            dataset: dataset.to_string(),
            reason: e.to_string(),
        };

        request
            .call()
            .map_err(unavailable)?
            .body_mut()
            .read_to_string()
            .map_err(unavailable)
    }
}

impl DataSource for HttpSource {
    fn fetch_aging(&self) -> Result<Vec<RawAgingRecord>> {
        decode_records("aging", &self.get("aging", "aging", None)?)
    }

    fn fetch_compliance(&self) -> Result<RawCompliance> {
        decode("compliance", &self.get("compliance", "compliance", None)?)
    }

    fn fetch_sla_breaches(&self) -> Result<RawSlaBreaches> {
        decode("sla", &self.get("sla", "sla-breaches", None)?)
    }

    fn fetch_summary(&self, range: TimeRange) -> Result<RawSummary> {
        decode("summary", &self.get("summary", "summary", Some(range))?)
    }

    fn fetch_trends(&self, range: TimeRange) -> Result<Vec<RawTrendPoint>> {
        decode_records("trends", &self.get("trends", "trends", Some(range))?)
    }
}
