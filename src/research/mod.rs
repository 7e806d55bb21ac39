//! Data gathering from the six research sources
//!
//! Each source is served by a [`DataSourceAdapter`]. The [`DataAggregator`]
//! calls them under a per-adapter timeout, tolerates partial failure and
//! produces a single [`ResearchMaterial`] for the analysis steps.

pub mod aggregator;
pub mod search;
pub mod sources;

pub use aggregator::DataAggregator;
pub use search::{Article, DaedraSearch, NewsAdapter, SearchClient};
pub use sources::{adapters_from_config, DataSourceAdapter, HttpSourceAdapter, SourceData};

use crate::types::{AppError, Result, SourceStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

/// The closed set of data sources shown in `mcp_status`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Fundamentals,
    Valuation,
    Volatility,
    Macro,
    News,
    Sentiment,
}

impl DataSource {
    pub const ALL: [DataSource; 6] = [
        DataSource::Fundamentals,
        DataSource::Valuation,
        DataSource::Volatility,
        DataSource::Macro,
        DataSource::News,
        DataSource::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Fundamentals => "fundamentals",
            DataSource::Valuation => "valuation",
            DataSource::Volatility => "volatility",
            DataSource::Macro => "macro",
            DataSource::News => "news",
            DataSource::Sentiment => "sentiment",
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            DataSource::Fundamentals => "FUNDAMENTALS",
            DataSource::Valuation => "VALUATION",
            DataSource::Volatility => "VOLATILITY/RISK",
            DataSource::Macro => "MACROECONOMIC ENVIRONMENT",
            DataSource::News => "RECENT NEWS",
            DataSource::Sentiment => "MARKET SENTIMENT",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one adapter call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SourceReport {
    pub source: DataSource,
    /// Completed, partial or failed
    pub status: SourceStatus,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub missing: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceReport {
    pub fn from_data(source: DataSource, data: SourceData) -> Self {
        let (status, error) = if data.metrics.is_empty() {
            (SourceStatus::Failed, Some("no metrics returned".to_string()))
        } else if data.missing.is_empty() {
            (SourceStatus::Completed, None)
        } else {
            (SourceStatus::Partial, None)
        };

        Self {
            source,
            status,
            metrics: data.metrics,
            missing: data.missing,
            error,
        }
    }

    pub fn failed(source: DataSource, error: impl Into<String>) -> Self {
        Self {
            source,
            status: SourceStatus::Failed,
            metrics: BTreeMap::new(),
            missing: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.status != SourceStatus::Failed
    }
}

/// Raw research material handed from the researcher to the analysis steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchMaterial {
    pub company: String,
    pub ticker: Option<String>,
    pub reports: Vec<SourceReport>,
}

pub const GROUNDING_LIMIT: usize = 4000;

impl ResearchMaterial {
    pub fn new(company: impl Into<String>, ticker: Option<String>, reports: Vec<SourceReport>) -> Self {
        let mut material = Self {
            company: company.into(),
            ticker,
            reports,
        };
        material.reports.sort_by_key(|r| r.source);
        material
    }

    /// Fails with `AllSourcesFailed` unless at least one source is usable
    pub fn ensure_usable(self) -> Result<Self> {
        if self.reports.iter().any(SourceReport::is_usable) {
            return Ok(self);
        }
        let detail = self
            .reports
            .iter()
            .map(|r| format!("{}: {}", r.source, r.error.as_deref().unwrap_or("failed")))
            .collect::<Vec<_>>()
            .join("; ");
        Err(AppError::AllSourcesFailed(detail))
    }

    pub fn usable_sources(&self) -> Vec<DataSource> {
        self.reports
            .iter()
            .filter(|r| r.is_usable())
            .map(|r| r.source)
            .collect()
    }

    pub fn failed_sources(&self) -> Vec<DataSource> {
        self.reports
            .iter()
            .filter(|r| !r.is_usable())
            .map(|r| r.source)
            .collect()
    }

    pub fn report(&self, source: DataSource) -> Option<&SourceReport> {
        self.reports.iter().find(|r| r.source == source)
    }

    /// Sectioned plain text for prompts
    pub fn render(&self) -> String {
        let mut lines = vec![format!(
            "Company: {} ({})",
            self.company,
            self.ticker.as_deref().unwrap_or("N/A")
        )];
        lines.push(String::new());

        for report in self.reports.iter().filter(|r| r.is_usable()) {
            lines.push(format!("=== {} ===", report.source.heading()));
            for (name, value) in &report.metrics {
                lines.push(format!("- {}: {}", name, render_value(value)));
            }
            if !report.missing.is_empty() {
                lines.push(format!("- Not available: {}", report.missing.join(", ")));
            }
            lines.push(String::new());
        }

        let failed = self.failed_sources();
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|s| s.as_str()).collect();
            lines.push(format!("Unavailable sources: {}", names.join(", ")));
        }

        lines.join("\n")
    }

    /// [`render`](Self::render) cut to `limit` characters
    pub fn render_truncated(&self, limit: usize) -> String {
        let full = self.render();
        if full.chars().count() <= limit {
            return full;
        }
        let mut cut: String = full.chars().take(limit).collect();
        cut.push_str("\n... [truncated]");
        cut
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
