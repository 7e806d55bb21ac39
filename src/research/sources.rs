//! Data source adapters

use super::{DaedraSearch, DataSource, NewsAdapter};
use crate::types::{AppError, Result};
use crate::utils::toml_config::ResearchConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metrics returned by one adapter call
///
/// A non-empty `missing` list alongside some metrics is a partial result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub missing: Vec<String>,
}

#[async_trait]
pub trait DataSourceAdapter: Send + Sync {
    fn source(&self) -> DataSource;

    async fn fetch(&self, company: &str, ticker: Option<&str>) -> Result<SourceData>;
}

/// Adapter for a structured metric service answering
/// `GET {base_url}?company=..&ticker=..` with a [`SourceData`] body.
pub struct HttpSourceAdapter {
    http: reqwest::Client,
    source: DataSource,
    base_url: Option<String>,
}

impl HttpSourceAdapter {
    pub fn new(http: reqwest::Client, source: DataSource, base_url: Option<String>) -> Self {
        Self {
            http,
            source,
            base_url,
        }
    }
}

#[async_trait]
impl DataSourceAdapter for HttpSourceAdapter {
    fn source(&self) -> DataSource {
        self.source
    }

    async fn fetch(&self, company: &str, ticker: Option<&str>) -> Result<SourceData> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            AppError::DataSource(format!("no endpoint configured for {}", self.source))
        })?;

        let mut query = vec![("company", company)];
        if let Some(t) = ticker {
            query.push(("ticker", t));
        }

        let response = self
            .http
            .get(base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::DataSource(format!("{}: {}", self.source, e)))?;

        if !response.status().is_success() {
            return Err(AppError::DataSource(format!(
                "{}: HTTP {}",
                self.source,
                response.status().as_u16()
            )));
        }

        response
            .json::<SourceData>()
            .await
            .map_err(|e| AppError::DataSource(format!("{}: invalid payload: {}", self.source, e)))
    }
}

/// One adapter per data source, wired from configuration
pub fn adapters_from_config(
    config: &ResearchConfig,
    http: reqwest::Client,
) -> Vec<Arc<dyn DataSourceAdapter>> {
    let endpoints = &config.sources;
    DataSource::ALL
        .iter()
        .map(|source| -> Arc<dyn DataSourceAdapter> {
            let url = match source {
                DataSource::Fundamentals => endpoints.fundamentals.clone(),
                DataSource::Valuation => endpoints.valuation.clone(),
                DataSource::Volatility => endpoints.volatility.clone(),
                DataSource::Macro => endpoints.macro_economy.clone(),
                DataSource::Sentiment => endpoints.sentiment.clone(),
                DataSource::News => {
                    return Arc::new(NewsAdapter::new(
                        Arc::new(DaedraSearch::new()),
                        config.news_results,
                    ))
                }
            };
            Arc::new(HttpSourceAdapter::new(http.clone(), *source, url))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_metrics_with_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/valuation"))
            .and(query_param("ticker", "ACME"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metrics": {"pe_ratio": 21.3},
                "missing": ["peg_ratio"]
            })))
            .mount(&server)
            .await;

        let adapter = HttpSourceAdapter::new(
            reqwest::Client::new(),
            DataSource::Valuation,
            Some(format!("{}/valuation", server.uri())),
        );
        let data = adapter.fetch("Acme", Some("ACME")).await.unwrap();

        assert_eq!(data.metrics["pe_ratio"], json!(21.3));
        assert_eq!(data.missing, vec!["peg_ratio".to_string()]);
    }

    #[tokio::test]
    async fn server_error_is_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter =
            HttpSourceAdapter::new(reqwest::Client::new(), DataSource::Macro, Some(server.uri()));
        let err = adapter.fetch("Acme", None).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn unconfigured_endpoint_fails() {
        let adapter = HttpSourceAdapter::new(reqwest::Client::new(), DataSource::Volatility, None);
        assert!(adapter.fetch("Acme", None).await.is_err());
    }

    #[test]
    fn config_wires_all_six_sources() {
        let adapters = adapters_from_config(&ResearchConfig::default(), reqwest::Client::new());
        let sources: Vec<DataSource> = adapters.iter().map(|a| a.source()).collect();
        assert_eq!(sources, DataSource::ALL.to_vec());
    }
}
