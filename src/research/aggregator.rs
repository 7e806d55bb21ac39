//! Partial-failure tolerant fan-out over the data source adapters

use super::{DataSource, DataSourceAdapter, ResearchMaterial, SourceReport};
use crate::telemetry::ProgressSink;
use crate::types::{Result, SourceStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DataAggregator {
    adapters: Vec<Arc<dyn DataSourceAdapter>>,
    timeout: Duration,
}

impl DataAggregator {
    pub fn new(adapters: Vec<Arc<dyn DataSourceAdapter>>, timeout: Duration) -> Self {
        Self { adapters, timeout }
    }

    pub fn sources(&self) -> Vec<DataSource> {
        self.adapters.iter().map(|a| a.source()).collect()
    }

    /// Local mode: adapters are called one after another.
    pub async fn gather_sequential(
        &self,
        company: &str,
        ticker: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<ResearchMaterial> {
        let reports = self.collect_sequential(&self.sources(), company, ticker, sink).await;
        ResearchMaterial::new(company, ticker.map(str::to_string), reports).ensure_usable()
    }

    /// Calls only the adapters for `only`, sequentially. Used to fill in the
    /// sources a failed delegation did not deliver.
    pub async fn collect_sequential(
        &self,
        only: &[DataSource],
        company: &str,
        ticker: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Vec<SourceReport> {
        let mut reports = Vec::with_capacity(only.len());
        for adapter in self.adapters.iter().filter(|a| only.contains(&a.source())) {
            let source = adapter.source();
            sink.source_status(source, SourceStatus::Executing);
            let report = fetch_one(
                adapter.clone(),
                company.to_string(),
                ticker.map(str::to_string),
                self.timeout,
            )
            .await;
            record_report(&report, sink);
            reports.push(report);
        }
        reports
    }

    /// Delegated-executor mode: every adapter runs concurrently. Reports are
    /// forwarded to the sink as each one finishes.
    pub async fn collect_concurrent(
        &self,
        company: &str,
        ticker: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Vec<SourceReport> {
        let mut set = JoinSet::new();

        for adapter in &self.adapters {
            sink.source_status(adapter.source(), SourceStatus::Executing);
            set.spawn(fetch_one(
                adapter.clone(),
                company.to_string(),
                ticker.map(str::to_string),
                self.timeout,
            ));
        }

        let mut reports = Vec::with_capacity(self.adapters.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(report) => {
                    record_report(&report, sink);
                    reports.push(report);
                }
                Err(e) => warn!("Source task did not complete: {}", e),
            }
        }

        // A panicked adapter never reports; record it as failed.
        for source in self.sources() {
            if !reports.iter().any(|r| r.source == source) {
                let report = SourceReport::failed(source, "adapter task aborted");
                record_report(&report, sink);
                reports.push(report);
            }
        }

        reports
    }

    pub async fn gather_concurrent(
        &self,
        company: &str,
        ticker: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<ResearchMaterial> {
        let reports = self.collect_concurrent(company, ticker, sink).await;
        ResearchMaterial::new(company, ticker.map(str::to_string), reports).ensure_usable()
    }
}

async fn fetch_one(
    adapter: Arc<dyn DataSourceAdapter>,
    company: String,
    ticker: Option<String>,
    timeout: Duration,
) -> SourceReport {
    let source = adapter.source();
    match tokio::time::timeout(timeout, adapter.fetch(&company, ticker.as_deref())).await {
        Ok(Ok(data)) => SourceReport::from_data(source, data),
        Ok(Err(e)) => SourceReport::failed(source, e.to_string()),
        Err(_) => SourceReport::failed(source, format!("timed out after {}s", timeout.as_secs())),
    }
}

/// Forward one finished report to the sink: metrics, final status, a log line.
pub(crate) fn record_report(report: &SourceReport, sink: &dyn ProgressSink) {
    for (name, value) in &report.metrics {
        sink.metric(report.source, name, value);
    }
    sink.source_status(report.source, report.status);
    sink.report(report);

    match report.status {
        SourceStatus::Failed => {
            let reason = report.error.as_deref().unwrap_or("failed");
            warn!(source = %report.source, "Source failed: {}", reason);
            sink.log(&format!("{} failed: {}", report.source, reason));
        }
        SourceStatus::Partial => {
            info!(source = %report.source, missing = report.missing.len(), "Source returned partial data");
            sink.log(&format!(
                "{} returned partial data ({} missing)",
                report.source,
                report.missing.len()
            ));
        }
        _ => {
            info!(source = %report.source, metrics = report.metrics.len(), "Source completed");
            sink.log(&format!("{} returned {} metrics", report.source, report.metrics.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::SourceData;
    use crate::telemetry::NoopSink;
    use async_trait::async_trait;
    use serde_json::json;

    struct Slow(DataSource, Duration);

    #[async_trait]
    impl DataSourceAdapter for Slow {
        fn source(&self) -> DataSource {
            self.0
        }

        async fn fetch(&self, _company: &str, _ticker: Option<&str>) -> Result<SourceData> {
            tokio::time::sleep(self.1).await;
            let mut data = SourceData::default();
            data.metrics.insert("value".into(), json!(1));
            Ok(data)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_adapter_is_failed() {
        let aggregator = DataAggregator::new(
            vec![
                Arc::new(Slow(DataSource::Macro, Duration::from_secs(1))) as Arc<dyn DataSourceAdapter>,
                Arc::new(Slow(DataSource::News, Duration::from_secs(60))),
            ],
            Duration::from_secs(5),
        );

        let material = aggregator
            .gather_sequential("Acme", None, &NoopSink)
            .await
            .unwrap();

        assert_eq!(material.usable_sources(), vec![DataSource::Macro]);
        let news = material.report(DataSource::News).unwrap();
        assert_eq!(news.status, SourceStatus::Failed);
        assert!(news.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_gather_runs_sources_in_parallel() {
        let aggregator = DataAggregator::new(
            DataSource::ALL
                .iter()
                .map(|s| Arc::new(Slow(*s, Duration::from_secs(4))) as Arc<dyn DataSourceAdapter>)
                .collect(),
            Duration::from_secs(5),
        );

        let started = tokio::time::Instant::now();
        let material = aggregator
            .gather_concurrent("Acme", Some("ACME"), &NoopSink)
            .await
            .unwrap();

        assert_eq!(material.usable_sources().len(), 6);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn collect_only_requested_sources() {
        let aggregator = DataAggregator::new(
            DataSource::ALL
                .iter()
                .map(|s| Arc::new(Slow(*s, Duration::ZERO)) as Arc<dyn DataSourceAdapter>)
                .collect(),
            Duration::from_secs(5),
        );

        let reports = aggregator
            .collect_sequential(&[DataSource::Valuation, DataSource::Sentiment], "Acme", None, &NoopSink)
            .await;
        let sources: Vec<DataSource> = reports.iter().map(|r| r.source).collect();
        assert_eq!(sources, vec![DataSource::Valuation, DataSource::Sentiment]);
    }
}
