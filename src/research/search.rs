//! News source backed by web search
//!
//! Search goes through the [`SearchClient`] seam; [`DaedraSearch`] is the
//! production client, using the daedra crate (DuckDuckGo backend).

use super::{DataSource, DataSourceAdapter, SourceData};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<Article>>;
}

/// Web search powered by daedra
#[derive(Debug, Default, Clone, Copy)]
pub struct DaedraSearch;

impl DaedraSearch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchClient for DaedraSearch {
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<Article>> {
        let search_args = daedra::SearchArgs {
            query: text.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: limit,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::DataSource(format!("news search failed: {}", e)))?;

        Ok(response
            .data
            .iter()
            .map(|r| Article {
                title: r.title.clone(),
                url: r.url.clone(),
                snippet: r.description.clone(),
            })
            .collect())
    }
}

pub struct NewsAdapter {
    search: Arc<dyn SearchClient>,
    limit: usize,
}

impl NewsAdapter {
    pub fn new(search: Arc<dyn SearchClient>, limit: usize) -> Self {
        Self {
            search,
            limit: limit.max(1),
        }
    }
}

#[async_trait]
impl DataSourceAdapter for NewsAdapter {
    fn source(&self) -> DataSource {
        DataSource::News
    }

    async fn fetch(&self, company: &str, ticker: Option<&str>) -> Result<SourceData> {
        let query = match ticker {
            Some(t) => format!("{} {} stock news", company, t),
            None => format!("{} company news", company),
        };

        let articles = self.search.query(&query, self.limit).await?;
        if articles.is_empty() {
            return Err(AppError::DataSource(format!("no news found for {}", company)));
        }

        let mut metrics = BTreeMap::new();
        metrics.insert("article_count".to_string(), json!(articles.len()));
        for (i, article) in articles.iter().enumerate() {
            let title: String = article.title.chars().take(100).collect();
            metrics.insert(format!("headline_{}", i + 1), json!(title));
        }

        // Fewer results than requested is still usable news coverage.
        let missing = if articles.len() < self.limit {
            vec![format!("headlines {}..{}", articles.len() + 1, self.limit)]
        } else {
            Vec::new()
        };

        Ok(SourceData { metrics, missing })
    }
}
