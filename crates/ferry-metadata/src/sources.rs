//! Ranked remote title databases and index aggregation.

use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{MetadataError, MetadataResult};
use crate::index::FuzzyIndex;

/// One remote source; lower `priority` values win key collisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataSource {
    /// Short label used in logs and reports.
    pub name: String,
    /// HTTP(S) location of the JSON payload.
    pub url: String,
    /// One-based rank.
    pub priority: u32,
}

impl MetadataSource {
    /// Rank `(name, url)` pairs by list position, starting at 1.
    #[must_use]
    pub fn ranked<I, N, U>(pairs: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        pairs
            .into_iter()
            .zip(1_u32..)
            .map(|((name, url), priority)| Self {
                name: name.into(),
                url: url.into(),
                priority,
            })
            .collect()
    }
}

/// Per-source outcome of an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Source label.
    pub name: String,
    /// Source rank.
    pub priority: u32,
    /// Records carrying both an id and a name.
    pub records: usize,
    /// Keys this source added that no higher-ranked source had claimed.
    pub keys_added: usize,
}

/// Summary of an aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationReport {
    /// Successful sources in priority order.
    pub sources: Vec<SourceReport>,
    /// Labels of sources that failed and were excluded.
    pub failed: Vec<String>,
    /// Total keys in the resulting index.
    pub keys: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TitleRecord {
    id: String,
    name: String,
}

/// Fetches every configured source and builds a fresh [`FuzzyIndex`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: reqwest::Client,
    sources: Vec<MetadataSource>,
}

impl Aggregator {
    /// Build an aggregator with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::ClientBuild`] when the TLS backend cannot initialise.
    pub fn new(sources: Vec<MetadataSource>, request_timeout: Duration) -> MetadataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| MetadataError::ClientBuild { source })?;
        Ok(Self::with_client(client, sources))
    }

    /// Build an aggregator around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, sources: Vec<MetadataSource>) -> Self {
        Self { client, sources }
    }

    /// Configured sources.
    #[must_use]
    pub fn sources(&self) -> &[MetadataSource] {
        &self.sources
    }

    /// Fetch all sources in parallel and rebuild the index from scratch.
    ///
    /// Failed sources are logged and excluded; the rest are applied in
    /// ascending priority order so the best-ranked source claims shared keys.
    pub async fn aggregate(&self) -> (FuzzyIndex, AggregationReport) {
        let fetches = self.sources.iter().map(|source| async move {
            let outcome = self.fetch(source).await;
            (source, outcome)
        });
        let mut outcomes = join_all(fetches).await;
        outcomes.sort_by_key(|(source, _)| source.priority);

        let mut index = FuzzyIndex::new();
        let mut report = AggregationReport::default();
        for (source, outcome) in outcomes {
            match outcome {
                Ok(records) => {
                    let keys_added: usize = records
                        .iter()
                        .map(|record| index.insert_record(&record.name, &record.id))
                        .sum();
                    info!(
                        source = %source.name,
                        priority = source.priority,
                        records = records.len(),
                        keys_added,
                        "metadata source applied"
                    );
                    report.sources.push(SourceReport {
                        name: source.name.clone(),
                        priority: source.priority,
                        records: records.len(),
                        keys_added,
                    });
                }
                Err(err) => {
                    warn!(
                        source = %source.name,
                        error = %err,
                        "metadata source failed; excluded from index"
                    );
                    report.failed.push(source.name.clone());
                }
            }
        }
        report.keys = index.len();
        (index, report)
    }

    async fn fetch(&self, source: &MetadataSource) -> MetadataResult<Vec<TitleRecord>> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|err| MetadataError::Fetch {
                name: source.name.clone(),
                source: err,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                name: source.name.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(|err| MetadataError::Fetch {
            name: source.name.clone(),
            source: err,
        })?;
        let value: Value = serde_json::from_slice(&body).map_err(|err| MetadataError::Decode {
            name: source.name.clone(),
            source: err,
        })?;
        parse_records(&source.name, value)
    }
}

/// Accept either an array of records or an object whose values are records.
fn parse_records(name: &str, value: Value) -> MetadataResult<Vec<TitleRecord>> {
    let items: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, item)| item).collect(),
        _ => {
            return Err(MetadataError::Shape {
                name: name.to_string(),
            });
        }
    };
    Ok(items.iter().filter_map(title_record).collect())
}

fn title_record(item: &Value) -> Option<TitleRecord> {
    let id = match item.get("id")? {
        Value::String(id) => id.trim().to_string(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    let name = item.get("name")?.as_str()?.trim().to_string();
    (!id.is_empty() && !name.is_empty()).then_some(TitleRecord { id, name })
}
