//! Elasticsearch bulk sink.
//!
//! One `_bulk` POST per poll: ndjson of `create` action lines and
//! document sources, against a date-suffixed index. Documents get an
//! `@timestamp` stamped at POST time when the collector didn't set
//! one. A failed POST is retried once after a short pause; the batch
//! is dropped either way, so a sink outage costs polls, not memory.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use fabricbeat_api::transport::TransportConfig;
use fabricbeat_config::{Config, IndexRotate};
use fabricbeat_core::Document;

use crate::error::CliError;

const RETRY_ATTEMPTS: u32 = 2;
const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Bulk responses are large; only the error flag matters here.
#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
}

pub struct ElasticSink {
    http: reqwest::Client,
    base_url: Url,
    index: String,
    rotate: IndexRotate,
    username: String,
    password: SecretString,
}

impl ElasticSink {
    pub fn new(config: &Config) -> Result<Self, CliError> {
        let base_url = Url::parse(&config.elastic_host).map_err(|e| CliError::Validation {
            field: "elastic_host".into(),
            reason: format!("invalid URL '{}': {e}", config.elastic_host),
        })?;

        let http = TransportConfig::default()
            .build_client()
            .map_err(|e| CliError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            index: config.elastic_index.clone(),
            rotate: config.elastic_index_rotate,
            username: config.elastic_username.clone(),
            password: config.elastic_password.clone(),
        })
    }

    /// POST one poll's documents. Returns the number of documents
    /// indexed; an empty batch is a no-op.
    pub async fn post(&self, mut docs: Vec<Document>) -> Result<usize, CliError> {
        if docs.is_empty() {
            debug!("nothing to post");
            return Ok(0);
        }

        let index = format!(
            "{}-{}",
            self.index,
            Utc::now().format(self.rotate.suffix_format())
        );
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        for doc in &mut docs {
            doc.entry("@timestamp".to_owned())
                .or_insert_with(|| timestamp.clone().into());
        }

        let count = docs.len();
        let body = bulk_body(&index, docs);

        let mut attempts_left = RETRY_ATTEMPTS;
        loop {
            match self.try_post(body.clone()).await {
                Ok(()) => {
                    info!(index = %index, documents = count, "bulk POST succeeded");
                    return Ok(count);
                }
                Err(err) => {
                    attempts_left -= 1;
                    if attempts_left == 0 {
                        return Err(err);
                    }
                    info!("bulk POST failed, retrying: {err}");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
    }

    async fn try_post(&self, body: String) -> Result<(), CliError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/_bulk")).map_err(|e| CliError::Sink {
            message: format!("invalid bulk URL: {e}"),
        })?;

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| CliError::Sink {
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CliError::Sink {
                message: format!("HTTP {status}: {}", &body[..body.len().min(200)]),
            });
        }

        let bulk: BulkResponse = resp.json().await.map_err(|e| CliError::Sink {
            message: format!("unreadable bulk response: {e}"),
        })?;
        if bulk.errors {
            return Err(CliError::Sink {
                message: "bulk response reported per-document errors".into(),
            });
        }
        Ok(())
    }
}

/// Render the ndjson payload: one `create` action line per document.
fn bulk_body(index: &str, docs: Vec<Document>) -> String {
    let action = serde_json::json!({ "create": { "_index": index } }).to_string();
    let mut body = String::new();
    for doc in docs {
        body.push_str(&action);
        body.push('\n');
        body.push_str(&serde_json::Value::Object(doc).to_string());
        body.push('\n');
    }
    body
}
