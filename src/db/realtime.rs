use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{LikeOutcome, TipFilter, TipKey, TipRow};

use super::TipSource;

// Compare-and-swap attempts before a counter update is reported as failed.
const MAX_CAS_ATTEMPTS: usize = 5;

/// Client for a hosted realtime database exposing its tree over REST
/// (`<path>.json`). Tips live at `tips/<situation>/<language>/<id>` and
/// per-user likes at `user_likes/<uid>/<tipId>`.
pub struct RealtimeClient {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
    user_id: String,
}

impl RealtimeClient {
    pub fn new(base_url: &str, auth_token: Option<String>, user_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("tip-station/1.0")
            .build()?;

        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            auth_token,
            user_id,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.join(&format!("{path}.json"))?;
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    fn tip_path(key: &TipKey) -> String {
        format!("tips/{}/{}/{}", key.situation, key.language, key.id)
    }

    async fn get_value(&self, path: &str) -> Result<Value> {
        let response = self.client.get(self.endpoint(path)?).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Query(format!(
                "GET {path}: HTTP {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn put_value(&self, path: &str, value: &Value) -> Result<()> {
        let response = self
            .client
            .put(self.endpoint(path)?)
            .json(value)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::Query(format!(
                "PUT {path}: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Atomically adds one to `field` of a tip using ETag conditional writes.
    async fn increment_field(&self, key: &TipKey, field: &str) -> Result<()> {
        let path = Self::tip_path(key);
        let url = self.endpoint(&path)?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let response = self
                .client
                .get(url.clone())
                .header("X-Firebase-ETag", "true")
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(AppError::Query(format!(
                    "GET {path}: HTTP {}",
                    response.status()
                )));
            }

            let etag = response
                .headers()
                .get("etag")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| AppError::Query(format!("GET {path}: missing ETag")))?;
            let current: Value = response.json().await?;

            let Some(updated) = bump_counter(current, field) else {
                return Err(AppError::NotFound(format!("tip '{}'", key.id)));
            };

            let response = self
                .client
                .put(url.clone())
                .header("if-match", etag)
                .json(&updated)
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => return Ok(()),
                StatusCode::PRECONDITION_FAILED => {
                    tracing::debug!("Conflict updating {} on {}, attempt {}", field, path, attempt);
                }
                status => {
                    return Err(AppError::Query(format!("PUT {path}: HTTP {status}")));
                }
            }
        }

        Err(anyhow::anyhow!("gave up updating {field} on {path} after {MAX_CAS_ATTEMPTS} conflicts").into())
    }
}

#[async_trait]
impl TipSource for RealtimeClient {
    async fn fetch_all(&self, filter: &TipFilter) -> Result<Vec<TipRow>> {
        let snapshot = self.get_value("tips").await?;
        let rows = flatten_snapshot(&snapshot)
            .into_iter()
            .filter(|row| {
                let situation = row.situation.as_deref().and_then(|s| s.parse().ok());
                let language = row.language.as_deref().and_then(|l| l.parse().ok());
                match (situation, language) {
                    (Some(situation), Some(language)) => filter.matches(situation, language),
                    // Unfiltered reads keep malformed rows so reshape can count them.
                    _ => filter.situation.is_none() && filter.language.is_none(),
                }
            })
            .collect();
        Ok(rows)
    }

    async fn increment_like(&self, key: &TipKey) -> Result<LikeOutcome> {
        let like_path = format!("user_likes/{}/{}", self.user_id, key.id);
        if !self.get_value(&like_path).await?.is_null() {
            tracing::info!("Tip {} already liked by {}", key.id, self.user_id);
            return Ok(LikeOutcome::AlreadyLiked);
        }

        // Count first; a failed increment must not leave a marker behind.
        self.increment_field(key, "likes").await?;
        self.put_value(&like_path, &Value::Bool(true)).await?;
        Ok(LikeOutcome::Recorded)
    }

    async fn get_like_count(&self, key: &TipKey) -> Result<i64> {
        let value = self
            .get_value(&format!("{}/likes", Self::tip_path(key)))
            .await?;
        Ok(value.as_i64().unwrap_or(0))
    }

    async fn increment_display_count(&self, key: &TipKey) -> Result<()> {
        self.increment_field(key, "display_count").await
    }
}

/// Turns the `tips` subtree into rows. Buckets may be objects keyed by tip
/// id or plain arrays (ids become `<situation>_<index>`); a tip may be an
/// object or a bare content string.
fn flatten_snapshot(snapshot: &Value) -> Vec<TipRow> {
    let mut rows = Vec::new();
    let Some(situations) = snapshot.as_object() else {
        return rows;
    };

    for (situation, languages) in situations {
        let Some(languages) = languages.as_object() else {
            continue;
        };
        for (language, bucket) in languages {
            let children: Vec<(String, &Value)> = match bucket {
                Value::Object(map) => map.iter().map(|(id, tip)| (id.clone(), tip)).collect(),
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .filter(|(_, tip)| !tip.is_null())
                    .map(|(i, tip)| (format!("{situation}_{i}"), tip))
                    .collect(),
                _ => continue,
            };

            for (id, tip) in children {
                rows.push(tip_row(id, situation, language, tip));
            }
        }
    }

    rows
}

fn tip_row(id: String, situation: &str, language: &str, tip: &Value) -> TipRow {
    let (content, fields) = match tip {
        Value::String(content) => (Some(content.clone()), None),
        Value::Object(fields) => (
            fields.get("content").and_then(Value::as_str).map(str::to_string),
            Some(fields),
        ),
        _ => (None, None),
    };

    let counter = |name: &str| -> i64 {
        fields
            .and_then(|f| f.get(name))
            .and_then(Value::as_i64)
            .unwrap_or(0)
    };

    TipRow {
        id,
        situation: Some(situation.to_string()),
        language: Some(language.to_string()),
        content,
        likes: counter("likes"),
        display_count: counter("display_count"),
        is_active: fields
            .and_then(|f| f.get("is_active"))
            .and_then(Value::as_bool)
            .unwrap_or(true),
    }
}

/// Returns the tip with `field` incremented, or `None` when the tip is absent.
/// Other fields, including any stored `weight`, are left as they are.
fn bump_counter(current: Value, field: &str) -> Option<Value> {
    let mut fields = match current {
        Value::Null => return None,
        Value::Object(fields) => fields,
        Value::String(content) => {
            let mut fields = Map::new();
            fields.insert("content".to_string(), Value::String(content));
            fields
        }
        _ => return None,
    };

    let next = fields.get(field).and_then(Value::as_i64).unwrap_or(0) + 1;
    fields.insert(field.to_string(), Value::from(next));
    Some(Value::Object(fields))
}
