use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("corrupt value for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Key-value store with per-entry expiry. Expired entries read as absent.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, StoreError>;
    async fn put(
        &self,
        key: &str,
        value: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError>;
}

// ========== IN-MEMORY STORE ==========

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= now => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        // Sweep on write so keys that never come back do not accumulate.
        entries.retain(|_, (_, exp)| *exp > now);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }
}

// ========== DYNAMODB STORE ==========

/// Items carry a numeric `expires_at` attribute for the table's TTL setting.
/// DynamoDB deletes lazily, so reads also check expiry.
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(format!("RATELIMIT#{}", key)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("{:?}", e)))?;

        let Some(item) = result.item() else {
            return Ok(None);
        };

        let expires_at = item
            .get("expires_at")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or(0);
        if expires_at <= now.timestamp() {
            return Ok(None);
        }

        item.get("value")
            .and_then(|v| v.as_s().ok())
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| StoreError::Corrupt {
                key: key.to_string(),
                reason: "missing value attribute".to_string(),
            })
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = now + ttl;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(format!("RATELIMIT#{}", key)))
            .item("value", AttributeValue::S(value))
            .item(
                "expires_at",
                AttributeValue::N(expires_at.timestamp().to_string()),
            )
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("{:?}", e)))?;
        Ok(())
    }
}

// ========== SLIDING WINDOW ==========

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest counted hit leaves the window
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until another request would be accepted
    pub retry_after_secs: i64,
}

/// Sliding-log limiter: each key stores the millisecond timestamps of its
/// accepted hits inside the window.
pub struct SlidingWindowLimiter {
    store: Arc<dyn KeyValueStore>,
    limit: u32,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, limit: u32, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a hit for `key` at `now` unless the key is already at its limit.
    /// Store failures allow the request.
    pub async fn check(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        match self.try_check(key, now).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(key = %key, "rate-limit store unavailable, allowing: {}", e);
                RateLimitDecision {
                    allowed: true,
                    limit: self.limit,
                    remaining: self.limit.saturating_sub(1),
                    reset_at: now + self.window,
                    retry_after_secs: 0,
                }
            }
        }
    }

    async fn try_check(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, StoreError> {
        let window_start = (now - self.window).timestamp_millis();
        let mut hits: Vec<i64> = match self.store.get(key, now).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?,
            None => Vec::new(),
        };
        hits.retain(|&t| t > window_start);
        hits.sort_unstable();

        let used = hits.len() as u32;
        if used >= self.limit {
            let oldest = hits.first().copied().unwrap_or_else(|| now.timestamp_millis());
            let reset_at = DateTime::<Utc>::from_timestamp_millis(oldest)
                .unwrap_or(now)
                + self.window;
            let wait_ms = (reset_at - now).num_milliseconds().max(0);
            return Ok(RateLimitDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_at,
                retry_after_secs: ((wait_ms + 999) / 1000).max(1),
            });
        }

        hits.push(now.timestamp_millis());
        let oldest = hits[0];
        let reset_at = DateTime::<Utc>::from_timestamp_millis(oldest).unwrap_or(now) + self.window;
        let value = serde_json::to_string(&hits).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.put(key, value, now, self.window).await?;

        Ok(RateLimitDecision {
            allowed: true,
            limit: self.limit,
            remaining: self.limit - used - 1,
            reset_at,
            retry_after_secs: 0,
        })
    }
}
