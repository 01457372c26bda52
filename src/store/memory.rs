use crate::core::error::StoreError;
use crate::core::quote::{Quote, QuoteRecord, QuoteStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory quote store. Can be made slow or failing to exercise the
/// persist stage.
#[derive(Default)]
pub struct MemoryQuoteStore {
    inner: Arc<Mutex<Vec<QuoteRecord>>>,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl MemoryQuoteStore {
    /// Creates a new MemoryQuoteStore instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Every insert sleeps for `delay` before writing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every insert fails with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub async fn records(&self) -> Vec<QuoteRecord> {
        self.inner.lock().await.clone()
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn insert(&self, quote: &Quote) -> Result<i64, StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(StoreError::Unavailable(message.clone()));
        }

        let mut records = self.inner.lock().await;
        let id = records.len() as i64 + 1;
        records.push(QuoteRecord {
            id,
            bid: quote.bid().to_string(),
            created_at: Utc::now(),
        });
        debug!(id, "Stored quote in memory");
        Ok(id)
    }
}
