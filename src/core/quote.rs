//! Quote abstractions and core types

use crate::core::error::{ProviderError, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Returned when a quote is built from an empty `bid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyBid;

/// A single USD/BRL quote. The `bid` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    bid: String,
}

impl Quote {
    pub fn new(bid: impl Into<String>) -> Result<Self, EmptyBid> {
        let bid = bid.into();
        if bid.is_empty() {
            return Err(EmptyBid);
        }
        Ok(Quote { bid })
    }

    pub fn bid(&self) -> &str {
        &self.bid
    }

    /// The line the client writes to its output file.
    pub fn file_line(&self) -> String {
        format!("Dólar: {}\n", self.bid)
    }
}

impl TryFrom<String> for Quote {
    type Error = EmptyBid;

    fn try_from(bid: String) -> Result<Self, Self::Error> {
        Quote::new(bid)
    }
}

impl Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "USD-BRL {}", self.bid)
    }
}

/// A stored quote row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub id: i64,
    pub bid: String,
    pub created_at: DateTime<Utc>,
}

/// Wire body served by `GET /cotacao` and decoded by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub bid: String,
}

impl From<&Quote> for QuoteResponse {
    fn from(quote: &Quote) -> Self {
        QuoteResponse {
            bid: quote.bid.clone(),
        }
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self) -> Result<Quote, ProviderError>;
}

/// Append-only quote storage.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Appends one record and returns its id.
    async fn insert(&self, quote: &Quote) -> Result<i64, StoreError>;

    async fn close(&self) {}
}
