//! Error types for the quote pipeline.
//!
//! `QuoteError` is what a server request can end in, `ClientError` what a
//! client run can end in. `ProviderError` and `StoreError` come from the
//! collaborators and are folded into `QuoteError` by the request handler.

use crate::core::deadline::Stage;
use crate::core::quote::EmptyBid;
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the external quote provider call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(StatusCode),

    #[error("Failed to parse provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Provider returned an empty bid")]
    EmptyBid,
}

impl From<EmptyBid> for ProviderError {
    fn from(_: EmptyBid) -> Self {
        ProviderError::EmptyBid
    }
}

/// Failures of the local store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Terminal outcome of a failed `GET /cotacao` request.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("timed out after {}ms fetching quote from provider", .0.as_millis())]
    FetchTimeout(Duration),

    #[error("failed to fetch quote from provider: {0}")]
    FetchTransport(String),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider returned an empty bid")]
    EmptyBid,

    #[error("timed out after {}ms persisting quote", .0.as_millis())]
    PersistTimeout(Duration),

    #[error("failed to persist quote: {0}")]
    Persist(String),
}

impl QuoteError {
    /// Stage the request failed in.
    pub fn stage(&self) -> Stage {
        match self {
            QuoteError::FetchTimeout(_)
            | QuoteError::FetchTransport(_)
            | QuoteError::Decode(_)
            | QuoteError::EmptyBid => Stage::Fetch,
            QuoteError::PersistTimeout(_) | QuoteError::Persist(_) => Stage::Persist,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            QuoteError::FetchTimeout(_) | QuoteError::PersistTimeout(_)
        )
    }

    /// 504 for a provider timeout, 500 for everything else.
    pub fn status(&self) -> StatusCode {
        match self {
            QuoteError::FetchTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProviderError> for QuoteError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Transport(_) | ProviderError::Status(_) => {
                QuoteError::FetchTransport(err.to_string())
            }
            ProviderError::Decode(e) => QuoteError::Decode(e.to_string()),
            ProviderError::EmptyBid => QuoteError::EmptyBid,
        }
    }
}

impl From<StoreError> for QuoteError {
    fn from(err: StoreError) -> Self {
        QuoteError::Persist(err.to_string())
    }
}

/// Terminal outcome of a failed client run.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("timed out after {}ms waiting for quote server", .0.as_millis())]
    Timeout(Duration),

    #[error("request to quote server failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("quote server answered {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("failed to decode quote server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("quote server returned an empty bid")]
    EmptyBid,

    #[error("failed to write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<EmptyBid> for ClientError {
    fn from(_: EmptyBid) -> Self {
        ClientError::EmptyBid
    }
}
