//! `GET /cotacao`: fetch → persist → respond, each stage under its own deadline.

use crate::core::deadline::{Stage, StageBudgets};
use crate::core::error::QuoteError;
use crate::core::quote::{Quote, QuoteProvider, QuoteResponse, QuoteStore};
use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, instrument, warn};

pub struct QuoteService {
    provider: Arc<dyn QuoteProvider>,
    store: Arc<dyn QuoteStore>,
    budgets: StageBudgets,
}

impl QuoteService {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        store: Arc<dyn QuoteStore>,
        budgets: StageBudgets,
    ) -> Self {
        QuoteService {
            provider,
            store,
            budgets,
        }
    }

    /// Runs one request that arrived now.
    pub async fn handle(&self) -> Result<Quote, QuoteError> {
        self.handle_from(Instant::now()).await
    }

    /// Runs one request that arrived at `arrival`. A quote is only returned
    /// once it has been stored.
    #[instrument(name = "QuoteRequest", skip_all, fields(policy = ?self.budgets.policy))]
    pub async fn handle_from(&self, arrival: Instant) -> Result<Quote, QuoteError> {
        let quote = self.fetch(arrival).await?;
        self.persist(arrival, &quote).await?;
        debug!(elapsed = ?arrival.elapsed(), "Responding");
        Ok(quote)
    }

    async fn fetch(&self, arrival: Instant) -> Result<Quote, QuoteError> {
        let deadline = self.budgets.deadline(Stage::Fetch, arrival, arrival);
        debug!(stage = %Stage::Fetch, remaining = ?deadline.saturating_duration_since(Instant::now()), "Fetching");

        match timeout_at(deadline, self.provider.fetch_quote()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(QuoteError::FetchTimeout(self.budgets.fetch)),
        }
    }

    async fn persist(&self, arrival: Instant, quote: &Quote) -> Result<(), QuoteError> {
        let stage_start = Instant::now();
        let deadline = self.budgets.deadline(Stage::Persist, arrival, stage_start);
        let remaining = deadline.saturating_duration_since(stage_start);
        debug!(stage = %Stage::Persist, ?remaining, "Persisting");

        // No insert is attempted once the budget is gone
        if remaining.is_zero() {
            return Err(QuoteError::PersistTimeout(self.budgets.persist));
        }

        match timeout_at(deadline, self.store.insert(quote)).await {
            Ok(result) => {
                let id = result?;
                debug!(id, "Quote persisted");
                Ok(())
            }
            Err(_) => Err(QuoteError::PersistTimeout(self.budgets.persist)),
        }
    }
}

pub async fn get_quote(
    State(service): State<Arc<QuoteService>>,
) -> Result<Json<QuoteResponse>, QuoteError> {
    match service.handle().await {
        Ok(quote) => {
            info!(%quote, "Quote served");
            Ok(Json(QuoteResponse::from(&quote)))
        }
        Err(e) => {
            if e.is_timeout() {
                warn!(stage = %e.stage(), error = %e, "Quote request timed out");
            } else {
                error!(stage = %e.stage(), error = %e, "Quote request failed");
            }
            Err(e)
        }
    }
}

impl IntoResponse for QuoteError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::deadline::DeadlinePolicy;
    use crate::core::error::ProviderError;
    use crate::store::MemoryQuoteStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeProvider {
        bid: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl QuoteProvider for FakeProvider {
        async fn fetch_quote(&self) -> Result<Quote, ProviderError> {
            tokio::time::sleep(self.delay).await;
            Ok(Quote::new(self.bid)?)
        }
    }

    fn provider(bid: &'static str, delay_ms: u64) -> Arc<FakeProvider> {
        Arc::new(FakeProvider {
            bid,
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn budgets(policy: DeadlinePolicy) -> StageBudgets {
        StageBudgets {
            policy,
            ..StageBudgets::default()
        }
    }

    #[tokio::test]
    async fn test_successful_request_stores_one_record() {
        let store = Arc::new(MemoryQuoteStore::new());
        let service = QuoteService::new(
            provider("5.25", 0),
            store.clone(),
            StageBudgets::default(),
        );

        let quote = service.handle().await.unwrap();
        assert_eq!(quote.bid(), "5.25");

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bid, "5.25");
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_without_persisting() {
        let store = Arc::new(MemoryQuoteStore::new());
        let service = QuoteService::new(
            provider("5.25", 300),
            store.clone(),
            StageBudgets::default(),
        );

        let err = service.handle().await.unwrap_err();
        assert!(matches!(err, QuoteError::FetchTimeout(_)));
        assert_eq!(err.status(), axum::http::StatusCode::GATEWAY_TIMEOUT);
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_deadline_counts_from_arrival() {
        let store = Arc::new(MemoryQuoteStore::new());
        let service = QuoteService::new(
            provider("5.25", 50),
            store.clone(),
            StageBudgets::default(),
        );

        // Request arrived 190ms ago, so only ~10ms of fetch budget is left
        let arrival = Instant::now() - Duration::from_millis(190);
        let err = service.handle_from(arrival).await.unwrap_err();
        assert!(matches!(err, QuoteError::FetchTimeout(_)));
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_bid_is_not_persisted() {
        let store = Arc::new(MemoryQuoteStore::new());
        let service = QuoteService::new(provider("", 0), store.clone(), StageBudgets::default());

        let err = service.handle().await.unwrap_err();
        assert!(matches!(err, QuoteError::EmptyBid));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(MemoryQuoteStore::new().with_delay(Duration::from_millis(100)));
        let service = QuoteService::new(
            provider("5.25", 0),
            store.clone(),
            StageBudgets::default(),
        );

        let err = service.handle().await.unwrap_err();
        assert!(matches!(err, QuoteError::PersistTimeout(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("5.25"));
        // The cancelled insert never completed
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_error() {
        let store = Arc::new(MemoryQuoteStore::new().failing("database is locked"));
        let service = QuoteService::new(provider("5.25", 0), store, StageBudgets::default());

        let err = service.handle().await.unwrap_err();
        assert!(matches!(err, QuoteError::Persist(_)));
        assert_eq!(
            err.to_string(),
            "failed to persist quote: Store unavailable: database is locked"
        );
    }

    #[tokio::test]
    async fn test_anchored_policy_leaves_no_persist_budget_after_slow_fetch() {
        let store = Arc::new(MemoryQuoteStore::new());
        let service = QuoteService::new(
            provider("5.25", 30),
            store.clone(),
            budgets(DeadlinePolicy::Anchored),
        );

        let err = service.handle().await.unwrap_err();
        assert!(matches!(err, QuoteError::PersistTimeout(_)));
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_per_stage_policy_gives_persist_its_full_budget() {
        let store = Arc::new(MemoryQuoteStore::new());
        let service = QuoteService::new(
            provider("5.25", 30),
            store.clone(),
            budgets(DeadlinePolicy::PerStage),
        );

        service.handle().await.unwrap();
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_chained_policy_carries_unused_fetch_budget() {
        let store = Arc::new(MemoryQuoteStore::new().with_delay(Duration::from_millis(100)));
        let service = QuoteService::new(
            provider("5.25", 30),
            store.clone(),
            budgets(DeadlinePolicy::Chained),
        );

        // ~180ms left for a 100ms insert
        service.handle().await.unwrap();
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_error_response_is_plain_text() {
        let response = QuoteError::FetchTimeout(Duration::from_millis(200)).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            "timed out after 200ms fetching quote from provider"
        );
    }
}
