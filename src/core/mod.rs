//! Core business logic abstractions

pub mod config;
pub mod deadline;
pub mod error;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use deadline::{DeadlinePolicy, Stage, StageBudgets};
pub use error::{ClientError, ProviderError, QuoteError, StoreError};
pub use quote::{Quote, QuoteProvider, QuoteRecord, QuoteResponse, QuoteStore};
