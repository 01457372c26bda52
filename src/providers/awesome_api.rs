use crate::core::error::ProviderError;
use crate::core::quote::{Quote, QuoteProvider};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://economia.awesomeapi.com.br";
const USD_BRL_ENDPOINT: &str = "/json/last/USD-BRL";

// AwesomeApiProvider implementation for QuoteProvider
pub struct AwesomeApiProvider {
    url: String,
    client: reqwest::Client,
}

impl AwesomeApiProvider {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent("cotacao/1.0")
            .build()?;
        Ok(AwesomeApiProvider {
            url: format!("{}{}", base_url.trim_end_matches('/'), USD_BRL_ENDPOINT),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

// A missing pair or bid decodes as empty and is rejected as an empty bid.
#[derive(Debug, Deserialize)]
struct ProviderEnvelope {
    #[serde(rename = "USDBRL", default)]
    usd_brl: ProviderQuote,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderQuote {
    #[serde(default)]
    bid: String,
}

#[async_trait]
impl QuoteProvider for AwesomeApiProvider {
    #[instrument(name = "AwesomeApiFetch", skip(self), fields(url = %self.url))]
    async fn fetch_quote(&self) -> Result<Quote, ProviderError> {
        debug!("Requesting USD-BRL quote");

        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let text = response.text().await?;
        let envelope: ProviderEnvelope = serde_json::from_str(&text)?;
        debug!(bid = %envelope.usd_brl.bid, "Decoded provider envelope");

        Ok(Quote::new(envelope.usd_brl.bid)?)
    }
}
