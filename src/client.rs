//! One-shot quote client: fetch from the quote server under a single deadline,
//! then replace the output file with the quote.

use crate::core::config::ClientConfig;
use crate::core::error::ClientError;
use crate::core::quote::{Quote, QuoteResponse};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

pub struct QuoteClient {
    url: String,
    budget: Duration,
    client: reqwest::Client,
}

impl QuoteClient {
    pub fn new(url: &str, budget: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent("cotacao/1.0")
            .build()?;
        Ok(QuoteClient {
            url: url.to_string(),
            budget,
            client,
        })
    }

    /// Fetches one quote. The budget covers connect, send, receive and decode.
    #[instrument(name = "QuoteClientFetch", skip(self), fields(url = %self.url))]
    pub async fn fetch_quote(&self) -> Result<Quote, ClientError> {
        match tokio::time::timeout(self.budget, self.request()).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(self.budget)),
        }
    }

    async fn request(&self) -> Result<Quote, ClientError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, body = %text, "Received quote server response");

        if !status.is_success() {
            return Err(ClientError::Rejected {
                status,
                message: text.trim().to_string(),
            });
        }

        let body: QuoteResponse = serde_json::from_str(&text)?;
        Ok(Quote::try_from(body.bid)?)
    }
}

/// Replaces `path` with the quote line. The content is written to a temporary
/// file next to `path` and renamed over it, so `path` is either the previous
/// file or the complete new one.
pub fn save_quote(path: &Path, quote: &Quote) -> Result<(), ClientError> {
    let file_error = |source: std::io::Error| ClientError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(file_error)?;
    file.write_all(quote.file_line().as_bytes())
        .map_err(file_error)?;
    file.as_file().sync_all().map_err(file_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(file_error)?;
    }

    file.persist(path).map_err(|e| file_error(e.error))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Fetches a quote and saves it. Nothing is written unless the fetch succeeded.
pub async fn run_client(config: &ClientConfig) -> Result<Quote, ClientError> {
    let client = QuoteClient::new(&config.server_url, config.timeout())?;
    let output = PathBuf::from(&config.output_path);

    let quote = client.fetch_quote().await.inspect_err(|e| match e {
        ClientError::Timeout(_) => error!(error = %e, "Timed out waiting for the quote server"),
        _ => error!(error = %e, "Failed to fetch quote"),
    })?;

    save_quote(&output, &quote).inspect_err(|e| error!(error = %e, "Failed to save quote"))?;

    info!("Cotação salva: Dólar: {}", quote.bid());
    Ok(quote)
}
