//! JSON-over-HTTP sync endpoints (CRM, analytics, cancellation feed).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{CancellationPayload, CancellationSink, SubscriptionSnapshot, SyncEndpoint};

/// POSTs snapshot batches as a JSON array to a fixed URL.
pub struct HttpSyncEndpoint {
    name: String,
    url: String,
    http_client: reqwest::Client,
}

impl HttpSyncEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Shares a connection pool with other adapters.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }
}

#[async_trait]
impl SyncEndpoint for HttpSyncEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, batch: &[SubscriptionSnapshot]) -> Result<(), DomainError> {
        post_json(&self.http_client, &self.url, &self.name, batch).await
    }
}

/// POSTs a single cancellation record to a fixed URL.
pub struct HttpCancellationSink {
    url: String,
    http_client: reqwest::Client,
}

impl HttpCancellationSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }
}

#[async_trait]
impl CancellationSink for HttpCancellationSink {
    async fn notify(&self, payload: &CancellationPayload) -> Result<(), DomainError> {
        post_json(&self.http_client, &self.url, "cancellation", payload).await
    }
}

async fn post_json<T: serde::Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    target: &str,
    body: &T,
) -> Result<(), DomainError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::SyncEndpointError, e.to_string())
                .with_detail("endpoint", target)
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(DomainError::new(
            ErrorCode::SyncEndpointError,
            format!("{} responded {}: {}", target, status, error_text),
        )
        .with_detail("endpoint", target));
    }

    Ok(())
}
