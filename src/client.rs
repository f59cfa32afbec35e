use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::payload::{Dataset, SheetPayload};
use crate::submission::Submission;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("endpoint answered with status {0}")]
    Status(u16),
    #[error("redirect error: {0}")]
    Redirect(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransportError::Status(status.as_u16()),
            None if err.is_redirect() => TransportError::Redirect(err.to_string()),
            None if err.is_decode() => TransportError::Malformed(err.to_string()),
            None => TransportError::Network(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DashboardError {
    #[error("initial load failed: {0}")]
    InitialLoad(TransportError),
    #[error("refresh failed, showing previous data: {0}")]
    Refresh(TransportError),
    #[error("submission failed: {0}")]
    Submit(TransportError),
}

impl DashboardError {
    /// Only a failed first load leaves nothing to show.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DashboardError::InitialLoad(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Updated,
    Stale(DashboardError),
}

/// The remote spreadsheet service.
pub trait Transport {
    fn fetch(&self) -> impl Future<Output = Result<Value, TransportError>> + Send;
    fn submit(&self, submission: &Submission) -> impl Future<Output = Result<(), TransportError>> + Send;
}

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    /// The response body is not inspected; only transport failures count.
    async fn submit(&self, submission: &Submission) -> Result<(), TransportError> {
        self.client
            .post(&self.endpoint)
            .json(&submission.to_json())
            .send()
            .await?;
        Ok(())
    }
}

/// A saved payload on disk. Read-only.
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Transport for FileTransport {
    async fn fetch(&self) -> Result<Value, TransportError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| TransportError::Network(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw).map_err(|e| TransportError::Malformed(e.to_string()))
    }

    async fn submit(&self, _submission: &Submission) -> Result<(), TransportError> {
        Err(TransportError::Unsupported(format!(
            "{} is a read-only snapshot",
            self.path.display()
        )))
    }
}

async fn load_dataset<T: Transport>(transport: &T, config: &Config) -> Result<Dataset, TransportError> {
    let value = transport.fetch().await?;
    let payload =
        SheetPayload::from_value(value).map_err(|e| TransportError::Malformed(e.to_string()))?;
    Ok(Dataset::from_payload(&payload, config))
}

/// Holds the current dataset. Readers get either the old snapshot or the
/// fully rebuilt one, never a mix.
///
/// Overlapping `submit` calls are not serialized here; callers that care
/// must gate them. Concurrent refreshes race and the last to finish wins.
pub struct Dashboard<T> {
    transport: T,
    config: Config,
    snapshot: RwLock<Arc<Dataset>>,
}

impl<T: Transport> Dashboard<T> {
    pub async fn load(transport: T, config: Config) -> Result<Self, DashboardError> {
        let dataset = load_dataset(&transport, &config)
            .await
            .map_err(DashboardError::InitialLoad)?;
        Ok(Self {
            transport,
            config,
            snapshot: RwLock::new(Arc::new(dataset)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Dataset> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn replace(&self, dataset: Dataset) {
        let fresh = Arc::new(dataset);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        match load_dataset(&self.transport, &self.config).await {
            Ok(dataset) => {
                self.replace(dataset);
                RefreshOutcome::Updated
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed, keeping previous dataset");
                RefreshOutcome::Stale(DashboardError::Refresh(err))
            }
        }
    }

    /// Sends `submission`, waits for the backend to settle, then refreshes.
    /// Errors `is_benign` accepts are treated as a successful send.
    pub async fn submit<P>(&self, submission: &Submission, is_benign: P) -> Result<RefreshOutcome, DashboardError>
    where
        P: Fn(&TransportError) -> bool,
    {
        if let Err(err) = self.transport.submit(submission).await {
            if !is_benign(&err) {
                return Err(DashboardError::Submit(err));
            }
            tracing::debug!(error = %err, sheet = %submission.sheet, "ignoring benign submit error");
        }

        tokio::time::sleep(self.config.refresh_delay()).await;
        Ok(self.refresh().await)
    }
}
