//! Where the hospital table comes from.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;
use url::Url;

use crate::loader::LoadError;

#[async_trait]
pub trait HospitalSource: Send + Sync {
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
    /// Returns the raw CSV text.
    async fn fetch(&self) -> Result<String, LoadError>;
}

pub struct HttpCsvSource {
    http: Client,
    url: Url,
}

impl HttpCsvSource {
    pub fn new(url: Url) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(http: Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl HospitalSource for HttpCsvSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        info!(url = %self.url, "fetching hospital table");
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(|err| LoadError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|err| LoadError::Transport(err.to_string()))
    }
}

pub struct FileCsvSource {
    path: PathBuf,
}

impl FileCsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HospitalSource for FileCsvSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        info!(path = %self.path.display(), "reading hospital table");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| LoadError::Io(format!("{}: {err}", self.path.display())))
    }
}

/// Picks an HTTP source for `http(s)://` locations and a file source
/// otherwise.
pub fn source_for_location(location: &str) -> Box<dyn HospitalSource> {
    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Box::new(HttpCsvSource::new(url)),
        _ => Box::new(FileCsvSource::new(location)),
    }
}
