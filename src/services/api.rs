use crate::domain::models::{Collection, ExpressionCheckResult, ServerConnection};
use crate::services::query::ApiQuery;
use std::time::Duration;
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Error 404: {url}")]
    NotFound { url: String },
    #[error("Error UNKNOWN (HTTP {status}): {url}")]
    UnknownHttpError { url: String, status: u16 },
    #[error("There was a problem with the API call {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Could not decode the response of {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Network-level failure: the server could not be talked to at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

/// Read/validate surface of the remote server used by every check.
pub trait MetadataApi {
    fn get(&self, query: &ApiQuery) -> Result<Collection, ApiError>;

    /// Submits `payload` to a validation endpoint; `path` carries its own query string.
    fn post(&self, path: &str, payload: &str) -> Result<ExpressionCheckResult, ApiError>;
}

pub struct HttpApi {
    connection: ServerConnection,
    client: reqwest::blocking::Client,
}

impl HttpApi {
    /// `timeout_ms = None` leaves requests untimed.
    pub fn new(connection: ServerConnection, timeout_ms: Option<u64>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout_ms.map(Duration::from_millis))
            .build()?;
        Ok(Self { connection, client })
    }

    fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.connection.api_url, relative)
    }

    fn send(
        &self,
        url: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<String, ApiError> {
        let transport = |source| ApiError::Transport {
            url: url.to_string(),
            source,
        };
        let resp = request
            .basic_auth(&self.connection.username, Some(&self.connection.password))
            .send()
            .map_err(transport)?;
        classify_status(url, resp.status().as_u16())?;
        resp.text().map_err(transport)
    }
}

impl MetadataApi for HttpApi {
    fn get(&self, query: &ApiQuery) -> Result<Collection, ApiError> {
        let url = self.url(&query.to_path());
        debug!("Querying the API: {}", url);
        let body = self.send(&url, self.client.get(&url))?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { url, source })
    }

    fn post(&self, path: &str, payload: &str) -> Result<ExpressionCheckResult, ApiError> {
        let url = self.url(path);
        debug!("Posting to the API: {} payload: {}", url, payload);
        let request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(payload.to_string());
        let body = self.send(&url, request)?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { url, source })
    }
}

/// Only 200 counts as success.
pub fn classify_status(url: &str, status: u16) -> Result<(), ApiError> {
    match status {
        200 => Ok(()),
        404 => Err(ApiError::NotFound {
            url: url.to_string(),
        }),
        status => Err(ApiError::UnknownHttpError {
            url: url.to_string(),
            status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_status, ApiError};

    #[test]
    fn status_mapping() {
        assert!(classify_status("u", 200).is_ok());
        assert!(matches!(
            classify_status("u", 404),
            Err(ApiError::NotFound { .. })
        ));
        match classify_status("u", 201) {
            Err(ApiError::UnknownHttpError { status, .. }) => assert_eq!(status, 201),
            other => panic!("unexpected: {:?}", other),
        }
        match classify_status("u", 500) {
            Err(e) => assert!(!e.is_transport()),
            Ok(()) => panic!("500 must fail"),
        }
    }
}
