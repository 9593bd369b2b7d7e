use std::time::Duration;

use corpora_core::FetchConfig;

use crate::error::FetchError;

/// A fetched document body.
#[derive(Debug, Clone)]
pub struct SourceBody {
    pub url: String,
    pub body: String,
    pub content_type: Option<String>,
}

/// Boundary to origin servers. Download tasks only see this trait; the
/// HTTP implementation lives behind it so tests can stub the network.
pub trait SourceClient: Send + Sync {
    fn fetch(&self, url: &str) -> Result<SourceBody, FetchError>;
}

/// Blocking reqwest-backed client. Download tasks execute on engine worker
/// threads, so the blocking flavor is the right one here.
pub struct HttpSourceClient {
    client: reqwest::blocking::Client,
}

impl HttpSourceClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl SourceClient for HttpSourceClient {
    fn fetch(&self, url: &str) -> Result<SourceBody, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().map_err(|e| FetchError::Http(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }

        Ok(SourceBody {
            url: url.to_string(),
            body,
            content_type,
        })
    }
}

/// Throttle key for an origin URL: its host name.
pub fn host_key(origin_url: &str) -> Result<String, FetchError> {
    let parsed =
        url::Url::parse(origin_url).map_err(|_| FetchError::InvalidUrl(origin_url.to_string()))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| FetchError::InvalidUrl(origin_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_extracts_host() {
        assert_eq!(host_key("https://papers.example.org/a/b.pdf").unwrap(), "papers.example.org");
        assert_eq!(host_key("http://localhost:8080/x").unwrap(), "localhost");
    }

    #[test]
    fn host_key_rejects_garbage() {
        assert!(matches!(host_key("not a url"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(host_key(""), Err(FetchError::InvalidUrl(_))));
    }
}
