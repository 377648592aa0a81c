use async_trait::async_trait;
use biodata_common::ConditionalSync;
use url::Url;

use crate::{ApiError, ClientSettings, InboundResponse, Method, OutboundRequest};

/// Delivers a prepared request and returns whatever the server answered.
///
/// Transports do not interpret status codes; classification happens in
/// [`ApiClient`](crate::ApiClient) so every transport fails the same way.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Transport: ConditionalSync {
    /// Send `request`
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, ApiError>;
}

/// [`Transport`] over HTTP.
///
/// On native targets the configured timeout applies to every request. In
/// the browser the fetch API has no per-client timeout, so requests run
/// until the browser gives up.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Transport for `settings.base_url`
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        Url::parse(&settings.base_url)
            .map_err(|error| ApiError::InvalidUrl(format!("{}: {error}", settings.base_url)))?;

        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(settings.timeout());
        let client = builder
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Url::parse(&joined).map_err(|error| ApiError::InvalidUrl(format!("{joined}: {error}")))
    }
}

fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(error.to_string())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, self.url(&request.path)?)
            .query(&request.query_pairs());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        Ok(InboundResponse::from_text(status, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_joins_paths_onto_the_base_url() {
        let transport = HttpTransport::new(&ClientSettings {
            base_url: "http://localhost:8080/".into(),
            ..ClientSettings::default()
        })
        .unwrap();

        assert_eq!(
            transport.url("/api/database/tables").unwrap().as_str(),
            "http://localhost:8080/api/database/tables"
        );
        assert_eq!(
            transport.url("api/permissions/all").unwrap().as_str(),
            "http://localhost:8080/api/permissions/all"
        );
    }

    #[test]
    fn it_rejects_invalid_base_urls() {
        let result = HttpTransport::new(&ClientSettings {
            base_url: "not a url".into(),
            ..ClientSettings::default()
        });

        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }
}
