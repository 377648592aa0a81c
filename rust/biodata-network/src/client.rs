use std::sync::Arc;

use biodata_access::SessionStore;
use serde::de::DeserializeOwned;

use crate::{ApiError, ClientSettings, HttpTransport, Outcome, OutboundRequest, Pipeline, Transport};

/// Sends requests through a [`Pipeline`] and a [`Transport`].
///
/// Request hooks run before the transport is awaited, so identity fields
/// reflect the session at dispatch even if it changes while the request is
/// in flight. Non-2xx statuses are classified into [`ApiError`]s before the
/// response hooks see them.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
    pipeline: Pipeline,
}

impl ApiClient<HttpTransport> {
    /// HTTP client with the standard pipeline over `store`
    pub fn http(store: Arc<SessionStore>, settings: &ClientSettings) -> Result<Self, ApiError> {
        Ok(Self::new(
            HttpTransport::new(settings)?,
            Pipeline::standard(store, settings),
        ))
    }
}

impl<T: Transport> ApiClient<T> {
    /// Client over `transport` running `pipeline`
    pub fn new(transport: T, pipeline: Pipeline) -> Self {
        Self {
            transport,
            pipeline,
        }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` and return the raw response
    pub async fn send(&self, request: OutboundRequest) -> Outcome {
        let prepared = self.pipeline.prepare(request);
        let outcome = match self.transport.send(prepared.clone()).await {
            Ok(response) => response.into_result(),
            Err(error) => Err(error),
        };
        self.pipeline.complete(&prepared, outcome)
    }

    /// Send `request` and decode the response body
    pub async fn fetch<R: DeserializeOwned>(&self, request: OutboundRequest) -> Result<R, ApiError> {
        self.send(request).await?.json()
    }
}
