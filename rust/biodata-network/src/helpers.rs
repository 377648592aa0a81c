use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::{ApiError, InboundResponse, OutboundRequest, Transport};

/// A scriptable [`Transport`] that records what it was asked to send.
///
/// Queued outcomes are returned in order; once the queue is empty every
/// request succeeds with `200 {}`. Clones share the queue and the log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    outcomes: Arc<Mutex<VecDeque<Result<InboundResponse, ApiError>>>>,
    sent: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl MockTransport {
    /// Queue a response
    pub fn respond(&self, status: u16, body: Value) {
        self.outcomes
            .lock()
            .push_back(Ok(InboundResponse::new(status, body)));
    }

    /// Queue a transport failure
    pub fn fail(&self, error: ApiError) {
        self.outcomes.lock().push_back(Err(error));
    }

    /// Requests sent so far, as they left the pipeline
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.sent.lock().clone()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, ApiError> {
        self.sent.lock().push(request);
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(InboundResponse::new(200, json!({}))))
    }
}
