//! Recording transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::Result;
use crate::transport::{OutboundRequest, RawResponse, Transport};

#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    pub fn new(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.expect("MockTransport: no scripted response left"))
    }
}

pub fn json_response(status: u16, body: Value) -> RawResponse {
    let mut response = RawResponse {
        status,
        status_text: reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string(),
        body: body.to_string(),
        ..Default::default()
    };
    response
        .headers
        .insert("content-type".into(), "application/json".into());
    response
}

pub fn token_response(access_token: &str) -> RawResponse {
    json_response(
        200,
        serde_json::json!({
            "scope": "https://uri.example.com/services/payments/payment",
            "access_token": access_token,
            "token_type": "Bearer",
            "app_id": "APP-80W284485P519543T",
            "expires_in": 32400,
            "nonce": "2024-05-01T10:00:00ZnWpmV"
        }),
    )
}
