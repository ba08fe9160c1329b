use std::time::Instant;

use crate::action::Action;
use crate::endpoint::resolve_base_url;
use crate::error::Result;
use crate::mapper::{self, PreparedRequest};
use crate::token::{self, TokenOutcome};
use crate::trace::{self, BEARER_PLACEHOLDER};
use crate::transport::{HttpTransport, OutboundRequest, Transport};
use crate::types::{ApiResult, DispatchRequest, HttpRequestTrace};

/// Stateless request dispatcher: token fetch, then one API call.
#[derive(Debug, Clone)]
pub struct Dispatcher<T = HttpTransport> {
    transport: T,
}

impl Dispatcher<HttpTransport> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?))
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one dispatch. Never fails: errors become `{success: false, error}`.
    pub async fn dispatch(&self, request: &DispatchRequest) -> ApiResult {
        match self.try_dispatch(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(action = %request.action, "dispatch failed: {}", e);
                ApiResult::failure(e.to_string())
            }
        }
    }

    /// Run one dispatch, surfacing errors that prevented a trace.
    ///
    /// The action is resolved and mapped before any network call, so unknown
    /// actions and missing ids fail without touching the token endpoint.
    pub async fn try_dispatch(&self, request: &DispatchRequest) -> Result<ApiResult> {
        let action: Action = request.action.parse()?;
        let credentials = &request.credentials;
        let base_url = resolve_base_url(
            credentials.environment,
            credentials.custom_base_url.as_deref(),
        );
        let prepared = mapper::build_request(action, &request.params, &base_url)?;

        // Fetch an access token; a rejection ends the dispatch here
        let (token, auth_elapsed) = match token::acquire_token(
            &self.transport,
            &base_url,
            &credentials.client_id,
            &credentials.client_secret,
        )
        .await?
        {
            TokenOutcome::Granted { token, elapsed } => (token, elapsed),
            TokenOutcome::Rejected(result) => return Ok(*result),
        };

        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", token.access_token),
            ),
        ];

        self.execute(prepared, headers)
            .await
            .map(|mut result| {
                result.token_info = Some(token.info(auth_elapsed));
                result
            })
    }

    async fn execute(
        &self,
        prepared: PreparedRequest,
        headers: Vec<(String, String)>,
    ) -> Result<ApiResult> {
        let body = prepared.body_text()?;
        let method = prepared.method.to_string();

        tracing::debug!(action = %prepared.action, %method, url = %prepared.url, "calling API");
        // Make the request
        let started = Instant::now();
        let response = self
            .transport
            .execute(OutboundRequest {
                method: prepared.method.clone(),
                url: prepared.url.clone(),
                headers: headers.clone(),
                body: body.clone(),
            })
            .await?;
        let elapsed = started.elapsed();

        if !response.is_success() {
            tracing::warn!(
                action = %prepared.action,
                status = response.status,
                "API call returned non-success status"
            );
        }

        // Build the trace
        let response_body = trace::decode_body(&response)?;
        let curl = trace::render_curl(&method, &prepared.url, &headers, body.as_deref());

        Ok(ApiResult {
            success: response.is_success(),
            error: None,
            http_request: Some(HttpRequestTrace {
                method,
                url: prepared.url,
                headers: trace::mask_authorization(&headers, BEARER_PLACEHOLDER),
                body: body.as_ref().and(prepared.body),
                curl: Some(curl),
            }),
            http_response: Some(trace::response_trace(&response, response_body, elapsed)),
            token_info: None,
            token_response: None,
        })
    }
}
