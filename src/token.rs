//! OAuth2 client-credentials token acquisition.
//!
//! Every dispatch fetches a fresh token; nothing is cached.

use std::time::{Duration, Instant};

use base64::Engine;
use reqwest::Method;

use crate::endpoint::TOKEN_PATH;
use crate::error::{DispatchError, Result};
use crate::trace::{self, BASIC_PLACEHOLDER};
use crate::transport::{OutboundRequest, Transport};
use crate::types::{AccessToken, ApiResult, HttpRequestTrace, TokenInfo};

pub const GRANT_BODY: &str = "grant_type=client_credentials";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Outcome of the token request
#[derive(Debug)]
pub enum TokenOutcome {
    Granted { token: AccessToken, elapsed: Duration },
    /// Non-2xx from the token endpoint, already shaped as the final result
    Rejected(Box<ApiResult>),
}

/// `Basic base64(client_id:client_secret)`
pub fn basic_authorization(client_id: &str, client_secret: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", client_id, client_secret));
    format!("Basic {}", encoded)
}

/// Request a token from `{base_url}/v1/oauth2/token`.
pub async fn acquire_token<T: Transport>(
    transport: &T,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenOutcome> {
    let url = format!("{}{}", base_url, TOKEN_PATH);
    let headers = vec![
        ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
        (
            "Authorization".to_string(),
            basic_authorization(client_id, client_secret),
        ),
    ];

    tracing::debug!(%url, "requesting access token");
    let started = Instant::now();
    let response = transport
        .execute(OutboundRequest {
            method: Method::POST,
            url: url.clone(),
            headers: headers.clone(),
            body: Some(GRANT_BODY.to_string()),
        })
        .await?;
    let elapsed = started.elapsed();

    if !response.is_success() {
        tracing::warn!(status = response.status, "token request rejected");
        let body = trace::decode_body_lenient(&response);
        return Ok(TokenOutcome::Rejected(Box::new(ApiResult {
            success: false,
            error: Some("Authentication failed".to_string()),
            token_response: Some(body.clone()),
            http_request: Some(HttpRequestTrace {
                method: Method::POST.to_string(),
                url,
                headers: trace::mask_authorization(&headers, BASIC_PLACEHOLDER),
                body: Some(serde_json::Value::String(GRANT_BODY.to_string())),
                curl: None,
            }),
            http_response: Some(trace::response_trace(&response, body, elapsed)),
            token_info: None,
        })));
    }

    let value: serde_json::Value = serde_json::from_str(&response.body)?;
    if value.get("access_token").and_then(|t| t.as_str()).is_none() {
        return Err(DispatchError::MissingAccessToken);
    }
    let token: AccessToken = serde_json::from_value(value)?;
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "access token granted");

    Ok(TokenOutcome::Granted { token, elapsed })
}

impl AccessToken {
    /// Metadata for the result envelope, without the token itself.
    pub fn info(&self, elapsed: Duration) -> TokenInfo {
        TokenInfo {
            scope: self.scope.clone(),
            token_type: self.token_type.clone(),
            app_id: self.app_id.clone(),
            expires_in: self.expires_in.clone(),
            nonce: self.nonce.clone(),
            auth_time: trace::format_elapsed(elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_authorization() {
        assert_eq!(basic_authorization("id", "secret"), "Basic aWQ6c2VjcmV0");
    }

    #[test]
    fn test_token_info_omits_token() {
        let token: AccessToken = serde_json::from_value(json!({
            "access_token": "A21AA-very-secret",
            "scope": "https://uri.example.com/services/payments/payment",
            "token_type": "Bearer",
            "app_id": "APP-80W284485P519543T",
            "expires_in": 32400,
            "nonce": "2024-01-01T00:00:00Zabc"
        }))
        .unwrap();

        let info = token.info(Duration::from_millis(42));
        let rendered = serde_json::to_string(&info).unwrap();
        assert!(!rendered.contains("A21AA-very-secret"));
        assert_eq!(info.auth_time, "42ms");
        assert_eq!(info.expires_in, Some(json!(32400)));
        assert!(!format!("{:?}", token).contains("A21AA-very-secret"));
    }
}
