//! Builds the caller-facing trace: masked headers, decoded bodies and the
//! reproducible cURL command.

use std::time::Duration;

use serde_json::Value;

use crate::error::Result;
use crate::transport::RawResponse;
use crate::types::HttpResponseTrace;

pub const BEARER_PLACEHOLDER: &str = "Bearer <access_token>";
pub const BASIC_PLACEHOLDER: &str = "Basic <base64(clientId:clientSecret)>";

/// Replace the value of every `Authorization` header with `placeholder`.
pub fn mask_authorization(headers: &[(String, String)], placeholder: &str) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("authorization") {
                (name.clone(), placeholder.to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// Render a cURL equivalent of the call.
///
/// Headers appear in the given order; `Authorization` is always masked. The
/// `-d` line is emitted only for non-GET calls with a body.
pub fn render_curl(method: &str, url: &str, headers: &[(String, String)], body: Option<&str>) -> String {
    let mut curl = format!("curl -X {} '{}'", method, url);
    for (name, value) in mask_authorization(headers, BEARER_PLACEHOLDER) {
        curl.push_str(&format!(" \\\n  -H '{}: {}'", name, value));
    }
    if let Some(body) = body
        && method != "GET"
    {
        curl.push_str(&format!(" \\\n  -d '{}'", body));
    }
    curl
}

/// Decode a response body: JSON when the content type says so, text otherwise.
///
/// An empty body is returned as an empty string even for JSON content types.
pub fn decode_body(response: &RawResponse) -> Result<Value> {
    if response.content_type().contains("json") && !response.body.trim().is_empty() {
        Ok(serde_json::from_str(&response.body)?)
    } else {
        Ok(Value::String(response.body.clone()))
    }
}

/// Decode without failing: JSON if it parses, text otherwise.
pub fn decode_body_lenient(response: &RawResponse) -> Value {
    serde_json::from_str(&response.body).unwrap_or_else(|_| Value::String(response.body.clone()))
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}

pub fn response_trace(response: &RawResponse, body: Value, elapsed: Duration) -> HttpResponseTrace {
    HttpResponseTrace {
        status: response.status,
        status_text: response.status_text.clone(),
        headers: response.headers.clone(),
        body,
        time: format_elapsed(elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(token: &str) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {}", token)),
        ]
    }

    #[test]
    fn test_render_curl_with_body() {
        let curl = render_curl(
            "POST",
            "https://api.test/v1/payments/orders/O-1/do-void",
            &headers("A21AAsecret"),
            Some("{}"),
        );
        assert_eq!(
            curl,
            "curl -X POST 'https://api.test/v1/payments/orders/O-1/do-void' \\\n  \
             -H 'Content-Type: application/json' \\\n  \
             -H 'Authorization: Bearer <access_token>' \\\n  \
             -d '{}'"
        );
        assert!(!curl.contains("A21AAsecret"));
    }

    #[test]
    fn test_render_curl_get_never_has_body() {
        let curl = render_curl("GET", "https://api.test/x", &headers("tok"), Some("{\"a\":1}"));
        assert!(!curl.contains("-d"));
        assert!(curl.ends_with("-H 'Authorization: Bearer <access_token>'"));
    }

    #[test]
    fn test_mask_authorization() {
        let masked = mask_authorization(&headers("tok"), BEARER_PLACEHOLDER);
        assert_eq!(masked[0].1, "application/json");
        assert_eq!(masked[1].1, BEARER_PLACEHOLDER);
    }

    #[test]
    fn test_decode_json_and_text() {
        let mut response = RawResponse {
            status: 200,
            body: r#"{"id":"PAY-1"}"#.to_string(),
            ..Default::default()
        };
        response
            .headers
            .insert("content-type".into(), "application/json; charset=utf-8".into());
        assert_eq!(decode_body(&response).unwrap(), json!({ "id": "PAY-1" }));

        response.headers.insert("content-type".into(), "text/html".into());
        response.body = "<html>502 Bad Gateway</html>".to_string();
        assert_eq!(
            decode_body(&response).unwrap(),
            Value::String("<html>502 Bad Gateway</html>".into())
        );
    }

    #[test]
    fn test_decode_empty_json_body() {
        let mut response = RawResponse {
            status: 204,
            ..Default::default()
        };
        response.headers.insert("content-type".into(), "application/json".into());
        assert_eq!(decode_body(&response).unwrap(), Value::String(String::new()));
    }

    #[test]
    fn test_decode_malformed_json_is_an_error() {
        let mut response = RawResponse {
            status: 200,
            body: "{not json".to_string(),
            ..Default::default()
        };
        response.headers.insert("content-type".into(), "application/json".into());
        assert!(decode_body(&response).is_err());
        assert_eq!(decode_body_lenient(&response), Value::String("{not json".into()));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1234)), "1234ms");
    }
}
