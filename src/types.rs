use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Target environment of the payment API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Environment {
    #[default]
    Sandbox,
    Live,
}

impl From<String> for Environment {
    /// Anything other than `live` selects the sandbox.
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("live") {
            Self::Live
        } else {
            Self::Sandbox
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Client credentials supplied with every dispatch. Never stored.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_base_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("custom_base_url", &self.custom_base_url)
            .finish()
    }
}

/// Query parameters accepted by `list_payments`, in the order they are encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub start_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub start_index: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

impl ListQuery {
    /// Fields as `(name, value)` pairs in declaration order.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("count", self.count.as_deref()),
            ("start_id", self.start_id.as_deref()),
            ("start_index", self.start_index.as_deref()),
            ("start_time", self.start_time.as_deref()),
            ("end_time", self.end_time.as_deref()),
            ("sort_by", self.sort_by.as_deref()),
            ("sort_order", self.sort_order.as_deref()),
        ]
    }
}

/// Accepts strings, numbers and booleans. Falsy values (`0`, `false`) and
/// anything else are treated as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Some(Value::Bool(true)) => Some("true".to_string()),
        _ => None,
    })
}

/// Action-specific inputs: resource ids, bodies and list filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<ListQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_body: Option<Value>,
}

/// Inbound dispatch request, the JSON contract of `POST /api/dispatch`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub action: String,
    #[serde(flatten)]
    pub params: ActionParams,
}

/// Access token returned by `/v1/oauth2/token`
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub scope: Option<Value>,
    #[serde(default)]
    pub token_type: Option<Value>,
    #[serde(default)]
    pub app_id: Option<Value>,
    #[serde(default)]
    pub expires_in: Option<Value>,
    #[serde(default)]
    pub nonce: Option<Value>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("app_id", &self.app_id)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Token metadata echoed back to the caller. The token itself is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Value>,
    #[serde(rename = "authTime")]
    pub auth_time: String,
}

/// Outgoing request as shown to the caller, secrets masked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestTrace {
    pub method: String,
    pub url: String,
    #[serde(with = "ordered_headers")]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curl: Option<String>,
}

/// Upstream response as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponseTrace {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub time: String,
}

/// Result envelope of a single dispatch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequestTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response: Option<HttpResponseTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_info: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_response: Option<Value>,
}

impl ApiResult {
    /// Bare failure carrying only a message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Serializes header pairs as a JSON object, keeping insertion order.
mod ordered_headers {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(headers: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (name, value) in headers {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(BTreeMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_query_drops_falsy_filters() {
        let query: ListQuery = serde_json::from_value(json!({
            "count": 0,
            "start_index": false,
            "start_id": "PAY-1",
            "sort_by": true,
            "end_time": null,
            "sort_order": ["desc"]
        }))
        .unwrap();

        assert_eq!(query.count, None);
        assert_eq!(query.start_index, None);
        assert_eq!(query.start_id.as_deref(), Some("PAY-1"));
        assert_eq!(query.sort_by.as_deref(), Some("true"));
        assert_eq!(query.end_time, None);
        assert_eq!(query.sort_order, None);

        let query: ListQuery = serde_json::from_value(json!({ "count": 20, "start_index": 0.0 })).unwrap();
        assert_eq!(query.count.as_deref(), Some("20"));
        assert_eq!(query.start_index, None);
    }
}
