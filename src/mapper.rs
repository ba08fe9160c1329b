//! Maps an [`Action`] plus its parameters onto a concrete HTTP call.
//!
//! Everything here is pure: no token, no network. Unknown actions and missing
//! path parameters are rejected before the dispatcher touches the wire.

use reqwest::Method;
use serde_json::{Map, Value, json};
use url::form_urlencoded;

use crate::action::{Action, BodyPolicy, Resource};
use crate::error::{DispatchError, Result};
use crate::types::{ActionParams, ListQuery};

/// Method, URL and JSON body of the main API call
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub action: Action,
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl PreparedRequest {
    /// Serialized body, only ever present for non-GET methods
    pub fn body_text(&self) -> Result<Option<String>> {
        match &self.body {
            Some(body) if self.method != Method::GET => Ok(Some(serde_json::to_string(body)?)),
            _ => Ok(None),
        }
    }
}

/// Build the main API request for `action` against `base_url`.
pub fn build_request(action: Action, params: &ActionParams, base_url: &str) -> Result<PreparedRequest> {
    let mut url = format!("{}/v1/payments/", base_url);

    match action.resource() {
        Some(resource) => {
            url.push_str(resource.segment());
            url.push('/');
            url.push_str(resource_id(resource, params)?);
        }
        None => url.push_str(Resource::Payment.segment()),
    }

    if let Some(verb) = action.verb() {
        url.push('/');
        url.push_str(verb);
    }

    let body = match action.body_policy() {
        BodyPolicy::None => None,
        BodyPolicy::Query => {
            if let Some(qs) = params.query_params.as_ref().map(encode_list_query)
                && !qs.is_empty()
            {
                url.push('?');
                url.push_str(&qs);
            }
            None
        }
        BodyPolicy::PassThrough => params.request_body.clone(),
        BodyPolicy::OptionalOrEmpty => Some(params.request_body.clone().unwrap_or_else(empty_object)),
        BodyPolicy::AlwaysEmpty => Some(empty_object()),
        BodyPolicy::ExecuteDefault => Some(
            params
                .request_body
                .clone()
                .unwrap_or_else(|| execute_default(params.payer_id.as_deref())),
        ),
        BodyPolicy::Patch => params.patch_body.clone(),
    };

    Ok(PreparedRequest {
        action,
        method: action.method(),
        url,
        body,
    })
}

/// Form-encode the present, non-empty list filters in declaration order.
pub fn encode_list_query(query: &ListQuery) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in query.fields() {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            serializer.append_pair(name, value);
        }
    }
    serializer.finish()
}

fn resource_id(resource: Resource, params: &ActionParams) -> Result<&str> {
    let id = match resource {
        Resource::Payment => params.payment_id.as_deref(),
        Resource::Sale => params.sale_id.as_deref(),
        Resource::Authorization => params.authorization_id.as_deref(),
        Resource::Order => params.order_id.as_deref(),
        Resource::Capture => params.capture_id.as_deref(),
        Resource::Refund => params.refund_id.as_deref(),
    };
    id.filter(|id| !id.is_empty())
        .ok_or(DispatchError::MissingParameter(resource.param_name()))
}

fn execute_default(payer_id: Option<&str>) -> Value {
    match payer_id {
        Some(payer_id) => json!({ "payer_id": payer_id }),
        None => empty_object(),
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
