//! Best-effort extraction of resource ids from a response body, so a session
//! can feed them into follow-up calls.

use serde::Serialize;
use serde_json::Value;

const PAYMENT_ID_PREFIXES: [&str; 2] = ["PAY-", "PAYID-"];

/// Resource ids remembered between calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
}

impl ResourceIds {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the ids present in `other`, keeping the rest.
    pub fn merge(&mut self, other: ResourceIds) {
        let ResourceIds {
            payment_id,
            sale_id,
            authorization_id,
            order_id,
            capture_id,
            refund_id,
        } = other;
        self.payment_id = payment_id.or(self.payment_id.take());
        self.sale_id = sale_id.or(self.sale_id.take());
        self.authorization_id = authorization_id.or(self.authorization_id.take());
        self.order_id = order_id.or(self.order_id.take());
        self.capture_id = capture_id.or(self.capture_id.take());
        self.refund_id = refund_id.or(self.refund_id.take());
    }
}

/// Pull ids out of a payment-shaped response body.
///
/// A top-level `id` counts as a payment id only with a `PAY-`/`PAYID-`
/// prefix. Sale, authorization, order and capture ids come from
/// `transactions[*].related_resources[*]`; later entries win.
pub fn extract_ids(body: &Value) -> ResourceIds {
    let mut ids = ResourceIds::default();
    let Some(object) = body.as_object() else {
        return ids;
    };

    if let Some(id) = object.get("id").and_then(Value::as_str)
        && PAYMENT_ID_PREFIXES.iter().any(|p| id.starts_with(p))
    {
        ids.payment_id = Some(id.to_string());
    }

    let related = object
        .get("transactions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|txn| txn.get("related_resources").and_then(Value::as_array))
        .flatten();

    for resource in related {
        let id_of = |kind: &str| {
            resource
                .get(kind)
                .and_then(|r| r.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        if let Some(id) = id_of("sale") {
            ids.sale_id = Some(id);
        }
        if let Some(id) = id_of("authorization") {
            ids.authorization_id = Some(id);
        }
        if let Some(id) = id_of("order") {
            ids.order_id = Some(id);
        }
        if let Some(id) = id_of("capture") {
            ids.capture_id = Some(id);
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_id_prefixes() {
        assert_eq!(
            extract_ids(&json!({ "id": "PAY-1AB23456CD789012E" })).payment_id.as_deref(),
            Some("PAY-1AB23456CD789012E")
        );
        assert_eq!(
            extract_ids(&json!({ "id": "PAYID-MXYZ" })).payment_id.as_deref(),
            Some("PAYID-MXYZ")
        );
        assert!(extract_ids(&json!({ "id": "4RR959492F879224U" })).payment_id.is_none());
        assert!(extract_ids(&json!({ "id": 42 })).payment_id.is_none());
    }

    #[test]
    fn test_related_resources() {
        let body = json!({
            "id": "PAY-123",
            "transactions": [
                {
                    "related_resources": [
                        { "sale": { "id": "SALE-1", "state": "completed" } },
                        { "authorization": { "id": "AUTH-1" } }
                    ]
                },
                { "amount": { "total": "1.00" } },
                {
                    "related_resources": [
                        { "order": { "id": "O-1" }, "capture": { "id": "CAP-1" } },
                        { "sale": { "id": "SALE-2" } }
                    ]
                }
            ]
        });

        let ids = extract_ids(&body);
        assert_eq!(ids.payment_id.as_deref(), Some("PAY-123"));
        assert_eq!(ids.sale_id.as_deref(), Some("SALE-2"));
        assert_eq!(ids.authorization_id.as_deref(), Some("AUTH-1"));
        assert_eq!(ids.order_id.as_deref(), Some("O-1"));
        assert_eq!(ids.capture_id.as_deref(), Some("CAP-1"));
        assert!(ids.refund_id.is_none());
    }

    #[test]
    fn test_non_object_bodies() {
        assert!(extract_ids(&json!("<html>oops</html>")).is_empty());
        assert!(extract_ids(&json!([{ "id": "PAY-1" }])).is_empty());
        assert!(extract_ids(&json!({ "transactions": "nope" })).is_empty());
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut ids = ResourceIds {
            payment_id: Some("PAY-OLD".into()),
            sale_id: Some("SALE-OLD".into()),
            ..Default::default()
        };
        ids.merge(ResourceIds {
            sale_id: Some("SALE-NEW".into()),
            ..Default::default()
        });
        assert_eq!(ids.payment_id.as_deref(), Some("PAY-OLD"));
        assert_eq!(ids.sale_id.as_deref(), Some("SALE-NEW"));
    }
}
