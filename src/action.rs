use reqwest::Method;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

use crate::error::DispatchError;

/// The fixed set of payment API operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreatePayment,
    ListPayments,
    ShowPayment,
    UpdatePayment,
    ExecutePayment,
    ShowSale,
    RefundSale,
    ShowAuthorization,
    CaptureAuthorization,
    VoidAuthorization,
    Reauthorize,
    ShowOrder,
    CaptureOrder,
    VoidOrder,
    AuthorizeOrder,
    ShowCapture,
    RefundCapture,
    ShowRefund,
}

/// Resource whose id fills the single path parameter of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Payment,
    Sale,
    Authorization,
    Order,
    Capture,
    Refund,
}

impl Resource {
    /// Collection segment under `/v1/payments/`
    pub fn segment(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Sale => "sale",
            Self::Authorization => "authorization",
            Self::Order => "orders",
            Self::Capture => "capture",
            Self::Refund => "refund",
        }
    }

    /// Name of the inbound request field carrying this id
    pub fn param_name(self) -> &'static str {
        match self {
            Self::Payment => "paymentId",
            Self::Sale => "saleId",
            Self::Authorization => "authorizationId",
            Self::Order => "orderId",
            Self::Capture => "captureId",
            Self::Refund => "refundId",
        }
    }
}

/// Where the outbound body (or query) of an action comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPolicy {
    /// GET: nothing is sent
    None,
    /// Supplied body sent unmodified, or nothing
    PassThrough,
    /// Supplied body, or `{}`
    OptionalOrEmpty,
    /// Always `{}`
    AlwaysEmpty,
    /// Supplied body, or `{"payer_id": ...}`
    ExecuteDefault,
    /// Supplied JSON-Patch document
    Patch,
    /// Query string from list filters
    Query,
}

impl Action {
    pub const ALL: [Action; 18] = [
        Self::CreatePayment,
        Self::ListPayments,
        Self::ShowPayment,
        Self::UpdatePayment,
        Self::ExecutePayment,
        Self::ShowSale,
        Self::RefundSale,
        Self::ShowAuthorization,
        Self::CaptureAuthorization,
        Self::VoidAuthorization,
        Self::Reauthorize,
        Self::ShowOrder,
        Self::CaptureOrder,
        Self::VoidOrder,
        Self::AuthorizeOrder,
        Self::ShowCapture,
        Self::RefundCapture,
        Self::ShowRefund,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatePayment => "create_payment",
            Self::ListPayments => "list_payments",
            Self::ShowPayment => "show_payment",
            Self::UpdatePayment => "update_payment",
            Self::ExecutePayment => "execute_payment",
            Self::ShowSale => "show_sale",
            Self::RefundSale => "refund_sale",
            Self::ShowAuthorization => "show_authorization",
            Self::CaptureAuthorization => "capture_authorization",
            Self::VoidAuthorization => "void_authorization",
            Self::Reauthorize => "reauthorize",
            Self::ShowOrder => "show_order",
            Self::CaptureOrder => "capture_order",
            Self::VoidOrder => "void_order",
            Self::AuthorizeOrder => "authorize_order",
            Self::ShowCapture => "show_capture",
            Self::RefundCapture => "refund_capture",
            Self::ShowRefund => "show_refund",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::ListPayments
            | Self::ShowPayment
            | Self::ShowSale
            | Self::ShowAuthorization
            | Self::ShowOrder
            | Self::ShowCapture
            | Self::ShowRefund => Method::GET,
            Self::UpdatePayment => Method::PATCH,
            _ => Method::POST,
        }
    }

    /// Resource id substituted into the path, if any
    pub fn resource(self) -> Option<Resource> {
        match self {
            Self::CreatePayment | Self::ListPayments => None,
            Self::ShowPayment | Self::UpdatePayment | Self::ExecutePayment => {
                Some(Resource::Payment)
            }
            Self::ShowSale | Self::RefundSale => Some(Resource::Sale),
            Self::ShowAuthorization
            | Self::CaptureAuthorization
            | Self::VoidAuthorization
            | Self::Reauthorize => Some(Resource::Authorization),
            Self::ShowOrder | Self::CaptureOrder | Self::VoidOrder | Self::AuthorizeOrder => {
                Some(Resource::Order)
            }
            Self::ShowCapture | Self::RefundCapture => Some(Resource::Capture),
            Self::ShowRefund => Some(Resource::Refund),
        }
    }

    /// Sub-resource appended after the id (`/execute`, `/refund`, ...)
    pub fn verb(self) -> Option<&'static str> {
        match self {
            Self::ExecutePayment => Some("execute"),
            Self::RefundSale | Self::RefundCapture => Some("refund"),
            Self::CaptureAuthorization | Self::CaptureOrder => Some("capture"),
            Self::VoidAuthorization => Some("void"),
            Self::VoidOrder => Some("do-void"),
            Self::Reauthorize => Some("reauthorize"),
            Self::AuthorizeOrder => Some("authorize"),
            _ => None,
        }
    }

    pub fn body_policy(self) -> BodyPolicy {
        match self {
            Self::ListPayments => BodyPolicy::Query,
            Self::UpdatePayment => BodyPolicy::Patch,
            Self::ExecutePayment => BodyPolicy::ExecuteDefault,
            Self::VoidAuthorization | Self::VoidOrder => BodyPolicy::AlwaysEmpty,
            Self::RefundSale | Self::RefundCapture => BodyPolicy::OptionalOrEmpty,
            Self::CreatePayment
            | Self::CaptureAuthorization
            | Self::Reauthorize
            | Self::CaptureOrder
            | Self::AuthorizeOrder => BodyPolicy::PassThrough,
            _ => BodyPolicy::None,
        }
    }

    pub fn group(self) -> &'static str {
        match self.resource() {
            None | Some(Resource::Payment) => "Payments",
            Some(Resource::Sale) => "Sales",
            Some(Resource::Authorization) => "Authorizations",
            Some(Resource::Order) => "Orders",
            Some(Resource::Capture) => "Captures",
            Some(Resource::Refund) => "Refunds",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::CreatePayment => "Create Payment",
            Self::ListPayments => "List Payments",
            Self::ShowPayment => "Show Payment Details",
            Self::UpdatePayment => "Patch Payment",
            Self::ExecutePayment => "Execute Payment",
            Self::ShowSale => "Show Sale Details",
            Self::RefundSale => "Refund Sale",
            Self::ShowAuthorization => "Show Authorization",
            Self::CaptureAuthorization => "Capture Authorization",
            Self::VoidAuthorization => "Void Authorization",
            Self::Reauthorize => "Re-authorize",
            Self::ShowOrder => "Show Order Details",
            Self::CaptureOrder => "Capture Order",
            Self::VoidOrder => "Void Order",
            Self::AuthorizeOrder => "Authorize Order",
            Self::ShowCapture => "Show Capture Details",
            Self::RefundCapture => "Refund Capture",
            Self::ShowRefund => "Show Refund Details",
        }
    }

    /// Whether a caller-supplied body is read by this action.
    ///
    /// For `update_payment` this is the patch document.
    pub fn takes_body(self) -> bool {
        !matches!(
            self.body_policy(),
            BodyPolicy::None | BodyPolicy::AlwaysEmpty | BodyPolicy::Query
        )
    }

    /// Sample body used to pre-fill editors.
    pub fn sample_body(self) -> Option<Value> {
        let usd_10 = json!({ "currency": "USD", "total": "10.00" });
        match self {
            Self::CreatePayment => Some(json!({
                "intent": "sale",
                "payer": { "payment_method": "paypal" },
                "transactions": [{
                    "amount": {
                        "total": "10.00",
                        "currency": "USD",
                        "details": { "subtotal": "10.00", "tax": "0.00", "shipping": "0.00" }
                    },
                    "description": "Test payment via V1 API tester",
                    "item_list": {
                        "items": [{
                            "name": "Test Item",
                            "description": "A test item",
                            "quantity": "1",
                            "price": "10.00",
                            "currency": "USD"
                        }]
                    }
                }],
                "redirect_urls": {
                    "return_url": "https://example.com/return",
                    "cancel_url": "https://example.com/cancel"
                }
            })),
            Self::ExecutePayment => Some(json!({ "payer_id": "" })),
            Self::RefundSale | Self::RefundCapture => Some(json!({})),
            Self::CaptureAuthorization | Self::CaptureOrder => {
                Some(json!({ "amount": usd_10, "is_final_capture": true }))
            }
            Self::Reauthorize | Self::AuthorizeOrder => Some(json!({ "amount": usd_10 })),
            Self::UpdatePayment => Some(json!([{
                "op": "replace",
                "path": "/transactions/0/amount",
                "value": {
                    "total": "20.00",
                    "currency": "USD",
                    "details": { "subtotal": "20.00", "tax": "0.00", "shipping": "0.00" }
                }
            }])),
            _ => None,
        }
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
