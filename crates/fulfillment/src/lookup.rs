//! Fulfillment lookup operations and failure classification.
//!
//! Two entry points, both read-only and idempotent:
//!
//! - [`FulfillmentLookup::get_fulfillment_orders`] - fetches fulfillments via
//!   the dedicated fulfillments sub-resource endpoint.
//! - [`FulfillmentLookup::get_fulfillments`] - fetches the parent order
//!   resource (which embeds fulfillments) and extracts the nested list.
//!
//! Neither operation ever returns an error to its caller: every collaborator
//! failure is classified into a [`LookupFailure`] carrying one of two error
//! codes (`SHOPIFY_ADMIN_AUTH_ERROR`, `SHOPIFY_FULFILLMENT_FETCH_ERROR`).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::client::{AdminCallError, ShopifyAdminCaller};

/// Fallback HTTP status reported when no status could be determined
/// (network errors, unparseable messages).
const FALLBACK_HTTP_STATUS: u16 = 500;

/// Regex for extracting the first parenthesized status code from an error
/// message, e.g. `"Shopify Admin API error (401): Invalid API key"`.
static STATUS_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("Invalid regex"));

/// Error codes reported to callers on lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LookupErrorCode {
    /// Upstream responded with HTTP 401 or 403.
    #[serde(rename = "SHOPIFY_ADMIN_AUTH_ERROR")]
    AdminAuth,
    /// Any other failure: network error, non-auth HTTP error, malformed
    /// response, or unparseable status.
    #[serde(rename = "SHOPIFY_FULFILLMENT_FETCH_ERROR")]
    FulfillmentFetch,
}

impl LookupErrorCode {
    /// Get the wire-format error code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminAuth => "SHOPIFY_ADMIN_AUTH_ERROR",
            Self::FulfillmentFetch => "SHOPIFY_FULFILLMENT_FETCH_ERROR",
        }
    }
}

impl std::fmt::Display for LookupErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fulfillment record as returned by the Admin API.
///
/// Only `id` is interpreted (for summarization); all other fields pass
/// through unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fulfillment {
    /// Fulfillment ID (may be a number or a string upstream).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Remaining fulfillment fields, passed through untouched.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

/// Response envelope for `/orders/{id}/fulfillments.json`.
#[derive(Debug, Deserialize)]
struct FulfillmentsEnvelope {
    #[serde(default)]
    fulfillments: Vec<Fulfillment>,
}

/// Response envelope for `/orders/{id}.json`.
#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    #[serde(default)]
    order: Option<OrderResource>,
}

/// The slice of the order resource this component reads.
#[derive(Debug, Deserialize)]
struct OrderResource {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fulfillments: Vec<Fulfillment>,
}

/// Successful result of [`FulfillmentLookup::get_fulfillment_orders`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentSummary {
    /// Always 200 on success.
    pub http_status: u16,
    /// Fulfillment records, in upstream order.
    pub fulfillments: Vec<Fulfillment>,
    /// Number of fulfillments.
    pub count: usize,
    /// Each fulfillment's `id`, in original order.
    pub fulfillment_ids: Vec<Value>,
    /// The original response body, unmodified.
    pub raw_response: Value,
}

/// Successful result of [`FulfillmentLookup::get_fulfillments`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFulfillmentSummary {
    /// Always 200 on success.
    pub http_status: u16,
    /// The returned order's `id`, absent when the order object is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Value>,
    /// The returned order's `name`, absent when the order object is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_name: Option<String>,
    /// Fulfillment records embedded in the order, in upstream order.
    pub fulfillments: Vec<Fulfillment>,
    /// Number of fulfillments.
    pub count: usize,
    /// Each fulfillment's `id`, in original order.
    pub fulfillment_ids: Vec<Value>,
    /// The original response body, unmodified.
    pub raw_response: Value,
}

/// Structured failure reported by either lookup operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupFailure {
    /// Upstream HTTP status, or 500 when none could be determined.
    pub http_status: u16,
    /// Application-level error code.
    pub error: LookupErrorCode,
    /// The original error message, preserved verbatim.
    pub message: String,
    /// Always empty on failure.
    pub fulfillments: Vec<Fulfillment>,
    /// Always 0 on failure.
    pub count: usize,
    /// Always empty on failure.
    pub fulfillment_ids: Vec<Value>,
}

/// Terminal outcome of a lookup operation.
///
/// Lookup operations return this directly instead of `Result`: failures are
/// data reported back to the caller, not errors to propagate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupOutcome<S> {
    /// The API call succeeded and the response was normalized.
    Success(S),
    /// The API call failed and was classified.
    Failure(LookupFailure),
}

impl<S> LookupOutcome<S> {
    /// Whether this outcome is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success payload, if any.
    #[must_use]
    pub fn success(self) -> Option<S> {
        match self {
            Self::Success(summary) => Some(summary),
            Self::Failure(_) => None,
        }
    }

    /// The failure payload, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&LookupFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// Fulfillment lookup over a Shopify Admin API caller.
///
/// Stateless apart from the caller; concurrent invocations are independent.
#[derive(Debug, Clone)]
pub struct FulfillmentLookup<C> {
    caller: C,
}

impl<C: ShopifyAdminCaller> FulfillmentLookup<C> {
    /// Create a lookup component over the given Admin API caller.
    pub const fn new(caller: C) -> Self {
        Self { caller }
    }

    /// Fetch fulfillments for an order via the fulfillments sub-resource.
    ///
    /// Calls `/orders/{order_id}/fulfillments.json` and normalizes the
    /// `fulfillments` array (missing field defaults to empty). Never fails:
    /// collaborator errors are classified into a [`LookupFailure`].
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_fulfillment_orders(
        &self,
        order_id: &str,
    ) -> LookupOutcome<FulfillmentSummary> {
        let path = format!("/orders/{order_id}/fulfillments.json");
        let raw = match self.caller.call(&path).await {
            Ok(raw) => raw,
            Err(err) => return LookupOutcome::Failure(classify_failure(&err)),
        };

        let envelope: FulfillmentsEnvelope = match parse_envelope(&raw) {
            Ok(envelope) => envelope,
            Err(err) => return LookupOutcome::Failure(classify_failure(&err)),
        };

        let fulfillments = envelope.fulfillments;
        tracing::debug!(count = fulfillments.len(), "fetched fulfillments");

        LookupOutcome::Success(FulfillmentSummary {
            http_status: 200,
            count: fulfillments.len(),
            fulfillment_ids: fulfillment_ids(&fulfillments),
            fulfillments,
            raw_response: raw,
        })
    }

    /// Fetch fulfillments embedded in the parent order resource.
    ///
    /// Calls `/orders/{order_id}.json` and extracts `order.fulfillments`
    /// (missing order or field defaults to empty). Also surfaces the returned
    /// order's `id` and `name`. Never fails: collaborator errors are
    /// classified into a [`LookupFailure`].
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_fulfillments(&self, order_id: &str) -> LookupOutcome<OrderFulfillmentSummary> {
        let path = format!("/orders/{order_id}.json");
        let raw = match self.caller.call(&path).await {
            Ok(raw) => raw,
            Err(err) => return LookupOutcome::Failure(classify_failure(&err)),
        };

        let envelope: OrderEnvelope = match parse_envelope(&raw) {
            Ok(envelope) => envelope,
            Err(err) => return LookupOutcome::Failure(classify_failure(&err)),
        };

        let (order_id_field, order_name, fulfillments) = match envelope.order {
            Some(order) => (order.id, order.name, order.fulfillments),
            None => (None, None, Vec::new()),
        };
        tracing::debug!(count = fulfillments.len(), "fetched order fulfillments");

        LookupOutcome::Success(OrderFulfillmentSummary {
            http_status: 200,
            order_id: order_id_field,
            order_name,
            count: fulfillments.len(),
            fulfillment_ids: fulfillment_ids(&fulfillments),
            fulfillments,
            raw_response: raw,
        })
    }
}

/// Deserialize a response body into a lenient envelope type.
fn parse_envelope<T: serde::de::DeserializeOwned>(raw: &Value) -> Result<T, AdminCallError> {
    serde_json::from_value(raw.clone())
        .map_err(|e| AdminCallError::Parse(format!("Unexpected response shape: {e}")))
}

/// Collect each fulfillment's `id`, in original order.
///
/// A fulfillment without an `id` contributes `null`, matching the upstream
/// pass-through behavior.
fn fulfillment_ids(fulfillments: &[Fulfillment]) -> Vec<Value> {
    fulfillments
        .iter()
        .map(|f| f.id.clone().unwrap_or(Value::Null))
        .collect()
}

/// Extract the first parenthesized decimal status code from an error message.
fn extract_status(message: &str) -> Option<u16> {
    STATUS_CODE_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Classify a collaborator failure into a structured [`LookupFailure`].
///
/// Prefers the structured status carried by the error; falls back to parsing
/// the first parenthesized code out of the rendered message. 401/403 map to
/// [`LookupErrorCode::AdminAuth`]; everything else (including an
/// undeterminable status, which reports as 500) maps to
/// [`LookupErrorCode::FulfillmentFetch`].
fn classify_failure(err: &AdminCallError) -> LookupFailure {
    let message = err.to_string();
    let status = err.http_status().or_else(|| extract_status(&message));

    let (http_status, error) = match status {
        Some(code @ (401 | 403)) => (code, LookupErrorCode::AdminAuth),
        // 0 is not a real status; fold it into the fallback
        Some(code) if code != 0 => (code, LookupErrorCode::FulfillmentFetch),
        _ => (FALLBACK_HTTP_STATUS, LookupErrorCode::FulfillmentFetch),
    };

    tracing::warn!(http_status, error = %error, "fulfillment lookup failed");

    LookupFailure {
        http_status,
        error,
        message,
        fulfillments: Vec::new(),
        count: 0,
        fulfillment_ids: Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_status_auth_codes() {
        assert_eq!(
            extract_status("Shopify Admin API error (401): Invalid API key"),
            Some(401)
        );
        assert_eq!(
            extract_status("Shopify Admin API error (403): Forbidden"),
            Some(403)
        );
    }

    #[test]
    fn test_extract_status_takes_first_match() {
        assert_eq!(extract_status("error (404): see also (500)"), Some(404));
    }

    #[test]
    fn test_extract_status_no_match() {
        assert_eq!(extract_status("network timeout"), None);
        assert_eq!(extract_status("error (abc): not a code"), None);
    }

    #[test]
    fn test_classify_401_as_auth_error() {
        let err = AdminCallError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        let failure = classify_failure(&err);

        assert_eq!(failure.error, LookupErrorCode::AdminAuth);
        assert_eq!(failure.http_status, 401);
        assert_eq!(
            failure.message,
            "Shopify Admin API error (401): Invalid API key"
        );
        assert!(failure.fulfillments.is_empty());
        assert_eq!(failure.count, 0);
        assert!(failure.fulfillment_ids.is_empty());
    }

    #[test]
    fn test_classify_403_as_auth_error() {
        let err = AdminCallError::Api {
            status: 403,
            message: "Forbidden".to_string(),
        };
        let failure = classify_failure(&err);

        assert_eq!(failure.error, LookupErrorCode::AdminAuth);
        assert_eq!(failure.http_status, 403);
    }

    #[test]
    fn test_classify_404_as_fetch_error() {
        let err = AdminCallError::Api {
            status: 404,
            message: "Not Found".to_string(),
        };
        let failure = classify_failure(&err);

        assert_eq!(failure.error, LookupErrorCode::FulfillmentFetch);
        assert_eq!(failure.http_status, 404);
    }

    #[test]
    fn test_classify_unparseable_message_falls_back_to_500() {
        let err = AdminCallError::Parse("network timeout".to_string());
        let failure = classify_failure(&err);

        assert_eq!(failure.error, LookupErrorCode::FulfillmentFetch);
        assert_eq!(failure.http_status, 500);
        assert_eq!(failure.message, "Parse error: network timeout");
    }

    #[test]
    fn test_classify_status_parsed_from_message_text() {
        // No structured status on Parse errors, so the parenthesized code
        // in the message text decides the classification.
        let err = AdminCallError::Parse("upstream said (401): token rejected".to_string());
        let failure = classify_failure(&err);

        assert_eq!(failure.error, LookupErrorCode::AdminAuth);
        assert_eq!(failure.http_status, 401);
    }

    #[test]
    fn test_classify_zero_status_falls_back_to_500() {
        let err = AdminCallError::Parse("aborted (0): no response".to_string());
        let failure = classify_failure(&err);

        assert_eq!(failure.error, LookupErrorCode::FulfillmentFetch);
        assert_eq!(failure.http_status, 500);
    }

    #[test]
    fn test_fulfillment_ids_preserve_order_and_nulls() {
        let fulfillments: Vec<Fulfillment> =
            serde_json::from_value(json!([{"id": 2}, {"status": "success"}, {"id": "gid-1"}]))
                .unwrap();

        assert_eq!(
            fulfillment_ids(&fulfillments),
            vec![json!(2), Value::Null, json!("gid-1")]
        );
    }

    #[test]
    fn test_fulfillments_envelope_defaults_to_empty() {
        let envelope: FulfillmentsEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.fulfillments.is_empty());
    }

    #[test]
    fn test_order_envelope_defaults() {
        let envelope: OrderEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.order.is_none());

        let envelope: OrderEnvelope =
            serde_json::from_value(json!({"order": {"id": 123, "name": "#1001"}})).unwrap();
        let order = envelope.order.unwrap();
        assert_eq!(order.id, Some(json!(123)));
        assert_eq!(order.name.as_deref(), Some("#1001"));
        assert!(order.fulfillments.is_empty());
    }

    #[test]
    fn test_fulfillment_passes_through_unknown_fields() {
        let fulfillment: Fulfillment =
            serde_json::from_value(json!({"id": 1, "status": "success", "tracking_number": "T1"}))
                .unwrap();

        assert_eq!(fulfillment.id, Some(json!(1)));
        assert_eq!(
            fulfillment.fields.get("tracking_number"),
            Some(&json!("T1"))
        );

        let round_tripped = serde_json::to_value(&fulfillment).unwrap();
        assert_eq!(
            round_tripped,
            json!({"id": 1, "status": "success", "tracking_number": "T1"})
        );
    }

    #[test]
    fn test_error_code_wire_format() {
        assert_eq!(LookupErrorCode::AdminAuth.as_str(), "SHOPIFY_ADMIN_AUTH_ERROR");
        assert_eq!(
            serde_json::to_value(LookupErrorCode::FulfillmentFetch).unwrap(),
            json!("SHOPIFY_FULFILLMENT_FETCH_ERROR")
        );
    }
}
