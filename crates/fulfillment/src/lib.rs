//! Fulfillment lookup against the Shopify Admin REST API.
//!
//! Retrieves fulfillment records for an order, normalizes the response shape,
//! and maps transport errors onto a small set of application-level error
//! codes. Lookup operations never fail: every collaborator error is converted
//! into a structured [`lookup::LookupFailure`] so callers always receive a
//! typed outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_fulfillment::{AdminRestClient, FulfillmentLookup, ShopifyAdminConfig};
//!
//! let config = ShopifyAdminConfig::from_env()?;
//! let lookup = FulfillmentLookup::new(AdminRestClient::new(&config)?);
//!
//! let outcome = lookup.get_fulfillment_orders("123456789").await;
//! if let Some(summary) = outcome.success() {
//!     println!("{} fulfillments: {:?}", summary.count, summary.fulfillment_ids);
//! } else {
//!     // SHOPIFY_ADMIN_AUTH_ERROR or SHOPIFY_FULFILLMENT_FETCH_ERROR
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod lookup;

pub use client::{AdminCallError, AdminRestClient, ShopifyAdminCaller};
pub use config::{ConfigError, ShopifyAdminConfig};
pub use lookup::{
    Fulfillment, FulfillmentLookup, FulfillmentSummary, LookupErrorCode, LookupFailure,
    LookupOutcome, OrderFulfillmentSummary,
};
