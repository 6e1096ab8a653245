//! Yahoo Finance daily bars via the public v8 chart endpoint.
//!
//! The endpoint answers one symbol per request, so a batch call issues one request
//! per symbol (sequentially) and stitches the answers into a single
//! multi-instrument [`BarFrame`](crate::models::frame::BarFrame) with
//! `(Open|High|Low|Close|Adj Close|Volume, SYMBOL)` columns over the union of
//! trading dates. Yahoo has no official API and may change shape without notice;
//! shape problems surface as [`ProviderError::MalformedResponse`](crate::providers::ProviderError).

pub mod provider;
pub mod response;

pub use provider::YahooProvider;
