//! Market data ingestion: the provider-facing half of the workspace.
//!
//! - [`models`] holds the request parameters and the provider-shaped
//!   [`BarFrame`](models::frame::BarFrame) a batch call returns.
//! - [`providers`] defines the [`DataProvider`](providers::DataProvider) trait,
//!   its error types, the Yahoo Finance adapter and a caller-side deadline wrapper.

pub mod models;
pub mod providers;
