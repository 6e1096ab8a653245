//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, which serves as a unified interface
//! for fetching daily bar data for a batch of symbols from any market data vendor.
//!
//! A provider answers with a [`BarFrame`] in its own shape (field names, casing and
//! date labels are vendor-defined). An empty frame is a normal answer, e.g. for a
//! range that only covers weekends or holidays. Providers make exactly one attempt
//! per call; retrying is the caller's decision.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::{frame::BarFrame, request_params::BarsRequestParams};
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl DataProvider for MyProvider {
//!     async fn fetch_bars(&self, _params: BarsRequestParams) -> Result<BarFrame, ProviderError> {
//!         Ok(BarFrame::default())
//!     }
//! }
//! ```
//!

pub mod deadline;
pub mod yahoo;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{frame::BarFrame, request_params::BarsRequestParams};

/// Trait for fetching daily bar data from a market data provider.
///
/// Implement this trait for each concrete data vendor. The trait is designed for
/// async usage and supports dynamic dispatch (`dyn DataProvider`) for runtime
/// selection of providers.
#[async_trait]
pub trait DataProvider {
    /// Short, stable provider name used in logs.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Fetches daily bars for every symbol in `params` over the inclusive range.
    ///
    /// # Returns
    ///
    /// * `Ok(BarFrame)` - The batch result; may be empty when there is no data.
    /// * `Err(ProviderError)` - Transport, upstream or payload-shape failure.
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarFrame, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, connection reset).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with an error status or error payload.
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The payload did not have the shape the provider adapter expects.
    #[snafu(display("Malformed response: {message}"))]
    MalformedResponse {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The caller's deadline elapsed before the provider answered.
    #[snafu(display("Provider did not answer within {limit_ms} ms"))]
    Timeout { limit_ms: u64, backtrace: Backtrace },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

/// Shared request validation for provider implementations.
pub fn validate_params(params: &BarsRequestParams) -> Result<(), ProviderError> {
    if params.symbols.is_empty() {
        return ValidationSnafu {
            message: "at least one symbol is required",
        }
        .fail();
    }
    if params.start > params.end {
        return ValidationSnafu {
            message: format!("start {} is after end {}", params.start, params.end),
        }
        .fail();
    }
    Ok(())
}
