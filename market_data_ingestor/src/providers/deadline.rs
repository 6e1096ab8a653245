//! Caller-imposed deadline around any [`DataProvider`].
//!
//! Providers have no internal timeout. A caller that needs one wraps the provider:
//!
//! ```no_run
//! use std::time::Duration;
//! use market_data_ingestor::providers::{deadline::Deadline, yahoo::YahooProvider};
//!
//! let provider = Deadline::new(YahooProvider::new().unwrap(), Duration::from_secs(30));
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{frame::BarFrame, request_params::BarsRequestParams};
use crate::providers::{DataProvider, ProviderError, TimeoutSnafu};

/// Fails the wrapped call with [`ProviderError::Timeout`] once `limit` elapses.
pub struct Deadline<P> {
    inner: P,
    limit: Duration,
}

impl<P> Deadline<P> {
    pub fn new(inner: P, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

#[async_trait]
impl<P> DataProvider for Deadline<P>
where
    P: DataProvider + Send + Sync,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarFrame, ProviderError> {
        match tokio::time::timeout(self.limit, self.inner.fetch_bars(params)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    provider = self.inner.name(),
                    limit_ms = self.limit.as_millis() as u64,
                    "provider call exceeded deadline"
                );
                TimeoutSnafu {
                    limit_ms: self.limit.as_millis() as u64,
                }
                .fail()
            }
        }
    }
}
