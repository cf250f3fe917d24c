//! # Atlas Fetch
//!
//! The data layer of the resale atlas. Owns every fetched dataset and the
//! lifecycle of the requests that produce them.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          DATA COORDINATOR                            │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  begin_base_load ──spawn──> try_join!(properties, agg_prices,        │
//! │                                       geojson, agg_address_prices)   │
//! │                                  │ all-or-nothing                    │
//! │                                  ▼                                   │
//! │  request_towns ──> epoch += 1 ──spawn──> sleep(debounce) ─> prices   │
//! │        │            abort(previous)            │                     │
//! │        │                                       ▼                     │
//! │   unchanged? skip                    mpsc ── FetchEvent ──> apply    │
//! │   empty? clear                                 (epoch == current?)   │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is advisory: an aborted task simply never reports. The
//! epoch comparison in [`DataCoordinator::apply`] is what keeps a stale
//! response out of the resident data.

pub mod coordinator;
pub mod http;
pub mod memory;
pub mod query;
pub mod source;
pub mod wire;

pub use coordinator::{
    Applied, CoordinatorStats, DataCoordinator, DynamicRequest, FetchEpoch, FetchEvent, LoadPhase,
    ResidentData,
};
pub use http::HttpPriceSource;
pub use memory::{MemorySource, SourceCall, WireFixtures};
pub use query::{PriceQuery, PriceWindow, TownScope};
pub use source::{load_base, BaseData, Endpoint, PriceSource};

/// Result of a single request
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Why a request failed. Cloneable so the error slot can be snapshotted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: Endpoint, message: String },

    #[error("malformed {endpoint} payload: {message}")]
    Malformed { endpoint: Endpoint, message: String },

    #[error("invalid API endpoint: {0}")]
    InvalidEndpoint(String),
}

impl FetchError {
    pub(crate) fn malformed(endpoint: Endpoint, err: impl std::fmt::Display) -> Self {
        FetchError::Malformed {
            endpoint,
            message: err.to_string(),
        }
    }
}

/// What the UI shows in its single error slot
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// Any base request failed; nothing can be rendered
    #[error("base data failed to load: {0}")]
    BaseLoadFailure(FetchError),

    /// The per-selection price fetch failed; earlier data stays on screen
    #[error("price update failed: {0}")]
    DynamicLoadFailure(FetchError),
}

impl DataError {
    /// Base failures block the UI, dynamic ones are dismissible
    pub fn is_fatal(&self) -> bool {
        matches!(self, DataError::BaseLoadFailure(_))
    }

    pub fn cause(&self) -> &FetchError {
        match self {
            DataError::BaseLoadFailure(e) | DataError::DynamicLoadFailure(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FetchError::Status {
            endpoint: Endpoint::Prices,
            status: 502,
        };
        assert_eq!(err.to_string(), "/api/prices returned HTTP 502");

        let data = DataError::DynamicLoadFailure(err.clone());
        assert!(!data.is_fatal());
        assert_eq!(data.cause(), &err);
        assert!(DataError::BaseLoadFailure(err).is_fatal());
    }
}
