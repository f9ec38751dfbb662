//! Async data collaborators for the charting subsystem: the dashboard's
//! price API client and the stale-response guard that keeps superseded
//! fetches from reaching a live chart.

pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod provider;

pub use dashboard::DashboardProvider;
pub use error::ProviderError;
pub use fetch::{FetchGeneration, FetchTicket};
pub use provider::{Interval, PriceProvider};
