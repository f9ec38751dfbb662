//! Core computation and coordination for the intraday charting subsystem:
//! candle resampling, the relative-strength oscillator, signal scanning,
//! shape-preserving preview downsampling, and visible-range
//! synchronization across chart panes. Pure and synchronous; all I/O lives
//! in `chartkit-providers`.

pub mod adapter;
pub mod candle;
pub mod error;
pub mod oscillator;
pub mod pipeline;
pub mod preview;
pub mod resample;
pub mod session;
pub mod signal;
pub mod sync;

pub use candle::Candle;
pub use error::ChartError;
pub use pipeline::{ChartConfig, DerivedSeries};
pub use sync::TimeRange;
