//! Core engine for wide/long time-series tables.
//!
//! This crate provides the pieces behind `tsframe`:
//!
//! - A [`TimeSeries`](series::TimeSeries) entity that wraps an Arrow
//!   `RecordBatch`, tags it as wide or long, and guards the
//!   "column 0 is a timestamp" invariant (`series` module).
//! - Wide <-> long conversion, multivariate split and timestamp-aligned join,
//!   and normalize/denormalize with recoverable scaler state.
//! - Run-length analysis of missing values in a column (`gaps` module).
//! - Fit/transform scalers with closed-form inverses (`scaler` module).
//! - Parquet and CSV persistence strategies that carry the series metadata
//!   alongside the data (`formats` module).
//!
//! Everything here is synchronous and single-owner: a `TimeSeries` has no
//! internal locking, so callers that share one across threads must serialize
//! access themselves.
#![deny(missing_docs)]
pub mod common;
pub mod formats;
pub mod gaps;
pub mod prelude;
pub mod scaler;
pub mod series;
pub mod table;
