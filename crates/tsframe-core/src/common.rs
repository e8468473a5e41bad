//! Shared error types and helpers for handling the timestamp axis.
//!
//! Every table handled by this crate keeps its time axis in column 0. The
//! helpers here validate that column and expose its values as raw `i64`
//! ticks so sorting and joining can work across timestamp units.

pub mod time_column;
