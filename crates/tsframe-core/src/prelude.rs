//! Convenience prelude.
//!
//! Downstream code should prefer importing from here instead of reaching into
//! individual module paths.

pub use crate::formats::{CsvReadOptions, PersistError, ReadStrategy, WriteStrategy};
pub use crate::gaps::{GapError, GapReport, GapRun, GapSummary, analyze_all, analyze_column};
pub use crate::scaler::{
    MinMaxScaler, RobustScaler, ScaleState, Scaler, ScalerError, ScalerParams, StandardScaler,
};
pub use crate::series::{
    ErrorKind, Format, GAP_MASK_SUFFIX, JoinMode, SeriesError, SeriesResult, TimeSeries,
};
pub use crate::table::{TableError, table_from_columns};
