//! Persistence strategies for time series.
//!
//! A time series is stored as its table plus a few string attributes:
//! `format` (`"wide"`/`"long"`), `features` (decimal feature count) and,
//! once normalized, `scale_state` (JSON). Both attributes besides the scale
//! state are mandatory on read and feed straight back into
//! [`TimeSeries::from_table`].
//!
//! Two backends are supported, chosen by a closed set of strategies:
//! - Parquet: attributes live in the file's key-value metadata.
//! - CSV: data goes through `arrow-csv` with a header row, attributes go to a
//!   JSON sidecar next to the file (`<file>.meta.json`).

mod csv;
mod parquet;

use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::error::ArrowError;
use log::info;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::scaler::ScaleState;
use crate::series::{Format, SeriesError, TimeSeries};

pub use csv::CsvReadOptions;

/// Metadata key holding the layout tag.
pub const FORMAT_KEY: &str = "format";
/// Metadata key holding the decimal feature count.
pub const FEATURES_KEY: &str = "features";
/// Metadata key holding the JSON scale state.
pub const SCALE_STATE_KEY: &str = "scale_state";

/// Errors raised while reading or writing a time series.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PersistError {
    /// Filesystem error.
    #[snafu(display("I/O error at {path}: {source}"))]
    Io {
        /// File involved.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Parquet encoding or decoding failed.
    #[snafu(display("Parquet error at {path}: {source}"))]
    Parquet {
        /// File involved.
        path: String,
        /// Underlying Parquet error.
        source: ::parquet::errors::ParquetError,
    },

    /// Arrow or CSV conversion failed.
    #[snafu(display("Arrow error at {path}: {source}"))]
    Arrow {
        /// File involved.
        path: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// Metadata JSON could not be encoded or decoded.
    #[snafu(display("Invalid metadata JSON at {path}: {source}"))]
    Json {
        /// File involved.
        path: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// A mandatory attribute is absent.
    #[snafu(display("Missing '{key}' metadata in {path}"))]
    MissingMetadata {
        /// File involved.
        path: String,
        /// Name of the missing attribute.
        key: &'static str,
    },

    /// An attribute is present but unusable.
    #[snafu(display("Invalid '{key}' metadata in {path}: {value:?} ({reason})"))]
    InvalidMetadata {
        /// File involved.
        path: String,
        /// Name of the attribute.
        key: &'static str,
        /// Stored value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The declared CSV column types do not match the header.
    #[snafu(display("{path} has {found} columns but {declared} column types were declared"))]
    ColumnTypeCount {
        /// File involved.
        path: String,
        /// Number of declared types.
        declared: usize,
        /// Number of header columns.
        found: usize,
    },

    /// The extension does not name a supported backend.
    #[snafu(display("Cannot pick a storage format for {path}; expected .parquet or .csv"))]
    UnsupportedExtension {
        /// File involved.
        path: String,
    },

    /// The stored table cannot back a time series.
    #[snafu(display("Cannot build time series from {path}: {source}"))]
    Series {
        /// File involved.
        path: String,
        /// Underlying construction error.
        source: SeriesError,
    },
}

/// Series attributes stored alongside the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// Layout tag.
    #[serde(default)]
    pub format: Option<String>,
    /// Decimal feature count.
    #[serde(default)]
    pub features: Option<String>,
    /// Scale state of a normalized series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_state: Option<ScaleState>,
}

impl SeriesMetadata {
    /// Attributes describing `ts`.
    pub fn describe(ts: &TimeSeries) -> Self {
        Self {
            format: Some(ts.format().to_string()),
            features: Some(ts.feature_count().to_string()),
            scale_state: ts.scale_state().cloned(),
        }
    }

    /// Flatten into string pairs, the scale state encoded as JSON.
    pub fn to_key_values(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(format) = &self.format {
            pairs.push((FORMAT_KEY.to_string(), format.clone()));
        }
        if let Some(features) = &self.features {
            pairs.push((FEATURES_KEY.to_string(), features.clone()));
        }
        if let Some(state) = &self.scale_state {
            pairs.push((SCALE_STATE_KEY.to_string(), serde_json::to_string(state)?));
        }
        Ok(pairs)
    }

    /// Collect the known keys out of string pairs; other keys are ignored.
    pub fn from_key_values<I>(pairs: I) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut metadata = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                FORMAT_KEY => metadata.format = Some(value),
                FEATURES_KEY => metadata.features = Some(value),
                SCALE_STATE_KEY => metadata.scale_state = Some(serde_json::from_str(&value)?),
                _ => {}
            }
        }
        Ok(metadata)
    }

    /// Validate the attributes and wrap `table` as a time series.
    ///
    /// `features` must parse as an integer greater than 1 unless the table
    /// has no rows.
    pub(crate) fn assemble(self, path: &Path, table: RecordBatch) -> Result<TimeSeries, PersistError> {
        let display = path.display().to_string();

        let raw_format = self.format.context(MissingMetadataSnafu {
            path: &display,
            key: FORMAT_KEY,
        })?;
        let format: Format = raw_format.parse().map_err(|err: SeriesError| {
            InvalidMetadataSnafu {
                path: &display,
                key: FORMAT_KEY,
                value: &raw_format,
                reason: err.to_string(),
            }
            .build()
        })?;

        let raw_features = self.features.context(MissingMetadataSnafu {
            path: &display,
            key: FEATURES_KEY,
        })?;
        let features: usize = raw_features.trim().parse().map_err(|err: std::num::ParseIntError| {
            InvalidMetadataSnafu {
                path: &display,
                key: FEATURES_KEY,
                value: &raw_features,
                reason: err.to_string(),
            }
            .build()
        })?;
        ensure!(
            features > 1 || table.num_rows() == 0,
            InvalidMetadataSnafu {
                path: &display,
                key: FEATURES_KEY,
                value: &raw_features,
                reason: "a non-empty series needs at least 2 features",
            }
        );

        let ts = TimeSeries::from_table(table, format, features)
            .context(SeriesSnafu { path: &display })?
            .with_scale_state(self.scale_state);
        info!(
            "read {format} series from {display}: {} rows, {features} features",
            ts.len()
        );
        Ok(ts)
    }
}

/// How to read a time series from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadStrategy {
    /// Parquet file with key-value metadata.
    Parquet,
    /// CSV file with a JSON sidecar.
    Csv(CsvReadOptions),
}

impl ReadStrategy {
    /// Pick a strategy from the file extension (`.parquet`/`.pq` or `.csv`).
    pub fn for_path(path: &Path) -> Result<Self, PersistError> {
        match extension(path).as_deref() {
            Some("parquet" | "pq") => Ok(ReadStrategy::Parquet),
            Some("csv") => Ok(ReadStrategy::Csv(CsvReadOptions::default())),
            _ => UnsupportedExtensionSnafu {
                path: path.display().to_string(),
            }
            .fail(),
        }
    }

    /// Read the series stored at `path`.
    pub fn read(&self, path: &Path) -> Result<TimeSeries, PersistError> {
        match self {
            ReadStrategy::Parquet => parquet::read(path),
            ReadStrategy::Csv(options) => csv::read(path, options),
        }
    }
}

/// How to write a time series to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Parquet file with key-value metadata.
    Parquet,
    /// CSV file with a JSON sidecar.
    Csv,
}

impl WriteStrategy {
    /// Pick a strategy from the file extension (`.parquet`/`.pq` or `.csv`).
    pub fn for_path(path: &Path) -> Result<Self, PersistError> {
        match extension(path).as_deref() {
            Some("parquet" | "pq") => Ok(WriteStrategy::Parquet),
            Some("csv") => Ok(WriteStrategy::Csv),
            _ => UnsupportedExtensionSnafu {
                path: path.display().to_string(),
            }
            .fail(),
        }
    }

    /// Write `ts` to `path`, replacing any existing file.
    pub fn write(&self, path: &Path, ts: &TimeSeries) -> Result<(), PersistError> {
        match self {
            WriteStrategy::Parquet => parquet::write(path, ts)?,
            WriteStrategy::Csv => csv::write(path, ts)?,
        }
        info!(
            "wrote {} series to {}: {} rows, {} features",
            ts.format(),
            path.display(),
            ts.len(),
            ts.feature_count()
        );
        Ok(())
    }
}

/// Path of the JSON sidecar that accompanies a CSV file.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".meta.json");
    path.with_file_name(name)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
