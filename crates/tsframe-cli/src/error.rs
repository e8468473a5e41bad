use arrow::error::ArrowError;
use snafu::Snafu;
use tsframe_core::prelude::{GapError, PersistError, SeriesError};

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("{source}"))]
    Persist { source: PersistError },

    #[snafu(display("{source}"))]
    Series { source: SeriesError },

    #[snafu(display("Gap analysis of {column} failed: {source}"))]
    Gaps { column: String, source: GapError },

    #[snafu(display("Failed to create directory: {path}"))]
    CreateDirAll {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Input path has no file name: {path}"))]
    NoFileName { path: String },

    #[snafu(display("Failed to render table: {source}"))]
    Render { source: ArrowError },
}
