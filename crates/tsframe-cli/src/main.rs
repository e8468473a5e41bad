//! CLI tool for wide/long time-series files.

mod error;
mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use snafu::{OptionExt, ResultExt};
use tracing_subscriber::EnvFilter;
use tsframe_core::prelude::{
    Format, JoinMode, MinMaxScaler, ReadStrategy, RobustScaler, Scaler, StandardScaler,
    TimeSeries, WriteStrategy, analyze_all, analyze_column,
};

use crate::error::{
    CliResult, CreateDirAllSnafu, GapsSnafu, NoFileNameSnafu, PersistSnafu, RenderSnafu,
    SeriesSnafu,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Wide,
    Long,
}

impl From<FormatArg> for Format {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Wide => Format::Wide,
            FormatArg::Long => Format::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JoinModeArg {
    Inner,
    Outer,
    Exact,
}

impl From<JoinModeArg> for JoinMode {
    fn from(v: JoinModeArg) -> Self {
        match v {
            JoinModeArg::Inner => JoinMode::Inner,
            JoinModeArg::Outer => JoinMode::Outer,
            JoinModeArg::Exact => JoinMode::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScalerArg {
    Minmax,
    Robust,
    Standard,
}

fn make_scaler(kind: ScalerArg) -> Box<dyn Scaler> {
    match kind {
        ScalerArg::Minmax => Box::new(MinMaxScaler::new()),
        ScalerArg::Robust => Box::new(RobustScaler::new()),
        ScalerArg::Standard => Box::new(StandardScaler::new()),
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show format, feature count, cardinality, scale state and a preview
    Inspect {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value_t = 10)]
        max_rows: usize,
    },

    /// Convert between wide and long layouts
    Convert {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum)]
        to: FormatArg,
    },

    /// Write one univariate file per signal column
    Split {
        #[arg(long)]
        input: PathBuf,

        /// Files are named <stem>_<signal>.<ext>
        #[arg(long = "output-dir")]
        output_dir: PathBuf,
    },

    /// Join univariate files on their timestamps
    Join {
        /// Repeatable; at least one
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = JoinModeArg::Inner)]
        mode: JoinModeArg,
    },

    /// Run-length report of missing values
    Gaps {
        #[arg(long)]
        input: PathBuf,

        /// Analyze a single column (default: every numeric column)
        #[arg(long)]
        column: Option<String>,
    },

    /// Add a <signal>_nan column with interpolated gap values
    GapMask {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Scale numeric columns and record the scale state
    Normalize {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = ScalerArg::Minmax)]
        scaler: ScalerArg,

        /// Repeatable column names (default: every numeric column)
        #[arg(long = "column")]
        columns: Vec<String>,
    },

    /// Undo the recorded normalization
    Denormalize {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(name = "tsframe", version, about = "Wide/long time-series toolbox")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tsframe=debug" } else { "tsframe=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_series(path: &Path) -> CliResult<TimeSeries> {
    ReadStrategy::for_path(path)
        .and_then(|strategy| strategy.read(path))
        .context(PersistSnafu)
}

fn write_series(path: &Path, ts: &TimeSeries) -> CliResult<()> {
    WriteStrategy::for_path(path)
        .and_then(|strategy| strategy.write(path, ts))
        .context(PersistSnafu)
}

fn cmd_inspect(input: &Path, max_rows: usize) -> CliResult<()> {
    let ts = read_series(input)?;
    println!("{}", output::describe(&ts));
    println!(
        "{}",
        output::preview(ts.table(), max_rows).context(RenderSnafu)?
    );
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, to: Format) -> CliResult<()> {
    let mut ts = read_series(input)?;
    match to {
        Format::Long => ts.to_long(true),
        Format::Wide => ts.to_wide(true),
    }
    .context(SeriesSnafu)?;
    write_series(output, &ts)?;
    println!("Converted to {to}: {}", output.display());
    Ok(())
}

fn cmd_split(input: &Path, output_dir: &Path) -> CliResult<()> {
    let ts = read_series(input)?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context(NoFileNameSnafu {
            path: input.display().to_string(),
        })?;
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("parquet");

    std::fs::create_dir_all(output_dir).context(CreateDirAllSnafu {
        path: output_dir.display().to_string(),
    })?;
    for part in ts.split().context(SeriesSnafu)? {
        let signal = part.table().schema().field(1).name().clone();
        let path = output_dir.join(format!("{stem}_{signal}.{ext}"));
        write_series(&path, &part)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn cmd_join(inputs: &[PathBuf], output: &Path, mode: JoinMode) -> CliResult<()> {
    let members = inputs
        .iter()
        .map(|path| read_series(path))
        .collect::<CliResult<Vec<_>>>()?;
    let joined = TimeSeries::join_with(&members, mode).context(SeriesSnafu)?;
    write_series(output, &joined)?;
    println!(
        "Joined {} series ({mode}): {} rows, {} features -> {}",
        members.len(),
        joined.len(),
        joined.feature_count(),
        output.display()
    );
    Ok(())
}

fn cmd_gaps(input: &Path, column: Option<String>) -> CliResult<()> {
    let ts = read_series(input)?;
    match column {
        Some(column) => {
            let runs = analyze_column(ts.table(), &column).context(GapsSnafu { column: &column })?;
            println!("{}", output::runs(&runs).context(RenderSnafu)?);
        }
        None => {
            let summary = analyze_all(ts.table());
            for ((index, name), report) in &summary.columns {
                println!(
                    "{}",
                    output::report(name, *index, report).context(RenderSnafu)?
                );
            }
            if summary.columns.is_empty() {
                println!("No numeric columns to analyze");
            }
        }
    }
    Ok(())
}

fn cmd_gap_mask(input: &Path, output: &Path) -> CliResult<()> {
    let mut ts = read_series(input)?;
    ts.add_gap_mask(true).context(SeriesSnafu)?;
    write_series(output, &ts)?;
    println!("Added gap mask: {}", output.display());
    Ok(())
}

fn cmd_normalize(
    input: &Path,
    output: &Path,
    scaler: ScalerArg,
    columns: Vec<String>,
) -> CliResult<()> {
    let mut ts = read_series(input)?;
    let mut scaler = make_scaler(scaler);
    let columns = (!columns.is_empty()).then_some(columns);
    ts.normalize(scaler.as_mut(), columns, true)
        .context(SeriesSnafu)?;
    write_series(output, &ts)?;
    println!("Normalized with {}: {}", scaler.name(), output.display());
    Ok(())
}

fn cmd_denormalize(input: &Path, output: &Path) -> CliResult<()> {
    let mut ts = read_series(input)?;
    ts.denormalize(true).context(SeriesSnafu)?;
    write_series(output, &ts)?;
    println!("Denormalized: {}", output.display());
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::Inspect { input, max_rows } => cmd_inspect(&input, max_rows),
        Command::Convert { input, output, to } => cmd_convert(&input, &output, to.into()),
        Command::Split { input, output_dir } => cmd_split(&input, &output_dir),
        Command::Join {
            inputs,
            output,
            mode,
        } => cmd_join(&inputs, &output, mode.into()),
        Command::Gaps { input, column } => cmd_gaps(&input, column),
        Command::GapMask { input, output } => cmd_gap_mask(&input, &output),
        Command::Normalize {
            input,
            output,
            scaler,
            columns,
        } => cmd_normalize(&input, &output, scaler, columns),
        Command::Denormalize { input, output } => cmd_denormalize(&input, &output),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
