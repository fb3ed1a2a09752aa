use clap::{Args, Parser, Subcommand, ValueEnum};
use dwio::core::io::table::CoordinateMode;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "dwio CLI - Inspect, convert and classify DataWarrior tables and MDL reaction files.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a table or reaction file.
    Inspect(InspectArgs),
    /// Export the plain columns of a table as CSV or tab-delimited text.
    Export(ExportArgs),
    /// Read a reaction file (V2000 or V3000) and write it as V2000.
    Rxn(RxnArgs),
    /// Print the detected file type of one or more file names.
    Classify(ClassifyArgs),
}

/// Table reading overrides shared by the table commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TableFlags {
    /// Which coordinate column of the structure column to use.
    #[arg(long, value_name = "MODE")]
    pub coordinate_mode: Option<CoordinateMode>,

    /// Decode the embedded detail blobs.
    #[arg(long)]
    pub details: bool,

    /// Keep header and tail lines of the file.
    #[arg(long)]
    pub buffer_head_and_tail: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the table (.dwar, .ode, .dwas, .som) or reaction (.rxn) file.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Print the plain fields of the first N rows.
    #[arg(short = 'n', long, value_name = "INT", default_value_t = 0)]
    pub rows: usize,

    #[command(flatten)]
    pub table: TableFlags,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Txt,
}

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to the input table.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path of the delimited output file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Output format. Defaults to the one implied by the output extension.
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,

    #[command(flatten)]
    pub table: TableFlags,
}

/// Arguments for the `rxn` subcommand.
#[derive(Args, Debug)]
pub struct RxnArgs {
    /// Path to the input reaction file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path of the V2000 output file. Written to standard output if omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Program name written into the reaction header.
    #[arg(short, long, value_name = "NAME")]
    pub program: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeSet {
    /// Tables, text, CSV and SD files.
    #[default]
    Data,
    /// Tables, templates and queries.
    Templates,
    /// JPEG, PNG and SVG images.
    Pictures,
}

/// Arguments for the `classify` subcommand.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// File names to classify.
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,

    /// For names without a known extension, look for existing files with these extensions.
    #[arg(long, value_enum, default_value_t = ProbeSet::Data)]
    pub probe: ProbeSet,
}
