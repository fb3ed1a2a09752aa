use crate::cli::{ExportArgs, ExportFormat};
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::RowProgress;
use dwio::core::io::filetype::{FileTypes, classify};
use dwio::core::io::table::TableParser;
use dwio::core::io::table::export::{delimiter_for, export_rows};
use std::fs::File;
use std::io::BufWriter;
use tracing::{debug, info};

pub fn run(args: ExportArgs, config: &PartialConfig, quiet: bool) -> Result<usize> {
    let delimiter = resolve_delimiter(&args)?;
    let options = config.table_options(&args.table);
    debug!("Table options: {:?}", options);

    let mut parser = TableParser::open(&args.input, options)?;
    if let Some(e) = parser.open_error() {
        return Err(CliError::Input {
            path: args.input.clone(),
            reason: e.to_string(),
        });
    }

    let sink = BufWriter::new(File::create(&args.output)?);
    let progress = RowProgress::new(parser.row_count(), "Exporting rows", quiet);
    let written = export_rows(&mut parser, sink, delimiter, |n| progress.set_position(n))?;
    progress.finish(written);

    if parser.rows_with_errors() > 0 {
        info!(
            "{} rows were incomplete and exported with empty fields.",
            parser.rows_with_errors()
        );
    }
    info!("Exported {} rows to {:?}.", written, args.output);
    Ok(written)
}

fn resolve_delimiter(args: &ExportArgs) -> Result<u8> {
    let types = match args.format {
        Some(ExportFormat::Csv) => FileTypes::CSV,
        Some(ExportFormat::Txt) => FileTypes::TEXT,
        None => classify(&args.output.to_string_lossy()),
    };
    delimiter_for(types).ok_or_else(|| {
        CliError::Argument(format!(
            "cannot infer an export format from {:?}; use a .csv or .txt name or pass --format",
            args.output
        ))
    })
}
