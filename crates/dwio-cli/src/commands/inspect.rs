use crate::cli::InspectArgs;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::RowProgress;
use dwio::core::descriptors::{DefaultDescriptorRegistry, DescriptorRegistry};
use dwio::core::io::table::TableParser;
use dwio::core::models::reaction::Reaction;
use dwio::workflows::open::{Document, open_document};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

pub fn run(args: InspectArgs, config: &PartialConfig, quiet: bool) -> Result<()> {
    let stdout = std::io::stdout();
    inspect(&args, config, quiet, &mut stdout.lock())
}

fn inspect(
    args: &InspectArgs,
    config: &PartialConfig,
    quiet: bool,
    out: &mut impl Write,
) -> Result<()> {
    let options = config.table_options(&args.table);
    debug!("Table options: {:?}", options);
    writeln!(out, "File: {}", args.input.display())?;
    match open_document(&args.input, &options)? {
        Document::Table(mut parser) => {
            if let Some(e) = parser.open_error() {
                return Err(CliError::Input {
                    path: args.input.clone(),
                    reason: e.to_string(),
                });
            }
            describe_table(&mut parser, args.rows, quiet, out)
        }
        Document::Reaction(reaction) => describe_reaction(&args.input, &reaction, out),
    }
}

fn describe_table<R: BufRead>(
    parser: &mut TableParser<R>,
    preview_rows: usize,
    quiet: bool,
    out: &mut impl Write,
) -> Result<()> {
    let version = if parser.version().is_empty() {
        "unspecified"
    } else {
        parser.version()
    };
    writeln!(out, "Type: table (version {})", version)?;
    match parser.row_count() {
        Some(count) => writeln!(out, "Declared rows: {}", count)?,
        None => writeln!(out, "Declared rows: unknown")?,
    }
    if let Some(explanation) = parser.explanation() {
        writeln!(out, "Explanation: {}", explanation.lines().next().unwrap_or_default())?;
    }

    let layout = parser.layout();
    writeln!(
        out,
        "Columns: {} visible, {} special",
        layout.visible_columns().len(),
        layout.special_columns().len()
    )?;
    for column in layout.visible_columns() {
        writeln!(out, "  {}", column.name())?;
    }
    for column in layout.special_columns() {
        let kind = column
            .special_type()
            .map(ToString::to_string)
            .unwrap_or_default();
        match column.parent() {
            Some(parent) => writeln!(out, "  {} [{}] of {}", column.name(), kind, parent)?,
            None => writeln!(out, "  {} [{}]", column.name(), kind)?,
        }
    }

    let registry = DefaultDescriptorRegistry;
    let mut descriptors: Vec<String> = layout.descriptor_indices().keys().cloned().collect();
    descriptors.sort();
    for name in &descriptors {
        match registry.handler_for(name) {
            Some(handler) => writeln!(out, "Descriptor: {} (version {})", name, handler.version())?,
            None => writeln!(out, "Descriptor: {}", name)?,
        }
    }

    let progress = RowProgress::new(parser.row_count(), "Reading rows", quiet);
    let mut decoded = 0usize;
    let mut undecodable = 0usize;
    while let Some(row) = parser.advance() {
        if row.index() < preview_rows {
            let label = row.display_name().unwrap_or("-");
            writeln!(out, "  #{} {}: {}", row.index() + 1, label, row.to_owned_fields().join(" | "))?;
        }
        for name in &descriptors {
            match row.descriptor(name, &registry) {
                Ok(Some(_)) => decoded += 1,
                Ok(None) => {}
                Err(e) => {
                    debug!("Row {}: {}", row.index() + 1, e);
                    undecodable += 1;
                }
            }
        }
        progress.set_position(row.index() + 1);
    }
    progress.finish(parser.rows_read());

    writeln!(
        out,
        "Rows read: {} ({} with errors)",
        parser.rows_read(),
        parser.rows_with_errors()
    )?;
    if !descriptors.is_empty() {
        writeln!(out, "Descriptor cells: {} decoded, {} undecodable", decoded, undecodable)?;
        if undecodable > 0 {
            warn!("{} descriptor cells could not be decoded.", undecodable);
        }
    }
    if let Some(details) = parser.details() {
        let bytes: usize = details.values().map(Vec::len).sum();
        writeln!(out, "Details: {} blobs, {} bytes", details.len(), bytes)?;
    }
    info!("Inspected table with {} rows.", parser.rows_read());
    Ok(())
}

fn describe_reaction(path: &Path, reaction: &Reaction, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Type: reaction")?;
    if !reaction.name.is_empty() {
        writeln!(out, "Name: {}", reaction.name)?;
    }
    writeln!(
        out,
        "Reactants: {}, products: {}",
        reaction.reactant_count(),
        reaction.product_count()
    )?;
    let roles = std::iter::repeat_n("reactant", reaction.reactant_count())
        .chain(std::iter::repeat_n("product", reaction.product_count()));
    for (molecule, role) in reaction.molecules().zip(roles) {
        writeln!(
            out,
            "  {} '{}': {} atoms, {} bonds",
            role,
            molecule.name,
            molecule.atom_count(),
            molecule.bond_count()
        )?;
    }
    info!("Inspected reaction {:?}.", path);
    Ok(())
}
