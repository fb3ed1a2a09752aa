use crate::cli::{ClassifyArgs, ProbeSet};
use crate::error::Result;
use dwio::core::io::filetype::{FileFilter, FileTypes, canonical_extension, classify};
use std::io::Write;
use std::path::Path;
use tracing::debug;

impl ProbeSet {
    fn types(self) -> FileTypes {
        match self {
            Self::Data => FileTypes::DATAWARRIOR_COMPATIBLE_DATA,
            Self::Templates => FileTypes::DATAWARRIOR_TEMPLATE_CONTAINING,
            Self::Pictures => FileTypes::PICTURES,
        }
    }
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let filter = FileFilter::for_types(args.probe.types());
    debug!("Probing unknown names with {}", filter);
    for name in &args.names {
        writeln!(out, "{}", describe(name, &filter))?;
    }
    Ok(())
}

/// One output line for `name`.
///
/// Names without a known extension are completed with the filter's extensions and
/// reported as the first candidate that exists on disk.
fn describe(name: &str, filter: &FileFilter) -> String {
    let types = classify(name);
    if !types.is_unknown() {
        return format_types(name, types);
    }
    match filter
        .candidates(name)
        .into_iter()
        .find(|candidate| Path::new(candidate).is_file())
    {
        Some(found) => format!("{}: found as {}", name, format_types(&found, classify(&found))),
        None => format!("{}: unknown", name),
    }
}

fn format_types(name: &str, types: FileTypes) -> String {
    let descriptions: Vec<&str> = types.iter().map(|t| t.description()).collect();
    match canonical_extension(types) {
        Some(ext) => format!("{}: {} [{}]", name, descriptions.join(" / "), ext),
        None => format!("{}: {}", name, descriptions.join(" / ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn known_extensions_are_described_without_probing() {
        let filter = FileFilter::for_types(ProbeSet::Data.types());
        let line = describe("results/Set.DWAR", &filter);
        assert!(line.starts_with("results/Set.DWAR: "));
        assert!(line.ends_with("[.dwar]"), "{line}");
        assert!(describe("step.rxn", &filter).ends_with("[.rxn]"));
    }

    #[test]
    fn unknown_names_are_completed_from_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("compounds");
        fs::write(dir.path().join("compounds.csv"), "a,b\n").unwrap();
        let stem = stem.to_string_lossy().to_string();

        let filter = FileFilter::for_types(ProbeSet::Data.types());
        let line = describe(&stem, &filter);
        assert!(line.contains("found as"), "{line}");
        assert!(line.ends_with("[.csv]"), "{line}");

        let pictures = FileFilter::for_types(ProbeSet::Pictures.types());
        assert_eq!(describe(&stem, &pictures), format!("{stem}: unknown"));
    }
}
