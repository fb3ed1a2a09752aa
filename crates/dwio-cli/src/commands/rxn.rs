use crate::cli::RxnArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use dwio::core::io::rxn::{RxnFileParser, RxnFileWriter};
use dwio::core::models::reaction::Reaction;
use tracing::info;

pub fn run(args: RxnArgs, config: &PartialConfig) -> Result<()> {
    let mut reaction = Reaction::default();
    RxnFileParser::new().parse_path(&args.input, &mut reaction)?;
    info!(
        "Read reaction with {} reactants and {} products from {:?}.",
        reaction.reactant_count(),
        reaction.product_count(),
        args.input
    );

    let program = config.program_name(args.program.as_deref());
    let mut writer = RxnFileWriter::new();
    writer.serialize(&reaction, program.as_deref())?;

    match &args.output {
        Some(path) => {
            writer.write_to_path(path)?;
            info!("Wrote V2000 reaction to {:?}.", path);
        }
        None => writer.write_to(std::io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;

    const V3000: &str = "$RXN V3000\nesterification\n  someprog\n\nM  V30 COUNTS 1 1\n\
M  V30 BEGIN REACTANT\n\
M  V30 BEGIN CTAB\nM  V30 COUNTS 2 1 0 0 0\nM  V30 BEGIN ATOM\n\
M  V30 1 C 0.0 0.0 0.0 0\nM  V30 2 O 1.2 0.0 0.0 0\nM  V30 END ATOM\n\
M  V30 BEGIN BOND\nM  V30 1 2 1 2\nM  V30 END BOND\nM  V30 END CTAB\n\
M  V30 END REACTANT\n\
M  V30 BEGIN PRODUCT\n\
M  V30 BEGIN CTAB\nM  V30 COUNTS 1 0 0 0 0\nM  V30 BEGIN ATOM\n\
M  V30 1 N 0.0 0.0 0.0 0\nM  V30 END ATOM\nM  V30 END CTAB\n\
M  V30 END PRODUCT\nM  END\n";

    #[test]
    fn v3000_input_is_written_as_v2000_with_program_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.rxn");
        let output = dir.path().join("out.rxn");
        fs::write(&input, V3000).unwrap();

        let args = RxnArgs {
            input,
            output: Some(output.clone()),
            program: Some("converter".to_string()),
        };
        run(args, &PartialConfig::default()).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().take(5).collect();
        assert_eq!(lines, vec!["$RXN", "esterification", "  converter", "", "  1  1"]);

        let mut reaction = Reaction::default();
        RxnFileParser::new().parse_path(&output, &mut reaction).unwrap();
        assert_eq!(reaction.reactants()[0].atom_count(), 2);
        assert_eq!(reaction.products()[0].atoms()[0].element, "N");
    }

    #[test]
    fn malformed_input_is_a_reaction_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.rxn");
        fs::write(&input, "not a reaction\n").unwrap();
        let args = RxnArgs {
            input,
            output: Some(dir.path().join("out.rxn")),
            program: None,
        };
        assert!(matches!(run(args, &PartialConfig::default()), Err(CliError::Reaction(_))));
    }
}
