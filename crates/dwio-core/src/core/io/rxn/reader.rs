use super::{MOL_END_TAG, MOL_TAG, RxnError, RxnGrammar, RxnParseErrorKind};
use crate::core::io::molfile::MolfileParser;
use crate::core::io::traits::MoleculeParser;
use crate::core::models::molecule::Molecule;
use crate::core::models::reaction::Reaction;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, instrument};

const V3000_COUNTS_PREFIX: &str = "M  V30 COUNTS";
const V3000_BEGIN_REACTANT: &str = "M  V30 BEGIN REACTANT";
const V3000_BEGIN_PRODUCT: &str = "M  V30 BEGIN PRODUCT";
const V3000_END_CTAB: &str = "M  V30 END CTAB";

/// Header and counts line that turn a bare V3000 CTAB into a standalone molfile block.
const V3000_BANNER: &str = "\n  dwio\n\n  0  0  0     0  0            999 V3000\n";

/// Line iterator that remembers the number of the last line it returned.
pub struct LineCursor<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_number: 0,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_number += 1;
        Some(line)
    }

    fn expect(&mut self, what: &'static str) -> Result<&'a str, RxnError> {
        self.next_line()
            .ok_or_else(|| self.error(RxnParseErrorKind::UnexpectedEof(what)))
    }

    fn error(&self, kind: RxnParseErrorKind) -> RxnError {
        RxnError::Parse {
            line: self.line_number,
            kind,
        }
    }
}

fn parse_count(cursor: &LineCursor<'_>, field: &'static str, value: &str) -> Result<usize, RxnError> {
    value.trim().parse().map_err(|_| {
        cursor.error(RxnParseErrorKind::InvalidCount {
            field,
            value: value.to_string(),
        })
    })
}

fn parse_molecule<P: MoleculeParser>(
    parser: &P,
    block: &str,
    index: usize,
) -> Result<Molecule, RxnError> {
    parser
        .parse(block)
        .map_err(|source| RxnError::Molecule { index, source })
}

/// Reads the V2000 body. `cursor` is positioned just after the magic line.
pub fn parse_v2000<P: MoleculeParser>(
    cursor: &mut LineCursor<'_>,
    parser: &P,
) -> Result<Reaction, RxnError> {
    let name = cursor.expect("the reaction name")?.trim().to_string();
    cursor.expect("the program line")?;
    cursor.expect("the comment line")?;

    let counts = cursor.expect("the counts line")?;
    let field = |start: usize| counts.get(start..(start + 3).min(counts.len())).unwrap_or("");
    let reactant_count = parse_count(cursor, "reactant", field(0))?;
    let product_count = parse_count(cursor, "product", field(3))?;

    let mut molecules = Vec::new();
    for index in 0..reactant_count + product_count {
        let tag = cursor.expect("a '$MOL' block")?;
        if !tag.starts_with(MOL_TAG) {
            return Err(cursor.error(RxnParseErrorKind::MissingMolTag));
        }
        let mut block = String::new();
        loop {
            let line = cursor.expect("'M  END'")?;
            block.push_str(line);
            block.push('\n');
            if line.starts_with(MOL_END_TAG) {
                break;
            }
        }
        molecules.push(parse_molecule(parser, &block, index)?);
    }

    let products = molecules.split_off(reactant_count);
    let mut reaction = Reaction::new(molecules, products);
    reaction.name = name;
    Ok(reaction)
}

/// Reads the V3000 body. `cursor` is positioned just after the magic line.
pub fn parse_v3000<P: MoleculeParser>(
    cursor: &mut LineCursor<'_>,
    parser: &P,
) -> Result<Reaction, RxnError> {
    let name = cursor.expect("the reaction name")?.trim().to_string();
    cursor.expect("the program line")?;
    cursor.expect("the comment line")?;

    let counts = cursor.expect("the COUNTS line")?;
    let rest = counts
        .strip_prefix(V3000_COUNTS_PREFIX)
        .ok_or_else(|| cursor.error(RxnParseErrorKind::MalformedCounts(counts.to_string())))?;
    let mut tokens = rest.split_whitespace();
    let (Some(reactants), Some(products)) = (tokens.next(), tokens.next()) else {
        return Err(cursor.error(RxnParseErrorKind::MalformedCounts(counts.to_string())));
    };
    let reactant_count = parse_count(cursor, "reactant", reactants)?;
    let product_count = parse_count(cursor, "product", products)?;

    let reactants = read_v3000_section(cursor, parser, reactant_count, V3000_BEGIN_REACTANT, 0)?;
    let products = read_v3000_section(
        cursor,
        parser,
        product_count,
        V3000_BEGIN_PRODUCT,
        reactant_count,
    )?;
    let mut reaction = Reaction::new(reactants, products);
    reaction.name = name;
    Ok(reaction)
}

fn read_v3000_section<P: MoleculeParser>(
    cursor: &mut LineCursor<'_>,
    parser: &P,
    count: usize,
    begin: &'static str,
    first_index: usize,
) -> Result<Vec<Molecule>, RxnError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let line = cursor.expect(begin)?;
    if line.trim_end() != begin {
        return Err(cursor.error(RxnParseErrorKind::MissingBlockMarker { expected: begin }));
    }

    let mut molecules = Vec::new();
    for offset in 0..count {
        let mut block = String::from(V3000_BANNER);
        loop {
            let line = cursor.expect("'M  V30 END CTAB'")?;
            block.push_str(line);
            block.push('\n');
            if line.starts_with(V3000_END_CTAB) {
                break;
            }
        }
        block.push_str(MOL_END_TAG);
        block.push('\n');
        molecules.push(parse_molecule(parser, &block, first_index + offset)?);
    }
    // The section end line is not checked.
    cursor.next_line();
    Ok(molecules)
}

/// Reads reaction files of either grammar.
///
/// On success the target reaction is replaced; on failure it is left untouched.
#[derive(Debug, Clone, Default)]
pub struct RxnFileParser<P = MolfileParser> {
    molecule_parser: P,
}

impl RxnFileParser<MolfileParser> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: MoleculeParser> RxnFileParser<P> {
    pub fn with_molecule_parser(molecule_parser: P) -> Self {
        Self { molecule_parser }
    }

    /// Parses a complete reaction file held in memory.
    ///
    /// # Errors
    ///
    /// Every structural deviation is fatal: a missing magic line, a malformed counts
    /// line, a missing `$MOL` tag or block marker, a molecule block that ends before
    /// its terminator, or a molecule the molecule parser rejects.
    pub fn parse_str(&self, text: &str, reaction: &mut Reaction) -> Result<(), RxnError> {
        let mut cursor = LineCursor::new(text);
        let magic = cursor.expect("the magic line")?;
        let grammar = RxnGrammar::detect(magic)
            .ok_or_else(|| cursor.error(RxnParseErrorKind::MissingMagic))?;
        let parsed = match grammar {
            RxnGrammar::V2000 => parse_v2000(&mut cursor, &self.molecule_parser)?,
            RxnGrammar::V3000 => parse_v3000(&mut cursor, &self.molecule_parser)?,
        };
        debug!(
            "Parsed {:?} reaction '{}' with {} reactants and {} products.",
            grammar,
            parsed.name,
            parsed.reactant_count(),
            parsed.product_count()
        );
        *reaction = parsed;
        Ok(())
    }

    pub fn parse_reader(&self, mut reader: impl Read, reaction: &mut Reaction) -> Result<(), RxnError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.parse_str(&text, reaction)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn parse_path(&self, path: impl AsRef<Path>, reaction: &mut Reaction) -> Result<(), RxnError> {
        let text = fs::read_to_string(path.as_ref())?;
        self.parse_str(&text, reaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ETHANOL: &str = "\
ethanol
  test

  3  2  0  0  0  0  0  0  0  0999 V2000
   -1.2700    0.2480    0.0000 C   0  0  0  0  0  0  0  0  0  1  0  0
    0.1390   -0.3080    0.0000 C   0  0  0  0  0  0  0  0  0  2  0  0
    1.0360    0.7890    0.0000 O   0  0  0  0  0  0  0  0  0  3  0  0
  1  2  1  0  0  0  0
  2  3  1  0  0  0  0
M  END
";

    const ACETALDEHYDE: &str = "\
acetaldehyde
  test

  3  2  0  0  0  0  0  0  0  0999 V2000
   -1.2700    0.2480    0.0000 C   0  0  0  0  0  0  0  0  0  1  0  0
    0.1390   -0.3080    0.0000 C   0  0  0  0  0  0  0  0  0  2  0  0
    1.0360    0.7890    0.0000 O   0  0  0  0  0  0  0  0  0  3  0  0
  1  2  1  0  0  0  0
  2  3  2  0  0  0  0
M  END
";

    fn oxidation_v2000() -> String {
        format!("$RXN\noxidation\n  test\n\n001001\n$MOL\n{ETHANOL}$MOL\n{ACETALDEHYDE}")
    }

    const OXIDATION_V3000: &str = "\
$RXN V3000
oxidation
  test

M  V30 COUNTS 1 1
M  V30 BEGIN REACTANT
M  V30 BEGIN CTAB
M  V30 COUNTS 3 2 0 0 0
M  V30 BEGIN ATOM
M  V30 1 C -1.27 0.248 0 1
M  V30 2 C 0.139 -0.308 0 2
M  V30 3 O 1.036 0.789 0 3
M  V30 END ATOM
M  V30 BEGIN BOND
M  V30 1 1 1 2
M  V30 2 1 2 3
M  V30 END BOND
M  V30 END CTAB
M  V30 END REACTANT
M  V30 BEGIN PRODUCT
M  V30 BEGIN CTAB
M  V30 COUNTS 3 2 0 0 0
M  V30 BEGIN ATOM
M  V30 1 C -1.27 0.248 0 1
M  V30 2 C 0.139 -0.308 0 2
M  V30 3 O 1.036 0.789 0 3 CHG=-1
M  V30 END ATOM
M  V30 BEGIN BOND
M  V30 1 1 1 2
M  V30 2 2 2 3
M  V30 END BOND
M  V30 END CTAB
M  V30 END PRODUCT
M  END
";

    #[test]
    fn v2000_with_zero_padded_counts_parses_one_reactant_and_one_product() {
        let mut reaction = Reaction::default();
        RxnFileParser::new()
            .parse_str(&oxidation_v2000(), &mut reaction)
            .unwrap();
        assert_eq!(reaction.name, "oxidation");
        assert_eq!(reaction.reactant_count(), 1);
        assert_eq!(reaction.product_count(), 1);
        assert_eq!(reaction.reactants()[0].name, "ethanol");
        assert_eq!(reaction.products()[0].bond_count(), 2);
        assert_eq!(reaction.products()[0].atoms()[2].map_number, 3);
    }

    #[test]
    fn v2000_truncated_before_last_end_is_fatal_and_leaves_target_untouched() {
        let text = oxidation_v2000();
        let cut = text.rfind("M  END").unwrap();
        let mut reaction = Reaction::new(vec![Molecule::with_name("kept")], vec![]);
        let err = RxnFileParser::new()
            .parse_str(&text[..cut], &mut reaction)
            .unwrap_err();
        assert!(matches!(
            err,
            RxnError::Parse {
                kind: RxnParseErrorKind::UnexpectedEof(_),
                ..
            }
        ));
        assert_eq!(reaction.reactants()[0].name, "kept");
    }

    #[test]
    fn missing_mol_tag_is_reported() {
        let text = oxidation_v2000().replacen("$MOL\nethanol", "$MOX\nethanol", 1);
        let err = RxnFileParser::new()
            .parse_str(&text, &mut Reaction::default())
            .unwrap_err();
        match err {
            RxnError::Parse { line, kind } => {
                assert_eq!(line, 6);
                assert_eq!(kind.to_string(), "'$MOL' tag not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_magic_and_bad_counts_are_fatal() {
        let err = RxnFileParser::new()
            .parse_str("$MOL\n", &mut Reaction::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RxnError::Parse {
                line: 1,
                kind: RxnParseErrorKind::MissingMagic
            }
        ));

        let err = RxnFileParser::new()
            .parse_str("$RXN\n\n\n\n  x  1\n", &mut Reaction::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RxnError::Parse {
                line: 5,
                kind: RxnParseErrorKind::InvalidCount { field: "reactant", .. }
            }
        ));
    }

    #[test]
    fn malformed_molecule_block_reports_its_index() {
        let broken = ACETALDEHYDE.replace("    1.0360", "    1.0x60");
        let text = format!("$RXN\n\n\n\n  1  1\n$MOL\n{ETHANOL}$MOL\n{broken}");
        let err = RxnFileParser::new()
            .parse_str(&text, &mut Reaction::default())
            .unwrap_err();
        assert!(matches!(err, RxnError::Molecule { index: 1, .. }));
    }

    #[test]
    fn v3000_sections_parse_into_reactants_and_products() {
        let mut reaction = Reaction::default();
        RxnFileParser::new()
            .parse_str(OXIDATION_V3000, &mut reaction)
            .unwrap();
        assert_eq!(reaction.name, "oxidation");
        assert_eq!(reaction.reactant_count(), 1);
        assert_eq!(reaction.product_count(), 1);
        let product = &reaction.products()[0];
        assert_eq!(product.atom_count(), 3);
        assert_eq!(product.bond_count(), 2);
        assert_eq!(product.atoms()[2].charge, -1);
    }

    #[test]
    fn v3000_without_reactant_marker_is_fatal() {
        let text = OXIDATION_V3000.replace("M  V30 BEGIN REACTANT", "M  V30 BEGIN REAGENT");
        let err = RxnFileParser::new()
            .parse_str(&text, &mut Reaction::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RxnError::Parse {
                line: 6,
                kind: RxnParseErrorKind::MissingBlockMarker {
                    expected: V3000_BEGIN_REACTANT
                }
            }
        ));
    }

    #[test]
    fn v3000_with_only_products_skips_reactant_section() {
        let start = OXIDATION_V3000.find("M  V30 BEGIN PRODUCT").unwrap();
        let text = format!("$RXN V3000\n\n\n\nM  V30 COUNTS 0 1\n{}", &OXIDATION_V3000[start..]);
        let mut reaction = Reaction::default();
        RxnFileParser::new().parse_str(&text, &mut reaction).unwrap();
        assert_eq!(reaction.reactant_count(), 0);
        assert_eq!(reaction.product_count(), 1);
    }

    #[test]
    fn v3000_malformed_counts_line_is_fatal() {
        let text = OXIDATION_V3000.replace("M  V30 COUNTS 1 1", "M  V30 COUNTS 1");
        let err = RxnFileParser::new()
            .parse_str(&text, &mut Reaction::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RxnError::Parse {
                kind: RxnParseErrorKind::MalformedCounts(_),
                ..
            }
        ));
    }

    #[test]
    fn v3000_counts_larger_than_the_file_are_fatal() {
        for (counts, section) in [
            ("18446744073709551615 0", "REACTANT"),
            ("1000000000000 0", "REACTANT"),
            ("0 18446744073709551615", "PRODUCT"),
        ] {
            let text = format!("$RXN V3000\n\n\n\nM  V30 COUNTS {counts}\nM  V30 BEGIN {section}\nM  V30 BEGIN CTAB\n");
            let mut reaction = Reaction::default();
            let err = RxnFileParser::new().parse_str(&text, &mut reaction).unwrap_err();
            assert!(
                matches!(err, RxnError::Parse { kind: RxnParseErrorKind::UnexpectedEof(_), .. }),
                "{counts}: {err:?}"
            );
            assert!(reaction.is_empty());
        }
    }

    #[test]
    fn parse_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(oxidation_v2000().as_bytes()).unwrap();
        let mut reaction = Reaction::default();
        RxnFileParser::new().parse_path(file.path(), &mut reaction).unwrap();
        assert_eq!(reaction.molecule_count(), 2);

        let missing = file.path().with_extension("missing");
        let err = RxnFileParser::new()
            .parse_path(&missing, &mut reaction)
            .unwrap_err();
        assert!(matches!(err, RxnError::Io(_)));
    }
}
