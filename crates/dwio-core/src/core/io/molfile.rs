//! Minimal MDL molfile CTAB codec (V2000 read/write, V3000 read).
//!
//! Only atoms (element, coordinates, charge, mapping number) and bonds are
//! interpreted. Everything else in the property block is ignored.

use crate::core::io::traits::{MoleculeParser, MoleculeWriter};
use crate::core::models::molecule::{Atom, BondOrder, Molecule};
use nalgebra::Point3;
use std::collections::HashMap;
use std::fmt::Write;
use thiserror::Error;
use tracing::trace;

const V2000_MAX_ENTRIES: usize = 999;
const V30_PREFIX: &str = "M  V30 ";
const END_TAG: &str = "M  END";
const CHARGE_TAG: &str = "M  CHG";

#[derive(Debug, Error)]
pub enum MolfileError {
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: MolfileParseErrorKind,
    },
    #[error("Molfile block ended before {0}")]
    Truncated(&'static str),
    #[error("V2000 blocks hold at most 999 atoms and bonds, got {0}")]
    TooLarge(usize),
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

#[derive(Debug, Error)]
pub enum MolfileParseErrorKind {
    #[error("Invalid integer in columns {columns} (value: '{value}')")]
    InvalidInt { columns: &'static str, value: String },
    #[error("Invalid float in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
    #[error("Atom record has no element symbol")]
    MissingElement,
    #[error("Unsupported bond type {0}")]
    UnsupportedBondOrder(i32),
    #[error("Bond references atom {0} outside the atom block")]
    AtomOutOfRange(usize),
    #[error("Malformed V3000 record: '{0}'")]
    MalformedRecord(String),
    #[error("Declared {declared} {what} but found {found}")]
    CountMismatch {
        what: &'static str,
        declared: usize,
        found: usize,
    },
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_error(line: usize, kind: MolfileParseErrorKind) -> MolfileError {
    MolfileError::Parse { line, kind }
}

fn parse_int<T: std::str::FromStr>(
    value: &str,
    columns: &'static str,
    line: usize,
) -> Result<T, MolfileError> {
    value.parse().map_err(|_| {
        parse_error(
            line,
            MolfileParseErrorKind::InvalidInt {
                columns,
                value: value.to_string(),
            },
        )
    })
}

fn parse_float(value: &str, columns: &'static str, line: usize) -> Result<f64, MolfileError> {
    value.parse().map_err(|_| {
        parse_error(
            line,
            MolfileParseErrorKind::InvalidFloat {
                columns,
                value: value.to_string(),
            },
        )
    })
}

fn charge_from_code(code: i32) -> i32 {
    match code {
        1..=3 | 5..=7 => 4 - code,
        _ => 0,
    }
}

fn charge_to_code(charge: i32) -> i32 {
    match charge {
        -3..=-1 | 1..=3 => 4 - charge,
        _ => 0,
    }
}

/// Reads V2000 and V3000 molfile blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MolfileParser;

impl MoleculeParser for MolfileParser {
    fn parse(&self, block: &str) -> Result<Molecule, MolfileError> {
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < 4 {
            return Err(MolfileError::Truncated("the counts line"));
        }
        let name = lines[0].trim();
        if lines[3].contains("V3000") {
            parse_v3000(&lines, name)
        } else {
            parse_v2000(&lines, name)
        }
    }
}

fn parse_v2000(lines: &[&str], name: &str) -> Result<Molecule, MolfileError> {
    let counts = lines[3];
    let atom_count: usize = parse_int(slice_and_trim(counts, 0, 3), "1-3", 4)?;
    let bond_count: usize = parse_int(slice_and_trim(counts, 3, 6), "4-6", 4)?;

    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    if lines.len() < bond_start + bond_count {
        return Err(MolfileError::Truncated("all atom and bond records were read"));
    }

    let mut molecule = Molecule::with_name(name);
    for (offset, line) in lines[atom_start..bond_start].iter().enumerate() {
        let line_no = atom_start + offset + 1;
        let x = parse_float(slice_and_trim(line, 0, 10), "1-10", line_no)?;
        let y = parse_float(slice_and_trim(line, 10, 20), "11-20", line_no)?;
        let z = parse_float(slice_and_trim(line, 20, 30), "21-30", line_no)?;
        let symbol = slice_and_trim(line, 31, 34);
        if symbol.is_empty() {
            return Err(parse_error(line_no, MolfileParseErrorKind::MissingElement));
        }
        let mut atom = Atom::new(symbol, Point3::new(x, y, z));
        atom.charge = charge_from_code(slice_and_trim(line, 36, 39).parse().unwrap_or(0));
        atom.map_number = slice_and_trim(line, 60, 63).parse().unwrap_or(0);
        molecule.add_atom(atom);
    }

    for (offset, line) in lines[bond_start..bond_start + bond_count].iter().enumerate() {
        let line_no = bond_start + offset + 1;
        let a1: usize = parse_int(slice_and_trim(line, 0, 3), "1-3", line_no)?;
        let a2: usize = parse_int(slice_and_trim(line, 3, 6), "4-6", line_no)?;
        let code: i32 = parse_int(slice_and_trim(line, 6, 9), "7-9", line_no)?;
        let order = BondOrder::from_ctfile(code)
            .ok_or_else(|| parse_error(line_no, MolfileParseErrorKind::UnsupportedBondOrder(code)))?;
        add_bond_checked(&mut molecule, a1, a2, order, line_no)?;
    }

    let mut charges_reset = false;
    for (offset, line) in lines[bond_start + bond_count..].iter().enumerate() {
        let line_no = bond_start + bond_count + offset + 1;
        if line.starts_with(END_TAG) {
            break;
        }
        if line.starts_with(CHARGE_TAG) {
            // the first charge property line supersedes the atom block charges
            if !charges_reset {
                molecule.atoms_mut().iter_mut().for_each(|a| a.charge = 0);
                charges_reset = true;
            }
            apply_charge_property(&mut molecule, line, line_no)?;
        }
    }

    trace!(
        atoms = molecule.atom_count(),
        bonds = molecule.bond_count(),
        "Parsed V2000 block"
    );
    Ok(molecule)
}

fn apply_charge_property(molecule: &mut Molecule, line: &str, line_no: usize) -> Result<(), MolfileError> {
    let tokens: Vec<&str> = line.split_whitespace().skip(2).collect();
    let entries: usize = match tokens.first() {
        Some(n) => parse_int(n, "7-9", line_no)?,
        None => return Ok(()),
    };
    for pair in tokens[1..].chunks(2).take(entries) {
        let [atom, charge] = pair else {
            break;
        };
        let index: usize = parse_int(atom, "M  CHG atom", line_no)?;
        let charge: i32 = parse_int(charge, "M  CHG value", line_no)?;
        let atom = index
            .checked_sub(1)
            .and_then(|i| molecule.atoms_mut().get_mut(i))
            .ok_or_else(|| parse_error(line_no, MolfileParseErrorKind::AtomOutOfRange(index)))?;
        atom.charge = charge;
    }
    Ok(())
}

fn add_bond_checked(
    molecule: &mut Molecule,
    a1: usize,
    a2: usize,
    order: BondOrder,
    line_no: usize,
) -> Result<(), MolfileError> {
    let count = molecule.atom_count();
    for a in [a1, a2] {
        if a == 0 || a > count {
            return Err(parse_error(line_no, MolfileParseErrorKind::AtomOutOfRange(a)));
        }
    }
    molecule
        .add_bond(a1 - 1, a2 - 1, order)
        .map(|_| ())
        .ok_or_else(|| parse_error(line_no, MolfileParseErrorKind::AtomOutOfRange(a1)))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum V3000Section {
    None,
    Atom,
    Bond,
}

/// Joins `-` continued records and pairs each logical record with its first line number.
fn v30_records(lines: &[&str]) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (i, line) in lines.iter().enumerate().skip(4) {
        if line.starts_with(END_TAG) {
            break;
        }
        let Some(rest) = line.strip_prefix(V30_PREFIX) else {
            continue;
        };
        let (line_no, mut text) = pending.take().unwrap_or((i + 1, String::new()));
        match rest.strip_suffix('-') {
            Some(head) => {
                text.push_str(head);
                pending = Some((line_no, text));
            }
            None => {
                text.push_str(rest);
                records.push((line_no, text));
            }
        }
    }
    if let Some(record) = pending {
        records.push(record);
    }
    records
}

fn parse_v3000(lines: &[&str], name: &str) -> Result<Molecule, MolfileError> {
    let mut molecule = Molecule::with_name(name);
    let mut declared: Option<(usize, usize)> = None;
    let mut section = V3000Section::None;
    let mut index_map: HashMap<usize, usize> = HashMap::new();

    for (line_no, record) in v30_records(lines) {
        let tokens: Vec<&str> = record.split_whitespace().collect();
        let malformed = || parse_error(line_no, MolfileParseErrorKind::MalformedRecord(record.clone()));
        match tokens.as_slice() {
            ["COUNTS", atoms, bonds, ..] => {
                declared = Some((
                    parse_int(atoms, "COUNTS atoms", line_no)?,
                    parse_int(bonds, "COUNTS bonds", line_no)?,
                ));
            }
            ["BEGIN", "ATOM"] => section = V3000Section::Atom,
            ["BEGIN", "BOND"] => section = V3000Section::Bond,
            ["END", "ATOM"] | ["END", "BOND"] => section = V3000Section::None,
            ["BEGIN", ..] | ["END", ..] => {}
            _ if section == V3000Section::Atom => {
                let [index, symbol, x, y, z, map, options @ ..] = tokens.as_slice() else {
                    return Err(malformed());
                };
                let position = Point3::new(
                    parse_float(x, "atom x", line_no)?,
                    parse_float(y, "atom y", line_no)?,
                    parse_float(z, "atom z", line_no)?,
                );
                let mut atom = Atom::new(symbol, position);
                atom.map_number = parse_int(map, "atom aamap", line_no)?;
                for option in options {
                    if let Some(charge) = option.strip_prefix("CHG=") {
                        atom.charge = parse_int(charge, "atom CHG", line_no)?;
                    }
                }
                let file_index: usize = parse_int(index, "atom index", line_no)?;
                index_map.insert(file_index, molecule.add_atom(atom));
            }
            _ if section == V3000Section::Bond => {
                let [_, code, a1, a2, ..] = tokens.as_slice() else {
                    return Err(malformed());
                };
                let code: i32 = parse_int(code, "bond type", line_no)?;
                let order = BondOrder::from_ctfile(code).ok_or_else(|| {
                    parse_error(line_no, MolfileParseErrorKind::UnsupportedBondOrder(code))
                })?;
                let resolve = |token: &str| -> Result<usize, MolfileError> {
                    let file_index: usize = parse_int(token, "bond atom", line_no)?;
                    index_map.get(&file_index).copied().ok_or_else(|| {
                        parse_error(line_no, MolfileParseErrorKind::AtomOutOfRange(file_index))
                    })
                };
                let (i, j) = (resolve(*a1)?, resolve(*a2)?);
                molecule
                    .add_bond(i, j, order)
                    .ok_or_else(|| parse_error(line_no, MolfileParseErrorKind::AtomOutOfRange(i + 1)))?;
            }
            _ => {}
        }
    }

    if let Some((atoms, bonds)) = declared {
        for (what, declared, found) in [
            ("atoms", atoms, molecule.atom_count()),
            ("bonds", bonds, molecule.bond_count()),
        ] {
            if declared != found {
                return Err(parse_error(
                    4,
                    MolfileParseErrorKind::CountMismatch {
                        what,
                        declared,
                        found,
                    },
                ));
            }
        }
    }

    trace!(
        atoms = molecule.atom_count(),
        bonds = molecule.bond_count(),
        "Parsed V3000 block"
    );
    Ok(molecule)
}

/// Writes V2000 molfile blocks.
#[derive(Debug, Clone)]
pub struct MolfileWriter {
    pub program: String,
}

impl Default for MolfileWriter {
    fn default() -> Self {
        Self {
            program: "dwio".to_string(),
        }
    }
}

impl MoleculeWriter for MolfileWriter {
    fn write(&self, molecule: &Molecule) -> Result<String, MolfileError> {
        let atom_count = molecule.atom_count();
        let bond_count = molecule.bond_count();
        if atom_count > V2000_MAX_ENTRIES || bond_count > V2000_MAX_ENTRIES {
            return Err(MolfileError::TooLarge(atom_count.max(bond_count)));
        }

        let mut out = String::new();
        writeln!(out, "{}", molecule.name)?;
        writeln!(out, "  {}", self.program)?;
        writeln!(out)?;
        writeln!(
            out,
            "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
            atom_count, bond_count
        )?;

        for atom in molecule.atoms() {
            writeln!(
                out,
                "{:>10.4}{:>10.4}{:>10.4} {:<3} 0{:>3}  0  0  0  0  0  0  0{:>3}  0  0",
                atom.position.x,
                atom.position.y,
                atom.position.z,
                atom.element,
                charge_to_code(atom.charge),
                atom.map_number
            )?;
        }

        for bond in molecule.bonds() {
            writeln!(
                out,
                "{:>3}{:>3}{:>3}  0  0  0  0",
                bond.atom1 + 1,
                bond.atom2 + 1,
                bond.order.to_ctfile()
            )?;
        }

        let charged: Vec<(usize, i32)> = molecule
            .atoms()
            .iter()
            .enumerate()
            .filter(|(_, a)| a.charge != 0)
            .map(|(i, a)| (i + 1, a.charge))
            .collect();
        for chunk in charged.chunks(8) {
            write!(out, "{CHARGE_TAG}{:>3}", chunk.len())?;
            for (index, charge) in chunk {
                write!(out, " {index:>3} {charge:>3}")?;
            }
            writeln!(out)?;
        }

        writeln!(out, "{END_TAG}")?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHANOL_V2000: &str = "\
ethanol
  test

  3  2  0  0  0  0  0  0  0  0999 V2000
   -1.2700    0.2480    0.0000 C   0  0  0  0  0  0  0  0  0  1  0  0
    0.1390   -0.3080    0.0000 C   0  0  0  0  0  0  0  0  0  2  0  0
    1.0360    0.7890    0.0000 O   0  5  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
  2  3  1  0  0  0  0
M  END
";

    const ACETATE_V3000: &str = "\
acetate
  test

  0  0  0     0  0            999 V3000
M  V30 BEGIN CTAB
M  V30 COUNTS 4 3 0 0 0
M  V30 BEGIN ATOM
M  V30 1 C 0.0 0.0 0.0 0
M  V30 2 C 1.5 0.0 0.0 3
M  V30 3 O 2.2 1.2 0.0 0
M  V30 4 O 2.2 -1.2 0.0 0 -
M  V30 CHG=-1
M  V30 END ATOM
M  V30 BEGIN BOND
M  V30 1 1 1 2
M  V30 2 2 2 3
M  V30 3 1 2 4
M  V30 END BOND
M  V30 END CTAB
M  END
";

    #[test]
    fn parses_v2000_atoms_bonds_and_charge_codes() {
        let mol = MolfileParser.parse(ETHANOL_V2000).unwrap();
        assert_eq!(mol.name, "ethanol");
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.bond_count(), 2);
        assert_eq!(mol.atoms()[2].element, "O");
        assert_eq!(mol.atoms()[2].charge, -1);
        assert_eq!(mol.atoms()[1].map_number, 2);
        assert!((mol.atoms()[0].position.x + 1.27).abs() < 1e-9);
    }

    #[test]
    fn charge_property_lines_override_atom_block_charges() {
        let block = ETHANOL_V2000.replace("M  END", "M  CHG  1   1   1\nM  END");
        let mol = MolfileParser.parse(&block).unwrap();
        assert_eq!(mol.atoms()[0].charge, 1);
        assert_eq!(mol.atoms()[2].charge, 0);
    }

    #[test]
    fn parses_v3000_ctab_with_continuation_lines() {
        let mol = MolfileParser.parse(ACETATE_V3000).unwrap();
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(mol.bond_count(), 3);
        assert_eq!(mol.atoms()[3].charge, -1);
        assert_eq!(mol.atoms()[1].map_number, 3);
        assert_eq!(mol.bonds()[1].order, BondOrder::Double);
    }

    #[test]
    fn v3000_count_mismatch_is_an_error() {
        let block = ACETATE_V3000.replace("COUNTS 4 3", "COUNTS 5 3");
        let err = MolfileParser.parse(&block).unwrap_err();
        assert!(matches!(
            err,
            MolfileError::Parse {
                kind: MolfileParseErrorKind::CountMismatch { what: "atoms", declared: 5, found: 4 },
                ..
            }
        ));
    }

    #[test]
    fn truncated_v2000_block_is_rejected() {
        let block: String = ETHANOL_V2000.lines().take(6).map(|l| format!("{l}\n")).collect();
        assert!(matches!(
            MolfileParser.parse(&block),
            Err(MolfileError::Truncated(_))
        ));
    }

    #[test]
    fn bond_to_missing_atom_is_rejected() {
        let block = ETHANOL_V2000.replace("  2  3  1  0", "  2  9  1  0");
        let err = MolfileParser.parse(&block).unwrap_err();
        assert!(matches!(
            err,
            MolfileError::Parse {
                line: 9,
                kind: MolfileParseErrorKind::AtomOutOfRange(9)
            }
        ));
    }

    #[test]
    fn invalid_coordinate_reports_columns() {
        let block = ETHANOL_V2000.replace("   -1.2700", "   -1.2x00");
        let err = MolfileParser.parse(&block).unwrap_err();
        assert!(matches!(
            err,
            MolfileError::Parse {
                line: 5,
                kind: MolfileParseErrorKind::InvalidFloat { columns: "1-10", .. }
            }
        ));
    }

    #[test]
    fn written_block_reads_back_identically() {
        let original = MolfileParser.parse(ACETATE_V3000).unwrap();
        let text = MolfileWriter::default().write(&original).unwrap();
        assert!(text.ends_with("M  END\n"));
        assert!(text.contains("M  CHG  1   4  -1"));

        let parsed = MolfileParser.parse(&text).unwrap();
        assert_eq!(parsed.atom_count(), original.atom_count());
        assert_eq!(parsed.bonds(), original.bonds());
        for (a, b) in original.atoms().iter().zip(parsed.atoms()) {
            assert_eq!(a.element, b.element);
            assert_eq!(a.charge, b.charge);
            assert_eq!(a.map_number, b.map_number);
            assert!((a.position - b.position).norm() < 1e-4);
        }
    }

    #[test]
    fn writer_refuses_molecules_beyond_v2000_limits() {
        let mut mol = Molecule::new();
        for _ in 0..1000 {
            mol.add_atom(Atom::new("C", Point3::origin()));
        }
        assert!(matches!(
            MolfileWriter::default().write(&mol),
            Err(MolfileError::TooLarge(1000))
        ));
    }
}
