use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Maps the bond type field of a CTAB bond record.
    pub fn from_ctfile(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::Aromatic),
            _ => None,
        }
    }

    pub fn to_ctfile(self) -> i32 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Aromatic => 4,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "4" | "ar" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: String,
    pub position: Point3<f64>,
    pub charge: i32,
    /// Reaction atom-atom mapping number, 0 if unmapped.
    pub map_number: u32,
}

impl Atom {
    pub fn new(element: &str, position: Point3<f64>) -> Self {
        Self {
            element: element.to_string(),
            position,
            charge: 0,
            map_number: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1: usize, // 0-based index into the molecule's atoms
    pub atom2: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(atom1: usize, atom2: usize, order: BondOrder) -> Self {
        Self {
            atom1,
            atom2,
            order,
        }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atom1 == atom || self.atom2 == atom
    }
}

/// A molecule as read from or written to a CTAB block.
///
/// Only connectivity and geometry are kept; chemical validity is not checked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Molecule {
    pub name: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Adds a bond between two existing atoms.
    ///
    /// Returns `None` if either index is out of range or the bond is a self-loop.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) -> Option<usize> {
        if atom1 == atom2 || atom1 >= self.atoms.len() || atom2 >= self.atoms.len() {
            return None;
        }
        self.bonds.push(Bond::new(atom1, atom2, order));
        Some(self.bonds.len() - 1)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol_heavy_atoms() -> Molecule {
        let mut mol = Molecule::with_name("ethanol");
        let c1 = mol.add_atom(Atom::new("C", Point3::new(0.0, 0.0, 0.0)));
        let c2 = mol.add_atom(Atom::new("C", Point3::new(1.5, 0.0, 0.0)));
        let o = mol.add_atom(Atom::new("O", Point3::new(2.2, 1.2, 0.0)));
        mol.add_bond(c1, c2, BondOrder::Single).unwrap();
        mol.add_bond(c2, o, BondOrder::Single).unwrap();
        mol
    }

    #[test]
    fn add_atom_and_bond_update_counts() {
        let mol = ethanol_heavy_atoms();
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.bond_count(), 2);
        assert_eq!(mol.name, "ethanol");
        assert!(mol.bonds()[1].contains(2));
    }

    #[test]
    fn add_bond_rejects_invalid_endpoints() {
        let mut mol = ethanol_heavy_atoms();
        assert_eq!(mol.add_bond(0, 3, BondOrder::Single), None);
        assert_eq!(mol.add_bond(1, 1, BondOrder::Double), None);
        assert_eq!(mol.bond_count(), 2);
    }

    #[test]
    fn bond_order_ctfile_codes_round_trip() {
        for order in [
            BondOrder::Single,
            BondOrder::Double,
            BondOrder::Triple,
            BondOrder::Aromatic,
        ] {
            assert_eq!(BondOrder::from_ctfile(order.to_ctfile()), Some(order));
        }
        assert_eq!(BondOrder::from_ctfile(8), None);
    }

    #[test]
    fn bond_order_parses_from_strings() {
        assert_eq!("double".parse::<BondOrder>().unwrap(), BondOrder::Double);
        assert_eq!("AR".parse::<BondOrder>().unwrap(), BondOrder::Aromatic);
        assert!("quadruple".parse::<BondOrder>().is_err());
        assert_eq!(BondOrder::Triple.to_string(), "Triple");
    }

    #[test]
    fn new_atom_is_neutral_and_unmapped() {
        let atom = Atom::new("N", Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.charge, 0);
        assert_eq!(atom.map_number, 0);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
    }
}
