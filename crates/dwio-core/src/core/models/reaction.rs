use super::molecule::Molecule;

/// A chemical reaction: reactants followed by products.
///
/// The split between reactants and products is fixed at construction. Readers
/// replace a caller's reaction wholesale rather than appending to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reaction {
    pub name: String,
    reactants: Vec<Molecule>,
    products: Vec<Molecule>,
}

impl Reaction {
    pub fn new(reactants: Vec<Molecule>, products: Vec<Molecule>) -> Self {
        Self {
            name: String::new(),
            reactants,
            products,
        }
    }

    pub fn reactants(&self) -> &[Molecule] {
        &self.reactants
    }

    pub fn products(&self) -> &[Molecule] {
        &self.products
    }

    pub fn reactant_count(&self) -> usize {
        self.reactants.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn molecule_count(&self) -> usize {
        self.reactants.len() + self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecule_count() == 0
    }

    /// All molecules, reactants first.
    pub fn molecules(&self) -> impl Iterator<Item = &Molecule> {
        self.reactants.iter().chain(self.products.iter())
    }

    pub(crate) fn molecules_mut(&mut self) -> impl Iterator<Item = &mut Molecule> {
        self.reactants.iter_mut().chain(self.products.iter_mut())
    }
}
