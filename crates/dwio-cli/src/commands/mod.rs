pub mod classify;
pub mod export;
pub mod inspect;
pub mod rxn;
