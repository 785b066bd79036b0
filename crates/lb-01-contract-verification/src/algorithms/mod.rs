//! Algorithms for Contract Verification

pub mod encumbrance;

pub use encumbrance::{check_encumbrances, ENCUMBRANCE_CHECK};
