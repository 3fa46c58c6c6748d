pub mod identifiers;
pub mod polynomial;
