use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid well definition: {0}")]
    InvalidWellDefinition(String),

    #[error("Invalid liquid height found: {0}")]
    InvalidLiquidHeightFound(String),
}
