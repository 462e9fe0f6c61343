//! Error taxonomy shared by the region statistics engine and the background
//! sample selector.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or mismatched arguments. Raised before any computation starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Presence points and raster disagree on their coordinate reference system.
    #[error("CRS mismatch: presences are {presence}, raster is {raster}")]
    CrsMismatch { presence: String, raster: String },

    /// The PCA filter had nothing to work with. Callers may fall back to
    /// random sampling.
    #[error("empty selection: {0}")]
    EmptySelection(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// True for every flavour of bad argument, CRS disagreement included.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::CrsMismatch { .. })
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::EmptySelection(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
