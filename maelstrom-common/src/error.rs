//! Error types for the maelstrom-common crate.

use thiserror::Error;

use crate::address::AddressField;

/// A message failed validation before any provider was consulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An address did not look like an email address.
    #[error("Invalid '{field}' Email Address.")]
    InvalidAddress {
        field: AddressField,
        address: String,
    },

    /// The message had nobody to deliver to.
    #[error("Invalid '{0}' Email Address.")]
    MissingAddress(AddressField),
}

impl ValidationError {
    /// The field that failed validation
    #[must_use]
    pub const fn field(&self) -> AddressField {
        match self {
            Self::InvalidAddress { field, .. } | Self::MissingAddress(field) => *field,
        }
    }

    /// The offending address, if there was one
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::InvalidAddress { address, .. } => Some(address),
            Self::MissingAddress(_) => None,
        }
    }
}
