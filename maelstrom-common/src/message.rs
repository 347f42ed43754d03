//! The outbound email handed to a provider.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::{
    address::{self, AddressField},
    error::ValidationError,
};

/// An email to be forwarded to exactly one provider.
///
/// A `Message` is never modified after it is built; a dispatcher takes it by
/// value and it is dropped once the provider has answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Caller-supplied identifier, carried along but never interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(default)]
    to: Vec<String>,
    #[serde(default)]
    from: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    text: String,
}

impl Message {
    pub fn new<I, S>(
        from: impl Into<String>,
        to: I,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            to: to.into_iter().map(Into::into).collect(),
            from: from.into(),
            subject: subject.into(),
            text: text.into(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        self.id
    }

    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Validate every recipient, in order, and then the sender.
    ///
    /// # Errors
    ///
    /// Returns the first address that fails, tagged with the field it came
    /// from. A message without recipients fails on [`AddressField::To`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.to.is_empty() {
            return Err(ValidationError::MissingAddress(AddressField::To));
        }

        if let Some(bad) = self.to.iter().find(|to| !address::is_valid(to)) {
            return Err(ValidationError::InvalidAddress {
                field: AddressField::To,
                address: bad.clone(),
            });
        }

        if !address::is_valid(&self.from) {
            return Err(ValidationError::InvalidAddress {
                field: AddressField::From,
                address: self.from.clone(),
            });
        }

        Ok(())
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {} to {} with subject {:?}",
            self.from,
            self.to.join(", "),
            self.subject
        )
    }
}
