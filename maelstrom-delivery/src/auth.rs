//! The shared secret callers must present to send mail.

use std::fmt;

use subtle::ConstantTimeEq;

/// Process-wide password guarding the send operation
///
/// The secret is compared in constant time and never printed. A request
/// without a token is treated as presenting the empty string, so a gateway
/// configured with an empty secret accepts requests that omit it.
#[derive(Clone, Default)]
pub struct SharedSecret(String);

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns `true` if no secret has been configured
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check a caller-supplied token against the secret
    #[must_use]
    pub fn verify(&self, token: Option<&str>) -> bool {
        let token = token.unwrap_or_default();
        self.0.as_bytes().ct_eq(token.as_bytes()).into()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
