use alloc::string::String;
use core::fmt::{self, Display, Formatter};

use crate::errors::ConfigErrorKind;

/// Checks the identifier grammar shared by tag names and free-standing aliases:
/// a letter, `_` or non-ASCII character first, then letters, digits, non-ASCII characters or any of `\ : _ - .`.
#[must_use]
pub fn is_identifier(val: &str) -> bool {
    let mut chars = val.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || !first.is_ascii()) {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || !ch.is_ascii() || matches!(ch, '\\' | ':' | '_' | '-' | '.'))
}

/// Named, prioritized membership of a binding in an aggregate group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    name: String,
    priority: i64,
}

impl Tag {
    /// # Errors
    /// Returns [`ConfigErrorKind::InvalidTag`] if the name doesn't follow the identifier grammar
    pub fn new(name: impl Into<String>, priority: i64) -> Result<Self, ConfigErrorKind> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(ConfigErrorKind::InvalidTag { name });
        }
        Ok(Self { name, priority })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn priority(&self) -> i64 {
        self.priority
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.priority)
    }
}
