use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display, Formatter};

use super::{ConfigErrorKind, InstantiateErrorKind};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Unable to find service \"{key}\"")]
    NotFound { key: String },
    #[error("Unable to create service \"{key}\"")]
    NotInstantiable { key: String },
    #[error(transparent)]
    Instantiate(#[from] InstantiateErrorKind),
    #[error("Service cyclic dependency detected: {}", Chain(.chain))]
    DependencyCycle { chain: Vec<String> },
    #[error("Unable to resolve parameter ${parameter} for {owner}")]
    UnresolvedParameter { parameter: String, owner: String },
    #[error(transparent)]
    Config(ConfigErrorKind),
    #[error("Service \"{key}\" isn't an instance of {expected}")]
    IncorrectType { key: String, expected: &'static str },
}

impl ResolveErrorKind {
    /// `true` for failures an optional fetch turns into "no service".
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NotInstantiable { .. })
    }
}

impl From<ConfigErrorKind> for ResolveErrorKind {
    fn from(err: ConfigErrorKind) -> Self {
        match err {
            ConfigErrorKind::MissingParameter { parameter, owner } => Self::UnresolvedParameter { parameter, owner },
            err => Self::Config(err),
        }
    }
}

struct Chain<'a>(&'a [String]);

impl Display for Chain<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, key) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " < ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
