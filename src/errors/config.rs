use alloc::string::String;

use crate::value::Kind;

#[derive(thiserror::Error, Debug)]
pub enum ConfigErrorKind {
    #[error("Unable to find class {name}")]
    UnknownType { name: String },
    #[error("Uninstantiable class {name}")]
    Uninstantiable { name: String },
    #[error("{implementation} cannot be bound to {key}")]
    NotSubtype { implementation: String, key: String },
    #[error("Cannot use \"{alias}\" as an alias for {key}")]
    InvalidAlias { alias: String, key: String },
    #[error("Invalid tag name: \"{name}\"")]
    InvalidTag { name: String },
    #[error("Class {ty} has no method {method}")]
    UnknownMethod { ty: String, method: String },
    #[error("Method {owner} is not public")]
    NotPublic { owner: String },
    #[error("Unable to resolve parameter ${parameter} while resolving {owner}")]
    MissingParameter { parameter: String, owner: String },
    #[error("Variadic parameter ${parameter} from method {owner} expected string tag value, got {actual}")]
    TagNotString { parameter: String, owner: String, actual: Kind },
    #[error("Unsupported {actual} parameter ${parameter} for method {owner}, {expected} required")]
    TypeMismatch {
        parameter: String,
        owner: String,
        expected: String,
        actual: Kind,
    },
    #[error("Too many nesting levels for parameter ${parameter} from method {owner}")]
    TooDeep { parameter: String, owner: String },
    #[error("Unsupported {actual} type for parameter ${parameter} from method {owner}")]
    UnsupportedLiteral { parameter: String, owner: String, actual: Kind },
    #[error("Missing required binding: {key}")]
    MissingBinding { key: String },
    #[error("Too many nested services, default expansion didn't converge in {limit} rounds")]
    TooManyRounds { limit: usize },
}
