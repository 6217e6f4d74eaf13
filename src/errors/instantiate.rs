use alloc::{boxed::Box, string::String};

use super::ResolveErrorKind;
use crate::value::Kind;

#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Argument #{index} is missing")]
    MissingArgument { index: usize },
    #[error("Argument #{index} has unexpected shape. Expected: {expected}, actual: {actual}")]
    UnexpectedArgument {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Argument #{index} holds an instance of another type, expected {expected}")]
    IncorrectType { index: usize, expected: &'static str },
    #[error("Value of kind {actual} can't be read as {expected}")]
    IncorrectKind { expected: &'static str, actual: Kind },
    #[error("Type {ty} can't be constructed")]
    NoConstructor { ty: String },
    #[error("Method {owner} isn't invocable")]
    NoMethod { owner: String },
    #[error("Method {owner} expects an instance receiver")]
    NoReceiver { owner: String },
    #[error("Method {owner} returned no service")]
    NoReturn { owner: String },
    #[error(transparent)]
    Resolve(Box<ResolveErrorKind>),
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl From<ResolveErrorKind> for InstantiateErrorKind {
    #[inline]
    fn from(err: ResolveErrorKind) -> Self {
        Self::Resolve(Box::new(err))
    }
}
