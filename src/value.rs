use alloc::{collections::VecDeque, string::String, vec::Vec};
use core::fmt::{self, Debug, Display, Formatter};

use crate::utils::thread_safety::{Instance, RcThreadSafety};

/// User-supplied literal, as passed to constructors and method calls through an [`ArgumentPool`].
///
/// `Object` exists so that instances handed in by mistake are rejected with a configuration error
/// instead of being silently shared; it's never a valid literal.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
    Object(Instance),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
}

impl Kind {
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::List(_) | Value::Map(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(val) => Some(*val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(val) => Some(*val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(val) => Some(*val),
            _ => None,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(val) => f.debug_tuple("Bool").field(val).finish(),
            Value::Int(val) => f.debug_tuple("Int").field(val).finish(),
            Value::Float(val) => f.debug_tuple("Float").field(val).finish(),
            Value::String(val) => f.debug_tuple("String").field(val).finish(),
            Value::List(val) => f.debug_tuple("List").field(val).finish(),
            Value::Map(val) => f.debug_tuple("Map").field(val).finish(),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => RcThreadSafety::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::Int(val.into())
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::Int(val)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.into())
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::String(val)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Self {
        Value::List(val.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        val.map_or(Value::Null, Into::into)
    }
}

/// Ordered user arguments for one constructor or method call.
///
/// Entries are either positional or named and keep insertion order, the way an ordered
/// array-with-keys would. Named entries are unique: naming a parameter twice replaces the value
/// in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgumentPool {
    entries: VecDeque<(Option<String>, Value)>,
}

impl ArgumentPool {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: VecDeque::new() }
    }

    #[inline]
    #[must_use]
    pub fn positional(mut self, value: impl Into<Value>) -> Self {
        self.entries.push_back((None, value.into()));
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key.as_deref() == Some(name.as_str())) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push_back((Some(name), value)),
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn pop_last(&mut self) -> Option<Value> {
        self.entries.pop_back().map(|(_, value)| value)
    }

    pub(crate) fn take_named(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(key, _)| key.as_deref() == Some(name))?;
        self.entries.remove(index).map(|(_, value)| value)
    }

    /// Whether the first pending entry has no name, which is when positional shifting applies.
    #[inline]
    pub(crate) fn front_is_positional(&self) -> bool {
        matches!(self.entries.front(), Some((None, _)))
    }

    #[inline]
    pub(crate) fn shift(&mut self) -> Option<Value> {
        self.entries.pop_front().map(|(_, value)| value)
    }

    #[inline]
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Value> + '_ {
        self.entries.drain(..).map(|(_, value)| value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for ArgumentPool {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().fold(Self::new(), Self::positional)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArgumentPool, Kind, Value};
    use crate::pool;

    use alloc::{string::String, vec, vec::Vec};

    #[test]
    fn test_kinds() {
        assert_eq!(Value::from(1).kind(), Kind::Int);
        assert_eq!(Value::from(1.5).kind(), Kind::Float);
        assert_eq!(Value::from("a").kind(), Kind::String);
        assert_eq!(Value::from(vec![1, 2]).kind(), Kind::Array);
        assert_eq!(Value::Map(Vec::new()).kind(), Kind::Array);
        assert_eq!(Value::from(None::<i64>).kind(), Kind::Null);
        assert_eq!(Kind::Array.name(), "array");
    }

    #[test]
    fn test_pool_macro_keeps_order() {
        let mut pool = pool![2, 3, first = 1];
        assert_eq!(pool.len(), 3);
        assert!(pool.front_is_positional());
        assert_eq!(pool.take_named("first"), Some(Value::Int(1)));
        assert_eq!(pool.shift(), Some(Value::Int(2)));
        assert_eq!(pool.pop_last(), Some(Value::Int(3)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_named_replaces_in_place() {
        let mut pool = ArgumentPool::new().named("a", 1).positional("x").named("a", 2);
        assert!(!pool.front_is_positional());
        assert_eq!(pool.drain().collect::<Vec<_>>(), vec![Value::Int(2), Value::String(String::from("x"))]);
    }
}
