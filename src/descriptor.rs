//! Introspection capability the engine is built on.
//!
//! A [`TypeDescriptor`] answers what a type looks like (ancestors, constructor, methods and their
//! parameters) and performs construction and method invocation with already resolved
//! [`Arguments`]. [`crate::TypeCatalog`] is the closure-backed implementation shipped with the crate.

use alloc::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    string::String,
    vec::Vec,
};
use core::any::type_name;

use crate::{
    errors::InstantiateErrorKind,
    utils::thread_safety::{downcast, AnyThreadSafety, Instance, Object, RcThreadSafety, SendSafety, SyncSafety},
    value::{Kind, Value},
};

/// Shares a freshly produced service, the way construction and method closures hand it back.
#[inline]
#[must_use]
pub fn instance<T: SendSafety + SyncSafety + 'static>(value: T) -> Instance {
    RcThreadSafety::new(value)
}

/// Declared type of a parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    /// No declared type, any literal is accepted
    Mixed,
    Bool,
    Int,
    Float,
    String,
    Array,
    /// Class or interface, resolved as a service
    Class(String),
}

impl ParamType {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ParamType::Mixed => "mixed",
            ParamType::Bool => "bool",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Class(name) => name,
        }
    }

    /// Exact scalar match, no coercions
    #[must_use]
    pub(crate) fn accepts(&self, kind: Kind) -> bool {
        match self {
            ParamType::Mixed => true,
            ParamType::Bool => kind == Kind::Bool,
            ParamType::Int => kind == Kind::Int,
            ParamType::Float => kind == Kind::Float,
            ParamType::String => kind == Kind::String,
            ParamType::Array => kind == Kind::Array,
            ParamType::Class(_) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    ty: ParamType,
    variadic: bool,
    nullable: bool,
    default: Option<Value>,
}

impl Parameter {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            variadic: false,
            nullable: false,
            default: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn class(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::new(name, ParamType::Class(ty.into()))
    }

    #[inline]
    #[must_use]
    pub fn mixed(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Mixed)
    }

    #[inline]
    #[must_use]
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Bool)
    }

    #[inline]
    #[must_use]
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Int)
    }

    #[inline]
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Float)
    }

    #[inline]
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    #[inline]
    #[must_use]
    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Array)
    }

    /// Marks the parameter as variadic. It has to be the last one of its signature.
    #[inline]
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn ty(&self) -> &ParamType {
        &self.ty
    }

    #[inline]
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match &self.ty {
            ParamType::Class(name) => Some(name),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.variadic
    }

    #[inline]
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodInfo {
    pub(crate) name: String,
    pub(crate) is_static: bool,
    pub(crate) is_public: bool,
    pub(crate) parameters: Vec<Parameter>,
}

impl MethodInfo {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            is_public: true,
            parameters,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.is_public
    }

    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

/// What's known about a type: its ancestors (parents and implemented interfaces),
/// whether it can be constructed, its constructor and methods.
#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub(crate) name: String,
    pub(crate) ancestors: BTreeSet<String>,
    pub(crate) instantiable: bool,
    pub(crate) constructor: Option<MethodInfo>,
    pub(crate) methods: BTreeMap<String, MethodInfo>,
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn is_instantiable(&self) -> bool {
        self.instantiable
    }

    #[inline]
    #[must_use]
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        self.ancestors.iter().map(String::as_str)
    }

    /// Strict ancestry, a type isn't its own ancestor
    #[inline]
    #[must_use]
    pub fn has_ancestor(&self, name: &str) -> bool {
        self.ancestors.contains(name)
    }

    #[inline]
    #[must_use]
    pub fn is_subtype_of(&self, name: &str) -> bool {
        self.name == name || self.has_ancestor(name)
    }

    #[inline]
    #[must_use]
    pub const fn constructor(&self) -> Option<&MethodInfo> {
        self.constructor.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.get(name)
    }
}

/// One resolved argument, as received by constructors and methods.
#[derive(Clone)]
pub enum Argument {
    Value(Value),
    /// `None` for an optional service that isn't available
    Service(Option<Instance>),
    Tagged(RcThreadSafety<Vec<Instance>>),
}

impl Argument {
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Argument::Value(_) => "value",
            Argument::Service(_) => "service",
            Argument::Tagged(_) => "tagged",
        }
    }
}

/// Resolved arguments consumed front to back.
///
/// Accessors report the position of the offending argument, so a construction closure can just
/// use `?` on every read.
pub struct Arguments {
    items: VecDeque<Argument>,
    index: usize,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub fn new(items: Vec<Argument>) -> Self {
        Self {
            items: items.into(),
            index: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Argument, InstantiateErrorKind> {
        let index = self.index;
        let argument = self.items.pop_front().ok_or(InstantiateErrorKind::MissingArgument { index })?;
        self.index += 1;
        Ok(argument)
    }

    /// Required service of concrete type `T`
    ///
    /// # Errors
    /// Fails if the argument is missing, isn't a service, is `None` or holds another type
    pub fn service<T: SendSafety + SyncSafety + 'static>(&mut self) -> Result<RcThreadSafety<T>, InstantiateErrorKind> {
        let index = self.index;
        match self.optional_service::<T>()? {
            Some(service) => Ok(service),
            None => Err(InstantiateErrorKind::UnexpectedArgument {
                index,
                expected: "service",
                actual: "null",
            }),
        }
    }

    /// # Errors
    /// Fails if the argument is missing, isn't a service or holds another type
    pub fn optional_service<T: SendSafety + SyncSafety + 'static>(&mut self) -> Result<Option<RcThreadSafety<T>>, InstantiateErrorKind> {
        let index = self.index;
        match self.instance()? {
            Some(instance) => downcast::<T>(instance).map(Some).map_err(|_| InstantiateErrorKind::IncorrectType {
                index,
                expected: type_name::<T>(),
            }),
            None => Ok(None),
        }
    }

    /// Untyped service
    ///
    /// # Errors
    /// Fails if the argument is missing or isn't a service
    pub fn instance(&mut self) -> Result<Option<Instance>, InstantiateErrorKind> {
        let index = self.index;
        match self.next()? {
            Argument::Service(instance) => Ok(instance),
            argument => Err(InstantiateErrorKind::UnexpectedArgument {
                index,
                expected: "service",
                actual: argument.shape(),
            }),
        }
    }

    /// # Errors
    /// Fails if the argument is missing or isn't a tag group
    pub fn tagged(&mut self) -> Result<RcThreadSafety<Vec<Instance>>, InstantiateErrorKind> {
        let index = self.index;
        match self.next()? {
            Argument::Tagged(instances) => Ok(instances),
            argument => Err(InstantiateErrorKind::UnexpectedArgument {
                index,
                expected: "tagged",
                actual: argument.shape(),
            }),
        }
    }

    /// # Errors
    /// Fails if the argument is missing or isn't a literal
    pub fn value(&mut self) -> Result<Value, InstantiateErrorKind> {
        let index = self.index;
        match self.next()? {
            Argument::Value(value) => Ok(value),
            argument => Err(InstantiateErrorKind::UnexpectedArgument {
                index,
                expected: "value",
                actual: argument.shape(),
            }),
        }
    }

    /// # Errors
    /// Fails if the argument is missing or isn't a string literal
    pub fn string(&mut self) -> Result<String, InstantiateErrorKind> {
        match self.value()? {
            Value::String(val) => Ok(val),
            value => Err(InstantiateErrorKind::IncorrectKind {
                expected: "string",
                actual: value.kind(),
            }),
        }
    }

    /// # Errors
    /// Fails if the argument is missing or isn't an integer literal
    pub fn int(&mut self) -> Result<i64, InstantiateErrorKind> {
        let value = self.value()?;
        value.as_int().ok_or(InstantiateErrorKind::IncorrectKind {
            expected: "int",
            actual: value.kind(),
        })
    }

    /// # Errors
    /// Fails if the argument is missing or isn't a boolean literal
    pub fn bool(&mut self) -> Result<bool, InstantiateErrorKind> {
        let value = self.value()?;
        value.as_bool().ok_or(InstantiateErrorKind::IncorrectKind {
            expected: "bool",
            actual: value.kind(),
        })
    }

    /// # Errors
    /// Fails if the argument is missing or isn't a float literal
    pub fn float(&mut self) -> Result<f64, InstantiateErrorKind> {
        let value = self.value()?;
        value.as_float().ok_or(InstantiateErrorKind::IncorrectKind {
            expected: "float",
            actual: value.kind(),
        })
    }

    /// Everything left, for variadic parameters
    #[inline]
    #[must_use]
    pub fn rest(&mut self) -> Vec<Argument> {
        self.index += self.items.len();
        self.items.drain(..).collect()
    }

    /// Remaining literals, for variadic scalar parameters
    ///
    /// # Errors
    /// Fails if any of the remaining arguments isn't a literal
    pub fn rest_values(&mut self) -> Result<Vec<Value>, InstantiateErrorKind> {
        let mut values = Vec::with_capacity(self.items.len());
        while !self.items.is_empty() {
            values.push(self.value()?);
        }
        Ok(values)
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(items: Vec<Argument>) -> Self {
        Self::new(items)
    }
}

/// Target of a method invocation.
pub enum Receiver<'a> {
    Static,
    Object(&'a mut AnyThreadSafety),
}

impl<'a> Receiver<'a> {
    #[inline]
    #[must_use]
    pub fn downcast_mut<T: 'static>(self) -> Option<&'a mut T> {
        match self {
            Receiver::Static => None,
            Receiver::Object(object) => object.downcast_mut::<T>(),
        }
    }
}

pub trait TypeDescriptor: SendSafety + SyncSafety {
    /// `None` when the type is unknown
    fn describe(&self, ty: &str) -> Option<&TypeInfo>;

    /// Constructs a fresh, not yet shared object of type `ty`.
    ///
    /// # Errors
    /// Any failure of the underlying construction
    fn construct(&self, ty: &str, arguments: Arguments) -> Result<Object, InstantiateErrorKind>;

    /// Invokes `method` of type `ty`. Returns the produced service, if any.
    ///
    /// # Errors
    /// Any failure of the underlying method
    fn invoke(&self, ty: &str, method: &str, receiver: Receiver<'_>, arguments: Arguments) -> Result<Option<Instance>, InstantiateErrorKind>;
}
