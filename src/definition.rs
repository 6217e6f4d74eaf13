mod concrete;
mod factory;
mod wrapper;

pub use concrete::ConcreteService;
pub use factory::ServiceFactory;
pub use wrapper::ServiceWrapper;

use alloc::{boxed::Box, string::String, vec::Vec};
use core::mem;

use crate::{
    blueprint::Compiler,
    builder::DefinitionBuilder,
    descriptor::{MethodInfo, TypeDescriptor, TypeInfo},
    errors::ConfigErrorKind,
    plan::{plan_constructor, plan_method, MethodCall, ParameterPlan},
    tag::is_identifier,
    value::ArgumentPool,
};

/// Registers the fallback binding for one key. Invoked at most once, and only if nothing else
/// bound the key first.
pub type DefaultProvider = Box<dyn FnOnce(DefinitionBuilder<'_>) -> Result<(), ConfigErrorKind>>;

/// Fallback providers keyed by the binding they register.
pub type Defaults = Vec<(String, DefaultProvider)>;

/// Validated binding, ready to be compiled.
pub enum Definition {
    Concrete(ConcreteService),
    Factory(ServiceFactory),
    Wrapper(ServiceWrapper),
}

impl Definition {
    /// Key the definition provides, or the key a wrapper applies to
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Definition::Concrete(service) => service.key(),
            Definition::Factory(service) => service.key(),
            Definition::Wrapper(wrapper) => wrapper.target(),
        }
    }

    #[must_use]
    pub fn aliases(&self) -> &[String] {
        match self {
            Definition::Concrete(service) => service.aliases(),
            Definition::Factory(service) => service.aliases(),
            Definition::Wrapper(_) => &[],
        }
    }

    #[must_use]
    pub const fn is_wrapper(&self) -> bool {
        matches!(self, Definition::Wrapper(_))
    }

    /// Keys of the declared fallback bindings
    pub fn default_keys(&self) -> impl Iterator<Item = &str> {
        self.defaults().iter().map(|(key, _)| key.as_str())
    }

    #[inline]
    pub(crate) fn take_defaults(&mut self) -> Defaults {
        match self {
            Definition::Concrete(service) => mem::take(&mut service.defaults),
            Definition::Factory(service) => mem::take(&mut service.defaults),
            Definition::Wrapper(wrapper) => mem::take(&mut wrapper.defaults),
        }
    }

    fn defaults(&self) -> &Defaults {
        match self {
            Definition::Concrete(service) => &service.defaults,
            Definition::Factory(service) => &service.defaults,
            Definition::Wrapper(wrapper) => &wrapper.defaults,
        }
    }

    pub fn compile<C: Compiler + ?Sized>(self, compiler: &mut C) {
        match self {
            Definition::Concrete(service) => compiler.concrete(service),
            Definition::Factory(service) => compiler.factory(service),
            Definition::Wrapper(wrapper) => compiler.wrapper(wrapper),
        }
    }
}

impl From<ConcreteService> for Definition {
    fn from(service: ConcreteService) -> Self {
        Definition::Concrete(service)
    }
}

impl From<ServiceFactory> for Definition {
    fn from(service: ServiceFactory) -> Self {
        Definition::Factory(service)
    }
}

impl From<ServiceWrapper> for Definition {
    fn from(wrapper: ServiceWrapper) -> Self {
        Definition::Wrapper(wrapper)
    }
}

/// How to obtain the object a factory or wrapper method is invoked on.
#[derive(Clone, Debug, PartialEq)]
pub struct Producer {
    ty: String,
    instance: Option<ParameterPlan>,
    calls: Vec<MethodCall>,
}

impl Producer {
    /// Decides whether an object is needed at all.
    ///
    /// It is for an instance creating method, and for declared calls when the type is
    /// instantiable or any of the calls is an instance one. The object is then built once and its
    /// calls run once; otherwise the (static) calls run before every creation.
    fn new(
        info: &TypeInfo,
        creating: &MethodInfo,
        constructor: ArgumentPool,
        methods: Vec<(String, ArgumentPool)>,
        max_depth: usize,
    ) -> Result<Self, ConfigErrorKind> {
        let methods = methods
            .into_iter()
            .filter(|(name, _)| name != creating.name())
            .collect();
        let calls = plan_calls(info, methods, max_depth)?;

        let needs_instance =
            !creating.is_static() || (!calls.is_empty() && (info.is_instantiable() || calls.iter().any(|call| !call.is_static())));

        let instance = if needs_instance {
            if !info.is_instantiable() {
                return Err(ConfigErrorKind::Uninstantiable { name: info.name().into() });
            }
            let mut constructor = constructor;
            Some(plan_constructor(info.name(), info.constructor(), &mut constructor, max_depth)?)
        } else {
            None
        };

        Ok(Self {
            ty: info.name().into(),
            instance,
            calls,
        })
    }

    #[inline]
    #[must_use]
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Constructor plan of the memoized object, `None` when only static methods are used
    #[inline]
    #[must_use]
    pub const fn instance(&self) -> Option<&ParameterPlan> {
        self.instance.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn calls(&self) -> &[MethodCall] {
        &self.calls
    }
}

/// Type information of `ty`; `concrete` additionally requires it to be instantiable
pub(crate) fn resolve_class<'d>(descriptor: &'d dyn TypeDescriptor, ty: &str, concrete: bool) -> Result<&'d TypeInfo, ConfigErrorKind> {
    let info = descriptor.describe(ty).ok_or_else(|| ConfigErrorKind::UnknownType { name: ty.into() })?;
    if concrete && !info.is_instantiable() {
        return Err(ConfigErrorKind::Uninstantiable { name: ty.into() });
    }
    Ok(info)
}

pub(crate) fn find_method<'i>(info: &'i TypeInfo, name: &str) -> Result<&'i MethodInfo, ConfigErrorKind> {
    info.method(name).ok_or_else(|| ConfigErrorKind::UnknownMethod {
        ty: info.name().into(),
        method: name.into(),
    })
}

/// Plans every declared call in declaration order, repeated methods included
pub(crate) fn plan_calls(info: &TypeInfo, methods: Vec<(String, ArgumentPool)>, max_depth: usize) -> Result<Vec<MethodCall>, ConfigErrorKind> {
    methods
        .into_iter()
        .map(|(name, mut pool)| {
            let method = find_method(info, &name)?;
            Ok(MethodCall {
                plan: plan_method(info.name(), method, &mut pool, max_depth)?,
                method: name,
                is_static: method.is_static(),
            })
        })
        .collect()
}

/// Keeps the aliases `info` can be known by.
///
/// An alias naming the type itself (or the key it's bound to) is dropped. Otherwise it has to be
/// an ancestor of the type, or a free identifier that isn't the name of another type.
pub(crate) fn validate_aliases(descriptor: &dyn TypeDescriptor, key: &str, info: &TypeInfo, aliases: Vec<String>) -> Result<Vec<String>, ConfigErrorKind> {
    let mut resolved: Vec<String> = Vec::with_capacity(aliases.len());

    for alias in aliases {
        if alias == info.name() || alias == key {
            continue;
        }
        if !(info.has_ancestor(&alias) || (descriptor.describe(&alias).is_none() && is_identifier(&alias))) {
            return Err(ConfigErrorKind::InvalidAlias {
                alias,
                key: info.name().into(),
            });
        }
        if !resolved.contains(&alias) {
            resolved.push(alias);
        }
    }

    Ok(resolved)
}
