use alloc::{string::String, vec::Vec};

use super::{plan_calls, resolve_class, validate_aliases, Defaults};
use crate::{
    descriptor::TypeDescriptor,
    errors::ConfigErrorKind,
    plan::{plan_constructor, MethodCall, ParameterPlan},
    tag::Tag,
    value::ArgumentPool,
};

/// Service built by constructing its implementation directly, then running the declared method
/// calls against it.
pub struct ConcreteService {
    key: String,
    implementation: String,
    prototype: bool,
    constructor: ParameterPlan,
    calls: Vec<MethodCall>,
    aliases: Vec<String>,
    tags: Vec<Tag>,
    pub(super) defaults: Defaults,
}

impl ConcreteService {
    /// Validates the binding and plans the construction.
    ///
    /// Without an explicit `implementation` the key itself is constructed.
    ///
    /// # Errors
    /// - [`ConfigErrorKind::UnknownType`] or [`ConfigErrorKind::Uninstantiable`] for the implementation
    /// - [`ConfigErrorKind::NotSubtype`] if the implementation isn't a subtype of the key
    /// - [`ConfigErrorKind::InvalidAlias`] for an alias the implementation can't be known by
    /// - any planning error of the constructor or a method call
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        descriptor: &dyn TypeDescriptor,
        key: impl Into<String>,
        implementation: Option<String>,
        prototype: bool,
        constructor: ArgumentPool,
        methods: Vec<(String, ArgumentPool)>,
        aliases: Vec<String>,
        tags: Vec<Tag>,
        defaults: Defaults,
        max_depth: usize,
    ) -> Result<Self, ConfigErrorKind> {
        let key = key.into();
        let info = match implementation {
            Some(implementation) => {
                let info = resolve_class(descriptor, &implementation, true)?;
                if !info.is_subtype_of(&key) {
                    return Err(ConfigErrorKind::NotSubtype { implementation, key });
                }
                info
            }
            None => resolve_class(descriptor, &key, true)?,
        };

        let mut constructor = constructor;
        let constructor = plan_constructor(info.name(), info.constructor(), &mut constructor, max_depth)?;
        let calls = plan_calls(info, methods, max_depth)?;
        let aliases = validate_aliases(descriptor, &key, info, aliases)?;

        Ok(Self {
            implementation: info.name().into(),
            key,
            prototype,
            constructor,
            calls,
            aliases,
            tags,
            defaults,
        })
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    #[inline]
    #[must_use]
    pub const fn is_prototype(&self) -> bool {
        self.prototype
    }

    #[inline]
    #[must_use]
    pub const fn constructor(&self) -> &ParameterPlan {
        &self.constructor
    }

    #[inline]
    #[must_use]
    pub fn calls(&self) -> &[MethodCall] {
        &self.calls
    }

    #[inline]
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[inline]
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}
