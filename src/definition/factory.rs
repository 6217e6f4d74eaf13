use alloc::{string::String, vec::Vec};

use super::{find_method, resolve_class, validate_aliases, Defaults, Producer};
use crate::{
    descriptor::TypeDescriptor,
    errors::ConfigErrorKind,
    plan::{plan_method, ParameterPlan},
    tag::Tag,
    value::ArgumentPool,
};

/// Service returned by a creating method of another type.
///
/// The factory object itself is never exposed. It's built (and its calls run) at most once per
/// definition, and only if the creating method or the calls need it.
pub struct ServiceFactory {
    key: String,
    factory: Producer,
    method: String,
    is_static: bool,
    arguments: ParameterPlan,
    prototype: bool,
    aliases: Vec<String>,
    tags: Vec<Tag>,
    pub(super) defaults: Defaults,
}

impl ServiceFactory {
    /// # Errors
    /// - [`ConfigErrorKind::UnknownType`] for the key or the factory
    /// - [`ConfigErrorKind::UnknownMethod`] if the factory has no such creating method
    /// - [`ConfigErrorKind::Uninstantiable`] if the factory object is needed but can't be constructed
    /// - [`ConfigErrorKind::InvalidAlias`] for an alias the key can't be known by
    /// - any planning error of the creating method, the factory constructor or a call
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        descriptor: &dyn TypeDescriptor,
        key: impl Into<String>,
        factory: &str,
        method: impl Into<String>,
        arguments: ArgumentPool,
        prototype: bool,
        constructor: ArgumentPool,
        methods: Vec<(String, ArgumentPool)>,
        aliases: Vec<String>,
        tags: Vec<Tag>,
        defaults: Defaults,
        max_depth: usize,
    ) -> Result<Self, ConfigErrorKind> {
        let key = key.into();
        let method = method.into();
        let info = resolve_class(descriptor, &key, false)?;

        let factory_info = resolve_class(descriptor, factory, false)?;
        let creating = find_method(factory_info, &method)?;
        let factory = Producer::new(factory_info, creating, constructor, methods, max_depth)?;

        let mut arguments = arguments;
        let arguments = plan_method(factory_info.name(), creating, &mut arguments, max_depth)?;
        let aliases = validate_aliases(descriptor, &key, info, aliases)?;

        Ok(Self {
            is_static: creating.is_static(),
            key,
            factory,
            method,
            arguments,
            prototype,
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
    pub const fn factory(&self) -> &Producer {
        &self.factory
    }

    /// Creating method
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    /// Plan of the creating method
    #[inline]
    #[must_use]
    pub const fn arguments(&self) -> &ParameterPlan {
        &self.arguments
    }

    #[inline]
    #[must_use]
    pub const fn is_prototype(&self) -> bool {
        self.prototype
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
