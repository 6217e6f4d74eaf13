use alloc::{boxed::Box, string::String, vec::Vec};
use tracing::debug;

use crate::{
    definition::{ConcreteService, Definition, Defaults, ServiceFactory, ServiceWrapper},
    errors::ConfigErrorKind,
    registry::Registry,
    tag::Tag,
    value::ArgumentPool,
};

enum Strategy {
    Concrete { implementation: Option<String> },
    Factory { factory: String, method: String },
    Wrapper { wrapper: String, method: String, priority: i64 },
}

/// Describes the binding of one key. Nothing is registered until [`Self::done`] succeeds.
///
/// # Examples
/// ```rust
/// use bindery::{pool, ClassDescriptor, Parameter, Registry, TypeCatalog};
///
/// struct Mailer {
///     host: String,
/// }
///
/// let catalog = TypeCatalog::new().with_class(
///     ClassDescriptor::new("Mailer").constructor(vec![Parameter::string("host")], |args| Ok(Mailer { host: args.string()? })),
/// );
///
/// let mut registry = Registry::new(catalog);
/// registry.bind("Mailer").with_constructor(pool!["smtp.local"]).with_alias("mailer").done().unwrap();
///
/// let injector = registry.build().unwrap();
/// let mailer = injector.fetch_as::<Mailer>("mailer").unwrap();
/// assert_eq!(mailer.host, "smtp.local");
/// ```
#[must_use]
pub struct DefinitionBuilder<'a> {
    registry: &'a mut Registry,
    key: String,
    strategy: Strategy,
    prototype: bool,
    constructor: ArgumentPool,
    methods: Vec<(String, ArgumentPool)>,
    aliases: Vec<String>,
    tags: Vec<(String, i64)>,
    defaults: Defaults,
}

impl<'a> DefinitionBuilder<'a> {
    pub(crate) fn new(registry: &'a mut Registry, key: impl Into<String>) -> Self {
        Self {
            registry,
            key: key.into(),
            strategy: Strategy::Concrete { implementation: None },
            prototype: false,
            constructor: ArgumentPool::new(),
            methods: Vec::new(),
            aliases: Vec::new(),
            tags: Vec::new(),
            defaults: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Constructs `implementation` instead of the key itself
    #[inline]
    pub fn to(mut self, implementation: impl Into<String>) -> Self {
        self.strategy = Strategy::Concrete {
            implementation: Some(implementation.into()),
        };
        self
    }

    /// Produces the service with `method` of `factory`.
    /// Arguments of the creating method are declared with [`Self::with_method`].
    #[inline]
    pub fn to_factory(mut self, factory: impl Into<String>, method: impl Into<String>) -> Self {
        self.strategy = Strategy::Factory {
            factory: factory.into(),
            method: method.into(),
        };
        self
    }

    /// Wraps whatever is bound under the key with `method` of `wrapper`.
    /// Wrappers of higher priority are applied first.
    #[inline]
    pub fn to_wrapper(mut self, wrapper: impl Into<String>, method: impl Into<String>, priority: i64) -> Self {
        self.strategy = Strategy::Wrapper {
            wrapper: wrapper.into(),
            method: method.into(),
            priority,
        };
        self
    }

    /// Arguments of the constructor (of the factory or wrapper object, for those)
    #[inline]
    pub fn with_constructor(mut self, arguments: impl Into<ArgumentPool>) -> Self {
        self.constructor = arguments.into();
        self
    }

    /// Calls `method` after construction. Every declaration is a separate call.
    #[inline]
    pub fn with_method(mut self, method: impl Into<String>, arguments: impl Into<ArgumentPool>) -> Self {
        self.methods.push((method.into(), arguments.into()));
        self
    }

    #[inline]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds the key to a tag group. Tagging twice with the same name keeps the last priority.
    pub fn with_tag(mut self, name: impl Into<String>, priority: i64) -> Self {
        let name = name.into();
        match self.tags.iter_mut().find(|(tag, _)| *tag == name) {
            Some((_, slot)) => *slot = priority,
            None => self.tags.push((name, priority)),
        }
        self
    }

    /// Fallback binding for `key`, registered by `provider` only if nothing else binds it.
    pub fn with_default<F>(mut self, key: impl Into<String>, provider: F) -> Self
    where
        F: FnOnce(DefinitionBuilder<'_>) -> Result<(), ConfigErrorKind> + 'static,
    {
        let key = key.into();
        let provider: Box<dyn FnOnce(DefinitionBuilder<'_>) -> Result<(), ConfigErrorKind>> = Box::new(provider);
        match self.defaults.iter_mut().find(|(default, _)| *default == key) {
            Some((_, slot)) => *slot = provider,
            None => self.defaults.push((key, provider)),
        }
        self
    }

    /// Fresh instance on every fetch
    #[inline]
    pub fn as_prototype(mut self) -> Self {
        self.prototype = true;
        self
    }

    /// Validates the binding and registers it, replacing an earlier one for the same key.
    ///
    /// # Errors
    /// - [`ConfigErrorKind::InvalidTag`] for a tag name that isn't an identifier
    /// - any validation error of the definition variant
    pub fn done(self) -> Result<(), ConfigErrorKind> {
        let Self {
            registry,
            key,
            strategy,
            prototype,
            constructor,
            mut methods,
            aliases,
            tags,
            defaults,
        } = self;

        let tags = tags
            .into_iter()
            .map(|(name, priority)| Tag::new(name, priority))
            .collect::<Result<Vec<_>, _>>()?;

        let descriptor = registry.descriptor();
        let max_depth = registry.config().max_depth;

        let definition: Definition = match strategy {
            Strategy::Concrete { implementation } => ConcreteService::new(
                &*descriptor,
                key,
                implementation,
                prototype,
                constructor,
                methods,
                aliases,
                tags,
                defaults,
                max_depth,
            )?
            .into(),
            Strategy::Factory { factory, method } => {
                let arguments = match methods.iter().rposition(|(name, _)| *name == method) {
                    Some(index) => methods.remove(index).1,
                    None => ArgumentPool::new(),
                };
                methods.retain(|(name, _)| *name != method);

                ServiceFactory::new(
                    &*descriptor,
                    key,
                    &factory,
                    method,
                    arguments,
                    prototype,
                    constructor,
                    methods,
                    aliases,
                    tags,
                    defaults,
                    max_depth,
                )?
                .into()
            }
            Strategy::Wrapper {
                wrapper,
                method,
                priority,
            } => ServiceWrapper::new(&*descriptor, key, &wrapper, method, priority, constructor, methods, defaults, max_depth)?.into(),
        };

        debug!(key = definition.key(), "Definition built");
        registry.collect(definition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{
        catalog::{ClassDescriptor, TypeCatalog},
        definition::Definition,
        descriptor::{instance, Parameter},
        errors::ConfigErrorKind,
        plan::ArgumentSource,
        pool,
        registry::Registry,
        value::Value,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        vec,
        vec::Vec,
    };
    use tracing_test::traced_test;

    struct Pool;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with_class(ClassDescriptor::interface("Connection"))
            .with_class(
                ClassDescriptor::new("Pool")
                    .constructor(vec![], |_| Ok(Pool))
                    .method("connect", vec![Parameter::string("dsn")], |_: &mut Pool, _| Ok(Some(instance(0_u8))))
                    .method("limit", vec![Parameter::int("max")], |_: &mut Pool, _| Ok(None)),
            )
    }

    fn definitions(registry: &mut Registry) -> Vec<Definition> {
        registry.take_definitions()
    }

    #[test]
    #[traced_test]
    fn test_factory_arguments() {
        let mut registry = Registry::new(catalog());
        registry
            .bind("Connection")
            .to_factory("Pool", "connect")
            .with_method("connect", pool!["first"])
            .with_method("limit", pool![4])
            .with_method("connect", pool!["second"])
            .with_tag("db", 0)
            .with_tag("db", 10)
            .done()
            .unwrap();

        let definitions = definitions(&mut registry);
        let [Definition::Factory(service)] = definitions.as_slice() else {
            panic!("expected a single factory");
        };
        assert_eq!(service.arguments().sources(), [ArgumentSource::FromLiteral(Value::from("second"))]);
        assert_eq!(service.factory().calls().len(), 1);
        assert_eq!(service.tags().len(), 1);
        assert_eq!(service.tags()[0].priority(), 10);
        assert!(logs_contain("Definition built"));
    }

    #[test]
    #[traced_test]
    fn test_defaults_replace_by_key() {
        let mut registry = Registry::new(catalog());
        registry
            .bind("Pool")
            .with_default("Connection", |builder| builder.to_factory("Pool", "nope").done())
            .with_default("Connection", |builder| builder.to_factory("Pool", "connect").with_method("connect", pool!["x"]).done())
            .done()
            .unwrap();

        let definitions = definitions(&mut registry);
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].default_keys().collect::<Vec<_>>(), ["Connection"]);
    }

    #[test]
    #[traced_test]
    fn test_invalid_tag() {
        let mut registry = Registry::new(catalog());
        assert!(matches!(
            registry.bind("Pool").with_tag("not a tag", 0).done(),
            Err(ConfigErrorKind::InvalidTag { name }) if name == "not a tag"
        ));
        assert!(!registry.is_bound("Pool"));
    }
}
