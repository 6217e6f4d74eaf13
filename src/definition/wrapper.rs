use alloc::{string::String, vec::Vec};

use super::{find_method, resolve_class, Defaults, Producer};
use crate::{descriptor::TypeDescriptor, errors::ConfigErrorKind, value::ArgumentPool};

/// Post-construction transformation of another binding.
///
/// The wrapping method receives the service produced so far as its only argument and returns the
/// service exposed from then on.
pub struct ServiceWrapper {
    target: String,
    wrapper: Producer,
    method: String,
    is_static: bool,
    priority: i64,
    pub(super) defaults: Defaults,
}

impl ServiceWrapper {
    /// Arguments declared for the wrapping method itself are ignored.
    ///
    /// # Errors
    /// - [`ConfigErrorKind::UnknownType`] for the target or the wrapper
    /// - [`ConfigErrorKind::UnknownMethod`] if the wrapper has no such method
    /// - [`ConfigErrorKind::Uninstantiable`] if the wrapper object is needed but can't be constructed
    /// - any planning error of the wrapper constructor or a call
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        descriptor: &dyn TypeDescriptor,
        target: impl Into<String>,
        wrapper: &str,
        method: impl Into<String>,
        priority: i64,
        constructor: ArgumentPool,
        methods: Vec<(String, ArgumentPool)>,
        defaults: Defaults,
        max_depth: usize,
    ) -> Result<Self, ConfigErrorKind> {
        let target = target.into();
        let method = method.into();
        resolve_class(descriptor, &target, false)?;

        let info = resolve_class(descriptor, wrapper, false)?;
        let wrapping = find_method(info, &method)?;
        let wrapper = Producer::new(info, wrapping, constructor, methods, max_depth)?;

        Ok(Self {
            is_static: wrapping.is_static(),
            target,
            wrapper,
            method,
            priority,
            defaults,
        })
    }

    /// Key the wrapper applies to
    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    #[must_use]
    pub const fn wrapper(&self) -> &Producer {
        &self.wrapper
    }

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

    #[inline]
    #[must_use]
    pub const fn priority(&self) -> i64 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::ServiceWrapper;
    use crate::{
        catalog::{ClassDescriptor, TypeCatalog},
        descriptor::Parameter,
        errors::ConfigErrorKind,
        pool,
        value::ArgumentPool,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        vec,
    };
    use tracing_test::traced_test;

    struct Decorator;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with_class(ClassDescriptor::interface("Handler"))
            .with_class(
                ClassDescriptor::new("Decorator")
                    .constructor(vec![Parameter::string("prefix")], |_| Ok(Decorator))
                    .method("wrap", vec![Parameter::class("inner", "Handler")], |_: &mut Decorator, args| args.instance()),
            )
            .with_class(ClassDescriptor::interface("Tracing").static_method(
                "wrap",
                vec![Parameter::class("inner", "Handler")],
                |args| args.instance(),
            ))
    }

    #[test]
    #[traced_test]
    fn test_wrapper() {
        let wrapper = ServiceWrapper::new(
            &catalog(),
            "Handler",
            "Decorator",
            "wrap",
            10,
            pool!["> "],
            vec![(String::from("wrap"), pool!["ignored"])],
            vec![],
            32,
        )
        .unwrap();

        assert_eq!(wrapper.target(), "Handler");
        assert_eq!(wrapper.priority(), 10);
        assert!(!wrapper.is_static());
        assert_eq!(wrapper.wrapper().ty(), "Decorator");
        assert_eq!(wrapper.wrapper().instance().map(|plan| plan.len()), Some(1));
        assert!(wrapper.wrapper().calls().is_empty());

        let wrapper = ServiceWrapper::new(&catalog(), "Handler", "Tracing", "wrap", 0, ArgumentPool::new(), vec![], vec![], 32).unwrap();
        assert!(wrapper.is_static());
        assert!(wrapper.wrapper().instance().is_none());
    }

    #[test]
    #[traced_test]
    fn test_validation() {
        assert!(matches!(
            ServiceWrapper::new(&catalog(), "Missing", "Tracing", "wrap", 0, ArgumentPool::new(), vec![], vec![], 32),
            Err(ConfigErrorKind::UnknownType { name }) if name == "Missing"
        ));
        assert!(matches!(
            ServiceWrapper::new(&catalog(), "Handler", "Decorator", "wrap", 0, ArgumentPool::new(), vec![], vec![], 32),
            Err(ConfigErrorKind::MissingParameter { parameter, .. }) if parameter == "prefix"
        ));
    }
}
