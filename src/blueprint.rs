use alloc::{collections::BTreeMap, format, string::String, vec, vec::Vec};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    bindings::{by_priority, BindingTable},
    config::Config,
    definition::{ConcreteService, Producer, ServiceFactory, ServiceWrapper},
    descriptor::{Argument, Arguments, Receiver, TypeDescriptor},
    errors::{InstantiateErrorKind, ResolveErrorKind},
    injector::Injector,
    plan::{MethodCall, ParameterPlan},
    source::ServiceSource,
    tag::Tag,
    utils::thread_safety::{AnyThreadSafety, Instance, Object, RcThreadSafety},
};

/// Consumer of converged definitions.
///
/// [`Blueprint`] turns them into an in-process injector; anything that renders definitions into
/// another form plugs in here too.
pub trait Compiler {
    fn concrete(&mut self, service: ConcreteService);
    fn factory(&mut self, service: ServiceFactory);
    fn wrapper(&mut self, wrapper: ServiceWrapper);
}

/// Object a factory or wrapper method is invoked on, built on first use.
struct Memo {
    producer: Producer,
    object: Mutex<Option<Object>>,
}

impl Memo {
    fn new(producer: Producer) -> Self {
        Self {
            producer,
            object: Mutex::new(None),
        }
    }

    fn invoke<F>(&self, injector: &Injector, method: &str, is_static: bool, arguments: F) -> Result<Instance, ResolveErrorKind>
    where
        F: FnOnce() -> Result<Arguments, ResolveErrorKind>,
    {
        let ty = self.producer.ty();
        let descriptor = injector.descriptor();

        let produced = match self.producer.instance() {
            Some(plan) => {
                self.ensure(injector, plan)?;
                let arguments = arguments()?;

                let mut object = self.object.lock();
                let receiver = match object.as_deref_mut() {
                    Some(object) if !is_static => Receiver::Object(object),
                    _ => Receiver::Static,
                };
                descriptor.invoke(ty, method, receiver, arguments)?
            }
            None => {
                run_calls(injector, ty, self.producer.calls(), None)?;
                descriptor.invoke(ty, method, Receiver::Static, arguments()?)?
            }
        };

        produced.ok_or_else(|| InstantiateErrorKind::NoReturn { owner: format!("{ty}::{method}") }.into())
    }

    fn ensure(&self, injector: &Injector, plan: &ParameterPlan) -> Result<(), ResolveErrorKind> {
        if self.object.lock().is_some() {
            return Ok(());
        }

        let ty = self.producer.ty();
        debug!(ty, "Building memoized object");
        let mut object = injector.descriptor().construct(ty, injector.arguments(plan)?)?;
        run_calls(injector, ty, self.producer.calls(), Some(&mut *object))?;

        let mut slot = self.object.lock();
        if slot.is_none() {
            *slot = Some(object);
        }
        Ok(())
    }
}

/// Runs the declared calls in order; static ones (and all of them without an object) on the type.
fn run_calls(injector: &Injector, ty: &str, calls: &[MethodCall], mut object: Option<&mut AnyThreadSafety>) -> Result<(), ResolveErrorKind> {
    for call in calls {
        let arguments = injector.arguments(call.plan())?;
        let receiver = match object.as_deref_mut() {
            Some(object) if !call.is_static() => Receiver::Object(object),
            _ => Receiver::Static,
        };

        debug!(ty, method = call.method(), "Calling");
        injector.descriptor().invoke(ty, call.method(), receiver, arguments)?;
    }
    Ok(())
}

enum Recipe {
    Concrete {
        implementation: String,
        constructor: ParameterPlan,
        calls: Vec<MethodCall>,
    },
    Factory {
        memo: Memo,
        method: String,
        is_static: bool,
        arguments: ParameterPlan,
    },
}

impl Recipe {
    fn produce(&self, injector: &Injector) -> Result<Instance, ResolveErrorKind> {
        match self {
            Recipe::Concrete {
                implementation,
                constructor,
                calls,
            } => {
                let mut object = injector.descriptor().construct(implementation, injector.arguments(constructor)?)?;
                run_calls(injector, implementation, calls, Some(&mut *object))?;
                Ok(RcThreadSafety::from(object))
            }
            Recipe::Factory {
                memo,
                method,
                is_static,
                arguments,
            } => memo.invoke(injector, method, *is_static, || injector.arguments(arguments)),
        }
    }
}

struct Stage {
    memo: Memo,
    method: String,
    is_static: bool,
}

impl Stage {
    fn apply(&self, injector: &Injector, service: Instance) -> Result<Instance, ResolveErrorKind> {
        debug!(wrapper = self.memo.producer.ty(), method = self.method.as_str(), "Wrapping");
        self.memo.invoke(injector, &self.method, self.is_static, || {
            Ok(Arguments::new(vec![Argument::Service(Some(service))]))
        })
    }
}

/// Executable form of the compiled definitions, consulted by the injector before autowiring.
pub struct CompiledServices {
    recipes: BTreeMap<String, Recipe>,
    wrappers: BTreeMap<String, Vec<Stage>>,
}

impl CompiledServices {
    #[inline]
    #[must_use]
    pub fn provides(&self, key: &str) -> bool {
        self.recipes.contains_key(key)
    }

    /// Number of wrappers applied to `key`
    #[inline]
    #[must_use]
    pub fn wrappers(&self, key: &str) -> usize {
        self.wrappers.get(key).map_or(0, Vec::len)
    }
}

impl ServiceSource for CompiledServices {
    fn service(&self, injector: &Injector, key: &str) -> Result<Option<Instance>, ResolveErrorKind> {
        match self.recipes.get(key) {
            Some(recipe) => recipe.produce(injector).map(Some),
            None => Ok(None),
        }
    }

    fn wrap(&self, injector: &Injector, key: &str, service: Instance) -> Result<Instance, ResolveErrorKind> {
        match self.wrappers.get(key) {
            Some(stages) => stages.iter().try_fold(service, |service, stage| stage.apply(injector, service)),
            None => Ok(service),
        }
    }
}

/// Compiles definitions for the runtime injector.
///
/// A later definition of a key replaces the recipe of an earlier one, while aliases and tag
/// memberships accumulate.
#[derive(Default)]
pub struct Blueprint {
    table: BindingTable,
    tags: BTreeMap<String, Vec<(i64, String)>>,
    recipes: BTreeMap<String, Recipe>,
    wrappers: BTreeMap<String, Vec<(i64, Stage)>>,
}

impl Blueprint {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, key: &str, prototype: bool, aliases: &[String], tags: &[Tag]) {
        self.table.set_prototype(key, prototype);
        for alias in aliases {
            self.table.insert_alias(alias, key);
        }
        for tag in tags {
            self.tags
                .entry(tag.name().into())
                .or_default()
                .push((tag.priority(), key.into()));
        }
    }

    /// Binding table and recipes, with tag groups and wrapper chains sorted by priority
    #[must_use]
    pub fn into_parts(self) -> (BindingTable, CompiledServices) {
        let Self {
            mut table,
            tags,
            recipes,
            wrappers,
        } = self;

        for (name, members) in tags {
            table = table.with_tag(name, members);
        }

        let mut chains: BTreeMap<String, Vec<(i64, Stage)>> = BTreeMap::new();
        for (target, stages) in wrappers {
            chains.entry(table.canonical(&target).into()).or_default().extend(stages);
        }
        let wrappers = chains
            .into_iter()
            .map(|(target, stages)| (target, by_priority(stages, |stage| String::from(stage.memo.producer.ty()))))
            .collect();

        (table, CompiledServices { recipes, wrappers })
    }

    #[must_use]
    pub fn into_injector(self, descriptor: RcThreadSafety<dyn TypeDescriptor>, config: Config) -> Injector {
        let (table, services) = self.into_parts();
        Injector::new(descriptor, table, services, config)
    }
}

impl Compiler for Blueprint {
    fn concrete(&mut self, service: ConcreteService) {
        debug!(key = service.key(), implementation = service.implementation(), "Compiling service");
        self.bind(service.key(), service.is_prototype(), service.aliases(), service.tags());
        self.recipes.insert(
            service.key().into(),
            Recipe::Concrete {
                implementation: service.implementation().into(),
                constructor: service.constructor().clone(),
                calls: service.calls().to_vec(),
            },
        );
    }

    fn factory(&mut self, service: ServiceFactory) {
        debug!(key = service.key(), factory = service.factory().ty(), "Compiling factory");
        self.bind(service.key(), service.is_prototype(), service.aliases(), service.tags());
        self.recipes.insert(
            service.key().into(),
            Recipe::Factory {
                memo: Memo::new(service.factory().clone()),
                method: service.method().into(),
                is_static: service.is_static(),
                arguments: service.arguments().clone(),
            },
        );
    }

    fn wrapper(&mut self, wrapper: ServiceWrapper) {
        debug!(key = wrapper.target(), wrapper = wrapper.wrapper().ty(), "Compiling wrapper");
        self.wrappers.entry(wrapper.target().into()).or_default().push((
            wrapper.priority(),
            Stage {
                memo: Memo::new(wrapper.wrapper().clone()),
                method: wrapper.method().into(),
                is_static: wrapper.is_static(),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::Blueprint;
    use crate::{
        catalog::{ClassDescriptor, TypeCatalog},
        descriptor::{instance, Parameter},
        errors::{InstantiateErrorKind, ResolveErrorKind},
        pool,
        registry::Registry,
        utils::thread_safety::RcThreadSafety,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        vec,
    };
    use core::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    static POOLS: AtomicUsize = AtomicUsize::new(0);
    static PREPARED: AtomicUsize = AtomicUsize::new(0);

    struct Pool {
        limit: i64,
    }

    struct Connection {
        limit: i64,
    }

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with_class(ClassDescriptor::interface("Connection"))
            .with_class(ClassDescriptor::interface("Handle"))
            .with_class(
                ClassDescriptor::new("Pool")
                    .constructor(vec![], |_| {
                        POOLS.fetch_add(1, Ordering::SeqCst);
                        Ok(Pool { limit: 0 })
                    })
                    .method("limit", vec![Parameter::int("max")], |pool: &mut Pool, args| {
                        pool.limit = args.int()?;
                        Ok(None)
                    })
                    .method("connect", vec![], |pool: &mut Pool, _| Ok(Some(instance(Connection { limit: pool.limit })))),
            )
            .with_class(
                ClassDescriptor::new("Closer")
                    .constructor(vec![], |_| Ok(0_u8))
                    .method("close", vec![], |_: &mut u8, _| Ok(None)),
            )
            .with_class(
                ClassDescriptor::interface("Connector")
                    .static_method("prepare", vec![], |_| {
                        PREPARED.fetch_add(1, Ordering::SeqCst);
                        Ok(None)
                    })
                    .static_method("open", vec![Parameter::int("limit")], |args| {
                        Ok(Some(instance(Connection { limit: args.int()? })))
                    }),
            )
    }

    #[test]
    #[traced_test]
    fn test_factory_memoization() {
        let mut registry = Registry::new(catalog());
        registry
            .bind("Connection")
            .to_factory("Pool", "connect")
            .with_method("limit", pool![8])
            .as_prototype()
            .done()
            .unwrap();
        let injector = registry.build().unwrap();

        let first = injector.fetch_as::<Connection>("Connection").unwrap();
        let second = injector.fetch_as::<Connection>("Connection").unwrap();
        assert!(!RcThreadSafety::ptr_eq(&first, &second));
        assert_eq!(first.limit, 8);
        assert_eq!(POOLS.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Building memoized object"));
    }

    #[test]
    #[traced_test]
    fn test_static_factory() {
        let mut registry = Registry::new(catalog());
        registry
            .bind("Connection")
            .to_factory("Connector", "open")
            .with_method("prepare", pool![])
            .with_method("open", pool![limit = 3])
            .as_prototype()
            .done()
            .unwrap();
        let injector = registry.build().unwrap();

        assert_eq!(injector.fetch_as::<Connection>("Connection").unwrap().limit, 3);
        injector.fetch("Connection", true).unwrap();
        assert_eq!(PREPARED.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_no_return() {
        let mut registry = Registry::new(catalog());
        registry.bind("Handle").to_factory("Closer", "close").done().unwrap();
        let injector = registry.build().unwrap();

        assert!(matches!(
            injector.fetch("Handle", true),
            Err(ResolveErrorKind::Instantiate(InstantiateErrorKind::NoReturn { owner })) if owner == "Closer::close"
        ));
    }

    #[test]
    #[traced_test]
    fn test_parts() {
        let mut registry = Registry::new(catalog());
        registry.bind("Connection").to_factory("Connector", "open").with_method("open", pool![1]).with_tag("db", 0).done().unwrap();
        registry.bind("Connection").to_wrapper("Pool", "connect", 0).done().unwrap();

        let (table, services) = registry.compile(Blueprint::new()).unwrap().into_parts();
        assert_eq!(table.tagged("db"), ["Connection"]);
        assert!(services.provides("Connection"));
        assert_eq!(services.wrappers("Connection"), 1);
        assert!(!services.provides("Pool"));
    }
}
