use alloc::{boxed::Box, format, string::String, vec::Vec};
use core::{any::type_name, fmt, panic::Location};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, debug_span, error, info_span};

use crate::{
    bindings::BindingTable,
    cache::{Cache, Signature},
    config::Config,
    context::ResolutionContext,
    descriptor::{instance, Argument, Arguments, MethodInfo, Parameter, Receiver, TypeDescriptor},
    errors::{ConfigErrorKind, InstantiateErrorKind, ResolveErrorKind},
    plan::{plan_constructor, resolve_parameters, ArgumentSource, ParameterPlan},
    source::{Autowire, ServiceSource},
    utils::thread_safety::{downcast, Instance, RcThreadSafety, SendSafety, SyncSafety},
    value::ArgumentPool,
};

/// What [`Injector::get`] found under a key.
#[derive(Clone)]
pub enum Found {
    Service(Instance),
    Tagged(RcThreadSafety<Vec<Instance>>),
}

impl fmt::Debug for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::Service(_) => f.write_str("Service(..)"),
            Found::Tagged(group) => f.debug_tuple("Tagged").field(&group.len()).finish(),
        }
    }
}

/// Function invocable through [`Injector::call`], together with its signature.
///
/// The identity a signature is cached under is the place the callable was created at, or an
/// explicit name.
pub struct Callable<F> {
    id: String,
    parameters: Vec<Parameter>,
    function: F,
}

impl<F> Callable<F> {
    #[track_caller]
    #[must_use]
    pub fn new(parameters: Vec<Parameter>, function: F) -> Self {
        let location = Location::caller();
        Self {
            id: format!("{}({}:{})", location.file(), location.line(), location.column()),
            parameters,
            function,
        }
    }

    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>, parameters: Vec<Parameter>, function: F) -> Self {
        Self {
            id: name.into(),
            parameters,
            function,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

struct State {
    context: ResolutionContext,
    cache: Cache,
}

struct InjectorInner {
    entry: ReentrantMutex<()>,
    state: Mutex<State>,
    table: BindingTable,
    source: Box<dyn ServiceSource>,
    descriptor: RcThreadSafety<dyn TypeDescriptor>,
    config: Config,
}

/// Resolves services on demand.
///
/// Instances are cached by canonical key for the injector's lifetime, except for prototypes.
/// Clones share all state. Every public method holds a reentrant lock for the whole resolution,
/// nested fetches included, so one injector can be shared between threads.
#[derive(Clone)]
pub struct Injector {
    inner: RcThreadSafety<InjectorInner>,
}

impl Injector {
    /// Name the injector resolves to itself under
    pub const KEY: &'static str = "bindery::Injector";

    #[must_use]
    pub fn new(descriptor: RcThreadSafety<dyn TypeDescriptor>, table: BindingTable, source: impl ServiceSource + 'static, config: Config) -> Self {
        Self {
            inner: RcThreadSafety::new(InjectorInner {
                entry: ReentrantMutex::new(()),
                state: Mutex::new(State {
                    context: ResolutionContext::new(),
                    cache: Cache::new(),
                }),
                table,
                source: Box::new(source),
                descriptor,
                config,
            }),
        }
    }

    /// Injector without any bindings, autowiring everything
    #[inline]
    #[must_use]
    pub fn autowire(descriptor: impl TypeDescriptor + 'static) -> Self {
        Self::new(RcThreadSafety::new(descriptor), BindingTable::new(), Autowire, Config::default())
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &dyn TypeDescriptor {
        &*self.inner.descriptor
    }

    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &BindingTable {
        &self.inner.table
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl Injector {
    /// Resolves `key` (an alias or a canonical key).
    ///
    /// An optional fetch returns `None` when the service isn't available instead of failing.
    ///
    /// On failure the resolution stack is cut back to the depth this call started at, and the
    /// outermost fetch clears it entirely. While the error propagates every frame does the same,
    /// so nothing of the failed graph stays on the stack. A [`ServiceSource`] that catches a
    /// nested error keeps its own frames and can go on resolving.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NotFound`] and [`ResolveErrorKind::NotInstantiable`] if the service isn't available (required only)
    /// - [`ResolveErrorKind::DependencyCycle`] if `key` is already under construction
    /// - any failure while building the service or its dependencies
    pub fn fetch(&self, key: &str, required: bool) -> Result<Option<Instance>, ResolveErrorKind> {
        let _entry = self.inner.entry.lock();
        let span = debug_span!("fetch", key, required);
        let _guard = span.enter();

        let canonical = self.inner.table.canonical(key);

        let cached = self.inner.state.lock().cache.resolved(canonical);
        if let Some(service) = cached {
            debug!("Found in cache");
            return Ok(Some(service));
        }
        debug!("Not found in cache");

        if self.inner.table.is_capability(canonical) {
            debug!("Injector capability");
            return Ok(Some(instance(self.clone())));
        }

        let depth = self.inner.state.lock().context.depth();
        match self.resolve(canonical) {
            Ok(service) => Ok(Some(service)),
            Err(err) if !required && err.is_not_found() => {
                debug!(%err, "Optional service unavailable");
                self.inner.state.lock().context.restore(depth);
                Ok(None)
            }
            Err(err) => {
                let mut state = self.inner.state.lock();
                if depth == 0 {
                    state.context.unwind_all();
                    error!("{}", err);
                } else {
                    state.context.restore(depth);
                    debug!(%err, "Nested resolution failed");
                }
                Err(err)
            }
        }
    }

    fn resolve(&self, key: &str) -> Result<Instance, ResolveErrorKind> {
        self.inner.state.lock().context.capture(key)?;

        let service = match self.inner.source.service(self, key)? {
            Some(service) => service,
            None => self.reflect(key)?,
        };
        let service = self.inner.source.wrap(self, key, service)?;

        let mut state = self.inner.state.lock();
        let service = if self.inner.table.is_prototype(key) {
            debug!("Prototype, not cached");
            service
        } else {
            debug!("Cached");
            state.cache.insert_resolved(key, service)
        };
        state.context.release();

        Ok(service)
    }

    fn reflect(&self, key: &str) -> Result<Instance, ResolveErrorKind> {
        let descriptor = self.descriptor();
        let info = descriptor.describe(key).ok_or_else(|| ResolveErrorKind::NotFound { key: key.into() })?;
        if !info.is_instantiable() {
            return Err(ResolveErrorKind::NotInstantiable { key: key.into() });
        }
        debug!("Autowiring");

        let plan = plan_constructor(info.name(), info.constructor(), &mut ArgumentPool::new(), self.inner.config.max_depth)?;
        let object = descriptor.construct(key, self.arguments(&plan)?)?;
        Ok(RcThreadSafety::from(object))
    }

    /// Required fetch, downcast to `T`
    ///
    /// # Errors
    /// - [`ResolveErrorKind::IncorrectType`] if the service isn't a `T`
    /// - see [`Self::fetch`]
    pub fn fetch_as<T: SendSafety + SyncSafety + 'static>(&self, key: &str) -> Result<RcThreadSafety<T>, ResolveErrorKind> {
        downcast::<T>(self.service(key)?).map_err(|_| {
            let err = ResolveErrorKind::IncorrectType {
                key: key.into(),
                expected: type_name::<T>(),
            };
            error!("{}", err);
            err
        })
    }

    fn service(&self, key: &str) -> Result<Instance, ResolveErrorKind> {
        self.fetch(key, true)?.ok_or_else(|| ResolveErrorKind::NotFound { key: key.into() })
    }

    /// Services of a tag group, highest priority first. Resolved once, an unknown tag is an empty group.
    ///
    /// # Errors
    /// Any failure of fetching a member
    pub fn tagged(&self, tag: &str) -> Result<RcThreadSafety<Vec<Instance>>, ResolveErrorKind> {
        let _entry = self.inner.entry.lock();
        let span = debug_span!("tagged", tag);
        let _guard = span.enter();

        let cached = self.inner.state.lock().cache.tagged(tag);
        if let Some(group) = cached {
            debug!("Found in cache");
            return Ok(group);
        }

        let group = self
            .inner
            .table
            .tagged(tag)
            .iter()
            .map(|key| self.service(key))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(members = group.len(), "Cached");

        Ok(self.inner.state.lock().cache.insert_tagged(tag, RcThreadSafety::new(group)))
    }

    /// Key that asked for the service being resolved, `None` outside of resolution
    #[must_use]
    pub fn context(&self) -> Option<String> {
        let _entry = self.inner.entry.lock();
        self.inner.state.lock().context.consumer().map(String::from)
    }

    /// `true` if `key` resolves to a service or a non-empty tag group. Never fails.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        match self.fetch(key, false) {
            Ok(Some(_)) => true,
            Ok(None) => self.tagged(key).is_ok_and(|group| !group.is_empty()),
            Err(_) => false,
        }
    }

    /// Service under `key`, falling back to the tag group of that name.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NotFound`] if there's neither
    /// - any other failure while resolving
    pub fn get(&self, key: &str) -> Result<Found, ResolveErrorKind> {
        let span = info_span!("get", key);
        let _guard = span.enter();

        let found = self.fetch(key, false).and_then(|service| match service {
            Some(service) => Ok(Some(Found::Service(service))),
            None => self
                .tagged(key)
                .map(|group| if group.is_empty() { None } else { Some(Found::Tagged(group)) }),
        });

        match found {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(ResolveErrorKind::NotFound { key: key.into() }),
            Err(err) if err.is_not_found() => Err(ResolveErrorKind::NotFound { key: key.into() }),
            Err(err) => Err(err),
        }
    }

    /// Invokes `callable` with its parameters resolved against fresh user arguments.
    ///
    /// The signature is analysed on the first call of a callable identity only.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::UnresolvedParameter`] if a parameter can't be satisfied
    /// - any failure of fetching a service argument or of the callable itself
    pub fn call<R, F>(&self, callable: &Callable<F>, arguments: ArgumentPool) -> Result<R, ResolveErrorKind>
    where
        F: Fn(&mut Arguments) -> Result<R, InstantiateErrorKind>,
    {
        let _entry = self.inner.entry.lock();
        let span = info_span!("call", callable = callable.id());
        let _guard = span.enter();

        let signature = self.signature(callable.id(), || {
            Ok(Signature {
                owner: callable.id().into(),
                method: MethodInfo::new(callable.id(), callable.parameters.clone()),
            })
        })?;

        let mut arguments = self.bind(&signature, arguments)?;
        (callable.function)(&mut arguments).map_err(|err| {
            let err = ResolveErrorKind::from(err);
            error!("{}", err);
            err
        })
    }

    /// Invokes a static `method` of type `ty` described by the type descriptor.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NotFound`] for an unknown type
    /// - [`ResolveErrorKind::Config`] for an unknown or hidden method
    /// - see [`Self::call`]
    pub fn call_method(&self, ty: &str, method: &str, arguments: ArgumentPool) -> Result<Option<Instance>, ResolveErrorKind> {
        let _entry = self.inner.entry.lock();
        let id = format!("{ty}::{method}");
        let span = info_span!("call_method", method = id.as_str());
        let _guard = span.enter();

        let signature = self.signature(&id, || {
            let info = self.descriptor().describe(ty).ok_or_else(|| ResolveErrorKind::NotFound { key: ty.into() })?;
            let method = info.method(method).ok_or_else(|| ConfigErrorKind::UnknownMethod {
                ty: ty.into(),
                method: method.into(),
            })?;
            if !method.is_public() {
                return Err(ConfigErrorKind::NotPublic { owner: id.clone() }.into());
            }
            Ok(Signature {
                owner: id.clone(),
                method: method.clone(),
            })
        })?;

        let arguments = self.bind(&signature, arguments)?;
        self.descriptor()
            .invoke(ty, method, Receiver::Static, arguments)
            .map_err(|err| {
                let err = ResolveErrorKind::from(err);
                error!("{}", err);
                err
            })
    }

    fn signature(&self, id: &str, analyse: impl FnOnce() -> Result<Signature, ResolveErrorKind>) -> Result<RcThreadSafety<Signature>, ResolveErrorKind> {
        let cached = self.inner.state.lock().cache.signature(id);
        if let Some(signature) = cached {
            debug!("Signature found in cache");
            return Ok(signature);
        }

        let signature = analyse().map_err(|err| {
            error!("{}", err);
            err
        })?;
        Ok(self.inner.state.lock().cache.insert_signature(id, signature))
    }

    fn bind(&self, signature: &Signature, mut pool: ArgumentPool) -> Result<Arguments, ResolveErrorKind> {
        let plan = resolve_parameters(&signature.owner, signature.method.parameters(), &mut pool, self.inner.config.max_depth)
            .map_err(|err| {
                let err = ResolveErrorKind::from(err);
                error!("{}", err);
                err
            })?;
        self.arguments(&plan)
    }

    /// Evaluates a plan: fetches services and tag groups, clones literals.
    ///
    /// # Errors
    /// Any failure of fetching a service or a tag group
    pub fn arguments(&self, plan: &ParameterPlan) -> Result<Arguments, ResolveErrorKind> {
        let mut arguments = Vec::with_capacity(plan.len());
        for source in plan {
            arguments.push(match source {
                ArgumentSource::FromService { ty, required } => Argument::Service(self.fetch(ty, *required)?),
                ArgumentSource::FromLiteral(value) | ArgumentSource::FromDefault(value) => Argument::Value(value.clone()),
                ArgumentSource::FromVariadicTag(tag) => Argument::Tagged(self.tagged(tag)?),
            });
        }
        Ok(Arguments::new(arguments))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{Callable, Found, Injector};
    use crate::{
        bindings::BindingTable,
        catalog::{ClassDescriptor, TypeCatalog},
        config::Config,
        descriptor::{instance, Parameter},
        errors::{ConfigErrorKind, InstantiateErrorKind, ResolveErrorKind},
        pool,
        utils::thread_safety::{Instance, RcThreadSafety},
        value::ArgumentPool,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        vec,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    struct Settings(String);
    struct Service(RcThreadSafety<Settings>);
    struct Consumer(Option<String>);
    struct Optional(Option<RcThreadSafety<Missing>>);
    struct Missing;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with_class(
                ClassDescriptor::new("Config")
                    .constructor(vec![Parameter::string("name").with_default("default")], |args| Ok(Settings(args.string()?))),
            )
            .with_class(
                ClassDescriptor::new("Service")
                    .constructor(vec![Parameter::class("config", "Config")], |args| Ok(Service(args.service()?))),
            )
            .with_class(ClassDescriptor::interface("Missing"))
            .with_class(
                ClassDescriptor::new("Optional")
                    .constructor(vec![Parameter::class("missing", "Missing").nullable()], |args| {
                        Ok(Optional(args.optional_service()?))
                    }),
            )
            .with_class(
                ClassDescriptor::new("Needy").constructor(vec![Parameter::int("count")], |args| Ok(args.int()?)),
            )
            .with_class(
                ClassDescriptor::new("Math")
                    .static_method("sum", vec![Parameter::int("values").variadic()], |args| {
                        let sum = args
                            .rest_values()?
                            .iter()
                            .map(|value| value.as_int().unwrap_or_default())
                            .sum::<i64>();
                        Ok(Some(instance(sum)))
                    })
                    .method("hidden", vec![], |_: &mut u8, _| Ok(None)),
            )
    }

    fn shared(descriptor: TypeCatalog) -> RcThreadSafety<dyn crate::descriptor::TypeDescriptor> {
        RcThreadSafety::new(descriptor)
    }

    #[test]
    #[traced_test]
    fn test_autowire_and_cache() {
        let injector = Injector::autowire(catalog());

        let service = injector.fetch_as::<Service>("Service").unwrap();
        let config = injector.fetch_as::<Settings>("Config").unwrap();

        assert!(RcThreadSafety::ptr_eq(&service.0, &config));
        assert_eq!(config.0, "default");
        assert!(RcThreadSafety::ptr_eq(&service, &injector.fetch_as::<Service>("Service").unwrap()));
        assert!(logs_contain("Found in cache"));
    }

    #[test]
    #[traced_test]
    fn test_prototypes_and_aliases() {
        let injector = Injector::new(
            shared(catalog()),
            BindingTable::new().with_prototype("Config").with_alias("settings", "Config"),
            crate::source::Autowire,
            Config::default(),
        );

        let first = injector.fetch("Config", true).unwrap().unwrap();
        let second = injector.fetch("settings", true).unwrap().unwrap();
        assert!(!RcThreadSafety::ptr_eq(&first, &second));
        assert!(logs_contain("Prototype, not cached"));
    }

    #[test]
    #[traced_test]
    fn test_not_found() {
        let injector = Injector::autowire(catalog());

        assert!(injector.fetch("Unknown", false).unwrap().is_none());
        assert!(matches!(
            injector.fetch("Unknown", true),
            Err(ResolveErrorKind::NotFound { key }) if key == "Unknown"
        ));
        assert!(matches!(
            injector.fetch("Missing", true),
            Err(ResolveErrorKind::NotInstantiable { key }) if key == "Missing"
        ));

        let optional = injector.fetch_as::<Optional>("Optional").unwrap();
        assert!(optional.0.is_none());
        assert!(injector.context().is_none());

        assert!(matches!(
            injector.fetch("Needy", false),
            Err(ResolveErrorKind::UnresolvedParameter { parameter, owner }) if parameter == "count" && owner == "Needy::__construct"
        ));
        assert!(matches!(
            injector.fetch_as::<Service>("Config"),
            Err(ResolveErrorKind::IncorrectType { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_capabilities() {
        let injector = Injector::new(
            shared(catalog()),
            BindingTable::new().with_capability("Container"),
            crate::source::Autowire,
            Config::default(),
        );

        let me = injector.fetch_as::<Injector>(Injector::KEY).unwrap();
        assert!(RcThreadSafety::ptr_eq(&me.inner, &injector.inner));
        assert!(injector.fetch_as::<Injector>("Container").is_ok());
    }

    #[test]
    #[traced_test]
    fn test_source_and_context() {
        let calls = RcThreadSafety::new(AtomicU8::new(0));
        let counter = calls.clone();
        let source = move |injector: &Injector, key: &str| -> Result<Option<Instance>, ResolveErrorKind> {
            if key != "Consumer" {
                return Ok(None);
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(instance(Consumer(injector.context()))))
        };
        let injector = Injector::new(shared(catalog()), BindingTable::new(), source, Config::default());

        let consumer = injector.fetch_as::<Consumer>("Consumer").unwrap();
        assert_eq!(consumer.0.as_deref(), Some("Consumer"));
        injector.fetch("Consumer", true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_nested_failure_keeps_outer_frames() {
        let source = |injector: &Injector, key: &str| -> Result<Option<Instance>, ResolveErrorKind> {
            if key != "Consumer" {
                return Ok(None);
            }
            assert!(injector.fetch("Needy", true).is_err());
            Ok(Some(instance(Consumer(injector.context()))))
        };
        let injector = Injector::new(shared(catalog()), BindingTable::new(), source, Config::default());

        let consumer = injector.fetch_as::<Consumer>("Consumer").unwrap();
        assert_eq!(consumer.0.as_deref(), Some("Consumer"));
        assert!(injector.context().is_none());
        assert!(logs_contain("Nested resolution failed"));
    }

    #[test]
    #[traced_test]
    fn test_call() {
        let injector = Injector::autowire(catalog());
        let callable = Callable::new(
            vec![Parameter::class("config", "Config"), Parameter::string("greeting")],
            |args: &mut crate::descriptor::Arguments| -> Result<String, InstantiateErrorKind> {
                let config = args.service::<Settings>()?;
                Ok(format!("{} {}", args.string()?, config.0))
            },
        );

        assert_eq!(injector.call(&callable, pool!["hello"]).unwrap(), "hello default");
        assert_eq!(injector.call(&callable, pool![greeting = "hi"]).unwrap(), "hi default");
        assert!(logs_contain("Signature found in cache"));
        assert!(matches!(
            injector.call(&callable, ArgumentPool::new()),
            Err(ResolveErrorKind::UnresolvedParameter { parameter, .. }) if parameter == "greeting"
        ));

        let named = Callable::named("fails", vec![], |_: &mut crate::descriptor::Arguments| -> Result<(), InstantiateErrorKind> {
            Err(anyhow::anyhow!("boom").into())
        });
        assert_eq!(injector.call(&named, ArgumentPool::new()).unwrap_err().to_string(), "boom");
    }

    #[test]
    #[traced_test]
    fn test_call_method() {
        let injector = Injector::autowire(catalog());

        let sum = injector.call_method("Math", "sum", pool![1, 2, vec![3, 4]]).unwrap().unwrap();
        assert_eq!(sum.downcast_ref::<i64>(), Some(&10));

        assert!(matches!(
            injector.call_method("Math", "nope", ArgumentPool::new()),
            Err(ResolveErrorKind::Config(ConfigErrorKind::UnknownMethod { .. }))
        ));
        assert!(matches!(
            injector.call_method("Nope", "sum", ArgumentPool::new()),
            Err(ResolveErrorKind::NotFound { .. })
        ));
        assert!(matches!(
            injector.call_method("Math", "hidden", ArgumentPool::new()),
            Err(ResolveErrorKind::Instantiate(InstantiateErrorKind::NoReceiver { .. }))
        ));
    }

    #[test]
    #[traced_test]
    fn test_has_and_get() {
        let injector = Injector::new(
            shared(catalog()),
            BindingTable::new().with_tag("configs", vec![(0, String::from("Config"))]),
            crate::source::Autowire,
            Config::default(),
        );

        assert!(injector.has("Config"));
        assert!(injector.has("configs"));
        assert!(!injector.has("Unknown"));
        assert!(!injector.has("Needy"));

        assert!(matches!(injector.get("Config"), Ok(Found::Service(_))));
        assert!(matches!(injector.get("configs"), Ok(Found::Tagged(group)) if group.len() == 1));
        assert!(matches!(
            injector.get("Unknown"),
            Err(ResolveErrorKind::NotFound { key }) if key == "Unknown"
        ));
        assert!(matches!(injector.get("Needy"), Err(ResolveErrorKind::UnresolvedParameter { .. })));
    }
}
