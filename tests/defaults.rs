use bindery::{
    instance, pool, ArgumentSource, ClassDescriptor, Compiler, ConcreteService, Config, ConfigErrorKind, Definition, Parameter, Registry,
    ServiceFactory, ServiceWrapper, TypeCatalog, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Mailer {
    transport: String,
}

struct Newsletter {
    mailer: bindery::utils::thread_safety::RcThreadSafety<Mailer>,
}

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with_class(ClassDescriptor::interface("Transport"))
        .with_class(ClassDescriptor::new("Smtp").implements("Transport").constructor(vec![], |_| Ok(String::from("smtp"))))
        .with_class(ClassDescriptor::new("Sendmail").implements("Transport").constructor(vec![], |_| Ok(String::from("sendmail"))))
        .with_class(
            ClassDescriptor::new("Mailer")
                .constructor(vec![Parameter::class("transport", "Transport")], |args| {
                    let transport = args.service::<String>()?;
                    Ok(Mailer {
                        transport: (*transport).clone(),
                    })
                })
                .static_method("count", vec![Parameter::int("values").variadic()], |args| {
                    Ok(Some(instance(args.rest_values()?.len())))
                }),
        )
        .with_class(
            ClassDescriptor::new("Newsletter")
                .constructor(vec![Parameter::class("mailer", "Mailer")], |args| Ok(Newsletter { mailer: args.service()? })),
        )
}

#[derive(Default)]
struct Plans(Vec<(String, Vec<ArgumentSource>)>);

impl Compiler for Plans {
    fn concrete(&mut self, service: ConcreteService) {
        self.0.push((service.key().into(), service.constructor().sources().to_vec()));
    }

    fn factory(&mut self, service: ServiceFactory) {
        self.0.push((service.key().into(), service.arguments().sources().to_vec()));
    }

    fn wrapper(&mut self, wrapper: ServiceWrapper) {
        self.0.push((wrapper.target().into(), Vec::new()));
    }
}

#[test]
fn test_defaults_fill_missing_bindings() {
    let mut registry = Registry::new(catalog());
    registry
        .bind("Newsletter")
        .with_default("Mailer", |builder| {
            builder
                .with_default("Transport", |builder| builder.to("Sendmail").done())
                .done()
        })
        .done()
        .unwrap();

    let injector = registry.build().unwrap();
    let newsletter = injector.fetch_as::<Newsletter>("Newsletter").unwrap();
    assert_eq!(newsletter.mailer.transport, "sendmail");
}

#[test]
fn test_explicit_binding_wins() {
    let mut registry = Registry::new(catalog());
    registry
        .bind("Mailer")
        .with_default("Transport", |builder| builder.to("Sendmail").done())
        .done()
        .unwrap();
    registry.bind("Transport").to("Smtp").done().unwrap();

    let injector = registry.build().unwrap();
    assert_eq!(injector.fetch_as::<Mailer>("Mailer").unwrap().transport, "smtp");
}

#[test]
fn test_alias_counts_as_binding() {
    static PROVIDED: AtomicUsize = AtomicUsize::new(0);

    let mut registry = Registry::new(catalog());
    registry.bind("Smtp").with_alias("Transport").done().unwrap();
    registry
        .bind("Mailer")
        .with_default("Transport", |builder| {
            PROVIDED.fetch_add(1, Ordering::SeqCst);
            builder.to("Sendmail").done()
        })
        .done()
        .unwrap();
    assert!(registry.is_bound("Transport"));

    let injector = registry.build().unwrap();
    assert_eq!(PROVIDED.load(Ordering::SeqCst), 0);
    assert_eq!(injector.fetch_as::<Mailer>("Mailer").unwrap().transport, "smtp");
}

#[test]
fn test_every_definition_forwarded_once() {
    let mut registry = Registry::new(catalog());
    registry
        .bind("Newsletter")
        .with_default("Mailer", |builder| builder.done())
        .done()
        .unwrap();
    registry
        .bind("Mailer")
        .with_default("Transport", |builder| builder.to("Smtp").with_alias("Smtp").done())
        .done()
        .unwrap();

    let plans = registry.compile(Plans::default()).unwrap();
    let keys = plans.0.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, ["Newsletter", "Mailer", "Transport"]);
    assert_eq!(
        plans.0[0].1,
        [ArgumentSource::FromService {
            ty: String::from("Mailer"),
            required: true,
        }]
    );

    assert!(registry.compile(Plans::default()).unwrap().0.is_empty());
}

#[test]
fn test_self_alias_is_noop() {
    let mut registry = Registry::new(catalog());
    registry.bind("Smtp").with_alias("Smtp").with_alias("Transport").done().unwrap();

    let plans = registry.compile(Plans::default()).unwrap();
    assert_eq!(plans.0.len(), 1);

    let mut registry = Registry::new(catalog());
    registry.bind("Smtp").with_alias("Smtp").done().unwrap();
    let definitions = registry_definitions(&mut registry);
    assert!(definitions.iter().all(|definition| definition.aliases().is_empty()));
}

fn registry_definitions(registry: &mut Registry) -> Vec<Definition> {
    #[derive(Default)]
    struct Collect(Vec<Definition>);

    impl Compiler for Collect {
        fn concrete(&mut self, service: ConcreteService) {
            self.0.push(service.into());
        }

        fn factory(&mut self, service: ServiceFactory) {
            self.0.push(service.into());
        }

        fn wrapper(&mut self, wrapper: ServiceWrapper) {
            self.0.push(wrapper.into());
        }
    }

    registry.compile(Collect::default()).unwrap().0
}

#[test]
fn test_missing_binding() {
    let mut registry = Registry::new(catalog());
    registry
        .bind("Mailer")
        .with_default("Transport", |builder| {
            let _ = builder.to("Smtp");
            Ok(())
        })
        .done()
        .unwrap();

    assert!(matches!(
        registry.build(),
        Err(ConfigErrorKind::MissingBinding { key }) if key == "Transport"
    ));
}

#[test]
fn test_round_limit() {
    let mut registry = Registry::new_with_config(catalog(), Config { max_rounds: 1, ..Config::default() });
    registry
        .bind("Newsletter")
        .with_default("Mailer", |builder| builder.done())
        .done()
        .unwrap();

    assert!(matches!(
        registry.compile(Plans::default()),
        Err(ConfigErrorKind::TooManyRounds { limit: 1 })
    ));
    assert!(!registry.is_bound("Newsletter"));
}

#[test]
fn test_call_method() {
    let injector = Registry::new(catalog()).build().unwrap();

    let count = injector.call_method("Mailer", "count", pool![1, 2, vec![3, 4, 5]]).unwrap().unwrap();
    assert_eq!(count.downcast_ref::<usize>(), Some(&5));

    let empty = injector.call_method("Mailer", "count", pool![]).unwrap().unwrap();
    assert_eq!(empty.downcast_ref::<usize>(), Some(&0));
}

#[test]
fn test_literal_limits() {
    let mut registry = Registry::new_with_config(catalog(), Config { max_depth: 2, ..Config::default() });
    let nested = Value::List(vec![Value::List(vec![Value::from(1)])]);

    assert!(matches!(
        registry.bind("Mailer").with_method("count", vec![nested]).done(),
        Err(ConfigErrorKind::TooDeep { parameter, .. }) if parameter == "values"
    ));
}
