#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod bindings;
pub(crate) mod blueprint;
pub(crate) mod builder;
pub(crate) mod cache;
pub(crate) mod catalog;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod definition;
pub(crate) mod descriptor;
pub(crate) mod errors;
pub(crate) mod injector;
pub(crate) mod plan;
pub(crate) mod registry;
pub(crate) mod source;
pub(crate) mod tag;
pub(crate) mod value;

pub mod utils;

pub use bindings::BindingTable;
pub use blueprint::{Blueprint, CompiledServices, Compiler};
pub use builder::DefinitionBuilder;
pub use catalog::{ClassDescriptor, TypeCatalog};
pub use config::Config;
pub use definition::{ConcreteService, DefaultProvider, Defaults, Definition, Producer, ServiceFactory, ServiceWrapper};
pub use descriptor::{instance, Argument, Arguments, MethodInfo, ParamType, Parameter, Receiver, TypeDescriptor, TypeInfo};
pub use errors::{ConfigErrorKind, InstantiateErrorKind, ResolveErrorKind};
pub use injector::{Callable, Found, Injector};
pub use plan::{plan_constructor, plan_method, resolve_parameters, ArgumentSource, MethodCall, ParameterPlan};
pub use registry::Registry;
pub use source::{Autowire, ServiceSource};
pub use tag::{is_identifier, Tag};
pub use value::{ArgumentPool, Kind, Value};
