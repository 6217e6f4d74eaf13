use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    format,
    string::String,
    vec::Vec,
};

use crate::{
    descriptor::{Arguments, MethodInfo, Parameter, Receiver, TypeDescriptor, TypeInfo},
    errors::InstantiateErrorKind,
    utils::thread_safety::{Instance, Object, SendSafety, SyncSafety},
};

const CONSTRUCTOR: &str = "__construct";

type ConstructFn = Box<dyn Fn(&mut Arguments) -> Result<Object, InstantiateErrorKind> + Send + Sync>;
type InvokeFn = Box<dyn Fn(Receiver<'_>, &mut Arguments) -> Result<Option<Instance>, InstantiateErrorKind> + Send + Sync>;

#[inline]
fn boxed_construct<F>(construct: F) -> ConstructFn
where
    F: Fn(&mut Arguments) -> Result<Object, InstantiateErrorKind> + Send + Sync + 'static,
{
    Box::new(construct)
}

#[inline]
fn boxed_invoke<F>(invoke: F) -> InvokeFn
where
    F: Fn(Receiver<'_>, &mut Arguments) -> Result<Option<Instance>, InstantiateErrorKind> + Send + Sync + 'static,
{
    Box::new(invoke)
}

/// Description of one type for a [`TypeCatalog`]: its ancestors, how to construct it and which
/// methods can be invoked on it.
///
/// # Examples
/// ```rust
/// use bindery::{ClassDescriptor, Parameter, TypeCatalog};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// let catalog = TypeCatalog::new()
///     .with_class(ClassDescriptor::interface("Greeting"))
///     .with_class(
///         ClassDescriptor::new("Greeter")
///             .implements("Greeting")
///             .constructor(vec![Parameter::string("greeting").with_default("hello")], |args| {
///                 Ok(Greeter { greeting: args.string()? })
///             }),
///     );
/// ```
pub struct ClassDescriptor {
    info: TypeInfo,
    construct: Option<ConstructFn>,
    methods: BTreeMap<String, InvokeFn>,
}

impl ClassDescriptor {
    /// Concrete type. It stays uninstantiable until a constructor is declared.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: TypeInfo {
                name: name.into(),
                ancestors: BTreeSet::new(),
                instantiable: false,
                constructor: None,
                methods: BTreeMap::new(),
            },
            construct: None,
            methods: BTreeMap::new(),
        }
    }

    /// Type that can never be constructed (interface or abstract class), usable as a binding key or ancestor
    #[inline]
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    /// Declares a parent class or an implemented interface
    #[inline]
    #[must_use]
    pub fn implements(mut self, ancestor: impl Into<String>) -> Self {
        self.info.ancestors.insert(ancestor.into());
        self
    }

    #[must_use]
    pub fn constructor<T, F>(mut self, parameters: Vec<Parameter>, construct: F) -> Self
    where
        T: SendSafety + SyncSafety + 'static,
        F: Fn(&mut Arguments) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.info.instantiable = true;
        self.info.constructor = Some(MethodInfo::new(CONSTRUCTOR, parameters));
        self.construct = Some(boxed_construct(move |arguments| Ok(Box::new(construct(arguments)?) as Object)));
        self
    }

    /// Instance method receiving the object it's invoked on
    #[must_use]
    pub fn method<T, F>(self, name: impl Into<String>, parameters: Vec<Parameter>, method: F) -> Self
    where
        T: 'static,
        F: Fn(&mut T, &mut Arguments) -> Result<Option<Instance>, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.insert_method(name.into(), parameters, true, method)
    }

    /// Instance method that can't be configured as a call
    #[must_use]
    pub fn private_method<T, F>(self, name: impl Into<String>, parameters: Vec<Parameter>, method: F) -> Self
    where
        T: 'static,
        F: Fn(&mut T, &mut Arguments) -> Result<Option<Instance>, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.insert_method(name.into(), parameters, false, method)
    }

    #[must_use]
    pub fn static_method<F>(mut self, name: impl Into<String>, parameters: Vec<Parameter>, method: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<Option<Instance>, InstantiateErrorKind> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut info = MethodInfo::new(name.clone(), parameters);
        info.is_static = true;

        self.info.methods.insert(name.clone(), info);
        self.methods.insert(name, boxed_invoke(move |_receiver, arguments| method(arguments)));
        self
    }

    fn insert_method<T, F>(mut self, name: String, parameters: Vec<Parameter>, is_public: bool, method: F) -> Self
    where
        T: 'static,
        F: Fn(&mut T, &mut Arguments) -> Result<Option<Instance>, InstantiateErrorKind> + Send + Sync + 'static,
    {
        let owner = format!("{}::{}", self.info.name, name);
        let mut info = MethodInfo::new(name.clone(), parameters);
        info.is_public = is_public;

        self.info.methods.insert(name.clone(), info);
        self.methods.insert(
            name,
            boxed_invoke(move |receiver, arguments| match receiver.downcast_mut::<T>() {
                Some(this) => method(this, arguments),
                None => Err(InstantiateErrorKind::NoReceiver { owner: owner.clone() }),
            }),
        );
        self
    }
}

/// [`TypeDescriptor`] backed by registered [`ClassDescriptor`]s.
///
/// Ancestry is transitive: a class implementing `B`, where `B` implements `C`, is a subtype of `C`
/// regardless of the order the classes were added in.
#[derive(Default)]
pub struct TypeCatalog {
    classes: BTreeMap<String, ClassDescriptor>,
}

impl TypeCatalog {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_class(mut self, class: ClassDescriptor) -> Self {
        self.add_class(class);
        self
    }

    /// Adds or replaces a class
    pub fn add_class(&mut self, class: ClassDescriptor) {
        self.classes.insert(class.info.name.clone(), class);
        self.close_ancestors();
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, ty: &str) -> bool {
        self.classes.contains_key(ty)
    }

    fn close_ancestors(&mut self) {
        loop {
            let mut changed = false;
            let names: Vec<String> = self.classes.keys().cloned().collect();
            for name in names {
                let mut inherited = BTreeSet::new();
                if let Some(class) = self.classes.get(&name) {
                    for ancestor in &class.info.ancestors {
                        if let Some(parent) = self.classes.get(ancestor) {
                            inherited.extend(parent.info.ancestors.iter().cloned());
                        }
                    }
                }
                if let Some(class) = self.classes.get_mut(&name) {
                    inherited.remove(&name);
                    let before = class.info.ancestors.len();
                    class.info.ancestors.extend(inherited);
                    changed |= class.info.ancestors.len() != before;
                }
            }
            if !changed {
                break;
            }
        }
    }
}

impl TypeDescriptor for TypeCatalog {
    fn describe(&self, ty: &str) -> Option<&TypeInfo> {
        self.classes.get(ty).map(|class| &class.info)
    }

    fn construct(&self, ty: &str, arguments: Arguments) -> Result<Object, InstantiateErrorKind> {
        let mut arguments = arguments;
        match self.classes.get(ty).and_then(|class| class.construct.as_ref()) {
            Some(construct) => construct(&mut arguments),
            None => Err(InstantiateErrorKind::NoConstructor { ty: ty.into() }),
        }
    }

    fn invoke(&self, ty: &str, method: &str, receiver: Receiver<'_>, arguments: Arguments) -> Result<Option<Instance>, InstantiateErrorKind> {
        let mut arguments = arguments;
        let Some(class) = self.classes.get(ty) else {
            return Err(InstantiateErrorKind::NoMethod {
                owner: format!("{ty}::{method}"),
            });
        };
        let (Some(info), Some(invoke)) = (class.info.methods.get(method), class.methods.get(method)) else {
            return Err(InstantiateErrorKind::NoMethod {
                owner: format!("{ty}::{method}"),
            });
        };
        if !info.is_static && matches!(receiver, Receiver::Static) {
            return Err(InstantiateErrorKind::NoReceiver {
                owner: format!("{ty}::{method}"),
            });
        }
        invoke(receiver, &mut arguments)
    }
}
