use crate::{
    errors::ResolveErrorKind,
    utils::thread_safety::{Instance, SendSafety, SyncSafety},
    Injector,
};

/// Externally supplied providers consulted by the injector before it autowires a key.
pub trait ServiceSource: SendSafety + SyncSafety {
    /// Produces a fresh service for the canonical `key`, or `None` to let the injector autowire it.
    ///
    /// # Errors
    /// Any failure while producing the service
    fn service(&self, injector: &Injector, key: &str) -> Result<Option<Instance>, ResolveErrorKind>;

    /// Applies the wrappers registered for `key` to a freshly produced service.
    ///
    /// # Errors
    /// Any failure of a wrapper
    #[inline]
    fn wrap(&self, injector: &Injector, key: &str, service: Instance) -> Result<Instance, ResolveErrorKind> {
        let _ = (injector, key);
        Ok(service)
    }
}

/// No providers at all, every key is autowired.
#[derive(Clone, Copy, Debug, Default)]
pub struct Autowire;

impl ServiceSource for Autowire {
    #[inline]
    fn service(&self, _injector: &Injector, _key: &str) -> Result<Option<Instance>, ResolveErrorKind> {
        Ok(None)
    }
}

impl<F> ServiceSource for F
where
    F: Fn(&Injector, &str) -> Result<Option<Instance>, ResolveErrorKind> + SendSafety + SyncSafety,
{
    #[inline]
    fn service(&self, injector: &Injector, key: &str) -> Result<Option<Instance>, ResolveErrorKind> {
        self(injector, key)
    }
}
