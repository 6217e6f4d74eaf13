#[cfg(feature = "thread_safe")]
mod thread_safe {
    use alloc::sync::Arc;
    use core::any::Any;

    pub trait SendSafety: Send {}
    pub trait SyncSafety: Sync {}

    impl<T: Send> SendSafety for T {}
    impl<T: Sync> SyncSafety for T {}

    pub type RcThreadSafety<T> = Arc<T>;
    pub type AnyThreadSafety = dyn Any + Send + Sync;
}

#[cfg(not(feature = "thread_safe"))]
mod thread_unsafe {
    use alloc::rc::Rc;
    use core::any::Any;

    pub trait SendSafety {}
    pub trait SyncSafety {}

    impl<T> SendSafety for T {}
    impl<T> SyncSafety for T {}

    pub type RcThreadSafety<T> = Rc<T>;
    pub type AnyThreadSafety = dyn Any;
}

#[cfg(feature = "thread_safe")]
pub use thread_safe::{AnyThreadSafety, RcThreadSafety, SendSafety, SyncSafety};

#[cfg(not(feature = "thread_safe"))]
pub use thread_unsafe::{AnyThreadSafety, RcThreadSafety, SendSafety, SyncSafety};

/// Shared, type-erased service instance as cached and handed out by the injector.
pub type Instance = RcThreadSafety<AnyThreadSafety>;

/// Owned, type-erased object that is still being configured (method calls run against it)
/// before it's sealed into an [`Instance`].
pub type Object = alloc::boxed::Box<AnyThreadSafety>;

/// Downcasts a shared instance to a concrete type, returning the instance back on mismatch.
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn downcast<T: SendSafety + SyncSafety + 'static>(instance: Instance) -> Result<RcThreadSafety<T>, Instance> {
    instance.downcast::<T>()
}
