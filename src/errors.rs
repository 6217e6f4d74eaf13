mod config;
mod instantiate;
mod resolve;

pub use config::ConfigErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use resolve::ResolveErrorKind;
