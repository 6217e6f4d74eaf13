use alloc::{string::String, vec::Vec};

use crate::errors::ResolveErrorKind;

/// Keys currently under construction, outermost first.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResolutionContext {
    stack: Vec<String>,
}

impl ResolutionContext {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Marks `key` as being resolved.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::DependencyCycle`] with the whole chain, `key` included twice,
    /// if it's already under construction
    pub(crate) fn capture(&mut self, key: &str) -> Result<(), ResolveErrorKind> {
        if self.stack.iter().any(|captured| captured == key) {
            let mut chain = self.stack.clone();
            chain.push(key.into());
            return Err(ResolveErrorKind::DependencyCycle { chain });
        }
        self.stack.push(key.into());
        Ok(())
    }

    #[inline]
    pub(crate) fn release(&mut self) {
        self.stack.pop();
    }

    #[inline]
    pub(crate) fn unwind_all(&mut self) {
        self.stack.clear();
    }

    #[inline]
    #[must_use]
    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drops the frames above `depth`
    #[inline]
    pub(crate) fn restore(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    /// Key that asked for the one being resolved, or that key itself when nothing asked for it
    #[must_use]
    pub(crate) fn consumer(&self) -> Option<&str> {
        match self.stack.len() {
            0 => None,
            1 => self.stack.first().map(String::as_str),
            len => self.stack.get(len - 2).map(String::as_str),
        }
    }
}
