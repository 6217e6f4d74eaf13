use alloc::{collections::BTreeMap, string::String, vec::Vec};

use crate::{
    descriptor::MethodInfo,
    utils::thread_safety::{Instance, RcThreadSafety},
};

/// Signature analysed once per callable and reused by every later call.
pub(crate) struct Signature {
    pub(crate) owner: String,
    pub(crate) method: MethodInfo,
}

#[derive(Default)]
pub(crate) struct Cache {
    resolved: BTreeMap<String, Instance>,
    tagged: BTreeMap<String, RcThreadSafety<Vec<Instance>>>,
    signatures: BTreeMap<String, RcThreadSafety<Signature>>,
}

impl Cache {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn resolved(&self, key: &str) -> Option<Instance> {
        self.resolved.get(key).cloned()
    }

    /// First instance wins, a populated entry is never replaced
    pub(crate) fn insert_resolved(&mut self, key: &str, instance: Instance) -> Instance {
        self.resolved.entry(key.into()).or_insert(instance).clone()
    }

    #[inline]
    #[must_use]
    pub(crate) fn tagged(&self, tag: &str) -> Option<RcThreadSafety<Vec<Instance>>> {
        self.tagged.get(tag).cloned()
    }

    pub(crate) fn insert_tagged(&mut self, tag: &str, group: RcThreadSafety<Vec<Instance>>) -> RcThreadSafety<Vec<Instance>> {
        self.tagged.entry(tag.into()).or_insert(group).clone()
    }

    #[inline]
    #[must_use]
    pub(crate) fn signature(&self, id: &str) -> Option<RcThreadSafety<Signature>> {
        self.signatures.get(id).cloned()
    }

    pub(crate) fn insert_signature(&mut self, id: &str, signature: Signature) -> RcThreadSafety<Signature> {
        self.signatures
            .entry(id.into())
            .or_insert_with(|| RcThreadSafety::new(signature))
            .clone()
    }
}
