use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::String,
    vec::Vec,
};

use crate::Injector;

/// Runtime view of the bindings: aliases, prototypes, tag groups and the names the injector
/// answers for itself.
#[derive(Clone, Debug)]
pub struct BindingTable {
    aliases: BTreeMap<String, String>,
    prototypes: BTreeSet<String>,
    tags: BTreeMap<String, Vec<String>>,
    capabilities: BTreeSet<String>,
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            aliases: BTreeMap::new(),
            prototypes: BTreeSet::new(),
            tags: BTreeMap::new(),
            capabilities: BTreeSet::from([String::from(Injector::KEY)]),
        }
    }

    /// Many aliases may point to one key. Re-declaring an alias retargets it.
    #[inline]
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, key: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), key.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_prototype(mut self, key: impl Into<String>) -> Self {
        self.prototypes.insert(key.into());
        self
    }

    /// Declares a tag group from `(priority, key)` members in registration order
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>, members: Vec<(i64, String)>) -> Self {
        self.tags.insert(name.into(), by_priority(members, String::clone));
        self
    }

    /// Another name the injector resolves to itself
    #[inline]
    #[must_use]
    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        self.capabilities.insert(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn canonical<'a>(&'a self, key: &'a str) -> &'a str {
        self.aliases.get(key).map_or(key, String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn is_prototype(&self, key: &str) -> bool {
        self.prototypes.contains(key)
    }

    #[inline]
    #[must_use]
    pub fn is_capability(&self, key: &str) -> bool {
        self.capabilities.contains(key)
    }

    /// Members of a tag group, highest priority first. Unknown tags have no members.
    #[inline]
    #[must_use]
    pub fn tagged(&self, name: &str) -> &[String] {
        self.tags.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    #[inline]
    pub(crate) fn set_prototype(&mut self, key: &str, prototype: bool) {
        if prototype {
            self.prototypes.insert(key.into());
        } else {
            self.prototypes.remove(key);
        }
    }

    #[inline]
    pub(crate) fn insert_alias(&mut self, alias: &str, key: &str) {
        self.aliases.insert(alias.into(), key.into());
    }
}

/// Orders entries by descending priority, keeping registration order between equal priorities,
/// then keeps the first entry of every identity.
pub(crate) fn by_priority<T, K: PartialEq>(mut entries: Vec<(i64, T)>, identity: impl Fn(&T) -> K) -> Vec<T> {
    entries.sort_by(|(left, _), (right, _)| right.cmp(left));

    let mut seen = Vec::with_capacity(entries.len());
    let mut sorted = Vec::with_capacity(entries.len());
    for (_, entry) in entries {
        let id = identity(&entry);
        if !seen.contains(&id) {
            seen.push(id);
            sorted.push(entry);
        }
    }
    sorted
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{by_priority, BindingTable};
    use crate::Injector;

    use alloc::{
        format,
        string::{String, ToString as _},
        vec,
    };
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_table() {
        let table = BindingTable::new()
            .with_alias("logger", "app::Logger")
            .with_prototype("app::Request")
            .with_capability("Container")
            .with_tag(
                "listeners",
                vec![
                    (0, String::from("Low")),
                    (10, String::from("High")),
                    (5, String::from("Mid")),
                    (10, String::from("High")),
                ],
            );

        assert_eq!(table.canonical("logger"), "app::Logger");
        assert_eq!(table.canonical("app::Logger"), "app::Logger");
        assert!(table.is_prototype("app::Request"));
        assert!(table.is_capability(Injector::KEY));
        assert!(table.is_capability("Container"));
        assert_eq!(table.tagged("listeners"), ["High", "Mid", "Low"]);
        assert!(table.tagged("unknown").is_empty());
    }

    #[test]
    #[traced_test]
    fn test_by_priority_is_stable() {
        let sorted = by_priority(vec![(1, "a"), (2, "b"), (1, "c"), (2, "d"), (1, "a")], |entry| *entry);
        assert_eq!(sorted, ["b", "d", "a", "c"]);
    }
}
