use alloc::{collections::BTreeSet, string::String, vec::Vec};
use core::mem;
use tracing::{debug, debug_span, error, info_span};

use crate::{
    blueprint::{Blueprint, Compiler},
    builder::DefinitionBuilder,
    config::Config,
    definition::Definition,
    descriptor::TypeDescriptor,
    errors::ConfigErrorKind,
    injector::Injector,
    utils::thread_safety::RcThreadSafety,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum DefinitionId {
    Service(String),
    Wrapper { target: String, wrapper: String },
}

impl DefinitionId {
    fn of(definition: &Definition) -> Self {
        match definition {
            Definition::Wrapper(wrapper) => Self::Wrapper {
                target: wrapper.target().into(),
                wrapper: wrapper.wrapper().ty().into(),
            },
            definition => Self::Service(definition.key().into()),
        }
    }
}

/// Collects definitions and expands their fallback bindings.
///
/// Registering the same key again (or the same wrapper type for a key) replaces the earlier
/// definition in place. Both the bound keys and the pending definitions are cleared by every
/// compile pass, whatever its outcome.
pub struct Registry {
    descriptor: RcThreadSafety<dyn TypeDescriptor>,
    config: Config,
    bindings: BTreeSet<String>,
    definitions: Vec<(DefinitionId, Definition)>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn new(descriptor: impl TypeDescriptor + 'static) -> Self {
        Self::new_with_config(descriptor, Config::default())
    }

    #[inline]
    #[must_use]
    pub fn new_with_config(descriptor: impl TypeDescriptor + 'static, config: Config) -> Self {
        Self::from_shared(RcThreadSafety::new(descriptor), config)
    }

    /// Registry over a descriptor shared with other registries or injectors
    #[inline]
    #[must_use]
    pub fn from_shared(descriptor: RcThreadSafety<dyn TypeDescriptor>, config: Config) -> Self {
        Self {
            descriptor,
            config,
            bindings: BTreeSet::new(),
            definitions: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> RcThreadSafety<dyn TypeDescriptor> {
        self.descriptor.clone()
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Starts describing the binding of `key`
    #[inline]
    pub fn bind(&mut self, key: impl Into<String>) -> DefinitionBuilder<'_> {
        DefinitionBuilder::new(self, key)
    }

    /// Registers an already validated definition. Its key and aliases become bound,
    /// wrappers don't bind their target.
    pub fn collect(&mut self, definition: impl Into<Definition>) -> &mut Self {
        let definition = definition.into();
        let id = DefinitionId::of(&definition);
        if let DefinitionId::Service(key) = &id {
            self.bindings.insert(key.clone());
        }
        self.bindings.extend(definition.aliases().iter().cloned());

        match self.definitions.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => {
                debug!(?id, "Definition replaced");
                *slot = definition;
            }
            None => self.definitions.push((id, definition)),
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.contains(key)
    }

    /// Invokes `provider` to bind `key`, unless it's already bound.
    ///
    /// # Errors
    /// - [`ConfigErrorKind::MissingBinding`] if the provider didn't bind `key`
    /// - any error of the provider
    pub fn skip<F>(&mut self, key: &str, provider: F) -> Result<&mut Self, ConfigErrorKind>
    where
        F: FnOnce(DefinitionBuilder<'_>) -> Result<(), ConfigErrorKind>,
    {
        if self.is_bound(key) {
            debug!(key, "Already bound");
            return Ok(self);
        }

        debug!(key, "Binding default");
        provider(self.bind(key))?;
        if !self.is_bound(key) {
            return Err(ConfigErrorKind::MissingBinding { key: key.into() });
        }
        Ok(self)
    }

    /// Expands the fallback bindings of everything registered so far and hands every definition,
    /// in discovery order, to `compiler`.
    ///
    /// # Errors
    /// - [`ConfigErrorKind::TooManyRounds`] if expansion doesn't settle within [`Config::max_rounds`]
    /// - any error of a fallback provider
    pub fn compile<C: Compiler>(&mut self, mut compiler: C) -> Result<C, ConfigErrorKind> {
        let span = info_span!("compile");
        let _guard = span.enter();

        let expanded = self.expand();
        self.bindings.clear();
        self.definitions.clear();

        let definitions = expanded.map_err(|err| {
            error!("{}", err);
            err
        })?;
        debug!(definitions = definitions.len(), "Expansion converged");
        for definition in definitions {
            definition.compile(&mut compiler);
        }
        Ok(compiler)
    }

    fn expand(&mut self) -> Result<Vec<Definition>, ConfigErrorKind> {
        let mut collected = Vec::new();
        let mut round = 0;

        while !self.definitions.is_empty() {
            round += 1;
            if round > self.config.max_rounds {
                return Err(ConfigErrorKind::TooManyRounds {
                    limit: self.config.max_rounds,
                });
            }

            let span = debug_span!("round", round);
            let _guard = span.enter();

            for mut definition in self.take_definitions() {
                let defaults = definition.take_defaults();
                collected.push(definition);
                for (key, provider) in defaults {
                    self.skip(&key, provider)?;
                }
            }
        }

        Ok(collected)
    }

    pub(crate) fn take_definitions(&mut self) -> Vec<Definition> {
        mem::take(&mut self.definitions)
            .into_iter()
            .map(|(_, definition)| definition)
            .collect()
    }

    /// Compiles everything into a runtime injector.
    ///
    /// # Errors
    /// See [`Self::compile`]
    pub fn build(mut self) -> Result<Injector, ConfigErrorKind> {
        let descriptor = self.descriptor();
        let config = self.config;
        Ok(self.compile(Blueprint::new())?.into_injector(descriptor, config))
    }
}
