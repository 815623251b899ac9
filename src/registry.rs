//! The receiver registry.
//!
//! Maps receiver names to delivery handlers. The registry is built once at
//! startup, before any inbound traffic, and is read-only afterwards, so
//! lookups need no locking no matter how many deliveries are in flight.
//!
//! A receiver that fails validation aborts the whole build: a partially
//! usable registry is worse than a hard startup failure, because a missing
//! receiver at lookup time is indistinguishable from a misrouted alert.

use crate::config::ReceiverConfig;
use crate::core::Handler;
use crate::handlers::{builtin_factories, HandlerFactory};
use crate::template::TemplateError;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A fatal receiver-configuration problem. Aborts process initialization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("receiver '{name}' has unknown handler type '{kind}'")]
    UnknownHandlerType { name: String, kind: String },

    #[error("duplicate receiver name '{0}'")]
    DuplicateReceiver(String),

    #[error("receiver '{name}': {reason}")]
    InvalidParams { name: String, reason: String },

    #[error("receiver '{name}': {source}")]
    InvalidTemplate {
        name: String,
        #[source]
        source: TemplateError,
    },
}

/// Builds registries, dispatching on the `handler` discriminator through the
/// registered factories. New handler kinds register here; the build loop
/// never changes.
pub struct RegistryBuilder {
    factories: HashMap<&'static str, Box<dyn HandlerFactory>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        builtin_factories()
            .into_iter()
            .fold(Self::empty(), |builder, factory| builder.register(factory))
    }
}

impl RegistryBuilder {
    /// A builder with no factories. Useful for tests; production code wants
    /// [`RegistryBuilder::default`] with the built-ins registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory, replacing any previous one of the same kind.
    pub fn register(mut self, factory: Box<dyn HandlerFactory>) -> Self {
        self.factories.insert(factory.kind(), factory);
        self
    }

    /// Builds a registry from an ordered receiver list. Any invalid entry
    /// fails the whole build.
    pub fn build(&self, configs: &[ReceiverConfig]) -> Result<Registry, ConfigError> {
        if configs.is_empty() {
            warn!("no receivers configured; every inbound webhook will get 404");
        }

        let mut handlers: HashMap<String, Arc<dyn Handler>> =
            HashMap::with_capacity(configs.len());
        for config in configs {
            let factory = self.factories.get(config.handler.as_str()).ok_or_else(|| {
                ConfigError::UnknownHandlerType {
                    name: config.name.clone(),
                    kind: config.handler.clone(),
                }
            })?;
            debug!(receiver = %config.name, kind = %config.handler, "building handler");
            let handler = factory.build(&config.name, &config.params)?;
            if handlers.insert(config.name.clone(), handler).is_some() {
                return Err(ConfigError::DuplicateReceiver(config.name.clone()));
            }
        }

        info!("initialized {} receivers", handlers.len());
        Ok(Registry { handlers })
    }
}

/// The name → handler mapping used to route inbound notifications.
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("receivers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Builds a registry with the built-in handler factories.
    pub fn build(configs: &[ReceiverConfig]) -> Result<Self, ConfigError> {
        RegistryBuilder::default().build(configs)
    }

    /// Looks up the handler for a receiver name. O(1), safe for unlimited
    /// concurrent callers.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
