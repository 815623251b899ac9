//! Delivery handler implementations and their construction.
//!
//! Handlers are built from receiver configuration through [`HandlerFactory`]
//! implementations keyed by the `handler` discriminator string. The registry
//! builder ships with the built-in factories registered; new delivery
//! mechanisms plug in by registering another factory, without touching the
//! registry's build logic.

pub mod http;

use crate::core::Handler;
use crate::registry::ConfigError;
use std::sync::Arc;

pub use http::{HttpHandler, HttpMethod};

/// Constructs handlers of one kind from receiver configuration.
pub trait HandlerFactory: Send + Sync {
    /// The `handler` discriminator value this factory serves.
    fn kind(&self) -> &'static str;

    /// Builds a handler for the named receiver from its `params` mapping.
    ///
    /// All validation happens here: a handler that comes back `Ok` is ready
    /// to deliver, including a compiled and fixture-validated template.
    fn build(&self, name: &str, params: &serde_json::Value)
        -> Result<Arc<dyn Handler>, ConfigError>;
}

/// The factories every registry starts with.
pub fn builtin_factories() -> Vec<Box<dyn HandlerFactory>> {
    vec![Box::new(http::HttpHandlerFactory)]
}
