//! Service registry and built-in handlers.
//!
//! A service is anything callable with an [`Event`] and the lock-held
//! [`Router`]. Handlers run inside the manager's routing lock and re-emit
//! through the router, never through [`crate::Manager::emit`].

mod groups;
mod manage;
mod record;
mod status;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ebus_core::address::SERVICE_PREFIX;
use ebus_core::Event;

use crate::manager::Router;

/// `@join`
pub const JOIN: &str = "join";
/// `@leave`
pub const LEAVE: &str = "leave";
/// `@boardcast`
pub const BOARDCAST: &str = "boardcast";
/// `@record`
pub const RECORD: &str = "record";
/// `@status`
pub const STATUS: &str = "status";
/// `@manage`
pub const MANAGE: &str = "manage";

/// A routable service handler.
pub trait Service: Send + Sync {
    /// Handle one event addressed to this service.
    fn call(&self, event: Event, router: &mut Router<'_>);
}

impl<F> Service for F
where
    F: Fn(Event, &mut Router<'_>) + Send + Sync,
{
    fn call(&self, event: Event, router: &mut Router<'_>) {
        self(event, router);
    }
}

/// Name to handler mapping, populated before the manager starts routing.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    handlers: HashMap<String, Arc<dyn Service>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in service.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(JOIN, groups::join);
        registry.register(LEAVE, groups::leave);
        registry.register(BOARDCAST, groups::boardcast);
        registry.register(RECORD, record::handle);
        registry.register(STATUS, status::handle);
        registry.register(MANAGE, manage::handle);
        registry
    }

    /// Register `handler` under `name`. A leading `@` is accepted and
    /// stripped. Re-registering a name replaces the previous handler.
    pub fn register(&mut self, name: &str, handler: impl Service + 'static) {
        let name = name.strip_prefix(SERVICE_PREFIX).unwrap_or(name);
        let _ = self.handlers.insert(name.to_owned(), Arc::new(handler));
    }

    /// Handler registered under `name` (without the `@`).
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Service>> {
        self.handlers.get(name)
    }

    /// Whether `name` is registered.
    pub fn has_service(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: Event, _: &mut Router<'_>) {}

    #[test]
    fn builtins_registered() {
        let registry = ServiceRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["boardcast", "join", "leave", "manage", "record", "status"]
        );
    }

    #[test]
    fn register_strips_service_prefix() {
        let mut registry = ServiceRegistry::new();
        registry.register("@echo", noop);
        assert!(registry.has_service("echo"));
        assert!(!registry.has_service("@echo"));
        assert!(registry.get("echo").is_some());
    }

    #[test]
    fn unknown_service_is_none() {
        let registry = ServiceRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn reregister_replaces() {
        let mut registry = ServiceRegistry::new();
        registry.register("x", noop);
        registry.register("x", noop);
        assert_eq!(registry.names(), vec!["x"]);
    }
}
