//! Lookup of principal groups by controller.

use std::collections::HashMap;
use std::sync::Arc;

use keeper_core::ports::PrincipalGroup;
use keeper_core::types::Address;

/// Principal groups the engine may act for, keyed by controller.
#[derive(Default)]
pub struct GroupRegistry {
    groups: HashMap<Address, Arc<dyn PrincipalGroup>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group under its controller. A later registration for the
    /// same controller replaces the earlier one.
    pub fn register(&mut self, group: Arc<dyn PrincipalGroup>) {
        let controller = group.controller().clone();
        if self.groups.insert(controller.clone(), group).is_some() {
            tracing::warn!(controller = %controller, "Replaced registered principal group");
        }
    }

    pub fn get(&self, controller: &Address) -> Option<Arc<dyn PrincipalGroup>> {
        self.groups.get(controller).cloned()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Registered controllers, sorted.
    pub fn controllers(&self) -> Vec<Address> {
        let mut controllers: Vec<_> = self.groups.keys().cloned().collect();
        controllers.sort();
        controllers
    }
}

impl FromIterator<Arc<dyn PrincipalGroup>> for GroupRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn PrincipalGroup>>>(iter: I) -> Self {
        let mut registry = GroupRegistry::new();
        for group in iter {
            registry.register(group);
        }
        registry
    }
}
