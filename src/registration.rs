//! Service registry.

use std::collections::HashMap;

use crate::config::DuplicatePolicy;
use crate::descriptors::ServiceDefinition;
use crate::error::{DiError, DiResult};
use crate::graph::DependencyGraph;
use crate::key::ServiceKey;

/// Definitions registered on one container, plus the dependency graph they
/// feed.
///
/// Definitions are kept in registration order (a replaced definition keeps
/// its original position) with a key index for lookup.
#[derive(Default)]
pub(crate) struct Registry {
    definitions: Vec<ServiceDefinition>,
    index: HashMap<ServiceKey, usize>,
    graph: DependencyGraph,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `def` and records an edge `key -> dep` for each declared
    /// dependency.
    ///
    /// Under [`DuplicatePolicy::Replace`] a second definition for the same
    /// key replaces the first; the first definition's edges stay in the
    /// graph. Under [`DuplicatePolicy::Reject`] the registry is left untouched.
    pub(crate) fn register(&mut self, def: ServiceDefinition, policy: DuplicatePolicy) -> DiResult<()> {
        let key = def.key.clone();

        if let Some(&pos) = self.index.get(&key) {
            if policy == DuplicatePolicy::Reject {
                return Err(DiError::DuplicateRegistration(key));
            }
            tracing::debug!(key = %key, kind = %def.kind, "replacing service definition");
            self.link(&def);
            self.definitions[pos] = def;
            return Ok(());
        }

        tracing::debug!(
            key = %key,
            kind = %def.kind,
            dependencies = def.dependencies.len(),
            "registering service"
        );
        self.link(&def);
        self.index.insert(key, self.definitions.len());
        self.definitions.push(def);
        Ok(())
    }

    fn link(&mut self, def: &ServiceDefinition) {
        self.graph.add_node(def.key.clone());
        for dep in &def.dependencies {
            self.graph.add_edge(def.key.clone(), dep.clone());
        }
    }

    pub(crate) fn lookup(&self, key: &ServiceKey) -> Option<&ServiceDefinition> {
        self.index.get(key).map(|&pos| &self.definitions[pos])
    }

    pub(crate) fn is_registered(&self, key: &ServiceKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Definitions in registration order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.definitions.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.definitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::key::NO_DEPS;

    fn def(key: &str, deps: &[&str]) -> ServiceDefinition {
        ServiceDefinition::factory(key, deps.iter().copied(), |_| Ok::<_, BoxError>(()))
    }

    #[test]
    fn register_feeds_the_graph() {
        let mut registry = Registry::new();
        registry.register(def("config", &[]), DuplicatePolicy::Replace).unwrap();
        registry.register(def("repo", &["config", "logger"]), DuplicatePolicy::Replace).unwrap();

        assert!(registry.is_registered(&"repo".into()));
        assert!(!registry.is_registered(&"logger".into()));
        assert_eq!(registry.graph().edge_count(), 2);
        assert!(registry.graph().contains(&"logger".into()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn keys_without_edges_are_graph_nodes() {
        let mut registry = Registry::new();
        registry
            .register(ServiceDefinition::factory("solo", NO_DEPS, |_| Ok::<_, BoxError>(1u8)), DuplicatePolicy::Replace)
            .unwrap();
        assert_eq!(registry.graph().all_services(), &[ServiceKey::from("solo")]);
    }

    #[test]
    fn replace_keeps_position_and_stale_edges() {
        let mut registry = Registry::new();
        registry.register(def("a", &["old"]), DuplicatePolicy::Replace).unwrap();
        registry.register(def("b", &[]), DuplicatePolicy::Replace).unwrap();
        registry.register(def("a", &["new"]), DuplicatePolicy::Replace).unwrap();

        let order: Vec<_> = registry.iter().map(|d| d.key().as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(registry.lookup(&"a".into()).unwrap().dependencies()[0], "new");
        assert_eq!(registry.graph().dependencies_of(&"a".into()).len(), 2);
    }

    #[test]
    fn reject_policy_refuses_duplicates() {
        let mut registry = Registry::new();
        registry.register(def("a", &[]), DuplicatePolicy::Reject).unwrap();
        let err = registry.register(def("a", &["x"]), DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(err, DiError::DuplicateRegistration(k) if k == "a"));
        assert!(registry.lookup(&"a".into()).unwrap().dependencies().is_empty());
        assert_eq!(registry.graph().edge_count(), 0);
    }
}
