//! The container: registry, instance cache and parent link for one scope.
//!
//! A [`Container`] resolves services lazily, caching each instance for its own
//! lifetime, and delegates keys it has no definition for to its parent.
//! Resolution lives in `resolve`, shutdown in `lifecycle`, dry-run checks in
//! `validate`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::lock::Mutex as AsyncMutex;
use parking_lot::RwLock;

use crate::cache::{InstanceCache, SlotState};
use crate::config::ContainerConfig;
use crate::descriptors::{ServiceDefinition, ServiceDescriptor};
use crate::error::{BoxError, DiResult};
use crate::graph::{DependencyGraph, ExportFormat, GraphEdge, GraphMetadata, GraphNode, GraphSnapshot};
use crate::key::ServiceKey;
use crate::observer::Observers;
use crate::registration::Registry;

mod builder;
mod lifecycle;
mod resolve;
mod validate;

pub use builder::ContainerBuilder;
pub use validate::ValidationReport;

/// Dependency injection container for one scope.
///
/// Cloning a `Container` is cheap and yields another handle to the same
/// scope. A child container holds a handle to its parent, so the parent stays
/// alive at least as long as any child.
///
/// # Examples
///
/// ```
/// use wirebox::{BoxError, ContainerBuilder, Resolver, NO_DEPS};
/// use std::sync::Arc;
///
/// struct Config { user: String }
/// struct PersonRepo { config: Arc<Config> }
///
/// # fn main() -> wirebox::DiResult<()> {
/// let root = ContainerBuilder::new()
///     .add_factory("config", NO_DEPS, |_| Ok::<_, BoxError>(Config { user: "admin".into() }))
///     .add_factory("personRepo", ["config"], |deps| {
///         Ok::<_, BoxError>(PersonRepo { config: deps.get::<Config>("config")? })
///     })
///     .build()?;
///
/// let repo = root.get_sync::<PersonRepo>("personRepo")?;
/// assert_eq!(repo.config.user, "admin");
///
/// // Singleton per container.
/// assert!(Arc::ptr_eq(&repo, &root.get_sync::<PersonRepo>("personRepo")?));
///
/// // A child sees the parent's services and can hold request data of its own.
/// let request = root.child();
/// request.set("requestId", 7u64);
/// assert_eq!(*request.get_sync::<u64>("requestId")?, 7);
/// assert!(Arc::ptr_eq(&repo, &request.get_sync::<PersonRepo>("personRepo")?));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    registry: RwLock<Registry>,
    cache: InstanceCache,
    parent: Option<Container>,
    config: ContainerConfig,
    observers: Observers,
    closed: AtomicBool,
    close_lock: AsyncMutex<()>,
}

impl Container {
    /// Creates an empty root container with default configuration.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Creates an empty root container.
    pub fn with_config(config: ContainerConfig) -> Self {
        Self::from_parts(Registry::new(), None, config, Observers::new())
    }

    /// Creates an empty container, linked to `parent` if one is given.
    ///
    /// A child inherits its parent's configuration and observers.
    pub fn create(parent: Option<&Container>) -> Self {
        match parent {
            Some(parent) => parent.child(),
            None => Self::new(),
        }
    }

    /// Creates an empty child container of this one.
    pub fn child(&self) -> Self {
        Self::from_parts(
            Registry::new(),
            Some(self.clone()),
            self.inner.config.clone(),
            self.inner.observers.clone(),
        )
    }

    pub(crate) fn from_parts(
        registry: Registry,
        parent: Option<Container>,
        config: ContainerConfig,
        observers: Observers,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(registry),
                cache: InstanceCache::new(),
                parent,
                config,
                observers,
                closed: AtomicBool::new(false),
                close_lock: AsyncMutex::new(()),
            }),
        }
    }

    /// The parent container, if any.
    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// This container's configuration.
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Registers a definition on this container.
    ///
    /// Fails only with [`DiError::DuplicateRegistration`](crate::DiError::DuplicateRegistration)
    /// when the key is already registered here and the configuration rejects
    /// duplicates. A parent's definition of the same key is shadowed, never
    /// modified.
    pub fn register(&self, definition: ServiceDefinition) -> DiResult<()> {
        self.inner
            .registry
            .write()
            .register(definition, self.inner.config.on_duplicate)
    }

    /// Seeds the instance for `key` directly, bypassing any recipe.
    ///
    /// Use it for request-scoped data or test doubles. Seeding fills an
    /// absent slot, or wins over a construction still in flight. A slot that
    /// is already resolved keeps its instance: `value` is dropped, a warning
    /// is logged and `false` is returned. The parent is untouched.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<ServiceKey>, value: T) -> bool {
        self.set_arc(key, Arc::new(value))
    }

    /// As [`set`](Self::set) for a value that is already shared.
    pub fn set_arc<T: Send + Sync + 'static>(&self, key: impl Into<ServiceKey>, value: Arc<T>) -> bool {
        let key = key.into();
        match self.inner.cache.seed(key.clone(), value) {
            SlotState::Resolved => {
                tracing::warn!(key = %key, "instance already resolved, seeded value ignored");
                false
            }
            previous => {
                tracing::debug!(key = %key, previous = ?previous, "instance seeded");
                true
            }
        }
    }

    /// Registers a local override of a parent-provided service.
    ///
    /// When `key` is first resolved here, the parent's instance is resolved
    /// and `refiner` derives this container's instance from it. Resolution
    /// fails with [`DiError::NoParent`](crate::DiError::NoParent) on a root
    /// container.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirebox::{BoxError, ContainerBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// # fn main() -> wirebox::DiResult<()> {
    /// let root = ContainerBuilder::new().add_instance("prefix", "app".to_string()).build()?;
    /// let child = root.child();
    /// child.refine("prefix", |parent: Arc<String>| Ok::<_, BoxError>(format!("{}/request", parent)))?;
    ///
    /// assert_eq!(child.get_sync::<String>("prefix")?.as_str(), "app/request");
    /// assert_eq!(root.get_sync::<String>("prefix")?.as_str(), "app");
    /// # Ok(())
    /// # }
    /// ```
    pub fn refine<T, E, F>(&self, key: impl Into<ServiceKey>, refiner: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Result<T, E> + Send + Sync + 'static,
    {
        self.register(ServiceDefinition::refinement(key, refiner))
    }

    /// True if `key` has a definition in this container (parents not consulted).
    pub fn is_registered(&self, key: impl Into<ServiceKey>) -> bool {
        self.inner.registry.read().is_registered(&key.into())
    }

    /// State of this container's instance slot for `key`.
    pub fn slot_state(&self, key: impl Into<ServiceKey>) -> SlotState {
        self.inner.cache.state(&key.into())
    }

    /// Descriptors of every local definition, in registration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let registry = self.inner.registry.read();
        registry
            .iter()
            .map(|def| ServiceDescriptor::from_definition(def, self.inner.cache.state(&def.key)))
            .collect()
    }

    /// A copy of this container's dependency graph.
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.inner.registry.read().graph().clone()
    }

    /// Snapshot of the dependency graph with each node's kind and slot state.
    pub fn graph_snapshot(&self) -> GraphSnapshot {
        let registry = self.inner.registry.read();
        let graph = registry.graph();

        let nodes: Vec<GraphNode> = graph
            .all_services()
            .iter()
            .map(|key| {
                let def = registry.lookup(key);
                GraphNode {
                    key: key.clone(),
                    kind: def.map(|d| d.kind),
                    state: self.inner.cache.state(key),
                    has_teardown: def.map_or(false, ServiceDefinition::has_teardown),
                }
            })
            .collect();

        let edges: Vec<GraphEdge> = graph
            .edges()
            .map(|(from, to)| GraphEdge {
                from: from.clone(),
                to: to.clone(),
            })
            .collect();

        let metadata = GraphMetadata {
            node_count: nodes.len(),
            edge_count: edges.len(),
            resolved_count: nodes.iter().filter(|n| n.state == SlotState::Resolved).count(),
            construction_order: graph.topological_order(),
            teardown_order: graph.invert().topological_order(),
            #[cfg(feature = "graph-export")]
            exported_at: chrono::Utc::now().to_rfc3339(),
        };

        GraphSnapshot { nodes, edges, metadata }
    }

    /// Renders the dependency graph in `format`.
    pub fn export_graph(&self, format: ExportFormat) -> DiResult<String> {
        self.graph_snapshot().render(format)
    }

    /// True once `close()` has completed successfully.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn definition(&self, key: &ServiceKey) -> Option<ServiceDefinition> {
        self.inner.registry.read().lookup(key).cloned()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Container")
            .field("services", &registry.len())
            .field("resolved", &self.inner.cache.resolved_count())
            .field("has_parent", &self.inner.parent.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;
    use crate::error::DiError;
    use crate::key::NO_DEPS;
    use crate::traits::Resolver;

    #[test]
    fn create_links_the_parent() {
        let root = Container::create(None);
        let child = Container::create(Some(&root));
        assert!(root.parent().is_none());
        assert!(child.parent().is_some());
    }

    #[test]
    fn child_inherits_config() {
        let root = Container::with_config(ContainerConfig {
            on_duplicate: DuplicatePolicy::Reject,
            ..ContainerConfig::default()
        });
        let child = root.child();
        assert_eq!(child.config().on_duplicate, DuplicatePolicy::Reject);

        child.register(ServiceDefinition::instance("a", 1u8)).unwrap();
        let err = child.register(ServiceDefinition::instance("a", 2u8)).unwrap_err();
        assert!(matches!(err, DiError::DuplicateRegistration(_)));
    }

    #[test]
    fn set_overrides_the_local_slot_only() {
        let root = Container::new();
        root.register(ServiceDefinition::instance("name", "root".to_string())).unwrap();
        let child = root.child();

        assert!(child.set("name", "child".to_string()));
        assert_eq!(child.get_sync::<String>("name").unwrap().as_str(), "child");
        assert_eq!(root.get_sync::<String>("name").unwrap().as_str(), "root");
        assert_eq!(child.slot_state("name"), SlotState::Resolved);
        assert!(!child.is_registered("name"));
    }

    #[test]
    fn descriptors_follow_registration_order() {
        let container = Container::new();
        container
            .register(ServiceDefinition::factory("b", NO_DEPS, |_| Ok::<_, BoxError>(1u8)))
            .unwrap();
        container
            .register(ServiceDefinition::factory("a", ["b"], |_| Ok::<_, BoxError>(2u8)))
            .unwrap();

        let keys: Vec<_> = container.descriptors().into_iter().map(|d| d.key).collect();
        assert_eq!(keys, vec![ServiceKey::from("b"), ServiceKey::from("a")]);
    }

    #[test]
    fn snapshot_reports_state_and_orders() {
        let container = Container::new();
        container
            .register(
                ServiceDefinition::factory("config", NO_DEPS, |_| Ok::<_, BoxError>(1u8))
                    .with_teardown(|_: Arc<u8>| Ok::<_, BoxError>(())),
            )
            .unwrap();
        container
            .register(ServiceDefinition::factory("repo", ["config"], |_| Ok::<_, BoxError>(2u8)))
            .unwrap();
        container.get_sync::<u8>("config").unwrap();

        let snapshot = container.graph_snapshot();
        assert_eq!(snapshot.metadata.node_count, 2);
        assert_eq!(snapshot.metadata.edge_count, 1);
        assert_eq!(snapshot.metadata.resolved_count, 1);
        assert_eq!(snapshot.metadata.teardown_order, vec![ServiceKey::from("repo"), ServiceKey::from("config")]);
        assert!(snapshot.nodes[0].has_teardown);

        let mermaid = container.export_graph(ExportFormat::Mermaid).unwrap();
        assert!(mermaid.contains("repo --> config"));
    }

    #[test]
    fn debug_summarizes() {
        let container = Container::new();
        container.set("x", 1u8);
        let text = format!("{:?}", container);
        assert!(text.contains("resolved: 1"));
        assert!(text.contains("has_parent: false"));
    }
}
