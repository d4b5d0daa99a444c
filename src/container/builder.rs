//! Composition root for building containers.

use std::future::Future;
use std::sync::Arc;

use super::Container;
use crate::config::ContainerConfig;
use crate::descriptors::ServiceDefinition;
use crate::error::{BoxError, DiResult};
use crate::key::ServiceKey;
use crate::observer::{LifecycleObserver, Observers};
use crate::recipe::{Injectable, Resolved};
use crate::registration::Registry;

/// Collects service definitions and builds a [`Container`] from them.
///
/// Every `add_*` method declares one service: its key, the ordered keys it
/// depends on, and how to build it. Nothing is constructed until the service
/// is first requested from the built container.
///
/// # Examples
///
/// ```rust
/// use wirebox::{BoxError, ContainerBuilder, Resolver, NO_DEPS};
///
/// struct Logger { prefix: String }
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = ContainerBuilder::new()
///     .add_instance("prefix", "[app]".to_string())
///     .add_factory("logger", ["prefix"], |deps| {
///         Ok::<_, BoxError>(Logger { prefix: deps.at::<String>(0)?.to_string() })
///     })
///     .add_factory("clock", NO_DEPS, |_| Ok::<_, BoxError>(0u64))
///     .build()?;
///
/// assert_eq!(container.get_sync::<Logger>("logger")?.prefix, "[app]");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    definitions: Vec<ServiceDefinition>,
    observers: Observers,
    config: Option<ContainerConfig>,
}

impl ContainerBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the container configuration. Without it, a root container uses
    /// [`ContainerConfig::default`] and a child inherits its parent's.
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds a lifecycle observer.
    pub fn add_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// Adds a prepared definition.
    pub fn add_definition(mut self, definition: ServiceDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Adds a pre-built instance.
    pub fn add_instance<T: Send + Sync + 'static>(self, key: impl Into<ServiceKey>, value: T) -> Self {
        self.add_definition(ServiceDefinition::instance(key, value))
    }

    /// Adds a synchronous factory. It receives its dependencies in the order
    /// given by `dependencies`.
    pub fn add_factory<T, E, F, I, K>(self, key: impl Into<ServiceKey>, dependencies: I, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&Resolved) -> Result<T, E> + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: Into<ServiceKey>,
    {
        self.add_definition(ServiceDefinition::factory(key, dependencies, factory))
    }

    /// Adds an asynchronous factory.
    pub fn add_async_factory<T, E, F, Fut, I, K>(
        self,
        key: impl Into<ServiceKey>,
        dependencies: I,
        factory: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Resolved) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        I: IntoIterator<Item = K>,
        K: Into<ServiceKey>,
    {
        self.add_definition(ServiceDefinition::async_factory(key, dependencies, factory))
    }

    /// Adds a class-style service built through its [`Injectable`] impl.
    pub fn add_class<T: Injectable>(self, key: impl Into<ServiceKey>) -> Self {
        self.add_definition(ServiceDefinition::class::<T>(key))
    }

    /// Adds a local override of a parent-provided service; see
    /// [`Container::refine`].
    pub fn refine<T, E, F>(self, key: impl Into<ServiceKey>, refiner: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Result<T, E> + Send + Sync + 'static,
    {
        self.add_definition(ServiceDefinition::refinement(key, refiner))
    }

    /// Builds a root container.
    ///
    /// Fails only if the configuration rejects duplicate keys and one was
    /// added twice.
    pub fn build(self) -> DiResult<Container> {
        let config = self.config.clone().unwrap_or_default();
        self.assemble(None, config, Observers::new())
    }

    /// Builds a child container of `parent`.
    ///
    /// The child sees every service of the parent chain, keeps its own
    /// instances, and notifies the parent's observers as well as its own.
    pub fn build_child(self, parent: &Container) -> DiResult<Container> {
        let config = self.config.clone().unwrap_or_else(|| parent.config().clone());
        self.assemble(Some(parent.clone()), config, parent.inner.observers.clone())
    }

    fn assemble(self, parent: Option<Container>, config: ContainerConfig, mut observers: Observers) -> DiResult<Container> {
        let mut registry = Registry::new();
        for definition in self.definitions {
            registry.register(definition, config.on_duplicate)?;
        }
        observers.extend(self.observers);

        tracing::debug!(
            services = registry.len(),
            child = parent.is_some(),
            "container built"
        );
        Ok(Container::from_parts(registry, parent, config, observers))
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
    fn duplicate_rejected_at_build() {
        let result = ContainerBuilder::new()
            .with_config(ContainerConfig {
                on_duplicate: DuplicatePolicy::Reject,
                ..ContainerConfig::default()
            })
            .add_instance("a", 1u8)
            .add_instance("a", 2u8)
            .build();
        assert!(matches!(result, Err(DiError::DuplicateRegistration(k)) if k == "a"));
    }

    #[test]
    fn duplicate_replaced_by_default() {
        let container = ContainerBuilder::new()
            .add_instance("a", 1u8)
            .add_instance("a", 2u8)
            .build()
            .unwrap();
        assert_eq!(*container.get_sync::<u8>("a").unwrap(), 2);
    }

    #[test]
    fn build_child_links_and_inherits() {
        let parent = ContainerBuilder::new()
            .with_config(ContainerConfig {
                max_depth: 8,
                ..ContainerConfig::default()
            })
            .add_instance("base", 10u32)
            .build()
            .unwrap();

        let child = ContainerBuilder::new()
            .add_factory("derived", ["base"], |deps| Ok::<_, BoxError>(*deps.get::<u32>("base")? + 1))
            .build_child(&parent)
            .unwrap();

        assert_eq!(child.config().max_depth, 8);
        assert_eq!(*child.get_sync::<u32>("derived").unwrap(), 11);
        assert!(!parent.test("derived"));
    }

    #[test]
    fn factory_without_dependencies() {
        let container = ContainerBuilder::new()
            .add_factory("n", NO_DEPS, |deps| {
                assert!(deps.is_empty());
                Ok::<_, BoxError>(3i64)
            })
            .build()
            .unwrap();
        assert_eq!(*container.get_required_sync::<i64>("n"), 3);
    }
}
