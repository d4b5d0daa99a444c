//! Service definitions and descriptors for introspection and diagnostics.

use std::future::Future;
use std::sync::Arc;

use crate::cache::SlotState;
use crate::error::BoxError;
use crate::key::{keys_of, ServiceKey};
use crate::kind::ServiceKind;
use crate::recipe::{Injectable, Recipe, Resolved, Teardown};
use crate::traits::{AsyncDispose, Dispose};

/// Everything the container knows about one service key.
///
/// A definition is immutable once registered: its kind, its ordered
/// dependency keys, its recipe and its optional teardown hook. The
/// dependency list is explicit and order-significant; it is both the edge
/// set fed into the container's dependency graph and the argument order the
/// recipe receives.
///
/// # Examples
///
/// ```rust
/// use wirebox::{BoxError, ServiceDefinition, ServiceKind, NO_DEPS};
///
/// struct Config { user: String }
/// struct PersonRepo { owner: String }
///
/// let config = ServiceDefinition::factory("config", NO_DEPS, |_| {
///     Ok::<_, BoxError>(Config { user: "admin".into() })
/// })
/// .with_teardown(|_cfg: std::sync::Arc<Config>| Ok::<_, BoxError>(()));
///
/// let repo = ServiceDefinition::factory("personRepo", ["config"], |deps| {
///     let config = deps.get::<Config>("config")?;
///     Ok::<_, BoxError>(PersonRepo { owner: config.user.clone() })
/// });
///
/// assert_eq!(config.kind(), ServiceKind::SyncFactory);
/// assert!(config.has_teardown());
/// assert_eq!(repo.dependencies()[0], "config");
/// ```
#[derive(Clone)]
pub struct ServiceDefinition {
    pub(crate) key: ServiceKey,
    pub(crate) kind: ServiceKind,
    pub(crate) dependencies: Vec<ServiceKey>,
    pub(crate) recipe: Recipe,
    pub(crate) teardown: Option<Teardown>,
    pub(crate) type_name: &'static str,
}

impl ServiceDefinition {
    /// A pre-built instance with no dependencies.
    pub fn instance<T: Send + Sync + 'static>(key: impl Into<ServiceKey>, value: T) -> Self {
        Self::shared_instance(key, Arc::new(value))
    }

    /// A pre-built shared instance with no dependencies.
    pub fn shared_instance<T: Send + Sync + 'static>(key: impl Into<ServiceKey>, value: Arc<T>) -> Self {
        Self {
            key: key.into(),
            kind: ServiceKind::SyncFactory,
            dependencies: Vec::new(),
            recipe: Recipe::value(value),
            teardown: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// A synchronous factory invoked with its dependencies in declared order.
    pub fn factory<T, E, F, I, K>(key: impl Into<ServiceKey>, dependencies: I, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&Resolved) -> Result<T, E> + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: Into<ServiceKey>,
    {
        Self {
            key: key.into(),
            kind: ServiceKind::SyncFactory,
            dependencies: keys_of(dependencies),
            recipe: Recipe::sync(factory),
            teardown: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// An asynchronous factory; only asynchronous resolution can construct it.
    pub fn async_factory<T, E, F, Fut, I, K>(
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
        Self {
            key: key.into(),
            kind: ServiceKind::AsyncFactory,
            dependencies: keys_of(dependencies),
            recipe: Recipe::asynchronous(factory),
            teardown: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// A class-style recipe: `T` declares its dependencies and constructs
    /// itself from them.
    pub fn class<T: Injectable>(key: impl Into<ServiceKey>) -> Self {
        Self {
            key: key.into(),
            kind: ServiceKind::ClassRecipe,
            dependencies: T::dependencies(),
            recipe: Recipe::class::<T>(),
            teardown: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// A local override of a parent-provided service.
    ///
    /// At resolution time the same key is resolved from the parent container
    /// and `refiner` derives this container's instance from it. The parent's
    /// instance is left untouched.
    pub fn refinement<T, E, F>(key: impl Into<ServiceKey>, refiner: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Result<T, E> + Send + Sync + 'static,
    {
        let key = key.into();
        Self {
            recipe: Recipe::refine(key.clone(), refiner),
            key,
            kind: ServiceKind::SyncFactory,
            dependencies: Vec::new(),
            teardown: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Attaches a synchronous teardown hook.
    pub fn with_teardown<T, E, F>(mut self, hook: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.teardown = Some(Teardown::sync(self.key.clone(), hook));
        self
    }

    /// Attaches an asynchronous teardown hook; `close()` awaits it before
    /// moving on to the next key.
    pub fn with_async_teardown<T, E, F, Fut>(mut self, hook: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.teardown = Some(Teardown::asynchronous(self.key.clone(), hook));
        self
    }

    /// Uses the instance's [`Dispose`] implementation as its teardown hook.
    pub fn with_dispose<T: Dispose>(self) -> Self {
        self.with_teardown(|service: Arc<T>| {
            service.dispose();
            Ok::<_, BoxError>(())
        })
    }

    /// Uses the instance's [`AsyncDispose`] implementation as its teardown hook.
    pub fn with_async_dispose<T: AsyncDispose>(self) -> Self {
        self.with_async_teardown(|service: Arc<T>| async move {
            service.dispose().await;
            Ok::<_, BoxError>(())
        })
    }

    /// The service key.
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// The recipe kind.
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Dependency keys in declared order.
    pub fn dependencies(&self) -> &[ServiceKey] {
        &self.dependencies
    }

    /// True if a teardown hook is attached.
    pub fn has_teardown(&self) -> bool {
        self.teardown.is_some()
    }

    /// True if this definition refines a parent-provided service.
    pub fn is_refinement(&self) -> bool {
        matches!(self.recipe, Recipe::Refine(_))
    }

    /// Name of the concrete instance type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies)
            .field("teardown", &self.teardown.as_ref().map(|t| if t.is_async() { "async" } else { "sync" }))
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Service descriptor for introspection and diagnostics
///
/// A snapshot of one locally registered service together with the current
/// state of its instance slot, as returned by
/// [`Container::descriptors`](crate::Container::descriptors).
///
/// # Examples
///
/// ```rust
/// use wirebox::{ContainerBuilder, Resolver, ServiceKind, SlotState, NO_DEPS};
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = ContainerBuilder::new()
///     .add_factory("answer", NO_DEPS, |_| Ok::<_, wirebox::BoxError>(42u32))
///     .build()?;
///
/// let before = container.descriptors();
/// assert_eq!(before[0].state, SlotState::Absent);
///
/// container.get_sync::<u32>("answer")?;
/// let after = container.descriptors();
/// assert_eq!(after[0].kind, ServiceKind::SyncFactory);
/// assert_eq!(after[0].state, SlotState::Resolved);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ServiceDescriptor {
    /// The service key
    pub key: ServiceKey,
    /// Recipe kind
    pub kind: ServiceKind,
    /// Dependency keys in declared order
    pub dependencies: Vec<ServiceKey>,
    /// Whether a teardown hook is attached
    pub has_teardown: bool,
    /// Whether the definition refines a parent-provided service
    pub is_refinement: bool,
    /// Concrete instance type name
    pub type_name: &'static str,
    /// State of the instance slot in the owning container
    pub state: SlotState,
}

impl ServiceDescriptor {
    pub(crate) fn from_definition(def: &ServiceDefinition, state: SlotState) -> Self {
        Self {
            key: def.key.clone(),
            kind: def.kind,
            dependencies: def.dependencies.clone(),
            has_teardown: def.has_teardown(),
            is_refinement: def.is_refinement(),
            type_name: def.type_name,
            state,
        }
    }

    /// True if the instance may only be constructed asynchronously.
    pub fn requires_async(&self) -> bool {
        self.kind.requires_async()
    }
}
