//! Construction recipes, teardown hooks and the resolved-value record they exchange.

use std::any::{type_name, Any};
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::{BoxError, DiError, DiResult};
use crate::key::ServiceKey;

/// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type SyncRecipeFn = Arc<dyn Fn(&Resolved) -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type AsyncRecipeFn =
    Arc<dyn Fn(Resolved) -> BoxFuture<'static, Result<AnyArc, BoxError>> + Send + Sync>;
pub(crate) type RefineFn = Arc<dyn Fn(AnyArc) -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type SyncTeardownFn = Arc<dyn Fn(AnyArc) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type AsyncTeardownFn =
    Arc<dyn Fn(AnyArc) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Downcasts a stored instance to its concrete type.
pub(crate) fn downcast<T: Send + Sync + 'static>(key: &ServiceKey, any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>().map_err(|_| DiError::TypeMismatch {
        key: key.clone(),
        expected: type_name::<T>(),
    })
}

/// Ordered record of resolved values, keyed by service key.
///
/// A recipe receives one of these holding its dependencies in declared
/// order; batch resolution returns one holding the requested keys in request
/// order. Values are type-erased; the typed accessors check the concrete
/// type and fail with [`DiError::TypeMismatch`] rather than panicking.
///
/// # Examples
///
/// ```rust
/// use wirebox::{ContainerBuilder, Resolver};
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = ContainerBuilder::new()
///     .add_instance("port", 8080u16)
///     .add_instance("host", "localhost".to_string())
///     .build()?;
///
/// let batch = container.get_many_sync(["host", "port"])?;
/// assert_eq!(*batch.get::<u16>("port")?, 8080);
/// assert_eq!(batch.at::<String>(0)?.as_str(), "localhost");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Resolved {
    entries: Vec<(ServiceKey, AnyArc)>,
}

impl Resolved {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a value; a key already present keeps its first position.
    pub(crate) fn push(&mut self, key: ServiceKey, value: AnyArc) {
        if !self.contains(key.as_str()) {
            self.entries.push((key, value));
        }
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no values are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if a value for `key` is held.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.as_str() == key)
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Type-erased value for `key`.
    pub fn get_any(&self, key: &str) -> Option<&AnyArc> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    /// Value for `key`, downcast to `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> DiResult<Arc<T>> {
        let (k, v) = self
            .entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .ok_or_else(|| DiError::unregistered(&ServiceKey::from(key)))?;
        downcast(k, v.clone())
    }

    /// Value at position `index` (declared or requested order), downcast to `T`.
    pub fn at<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        let (k, v) = self
            .entries
            .get(index)
            .ok_or_else(|| DiError::unregistered(&ServiceKey::from(format!("#{}", index))))?;
        downcast(k, v.clone())
    }

    /// Iterates `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&ServiceKey, &AnyArc)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// A type that can be constructed from its declared dependencies.
///
/// This is the declarative form of a class-style recipe: the type lists the
/// keys it depends on, in constructor-argument order, and builds itself from
/// the resolved values.
///
/// # Examples
///
/// ```rust
/// use wirebox::{BoxError, ContainerBuilder, Injectable, Resolved, Resolver, ServiceKey};
/// use std::sync::Arc;
///
/// struct Config { url: String }
///
/// struct Repo { config: Arc<Config> }
///
/// impl Injectable for Repo {
///     fn dependencies() -> Vec<ServiceKey> {
///         vec!["config".into()]
///     }
///
///     fn construct(deps: &Resolved) -> Result<Self, BoxError> {
///         Ok(Repo { config: deps.at::<Config>(0)? })
///     }
/// }
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = ContainerBuilder::new()
///     .add_instance("config", Config { url: "postgres://localhost".into() })
///     .add_class::<Repo>("repo")
///     .build()?;
///
/// let repo = container.get_sync::<Repo>("repo")?;
/// assert_eq!(repo.config.url, "postgres://localhost");
/// # Ok(())
/// # }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Dependency keys in constructor-argument order.
    fn dependencies() -> Vec<ServiceKey>;

    /// Builds the instance from its resolved dependencies.
    fn construct(deps: &Resolved) -> Result<Self, BoxError>;
}

/// How a definition produces its instance.
#[derive(Clone)]
pub(crate) enum Recipe {
    /// Runs on the caller; used by sync factories and class recipes.
    Sync(SyncRecipeFn),
    /// Returns a future; async factories.
    Async(AsyncRecipeFn),
    /// Resolves the same key from the parent container and derives a local
    /// instance from it.
    Refine(RefineFn),
}

impl Recipe {
    pub(crate) fn sync<T, E, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&Resolved) -> Result<T, E> + Send + Sync + 'static,
    {
        Recipe::Sync(Arc::new(move |deps: &Resolved| {
            f(deps).map(|v| Arc::new(v) as AnyArc).map_err(Into::into)
        }))
    }

    pub(crate) fn asynchronous<T, E, F, Fut>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Resolved) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Recipe::Async(Arc::new(move |deps: Resolved| {
            f(deps)
                .map(|r| r.map(|v| Arc::new(v) as AnyArc).map_err(Into::into))
                .boxed()
        }))
    }

    /// Hands out an already-built instance.
    pub(crate) fn value(value: AnyArc) -> Self {
        Recipe::Sync(Arc::new(move |_: &Resolved| Ok(value.clone())))
    }

    pub(crate) fn class<T: Injectable>() -> Self {
        Recipe::Sync(Arc::new(|deps: &Resolved| {
            T::construct(deps).map(|v| Arc::new(v) as AnyArc)
        }))
    }

    pub(crate) fn refine<T, E, F>(key: ServiceKey, f: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Result<T, E> + Send + Sync + 'static,
    {
        Recipe::Refine(Arc::new(move |parent: AnyArc| {
            let parent = downcast::<T>(&key, parent)?;
            f(parent).map(|v| Arc::new(v) as AnyArc).map_err(Into::into)
        }))
    }
}

/// Cleanup run for a resolved instance during `close()`.
#[derive(Clone)]
pub(crate) enum Teardown {
    Sync(SyncTeardownFn),
    Async(AsyncTeardownFn),
}

impl Teardown {
    pub(crate) fn sync<T, E, F>(key: ServiceKey, f: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Result<(), E> + Send + Sync + 'static,
    {
        Teardown::Sync(Arc::new(move |any: AnyArc| {
            let value = downcast::<T>(&key, any)?;
            f(value).map_err(Into::into)
        }))
    }

    pub(crate) fn asynchronous<T, E, F, Fut>(key: ServiceKey, f: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let f = Arc::new(f);
        Teardown::Async(Arc::new(move |any: AnyArc| {
            let key = key.clone();
            let f = f.clone();
            async move {
                let value = downcast::<T>(&key, any)?;
                f(value).await.map_err(Into::into)
            }
            .boxed()
        }))
    }

    pub(crate) fn is_async(&self) -> bool {
        matches!(self, Teardown::Async(_))
    }

    /// Runs the hook, awaiting it if it is asynchronous.
    pub(crate) async fn run(&self, value: AnyArc) -> Result<(), BoxError> {
        match self {
            Teardown::Sync(f) => f(value),
            Teardown::Async(f) => f(value).await,
        }
    }
}
