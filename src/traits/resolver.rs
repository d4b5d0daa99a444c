//! Resolver traits for service resolution.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::DiResult;
use crate::key::{keys_of, ServiceKey};
use crate::recipe::{downcast, AnyArc, Resolved};

/// Core resolver trait for object-safe service resolution.
///
/// The two modes of one algorithm: [`resolve_any_sync`](Self::resolve_any_sync)
/// never suspends and fails with
/// [`DiError::AsyncRequired`](crate::DiError::AsyncRequired) where the
/// suspending mode would have to wait, while [`resolve_any`](Self::resolve_any)
/// returns a `'static` future that may await asynchronous recipes and join
/// constructions already in flight.
///
/// Most users should use the [`Resolver`] trait instead, which provides
/// typed methods built on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves `key` without suspending.
    fn resolve_any_sync(&self, key: &ServiceKey) -> DiResult<AnyArc>;

    /// Resolves `key`, suspending on asynchronous work.
    fn resolve_any(&self, key: &ServiceKey) -> BoxFuture<'static, DiResult<AnyArc>>;

    /// Resolves every key without suspending, in request order.
    fn resolve_batch_sync(&self, keys: &[ServiceKey]) -> DiResult<Resolved>;

    /// Resolves every key concurrently. A dependency shared by several
    /// requested keys is constructed once.
    fn resolve_batch(&self, keys: Vec<ServiceKey>) -> BoxFuture<'static, DiResult<Resolved>>;
}

/// High-level resolver interface with typed methods.
///
/// Implemented for every [`ResolverCore`], so [`Container`](crate::Container)
/// gets it for free.
///
/// # Examples
///
/// ```
/// use wirebox::{BoxError, ContainerBuilder, Resolver};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> wirebox::DiResult<()> {
/// let container = ContainerBuilder::new()
///     .add_instance("greeting", "hello".to_string())
///     .add_async_factory("shout", ["greeting"], |deps| async move {
///         let greeting = deps.get::<String>("greeting")?;
///         Ok::<_, BoxError>(greeting.to_uppercase())
///     })
///     .build()?;
///
/// let shout = container.get::<String>("shout").await?;
/// assert_eq!(shout.as_str(), "HELLO");
///
/// // Already constructed, so the blocking mode can read it too.
/// assert!(container.get_sync::<String>("shout").is_ok());
/// # Ok(())
/// # }
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves and downcasts `key`, suspending on asynchronous work.
    fn get<T>(&self, key: impl Into<ServiceKey>) -> BoxFuture<'static, DiResult<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let resolving = self.resolve_any(&key);
        async move { downcast(&key, resolving.await?) }.boxed()
    }

    /// Resolves and downcasts `key` without suspending.
    fn get_sync<T>(&self, key: impl Into<ServiceKey>) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let value = self.resolve_any_sync(&key)?;
        downcast(&key, value)
    }

    /// Resolves several keys at once, suspending on asynchronous work.
    fn get_many<I, K>(&self, keys: I) -> BoxFuture<'static, DiResult<Resolved>>
    where
        I: IntoIterator<Item = K>,
        K: Into<ServiceKey>,
    {
        self.resolve_batch(keys_of(keys))
    }

    /// Resolves several keys at once without suspending.
    fn get_many_sync<I, K>(&self, keys: I) -> DiResult<Resolved>
    where
        I: IntoIterator<Item = K>,
        K: Into<ServiceKey>,
    {
        self.resolve_batch_sync(&keys_of(keys))
    }

    /// Resolves `key` without suspending, panicking on failure.
    ///
    /// Intended for tests and composition roots where a missing service is
    /// a programming error.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error's message if `key` cannot be resolved
    /// synchronously as a `T`.
    fn get_required_sync<T>(&self, key: impl Into<ServiceKey>) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        match self.get_sync(key) {
            Ok(value) => value,
            Err(err) => panic!("required service could not be resolved: {}", err),
        }
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
