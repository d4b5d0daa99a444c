//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g. flushing caches,
/// closing files) and attach it with
/// [`ServiceDefinition::with_dispose`](crate::ServiceDefinition::with_dispose). Hooks run
/// during `close()`, dependents before their dependencies.
///
/// # Examples
///
/// ```
/// use wirebox::{BoxError, ContainerBuilder, Dispose, Resolver, ServiceDefinition, NO_DEPS};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = ContainerBuilder::new()
///     .add_definition(
///         ServiceDefinition::factory("cache", NO_DEPS, |_| {
///             Ok::<_, BoxError>(Cache { flushed: AtomicBool::new(false) })
///         })
///         .with_dispose::<Cache>(),
///     )
///     .build()?;
///
/// let cache = container.get_sync::<Cache>("cache")?;
/// futures::executor::block_on(container.close())?;
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// # Ok(())
/// # }
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal.
///
/// Implement this trait for services that require async teardown (e.g. graceful connection
/// shutdown) and attach it with
/// [`ServiceDefinition::with_async_dispose`](crate::ServiceDefinition::with_async_dispose).
/// `close()` awaits each hook before moving on to the next key.
///
/// # Examples
///
/// ```
/// use wirebox::{AsyncDispose, BoxError, ServiceDefinition};
/// use async_trait::async_trait;
///
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose(&self) {
///         println!("Closing database connection: {}", self.connection_id);
///     }
/// }
///
/// let def = ServiceDefinition::async_factory("db", ["config"], |_deps| async {
///     Ok::<_, BoxError>(DatabaseClient { connection_id: "conn_123".to_string() })
/// })
/// .with_async_dispose::<DatabaseClient>();
/// assert!(def.has_teardown());
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
