//! Shutdown: drain in-flight constructions, then run teardown hooks.

use std::sync::atomic::Ordering;

use futures::future;

use super::Container;
use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;
use crate::recipe::Teardown;

impl Container {
    /// Shuts the container down.
    ///
    /// Waits for every in-flight construction in this container to finish,
    /// surfacing the first construction failure (in which case no hook runs).
    /// Then walks this container's own dependency graph in teardown order,
    /// dependents before the services they depend on, running the teardown
    /// hook of every key whose instance was constructed. Hooks for keys never
    /// requested are skipped, and a parent's services are never touched.
    ///
    /// The first failing hook aborts the walk with
    /// [`DiError::Teardown`]; hooks that already ran are not undone. With
    /// [`ContainerConfig::idempotent_close`](crate::ContainerConfig::idempotent_close)
    /// set (the default), a successful close marks the container closed and
    /// later calls return `Ok(())` without running anything.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirebox::{BoxError, ContainerBuilder, Resolver, ServiceDefinition, NO_DEPS};
    /// use std::sync::{Arc, Mutex};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> wirebox::DiResult<()> {
    /// let calls = Arc::new(Mutex::new(Vec::new()));
    /// let (c1, c2, c3) = (calls.clone(), calls.clone(), calls.clone());
    ///
    /// let container = ContainerBuilder::new()
    ///     .add_definition(
    ///         ServiceDefinition::factory("config", NO_DEPS, |_| Ok::<_, BoxError>(()))
    ///             .with_teardown(move |_: Arc<()>| { c1.lock().unwrap().push("t1"); Ok::<_, BoxError>(()) }),
    ///     )
    ///     .add_definition(
    ///         ServiceDefinition::factory("personRepo", ["config"], |_| Ok::<_, BoxError>(()))
    ///             .with_teardown(move |_: Arc<()>| { c2.lock().unwrap().push("t2"); Ok::<_, BoxError>(()) }),
    ///     )
    ///     .add_definition(
    ///         ServiceDefinition::factory("unused", NO_DEPS, |_| Ok::<_, BoxError>(()))
    ///             .with_teardown(move |_: Arc<()>| { c3.lock().unwrap().push("t3"); Ok::<_, BoxError>(()) }),
    ///     )
    ///     .build()?;
    ///
    /// container.get::<()>("personRepo").await?;
    /// container.close().await?;
    /// assert_eq!(*calls.lock().unwrap(), vec!["t2", "t1"]);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn close(&self) -> DiResult<()> {
        let _serialized = self.inner.close_lock.lock().await;

        if self.inner.config.idempotent_close && self.is_closed() {
            tracing::trace!("container already closed");
            return Ok(());
        }

        self.drain().await?;

        let order = self.inner.registry.read().graph().invert().topological_order();
        tracing::debug!(services = order.len(), "tearing down container");

        for key in order {
            let Some(hook) = self.teardown_hook(&key) else { continue };
            let Some(instance) = self.inner.cache.resolved(&key) else {
                tracing::trace!(key = %key, "skipping teardown of unconstructed service");
                continue;
            };

            tracing::debug!(key = %key, "running teardown hook");
            if let Err(err) = hook.run(instance).await {
                let err = DiError::teardown(key.clone(), err);
                tracing::warn!(key = %key, error = %err, "teardown aborted");
                return Err(err);
            }
            self.inner.observers.torn_down(&key);
        }

        self.inner.closed.store(true, Ordering::Release);
        tracing::debug!("container closed");
        Ok(())
    }

    fn teardown_hook(&self, key: &ServiceKey) -> Option<Teardown> {
        self.inner.registry.read().lookup(key).and_then(|def| def.teardown.clone())
    }

    /// Awaits in-flight constructions until none remain.
    async fn drain(&self) -> DiResult<()> {
        loop {
            let pending = self.inner.cache.pending_handles();
            if pending.is_empty() {
                return Ok(());
            }
            tracing::debug!(count = pending.len(), "draining in-flight constructions");

            let outcomes = future::join_all(pending.into_iter().map(|(_, handle)| handle.wait())).await;
            if let Some(err) = outcomes.into_iter().find_map(Result::err) {
                tracing::warn!(error = %err, "in-flight construction failed during close");
                return Err(err);
            }
        }
    }
}
