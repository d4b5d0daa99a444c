//! Lifecycle observers for construction and teardown events.
//!
//! Observers are notified synchronously from the resolving thread or task.
//! Keep implementations lightweight; the built-in [`TracingObserver`]
//! forwards every event to `tracing`.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::ServiceKey;

/// Observer trait for construction and teardown events.
///
/// `resolving` fires when this container starts running the recipe for a
/// key, followed by exactly one of `resolved` or `failed`. Requests answered
/// from the cache, joins of an in-flight construction, and delegations to a
/// parent container do not fire events on this container. `torn_down` fires
/// after each teardown hook that ran successfully during `close()`.
///
/// # Examples
///
/// ```
/// use wirebox::{ContainerBuilder, LifecycleObserver, Resolver, ServiceKey, NO_DEPS};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl LifecycleObserver for Counter {
///     fn resolving(&self, _key: &ServiceKey) {}
///
///     fn resolved(&self, _key: &ServiceKey, _duration: Duration) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// # fn main() -> wirebox::DiResult<()> {
/// let counter = Arc::new(Counter::default());
/// let container = ContainerBuilder::new()
///     .add_observer(counter.clone())
///     .add_factory("n", NO_DEPS, |_| Ok::<_, wirebox::BoxError>(1u8))
///     .build()?;
///
/// container.get_sync::<u8>("n")?;
/// container.get_sync::<u8>("n")?;
/// assert_eq!(counter.0.load(Ordering::SeqCst), 1);
/// # Ok(())
/// # }
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// Called before the recipe for `key` is invoked.
    fn resolving(&self, key: &ServiceKey);

    /// Called after `key` was constructed and cached. `duration` covers
    /// dependency resolution and the recipe itself.
    fn resolved(&self, key: &ServiceKey, duration: Duration);

    /// Called when constructing `key` failed.
    fn failed(&self, key: &ServiceKey, error: &DiError) {
        let _ = (key, error);
    }

    /// Called after the teardown hook for `key` completed.
    fn torn_down(&self, key: &ServiceKey) {
        let _ = key;
    }
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn extend(&mut self, other: Observers) {
        self.observers.extend(other.observers);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &ServiceKey) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &ServiceKey, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    pub(crate) fn failed(&self, key: &ServiceKey, error: &DiError) {
        for observer in &self.observers {
            observer.failed(key, error);
        }
    }

    pub(crate) fn torn_down(&self, key: &ServiceKey) {
        for observer in &self.observers {
            observer.torn_down(key);
        }
    }
}

/// Built-in observer that emits `tracing` events.
///
/// Construction start and finish are logged at `debug`, failures at `warn`,
/// teardown at `info`. Every event carries the container label, so logs
/// from a root container and its request scopes can be told apart.
///
/// # Examples
///
/// ```
/// use wirebox::{ContainerBuilder, TracingObserver};
/// use std::sync::Arc;
///
/// let container = ContainerBuilder::new()
///     .add_observer(Arc::new(TracingObserver::with_label("request")))
///     .build()
///     .unwrap();
/// # drop(container);
/// ```
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    /// Creates an observer labelled `wirebox`.
    pub fn new() -> Self {
        Self {
            label: "wirebox".to_string(),
        }
    }

    /// Creates an observer with a custom container label.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    /// The container label attached to every event.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for TracingObserver {
    fn resolving(&self, key: &ServiceKey) {
        tracing::debug!(container = %self.label, key = %key, "constructing service");
    }

    fn resolved(&self, key: &ServiceKey, duration: Duration) {
        tracing::debug!(
            container = %self.label,
            key = %key,
            elapsed_us = duration.as_micros() as u64,
            "service constructed"
        );
    }

    fn failed(&self, key: &ServiceKey, error: &DiError) {
        tracing::warn!(container = %self.label, key = %key, error = %error, "service construction failed");
    }

    fn torn_down(&self, key: &ServiceKey) {
        tracing::info!(container = %self.label, key = %key, "service torn down");
    }
}
