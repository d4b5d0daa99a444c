//! Service kind definitions.

use std::fmt;

/// How a service's recipe produces its instance.
///
/// The kind decides which resolution modes can construct the service:
/// synchronous resolution can construct `SyncFactory` and `ClassRecipe`
/// services, while an `AsyncFactory` service (or anything depending on one,
/// directly or transitively) can only be constructed by asynchronous
/// resolution.
///
/// # Examples
///
/// ```rust
/// use wirebox::ServiceKind;
///
/// assert!(ServiceKind::AsyncFactory.requires_async());
/// assert!(!ServiceKind::SyncFactory.requires_async());
/// assert!(!ServiceKind::ClassRecipe.requires_async());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServiceKind {
    /// Function invoked with the resolved dependencies, returning the instance
    /// on the caller's thread.
    SyncFactory,
    /// Function invoked with the resolved dependencies, returning a future
    /// that yields the instance.
    AsyncFactory,
    /// Type constructed from its declared dependencies via [`Injectable`](crate::Injectable).
    ClassRecipe,
}

impl ServiceKind {
    /// Returns true if constructing this kind may suspend.
    #[inline]
    pub fn requires_async(self) -> bool {
        matches!(self, ServiceKind::AsyncFactory)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceKind::SyncFactory => "sync-factory",
            ServiceKind::AsyncFactory => "async-factory",
            ServiceKind::ClassRecipe => "class",
        };
        f.write_str(name)
    }
}

/// The two resolution modes of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolveMode {
    /// Blocking resolution; never suspends.
    Sync,
    /// Suspending resolution; may await dependencies and async recipes.
    Async,
}
