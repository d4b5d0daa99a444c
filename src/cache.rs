//! Per-container instance cache: resolved slots and in-flight construction handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;
use crate::recipe::AnyArc;

/// Observable state of one instance slot.
///
/// A slot moves `Absent -> Pending -> Resolved`. A failed construction moves
/// it back to `Absent`; `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SlotState {
    /// Never requested, or the last construction failed.
    Absent,
    /// A construction is in flight.
    Pending,
    /// An instance is cached.
    Resolved,
}

pub(crate) type SharedConstruction = Shared<BoxFuture<'static, DiResult<AnyArc>>>;

/// Handle to an in-flight construction that any number of requesters can await.
#[derive(Clone)]
pub(crate) struct PendingHandle {
    id: u64,
    is_async: bool,
    /// Thread running a blocking construction.
    owner: Option<ThreadId>,
    future: SharedConstruction,
}

impl PendingHandle {
    pub(crate) fn new(id: u64, is_async: bool, future: BoxFuture<'static, DiResult<AnyArc>>) -> Self {
        Self {
            id,
            is_async,
            owner: None,
            future: future.shared(),
        }
    }

    fn owned_by(mut self, thread: ThreadId) -> Self {
        self.owner = Some(thread);
        self
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// True if the construction can suspend, so only an async requester may join it.
    pub(crate) fn is_async(&self) -> bool {
        self.is_async
    }

    /// True if the construction is a blocking one running on this thread.
    ///
    /// Blocking on such a handle would wait on the caller's own recipe.
    pub(crate) fn is_owned_by_current_thread(&self) -> bool {
        self.owner == Some(thread::current().id())
    }

    pub(crate) async fn wait(self) -> DiResult<AnyArc> {
        self.future.await
    }

    /// Blocks the current thread until the construction completes.
    pub(crate) fn wait_blocking(self) -> DiResult<AnyArc> {
        futures::executor::block_on(self.future)
    }
}

#[derive(Clone)]
enum Slot {
    Pending(PendingHandle),
    Resolved(AnyArc),
}

/// Outcome of [`InstanceCache::claim`].
pub(crate) enum Claim {
    /// The caller's handle was published; the caller must construct.
    Owner,
    /// Already constructed.
    Resolved(AnyArc),
    /// Another construction is in flight.
    Joined(PendingHandle),
}

#[derive(Default)]
pub(crate) struct InstanceCache {
    slots: Mutex<HashMap<ServiceKey, Slot>>,
    next_id: AtomicU64,
}

impl InstanceCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn state(&self, key: &ServiceKey) -> SlotState {
        match self.slots.lock().get(key) {
            None => SlotState::Absent,
            Some(Slot::Pending(_)) => SlotState::Pending,
            Some(Slot::Resolved(_)) => SlotState::Resolved,
        }
    }

    pub(crate) fn resolved(&self, key: &ServiceKey) -> Option<AnyArc> {
        match self.slots.lock().get(key) {
            Some(Slot::Resolved(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn pending(&self, key: &ServiceKey) -> Option<PendingHandle> {
        match self.slots.lock().get(key) {
            Some(Slot::Pending(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Atomically checks the slot for `key` and, if it is absent, publishes
    /// `handle` as its pending construction.
    pub(crate) fn claim(&self, key: &ServiceKey, handle: PendingHandle) -> Claim {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(Slot::Resolved(value)) => Claim::Resolved(value.clone()),
            Some(Slot::Pending(existing)) => Claim::Joined(existing.clone()),
            None => {
                slots.insert(key.clone(), Slot::Pending(handle));
                Claim::Owner
            }
        }
    }

    /// Replaces the pending handle `id` with the constructed value.
    ///
    /// Returns the value now cached for `key`: `value` itself, or whatever
    /// was seeded over the pending slot while the construction ran.
    pub(crate) fn complete(&self, key: &ServiceKey, id: u64, value: AnyArc) -> AnyArc {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(Slot::Pending(handle)) if handle.id() == id => {
                slots.insert(key.clone(), Slot::Resolved(value.clone()));
                value
            }
            Some(Slot::Resolved(existing)) => existing.clone(),
            _ => value,
        }
    }

    /// Removes the pending handle `id` so the next request constructs from scratch.
    pub(crate) fn abandon(&self, key: &ServiceKey, id: u64) {
        let mut slots = self.slots.lock();
        if matches!(slots.get(key), Some(Slot::Pending(handle)) if handle.id() == id) {
            slots.remove(key);
        }
    }

    /// Stores `value` as the resolved instance for `key` unless the slot is
    /// already resolved, returning the slot's previous state.
    ///
    /// A resolved slot is never replaced; `value` is dropped in that case.
    pub(crate) fn seed(&self, key: ServiceKey, value: AnyArc) -> SlotState {
        let mut slots = self.slots.lock();
        let previous = match slots.get(&key) {
            Some(Slot::Resolved(_)) => return SlotState::Resolved,
            Some(Slot::Pending(_)) => SlotState::Pending,
            None => SlotState::Absent,
        };
        slots.insert(key, Slot::Resolved(value));
        previous
    }

    /// Snapshot of every in-flight construction.
    pub(crate) fn pending_handles(&self) -> Vec<(ServiceKey, PendingHandle)> {
        self.slots
            .lock()
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Pending(handle) => Some((key.clone(), handle.clone())),
                Slot::Resolved(_) => None,
            })
            .collect()
    }

    pub(crate) fn resolved_count(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }
}

/// Ownership of a pending slot claimed by a synchronous construction.
///
/// The slot's handle is backed by a oneshot channel, so requesters on other
/// threads block on it while this thread runs the recipe. Dropping the guard
/// without calling [`finish`](Self::finish), e.g. because the recipe
/// panicked, clears the slot and fails every joiner with
/// [`DiError::Abandoned`].
pub(crate) struct PendingGuard<'a> {
    cache: &'a InstanceCache,
    key: ServiceKey,
    id: u64,
    tx: Option<oneshot::Sender<DiResult<AnyArc>>>,
}

impl<'a> PendingGuard<'a> {
    /// Creates the guard and the handle to publish through [`InstanceCache::claim`].
    pub(crate) fn new(cache: &'a InstanceCache, key: &ServiceKey) -> (Self, PendingHandle) {
        let id = cache.next_id();
        let (tx, rx) = oneshot::channel::<DiResult<AnyArc>>();
        let abandoned = key.clone();
        let handle = PendingHandle::new(
            id,
            false,
            rx.map(move |received| received.unwrap_or_else(|_| Err(DiError::Abandoned(abandoned))))
                .boxed(),
        )
        .owned_by(thread::current().id());
        let guard = Self {
            cache,
            key: key.clone(),
            id,
            tx: Some(tx),
        };
        (guard, handle)
    }

    /// Publishes the outcome to the cache and to every joiner.
    pub(crate) fn finish(mut self, outcome: DiResult<AnyArc>) -> DiResult<AnyArc> {
        let outcome = match outcome {
            Ok(value) => Ok(self.cache.complete(&self.key, self.id, value)),
            Err(err) => {
                self.cache.abandon(&self.key, self.id);
                Err(err)
            }
        };
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(outcome.clone());
        }
        outcome
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            self.cache.abandon(&self.key, self.id);
        }
    }
}
