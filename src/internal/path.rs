//! Resolution path tracking for circular dependency and depth detection.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;

/// Default recursion limit.
pub(crate) const MAX_DEPTH: usize = 1024;

struct Frame {
    key: ServiceKey,
    depth: usize,
    parent: Option<Arc<Frame>>,
}

/// The chain of keys currently being constructed by one resolution.
///
/// Frames are shared, so a path can be moved into a `'static` construction
/// future and extended there without copying the keys above it. Resolution
/// across a container boundary starts a fresh path: a parent never depends
/// on a child's keys, so no cycle can span two containers.
#[derive(Clone, Default)]
pub(crate) struct ResolutionPath {
    head: Option<Arc<Frame>>,
}

impl ResolutionPath {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn depth(&self) -> usize {
        self.head.as_ref().map_or(0, |f| f.depth)
    }

    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        let mut cur = self.head.as_deref();
        while let Some(frame) = cur {
            if &frame.key == key {
                return true;
            }
            cur = frame.parent.as_deref();
        }
        false
    }

    /// Extends the path with `key`.
    ///
    /// Fails with `CycleDetected` if `key` is already on the path (the error
    /// carries the path from the outermost key down to the repeated one) and
    /// with `DepthExceeded` once `max_depth` frames are active.
    pub(crate) fn enter(&self, key: &ServiceKey, max_depth: usize) -> DiResult<ResolutionPath> {
        if self.contains(key) {
            let mut cycle = self.keys();
            cycle.push(key.clone());
            return Err(DiError::CycleDetected(cycle));
        }

        let depth = self.depth();
        if depth >= max_depth {
            return Err(DiError::DepthExceeded(depth));
        }

        Ok(ResolutionPath {
            head: Some(Arc::new(Frame {
                key: key.clone(),
                depth: depth + 1,
                parent: self.head.clone(),
            })),
        })
    }

    /// Keys on the path, outermost first.
    pub(crate) fn keys(&self) -> Vec<ServiceKey> {
        let mut keys = Vec::with_capacity(self.depth());
        let mut cur = self.head.as_deref();
        while let Some(frame) = cur {
            keys.push(frame.key.clone());
            cur = frame.parent.as_deref();
        }
        keys.reverse();
        keys
    }
}
