//! Memoized, single-flight resolution in blocking and suspending modes.

use std::collections::HashSet;
use std::time::Instant;

use futures::future::{self, BoxFuture, FutureExt};

use super::Container;
use crate::cache::{Claim, PendingGuard, PendingHandle, SlotState};
use crate::descriptors::ServiceDefinition;
use crate::error::{DiError, DiResult};
use crate::internal::ResolutionPath;
use crate::key::ServiceKey;
use crate::kind::ResolveMode;
use crate::recipe::{AnyArc, Recipe, Resolved};
use crate::traits::ResolverCore;

impl Container {
    /// Walks the dependency closure of `key` without constructing anything.
    ///
    /// Fails with the error resolution would hit: a missing definition, a
    /// cycle, a refinement without a parent, or (in sync mode) an async
    /// recipe or in-flight async construction.
    pub(crate) fn check(&self, key: &ServiceKey, mode: ResolveMode) -> DiResult<()> {
        self.check_at(key, mode, &ResolutionPath::new(), &mut HashSet::new())
    }

    fn check_at(
        &self,
        key: &ServiceKey,
        mode: ResolveMode,
        path: &ResolutionPath,
        verified: &mut HashSet<ServiceKey>,
    ) -> DiResult<()> {
        match self.inner.cache.state(key) {
            SlotState::Resolved => return Ok(()),
            SlotState::Pending => {
                let async_pending = self.inner.cache.pending(key).map_or(false, |h| h.is_async());
                if mode == ResolveMode::Sync && async_pending {
                    return Err(DiError::async_required(key));
                }
                return Ok(());
            }
            SlotState::Absent => {}
        }

        let def = match self.definition(key) {
            Some(def) => def,
            None => {
                return match &self.inner.parent {
                    Some(parent) => parent.check(key, mode),
                    None => Err(DiError::unregistered(key)),
                }
            }
        };

        let path = path.enter(key, self.inner.config.max_depth)?;
        if verified.contains(key) {
            return Ok(());
        }

        if mode == ResolveMode::Sync && def.kind.requires_async() {
            return Err(DiError::async_required(key));
        }

        if def.is_refinement() {
            match &self.inner.parent {
                Some(parent) => parent.check(key, mode)?,
                None => return Err(DiError::NoParent(key.clone())),
            }
        }

        for dep in &def.dependencies {
            self.check_at(dep, mode, &path, verified)
                .map_err(|e| e.requested_by(key))?;
        }

        verified.insert(key.clone());
        Ok(())
    }

    // ----- Blocking mode -----

    fn resolve_sync_at(&self, key: &ServiceKey, path: &ResolutionPath) -> DiResult<AnyArc> {
        if let Some(value) = self.inner.cache.resolved(key) {
            return Ok(value);
        }

        let def = match self.definition(key) {
            Some(def) => def,
            None => return self.delegate_sync(key),
        };

        let path = path.enter(key, self.inner.config.max_depth)?;

        let (guard, handle) = PendingGuard::new(&self.inner.cache, key);
        match self.inner.cache.claim(key, handle) {
            Claim::Owner => {}
            Claim::Resolved(value) => return Ok(value),
            Claim::Joined(pending) => {
                drop(guard);
                if pending.is_async() {
                    return Err(DiError::async_required(key));
                }
                if pending.is_owned_by_current_thread() {
                    // A recipe asked for its own key while constructing it.
                    let mut cycle = path.keys();
                    cycle.push(key.clone());
                    return Err(DiError::CycleDetected(cycle));
                }
                tracing::trace!(key = %key, "waiting for in-flight construction");
                return pending.wait_blocking();
            }
        }

        if def.kind.requires_async() {
            return guard.finish(Err(DiError::async_required(key)));
        }

        let started = self.construction_started(key);
        let outcome = self.construct_sync(&def, &path);
        self.construction_finished(key, started, &outcome);
        guard.finish(outcome)
    }

    fn delegate_sync(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        match &self.inner.parent {
            Some(parent) => {
                tracing::trace!(key = %key, "delegating to parent container");
                parent.resolve_sync_at(key, &ResolutionPath::new())
            }
            None => Err(DiError::unregistered(key)),
        }
    }

    fn construct_sync(&self, def: &ServiceDefinition, path: &ResolutionPath) -> DiResult<AnyArc> {
        let key = &def.key;
        match &def.recipe {
            Recipe::Sync(recipe) => {
                let mut deps = Resolved::with_capacity(def.dependencies.len());
                for dep in &def.dependencies {
                    let value = self
                        .resolve_sync_at(dep, path)
                        .map_err(|e| e.requested_by(key))?;
                    deps.push(dep.clone(), value);
                }
                recipe(&deps).map_err(|e| DiError::recipe(key, e))
            }
            Recipe::Refine(refiner) => {
                let parent = self
                    .inner
                    .parent
                    .as_ref()
                    .ok_or_else(|| DiError::NoParent(key.clone()))?;
                let base = parent.resolve_sync_at(key, &ResolutionPath::new())?;
                refiner(base).map_err(|e| DiError::recipe(key, e))
            }
            Recipe::Async(_) => Err(DiError::async_required(key)),
        }
    }

    // ----- Suspending mode -----

    pub(super) fn resolve_async_at(&self, key: ServiceKey, path: ResolutionPath) -> BoxFuture<'static, DiResult<AnyArc>> {
        if let Some(value) = self.inner.cache.resolved(&key) {
            return future::ready(Ok(value)).boxed();
        }

        let def = match self.definition(&key) {
            Some(def) => def,
            None => {
                return match &self.inner.parent {
                    Some(parent) => {
                        tracing::trace!(key = %key, "delegating to parent container");
                        parent.resolve_async_at(key, ResolutionPath::new())
                    }
                    None => future::ready(Err(DiError::unregistered(&key))).boxed(),
                }
            }
        };

        let path = match path.enter(&key, self.inner.config.max_depth) {
            Ok(path) => path,
            Err(err) => return future::ready(Err(err)).boxed(),
        };

        let id = self.inner.cache.next_id();
        let construction = self.clone().construct_async(def, path, id).boxed();
        let handle = PendingHandle::new(id, true, construction);

        match self.inner.cache.claim(&key, handle.clone()) {
            Claim::Owner => handle.wait().boxed(),
            Claim::Resolved(value) => future::ready(Ok(value)).boxed(),
            Claim::Joined(pending) => {
                tracing::trace!(key = %key, "joining in-flight construction");
                pending.wait().boxed()
            }
        }
    }

    async fn construct_async(self, def: ServiceDefinition, path: ResolutionPath, id: u64) -> DiResult<AnyArc> {
        let key = def.key.clone();
        let started = self.construction_started(&key);
        let outcome = self.run_recipe_async(&def, path).await;
        self.construction_finished(&key, started, &outcome);
        match outcome {
            Ok(value) => Ok(self.inner.cache.complete(&key, id, value)),
            Err(err) => {
                self.inner.cache.abandon(&key, id);
                Err(err)
            }
        }
    }

    async fn run_recipe_async(&self, def: &ServiceDefinition, path: ResolutionPath) -> DiResult<AnyArc> {
        let key = &def.key;
        match &def.recipe {
            Recipe::Sync(recipe) => {
                let deps = self.resolve_dependencies(def, &path).await?;
                recipe(&deps).map_err(|e| DiError::recipe(key, e))
            }
            Recipe::Async(recipe) => {
                let deps = self.resolve_dependencies(def, &path).await?;
                recipe(deps).await.map_err(|e| DiError::recipe(key, e))
            }
            Recipe::Refine(refiner) => {
                let parent = self
                    .inner
                    .parent
                    .as_ref()
                    .ok_or_else(|| DiError::NoParent(key.clone()))?;
                let base = parent.resolve_async_at(key.clone(), ResolutionPath::new()).await?;
                refiner(base).map_err(|e| DiError::recipe(key, e))
            }
        }
    }

    /// Resolves declared dependencies one after another, in declared order.
    async fn resolve_dependencies(&self, def: &ServiceDefinition, path: &ResolutionPath) -> DiResult<Resolved> {
        let mut deps = Resolved::with_capacity(def.dependencies.len());
        for dep in &def.dependencies {
            let value = self
                .resolve_async_at(dep.clone(), path.clone())
                .await
                .map_err(|e| e.requested_by(&def.key))?;
            deps.push(dep.clone(), value);
        }
        Ok(deps)
    }

    // ----- Observation -----

    fn construction_started(&self, key: &ServiceKey) -> Instant {
        tracing::trace!(key = %key, "construction started");
        if self.inner.observers.has_observers() {
            self.inner.observers.resolving(key);
        }
        Instant::now()
    }

    fn construction_finished(&self, key: &ServiceKey, started: Instant, outcome: &DiResult<AnyArc>) {
        let elapsed = started.elapsed();
        match outcome {
            Ok(_) => {
                tracing::debug!(key = %key, elapsed_us = elapsed.as_micros() as u64, "service constructed");
                self.inner.observers.resolved(key, elapsed);
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "service construction failed");
                self.inner.observers.failed(key, err);
            }
        }
    }
}

impl ResolverCore for Container {
    fn resolve_any_sync(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        if let Some(value) = self.inner.cache.resolved(key) {
            return Ok(value);
        }
        self.check(key, ResolveMode::Sync)?;
        self.resolve_sync_at(key, &ResolutionPath::new())
    }

    fn resolve_any(&self, key: &ServiceKey) -> BoxFuture<'static, DiResult<AnyArc>> {
        let this = self.clone();
        let key = key.clone();
        async move {
            if let Some(value) = this.inner.cache.resolved(&key) {
                return Ok(value);
            }
            this.check(&key, ResolveMode::Async)?;
            this.resolve_async_at(key, ResolutionPath::new()).await
        }
        .boxed()
    }

    fn resolve_batch_sync(&self, keys: &[ServiceKey]) -> DiResult<Resolved> {
        let mut out = Resolved::with_capacity(keys.len());
        for key in keys {
            if !out.contains(key.as_str()) {
                let value = self.resolve_any_sync(key)?;
                out.push(key.clone(), value);
            }
        }
        Ok(out)
    }

    fn resolve_batch(&self, keys: Vec<ServiceKey>) -> BoxFuture<'static, DiResult<Resolved>> {
        let mut unique: Vec<ServiceKey> = Vec::with_capacity(keys.len());
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        let pending: Vec<_> = unique.iter().map(|key| self.resolve_any(key)).collect();

        async move {
            let values = future::try_join_all(pending).await?;
            let mut out = Resolved::with_capacity(unique.len());
            for (key, value) in unique.into_iter().zip(values) {
                out.push(key, value);
            }
            Ok(out)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::key::NO_DEPS;
    use crate::traits::Resolver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(container: &Container, key: &str, deps: &[&str], counter: Arc<AtomicUsize>) {
        container
            .register(ServiceDefinition::factory(key, deps.iter().copied(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }))
            .unwrap();
    }

    #[test]
    fn check_reports_cycles_with_path() {
        let container = Container::new();
        let n = Arc::new(AtomicUsize::new(0));
        counting(&container, "a", &["b"], n.clone());
        counting(&container, "b", &["a"], n.clone());

        match container.check(&"a".into(), ResolveMode::Async) {
            Err(DiError::CycleDetected(path)) => {
                let names: Vec<_> = path.iter().map(ServiceKey::as_str).collect();
                assert_eq!(names, vec!["a", "b", "a"]);
            }
            other => panic!("Expected CycleDetected, got {:?}", other),
        }
        assert!(container.get_sync::<()>("a").is_err());
        assert_eq!(n.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn check_attributes_missing_dependency() {
        let container = Container::new();
        counting(&container, "personRepo", &["config"], Arc::new(AtomicUsize::new(0)));

        match container.check(&"personRepo".into(), ResolveMode::Sync) {
            Err(DiError::Unregistered { requested, missing }) => {
                assert_eq!(requested, "personRepo");
                assert_eq!(missing, "config");
            }
            other => panic!("Expected Unregistered, got {:?}", other),
        }
    }

    #[test]
    fn shared_subgraph_checked_once() {
        let container = Container::new();
        let n = Arc::new(AtomicUsize::new(0));
        counting(&container, "top", &["left", "right"], n.clone());
        counting(&container, "left", &["shared"], n.clone());
        counting(&container, "right", &["shared"], n.clone());
        counting(&container, "shared", &[], n.clone());

        assert!(container.check(&"top".into(), ResolveMode::Sync).is_ok());
        container.get_sync::<()>("top").unwrap();
        assert_eq!(n.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn depth_limit_applies() {
        let container = Container::with_config(crate::ContainerConfig {
            max_depth: 3,
            ..Default::default()
        });
        for (key, dep) in [("a", "b"), ("b", "c"), ("c", "d")] {
            container
                .register(ServiceDefinition::factory(key, [dep], |_| Ok::<_, BoxError>(())))
                .unwrap();
        }
        container
            .register(ServiceDefinition::factory("d", NO_DEPS, |_| Ok::<_, BoxError>(())))
            .unwrap();

        assert!(matches!(container.get_sync::<()>("a"), Err(DiError::DepthExceeded(3))));
        assert!(container.get_sync::<()>("b").is_ok());
    }

    #[test]
    fn sync_mode_refuses_async_pending_slot() {
        let container = Container::new();
        container
            .register(ServiceDefinition::factory("slow", NO_DEPS, |_| Ok::<_, BoxError>(1u8)))
            .unwrap();

        // Claim the slot as an async construction that has not been polled.
        let key = ServiceKey::from("slow");
        let _pending = container.resolve_async_at(key.clone(), ResolutionPath::new());
        assert_eq!(container.slot_state("slow"), SlotState::Pending);

        assert!(matches!(
            container.get_sync::<u8>("slow"),
            Err(DiError::AsyncRequired { .. })
        ));
    }

    #[tokio::test]
    async fn async_mode_constructs_sync_kinds() {
        let container = Container::new();
        container
            .register(ServiceDefinition::factory("n", NO_DEPS, |_| Ok::<_, BoxError>(5u32)))
            .unwrap();
        container
            .register(ServiceDefinition::async_factory("double", ["n"], |deps| async move {
                Ok::<_, BoxError>(*deps.get::<u32>("n")? * 2)
            }))
            .unwrap();

        assert_eq!(*container.get::<u32>("double").await.unwrap(), 10);
        assert_eq!(container.slot_state("n"), SlotState::Resolved);
    }
}
