//! Dry-run checks: can a key be resolved, and in which mode.

use super::Container;
use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;
use crate::kind::ResolveMode;

impl Container {
    /// True if `key` and every transitive dependency can be found in this
    /// container chain, with no cycle. Nothing is constructed.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirebox::{BoxError, ContainerBuilder};
    ///
    /// # fn main() -> wirebox::DiResult<()> {
    /// let container = ContainerBuilder::new()
    ///     .add_factory("personRepo", ["config"], |_| Ok::<_, BoxError>(()))
    ///     .add_async_factory("db", ["config"], |_| async { Ok::<_, BoxError>(()) })
    ///     .build()?;
    /// assert!(!container.test("personRepo"));
    ///
    /// container.set("config", "admin".to_string());
    /// assert!(container.test("personRepo"));
    /// assert!(container.test("db"));
    /// assert!(!container.test_sync("db"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn test(&self, key: impl Into<ServiceKey>) -> bool {
        self.check(&key.into(), ResolveMode::Async).is_ok()
    }

    /// As [`test`](Self::test), and additionally false if `key` or anything
    /// it transitively depends on can only be constructed asynchronously.
    pub fn test_sync(&self, key: impl Into<ServiceKey>) -> bool {
        self.check(&key.into(), ResolveMode::Sync).is_ok()
    }

    /// Checks every locally registered key, collecting the failures.
    pub fn validate(&self) -> ValidationReport {
        let keys: Vec<ServiceKey> = self.inner.registry.read().iter().map(|d| d.key.clone()).collect();
        let mut report = ValidationReport {
            checked: keys.len(),
            failures: Vec::new(),
            async_only: Vec::new(),
        };

        for key in keys {
            if let Err(err) = self.check(&key, ResolveMode::Async) {
                report.failures.push((key, err));
            } else if let Err(DiError::AsyncRequired { .. }) = self.check(&key, ResolveMode::Sync) {
                report.async_only.push(key);
            }
        }

        tracing::debug!(
            checked = report.checked,
            failures = report.failures.len(),
            "validated container"
        );
        report
    }
}

/// Outcome of [`Container::validate`].
#[derive(Debug, Clone)]
pub struct ValidationReport {
    checked: usize,
    failures: Vec<(ServiceKey, DiError)>,
    async_only: Vec<ServiceKey>,
}

impl ValidationReport {
    /// True if every registered key can be resolved.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of keys checked.
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// Keys that cannot be resolved, with the error resolution would hit.
    pub fn failures(&self) -> &[(ServiceKey, DiError)] {
        &self.failures
    }

    /// Resolvable keys that only asynchronous resolution can construct.
    pub fn async_only(&self) -> &[ServiceKey] {
        &self.async_only
    }

    /// The first failure, if any.
    pub fn into_result(self) -> DiResult<()> {
        match self.failures.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }
}
