//! Service key types for the dependency injection container.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Key identifying a service within one container's registration scope.
///
/// Keys are plain names (`"config"`, `"personRepo"`) backed by a shared
/// `Arc<str>`, so cloning a key while walking the dependency graph or
/// publishing pending handles never copies the string.
///
/// # Examples
///
/// ```rust
/// use wirebox::ServiceKey;
///
/// let a = ServiceKey::from("config");
/// let b: ServiceKey = "config".into();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "config");
/// assert_eq!(a, "config");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ServiceKey(Arc<str>);

impl ServiceKey {
    /// Creates a key from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ServiceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServiceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServiceKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&String> for ServiceKey {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<&ServiceKey> for ServiceKey {
    fn from(key: &ServiceKey) -> Self {
        key.clone()
    }
}

impl PartialEq<str> for ServiceKey {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ServiceKey {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Empty dependency list for services that depend on nothing.
///
/// ```rust
/// use wirebox::{BoxError, ServiceDefinition, NO_DEPS};
///
/// let def = ServiceDefinition::factory("clock", NO_DEPS, |_| Ok::<_, BoxError>(0u64));
/// assert!(def.dependencies().is_empty());
/// ```
pub const NO_DEPS: [&str; 0] = [];

/// Collects anything iterable over key-like values into an ordered key list.
pub(crate) fn keys_of<I, K>(keys: I) -> Vec<ServiceKey>
where
    I: IntoIterator<Item = K>,
    K: Into<ServiceKey>,
{
    keys.into_iter().map(Into::into).collect()
}
