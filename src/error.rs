//! Error types for the dependency injection container.

use std::error::Error as StdError;
use std::sync::Arc;

use crate::key::ServiceKey;

/// Boxed error returned by user-supplied recipes and teardown hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared form of a user error, so one failure can be handed to every
/// requester that joined the same in-flight construction.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Dependency injection errors
///
/// Represents the error conditions that can occur during registration,
/// resolution, or shutdown. The type is `Clone` because a single
/// construction outcome is fanned out to every concurrent requester.
///
/// # Examples
///
/// ```rust
/// use wirebox::{Container, DiError, Resolver};
///
/// let container = Container::new();
/// match container.get_sync::<String>("missing") {
///     Err(DiError::Unregistered { requested, missing }) => {
///         assert_eq!(requested, "missing");
///         assert_eq!(missing, "missing");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// No definition for `missing` anywhere in the container chain while
    /// resolving `requested`.
    #[error("{}", unregistered_message(.requested, .missing))]
    Unregistered {
        requested: ServiceKey,
        missing: ServiceKey,
    },
    /// Synchronous resolution of `requested` reached `key`, whose recipe or
    /// in-flight construction is asynchronous.
    #[error("{}", async_required_message(.requested, .key))]
    AsyncRequired {
        requested: ServiceKey,
        key: ServiceKey,
    },
    /// A user recipe failed.
    #[error("recipe for \"{key}\" failed: {source}")]
    Recipe {
        key: ServiceKey,
        #[source]
        source: SharedError,
    },
    /// A user teardown hook failed.
    #[error("teardown hook for \"{key}\" failed: {source}")]
    Teardown {
        key: ServiceKey,
        #[source]
        source: SharedError,
    },
    /// Circular dependency detected (includes path)
    #[error("circular dependency: {}", join_path(.0))]
    CycleDetected(Vec<ServiceKey>),
    /// Registration rejected because the key is already defined.
    #[error("service \"{0}\" is already registered")]
    DuplicateRegistration(ServiceKey),
    /// A refinement was resolved on a container without a parent.
    #[error("service \"{0}\" refines a parent service but the container has no parent")]
    NoParent(ServiceKey),
    /// Type downcast failed
    #[error("service \"{key}\" is not a {expected}")]
    TypeMismatch {
        key: ServiceKey,
        expected: &'static str,
    },
    /// Maximum recursion depth exceeded
    #[error("max resolution depth {0} exceeded")]
    DepthExceeded(usize),
    /// An in-flight construction was dropped before completing.
    #[error("construction of \"{0}\" was abandoned before completing")]
    Abandoned(ServiceKey),
    /// Serializing a graph snapshot failed.
    #[error("graph export failed: {0}")]
    Export(String),
    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DiError {
    /// Wraps a user recipe failure.
    pub fn recipe(key: impl Into<ServiceKey>, source: impl Into<BoxError>) -> Self {
        DiError::Recipe {
            key: key.into(),
            source: Arc::from(source.into()),
        }
    }

    /// Wraps a user teardown failure.
    pub fn teardown(key: impl Into<ServiceKey>, source: impl Into<BoxError>) -> Self {
        DiError::Teardown {
            key: key.into(),
            source: Arc::from(source.into()),
        }
    }

    pub(crate) fn unregistered(key: &ServiceKey) -> Self {
        DiError::Unregistered {
            requested: key.clone(),
            missing: key.clone(),
        }
    }

    pub(crate) fn async_required(key: &ServiceKey) -> Self {
        DiError::AsyncRequired {
            requested: key.clone(),
            key: key.clone(),
        }
    }

    /// Re-attributes a dependency failure to the key whose resolution
    /// reached it.
    ///
    /// Applied at every level while the error travels back up the dependency
    /// chain, so the final error names the key the caller originally
    /// requested alongside the key that was actually missing. Other variants
    /// pass through untouched.
    pub(crate) fn requested_by(self, outer: &ServiceKey) -> Self {
        match self {
            DiError::Unregistered { missing, .. } => DiError::Unregistered {
                requested: outer.clone(),
                missing,
            },
            DiError::AsyncRequired { key, .. } => DiError::AsyncRequired {
                requested: outer.clone(),
                key,
            },
            other => other,
        }
    }

    /// Returns the key the caller asked for, where the variant records one.
    pub fn requested_key(&self) -> Option<&ServiceKey> {
        match self {
            DiError::Unregistered { requested, .. } | DiError::AsyncRequired { requested, .. } => {
                Some(requested)
            }
            DiError::Recipe { key, .. }
            | DiError::Teardown { key, .. }
            | DiError::TypeMismatch { key, .. }
            | DiError::DuplicateRegistration(key)
            | DiError::NoParent(key)
            | DiError::Abandoned(key) => Some(key),
            DiError::CycleDetected(path) => path.first(),
            DiError::DepthExceeded(_) | DiError::Export(_) | DiError::Config(_) => None,
        }
    }
}

fn unregistered_message(requested: &ServiceKey, missing: &ServiceKey) -> String {
    if requested == missing {
        format!("no definition for the service \"{}\" was found", missing)
    } else {
        format!(
            "cannot resolve \"{}\": no definition for its dependency \"{}\" was found",
            requested, missing
        )
    }
}

fn async_required_message(requested: &ServiceKey, key: &ServiceKey) -> String {
    if requested == key {
        format!("service \"{}\" can only be resolved asynchronously", key)
    } else {
        format!(
            "cannot resolve \"{}\" synchronously: dependency \"{}\" is asynchronous",
            requested, key
        )
    }
}

fn join_path(path: &[ServiceKey]) -> String {
    path.iter()
        .map(ServiceKey::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout wirebox.
pub type DiResult<T> = Result<T, DiError>;
