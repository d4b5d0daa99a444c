//! # wirebox
//!
//! Named-service dependency injection with lazy, single-flight construction,
//! synchronous and asynchronous resolution, hierarchical containers, and
//! dependency-ordered teardown.
//!
//! ## Features
//!
//! - **Explicit dependencies**: every service declares the keys it depends on, in recipe-argument order
//! - **Singleton per container**: a key is constructed at most once per container, even under concurrent requests
//! - **Dual-mode resolution**: `get_sync` never suspends; `get` awaits async factories and in-flight constructions
//! - **Container hierarchy**: children delegate unknown keys to their parent and can refine parent services locally
//! - **Ordered shutdown**: `close()` drains in-flight work, then tears dependents down before their dependencies
//! - **Cycle detection**: circular dependencies fail with the offending path instead of recursing forever
//!
//! ## Quick Start
//!
//! ```rust
//! use wirebox::{BoxError, ContainerBuilder, Resolver, ServiceDefinition, NO_DEPS};
//! use std::sync::Arc;
//!
//! struct Config { database_url: String }
//! struct PersonRepo { config: Arc<Config> }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> wirebox::DiResult<()> {
//! let container = ContainerBuilder::new()
//!     .add_factory("config", NO_DEPS, |_| {
//!         Ok::<_, BoxError>(Config { database_url: "postgres://localhost".into() })
//!     })
//!     .add_definition(
//!         ServiceDefinition::async_factory("personRepo", ["config"], |deps| async move {
//!             Ok::<_, BoxError>(PersonRepo { config: deps.get::<Config>("config")? })
//!         })
//!         .with_async_teardown(|_repo: Arc<PersonRepo>| async { Ok::<_, BoxError>(()) }),
//!     )
//!     .build()?;
//!
//! let repo = container.get::<PersonRepo>("personRepo").await?;
//! assert_eq!(repo.config.database_url, "postgres://localhost");
//!
//! container.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Resolution modes
//!
//! A service built by an async factory, or depending on one at any depth,
//! can only be constructed by `get`. Asking `get_sync` for it fails with
//! [`DiError::AsyncRequired`] before any recipe runs:
//!
//! ```rust
//! use wirebox::{BoxError, ContainerBuilder, DiError, Resolver};
//!
//! let container = ContainerBuilder::new()
//!     .add_async_factory("db", ["url"], |_| async { Ok::<_, BoxError>(()) })
//!     .add_factory("repo", ["db"], |_| Ok::<_, BoxError>(()))
//!     .add_instance("url", "postgres://localhost".to_string())
//!     .build()
//!     .unwrap();
//!
//! match container.get_sync::<()>("repo") {
//!     Err(DiError::AsyncRequired { requested, key }) => {
//!         assert_eq!(requested, "repo");
//!         assert_eq!(key, "db");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

// Module declarations
pub mod cache;
pub mod config;
pub mod container;
pub mod descriptors;
pub mod error;
pub mod graph;
pub mod key;
pub mod kind;
pub mod observer;
pub mod recipe;
pub mod traits;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use cache::SlotState;
pub use config::{ContainerConfig, DuplicatePolicy};
pub use container::{Container, ContainerBuilder, ValidationReport};
pub use descriptors::{ServiceDefinition, ServiceDescriptor};
pub use error::{BoxError, DiError, DiResult};
pub use graph::{DependencyGraph, ExportFormat, GraphEdge, GraphMetadata, GraphNode, GraphSnapshot};
pub use key::{ServiceKey, NO_DEPS};
pub use kind::ServiceKind;
pub use observer::{LifecycleObserver, TracingObserver};
pub use recipe::{AnyArc, Injectable, Resolved};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
