//! Shutdown Order Demo - dependency-ordered teardown of a small service graph
//!
//! This example demonstrates:
//! - Async factories for services that need network handshakes
//! - Teardown hooks attached to definitions
//! - `close()` tearing dependents down before their dependencies
//! - Services that were never requested being skipped at shutdown
//! - The built-in `TracingObserver` reporting construction and teardown
//!
//! Run with `RUST_LOG=debug cargo run --example shutdown_order` to see the
//! container's own tracing output.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use wirebox::*;

struct Config {
    database_url: String,
    cache_ttl: Duration,
}

struct Database {
    url: String,
}

impl Database {
    async fn connect(url: &str) -> Result<Self, BoxError> {
        println!("connecting to {}", url);
        sleep(Duration::from_millis(50)).await;
        if url.contains("invalid") {
            return Err("invalid connection string".into());
        }
        Ok(Self { url: url.to_string() })
    }
}

struct Cache {
    ttl: Duration,
}

struct UserService {
    db: Arc<Database>,
    cache: Arc<Cache>,
}

struct Mailer;

fn definitions() -> ContainerBuilder {
    ContainerBuilder::new()
        .add_observer(Arc::new(TracingObserver::with_label("app")))
        .add_factory("config", NO_DEPS, |_| {
            Ok::<_, BoxError>(Config {
                database_url: "postgres://localhost/app".into(),
                cache_ttl: Duration::from_secs(30),
            })
        })
        .add_definition(
            ServiceDefinition::async_factory("database", ["config"], |deps| async move {
                let config = deps.get::<Config>("config")?;
                Database::connect(&config.database_url).await
            })
            .with_async_teardown(|db: Arc<Database>| async move {
                println!("closing connection to {}", db.url);
                sleep(Duration::from_millis(10)).await;
                Ok::<_, BoxError>(())
            }),
        )
        .add_definition(
            ServiceDefinition::factory("cache", ["config"], |deps| {
                Ok::<_, BoxError>(Cache {
                    ttl: deps.get::<Config>("config")?.cache_ttl,
                })
            })
            .with_teardown(|cache: Arc<Cache>| {
                println!("flushing cache (ttl {:?})", cache.ttl);
                Ok::<_, BoxError>(())
            }),
        )
        .add_definition(
            ServiceDefinition::factory("users", ["database", "cache"], |deps| {
                Ok::<_, BoxError>(UserService {
                    db: deps.get::<Database>("database")?,
                    cache: deps.get::<Cache>("cache")?,
                })
            })
            .with_teardown(|_: Arc<UserService>| {
                println!("stopping user service");
                Ok::<_, BoxError>(())
            }),
        )
        .add_definition(
            ServiceDefinition::factory("mailer", ["config"], |_| Ok::<_, BoxError>(Mailer))
                .with_teardown(|_: Arc<Mailer>| {
                    println!("this never prints: the mailer was never requested");
                    Ok::<_, BoxError>(())
                }),
        )
}

#[tokio::main]
async fn main() -> DiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let container = definitions().build()?;

    println!("== validation ==");
    let report = container.validate();
    println!("{} services checked, async only: {:?}", report.checked(), report.async_only());
    report.into_result()?;

    println!("\n== blocking resolution refuses async work ==");
    match container.get_sync::<UserService>("users") {
        Err(err) => println!("expected: {}", err),
        Ok(_) => unreachable!("the database is only reachable asynchronously"),
    }

    println!("\n== resolution ==");
    let users = container.get::<UserService>("users").await?;
    println!("user service ready (db {}, cache ttl {:?})", users.db.url, users.cache.ttl);

    println!("\n== construction and teardown order ==");
    let snapshot = container.graph_snapshot();
    println!("construction: {:?}", snapshot.metadata.construction_order);
    println!("teardown:     {:?}", snapshot.metadata.teardown_order);
    println!("\n{}", container.export_graph(ExportFormat::Mermaid)?);

    println!("== shutdown ==");
    container.close().await?;
    println!("closed: {}", container.is_closed());

    Ok(())
}
