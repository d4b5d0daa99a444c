//! Request Scope Demo - one child container per incoming request
//!
//! This example demonstrates:
//! - A root container holding process-wide services
//! - Child containers seeded with request data via `set`
//! - Refining a parent service for one request
//! - Concurrent requests sharing a single in-flight construction
//! - Closing request scopes without touching the root
//!
//! Run with `RUST_LOG=wirebox=debug cargo run --example request_scope`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wirebox::*;

#[derive(Debug)]
struct Settings {
    greeting: String,
}

struct ConnectionPool {
    id: usize,
}

struct RequestContext {
    id: u64,
    user: String,
}

struct Handler {
    pool: Arc<ConnectionPool>,
    settings: Arc<Settings>,
    context: Arc<RequestContext>,
}

impl Handler {
    fn respond(&self) -> String {
        format!(
            "[request {} via pool {}] {}, {}",
            self.context.id, self.pool.id, self.settings.greeting, self.context.user
        )
    }
}

fn request_scope(root: &Container, id: u64, user: &str) -> DiResult<Container> {
    let scope = ContainerBuilder::new()
        .add_observer(Arc::new(TracingObserver::with_label(format!("request-{}", id))))
        .add_factory("handler", ["pool", "settings", "context"], |deps| {
            Ok::<_, BoxError>(Handler {
                pool: deps.get::<ConnectionPool>("pool")?,
                settings: deps.get::<Settings>("settings")?,
                context: deps.get::<RequestContext>("context")?,
            })
        })
        .add_definition(
            ServiceDefinition::factory("audit", ["context"], |deps| {
                Ok::<_, BoxError>(format!("audit trail for request {}", deps.get::<RequestContext>("context")?.id))
            })
            .with_teardown(|trail: Arc<String>| {
                println!("  flushed {}", trail);
                Ok::<_, BoxError>(())
            }),
        )
        .build_child(root)?;

    scope.set(
        "context",
        RequestContext {
            id,
            user: user.to_string(),
        },
    );
    Ok(scope)
}

#[tokio::main]
async fn main() -> DiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let pools_opened = Arc::new(AtomicUsize::new(0));
    let counter = pools_opened.clone();

    let root = ContainerBuilder::new()
        .with_config(ContainerConfig::from_env())
        .add_instance("settings", Settings { greeting: "hello".into() })
        .add_async_factory("pool", NO_DEPS, move |_| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(25)).await;
                Ok::<_, BoxError>(ConnectionPool {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                })
            }
        })
        .build()?;

    println!("== concurrent requests ==");
    let users = ["ada", "grace", "linus", "barbara"];
    let mut tasks = Vec::new();
    for (id, user) in users.iter().enumerate() {
        let scope = request_scope(&root, id as u64, user)?;
        tasks.push(tokio::spawn(async move {
            let handler = scope.get::<Handler>("handler").await?;
            scope.get::<String>("audit").await?;
            println!("{}", handler.respond());
            scope.close().await
        }));
    }
    for task in tasks {
        task.await.expect("request task panicked")?;
    }
    println!("pools opened: {}", pools_opened.load(Ordering::SeqCst));

    println!("\n== refined settings for one request ==");
    let special = request_scope(&root, 99, "guest")?;
    special.refine("settings", |base: Arc<Settings>| {
        Ok::<_, BoxError>(Settings {
            greeting: format!("{} and welcome", base.greeting),
        })
    })?;
    println!("{}", special.get::<Handler>("handler").await?.respond());
    println!("root settings unchanged: {:?}", root.get::<Settings>("settings").await?);
    special.close().await?;

    root.close().await?;
    Ok(())
}
