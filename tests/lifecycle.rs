//! Shutdown: dependency-ordered teardown, draining of in-flight work and
//! the dispose traits.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wirebox::{
    AsyncDispose, BoxError, Container, ContainerBuilder, DiError, Dispose, LifecycleObserver, Resolver,
    ServiceDefinition, ServiceKey, SlotState, NO_DEPS,
};

type Log = Arc<Mutex<Vec<&'static str>>>;

fn logged(key: &'static str, deps: &[&'static str], log: &Log, tag: &'static str) -> ServiceDefinition {
    let log = log.clone();
    ServiceDefinition::factory(key, deps.iter().copied(), |_| Ok::<_, BoxError>(())).with_teardown(
        move |_: Arc<()>| {
            log.lock().unwrap().push(tag);
            Ok::<_, BoxError>(())
        },
    )
}

async fn wait_for_pending(container: &Container, key: &str) {
    while container.slot_state(key) != SlotState::Pending {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_teardown_runs_dependents_first_and_skips_unused() {
    let log: Log = Arc::default();
    let container = ContainerBuilder::new()
        .add_definition(logged("config", &[], &log, "t1"))
        .add_definition(logged("personRepo", &["config"], &log, "t2"))
        .add_definition(logged("unused", &[], &log, "t3"))
        .build()
        .unwrap();

    container.get::<()>("personRepo").await.unwrap();
    container.close().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["t2", "t1"]);
    assert!(container.is_closed());
}

#[tokio::test]
async fn test_teardown_only_for_constructed_dependency() {
    // Only the dependency was requested, so only its hook runs.
    let log: Log = Arc::default();
    let container = ContainerBuilder::new()
        .add_definition(logged("config", &[], &log, "t1"))
        .add_definition(logged("personRepo", &["config"], &log, "t2"))
        .build()
        .unwrap();

    container.get_sync::<()>("config").unwrap();
    container.close().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["t1"]);
}

#[tokio::test]
async fn test_diamond_teardown_order() {
    let log: Log = Arc::default();
    let container = ContainerBuilder::new()
        .add_definition(logged("app", &["left", "right"], &log, "app"))
        .add_definition(logged("left", &["base"], &log, "left"))
        .add_definition(logged("right", &["base"], &log, "right"))
        .add_definition(logged("base", &[], &log, "base"))
        .build()
        .unwrap();

    container.get::<()>("app").await.unwrap();
    container.close().await.unwrap();

    let order = log.lock().unwrap().clone();
    assert_eq!(order.len(), 4);
    assert_eq!(order[0], "app");
    assert_eq!(order[3], "base");
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let log: Log = Arc::default();
    let container = ContainerBuilder::new()
        .add_definition(logged("config", &[], &log, "t1"))
        .build()
        .unwrap();

    container.get_sync::<()>("config").unwrap();
    container.close().await.unwrap();
    container.close().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["t1"]);
}

#[tokio::test]
async fn test_hook_failure_aborts_remaining_hooks() {
    let log: Log = Arc::default();
    let log_b = log.clone();
    let container = ContainerBuilder::new()
        .add_definition(logged("a", &["b"], &log, "a"))
        .add_definition(
            ServiceDefinition::factory("b", ["c"], |_| Ok::<_, BoxError>(())).with_teardown(move |_: Arc<()>| {
                log_b.lock().unwrap().push("b");
                Err::<(), BoxError>("socket already closed".into())
            }),
        )
        .add_definition(logged("c", &[], &log, "c"))
        .build()
        .unwrap();

    container.get_sync::<()>("a").unwrap();

    match container.close().await {
        Err(DiError::Teardown { key, source }) => {
            assert_eq!(key, "b");
            assert_eq!(source.to_string(), "socket already closed");
        }
        other => panic!("Expected Teardown, got {:?}", other),
    }
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    assert!(!container.is_closed());
}

#[tokio::test]
async fn test_async_teardown_is_awaited_in_order() {
    let log: Log = Arc::default();
    let (l1, l2) = (log.clone(), log.clone());

    let container = ContainerBuilder::new()
        .add_definition(
            ServiceDefinition::async_factory("pool", NO_DEPS, |_| async { Ok::<_, BoxError>(()) })
                .with_async_teardown(move |_: Arc<()>| {
                    let log = l1.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        log.lock().unwrap().push("pool");
                        Ok::<_, BoxError>(())
                    }
                }),
        )
        .add_definition(
            ServiceDefinition::factory("repo", ["pool"], |_| Ok::<_, BoxError>(())).with_async_teardown(
                move |_: Arc<()>| {
                    let log = l2.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        log.lock().unwrap().push("repo");
                        Ok::<_, BoxError>(())
                    }
                },
            ),
        )
        .build()
        .unwrap();

    container.get::<()>("repo").await.unwrap();
    container.close().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["repo", "pool"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_waits_for_in_flight_construction() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let flag = torn_down.clone();

    let container = ContainerBuilder::new()
        .add_definition(
            ServiceDefinition::async_factory("slow", NO_DEPS, |_| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, BoxError>(7u32)
            })
            .with_teardown(move |_: Arc<u32>| {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }),
        )
        .build()
        .unwrap();

    let requester = tokio::spawn(container.get::<u32>("slow"));
    wait_for_pending(&container, "slow").await;

    container.close().await.unwrap();
    assert!(torn_down.load(Ordering::SeqCst));
    assert_eq!(*requester.await.unwrap().unwrap(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_surfaces_in_flight_failure() {
    let container = ContainerBuilder::new()
        .add_async_factory("db", NO_DEPS, |_| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err::<(), BoxError>("connection refused".into())
        })
        .build()
        .unwrap();

    let requester = tokio::spawn(container.get::<()>("db"));
    wait_for_pending(&container, "db").await;

    match container.close().await {
        Err(DiError::Recipe { key, .. }) => assert_eq!(key, "db"),
        other => panic!("Expected Recipe, got {:?}", other),
    }
    assert!(!container.is_closed());
    assert!(requester.await.unwrap().is_err());

    // Nothing is in flight anymore, so a retry succeeds.
    container.close().await.unwrap();
    assert!(container.is_closed());
}

#[tokio::test]
async fn test_child_close_leaves_parent_untouched() {
    let log: Log = Arc::default();
    let root = ContainerBuilder::new()
        .add_definition(logged("config", &[], &log, "config"))
        .build()
        .unwrap();
    let child = ContainerBuilder::new()
        .add_definition(logged("request", &["config"], &log, "request"))
        .build_child(&root)
        .unwrap();

    child.get::<()>("request").await.unwrap();
    assert_eq!(root.slot_state("config"), SlotState::Resolved);

    child.close().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["request"]);
    assert!(!root.is_closed());

    root.close().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["request", "config"]);
}

#[tokio::test]
async fn test_seeded_values_use_the_local_hook() {
    let log: Log = Arc::default();
    let container = ContainerBuilder::new()
        .add_definition(logged("clock", &[], &log, "clock"))
        .build()
        .unwrap();

    container.set("clock", ());
    container.close().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["clock"]);
}

#[tokio::test]
async fn test_set_cannot_replace_a_constructed_instance() {
    #[derive(Debug)]
    struct Conn(u8);

    let closed = Arc::new(Mutex::new(Vec::new()));
    let closed_clone = closed.clone();
    let container = ContainerBuilder::new()
        .add_definition(
            ServiceDefinition::factory("conn", NO_DEPS, |_| Ok::<_, BoxError>(Conn(1))).with_teardown(
                move |conn: Arc<Conn>| {
                    closed_clone.lock().unwrap().push(conn.0);
                    Ok::<_, BoxError>(())
                },
            ),
        )
        .add_factory("repo", ["conn"], |deps| Ok::<_, BoxError>(deps.get::<Conn>("conn")?))
        .build()
        .unwrap();

    let conn = container.get::<Conn>("conn").await.unwrap();
    let repo = container.get::<Arc<Conn>>("repo").await.unwrap();

    assert!(!container.set("conn", Conn(2)));
    let again = container.get::<Conn>("conn").await.unwrap();
    assert!(Arc::ptr_eq(&conn, &again));
    assert!(Arc::ptr_eq(&*repo, &again));

    container.close().await.unwrap();
    assert_eq!(*closed.lock().unwrap(), vec![1]);
}

struct FileSink {
    flushed: Arc<AtomicUsize>,
}

impl Dispose for FileSink {
    fn dispose(&self) {
        self.flushed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Connection {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl AsyncDispose for Connection {
    async fn dispose(&self) {
        tokio::task::yield_now().await;
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_dispose_traits_as_hooks() {
    let flushed = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicBool::new(false));
    let (f, c) = (flushed.clone(), closed.clone());

    let container = ContainerBuilder::new()
        .add_definition(
            ServiceDefinition::factory("sink", NO_DEPS, move |_| Ok::<_, BoxError>(FileSink { flushed: f.clone() }))
                .with_dispose::<FileSink>(),
        )
        .add_definition(
            ServiceDefinition::async_factory("conn", ["sink"], move |_| {
                let closed = c.clone();
                async move { Ok::<_, BoxError>(Connection { closed }) }
            })
            .with_async_dispose::<Connection>(),
        )
        .build()
        .unwrap();

    container.get::<Connection>("conn").await.unwrap();
    container.close().await.unwrap();

    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(flushed.load(Ordering::SeqCst), 1);
}

#[derive(Default)]
struct TeardownRecorder(Mutex<Vec<String>>);

impl LifecycleObserver for TeardownRecorder {
    fn resolving(&self, _key: &ServiceKey) {}

    fn resolved(&self, _key: &ServiceKey, _duration: Duration) {}

    fn torn_down(&self, key: &ServiceKey) {
        self.0.lock().unwrap().push(key.to_string());
    }
}

#[tokio::test]
async fn test_observers_see_teardown() {
    let log: Log = Arc::default();
    let recorder = Arc::new(TeardownRecorder::default());
    let container = ContainerBuilder::new()
        .add_observer(recorder.clone())
        .add_definition(logged("config", &[], &log, "t1"))
        .add_definition(logged("repo", &["config"], &log, "t2"))
        .build()
        .unwrap();

    container.get_sync::<()>("repo").unwrap();
    container.close().await.unwrap();
    assert_eq!(*recorder.0.lock().unwrap(), vec!["repo".to_string(), "config".to_string()]);
}
