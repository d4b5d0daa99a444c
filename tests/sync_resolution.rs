//! Blocking resolution: refusal of async work and dry-run checks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wirebox::{BoxError, ContainerBuilder, DiError, Resolver, SlotState, NO_DEPS};

#[test]
fn test_async_dependency_rejected_before_any_recipe_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (c1, c2, c3) = (calls.clone(), calls.clone(), calls.clone());

    let container = ContainerBuilder::new()
        .add_factory("url", NO_DEPS, move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>("postgres://localhost".to_string())
        })
        .add_async_factory("db", ["url"], move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BoxError>(()) }
        })
        .add_factory("repo", ["url", "db"], move |_| {
            c3.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(())
        })
        .build()
        .unwrap();

    match container.get_sync::<()>("repo") {
        Err(DiError::AsyncRequired { requested, key }) => {
            assert_eq!(requested, "repo");
            assert_eq!(key, "db");
        }
        other => panic!("Expected AsyncRequired, got {:?}", other),
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(container.slot_state("url"), SlotState::Absent);
    assert_eq!(container.slot_state("repo"), SlotState::Absent);
}

#[test]
fn test_async_factory_requested_directly() {
    let container = ContainerBuilder::new()
        .add_async_factory("db", NO_DEPS, |_| async { Ok::<_, BoxError>(()) })
        .build()
        .unwrap();

    let err = container.get_sync::<()>("db").unwrap_err();
    assert!(matches!(&err, DiError::AsyncRequired { requested, key } if requested == "db" && key == "db"));
    assert_eq!(err.to_string(), "service \"db\" can only be resolved asynchronously");
}

#[tokio::test]
async fn test_sync_succeeds_once_async_service_is_cached() {
    let container = ContainerBuilder::new()
        .add_async_factory("db", NO_DEPS, |_| async { Ok::<_, BoxError>(41u32) })
        .add_factory("repo", ["db"], |deps| Ok::<_, BoxError>(*deps.get::<u32>("db")? + 1))
        .build()
        .unwrap();

    assert!(!container.test_sync("repo"));
    container.get::<u32>("db").await.unwrap();
    assert!(container.test_sync("repo"));
    assert_eq!(*container.get_sync::<u32>("repo").unwrap(), 42);
}

#[test]
fn test_dry_run_checks_report_resolvability() {
    let container = ContainerBuilder::new()
        .add_instance("config", "admin".to_string())
        .add_factory("personRepo", ["config"], |_| Ok::<_, BoxError>(()))
        .add_async_factory("db", ["config"], |_| async { Ok::<_, BoxError>(()) })
        .add_factory("report", ["db"], |_| Ok::<_, BoxError>(()))
        .add_factory("orphan", ["ghost"], |_| Ok::<_, BoxError>(()))
        .build()
        .unwrap();

    assert!(container.test("personRepo"));
    assert!(container.test_sync("personRepo"));

    assert!(container.test("db"));
    assert!(!container.test_sync("db"));
    assert!(container.test("report"));
    assert!(!container.test_sync("report"));

    assert!(!container.test("orphan"));
    assert!(!container.test_sync("orphan"));
    assert!(!container.test("nothing"));

    // Checking never constructs.
    for key in ["config", "personRepo", "db", "report"] {
        assert_eq!(container.slot_state(key), SlotState::Absent, "{}", key);
    }
}

#[test]
fn test_dry_run_checks_consult_the_parent_chain() {
    let root = ContainerBuilder::new().add_instance("config", 1u8).build().unwrap();
    let child = ContainerBuilder::new()
        .add_factory("service", ["config"], |_| Ok::<_, BoxError>(()))
        .build_child(&root)
        .unwrap();
    let grandchild = child.child();

    assert!(grandchild.test_sync("service"));
    assert!(grandchild.test_sync("config"));
    assert!(!root.test("service"));
}

#[test]
fn test_validate_reports_every_key() {
    let container = ContainerBuilder::new()
        .add_instance("config", 1u8)
        .add_factory("a", ["config"], |_| Ok::<_, BoxError>(()))
        .add_async_factory("b", ["a"], |_| async { Ok::<_, BoxError>(()) })
        .add_factory("c", ["missing"], |_| Ok::<_, BoxError>(()))
        .build()
        .unwrap();

    let report = container.validate();
    assert_eq!(report.checked(), 4);
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].0, "c");
    assert_eq!(report.async_only().len(), 1);
    assert_eq!(report.async_only()[0], "b");
    assert!(report.into_result().is_err());
}
