//! Failure-injection scenarios.

use std::sync::Arc;

use ceph_converge::config::{CollectionPolicy, EngineConfig};
use ceph_converge::controller::{ChangePhase, TopologyController};
use ceph_converge::error::EngineError;
use ceph_converge::injector::FailureInjector;
use ceph_converge::topology::Role;

use crate::mock_cluster::{MockCluster, init_tracing};

#[tokio::test(start_paused = true)]
async fn test_inject_deletes_one_matching_resource() {
    init_tracing();
    let cluster = Arc::new(MockCluster::ramping(vec![2]));
    let config = EngineConfig::default();
    let injector = FailureInjector::for_role(Arc::clone(&cluster), &config, Role::Mon);

    let report = injector.inject().await.expect("a victim exists");

    assert!(report.victim.starts_with("rook-ceph-mon-"));
    assert_eq!(report.resource_kind, "Pod");
    assert_eq!(report.selector, "app=rook-ceph-mon");
    assert_eq!(cluster.deleted(), vec![report.victim.clone()]);
}

#[tokio::test(start_paused = true)]
async fn test_inject_with_no_match_is_a_hard_error() {
    init_tracing();
    let cluster = Arc::new(MockCluster::ramping(vec![0]));
    let config = EngineConfig::default();
    let injector = FailureInjector::for_role(Arc::clone(&cluster), &config, Role::Mds);

    let err = injector.inject().await.expect_err("nothing matches");
    assert!(err.is_not_found());
    assert!(cluster.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_inject_delete_failure_propagates() {
    init_tracing();
    let cluster = Arc::new(MockCluster::ramping(vec![1]));
    cluster.fail_deletions();
    let config = EngineConfig::default();
    let injector = FailureInjector::for_role(Arc::clone(&cluster), &config, Role::Mon);

    let err = injector.inject().await.expect_err("delete is rejected");
    assert!(matches!(err, EngineError::CommandFailed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_convergence_holds_under_injected_churn() {
    init_tracing();
    // The injector kills a mon on its own task while the controller's
    // convergence loop is in flight; the simulated operator replaces
    // deleted pods on the next reconcile, so the change still verifies.
    let cluster = Arc::new(MockCluster::ramping(vec![1, 2, 2, 3]));
    let config = EngineConfig {
        policy: CollectionPolicy::StrictUnanimous,
        ..EngineConfig::default()
    };
    let mut controller = TopologyController::new(Arc::clone(&cluster), Arc::new(config.clone()));
    let injector = FailureInjector::for_role(Arc::clone(&cluster), &config, Role::Mon);

    let handle = injector.spawn();
    let report = controller
        .apply_change(Role::Mon, 3)
        .await
        .expect("convergence should survive the disruption");

    assert_eq!(controller.phase(), ChangePhase::Verified);
    assert_eq!(report.members, 3);

    let injection = handle
        .await
        .expect("injector task must not panic")
        .expect("the injection itself should succeed");
    assert!(cluster.deleted().contains(&injection.victim));
}
