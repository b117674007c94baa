use std::sync::Arc;

use havoc_common::{ChaosError, TargetSpec};
use havoc_core::chaos::{ContainerAction, ContainerChaos};
use havoc_core::{OneShotCommand, schedule};
use tokio_util::sync::CancellationToken;

use crate::mock::FakeDocker;

fn kill(docker: &Arc<FakeDocker>, targets: &[&str], dry_run: bool) -> OneShotCommand<ContainerChaos> {
    let chaos = ContainerChaos::new(
        docker.clone(),
        TargetSpec::resolve(targets).unwrap(),
        ContainerAction::kill("SIGKILL").unwrap(),
    );
    OneShotCommand::new(chaos, dry_run)
}

fn touched(docker: &FakeDocker) -> Vec<String> {
    docker.mutations().into_iter().map(|c| c.name).collect()
}

#[tokio::test]
async fn kill_stops_at_first_failing_target() {
    let docker = Arc::new(
        FakeDocker::with_containers(&["web-1", "web-2"])
            .fail_when(|call| call.op == "kill" && call.name == "web-1"),
    );
    let command = kill(&docker, &["web-1", "web-2"], false);

    let err = schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, ChaosError::ApplyFailed { target, action, .. } if target == "web-1" && action == "kill"),
        "unexpected error: {err}"
    );
    assert_eq!(touched(&docker), vec!["web-1"], "web-2 must be left alone");
}

#[tokio::test]
async fn kill_follows_inventory_order() {
    let docker = Arc::new(FakeDocker::with_containers(&["db", "web-2", "cache", "web-1"]));
    let command = kill(&docker, &["re2:^web-"], false);

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    assert_eq!(touched(&docker), vec!["web-2", "web-1"]);
    assert!(docker.mutations().iter().all(|c| c.args == vec!["SIGKILL"]));
}

#[tokio::test]
async fn random_mode_hits_exactly_one_match() {
    let docker = Arc::new(FakeDocker::with_containers(&[
        "web-1", "web-2", "web-3", "db", "web-4",
    ]));
    let command = kill(&docker, &["re2:^web-"], false);

    schedule(&CancellationToken::new(), &command, None, true)
        .await
        .unwrap();

    let victims = touched(&docker);
    assert_eq!(victims.len(), 1);
    assert!(victims[0].starts_with("web-"), "picked {}", victims[0]);
}

#[tokio::test]
async fn no_match_is_not_an_error() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]));
    let command = kill(&docker, &["ghost"], false);

    schedule(&CancellationToken::new(), &command, None, true)
        .await
        .unwrap();

    assert!(touched(&docker).is_empty());
}

#[tokio::test]
async fn listing_failure_is_reported_as_such() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]).fail_listing());
    let command = kill(&docker, &["web-1"], false);

    let err = schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap_err();

    assert_eq!(err.phase(), "list");
    assert!(touched(&docker).is_empty());
}

#[tokio::test]
async fn dry_run_lists_but_never_mutates() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1", "web-2"]));
    let command = kill(&docker, &[], true);

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    assert_eq!(docker.calls().len(), 1);
    assert_eq!(docker.calls()[0].op, "list");
}

#[tokio::test]
async fn cancelled_run_touches_nothing() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1", "web-2"]));
    let command = kill(&docker, &["web-1", "web-2"], false);
    let abort = CancellationToken::new();
    abort.cancel();

    schedule(&abort, &command, None, false).await.unwrap();

    assert!(touched(&docker).is_empty());
}
