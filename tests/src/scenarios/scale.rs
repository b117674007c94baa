use std::sync::Arc;
use std::time::Duration;

use havoc_common::{TargetSpec, Timing};
use havoc_core::chaos::ScaleToZero;
use havoc_core::client::ResourceKind;
use havoc_core::{RevertibleCommand, schedule};
use tokio_util::sync::CancellationToken;

use crate::mock::FakeCluster;

fn scale(cluster: &Arc<FakeCluster>, targets: &[&str], hold: &str) -> RevertibleCommand<ScaleToZero> {
    let chaos = ScaleToZero::new(
        cluster.clone(),
        ResourceKind::Deployment,
        "default",
        TargetSpec::resolve(targets).unwrap(),
    );
    RevertibleCommand::new(chaos, &Timing::parse("", hold).unwrap(), false).unwrap()
}

/// `(offset, object, replicas written)` for every patch.
fn patches(cluster: &FakeCluster) -> Vec<(Duration, String, String)> {
    cluster
        .patches()
        .into_iter()
        .map(|c| (c.at, c.name, c.args[0].clone()))
        .collect()
}

fn at(secs: u64, name: &str, replicas: &str) -> (Duration, String, String) {
    (Duration::from_secs(secs), name.to_string(), replicas.to_string())
}

#[tokio::test(start_paused = true)]
async fn matching_deployments_are_scaled_down_and_restored() {
    let cluster = Arc::new(FakeCluster::with_deployments(&[
        ("api-1", 1),
        ("web", 3),
        ("api-2", 1),
    ]));
    let command = scale(&cluster, &["re2:^api-"], "5s");

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    assert_eq!(
        patches(&cluster),
        vec![
            at(0, "api-1", "0"),
            at(5, "api-1", "1"),
            at(5, "api-2", "0"),
            at(10, "api-2", "1"),
        ]
    );
    assert_eq!(cluster.replicas("api-1"), Some(1));
    assert_eq!(cluster.replicas("api-2"), Some(1));
    assert_eq!(cluster.replicas("web"), Some(3));
}

#[tokio::test(start_paused = true)]
async fn workload_stays_at_zero_during_the_hold() {
    let cluster = Arc::new(FakeCluster::with_deployments(&[("api-1", 4)]));
    let command = scale(&cluster, &["api-1"], "5s");

    let observed = {
        let cluster = cluster.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            cluster.replicas("api-1")
        })
    };

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    assert_eq!(observed.await.unwrap(), Some(0));
    assert_eq!(cluster.replicas("api-1"), Some(4));
}

#[tokio::test(start_paused = true)]
async fn abort_restores_the_captured_count() {
    let cluster = Arc::new(FakeCluster::with_deployments(&[("api-1", 2), ("api-2", 2)]));
    let command = scale(&cluster, &["re2:^api-"], "1m");

    let abort = CancellationToken::new();
    let stopper = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        stopper.cancel();
    });

    schedule(&abort, &command, None, false).await.unwrap();

    assert_eq!(patches(&cluster), vec![at(0, "api-1", "0"), at(3, "api-1", "2")]);
    assert_eq!(cluster.replicas("api-2"), Some(2), "abort skips the remaining targets");
}
