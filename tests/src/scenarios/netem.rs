use std::sync::Arc;
use std::time::Duration;

use havoc_common::{ChaosError, TargetSpec, Timing};
use havoc_core::chaos::{DEFAULT_INTERFACE, Emulation, NetemChaos};
use havoc_core::{RevertibleCommand, schedule};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::mock::FakeDocker;

fn delay() -> Emulation {
    Emulation::Delay {
        time: Duration::from_millis(100),
        jitter: Duration::from_millis(10),
        correlation: 20.0,
    }
}

fn netem(
    docker: &Arc<FakeDocker>,
    targets: &[&str],
    timing: &Timing,
    dry_run: bool,
) -> RevertibleCommand<NetemChaos> {
    let chaos = NetemChaos::new(
        docker.clone(),
        TargetSpec::resolve(targets).unwrap(),
        DEFAULT_INTERFACE,
        delay(),
    )
    .unwrap();
    RevertibleCommand::new(chaos, timing, dry_run).unwrap()
}

/// `(offset, container, tc verb)` for every exec.
fn timeline(docker: &FakeDocker) -> Vec<(Duration, String, String)> {
    docker
        .mutations()
        .into_iter()
        .map(|c| (c.at, c.name, c.args[2].clone()))
        .collect()
}

fn at(secs: u64, name: &str, verb: &str) -> (Duration, String, String) {
    (Duration::from_secs(secs), name.to_string(), verb.to_string())
}

fn stop_after(abort: &CancellationToken, after: Duration) {
    let abort = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        abort.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn recurring_tick_starts_right_after_the_previous_revert() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]));
    let timing = Timing::parse("10s", "").unwrap();
    let command = netem(&docker, &["web-1"], &timing, false);
    assert_eq!(command.hold(), Duration::from_secs(10));

    let abort = CancellationToken::new();
    stop_after(&abort, Duration::from_secs(15));
    schedule(&abort, &command, timing.interval, false)
        .await
        .unwrap();

    assert_eq!(
        timeline(&docker),
        vec![
            at(0, "web-1", "add"),
            at(10, "web-1", "del"),
            at(10, "web-1", "add"),
            at(15, "web-1", "del"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn apply_runs_the_full_tc_command() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]));
    let timing = Timing::parse("", "1s").unwrap();
    let command = netem(&docker, &["web-1"], &timing, false);

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    let calls = docker.mutations();
    assert_eq!(
        calls[0].args,
        vec![
            "tc", "qdisc", "add", "dev", "eth0", "root", "netem", "delay", "100ms", "10ms",
            "20.00%"
        ]
    );
    assert_eq!(
        calls[1].args,
        vec!["tc", "qdisc", "del", "dev", "eth0", "root", "netem"]
    );
}

#[tokio::test(start_paused = true)]
async fn abort_reverts_promptly() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]));
    let timing = Timing::parse("", "100ms").unwrap();
    let command = netem(&docker, &["web-1"], &timing, false);

    let abort = CancellationToken::new();
    stop_after(&abort, Duration::from_millis(10));
    schedule(&abort, &command, None, false).await.unwrap();

    let calls = docker.mutations();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].args[2], "del");
    assert_eq!(calls[1].at, Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn targets_are_held_one_after_another() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1", "web-2"]));
    let timing = Timing::parse("", "1s").unwrap();
    let command = netem(&docker, &["re2:^web-"], &timing, false);

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    assert_eq!(
        timeline(&docker),
        vec![
            at(0, "web-1", "add"),
            at(1, "web-1", "del"),
            at(1, "web-2", "add"),
            at(2, "web-2", "del"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn revert_failure_names_the_target() {
    let docker = Arc::new(
        FakeDocker::with_containers(&["web-1", "web-2"])
            .fail_when(|call| call.op == "exec" && call.args[2] == "del"),
    );
    let timing = Timing::parse("", "1s").unwrap();
    let command = netem(&docker, &[], &timing, false);

    let err = schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap_err();

    assert!(matches!(&err, ChaosError::RevertFailed { target, .. } if target == "web-1"));
    assert_eq!(docker.mutations().len(), 2, "web-2 must not be touched");
}

#[tokio::test(start_paused = true)]
async fn dry_run_still_holds_for_the_duration() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]));
    let timing = Timing::parse("", "3s").unwrap();
    let command = netem(&docker, &["web-1"], &timing, true);

    let started = Instant::now();
    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert!(docker.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn ip_filter_installs_prio_tree_and_removes_it_whole() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]));
    let chaos = NetemChaos::new(
        docker.clone(),
        TargetSpec::resolve(&["web-1"]).unwrap(),
        DEFAULT_INTERFACE,
        delay(),
    )
    .unwrap()
    .with_ip_filter(vec!["10.0.0.7".parse().unwrap(), "10.0.0.8".parse().unwrap()]);
    let command = RevertibleCommand::new(chaos, &Timing::parse("", "2s").unwrap(), false).unwrap();

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    let calls = docker.mutations();
    let steps: Vec<(Duration, &str, &str)> = calls
        .iter()
        .map(|c| (c.at, c.args[1].as_str(), c.args[2].as_str()))
        .collect();
    assert_eq!(
        steps,
        vec![
            (Duration::ZERO, "qdisc", "add"),
            (Duration::ZERO, "qdisc", "add"),
            (Duration::ZERO, "filter", "add"),
            (Duration::ZERO, "filter", "add"),
            (Duration::from_secs(2), "qdisc", "del"),
        ]
    );
    assert!(calls[3].args.contains(&"10.0.0.8".to_string()));
    assert_eq!(calls[4].args, vec!["tc", "qdisc", "del", "dev", "eth0", "root"]);
}

#[tokio::test(start_paused = true)]
async fn tc_image_runs_commands_beside_the_target() {
    let docker = Arc::new(FakeDocker::with_containers(&["web-1"]));
    let chaos = NetemChaos::new(
        docker.clone(),
        TargetSpec::resolve(&["web-1"]).unwrap(),
        DEFAULT_INTERFACE,
        delay(),
    )
    .unwrap()
    .with_tc_image(Some("gaiadocker/iproute2".to_string()));
    let command = RevertibleCommand::new(chaos, &Timing::parse("", "1s").unwrap(), false).unwrap();

    schedule(&CancellationToken::new(), &command, None, false)
        .await
        .unwrap();

    let calls = docker.mutations();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.op == "sidecar" && c.name == "web-1"));
    assert_eq!(timeline(&docker), vec![at(0, "web-1", "add"), at(1, "web-1", "del")]);
}
