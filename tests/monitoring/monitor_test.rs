/*!
 * Monitor Tests
 * Baseline capture, per-cycle verdicts and loop termination
 */

use honeyproc::memory::{
    kind, protect, state, ProcMapsSource, RawRegion, SourceError, StaticSource,
};
use honeyproc::monitoring::{
    Alert, Monitor, MonitorConfig, MonitorError, MonitorOutcome, ScanVerdict,
};
use honeyproc::SnapshotDiff;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn decoy_layout() -> Vec<RawRegion> {
    vec![
        RawRegion::new(0x0, 0x10000, state::FREE, protect::NOACCESS, 0),
        RawRegion::new(0x10000, 0x4000, state::COMMIT, protect::EXECUTE_READ, kind::IMAGE),
        RawRegion::new(0x14000, 0x2000, state::COMMIT, protect::READWRITE, kind::PRIVATE),
        RawRegion::new(0x16000, 0x1000, state::RESERVE, protect::NOACCESS, kind::PRIVATE),
    ]
}

fn fast_config() -> MonitorConfig {
    MonitorConfig::for_pid(4242).with_scan_interval(Duration::from_millis(10))
}

#[test]
fn test_baseline_taken_on_construction() {
    let monitor = Monitor::new(StaticSource::new(decoy_layout()), fast_config(), Vec::<Alert>::new())
        .unwrap();
    assert_eq!(monitor.baseline().len(), 7);
    assert_eq!(monitor.baseline().executable_pages(), 4);
    assert_eq!(monitor.cycles(), 0);
}

#[test]
fn test_unchanged_layout_is_clean() {
    let mut monitor =
        Monitor::new(StaticSource::new(decoy_layout()), fast_config(), Vec::<Alert>::new())
            .unwrap();
    for _ in 0..3 {
        assert_eq!(monitor.scan_once().unwrap(), ScanVerdict::Clean);
    }
    assert_eq!(monitor.cycles(), 3);
    assert!(monitor.sink().is_empty());
}

#[test]
fn test_remote_allocation_raises_alert() {
    let mut monitor =
        Monitor::new(StaticSource::new(decoy_layout()), fast_config(), Vec::<Alert>::new())
            .unwrap();
    assert!(monitor.scan_once().unwrap().is_clean());

    monitor.source_mut().push(RawRegion::new(
        0x7000_0000,
        0x1000,
        state::COMMIT,
        protect::EXECUTE_READ,
        kind::PRIVATE,
    ));

    let verdict = monitor.scan_once().unwrap();
    assert_eq!(
        verdict,
        ScanVerdict::InjectionDetected(SnapshotDiff::CountMismatch { left: 7, right: 8 })
    );

    let alerts = monitor.sink();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].pid, Some(4242));
    assert_eq!(alerts[0].cycle, 2);
}

#[test]
fn test_protection_flip_raises_alert() {
    let mut monitor =
        Monitor::new(StaticSource::new(decoy_layout()), fast_config(), Vec::<Alert>::new())
            .unwrap();

    let mut layout = decoy_layout();
    layout[2].protect = protect::EXECUTE_READWRITE;
    monitor.source_mut().set_regions(layout);

    match monitor.scan_once().unwrap() {
        ScanVerdict::InjectionDetected(SnapshotDiff::RegionMismatch { index, right, .. }) => {
            assert_eq!(index, 4);
            assert_eq!(right.page_start, 0x14000);
        }
        other => panic!("expected region mismatch, got {:?}", other),
    }
}

#[test]
fn test_invalid_config_rejected() {
    let config = MonitorConfig::for_pid(1).with_scan_interval(Duration::from_millis(1));
    let result = Monitor::new(StaticSource::new(decoy_layout()), config, Vec::<Alert>::new());
    assert!(matches!(result, Err(MonitorError::InvalidConfig { .. })));
}

#[tokio::test]
async fn test_run_stops_at_cycle_limit() {
    let mut monitor = Monitor::new(
        StaticSource::new(decoy_layout()),
        fast_config().with_max_cycles(3),
        Vec::<Alert>::new(),
    )
    .unwrap();

    let outcome = monitor.run().await.unwrap();
    assert_eq!(outcome, MonitorOutcome::CycleLimit { cycles: 3 });
    assert!(monitor.sink().is_empty());
}

#[tokio::test]
async fn test_run_stops_on_detection() {
    let mut monitor = Monitor::new(
        StaticSource::new(decoy_layout()),
        fast_config().with_max_cycles(10),
        Vec::<Alert>::new(),
    )
    .unwrap();
    monitor.source_mut().set_regions(decoy_layout()[..3].to_vec());

    match monitor.run().await.unwrap() {
        MonitorOutcome::Detected { cycle, diff } => {
            assert_eq!(cycle, 1);
            assert_eq!(diff, SnapshotDiff::CountMismatch { left: 7, right: 6 });
        }
        other => panic!("expected detection, got {:?}", other),
    }
    assert_eq!(monitor.sink().len(), 1);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_exited_decoy_is_not_an_injection() {
    use std::process::Command;

    let mut child = Command::new("sleep").arg("0.3").spawn().unwrap();
    let pid = child.id();
    let mut monitor = Monitor::new(
        ProcMapsSource::for_pid(pid),
        MonitorConfig::for_pid(pid)
            .with_scan_interval(Duration::from_millis(50))
            .with_max_cycles(100),
        Vec::<Alert>::new(),
    )
    .unwrap();
    assert!(!monitor.baseline().is_empty());

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(matches!(
        monitor.scan_once(),
        Err(MonitorError::Source(SourceError::ProcessGone(gone))) if gone == pid
    ));

    match monitor.run().await.unwrap() {
        MonitorOutcome::ProcessExited { .. } => {}
        other => panic!("expected process exit, got {:?}", other),
    }
    assert!(monitor.sink().is_empty());

    child.wait().unwrap();
}
