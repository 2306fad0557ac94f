//! Async polling loop around [`RateLimitDaemon`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn};

use super::machine::RateLimitDaemon;
use super::state::DaemonSnapshot;
use crate::clock::Clock;
use crate::sessions::SessionBackend;
use crate::usage::UsageSource;

/// Sender for daemon snapshot updates
pub type SnapshotSender = watch::Sender<DaemonSnapshot>;
/// Receiver for daemon snapshot updates
pub type SnapshotReceiver = watch::Receiver<DaemonSnapshot>;

/// Create a watch channel for daemon snapshots
pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    watch::channel(DaemonSnapshot::default())
}

/// Poll every `interval` until `shutdown` becomes true (or its sender is
/// dropped).
///
/// Ticks run on the blocking pool since the usage source and session backend
/// make blocking calls. A panicking tick is logged and the loop carries on.
pub async fn run_daemon<U, S, C>(
    daemon: RateLimitDaemon<U, S, C>,
    interval: Duration,
    snapshot_tx: SnapshotSender,
    mut shutdown: watch::Receiver<bool>,
) where
    U: UsageSource + 'static,
    S: SessionBackend + 'static,
    C: Clock + 'static,
{
    info!("cc-wait daemon started");
    debug!(interval_secs = interval.as_secs(), "Poll interval");
    if !daemon.sessions_available() {
        warn!("tmux not available. Auto-continue will not work.");
    }

    let daemon = Arc::new(Mutex::new(daemon));

    loop {
        if *shutdown.borrow() {
            break;
        }

        let worker = Arc::clone(&daemon);
        let tick = tokio::task::spawn_blocking(move || {
            let _span = info_span!("daemon_tick").entered();
            let mut daemon = worker.lock();
            let outcome = daemon.check_and_handle();
            (outcome, daemon.snapshot(true))
        })
        .await;

        match tick {
            Ok((outcome, snapshot)) => {
                debug!(?outcome, "Tick complete");
                let _ = snapshot_tx.send(snapshot);
            }
            Err(e) => warn!("Daemon tick failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    snapshot_tx.send_modify(|snapshot| snapshot.running = false);
    info!("Daemon stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::daemon::DaemonConfig;
    use crate::detectors::PaneDetector;
    use crate::sessions::Session;
    use crate::usage::{FetchError, UsageStatus, UsageWindow};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysLimited;

    impl UsageSource for AlwaysLimited {
        fn fetch(&self) -> Result<UsageStatus, FetchError> {
            Ok(UsageStatus {
                five_hour: UsageWindow::new(100.0, None),
                ..UsageStatus::default()
            })
        }
    }

    struct NoSessions;

    impl SessionBackend for NoSessions {
        fn is_available(&self) -> bool {
            false
        }

        fn list_sessions(&self) -> Vec<Session> {
            Vec::new()
        }

        fn capture(&self, _id: &str, _lines: usize) -> String {
            String::new()
        }

        fn resume(&self, _id: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_snapshot_channel() {
        let (tx, rx) = snapshot_channel();
        assert!(!rx.borrow().running);
        tx.send_modify(|s| s.running = true);
        assert!(rx.borrow().running);
    }

    #[tokio::test]
    async fn test_run_daemon_publishes_and_stops() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap());
        let daemon = RateLimitDaemon::new(
            AlwaysLimited,
            NoSessions,
            clock,
            PaneDetector::default(),
            DaemonConfig::default(),
        );
        let (snapshot_tx, mut snapshot_rx) = snapshot_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_daemon(
            daemon,
            Duration::from_secs(3600),
            snapshot_tx,
            shutdown_rx,
        ));

        snapshot_rx.changed().await.unwrap();
        {
            let snapshot = snapshot_rx.borrow_and_update();
            assert!(snapshot.running);
            assert!(snapshot.waiting);
            assert_eq!(snapshot.phase, "limited");
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(!snapshot_rx.borrow().running);
    }

    /// Panics on its first fetch, then reports a limit
    struct PanicsOnce {
        calls: Arc<AtomicUsize>,
    }

    impl UsageSource for PanicsOnce {
        fn fetch(&self) -> Result<UsageStatus, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("usage source exploded");
            }
            AlwaysLimited.fetch()
        }
    }

    #[tokio::test]
    async fn test_run_daemon_survives_panicking_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap());
        let daemon = RateLimitDaemon::new(
            PanicsOnce {
                calls: Arc::clone(&calls),
            },
            NoSessions,
            clock,
            PaneDetector::default(),
            DaemonConfig::default(),
        );
        let (snapshot_tx, mut snapshot_rx) = snapshot_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_daemon(
            daemon,
            Duration::from_millis(10),
            snapshot_tx,
            shutdown_rx,
        ));

        // The first tick panics and publishes nothing; the second one succeeds
        tokio::time::timeout(Duration::from_secs(5), snapshot_rx.changed())
            .await
            .expect("no snapshot after a panicking tick")
            .unwrap();
        {
            let snapshot = snapshot_rx.borrow_and_update();
            assert!(snapshot.running);
            assert_eq!(snapshot.phase, "limited");
        }
        assert!(calls.load(Ordering::SeqCst) >= 2);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("daemon did not stop")
            .unwrap();
        assert!(!snapshot_rx.borrow().running);
    }
}
