//! The trigger controller state machine.
//!
//! Idle → Selecting on a threshold breach, gated by the cooldown clock;
//! back to Idle after the selector's report is applied. The cooldown
//! check-and-set is atomic end-to-end: concurrent `evaluate` calls
//! cannot both pass the gate, and the slow selector invocation runs
//! with the lock released.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use gridshift_state::persist;

use crate::invoke::SelectorInvoker;

/// Static configuration for the trigger controller.
pub struct TriggerConfig {
    /// Ceiling (gCO2eq/kWh) above which the active zone is too dirty.
    pub max_intensity: f64,
    /// Minimum elapsed time between two selector invocations.
    pub cooldown: Duration,
    /// Plain-text file persisting the active zone across restarts.
    pub active_zone_path: PathBuf,
}

struct TriggerState {
    active_zone: String,
    /// Stamped every time the selector is invoked, success or failure,
    /// so a broken backend cannot cause a retry storm.
    last_trigger_at: Option<Instant>,
    /// A selection is currently in flight (the lock is released while
    /// the subprocess runs).
    selecting: bool,
}

/// Owns the cooldown clock and the active-zone pointer.
pub struct TriggerController {
    config: TriggerConfig,
    invoker: Arc<dyn SelectorInvoker>,
    state: Mutex<TriggerState>,
}

impl TriggerController {
    pub fn new(
        config: TriggerConfig,
        invoker: Arc<dyn SelectorInvoker>,
        initial_zone: String,
    ) -> Self {
        Self {
            config,
            invoker,
            state: Mutex::new(TriggerState {
                active_zone: initial_zone,
                last_trigger_at: None,
                selecting: false,
            }),
        }
    }

    /// Currently active deployment zone.
    pub async fn active_zone(&self) -> String {
        self.state.lock().await.active_zone.clone()
    }

    /// Configured intensity ceiling.
    pub fn max_intensity(&self) -> f64 {
        self.config.max_intensity
    }

    /// React to a fresh intensity reading for `zone`.
    ///
    /// No-op unless `zone` is the active zone and the value exceeds the
    /// ceiling. A breach inside the cooldown window (or while another
    /// selection is in flight) is logged and discarded.
    pub async fn evaluate(&self, zone: &str, value: f64) {
        {
            let mut st = self.state.lock().await;
            if zone != st.active_zone || value <= self.config.max_intensity {
                return;
            }
            if st.selecting {
                info!(zone, value, "selection already in flight; discarding trigger");
                return;
            }
            if let Some(last) = st.last_trigger_at
                && last.elapsed() < self.config.cooldown
            {
                info!(
                    zone,
                    value,
                    remaining_secs = (self.config.cooldown - last.elapsed()).as_secs(),
                    "cooldown active; discarding trigger"
                );
                return;
            }
            // Enter Selecting: stamp the clock unconditionally so even a
            // failed or empty selection starts a fresh cooldown window.
            st.selecting = true;
            st.last_trigger_at = Some(Instant::now());
        }

        info!(
            zone,
            value,
            max_intensity = self.config.max_intensity,
            "threshold exceeded; invoking region selector"
        );

        // Slow path runs without the lock.
        let outcome = self.invoker.invoke().await;

        let mut st = self.state.lock().await;
        st.selecting = false;
        match outcome {
            Ok(report) => match report.best {
                Some(best) if best.zone != st.active_zone => {
                    info!(
                        from = %st.active_zone,
                        to = %best.zone,
                        region = best.region.as_deref().unwrap_or("-"),
                        value = best.value,
                        "migrating active zone"
                    );
                    if let Err(e) = persist::write_active_zone(&self.config.active_zone_path, &best.zone)
                    {
                        error!(error = %e, zone = %best.zone, "failed to persist active zone");
                    }
                    st.active_zone = best.zone;
                }
                Some(best) => {
                    info!(zone = %best.zone, "active zone is already the greenest option");
                }
                None => {
                    info!("no suitable zone found (all above ceiling or data missing)");
                }
            },
            Err(e) => {
                warn!(error = %e, "selector invocation failed; cooldown window consumed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::{InvokeError, InvokeFuture};
    use gridshift_select::{BestPick, SelectionReport};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted invoker: returns a fixed pick and counts invocations.
    struct FakeSelector {
        best: Option<BestPick>,
        fail: bool,
        calls: AtomicU32,
    }

    impl FakeSelector {
        fn picking(zone: &str, value: f64) -> Arc<Self> {
            Arc::new(Self {
                best: Some(BestPick {
                    zone: zone.to_string(),
                    value,
                    region: Some("europe-west3".to_string()),
                }),
                fail: false,
                calls: AtomicU32::new(0),
            })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self {
                best: None,
                fail: false,
                calls: AtomicU32::new(0),
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                best: None,
                fail: true,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SelectorInvoker for FakeSelector {
        fn invoke(&self) -> InvokeFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            let best = self.best.clone();
            Box::pin(async move {
                if fail {
                    return Err(InvokeError::Malformed("traceback".to_string()));
                }
                Ok(SelectionReport {
                    metric: "ci".to_string(),
                    backend_url: "http://prom:9090".to_string(),
                    duration_ms: 1,
                    zones: vec![],
                    best,
                    max_ceiling: Some(200.0),
                })
            })
        }
    }

    fn controller(
        invoker: Arc<FakeSelector>,
        cooldown: Duration,
        dir: &tempfile::TempDir,
    ) -> TriggerController {
        TriggerController::new(
            TriggerConfig {
                max_intensity: 200.0,
                cooldown,
                active_zone_path: dir.path().join("current_zone.txt"),
            },
            invoker,
            "AT".to_string(),
        )
    }

    #[tokio::test]
    async fn below_threshold_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::picking("DE", 90.0);
        let ctrl = controller(selector.clone(), Duration::ZERO, &dir);

        ctrl.evaluate("AT", 150.0).await;
        assert_eq!(selector.calls(), 0);
        assert_eq!(ctrl.active_zone().await, "AT");
    }

    #[tokio::test]
    async fn exactly_at_threshold_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::picking("DE", 90.0);
        let ctrl = controller(selector.clone(), Duration::ZERO, &dir);

        // Strictly-greater fires; equal does not.
        ctrl.evaluate("AT", 200.0).await;
        assert_eq!(selector.calls(), 0);
    }

    #[tokio::test]
    async fn non_active_zone_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::picking("DE", 90.0);
        let ctrl = controller(selector.clone(), Duration::ZERO, &dir);

        ctrl.evaluate("TR", 999.0).await;
        assert_eq!(selector.calls(), 0);
    }

    #[tokio::test]
    async fn breach_migrates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::picking("DE", 90.0);
        let ctrl = controller(selector.clone(), Duration::ZERO, &dir);

        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(selector.calls(), 1);
        assert_eq!(ctrl.active_zone().await, "DE");
        assert_eq!(
            persist::read_active_zone(&dir.path().join("current_zone.txt")),
            Some("DE".to_string())
        );
    }

    #[tokio::test]
    async fn same_zone_pick_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::picking("AT", 230.0);
        let ctrl = controller(selector.clone(), Duration::ZERO, &dir);

        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(selector.calls(), 1);
        assert_eq!(ctrl.active_zone().await, "AT");
        // No migration, no persistence.
        assert_eq!(
            persist::read_active_zone(&dir.path().join("current_zone.txt")),
            None
        );
    }

    #[tokio::test]
    async fn empty_pick_keeps_active_zone() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::empty();
        let ctrl = controller(selector.clone(), Duration::ZERO, &dir);

        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(selector.calls(), 1);
        assert_eq!(ctrl.active_zone().await, "AT");
    }

    #[tokio::test]
    async fn invoker_failure_does_not_crash_and_consumes_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::broken();
        let ctrl = controller(selector.clone(), Duration::from_secs(3600), &dir);

        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(selector.calls(), 1);
        assert_eq!(ctrl.active_zone().await, "AT");

        // Failure consumed the window; the next breach is discarded.
        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(selector.calls(), 1);
    }

    #[tokio::test]
    async fn cooldown_gates_repeat_triggers() {
        let dir = tempfile::tempdir().unwrap();
        let selector = FakeSelector::empty();
        let ctrl = controller(selector.clone(), Duration::from_millis(200), &dir);

        ctrl.evaluate("AT", 230.0).await;
        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(selector.calls(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(selector.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_evaluates_invoke_at_most_once() {
        let dir = tempfile::tempdir().unwrap();

        /// Invoker that parks until released, to hold the Selecting state open.
        struct SlowSelector {
            calls: AtomicU32,
            release: tokio::sync::Notify,
        }

        impl SelectorInvoker for Arc<SlowSelector> {
            fn invoke(&self) -> InvokeFuture {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let this = self.clone();
                Box::pin(async move {
                    this.release.notified().await;
                    Ok(SelectionReport {
                        metric: "ci".to_string(),
                        backend_url: "http://prom:9090".to_string(),
                        duration_ms: 1,
                        zones: vec![],
                        best: None,
                        max_ceiling: None,
                    })
                })
            }
        }

        let slow = Arc::new(SlowSelector {
            calls: AtomicU32::new(0),
            release: tokio::sync::Notify::new(),
        });
        let ctrl = Arc::new(TriggerController::new(
            TriggerConfig {
                max_intensity: 200.0,
                cooldown: Duration::ZERO,
                active_zone_path: dir.path().join("current_zone.txt"),
            },
            Arc::new(slow.clone()),
            "AT".to_string(),
        ));

        let first = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.evaluate("AT", 230.0).await }
        });

        // Let the first evaluate enter Selecting, then race a second one.
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctrl.evaluate("AT", 230.0).await;
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);

        slow.release.notify_one();
        first.await.unwrap();
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }
}
