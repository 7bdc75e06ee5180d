use agenda_core::{CalendarWidget, FallbackStore, SyncController};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Fixed-period re-render timer. Each firing re-arms one period after the
/// instant it fired; it never stops on its own.
///
/// `tick` is cancel safe: dropping it inside `select!` keeps the deadline.
#[derive(Debug)]
pub struct RefreshScheduler {
    period: Duration,
    deadline: Instant,
}

impl RefreshScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: Instant::now() + period,
        }
    }

    pub async fn tick(&mut self) {
        sleep_until(self.deadline).await;
        self.deadline = Instant::now() + self.period;
    }

    /// Waits for the deadline, then re-lays out the calendar. Only the widget's
    /// `render` runs; events, store and connection are left alone.
    pub async fn refresh_when_due<W, S>(&mut self, sync: &mut SyncController<W, S>)
    where
        W: CalendarWidget,
        S: FallbackStore,
    {
        self.tick().await;
        sync.refresh();
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::{NormalizedEvent, TransformPolicy, ViewKind};
    use agenda_storage::SqliteFallbackStore;

    #[derive(Default)]
    struct CountingWidget {
        renders: usize,
        other_calls: usize,
    }

    impl CalendarWidget for CountingWidget {
        fn clear(&mut self) {
            self.other_calls += 1;
        }
        fn render(&mut self) {
            self.renders += 1;
        }
        fn create_events(&mut self, _events: &[NormalizedEvent]) {
            self.other_calls += 1;
        }
        fn change_view(&mut self, _view: ViewKind, _force: bool) {
            self.other_calls += 1;
        }
        fn prev(&mut self) {
            self.other_calls += 1;
        }
        fn next(&mut self) {
            self.other_calls += 1;
        }
        fn today(&mut self) {
            self.other_calls += 1;
        }
    }

    fn assert_close(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    fn controller() -> SyncController<CountingWidget, SqliteFallbackStore> {
        let store = SqliteFallbackStore::open_in_memory().expect("store");
        SyncController::new(CountingWidget::default(), store, TransformPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_interval_and_rearms() {
        let period = Duration::from_secs(300);
        let start = Instant::now();
        let mut scheduler = RefreshScheduler::new(period);
        let mut sync = controller();

        let early = tokio::time::timeout(
            Duration::from_secs(299),
            scheduler.refresh_when_due(&mut sync),
        )
        .await;
        assert!(early.is_err());
        assert_eq!(sync.widget().renders, 0);

        scheduler.refresh_when_due(&mut sync).await;
        assert_close(Instant::now() - start, period);
        assert_eq!(sync.widget().renders, 1);
        assert_eq!(sync.widget().other_calls, 0);
        assert_eq!(scheduler.deadline(), Instant::now() + period);

        scheduler.refresh_when_due(&mut sync).await;
        assert_close(Instant::now() - start, period * 2);
        assert_eq!(sync.widget().renders, 2);
        assert_eq!(sync.widget().other_calls, 0);
        assert_eq!(sync.snapshots_applied(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn late_tick_rearms_from_firing_time() {
        let period = Duration::from_secs(60);
        let mut scheduler = RefreshScheduler::new(period);
        tokio::time::advance(Duration::from_secs(90)).await;

        scheduler.tick().await;
        let fired_at = Instant::now();
        assert_eq!(scheduler.deadline(), fired_at + period);
        assert_eq!(scheduler.period(), period);
    }
}
