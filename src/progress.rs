//! Cosmetic progress indicator.
//!
//! The percentage is a timer-driven animation, not a measurement: it climbs
//! towards 80% at a fixed cadence while a request is in flight and snaps to
//! 100% when the request settles, whatever the actual work looked like.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Interval between synthetic increments.
pub const PROGRESS_TICK: Duration = Duration::from_secs(1);

/// The running phase never goes past this percentage.
pub const RUNNING_CEILING: u8 = 80;

/// Ticks needed to reach the ceiling (80/30 percent per tick).
const TICKS_TO_CEILING: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Idle,
    Running,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub phase: ProgressPhase,
    pub percent: u8,
}

impl ProgressSnapshot {
    const IDLE: Self = Self {
        phase: ProgressPhase::Idle,
        percent: 0,
    };
}

/// Percentage shown after `tick` increments: floor(tick * 80 / 30), capped at 80.
pub fn synthetic_percent(tick: u32) -> u8 {
    let percent = u64::from(tick) * u64::from(RUNNING_CEILING) / u64::from(TICKS_TO_CEILING);
    percent.min(u64::from(RUNNING_CEILING)) as u8
}

/// Idle → running (0 → 80 by timer) → complete (100).
pub struct ProgressIndicator {
    state: Arc<watch::Sender<ProgressSnapshot>>,
    interval: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressIndicator {
    pub fn new() -> Self {
        Self::with_interval(PROGRESS_TICK)
    }

    pub fn with_interval(interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::IDLE);
        Self {
            state: Arc::new(tx),
            interval,
            ticker: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.state.subscribe()
    }

    /// Enter the running phase at 0% and start the timer. No-op if already
    /// running. Must be called from within a tokio runtime.
    pub fn start(&self) {
        if self.snapshot().phase == ProgressPhase::Running {
            return;
        }

        self.state.send_replace(ProgressSnapshot {
            phase: ProgressPhase::Running,
            percent: 0,
        });

        let state = Arc::clone(&self.state);
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut tick = 0u32;
            loop {
                tokio::time::sleep(interval).await;
                tick += 1;
                let percent = synthetic_percent(tick);
                let still_running = state.send_if_modified(|s| {
                    if s.phase != ProgressPhase::Running {
                        return false;
                    }
                    s.percent = percent;
                    true
                });
                if !still_running || percent >= RUNNING_CEILING {
                    break;
                }
            }
        });

        self.replace_ticker(Some(handle));
    }

    /// Settle at 100%, regardless of where the animation was.
    pub fn complete(&self) {
        self.replace_ticker(None);
        self.state.send_replace(ProgressSnapshot {
            phase: ProgressPhase::Complete,
            percent: 100,
        });
    }

    /// Back to idle at 0%, e.g. when a new file is chosen.
    pub fn reset(&self) {
        self.replace_ticker(None);
        self.state.send_replace(ProgressSnapshot::IDLE);
    }

    fn replace_ticker(&self, next: Option<JoinHandle<()>>) {
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(old) = ticker.take() {
                old.abort();
            }
            *ticker = next;
        }
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        self.replace_ticker(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_percent_floors_and_caps() {
        assert_eq!(synthetic_percent(0), 0);
        assert_eq!(synthetic_percent(1), 2);
        assert_eq!(synthetic_percent(2), 5);
        assert_eq!(synthetic_percent(15), 40);
        assert_eq!(synthetic_percent(29), 77);
        assert_eq!(synthetic_percent(30), 80);
        assert_eq!(synthetic_percent(1000), 80);
    }

    #[test]
    fn starts_idle() {
        let progress = ProgressIndicator::new();
        assert_eq!(progress.snapshot(), ProgressSnapshot::IDLE);
    }

    #[tokio::test(start_paused = true)]
    async fn climbs_at_fixed_cadence() {
        let progress = ProgressIndicator::new();
        progress.start();
        assert_eq!(progress.snapshot().phase, ProgressPhase::Running);
        assert_eq!(progress.snapshot().percent, 0);

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(progress.snapshot().percent, synthetic_percent(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stalls_at_ceiling_until_complete() {
        let progress = ProgressIndicator::new();
        progress.start();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(progress.snapshot().percent, RUNNING_CEILING);
        assert_eq!(progress.snapshot().phase, ProgressPhase::Running);

        progress.complete();
        assert_eq!(
            progress.snapshot(),
            ProgressSnapshot {
                phase: ProgressPhase::Complete,
                percent: 100
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn complete_snaps_to_full_and_stops_timer() {
        let progress = ProgressIndicator::new();
        progress.start();
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        progress.complete();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(progress.snapshot().percent, 100);
        assert_eq!(progress.snapshot().phase, ProgressPhase::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_updates() {
        let progress = ProgressIndicator::with_interval(Duration::from_millis(100));
        let mut rx = progress.subscribe();
        progress.start();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().phase, ProgressPhase::Running);

        progress.complete();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().percent, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_idle() {
        let progress = ProgressIndicator::new();
        progress.start();
        tokio::time::sleep(Duration::from_secs(5)).await;
        progress.reset();
        assert_eq!(progress.snapshot(), ProgressSnapshot::IDLE);
    }
}
