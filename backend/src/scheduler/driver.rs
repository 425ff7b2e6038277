use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::ScheduleBook;

/// Background task that executes due repayment schedules on a fixed tick.
pub struct ScheduleDriver {
    book: Arc<ScheduleBook>,
    period: Duration,
}

impl ScheduleDriver {
    pub fn new(book: Arc<ScheduleBook>, period: Duration) -> Self {
        Self { book, period }
    }

    /// Spawns the tick loop. It exits once `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(period_secs = self.period.as_secs(), "schedule driver started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let executed = self.tick().await;
                        if executed > 0 {
                            tracing::info!(executed, "due repayment schedules executed");
                        }
                    }
                }
            }
            tracing::info!("schedule driver stopped");
        })
    }

    pub async fn tick(&self) -> usize {
        self.book.execute_due(Utc::now()).await.len()
    }
}
