//! Cancellable scheduled tasks backing question deadlines, countdown ticks and settle pauses.

use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, sleep_until},
};

/// Whether a periodic task keeps running after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Schedule the next tick.
    Continue,
    /// Stop ticking.
    Stop,
}

/// Handle on a spawned timer; cancelling it (explicitly or by dropping it) aborts the task.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `task` once after `delay`.
    pub fn after<F>(delay: Duration, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            task.await;
        });
        Self { handle }
    }

    /// Call `tick` every `period`, first after one period, until it returns [`TickControl::Stop`].
    pub fn every<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let first = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tick() == TickControl::Stop {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Abort the task; safe to call on a finished or already cancelled task.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task completed or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Timer slots of one room. At most one task lives in each slot.
#[derive(Debug, Default)]
pub struct RoomTimers {
    start: Option<ScheduledTask>,
    deadline: Option<ScheduledTask>,
    tick: Option<ScheduledTask>,
    settle: Option<ScheduledTask>,
}

impl RoomTimers {
    /// Install the pre-quiz start task.
    pub fn set_start(&mut self, task: ScheduledTask) {
        self.cancel_all();
        self.start = Some(task);
    }

    /// Install the deadline and countdown of a freshly shown question.
    pub fn set_question(&mut self, deadline: ScheduledTask, tick: ScheduledTask) {
        self.cancel_all();
        self.deadline = Some(deadline);
        self.tick = Some(tick);
    }

    /// Install the pause following a settled question.
    pub fn set_settle(&mut self, task: ScheduledTask) {
        self.cancel_all();
        self.settle = Some(task);
    }

    /// Cancel every pending task of the room. Idempotent.
    pub fn cancel_all(&mut self) {
        for task in [
            self.start.take(),
            self.deadline.take(),
            self.tick.take(),
            self.settle.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::time::advance;

    use super::*;

    async fn settle_tasks() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_task_runs_once_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let task = ScheduledTask::after(Duration::from_secs(3), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        advance(Duration::from_millis(2_900)).await;
        settle_tasks().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!task.is_finished());

        advance(Duration::from_millis(200)).await;
        settle_tasks().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_fires_and_cancel_is_idempotent() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let task = ScheduledTask::after(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        task.cancel();
        task.cancel();

        advance(Duration::from_secs(5)).await;
        settle_tasks().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_task_stops_itself() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let _task = ScheduledTask::every(Duration::from_millis(500), move || {
            let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if seen == 3 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        });

        for _ in 0..10 {
            advance(Duration::from_millis(500)).await;
            settle_tasks().await;
        }
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_timers_cancels_them() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let mut timers = RoomTimers::default();
        timers.set_settle(ScheduledTask::after(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        drop(timers);

        advance(Duration::from_secs(2)).await;
        settle_tasks().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
