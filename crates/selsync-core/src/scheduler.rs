//! Cancellable timers and background tasks
//!
//! Everything the service starts (server accept loop, poll timer, change
//! listeners) is registered here so shutdown can cancel all of it in one
//! step. In-flight connections spawned by those tasks are not tracked and
//! finish (or fail) on their own.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Handle to a spawned timer or task; aborts it when cancelled or dropped
#[derive(Debug)]
pub struct TimerHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Owner of every timer and long-lived task of a running service
#[derive(Debug, Default)]
pub struct Scheduler {
    handles: Vec<TimerHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `tick` every `period`, first after one full period
    ///
    /// A tick that overruns the period delays the next one instead of
    /// bursting to catch up.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        self.handles.push(TimerHandle { name, task });
    }

    /// Register a long-lived task
    pub fn spawn<Fut>(&mut self, name: &'static str, fut: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(fut);
        self.handles.push(TimerHandle { name, task });
    }

    /// Names of the registered handles that are still running
    pub fn active(&self) -> Vec<&'static str> {
        self.handles
            .iter()
            .filter(|h| !h.is_finished())
            .map(TimerHandle::name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every timer and task
    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.cancel();
        }
    }

    /// Cancel every timer and task and wait until they are gone
    ///
    /// Resources owned by the tasks (such as a bound listener) are released
    /// when this returns.
    pub async fn shutdown(&mut self) {
        for mut handle in self.handles.drain(..) {
            handle.task.abort();
            let _ = (&mut handle.task).await;
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
