//! Timers backed by `tokio::time::sleep` tasks.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::DriverEvent;
use crate::websocket::ports::{Scheduler, TimerId};

/// Spawns one sleeping task per armed timer; cancelling aborts the task.
pub struct TokioScheduler {
    events: mpsc::UnboundedSender<DriverEvent>,
    next: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(events: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self {
            events,
            next: 0,
            tasks: HashMap::new(),
        }
    }

    /// Timers that have been armed and neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, after: Duration) -> TimerId {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next += 1;
        let id = TimerId(self.next);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(DriverEvent::Timer(id));
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(task) = self.tasks.remove(&timer) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
