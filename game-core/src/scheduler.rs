//! Virtual-time timers for the real-time mini-games.
//!
//! Nothing here touches a wall clock: time only moves when a game calls
//! [`Scheduler::poll_until`], so a whole round can be replayed in a test by
//! feeding it elapsed milliseconds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Timer<E> {
    id: u64,
    event: E,
    due_ms: u64,
    interval_ms: Option<u64>,
    cancelled: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct Scheduler<E> {
    now_ms: u64,
    next_id: u64,
    timers: Vec<Timer<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            timers: Vec::new(),
        }
    }
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fires `event` every `interval_ms`, first at `now + interval_ms`.
    pub fn every(&mut self, interval_ms: u64, event: E) -> TimerHandle {
        let interval_ms = interval_ms.max(1);
        self.push(event, self.now_ms.saturating_add(interval_ms), Some(interval_ms))
    }

    pub fn after(&mut self, delay_ms: u64, event: E) -> TimerHandle {
        self.push(event, self.now_ms.saturating_add(delay_ms), None)
    }

    /// Changes a repeating timer's period; the next firing moves to `now + interval_ms`.
    pub fn reschedule(&mut self, handle: &TimerHandle, interval_ms: u64) {
        let interval_ms = interval_ms.max(1);
        let now = self.now_ms;
        if let Some(timer) = self.timers.iter_mut().find(|t| t.id == handle.id) {
            timer.interval_ms = Some(interval_ms);
            timer.due_ms = now.saturating_add(interval_ms);
        }
    }

    pub fn cancel(&mut self, handle: &TimerHandle) {
        handle.cancel();
        self.timers.retain(|t| t.id != handle.id);
    }

    pub fn cancel_all(&mut self) {
        for timer in self.timers.drain(..) {
            timer.cancelled.store(true, Ordering::SeqCst);
        }
    }

    pub fn pending(&self) -> usize {
        self.timers
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Pops the earliest timer due at or before `until_ms` and moves the clock
    /// to its firing time. Returns `None` once nothing else is due, leaving the
    /// clock at `until_ms`.
    pub fn poll_until(&mut self, until_ms: u64) -> Option<E> {
        self.timers
            .retain(|t| !t.cancelled.load(Ordering::SeqCst));

        let next = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(index, _)| index);

        let Some(index) = next else {
            self.now_ms = self.now_ms.max(until_ms);
            return None;
        };

        let timer = &mut self.timers[index];
        let fired_at = timer.due_ms;
        let event = timer.event.clone();
        // A repeating timer whose next firing would pass the end of time is retired.
        match timer.interval_ms.and_then(|interval| timer.due_ms.checked_add(interval)) {
            Some(next) => timer.due_ms = next,
            None => {
                self.timers.swap_remove(index);
            }
        }
        self.now_ms = self.now_ms.max(fired_at);
        Some(event)
    }

    fn push(&mut self, event: E, due_ms: u64, interval_ms: Option<u64>) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let cancelled = Arc::new(AtomicBool::new(false));
        self.timers.push(Timer {
            id,
            event,
            due_ms,
            interval_ms,
            cancelled: cancelled.clone(),
        });
        TimerHandle { id, cancelled }
    }
}
