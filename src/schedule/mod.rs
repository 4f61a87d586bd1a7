//! Update scheduler - one flush per update cycle.
//!
//! Property mutations arrive one at a time, but the grid engine should see
//! at most one settings push per update cycle. The scheduler records which
//! keys were touched and defers a single flush onto the host environment's
//! deferred-callback queue, so N synchronous mutations collapse into one
//! reconciliation.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::{Rc, Weak};

use crate::types::SettingName;

// =============================================================================
// Tick Queue
// =============================================================================

/// The host environment's deferred-callback seam (its "microtask queue").
///
/// Single-threaded and cooperative: the embedding application drains the
/// queue once per update cycle. Tasks deferred while a drain is running are
/// held for the next drain, which is what gives flushes their
/// one-per-cycle granularity.
#[derive(Default)]
pub struct TickQueue {
    tasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl TickQueue {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Enqueue a one-shot deferred callback.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run every task that was queued when the drain started, in FIFO
    /// order. Returns the number of tasks run.
    pub fn drain(&self) -> usize {
        let pending = self.tasks.borrow().len();
        for _ in 0..pending {
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        pending
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

// =============================================================================
// Update Scheduler
// =============================================================================

/// Receives the union of keys touched during one update cycle.
pub type FlushSink = Box<dyn FnMut(BTreeSet<SettingName>)>;

struct SchedulerState {
    dirty: BTreeSet<SettingName>,
    scheduled: bool,
    sink: Option<FlushSink>,
}

/// Coalesces change notifications into one flush per update cycle.
///
/// `notify_changed` never blocks; the first notification of a cycle defers
/// exactly one flush onto the tick queue. The deferred flush holds only a
/// weak reference to scheduler state, so a scheduler dropped before the
/// queue drains simply loses its pending flush - no error, no callback.
pub struct UpdateScheduler {
    queue: Rc<TickQueue>,
    state: Rc<RefCell<SchedulerState>>,
}

impl UpdateScheduler {
    pub fn new(queue: Rc<TickQueue>) -> Self {
        Self {
            queue,
            state: Rc::new(RefCell::new(SchedulerState {
                dirty: BTreeSet::new(),
                scheduled: false,
                sink: None,
            })),
        }
    }

    /// Install the flush sink. Replaces any previous sink.
    pub fn set_sink(&self, sink: impl FnMut(BTreeSet<SettingName>) + 'static) {
        self.state.borrow_mut().sink = Some(Box::new(sink));
    }

    /// Record a touched key and schedule a flush if none is pending.
    pub fn notify_changed(&self, key: impl Into<SettingName>) {
        let mut state = self.state.borrow_mut();
        state.dirty.insert(key.into());
        if state.scheduled {
            return;
        }
        state.scheduled = true;
        drop(state);

        let weak = Rc::downgrade(&self.state);
        self.queue.defer(move || Self::flush(weak));
    }

    /// Drop the sink and any accumulated dirty keys. A flush already on the
    /// queue becomes a no-op.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        state.sink = None;
        state.dirty.clear();
    }

    /// True if a flush is scheduled but has not run yet.
    pub fn has_pending_flush(&self) -> bool {
        self.state.borrow().scheduled
    }

    fn flush(weak: Weak<RefCell<SchedulerState>>) {
        let Some(state) = weak.upgrade() else {
            // Owner destroyed before the queue drained.
            return;
        };

        // The sink is moved out for the duration of the call so it may
        // re-enter notify_changed without aliasing scheduler state.
        let (dirty, mut sink) = {
            let mut state = state.borrow_mut();
            state.scheduled = false;
            (std::mem::take(&mut state.dirty), state.sink.take())
        };

        if !dirty.is_empty() {
            if let Some(sink) = sink.as_mut() {
                sink(dirty);
            }
        }

        let mut state = state.borrow_mut();
        if state.sink.is_none() {
            state.sink = sink;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_scheduler(
        queue: &Rc<TickQueue>,
    ) -> (UpdateScheduler, Rc<RefCell<Vec<Vec<String>>>>) {
        let flushes = Rc::new(RefCell::new(Vec::new()));
        let log = flushes.clone();
        let scheduler = UpdateScheduler::new(queue.clone());
        scheduler.set_sink(move |keys| {
            log.borrow_mut().push(keys.into_iter().collect());
        });
        (scheduler, flushes)
    }

    #[test]
    fn burst_of_notifications_collapses_into_one_flush() {
        let queue = TickQueue::new();
        let (scheduler, flushes) = recording_scheduler(&queue);

        scheduler.notify_changed("rowHeaders");
        scheduler.notify_changed("colHeaders");
        scheduler.notify_changed("readOnly");
        scheduler.notify_changed("rowHeaders");
        assert!(scheduler.has_pending_flush());

        queue.drain();
        assert_eq!(
            *flushes.borrow(),
            vec![vec![
                "colHeaders".to_string(),
                "readOnly".to_string(),
                "rowHeaders".to_string()
            ]]
        );
        assert!(!scheduler.has_pending_flush());
    }

    #[test]
    fn cycles_flush_in_completion_order() {
        let queue = TickQueue::new();
        let (scheduler, flushes) = recording_scheduler(&queue);

        scheduler.notify_changed("first");
        queue.drain();
        scheduler.notify_changed("second");
        queue.drain();

        assert_eq!(
            *flushes.borrow(),
            vec![vec!["first".to_string()], vec!["second".to_string()]]
        );
    }

    #[test]
    fn notification_during_drain_lands_in_next_cycle() {
        let queue = TickQueue::new();
        let flushes = Rc::new(RefCell::new(Vec::new()));
        let scheduler = Rc::new(UpdateScheduler::new(queue.clone()));

        let log = flushes.clone();
        let reentrant = scheduler.clone();
        let mut chained = false;
        scheduler.set_sink(move |keys: BTreeSet<String>| {
            log.borrow_mut().push(keys.into_iter().collect::<Vec<_>>());
            if !chained {
                chained = true;
                reentrant.notify_changed("chained");
            }
        });

        scheduler.notify_changed("initial");
        queue.drain();
        assert_eq!(*flushes.borrow(), vec![vec!["initial".to_string()]]);

        queue.drain();
        assert_eq!(
            *flushes.borrow(),
            vec![vec!["initial".to_string()], vec!["chained".to_string()]]
        );
    }

    #[test]
    fn dropped_scheduler_loses_its_pending_flush() {
        let queue = TickQueue::new();
        let (scheduler, flushes) = recording_scheduler(&queue);

        scheduler.notify_changed("doomed");
        drop(scheduler);
        queue.drain();
        assert!(flushes.borrow().is_empty());
    }

    #[test]
    fn cancel_turns_a_pending_flush_into_a_no_op() {
        let queue = TickQueue::new();
        let (scheduler, flushes) = recording_scheduler(&queue);

        scheduler.notify_changed("doomed");
        scheduler.cancel();
        queue.drain();
        assert!(flushes.borrow().is_empty());
    }
}
