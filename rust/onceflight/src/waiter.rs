//! One-shot hand-off cells between a flight's dispatcher and its callers.
//!
//! Every call registered with a coalescing group owns exactly one [`Waiter`];
//! the matching [`Notifier`] is held in the group's waiter set until the
//! flight's outcome is dispatched. The cell carries at most one value, and it
//! retains that value if it is delivered before the waiter starts waiting, so
//! delivery can never race with suspension.
//!
//! If a notifier is dropped without delivering, its waiter unblocks and
//! observes `None`. Group dispatch always delivers, so under normal operation
//! this path is a safety net rather than a protocol state.

use std::sync::{Arc, Condvar, Mutex};

/// Creates a connected notifier/waiter pair over a fresh hand-off cell.
pub(crate) fn slot<T>() -> (Notifier<T>, Waiter<T>) {
    let cell = Arc::new(Cell::new());
    (Notifier(cell.clone()), Waiter(cell))
}

/// The delivering half of a hand-off cell.
///
/// A notifier delivers exactly one value via [`notify`](Self::notify), which
/// consumes it. Dropping an undelivered notifier closes the cell instead.
pub(crate) struct Notifier<T>(Arc<Cell<T>>);

impl<T> Notifier<T> {
    /// Delivers the value and wakes the paired waiter.
    pub fn notify(self, value: T) {
        self.0.fill(value);
    }
}

impl<T> Drop for Notifier<T> {
    fn drop(&mut self) {
        // No-op if a value was already delivered.
        self.0.close();
    }
}

/// The receiving half of a hand-off cell.
pub(crate) struct Waiter<T>(Arc<Cell<T>>);

impl<T> Waiter<T> {
    /// Blocks the current thread until the paired notifier delivers a value.
    ///
    /// Returns `None` if the notifier was dropped without delivering.
    pub fn wait(self) -> Option<T> {
        self.0.take()
    }
}

/// Shared cell state: a mutex-guarded slot plus a condvar to park the waiter.
struct Cell<T> {
    slot: Mutex<Slot<T>>,
    signal: Condvar,
}

impl<T> Cell<T> {
    fn new() -> Cell<T> {
        Cell {
            slot: Mutex::new(Slot::Pending),
            signal: Condvar::new(),
        }
    }

    fn fill(&self, value: T) {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_pending() {
            *slot = Slot::Ready(value);
        }
        drop(slot);
        self.signal.notify_one();
    }

    fn close(&self) {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_pending() {
            *slot = Slot::Closed;
        }
        drop(slot);
        self.signal.notify_one();
    }

    fn take(&self) -> Option<T> {
        let slot = self.slot.lock().unwrap();
        let mut slot = self
            .signal
            .wait_while(slot, |slot| slot.is_pending())
            .unwrap();
        match std::mem::replace(&mut *slot, Slot::Closed) {
            Slot::Ready(value) => Some(value),
            Slot::Pending | Slot::Closed => None,
        }
    }
}

enum Slot<T> {
    /// Nothing delivered yet; the waiter parks on the condvar.
    Pending,
    /// A value was delivered and awaits consumption.
    Ready(T),
    /// The notifier was dropped without delivering, or the value was taken.
    Closed,
}

impl<T> Slot<T> {
    fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }
}
