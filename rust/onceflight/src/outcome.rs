//! Capture of a single workload execution, fanned out to every joiner.

use std::panic::{self, AssertUnwindSafe};

/// The terminal state of one flight, cloned to every registered waiter.
#[derive(Clone)]
pub(crate) enum Outcome<V, E> {
    /// The workload ran to completion and returned.
    Returned(Result<V, E>),
    /// The workload panicked, with its payload message when one could be
    /// recovered.
    Panicked(Option<String>),
}

impl<V, E> Outcome<V, E> {
    /// Runs the workload exactly once, converting an unwind into a value
    /// that can still be broadcast to the flight's waiters.
    pub fn capture<F>(workload: F) -> Outcome<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        // The closure is consumed either way; nothing it captured is
        // observed after an unwind.
        match panic::catch_unwind(AssertUnwindSafe(workload)) {
            Ok(result) => Outcome::Returned(result),
            Err(payload) => Outcome::Panicked(payload_message(&payload)),
        }
    }

    /// Unpacks the outcome in a joiner's context, re-raising a captured
    /// panic.
    pub fn into_result(self) -> Result<V, E> {
        match self {
            Outcome::Returned(result) => result,
            Outcome::Panicked(Some(message)) => {
                panic!("coalesced workload panicked: {message}")
            }
            Outcome::Panicked(None) => panic!("coalesced workload panicked"),
        }
    }
}

fn payload_message(payload: &(dyn std::any::Any + Send)) -> Option<String> {
    if let Some(message) = payload.downcast_ref::<&str>() {
        Some((*message).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}
