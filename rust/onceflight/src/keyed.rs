//! Keyed coalescing: one independent flight per string key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::outcome::Outcome;
use crate::waiter::{self, Notifier};

/// A coalescing group that deduplicates work per string key.
///
/// Concurrent [`run`](Self::run) calls with the same key share a single
/// workload execution; calls under distinct keys proceed independently, with
/// no serialization between them beyond the group's brief bookkeeping. As
/// with [`Group`](crate::Group), nothing is memoized: once a key's flight
/// delivers its outcome, the next call for that key executes fresh work.
///
/// # Example
///
/// ```
/// use onceflight::KeyedGroup;
///
/// let group: KeyedGroup<String, std::convert::Infallible> = KeyedGroup::new();
/// let value = group.run("config", || Ok("loaded".to_string()))?;
/// assert_eq!(value, "loaded");
/// # Ok::<(), std::convert::Infallible>(())
/// ```
pub struct KeyedGroup<V, E> {
    shared: Arc<KeyedShared<V, E>>,
}

impl<V, E> KeyedGroup<V, E> {
    /// Creates a new group with no flights in progress.
    pub fn new() -> KeyedGroup<V, E> {
        KeyedGroup {
            shared: Arc::new(KeyedShared {
                flights: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the number of keys with a flight currently in progress.
    pub fn in_flight_count(&self) -> usize {
        self.shared
            .flights
            .lock()
            .unwrap()
            .values()
            .filter(|waiters| !waiters.is_empty())
            .count()
    }
}

impl<V, E> KeyedGroup<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Runs the workload through the flight identified by `key`.
    ///
    /// The first call to observe no flight for `key` becomes the leader and
    /// hands the workload to a dedicated executor thread; every concurrent
    /// call with the same key joins that flight instead of executing, and all
    /// of them receive the one execution's value or error. A call arriving
    /// after the outcome was dispatched starts a new flight.
    ///
    /// # Panics
    ///
    /// If the workload panics, the panic is re-raised in every caller that
    /// joined the flight. The flight is cleared and the group stays usable.
    pub fn run<F>(&self, key: impl Into<String>, workload: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E> + Send + 'static,
    {
        let key = key.into();
        let (notifier, waiter) = waiter::slot();

        let leads = {
            let mut flights = self.shared.flights.lock().unwrap();
            // A missing entry and a drained one are both "no flight in
            // progress": either way this caller leads a fresh one.
            let waiters = flights.entry(key.clone()).or_default();
            waiters.push(notifier);
            waiters.len() == 1
        };

        if leads {
            log::trace!("leading a new flight for key {key:?}");
            let shared = Arc::clone(&self.shared);
            std::thread::spawn(move || KeyedShared::execute(shared, key, workload));
        } else {
            log::trace!("joining the flight in progress for key {key:?}");
        }

        waiter.wait().expect("flight outcome").into_result()
    }
}

impl<V, E> Clone for KeyedGroup<V, E> {
    fn clone(&self) -> KeyedGroup<V, E> {
        KeyedGroup {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V, E> Default for KeyedGroup<V, E> {
    fn default() -> KeyedGroup<V, E> {
        KeyedGroup::new()
    }
}

struct KeyedShared<V, E> {
    /// Live flights by key. A key maps to the ordered waiter set of its
    /// current flight; dispatch removes the entry wholesale.
    flights: Mutex<HashMap<String, Vec<Notifier<Outcome<V, E>>>>>,
}

impl<V, E> KeyedShared<V, E>
where
    V: Clone,
    E: Clone,
{
    fn execute<F>(shared: Arc<KeyedShared<V, E>>, key: String, workload: F)
    where
        F: FnOnce() -> Result<V, E>,
    {
        let outcome = Outcome::capture(workload);
        let waiters = shared
            .flights
            .lock()
            .unwrap()
            .remove(&key)
            .unwrap_or_default();
        log::debug!(
            "dispatching outcome for key {key:?} to {} waiters",
            waiters.len()
        );
        for notifier in waiters {
            notifier.notify(outcome.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::KeyedGroup;

    #[test]
    fn test_distinct_keys_execute_separately() {
        let group: KeyedGroup<String, Infallible> = KeyedGroup::new();
        let executions = Arc::new(AtomicUsize::new(0));

        for key in ["alpha", "beta", "gamma"] {
            let executions = executions.clone();
            let value = group
                .run(key, move || {
                    executions.fetch_add(1, Ordering::SeqCst);
                    Ok(key.to_string())
                })
                .unwrap();
            assert_eq!(value, key);
        }

        assert_eq!(executions.load(Ordering::SeqCst), 3);
        assert_eq!(group.in_flight_count(), 0);
    }

    #[test]
    fn test_sequential_calls_run_fresh() {
        let group: KeyedGroup<usize, Infallible> = KeyedGroup::default();
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 1..=10 {
            let counter = counter.clone();
            let value = group
                .run("key", move || {
                    Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
                })
                .unwrap();
            assert_eq!(value, i);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_error_returned() {
        let group: KeyedGroup<usize, String> = KeyedGroup::new();
        let res = group.run("key", || Err("workload failed".to_string()));
        assert_eq!(res, Err("workload failed".to_string()));
        assert_eq!(group.in_flight_count(), 0);
    }

    #[test]
    fn test_owned_and_borrowed_keys() {
        let group: KeyedGroup<usize, Infallible> = KeyedGroup::new();
        assert_eq!(group.run("key", || Ok(1)), Ok(1));
        assert_eq!(group.run(String::from("key"), || Ok(2)), Ok(2));
    }
}
