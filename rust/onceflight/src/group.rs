//! Keyless coalescing: every concurrent call shares one flight.

use std::sync::{Arc, Mutex};

use crate::outcome::Outcome;
use crate::waiter::{self, Notifier};

/// A coalescing group with a single implicit flight.
///
/// At most one workload is running at any given time. Calls to
/// [`run`](Self::run) that arrive while a workload is in flight wait for its
/// result instead of starting a new execution; once the flight completes, the
/// same outcome is returned to every caller that joined it, and a subsequent
/// call starts a fresh execution.
///
/// The group is a cheap handle over shared state: clone it freely across
/// threads, or share a single instance by reference. A default-constructed
/// group is immediately usable.
///
/// # Example
///
/// ```
/// use onceflight::Group;
///
/// let group: Group<u64, std::convert::Infallible> = Group::new();
/// let value = group.run(|| Ok(1234))?;
/// assert_eq!(value, 1234);
/// # Ok::<(), std::convert::Infallible>(())
/// ```
pub struct Group<V, E> {
    shared: Arc<Shared<V, E>>,
}

impl<V, E> Group<V, E> {
    /// Creates a new group with no flight in progress.
    pub fn new() -> Group<V, E> {
        Group {
            shared: Arc::new(Shared {
                waiters: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl<V, E> Group<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Runs the workload through the group, coalescing concurrent calls.
    ///
    /// If no flight is in progress, this call becomes the leader: the
    /// workload is moved to a dedicated executor thread and invoked there
    /// exactly once. Otherwise the call joins the in-flight execution and its
    /// own `workload` is dropped unused. Either way, the current thread
    /// blocks until the flight's outcome is published and then returns it.
    ///
    /// The outcome is shared: every joiner of the same flight receives a
    /// clone of the same value or the same error. Errors are propagated
    /// verbatim; wrap a non-clonable error type in [`Arc`] at the call site.
    ///
    /// # Panics
    ///
    /// If the workload panics, the panic is re-raised in every caller that
    /// joined the flight. The group itself stays usable.
    pub fn run<F>(&self, workload: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E> + Send + 'static,
    {
        let (notifier, waiter) = waiter::slot();

        let leads = {
            let mut waiters = self.shared.waiters.lock().unwrap();
            waiters.push(notifier);
            waiters.len() == 1
        };

        if leads {
            log::trace!("leading a new shared flight");
            let shared = Arc::clone(&self.shared);
            std::thread::spawn(move || Shared::execute(shared, workload));
        } else {
            log::trace!("joining the shared flight in progress");
        }

        waiter.wait().expect("flight outcome").into_result()
    }
}

impl<V, E> Clone for Group<V, E> {
    fn clone(&self) -> Group<V, E> {
        Group {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V, E> Default for Group<V, E> {
    fn default() -> Group<V, E> {
        Group::new()
    }
}

struct Shared<V, E> {
    /// Waiter set of the current flight; empty means no flight in progress.
    waiters: Mutex<Vec<Notifier<Outcome<V, E>>>>,
}

impl<V, E> Shared<V, E>
where
    V: Clone,
    E: Clone,
{
    /// Executor body: runs the workload once, then atomically drains the
    /// waiter set and delivers the outcome to everyone drained. Draining
    /// before delivery is what lets a call arriving afterwards start a fresh
    /// flight.
    fn execute<F>(shared: Arc<Shared<V, E>>, workload: F)
    where
        F: FnOnce() -> Result<V, E>,
    {
        let outcome = Outcome::capture(workload);
        let waiters = std::mem::take(&mut *shared.waiters.lock().unwrap());
        log::debug!("dispatching shared flight outcome to {} waiters", waiters.len());
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

    use super::Group;

    #[test]
    fn test_single_call() {
        let group: Group<usize, Infallible> = Group::new();
        assert_eq!(group.run(|| Ok(42)), Ok(42));
    }

    #[test]
    fn test_sequential_calls_run_fresh() {
        let group: Group<usize, Infallible> = Group::default();
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 1..=10 {
            let counter = counter.clone();
            let value = group
                .run(move || Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
                .unwrap();
            assert_eq!(value, i);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_error_returned() {
        let group: Group<usize, String> = Group::new();
        let res = group.run(|| Err("workload failed".to_string()));
        assert_eq!(res, Err("workload failed".to_string()));

        // A failed flight clears like a successful one.
        assert_eq!(group.run(|| Ok(1)), Ok(1));
    }
}
