//! In-process request coalescing ("single-flight") primitives.
//!
//! When many concurrent callers ask for the same logically-identical unit of
//! work (a cache fill, an upstream fetch, an expensive computation), running
//! that work once per caller is pure waste. The groups in this crate let the
//! first caller execute the workload while every other concurrent caller for
//! the same work simply waits for, and shares, that one execution's result.
//!
//! # Key Components
//!
//! ## Coalescing Groups
//!
//! - [`Group`] - a keyless group: every concurrent call shares a single
//!   implicit flight
//! - [`KeyedGroup`] - a keyed group: calls are coalesced per string key, and
//!   flights under distinct keys proceed independently
//!
//! ## Execution Model
//!
//! The first caller to register interest in a flight becomes its *leader*:
//! the workload is handed to a dedicated executor thread, decoupled from the
//! leader's own call frame. Every caller, leader included, then blocks on a
//! private one-shot hand-off cell until the executor publishes the outcome.
//! Publishing atomically clears the flight, so a call arriving afterwards
//! starts fresh work rather than replaying a stale result.
//!
//! # Guarantees
//!
//! - The workload runs exactly once per flight, no matter how many callers
//!   join it.
//! - Every joiner of a flight observes the same value or the same error.
//! - Results are never memoized past the flight itself: once the outcome is
//!   delivered, the next call executes anew.
//! - A workload failure is propagated verbatim to every joiner; the group
//!   never wraps, retries, or suppresses it.
//!
//! # Example
//!
//! ```
//! use onceflight::KeyedGroup;
//!
//! let group: KeyedGroup<String, std::convert::Infallible> = KeyedGroup::new();
//! let value = group.run("user:42", || Ok("profile data".to_string()))?;
//! assert_eq!(value, "profile data");
//! # Ok::<(), std::convert::Infallible>(())
//! ```
//!
//! Cancellation is deliberately out of scope: a caller cannot abort a flight
//! it joined, and the workload always runs to completion once started.

pub mod group;
pub mod keyed;

mod outcome;
mod waiter;

pub use group::Group;
pub use keyed::KeyedGroup;
