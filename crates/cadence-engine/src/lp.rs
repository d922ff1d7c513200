//! The logical-process contract.
//!
//! A [`Lp`] is the engine's user-extension seam: an opaque behavior that
//! the scheduler activates when a message is pending for it or its wakeup
//! tick has arrived. The activation returns a [`Schedule`] verdict that
//! decides when (or whether) the process runs again.

use cadence_core::Inbox;

use crate::runner::Runner;

/// Reschedule verdict returned by [`Lp::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Run again `delta` ticks after the current one. `delta` must be at
    /// least 1; debug builds assert, release builds clamp up to 1.
    After(i64),
    /// Sleep indefinitely until a message is delivered.
    Sleep,
    /// Terminate. The slot is freed and the process id becomes stale.
    Halt,
}

/// A logical process: user-provided behavior driven by the engine.
///
/// `rt` is the owning runner, which exposes the current tick, the
/// runner's private PRNG, aggregate updates, message staging, and process
/// management. `inbox` holds the messages delivered to this process at the
/// start of the current tick; it is empty when the activation was a timer
/// wakeup.
///
/// Processes on the same runner execute in slot-index order within a tick.
/// Processes on different runners execute concurrently and must not assume
/// any relative order.
pub trait Lp: Send {
    /// Execute one activation and report when to run next.
    fn run(&mut self, rt: &mut Runner, inbox: Inbox) -> Schedule;
}
