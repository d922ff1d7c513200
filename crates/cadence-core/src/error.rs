//! Error types for the Cadence engine.
//!
//! Every failure surfaces to the caller as a structured value; nothing is
//! retried internally. Lookup failures ([`SimError::MismatchRunner`],
//! [`SimError::OutOfRange`], [`SimError::Stale`]) leave the addressed slot
//! untouched.

use std::error::Error;
use std::fmt;

use crate::id::{LpId, RunnerId};

/// Errors from simulator and runner operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimError {
    /// The worker threads have not been started.
    NotStarted,
    /// The worker threads are already running.
    AlreadyStarted,
    /// A worker thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
    /// A runner index is outside `0..count`.
    BadRunner {
        /// The offending runner index.
        runner: RunnerId,
        /// Number of runners in the simulation.
        count: u32,
    },
    /// An id was presented to a runner that does not own it.
    MismatchRunner {
        /// The runner that received the lookup.
        actual: RunnerId,
        /// The runner named by the id.
        requested: RunnerId,
    },
    /// An id's slot index lies outside the runner's table.
    OutOfRange {
        /// The slot index named by the id.
        slot: u32,
        /// Length of the runner's slot table.
        len: u32,
    },
    /// The id refers to a freed or reused slot.
    Stale {
        /// The stale id.
        id: LpId,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "simulation has not been started"),
            Self::AlreadyStarted => write!(f, "simulation is already started"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "worker thread spawn failed: {reason}")
            }
            Self::BadRunner { runner, count } => {
                write!(f, "runner {runner} out of range (simulation has {count})")
            }
            Self::MismatchRunner { actual, requested } => {
                write!(
                    f,
                    "id names runner {requested} but was presented to runner {actual}"
                )
            }
            Self::OutOfRange { slot, len } => {
                write!(f, "slot {slot} out of range (table has {len})")
            }
            Self::Stale { id } => write!(f, "id {id} refers to a freed or reused slot"),
        }
    }
}

impl Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Tick;

    #[test]
    fn display_names_the_offending_components() {
        let err = SimError::BadRunner {
            runner: RunnerId(9),
            count: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('4'));

        let err = SimError::Stale {
            id: LpId {
                runner: RunnerId(1),
                slot: 2,
                created: Tick(3),
            },
        };
        assert!(err.to_string().contains("1/2@3"));
    }

    #[test]
    fn implements_std_error() {
        fn takes_error(_: &dyn Error) {}
        takes_error(&SimError::NotStarted);
    }
}
