//! Strongly-typed identifiers and the logical clock.

use std::fmt;

/// A value of the logical clock.
///
/// Ticks are signed 64-bit integers that only ever move forward. The
/// reserved sentinel [`Tick::IDLE`] (the maximum representable tick) means
/// "no scheduled work"; a simulation whose clock reaches it has nothing
/// left to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick(pub i64);

impl Tick {
    /// Sentinel meaning "no scheduled work".
    pub const IDLE: Tick = Tick(i64::MAX);

    /// This tick offset by `delta`, saturating at [`Tick::IDLE`].
    ///
    /// Saturation keeps wakeups computed relative to a very late tick from
    /// wrapping back into the past.
    #[must_use]
    pub fn offset(self, delta: i64) -> Tick {
        Tick(self.0.saturating_add(delta))
    }

    /// Whether this tick is the no-work sentinel.
    pub fn is_idle(self) -> bool {
        self == Tick::IDLE
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_idle() {
            write!(f, "idle")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<i64> for Tick {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Index of a runner within a simulation.
///
/// Runners are created at simulation construction and numbered `0..n`.
/// `RunnerId(i)` is the i-th runner; the index doubles as the placement
/// key when adding processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunnerId(pub u32);

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RunnerId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a registered aggregate.
///
/// Aggregates are registered at setup and assigned sequential ids;
/// `AggId(n)` is the n-th registered aggregate. The same id addresses both
/// the global slot and every runner's local accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggId(pub u32);

impl fmt::Display for AggId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AggId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Generational identity of a logical process.
///
/// The triple is (owning runner, slot index, creation tick). Slots are
/// reused after a process dies, but ticks are monotonic, so the creation
/// tick doubles as a generation counter: an id held across a reuse never
/// resolves to the newer occupant. Two ids are equal only if all three
/// components match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LpId {
    /// The runner that owns the slot.
    pub runner: RunnerId,
    /// Slot index within the owning runner's table.
    pub slot: u32,
    /// Tick at which this occupant was installed.
    pub created: Tick,
}

impl fmt::Display for LpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.runner, self.slot, self.created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_ordering_and_sentinel() {
        assert!(Tick(0) < Tick(1));
        assert!(Tick(1) < Tick::IDLE);
        assert!(Tick::IDLE.is_idle());
        assert!(!Tick(i64::MAX - 1).is_idle());
    }

    #[test]
    fn tick_offset_saturates() {
        assert_eq!(Tick(5).offset(3), Tick(8));
        assert_eq!(Tick(i64::MAX - 1).offset(100), Tick::IDLE);
        assert_eq!(Tick::IDLE.offset(1), Tick::IDLE);
    }

    #[test]
    fn tick_display() {
        assert_eq!(Tick(42).to_string(), "42");
        assert_eq!(Tick::IDLE.to_string(), "idle");
    }

    #[test]
    fn lpid_equality_is_all_three_components() {
        let a = LpId {
            runner: RunnerId(0),
            slot: 3,
            created: Tick(7),
        };
        assert_eq!(a, a);
        assert_ne!(
            a,
            LpId {
                created: Tick(8),
                ..a
            }
        );
        assert_ne!(a, LpId { slot: 4, ..a });
        assert_ne!(
            a,
            LpId {
                runner: RunnerId(1),
                ..a
            }
        );
    }

    #[test]
    fn lpid_display() {
        let id = LpId {
            runner: RunnerId(2),
            slot: 9,
            created: Tick(41),
        };
        assert_eq!(id.to_string(), "2/9@41");
    }
}
