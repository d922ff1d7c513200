//! Benchmark profiles and utilities for the Cadence simulation engine.
//!
//! Provides pre-built, already-started simulations for benchmarking:
//!
//! - [`dense_profile`]: every process reschedules every `period` ticks
//! - [`ping_profile`]: pairs of processes exchanging a message per tick

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cadence_core::{Inbox, LpId, RunnerId, Tick};
use cadence_engine::{Lp, Runner, Schedule, Sim, SimConfig};

/// A process that reschedules every `period` ticks and does nothing else.
pub struct Spinner {
    period: i64,
}

impl Spinner {
    /// A spinner with the given reschedule period.
    pub fn new(period: i64) -> Self {
        Spinner { period }
    }
}

impl Lp for Spinner {
    fn run(&mut self, _rt: &mut Runner, _inbox: Inbox) -> Schedule {
        Schedule::After(self.period)
    }
}

/// A process that sends one message to its peer on every activation.
pub struct Courier {
    peer: LpId,
}

impl Courier {
    /// A courier addressing the given peer.
    pub fn new(peer: LpId) -> Self {
        Courier { peer }
    }
}

impl Lp for Courier {
    fn run(&mut self, rt: &mut Runner, _inbox: Inbox) -> Schedule {
        rt.send(self.peer, Box::new(0u64)).unwrap();
        Schedule::After(1)
    }
}

/// A started simulation with `runners × lps_per_runner` spinners, each
/// rescheduling every `period` ticks.
///
/// `period == 1` exercises the dense path (every process runs every
/// barrier); a large `period` exercises the fast-skip/leap path.
pub fn dense_profile(runners: usize, lps_per_runner: usize, period: i64) -> Sim {
    let mut sim = Sim::with_config(SimConfig { runners, seed: 42 }).unwrap();
    for r in 0..runners {
        for _ in 0..lps_per_runner {
            sim.add_lp(RunnerId(r as u32), Box::new(Spinner::new(period)))
                .unwrap();
        }
    }
    sim.start().unwrap();
    sim
}

/// A started two-runner simulation with `pairs` courier pairs exchanging
/// one message per tick in each direction.
pub fn ping_profile(pairs: usize) -> Sim {
    let mut sim = Sim::with_config(SimConfig {
        runners: 2,
        seed: 42,
    })
    .unwrap();
    for k in 0..pairs {
        // Slot allocation is deterministic (lowest free index), so each
        // courier's peer id is known before the peer is added.
        let left = LpId {
            runner: RunnerId(0),
            slot: k as u32,
            created: Tick(0),
        };
        let right = LpId {
            runner: RunnerId(1),
            slot: k as u32,
            created: Tick(0),
        };
        let added = sim
            .add_lp(RunnerId(0), Box::new(Courier::new(right)))
            .unwrap();
        assert_eq!(added, left);
        let added = sim
            .add_lp(RunnerId(1), Box::new(Courier::new(left)))
            .unwrap();
        assert_eq!(added, right);
    }
    sim.start().unwrap();
    sim
}
