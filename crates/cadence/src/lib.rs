//! Cadence: a parallel, tick-driven discrete-event simulation engine.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Cadence sub-crates. For most users, adding `cadence` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//!
//! // A process that bumps a counter and runs again every 10 ticks.
//! struct Pulse {
//!     agg: AggId,
//! }
//! impl Lp for Pulse {
//!     fn run(&mut self, rt: &mut Runner, _inbox: Inbox) -> Schedule {
//!         rt.update_agg(self.agg, 1, 1.0);
//!         Schedule::After(10)
//!     }
//! }
//!
//! let mut sim = Sim::new(2).unwrap();
//! let pulses = sim.create_sum();
//! sim.add_lp(RunnerId(0), Box::new(Pulse { agg: pulses })).unwrap();
//! sim.add_lp(RunnerId(1), Box::new(Pulse { agg: pulses })).unwrap();
//!
//! sim.start().unwrap();
//! sim.run_steps(21).unwrap();
//! sim.stop().unwrap();
//!
//! // The clock leapt 0 → 1 → 11 → 21 in three barriers; both processes
//! // ran twice.
//! assert_eq!(sim.current_tick(), Tick(21));
//! assert_eq!(sim.read_agg(pulses), Some((4, 4.0)));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | Clock, ids, payloads, aggregates, errors |
//! | [`engine`] | `cadence-engine` | The simulator, runners, and the LP trait |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and ids (`cadence-core`).
///
/// Contains the logical clock ([`types::Tick`]), identifier newtypes,
/// message payload aliases, aggregate kernels, and error types.
pub use cadence_core as types;

/// The simulation engine (`cadence-engine`).
///
/// [`engine::Sim`] drives ticks; [`engine::Lp`] is the extension point for
/// user-defined processes.
pub use cadence_engine as engine;

/// Common imports for typical Cadence usage.
///
/// ```rust
/// use cadence::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cadence_core::{
        Agg, AggId, AggKind, Inbox, LpId, Payload, RunnerId, SimError, Tick,
    };

    // Engine
    pub use cadence_engine::{
        ConfigError, Lp, Runner, Schedule, Sim, SimConfig, StepMetrics,
    };
}
