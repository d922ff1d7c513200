//! Core types for the Cadence discrete-event simulation engine.
//!
//! This is the leaf crate with no internal Cadence dependencies. It defines
//! the fundamental abstractions shared across the workspace: the logical
//! clock and identifier types, message payloads, aggregate kernels, and
//! error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod agg;
pub mod error;
pub mod id;
pub mod message;

// Re-export core types at crate root for convenience.
pub use agg::{Agg, AggKind};
pub use error::SimError;
pub use id::{AggId, LpId, RunnerId, Tick};
pub use message::{Envelope, Inbox, Payload};
