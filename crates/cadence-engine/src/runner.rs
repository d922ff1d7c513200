//! The runner: a worker bound to a logical index, owning a partition of
//! logical processes.
//!
//! A runner's step has three phases:
//!
//! 1. **Delivery** — staged inbound messages are appended to the inboxes of
//!    slots that still hold the addressed generation; everything else is
//!    dropped silently.
//! 2. **Fast-skip** — if nothing was delivered and the previously computed
//!    next wakeup lies strictly beyond the broadcast tick, the run phase is
//!    skipped entirely and the stored wakeup is replied as-is. This is what
//!    lets the simulator leap the clock over empty intervals.
//! 3. **Run** — every live slot whose inbox is non-empty or whose wakeup is
//!    due is activated in slot-index order; verdicts are folded into the
//!    next-wakeup minimum.
//!
//! # Ownership model
//!
//! The runner value is parked inside the simulator between steps and moved
//! to its worker thread for the duration of a step, so exactly one thread
//! touches it at any time and no locks are involved.

use std::fmt;
use std::mem;

use cadence_core::{Agg, AggId, Envelope, Inbox, LpId, Payload, RunnerId, SimError, Tick};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::lp::{Lp, Schedule};

// ── Slot ────────────────────────────────────────────────────────

/// One cell in a runner's process table.
///
/// A freed slot keeps its `created` tick until reuse; ticks are monotonic,
/// so reuse always installs a strictly newer generation.
struct Slot {
    created: Tick,
    run_tick: Tick,
    /// The process body. `None` either because the slot is free, or — while
    /// `occupied` is set — because the body is temporarily moved out for
    /// its own activation.
    body: Option<Box<dyn Lp>>,
    inbox: Inbox,
    occupied: bool,
}

impl Slot {
    fn free() -> Self {
        Slot {
            created: Tick(0),
            run_tick: Tick::IDLE,
            body: None,
            inbox: Inbox::new(),
            occupied: false,
        }
    }
}

// ── StepStats ───────────────────────────────────────────────────

/// Per-step workload counters, carried back to the simulator on the reply.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StepStats {
    pub lps_run: u64,
    pub messages_delivered: u64,
    pub fast_skipped: bool,
}

// ── Runner ──────────────────────────────────────────────────────

/// A worker bound to a logical index.
///
/// Owns a slot table of logical processes, a per-destination-runner
/// outbound staging buffer, one local accumulator per registered
/// aggregate, and a private PRNG seeded from the runner index. Processes
/// receive `&mut Runner` during activation and interact with the engine
/// exclusively through it.
pub struct Runner {
    id: RunnerId,
    /// Tick of the step in progress (between steps: the last stepped tick).
    tick: Tick,
    /// Next wakeup computed by the most recent run phase.
    next_tick: Tick,
    live: usize,
    slots: Vec<Slot>,
    pub(crate) aggs: Vec<Agg>,
    /// Outbound staging, indexed by destination runner.
    pub(crate) outbound: Vec<Vec<Envelope>>,
    /// Inbound staging, filled by the simulator's transpose phase.
    pub(crate) inbound: Vec<Envelope>,
    pub(crate) stats: StepStats,
    rng: ChaCha8Rng,
}

impl Runner {
    pub(crate) fn new(id: RunnerId, runner_count: usize, seed: u64) -> Self {
        Runner {
            id,
            tick: Tick(0),
            // First step must not fast-skip before any wakeup exists.
            next_tick: Tick(0),
            live: 0,
            slots: Vec::new(),
            aggs: Vec::new(),
            outbound: (0..runner_count).map(|_| Vec::new()).collect(),
            inbound: Vec::new(),
            stats: StepStats::default(),
            rng: ChaCha8Rng::seed_from_u64(seed ^ u64::from(id.0)),
        }
    }

    /// This runner's index.
    pub fn id(&self) -> RunnerId {
        self.id
    }

    /// Number of runners in the simulation.
    pub fn num_runners(&self) -> usize {
        self.outbound.len()
    }

    /// Number of live processes on this runner.
    pub fn num_lps(&self) -> usize {
        self.live
    }

    /// The tick currently being executed.
    ///
    /// Between steps this is the tick of the most recent step.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    /// The runner's private PRNG.
    ///
    /// Seeded deterministically from the simulation seed and the runner
    /// index. All processes on this runner share the stream; processes
    /// wanting their own determinism must derive sub-streams themselves.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Fold `(Δcount, Δvalue)` into this runner's local accumulator for
    /// `agg`.
    ///
    /// Only meaningful from within a running process on this runner; the
    /// local accumulators are gathered into the global slots and reset when
    /// the tick completes.
    ///
    /// # Panics
    ///
    /// Panics if `agg` was not issued by this simulation.
    pub fn update_agg(&mut self, agg: AggId, dcount: i64, dvalue: f64) {
        self.aggs[agg.0 as usize].update(dcount, dvalue);
    }

    /// Stage a message for `dst`, to be delivered at the start of the next
    /// tick.
    ///
    /// The destination's generation is checked at delivery time, not here:
    /// a message addressed to a process that dies (or whose slot is reused)
    /// before delivery is dropped silently.
    pub fn send(&mut self, dst: LpId, payload: Payload) -> Result<(), SimError> {
        let count = self.outbound.len() as u32;
        let Some(bucket) = self.outbound.get_mut(dst.runner.0 as usize) else {
            return Err(SimError::BadRunner {
                runner: dst.runner,
                count,
            });
        };
        bucket.push(Envelope { dst, payload });
        Ok(())
    }

    /// Add a process to this runner from within a running process.
    ///
    /// The new process is installed at the lowest free slot and first runs
    /// on the tick after the current one. Its wakeup participates in this
    /// step's next-wakeup computation, so the clock cannot leap past it.
    pub fn add_lp(&mut self, lp: Box<dyn Lp>) -> LpId {
        self.insert(self.tick, lp)
    }

    /// Install `lp` as created at `now`, preferring the lowest free slot.
    pub(crate) fn insert(&mut self, now: Tick, lp: Box<dyn Lp>) -> LpId {
        let idx = self
            .slots
            .iter()
            .position(|slot| !slot.occupied)
            .unwrap_or_else(|| {
                self.slots.push(Slot::free());
                self.slots.len() - 1
            });
        let slot = &mut self.slots[idx];
        slot.created = now;
        slot.run_tick = now.offset(1);
        slot.body = Some(lp);
        slot.inbox.clear();
        slot.occupied = true;
        self.live += 1;
        LpId {
            runner: self.id,
            slot: idx as u32,
            created: now,
        }
    }

    /// Free the slot named by `id`.
    ///
    /// A stale id (wrong runner, out-of-range slot, generation mismatch, or
    /// an already-freed slot) is a no-op. Removing the currently-running
    /// process through its own id is honored: its verdict is discarded when
    /// the activation returns.
    pub fn remove_lp(&mut self, id: LpId) {
        if id.runner != self.id {
            return;
        }
        let Some(slot) = self.slots.get_mut(id.slot as usize) else {
            return;
        };
        if slot.created != id.created || !slot.occupied {
            return;
        }
        slot.body = None;
        slot.inbox.clear();
        slot.run_tick = Tick::IDLE;
        slot.occupied = false;
        self.live -= 1;
    }

    /// Look up the process named by `id`.
    ///
    /// # Errors
    ///
    /// [`SimError::MismatchRunner`] if the id names another runner,
    /// [`SimError::OutOfRange`] if the slot index lies outside the table,
    /// [`SimError::Stale`] if the generation does not match or the slot is
    /// free. The currently-running process cannot observe itself this way
    /// (its body is moved out for the activation) and also reports stale.
    pub fn get_lp(&self, id: LpId) -> Result<&dyn Lp, SimError> {
        let slot = self.slot_for(id)?;
        match &slot.body {
            Some(body) => Ok(body.as_ref()),
            None => Err(SimError::Stale { id }),
        }
    }

    /// Mutable variant of [`get_lp`](Runner::get_lp).
    pub fn get_lp_mut(&mut self, id: LpId) -> Result<&mut dyn Lp, SimError> {
        self.slot_for(id)?;
        // Re-borrow mutably; slot_for validated runner, range, and generation.
        match &mut self.slots[id.slot as usize].body {
            Some(body) => Ok(body.as_mut()),
            None => Err(SimError::Stale { id }),
        }
    }

    fn slot_for(&self, id: LpId) -> Result<&Slot, SimError> {
        if id.runner != self.id {
            return Err(SimError::MismatchRunner {
                actual: self.id,
                requested: id.runner,
            });
        }
        let len = self.slots.len() as u32;
        let Some(slot) = self.slots.get(id.slot as usize) else {
            return Err(SimError::OutOfRange { slot: id.slot, len });
        };
        if slot.created != id.created || !slot.occupied {
            return Err(SimError::Stale { id });
        }
        Ok(slot)
    }

    // ── Step protocol ───────────────────────────────────────────

    /// Execute one step at `tick` and return the wakeup to reply with.
    pub(crate) fn step(&mut self, tick: Tick) -> Tick {
        self.tick = tick;
        self.stats = StepStats::default();

        let delivered = self.deliver_inbound();

        if !delivered && self.next_tick > tick {
            self.stats.fast_skipped = true;
            return self.reply_tick(tick);
        }

        self.run_phase(tick);
        self.reply_tick(tick)
    }

    /// Append staged inbound messages to their destination inboxes.
    ///
    /// A message survives only if the slot is live and has not been reused
    /// to a newer generation than the one addressed.
    fn deliver_inbound(&mut self) -> bool {
        let mut delivered = false;
        for env in self.inbound.drain(..) {
            let Some(slot) = self.slots.get_mut(env.dst.slot as usize) else {
                continue;
            };
            if slot.occupied && slot.created <= env.dst.created {
                slot.inbox.push(env.payload);
                self.stats.messages_delivered += 1;
                delivered = true;
            }
        }
        delivered
    }

    /// Activate every due process in slot-index order and recompute the
    /// next wakeup.
    fn run_phase(&mut self, tick: Tick) {
        self.next_tick = Tick::IDLE;
        let mut i = 0;
        // `slots.len()` is re-read every iteration: a process appended
        // mid-step still contributes its wakeup to the minimum.
        while i < self.slots.len() {
            let due = self.slots[i].occupied
                && (!self.slots[i].inbox.is_empty() || self.slots[i].run_tick <= tick);
            if due {
                if let Some(mut body) = self.slots[i].body.take() {
                    let created = self.slots[i].created;
                    let inbox = mem::take(&mut self.slots[i].inbox);
                    let verdict = body.run(self, inbox);
                    self.stats.lps_run += 1;

                    let slot = &mut self.slots[i];
                    if slot.occupied && slot.created == created {
                        match verdict {
                            Schedule::Halt => {
                                slot.inbox.clear();
                                slot.run_tick = Tick::IDLE;
                                slot.occupied = false;
                                self.live -= 1;
                            }
                            Schedule::After(delta) => {
                                debug_assert!(delta >= 1, "Schedule::After requires delta >= 1");
                                slot.body = Some(body);
                                slot.run_tick = tick.offset(delta.max(1));
                            }
                            Schedule::Sleep => {
                                slot.body = Some(body);
                                slot.run_tick = Tick::IDLE;
                            }
                        }
                    }
                    // Otherwise the process freed its own slot (possibly
                    // already reused by a mid-step add); the verdict and the
                    // old body are discarded.
                }
            }
            let slot = &self.slots[i];
            if slot.occupied && self.next_tick > slot.run_tick {
                self.next_tick = slot.run_tick;
            }
            i += 1;
        }
    }

    /// The wakeup to reply with for a step at `tick`.
    ///
    /// Staged outbound messages must reach their destinations at `tick + 1`;
    /// clamping the reply keeps the clock from leaping past the delivery.
    fn reply_tick(&self, tick: Tick) -> Tick {
        if self.outbound.iter().any(|bucket| !bucket.is_empty()) {
            self.next_tick.min(tick.offset(1))
        } else {
            self.next_tick
        }
    }

    #[cfg(test)]
    pub(crate) fn next_tick(&self) -> Tick {
        self.next_tick
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("id", &self.id)
            .field("tick", &self.tick)
            .field("next_tick", &self.next_tick)
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .finish()
    }
}
