//! The simulator: clock owner and runner coordinator.
//!
//! ```text
//! Coordinator                      Worker threads (one per runner)
//!     |                                 |
//!     | transpose outbound → inbound    |
//!     |--Step(runner, tick)------------>| deliver staged messages
//!     |   (rendezvous, index order)     | fast-skip or run due LPs
//!     |<--Stepped(runner, next)---------| reply next wakeup
//!     |   (shared rendezvous fan-in)    |
//!     | tick = min(replies)             |
//!     | gather + reset aggregates       |
//! ```
//!
//! Between fan-in and the next fan-out the coordinator owns every runner by
//! value, so process management, aggregate registration, and lookups need
//! no synchronization — and because stepping takes `&mut self`, the borrow
//! checker rules out mutating the population mid-tick entirely.

use std::fmt;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use cadence_core::{Agg, AggId, AggKind, LpId, RunnerId, SimError, Tick};

use crate::config::{ConfigError, SimConfig};
use crate::lp::Lp;
use crate::metrics::StepMetrics;
use crate::runner::Runner;
use crate::worker::{self, Worker, WorkerCommand, WorkerReply};

/// A parallel, tick-driven discrete-event simulation.
///
/// Owns a fixed set of [`Runner`]s, the global aggregate slots, and the
/// logical clock. Worker threads are launched with [`start()`](Sim::start)
/// and torn down with [`stop()`](Sim::stop); between the two, each call to
/// [`run_steps()`](Sim::run_steps) or [`run_until()`](Sim::run_until)
/// drives barrier-synchronous ticks across all runners.
///
/// Dropping a `Sim` without calling `stop()` is safe: the command channels
/// disconnect and the workers exit on their next receive.
pub struct Sim {
    /// Parked runners. `None` only while a runner is in flight during a
    /// step, which cannot be observed from outside `run_one_step`.
    runners: Vec<Option<Box<Runner>>>,
    aggs: Vec<Agg>,
    tick: Tick,
    seed: u64,
    workers: Vec<Worker>,
    reply_tx: Sender<WorkerReply>,
    reply_rx: Receiver<WorkerReply>,
    last_metrics: StepMetrics,
}

impl Sim {
    /// Create a simulation with `runners` runners and the default seed.
    pub fn new(runners: usize) -> Result<Self, ConfigError> {
        Self::with_config(SimConfig {
            runners,
            ..SimConfig::default()
        })
    }

    /// Create a simulation from a configuration.
    pub fn with_config(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = config.runners;
        let runners = (0..n)
            .map(|i| Some(Box::new(Runner::new(RunnerId(i as u32), n, config.seed))))
            .collect();
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(0);
        Ok(Sim {
            runners,
            aggs: Vec::new(),
            tick: Tick(0),
            seed: config.seed,
            workers: Vec::new(),
            reply_tx,
            reply_rx,
            last_metrics: StepMetrics::default(),
        })
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Number of runners.
    pub fn num_runners(&self) -> usize {
        self.runners.len()
    }

    /// The current logical clock value.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    /// Total live processes across all runners.
    pub fn num_lps(&self) -> usize {
        (0..self.runners.len()).map(|i| self.runner(i).num_lps()).sum()
    }

    /// The simulation seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether the worker threads are running.
    pub fn is_started(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Metrics from the most recent completed step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    fn runner(&self, idx: usize) -> &Runner {
        self.runners[idx]
            .as_deref()
            .expect("runner parked between steps")
    }

    fn runner_mut(&mut self, idx: usize) -> &mut Runner {
        self.runners[idx]
            .as_deref_mut()
            .expect("runner parked between steps")
    }

    // ── Process management ──────────────────────────────────────

    /// Add a process to runner `runner`.
    ///
    /// The process is created at the current tick and first runs on the
    /// following tick.
    ///
    /// # Errors
    ///
    /// [`SimError::BadRunner`] if the runner index is out of range.
    pub fn add_lp(&mut self, runner: RunnerId, lp: Box<dyn Lp>) -> Result<LpId, SimError> {
        self.check_runner(runner)?;
        let now = self.tick;
        Ok(self.runner_mut(runner.0 as usize).insert(now, lp))
    }

    /// Free the slot named by `id`. Stale ids are a no-op.
    ///
    /// # Errors
    ///
    /// [`SimError::BadRunner`] if the id's runner index is out of range.
    pub fn remove_lp(&mut self, id: LpId) -> Result<(), SimError> {
        self.check_runner(id.runner)?;
        self.runner_mut(id.runner.0 as usize).remove_lp(id);
        Ok(())
    }

    /// Look up the process named by `id`.
    ///
    /// # Errors
    ///
    /// [`SimError::BadRunner`] for an out-of-range runner index, otherwise
    /// whatever the owning runner's lookup reports
    /// ([`SimError::Stale`], [`SimError::OutOfRange`]).
    pub fn get_lp(&self, id: LpId) -> Result<&dyn Lp, SimError> {
        self.check_runner(id.runner)?;
        self.runner(id.runner.0 as usize).get_lp(id)
    }

    /// Mutable variant of [`get_lp`](Sim::get_lp).
    pub fn get_lp_mut(&mut self, id: LpId) -> Result<&mut dyn Lp, SimError> {
        self.check_runner(id.runner)?;
        self.runner_mut(id.runner.0 as usize).get_lp_mut(id)
    }

    fn check_runner(&self, runner: RunnerId) -> Result<(), SimError> {
        let count = self.runners.len() as u32;
        if runner.0 >= count {
            return Err(SimError::BadRunner { runner, count });
        }
        Ok(())
    }

    // ── Aggregates ──────────────────────────────────────────────

    /// Register a global `Sum` aggregate plus a local accumulator on every
    /// runner.
    pub fn create_sum(&mut self) -> AggId {
        self.create_agg(AggKind::Sum)
    }

    /// Register a global `Min` aggregate plus a local accumulator on every
    /// runner.
    pub fn create_min(&mut self) -> AggId {
        self.create_agg(AggKind::Min)
    }

    /// Register a global `Max` aggregate plus a local accumulator on every
    /// runner.
    pub fn create_max(&mut self) -> AggId {
        self.create_agg(AggKind::Max)
    }

    fn create_agg(&mut self, kind: AggKind) -> AggId {
        let id = AggId(self.aggs.len() as u32);
        self.aggs.push(Agg::new(kind));
        for slot in &mut self.runners {
            let runner = slot.as_deref_mut().expect("runner parked between steps");
            runner.aggs.push(Agg::new(kind));
        }
        id
    }

    /// Current `(count, value)` of a global aggregate, updated after each
    /// completed step. `None` for an id this simulation never issued.
    pub fn read_agg(&self, agg: AggId) -> Option<(i64, f64)> {
        self.aggs.get(agg.0 as usize).map(|a| a.get())
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Launch one worker thread per runner.
    ///
    /// # Errors
    ///
    /// [`SimError::AlreadyStarted`] if workers are running;
    /// [`SimError::ThreadSpawnFailed`] if the OS refuses a thread (workers
    /// spawned so far are torn down again).
    pub fn start(&mut self) -> Result<(), SimError> {
        if self.is_started() {
            return Err(SimError::AlreadyStarted);
        }
        for i in 0..self.runners.len() {
            match worker::spawn(RunnerId(i as u32), self.reply_tx.clone()) {
                Ok(worker) => self.workers.push(worker),
                Err(e) => {
                    self.shutdown_workers();
                    return Err(SimError::ThreadSpawnFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Send the shutdown sentinel to every worker, await one
    /// acknowledgement per worker, and join the threads.
    ///
    /// # Errors
    ///
    /// [`SimError::NotStarted`] if no workers are running.
    pub fn stop(&mut self) -> Result<(), SimError> {
        if !self.is_started() {
            return Err(SimError::NotStarted);
        }
        self.shutdown_workers();
        Ok(())
    }

    fn shutdown_workers(&mut self) {
        let mut expected = 0;
        for worker in &self.workers {
            if worker.command_tx.send(WorkerCommand::Shutdown).is_ok() {
                expected += 1;
            }
        }
        for _ in 0..expected {
            let _ = self.reply_rx.recv();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join.join();
        }
    }

    // ── Stepping ────────────────────────────────────────────────

    /// Execute scheduler decisions until the clock has advanced by `n`
    /// ticks.
    ///
    /// A single step may leap several ticks, so at most `n` barriers run.
    /// Negative `n` is treated as zero.
    ///
    /// # Errors
    ///
    /// [`SimError::NotStarted`] if [`start()`](Sim::start) has not been
    /// called.
    pub fn run_steps(&mut self, n: i64) -> Result<(), SimError> {
        let end = self.tick.offset(n.max(0));
        while self.tick < end {
            self.run_one_step()?;
        }
        Ok(())
    }

    /// Step until the clock reaches [`Tick::IDLE`] (no runner has pending
    /// work) or `stop` returns true. `stop` is evaluated between steps.
    ///
    /// # Errors
    ///
    /// [`SimError::NotStarted`] if [`start()`](Sim::start) has not been
    /// called.
    pub fn run_until(&mut self, mut stop: impl FnMut(&Sim) -> bool) -> Result<(), SimError> {
        while !self.tick.is_idle() && !stop(self) {
            self.run_one_step()?;
        }
        Ok(())
    }

    /// One barrier-synchronous tick across all runners.
    ///
    /// # Panics
    ///
    /// Panics if a process panicked on a worker; the fan-in barrier is
    /// completed first so the remaining workers stay consistent.
    fn run_one_step(&mut self) -> Result<(), SimError> {
        if !self.is_started() {
            return Err(SimError::NotStarted);
        }
        let started = Instant::now();
        let tick = self.tick;

        // Messages staged during the previous step become this step's
        // inbound deliveries.
        self.transpose();

        // Fan-out in runner-index order. The rendezvous send returns once
        // the worker has taken the runner, so workers overlap from here.
        for i in 0..self.runners.len() {
            let runner = self.runners[i].take().expect("runner parked between steps");
            if self.workers[i]
                .command_tx
                .send(WorkerCommand::Step(runner, tick))
                .is_err()
            {
                panic!("worker for runner {i} exited outside shutdown");
            }
        }

        // Fan-in: exactly one reply per runner, minimum-reduced.
        let mut next = Tick::IDLE;
        let mut lps_run = 0;
        let mut messages_delivered = 0;
        let mut runners_skipped = 0;
        let mut poisoned = None;
        for _ in 0..self.runners.len() {
            match self.reply_rx.recv().expect("reply channel closed") {
                WorkerReply::Stepped(runner, reply) => {
                    next = next.min(reply);
                    lps_run += runner.stats.lps_run;
                    messages_delivered += runner.stats.messages_delivered;
                    runners_skipped += u32::from(runner.stats.fast_skipped);
                    let idx = runner.id().0 as usize;
                    self.runners[idx] = Some(runner);
                }
                WorkerReply::Panicked(id) => poisoned = Some(id),
                WorkerReply::Stopped => unreachable!("shutdown ack outside stop()"),
            }
        }
        if let Some(id) = poisoned {
            panic!("logical process panicked on runner {id}");
        }

        self.tick = next;

        // Gather per-runner accumulators into the global slots in fixed
        // runner-index order, resetting the locals.
        for (i, agg) in self.aggs.iter_mut().enumerate() {
            for slot in &mut self.runners {
                let runner = slot.as_deref_mut().expect("runner parked between steps");
                let local = &mut runner.aggs[i];
                agg.gather(local);
                local.reset();
            }
        }

        self.last_metrics = StepMetrics {
            total_us: started.elapsed().as_micros() as u64,
            lps_run,
            messages_delivered,
            runners_skipped,
            from_tick: tick,
            to_tick: next,
        };
        Ok(())
    }

    /// Move every runner's outbound buckets into the destination runners'
    /// inbound staging.
    fn transpose(&mut self) {
        let n = self.runners.len();
        for src in 0..n {
            for dst in 0..n {
                let batch = std::mem::take(&mut self.runner_mut(src).outbound[dst]);
                if batch.is_empty() {
                    continue;
                }
                self.runner_mut(dst).inbound.extend(batch);
            }
        }
    }
}

impl fmt::Debug for Sim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sim")
            .field("tick", &self.tick)
            .field("runners", &self.runners.len())
            .field("aggs", &self.aggs.len())
            .field("started", &self.is_started())
            .finish()
    }
}
