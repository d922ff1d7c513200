//! Process lifecycle and identity: slot reuse, generational staleness,
//! halt semantics, worker startup/shutdown, and deterministic replay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cadence_core::{AggId, Inbox, RunnerId, SimError, Tick};
use cadence_engine::{Lp, Runner, Schedule, Sim, SimConfig};

/// Reschedules every tick, counting activations.
struct Ticker {
    runs: Arc<AtomicUsize>,
}

impl Ticker {
    fn boxed() -> (Box<Ticker>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Ticker {
                runs: Arc::clone(&runs),
            }),
            runs,
        )
    }
}

impl Lp for Ticker {
    fn run(&mut self, _rt: &mut Runner, _inbox: Inbox) -> Schedule {
        self.runs.fetch_add(1, Ordering::Relaxed);
        Schedule::After(1)
    }
}

// ── Identity ─────────────────────────────────────────────────────

#[test]
fn slot_reuse_bumps_the_generation() {
    let mut sim = Sim::new(1).unwrap();
    let (first, _) = Ticker::boxed();
    let old = sim.add_lp(RunnerId(0), first).unwrap();
    sim.start().unwrap();

    sim.run_steps(3).unwrap();
    assert_eq!(sim.current_tick(), Tick(3));
    sim.remove_lp(old).unwrap();

    let (second, _) = Ticker::boxed();
    let newer = sim.add_lp(RunnerId(0), second).unwrap();
    assert_eq!(newer.slot, old.slot);
    assert_eq!(newer.runner, old.runner);
    assert_ne!(newer.created, old.created);

    assert!(matches!(sim.get_lp(old), Err(SimError::Stale { .. })));
    assert!(sim.get_lp(newer).is_ok());
    sim.stop().unwrap();
}

#[test]
fn halted_process_goes_stale_and_never_runs_again() {
    struct CountedOneShot {
        runs: Arc<AtomicUsize>,
    }
    impl Lp for CountedOneShot {
        fn run(&mut self, _rt: &mut Runner, _inbox: Inbox) -> Schedule {
            self.runs.fetch_add(1, Ordering::Relaxed);
            Schedule::Halt
        }
    }

    let mut sim = Sim::new(2).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let victim = sim
        .add_lp(
            RunnerId(0),
            Box::new(CountedOneShot {
                runs: Arc::clone(&runs),
            }),
        )
        .unwrap();
    let (metronome, _) = Ticker::boxed();
    sim.add_lp(RunnerId(1), metronome).unwrap();
    sim.start().unwrap();

    sim.run_steps(10).unwrap();
    assert_eq!(runs.load(Ordering::Relaxed), 1);
    assert!(matches!(sim.get_lp(victim), Err(SimError::Stale { .. })));
    assert_eq!(sim.num_lps(), 1);
    sim.stop().unwrap();
}

#[test]
fn removed_process_is_never_activated() {
    let mut sim = Sim::new(1).unwrap();
    let (lp, runs) = Ticker::boxed();
    let id = sim.add_lp(RunnerId(0), lp).unwrap();
    sim.remove_lp(id).unwrap();
    sim.start().unwrap();

    sim.run_until(|_| false).unwrap();
    assert!(sim.current_tick().is_idle());
    assert_eq!(runs.load(Ordering::Relaxed), 0);
    sim.stop().unwrap();
}

#[test]
fn num_lps_tracks_population() {
    let mut sim = Sim::new(2).unwrap();
    assert_eq!(sim.num_lps(), 0);
    let (a, _) = Ticker::boxed();
    let (b, _) = Ticker::boxed();
    let ida = sim.add_lp(RunnerId(0), a).unwrap();
    sim.add_lp(RunnerId(1), b).unwrap();
    assert_eq!(sim.num_lps(), 2);
    sim.remove_lp(ida).unwrap();
    assert_eq!(sim.num_lps(), 1);
}

// ── Worker lifecycle ─────────────────────────────────────────────

#[test]
fn shutdown_handshake_stops_every_worker() {
    let mut sim = Sim::new(4).unwrap();
    let (lp, _) = Ticker::boxed();
    sim.add_lp(RunnerId(0), lp).unwrap();
    sim.start().unwrap();
    sim.run_steps(5).unwrap();

    // One acknowledgement per runner is drained and all threads joined.
    sim.stop().unwrap();
    assert!(!sim.is_started());
    assert_eq!(sim.run_steps(1), Err(SimError::NotStarted));

    // The population and clock survive a restart.
    sim.start().unwrap();
    sim.run_steps(2).unwrap();
    assert_eq!(sim.current_tick(), Tick(7));
    sim.stop().unwrap();
}

#[test]
fn population_can_grow_between_steps() {
    let mut sim = Sim::new(2).unwrap();
    let (a, runs_a) = Ticker::boxed();
    sim.add_lp(RunnerId(0), a).unwrap();
    sim.start().unwrap();

    sim.run_steps(3).unwrap();
    let (b, runs_b) = Ticker::boxed();
    sim.add_lp(RunnerId(1), b).unwrap();
    sim.run_steps(3).unwrap();

    assert!(runs_a.load(Ordering::Relaxed) > runs_b.load(Ordering::Relaxed));
    assert!(runs_b.load(Ordering::Relaxed) > 0);
    sim.stop().unwrap();
}

#[test]
#[should_panic(expected = "logical process panicked")]
fn process_panic_is_propagated_to_the_coordinator() {
    struct Bomb;
    impl Lp for Bomb {
        fn run(&mut self, _rt: &mut Runner, _inbox: Inbox) -> Schedule {
            panic!("boom");
        }
    }

    let mut sim = Sim::new(2).unwrap();
    sim.add_lp(RunnerId(0), Box::new(Bomb)).unwrap();
    let (metronome, _) = Ticker::boxed();
    sim.add_lp(RunnerId(1), metronome).unwrap();
    sim.start().unwrap();
    let _ = sim.run_steps(2);
}

// ── Determinism ──────────────────────────────────────────────────

#[test]
fn equal_seeds_replay_identically() {
    use rand::RngExt;

    /// Feeds runner-local randomness into a sum aggregate.
    struct Roller {
        agg: AggId,
    }
    impl Lp for Roller {
        fn run(&mut self, rt: &mut Runner, _inbox: Inbox) -> Schedule {
            let draw = rt.rng().random::<f64>();
            rt.update_agg(self.agg, 1, draw);
            Schedule::After(1)
        }
    }

    fn total(seed: u64) -> (i64, f64) {
        let mut sim = Sim::with_config(SimConfig { runners: 3, seed }).unwrap();
        let agg = sim.create_sum();
        for i in 0..3u32 {
            sim.add_lp(RunnerId(i), Box::new(Roller { agg })).unwrap();
        }
        sim.start().unwrap();
        sim.run_steps(20).unwrap();
        sim.stop().unwrap();
        sim.read_agg(agg).unwrap()
    }

    let first = total(7);
    let again = total(7);
    assert_eq!(first, again);
    assert_eq!(first.0, 57); // 3 runners × 19 active ticks
}
