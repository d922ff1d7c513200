//! Stochastic infection spread on a patch-partitioned board.
//!
//! Every cell is susceptible until infected; an infected cell stays
//! infectious for PERIOD ticks and infects each susceptible 4-neighbour
//! with probability `1 - (1 - r)^k` per tick, where `k` is the number of
//! infectious neighbours. Patch processes draw from their runner's private
//! PRNG, so a given seed replays the same epidemic. Total infections are
//! counted in a shared `Sum` aggregate.
//!
//! Run with:
//!   cargo run --example spread [initial-infected] [rate]

use std::env;
use std::error::Error;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use cadence_core::{AggId, Inbox, RunnerId};
use cadence_engine::{Lp, Runner, Schedule, Sim, SimConfig};
use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Board is N×N cells.
const N: usize = 64;
/// Each process owns a PATCH×PATCH patch.
const PATCH: usize = 16;
/// Worker partitions.
const RUNNERS: usize = 4;
/// Ticks an infected cell stays infectious.
const PERIOD: i64 = 10;
/// Ticks to simulate.
const STEPS: i64 = 80;
/// Report every this many ticks.
const REPORT_EVERY: i64 = 10;

// ── Board ───────────────────────────────────────────────────────

/// One atomic word per cell: 0 = susceptible, otherwise the tick at which
/// the cell was infected (at least 1). Compare-and-swap claims a cell so
/// racing neighbour patches count each infection exactly once.
struct Field {
    cells: Vec<AtomicI64>,
}

impl Field {
    fn new() -> Self {
        Field {
            cells: (0..N * N).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    fn infectious(&self, x: isize, y: isize, tick: i64) -> u8 {
        if x < 0 || y < 0 || x >= N as isize || y >= N as isize {
            return 0;
        }
        let at = self.cells[x as usize * N + y as usize].load(Ordering::Relaxed);
        u8::from(at > 0 && at > tick - PERIOD)
    }

    fn infectious_neighbours(&self, x: isize, y: isize, tick: i64) -> u8 {
        self.infectious(x - 1, y, tick)
            + self.infectious(x + 1, y, tick)
            + self.infectious(x, y - 1, tick)
            + self.infectious(x, y + 1, tick)
    }
}

// ── Patch process ───────────────────────────────────────────────

/// Rolls infection attempts for every susceptible cell in its patch.
struct Patch {
    x: usize,
    y: usize,
    field: Arc<Field>,
    /// `rates[k]` = probability of infection with k infectious neighbours.
    rates: [f64; 5],
    total: AggId,
}

impl Lp for Patch {
    fn run(&mut self, rt: &mut Runner, _inbox: Inbox) -> Schedule {
        let tick = rt.current_tick().0;
        for i in 0..PATCH {
            for j in 0..PATCH {
                let x = self.x + i;
                let y = self.y + j;
                let idx = x * N + y;
                if self.field.cells[idx].load(Ordering::Relaxed) != 0 {
                    continue;
                }
                let count = self
                    .field
                    .infectious_neighbours(x as isize, y as isize, tick);
                if count == 0 {
                    continue;
                }
                let roll = rt.rng().random::<f64>();
                if roll < self.rates[count as usize]
                    && self.field.cells[idx]
                        .compare_exchange(0, tick.max(1), Ordering::Relaxed, Ordering::Relaxed)
                        .is_ok()
                {
                    rt.update_agg(self.total, 1, 1.0);
                }
            }
        }
        Schedule::After(1)
    }
}

// ── Setup and reporting ─────────────────────────────────────────

fn seed_initial(field: &Field, count: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..count {
        let idx = rng.random_range(0..N * N);
        field.cells[idx].store(1, Ordering::Relaxed);
    }
}

fn render(field: &Field) {
    let mut frame = String::with_capacity((N + 1) * N);
    for x in 0..N {
        for y in 0..N {
            let infected = field.cells[x * N + y].load(Ordering::Relaxed) != 0;
            frame.push(if infected { '#' } else { '.' });
        }
        frame.push('\n');
    }
    println!("{frame}");
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let initial: usize = args.next().map(|a| a.parse()).transpose()?.unwrap_or(40);
    let rate: f64 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(0.25);

    let field = Arc::new(Field::new());
    seed_initial(&field, initial, 1);

    let rates = [
        0.0,
        rate,
        1.0 - (1.0 - rate).powi(2),
        1.0 - (1.0 - rate).powi(3),
        1.0 - (1.0 - rate).powi(4),
    ];

    let mut sim = Sim::with_config(SimConfig {
        runners: RUNNERS,
        seed: 1,
    })?;
    let total = sim.create_sum();
    for x in (0..N).step_by(PATCH) {
        for y in (0..N).step_by(PATCH) {
            let runner = RunnerId((((x + y) / PATCH) % RUNNERS) as u32);
            sim.add_lp(
                runner,
                Box::new(Patch {
                    x,
                    y,
                    field: Arc::clone(&field),
                    rates,
                    total,
                }),
            )?;
        }
    }

    sim.start()?;
    while sim.current_tick().0 < STEPS {
        sim.run_steps(REPORT_EVERY)?;
        let (infected, _) = sim.read_agg(total).ok_or("total aggregate missing")?;
        println!(
            "tick {}: {} new infections ({} seeded, {} cells total)",
            sim.current_tick().0,
            infected,
            initial,
            N * N,
        );
    }
    render(&field);
    sim.stop()?;
    Ok(())
}
