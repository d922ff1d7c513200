//! Conway's Game of Life on a patch-partitioned board.
//!
//! The board is split into PATCH×PATCH patches, one process per patch,
//! placed round-robin across the runners. Every process recomputes its
//! patch from the previous generation each tick and counts cell changes
//! into a shared `Sum` aggregate. The board is double-buffered with the
//! buffer parity following the tick, so concurrent patches read a frozen
//! generation while writing the next one.
//!
//! Run with:
//!   cargo run --example conway [pattern]
//!
//! Patterns: block, blinker, beacon, glider (default), r, diehard, inf1.

use std::env;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cadence_core::{AggId, Inbox, RunnerId};
use cadence_engine::{Lp, Runner, Schedule, Sim};

/// Board is N×N cells.
const N: usize = 48;
/// Each process owns a PATCH×PATCH patch.
const PATCH: usize = 8;
/// Worker partitions.
const RUNNERS: usize = 4;
/// Generations to simulate.
const STEPS: i64 = 60;
/// Render every this many generations.
const FRAME_EVERY: i64 = 12;

// ── Board ───────────────────────────────────────────────────────

/// Double-buffered atomic board. Patches write disjoint cells of the
/// "next" buffer, so relaxed atomics are all the sharing needs.
struct Universe {
    buffers: [Vec<AtomicBool>; 2],
}

impl Universe {
    fn new() -> Self {
        let buffer = || (0..N * N).map(|_| AtomicBool::new(false)).collect();
        Universe {
            buffers: [buffer(), buffer()],
        }
    }

    /// Seed a named pattern into both buffers around the board center.
    fn seed(&self, pattern: &str) {
        let points: &[(usize, usize)] = match pattern {
            "block" => &[(0, 0), (0, 1), (1, 0), (1, 1)],
            "blinker" => &[(0, 0), (0, 1), (0, 2)],
            "beacon" => &[(0, 2), (0, 3), (1, 3), (2, 0), (3, 0), (3, 1)],
            "glider" => &[(0, 0), (1, 0), (1, 2), (2, 0), (2, 1)],
            "r" => &[(0, 1), (1, 0), (1, 1), (1, 2), (2, 2)],
            "diehard" => &[(0, 1), (1, 0), (1, 1), (5, 0), (6, 0), (6, 2), (7, 0)],
            "inf1" => &[
                (0, 0),
                (2, 0),
                (2, 1),
                (4, 2),
                (4, 3),
                (4, 4),
                (6, 3),
                (6, 4),
                (6, 5),
                (7, 4),
            ],
            other => {
                eprintln!("unknown pattern '{other}', using glider");
                &[(0, 0), (1, 0), (1, 2), (2, 0), (2, 1)]
            }
        };
        for buffer in &self.buffers {
            for &(dx, dy) in points {
                buffer[(N / 2 + dx) * N + N / 2 + dy].store(true, Ordering::Relaxed);
            }
        }
    }

    /// The generation readable at `tick`.
    fn current(&self, tick: i64) -> &[AtomicBool] {
        &self.buffers[(tick % 2) as usize]
    }

    /// The generation written at `tick`.
    fn next(&self, tick: i64) -> &[AtomicBool] {
        &self.buffers[(1 - tick % 2) as usize]
    }

    fn live(buffer: &[AtomicBool], x: isize, y: isize) -> u8 {
        if x < 0 || y < 0 || x >= N as isize || y >= N as isize {
            return 0; // off the board counts as dead
        }
        u8::from(buffer[x as usize * N + y as usize].load(Ordering::Relaxed))
    }

    fn neighbours(buffer: &[AtomicBool], x: isize, y: isize) -> u8 {
        Self::live(buffer, x - 1, y - 1)
            + Self::live(buffer, x - 1, y)
            + Self::live(buffer, x - 1, y + 1)
            + Self::live(buffer, x, y - 1)
            + Self::live(buffer, x, y + 1)
            + Self::live(buffer, x + 1, y - 1)
            + Self::live(buffer, x + 1, y)
            + Self::live(buffer, x + 1, y + 1)
    }
}

// ── Patch process ───────────────────────────────────────────────

/// Advances one PATCH×PATCH patch by one generation per tick.
struct Patch {
    x: usize,
    y: usize,
    board: Arc<Universe>,
    changes: AggId,
}

impl Lp for Patch {
    fn run(&mut self, rt: &mut Runner, _inbox: Inbox) -> Schedule {
        let tick = rt.current_tick().0;
        let current = self.board.current(tick);
        let next = self.board.next(tick);

        for i in 0..PATCH {
            for j in 0..PATCH {
                let x = self.x + i;
                let y = self.y + j;
                let idx = x * N + y;
                let count = Universe::neighbours(current, x as isize, y as isize);
                let alive = current[idx].load(Ordering::Relaxed);
                let lives = count == 3 || (count == 2 && alive);
                next[idx].store(lives, Ordering::Relaxed);
                if lives != alive {
                    rt.update_agg(self.changes, 1, 1.0);
                }
            }
        }
        Schedule::After(1)
    }
}

// ── Rendering ───────────────────────────────────────────────────

fn render(board: &Universe, tick: i64, changes: i64) {
    let current = board.current(tick);
    let mut live = 0usize;
    let mut frame = String::with_capacity((N + 1) * N);
    for x in 0..N {
        for y in 0..N {
            if current[x * N + y].load(Ordering::Relaxed) {
                live += 1;
                frame.push('#');
            } else {
                frame.push('.');
            }
        }
        frame.push('\n');
    }
    println!("{frame}tick {tick}: {live} live cells, {changes} changes so far\n");
}

fn main() -> Result<(), Box<dyn Error>> {
    let pattern = env::args().nth(1).unwrap_or_else(|| "glider".to_string());

    let board = Arc::new(Universe::new());
    board.seed(&pattern);

    let mut sim = Sim::new(RUNNERS)?;
    let changes = sim.create_sum();
    for x in (0..N).step_by(PATCH) {
        for y in (0..N).step_by(PATCH) {
            let runner = RunnerId((((x + y) / PATCH) % RUNNERS) as u32);
            sim.add_lp(
                runner,
                Box::new(Patch {
                    x,
                    y,
                    board: Arc::clone(&board),
                    changes,
                }),
            )?;
        }
    }

    sim.start()?;
    while sim.current_tick().0 < STEPS {
        sim.run_steps(FRAME_EVERY)?;
        let (changed, _) = sim.read_agg(changes).ok_or("change aggregate missing")?;
        render(&board, sim.current_tick().0, changed);
    }
    sim.stop()?;
    Ok(())
}
