//! Worker threads and the step/shutdown handshake.
//!
//! One long-lived thread per runner. The runner value itself travels
//! through the channels: the simulator moves it to the worker at fan-out
//! and receives it back at fan-in, so the worker owns it exclusively for
//! the duration of a step. Both channels are rendezvous (zero capacity) —
//! every send is a synchronization point and no additional locks exist.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use cadence_core::{RunnerId, Tick};

use crate::runner::Runner;

/// Command sent from the simulator to a worker.
pub(crate) enum WorkerCommand {
    /// Execute one step at the given tick and hand the runner back.
    Step(Box<Runner>, Tick),
    /// Acknowledge on the reply channel and exit.
    Shutdown,
}

/// Reply sent from a worker on the simulator's shared fan-in channel.
pub(crate) enum WorkerReply {
    /// Step complete: the runner and the wakeup it reported.
    Stepped(Box<Runner>, Tick),
    /// A process panicked; the worker is gone and the runner's population
    /// was lost with the unwind.
    Panicked(RunnerId),
    /// Shutdown acknowledged.
    Stopped,
}

/// Handle to a spawned worker thread.
pub(crate) struct Worker {
    pub command_tx: Sender<WorkerCommand>,
    pub join: JoinHandle<()>,
}

/// Spawn the worker thread for runner `id`.
pub(crate) fn spawn(id: RunnerId, reply_tx: Sender<WorkerReply>) -> std::io::Result<Worker> {
    let (command_tx, command_rx) = crossbeam_channel::bounded(0);
    let join = std::thread::Builder::new()
        .name(format!("cadence-runner-{id}"))
        .spawn(move || worker_loop(id, command_rx, reply_tx))?;
    Ok(Worker { command_tx, join })
}

fn worker_loop(id: RunnerId, rx: Receiver<WorkerCommand>, reply_tx: Sender<WorkerReply>) {
    while let Ok(command) = rx.recv() {
        match command {
            WorkerCommand::Step(mut runner, tick) => {
                // A process panic must not strand the fan-in barrier: catch
                // the unwind, report it, and let the coordinator propagate.
                // The default panic hook has already printed the message.
                let outcome = catch_unwind(AssertUnwindSafe(move || {
                    let next = runner.step(tick);
                    (runner, next)
                }));
                let reply = match outcome {
                    Ok((runner, next)) => WorkerReply::Stepped(runner, next),
                    Err(_) => WorkerReply::Panicked(id),
                };
                let fatal = matches!(reply, WorkerReply::Panicked(_));
                if reply_tx.send(reply).is_err() || fatal {
                    return;
                }
            }
            WorkerCommand::Shutdown => {
                let _ = reply_tx.send(WorkerReply::Stopped);
                return;
            }
        }
    }
    // The simulator dropped its command sender without a shutdown
    // handshake; exit quietly.
}
