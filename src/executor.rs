//! The simulation thread and the gate that keeps packet handling on it.

use crate::protocol::packet::{Packet, PacketListener};
use std::{
    sync::Arc,
    thread::{self, ThreadId},
};

type Task = Box<dyn FnOnce() + Send>;

/// A task queue owned by one designated thread, which drains it with
/// [`SimulationExecutor::run_pending`].
#[derive(Debug)]
pub struct SimulationExecutor {
    owner: ThreadId,
    sender: flume::Sender<Task>,
    receiver: flume::Receiver<Task>,
}

impl SimulationExecutor {
    /// Creates an executor owned by the calling thread.
    pub fn new() -> Self {
        Self::owned_by(thread::current().id())
    }

    pub fn owned_by(owner: ThreadId) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            owner,
            sender,
            receiver,
        }
    }

    pub fn is_same_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Queues `task` to run on the owning thread.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
        // The receiver lives in `self`, so the channel cannot be disconnected.
        let _ = self.sender.send(Box::new(task));
    }

    /// Runs every queued task, including ones queued while running.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        debug_assert!(self.is_same_thread(), "run_pending called off the simulation thread");
        let mut count = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            count += 1;
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for SimulationExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`ensure_running_on_same_thread`].
#[must_use]
#[derive(Debug)]
pub enum Affinity<P> {
    /// Already on the simulation thread; handle the packet now.
    ProcessNow(P),
    /// Re-dispatch was queued on the simulation thread. Stop processing.
    Handled,
}

/// Ensures `packet` is handled on `executor`'s thread.
///
/// Off that thread, queues a task that dispatches the packet to
/// `handler` there, skipping it if the connection has closed by then,
/// and returns [`Affinity::Handled`].
pub fn ensure_running_on_same_thread<H>(
    packet: Box<dyn Packet<H>>,
    handler: &Arc<H>,
    executor: &SimulationExecutor,
) -> Affinity<Box<dyn Packet<H>>>
where
    H: PacketListener + ?Sized,
{
    if executor.is_same_thread() {
        return Affinity::ProcessNow(packet);
    }
    let handler = Arc::clone(handler);
    executor.execute(move || {
        if handler.connection().is_connected() {
            packet.dispatch(&*handler);
        } else {
            tracing::debug!(packet = packet.name(), "Ignoring packet due to disconnection");
        }
    });
    Affinity::Handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn tasks_run_on_owner() {
        let executor = Arc::new(SimulationExecutor::new());
        let count = Arc::new(AtomicUsize::new(0));

        let remote = Arc::clone(&executor);
        let remote_count = Arc::clone(&count);
        thread::spawn(move || {
            assert!(!remote.is_same_thread());
            let owner_count = Arc::clone(&remote_count);
            remote.execute(move || {
                owner_count.fetch_add(1, Ordering::SeqCst);
            });
        })
        .join()
        .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(executor.run_pending(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
