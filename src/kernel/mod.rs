//! Event-driven simulation kernel.
//!
//! A single-threaded, cooperative, virtual-time dispatch loop: the kernel
//! owns a priority queue of timestamped self-messages and a clock, and
//! delivers messages in time order to the attached process. Handlers run to
//! completion; the only control transfer points are the start and end of
//! `handle`.
//!
//! # Example
//!
//! ```
//! use lifecourse_simulator_core_rs::kernel::{Process, Simulation};
//!
//! struct Counter {
//!     fired: Vec<f64>,
//! }
//!
//! impl Process<u8> for Counter {
//!     fn init(&mut self, sim: &mut Simulation<u8>) {
//!         sim.schedule_at(1.0, 0);
//!         sim.schedule_at(2.0, 0);
//!     }
//!
//!     fn handle(&mut self, sim: &mut Simulation<u8>, _msg: &lifecourse_simulator_core_rs::kernel::Message<u8>) {
//!         self.fired.push(sim.now());
//!     }
//! }
//!
//! let mut sim = Simulation::new();
//! let mut counter = Counter { fired: Vec::new() };
//! sim.create_process(&mut counter).unwrap();
//! sim.run(&mut counter);
//! assert_eq!(counter.fired, vec![1.0, 2.0]);
//! ```

mod message;

pub use message::{Message, Time};

use message::{MessageQueue, Scheduled};
use thiserror::Error;

/// Kernel-level failures surfaced to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// `create_process` was called while a process is already attached.
    #[error("a process is already attached; call clear() before attaching another")]
    AlreadyRunning,
}

/// The two capabilities the kernel needs of a process.
///
/// A process is a plain data record with per-individual state. It lives for
/// exactly one run and is never shared across concurrent runs.
pub trait Process<K> {
    /// Prime the queue with the initial events for this individual.
    fn init(&mut self, sim: &mut Simulation<K>);

    /// React to one dispatched message: mutate state, schedule or remove
    /// messages, emit records, possibly request `stop()`.
    fn handle(&mut self, sim: &mut Simulation<K>, msg: &Message<K>);
}

/// Kernel state for one simulation run.
///
/// Owns the clock and the message queue. One context per run; `clear()`
/// resets it for the next individual. Replicating the whole context per
/// worker is the unit of parallelism across individuals.
#[derive(Debug)]
pub struct Simulation<K> {
    clock: Time,
    previous_event_time: Time,
    queue: MessageQueue<K>,
    sequence: u64,
    running: bool,
    attached: bool,
}

impl<K> Simulation<K> {
    pub fn new() -> Self {
        Self {
            clock: 0.0,
            previous_event_time: 0.0,
            queue: MessageQueue::new(),
            sequence: 0,
            running: false,
            attached: false,
        }
    }

    /// Current simulation time in years.
    pub fn now(&self) -> Time {
        self.clock
    }

    /// Time of the previously handled message (0 before the first message).
    pub fn previous_event_time(&self) -> Time {
        self.previous_event_time
    }

    /// Number of messages waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Attach `process` as the current subject and let it prime the queue.
    ///
    /// Fails with [`KernelError::AlreadyRunning`] if a process is attached.
    pub fn create_process(&mut self, process: &mut impl Process<K>) -> Result<(), KernelError> {
        if self.attached {
            return Err(KernelError::AlreadyRunning);
        }
        self.attached = true;
        process.init(self);
        Ok(())
    }

    /// Schedule a message of `kind` to fire at absolute time `timestamp`.
    ///
    /// # Panics
    ///
    /// Panics if `timestamp` lies before the current clock (time reversal —
    /// a contract violation).
    pub fn schedule_at(&mut self, timestamp: Time, kind: K) {
        self.insert(Message {
            kind,
            name: None,
            sending_time: self.clock,
            timestamp,
        });
    }

    /// Schedule a named message; the name is only used for removal.
    pub fn schedule_named(&mut self, timestamp: Time, kind: K, name: &str) {
        self.insert(Message {
            kind,
            name: Some(name.to_string()),
            sending_time: self.clock,
            timestamp,
        });
    }

    fn insert(&mut self, message: Message<K>) {
        assert!(
            message.timestamp >= self.clock,
            "time reversal: scheduled at t={} but clock is {}",
            message.timestamp,
            self.clock
        );
        let entry = Scheduled {
            timestamp: message.timestamp,
            sequence: self.sequence,
            message,
        };
        self.sequence += 1;
        self.queue.push(entry);
    }

    /// Dispatch queued messages in time order until the queue drains or
    /// `stop()` is requested.
    ///
    /// # Panics
    ///
    /// Panics if no process was attached via `create_process`.
    pub fn run(&mut self, process: &mut impl Process<K>) {
        assert!(
            self.attached,
            "no process attached: call create_process() before run()"
        );
        self.running = true;
        while self.running {
            let Some(entry) = self.queue.pop_earliest() else {
                break;
            };
            self.clock = entry.timestamp;
            process.handle(self, &entry.message);
            self.previous_event_time = self.clock;
        }
        self.running = false;
    }

    /// Request termination: the current handler completes, then the dispatch
    /// loop exits. No further messages are delivered.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Drop the queue, reset the clock and detach the process.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.clock = 0.0;
        self.previous_event_time = 0.0;
        self.sequence = 0;
        self.running = false;
        self.attached = false;
    }

    /// Remove every pending message satisfying `pred`. Removed messages
    /// never dispatch.
    pub fn remove_if(&mut self, pred: impl Fn(&Message<K>) -> bool) {
        self.queue.remove_if(pred);
    }

    /// Remove every pending message with the given name.
    pub fn remove_name(&mut self, name: &str) {
        self.queue.remove_if(|m| m.name.as_deref() == Some(name));
    }

    /// True if any pending message satisfies `pred`. Mostly for tests.
    pub fn any_pending(&self, pred: impl Fn(&Message<K>) -> bool) -> bool {
        self.queue.iter().any(|entry| pred(&entry.message))
    }
}

impl<K: PartialEq> Simulation<K> {
    /// Remove every pending message of the given kind.
    pub fn remove_kind(&mut self, kind: K) {
        self.queue.remove_if(|m| m.kind == kind);
    }
}

impl<K> Default for Simulation<K> {
    fn default() -> Self {
        Self::new()
    }
}
