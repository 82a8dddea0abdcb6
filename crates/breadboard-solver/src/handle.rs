//! Thread-safe, coalescing front end for a [`Simulator`].
//!
//! External state changes (pin writes, timers) call [`SimulationHandle::trigger`].
//! Triggers are never queued one per call:
//!
//! - while a resolve is executing, further triggers are dropped;
//! - inside `min_update_interval` of the previous resolve, at most one
//!   deferred resolve is scheduled and later triggers fold into it;
//! - otherwise the resolve runs immediately on the caller's thread.
//!
//! The simulator mutex is the atomicity boundary: matrix assembly, solve and
//! component updates for one resolve all happen under a single lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use breadboard_core::{Circuit, Electrical};
use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::simulator::{SimulationState, Simulator, SolveReport};

struct Shared<E> {
    simulator: Mutex<Simulator<E>>,
    updating: AtomicBool,
    pending: AtomicBool,
    last_update: Mutex<Option<Instant>>,
    min_interval: Duration,
}

/// Cloneable handle sharing one simulator between threads.
pub struct SimulationHandle<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for SimulationHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Electrical + Send + 'static> SimulationHandle<E> {
    pub fn new(simulator: Simulator<E>) -> Self {
        let min_interval = simulator.config().min_update_interval;
        Self {
            shared: Arc::new(Shared {
                simulator: Mutex::new(simulator),
                updating: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                last_update: Mutex::new(None),
                min_interval,
            }),
        }
    }

    /// Lock the simulator. Do not call [`trigger`](Self::trigger) while
    /// holding the guard.
    pub fn lock(&self) -> MutexGuard<'_, Simulator<E>> {
        self.shared.simulator.lock()
    }

    /// Run `f` on the simulator without triggering a resolve.
    pub fn with_simulator<R>(&self, f: impl FnOnce(&mut Simulator<E>) -> R) -> R {
        f(&mut self.shared.simulator.lock())
    }

    /// Mutate the circuit, then trigger a resolve.
    pub fn with_circuit<R>(&self, f: impl FnOnce(&mut Circuit<E>) -> R) -> R {
        let result = f(self.shared.simulator.lock().circuit_mut());
        self.trigger();
        result
    }

    pub fn start(&self) -> Result<SolveReport> {
        let report = self.shared.simulator.lock().start();
        self.mark_updated();
        report
    }

    pub fn stop(&self) {
        self.shared.simulator.lock().stop();
    }

    pub fn step(&self) -> Result<SolveReport> {
        let report = self.shared.simulator.lock().step();
        self.mark_updated();
        report
    }

    pub fn reset(&self) {
        self.shared.simulator.lock().reset();
    }

    pub fn state(&self) -> SimulationState {
        self.shared.simulator.lock().state()
    }

    /// True while a triggered resolve is executing.
    pub fn is_updating(&self) -> bool {
        self.shared.updating.load(Ordering::Acquire)
    }

    /// True while a deferred resolve is scheduled but has not run.
    pub fn has_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    fn mark_updated(&self) {
        *self.shared.last_update.lock() = Some(Instant::now());
    }

    /// Request a resolve after an external state change.
    pub fn trigger(&self) {
        if self.is_updating() {
            log::debug!("resolve in flight, ignoring trigger");
            return;
        }

        let elapsed = self.shared.last_update.lock().map(|t| t.elapsed());
        match elapsed {
            Some(elapsed) if elapsed < self.shared.min_interval => {
                if self.shared.pending.swap(true, Ordering::AcqRel) {
                    return;
                }
                let wait = self.shared.min_interval - elapsed;
                let handle = self.clone();
                log::debug!("deferring resolve by {:?}", wait);
                thread::spawn(move || {
                    thread::sleep(wait);
                    handle.shared.pending.store(false, Ordering::Release);
                    handle.update();
                });
            }
            _ => self.update(),
        }
    }

    /// Single-flight resolve. Only runs while the simulator is started.
    fn update(&self) {
        if self.shared.updating.swap(true, Ordering::AcqRel) {
            return;
        }
        self.mark_updated();
        {
            let mut simulator = self.shared.simulator.lock();
            if simulator.is_running() {
                if let Err(err) = simulator.solve() {
                    log::warn!("triggered resolve failed: {}", err);
                }
            }
        }
        self.shared.updating.store(false, Ordering::Release);
    }
}
