//! Bounded scheduler: many tasks, few active.
//!
//! Every item gets its own lightweight rayon task, spawned up front inside a
//! [`rayon::Scope`]. Before doing any work a task must take a [`Permit`] from
//! the shared [`AdmissionGate`], which holds exactly `parallelism` permits. So
//! the number of *launched* tasks can equal the item count while the number
//! of tasks *decoding, scaling, or encoding* never exceeds the limit. That is
//! what bounds peak memory, since each active task owns a full pixel buffer.
//!
//! ```text
//!   items ──spawn──▶ [task] [task] [task] [task] [task] ...
//!                      │      │      │
//!                      ▼      ▼      ▼
//!                  ┌─────────────────────┐
//!                  │  AdmissionGate (P)  │   blocked tasks wait here
//!                  └─────────────────────┘
//!                      │      │
//!                      ▼      ▼
//!                    job()  job()            at most P at once
//! ```
//!
//! # Correctness Invariants
//!
//! - **Bounded**: permits held at any instant never exceed the capacity
//! - **Leak-free**: [`Permit`] is RAII and releases on drop, including while
//!   unwinding from a panicking job
//! - **Isolated**: a panicking job becomes [`TaskResult::Panicked`]; the other
//!   tasks and the join are unaffected
//! - **Cancel-safe**: once [`CancelHandle::cancel`] is called, tasks that do
//!   not already hold a permit return [`TaskResult::Cancelled`] without
//!   running the job; permit holders run to completion
//! - **Joined**: [`Scheduler::run_all`] returns only after every task has
//!   finished, one way or another

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Lock with poison recovery.
///
/// The gate state is plain counters that are always left consistent, so a
/// poisoned lock is still safe to use. Drop paths must not panic.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct GateState {
    in_use: usize,
    peak: usize,
    closed: bool,
}

/// Fixed-capacity, blocking admission gate.
///
/// A counting semaphore on `Mutex` + `Condvar` that also records the highest
/// number of permits ever held at once, and can be closed to turn every
/// pending and future `acquire` into a refusal.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    state: Mutex<GateState>,
    cv: Condvar,
}

impl AdmissionGate {
    /// Create a gate with `capacity` permits.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0; such a gate could never admit anything.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "AdmissionGate capacity must be > 0");
        Self {
            capacity,
            state: Mutex::new(GateState::default()),
            cv: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held. A snapshot; may be stale immediately.
    pub fn in_use(&self) -> usize {
        lock_or_recover(&self.state).in_use
    }

    /// Highest number of permits held at the same time since the last
    /// [`reset_peak`](Self::reset_peak).
    pub fn peak(&self) -> usize {
        lock_or_recover(&self.state).peak
    }

    /// Start a fresh high-water mark from the permits held right now.
    pub fn reset_peak(&self) {
        let mut st = lock_or_recover(&self.state);
        st.peak = st.in_use;
    }

    pub fn is_closed(&self) -> bool {
        lock_or_recover(&self.state).closed
    }

    /// Take a permit, blocking while the gate is full.
    ///
    /// Returns `None` if the gate is closed before a permit becomes free.
    /// A `None` caller holds nothing and must not do any gated work.
    pub fn acquire(&self) -> Option<Permit<'_>> {
        let mut st = lock_or_recover(&self.state);
        while !st.closed && st.in_use >= self.capacity {
            st = self.cv.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
        if st.closed {
            return None;
        }
        st.in_use += 1;
        st.peak = st.peak.max(st.in_use);
        Some(Permit { gate: self })
    }

    /// Refuse all further admissions and wake every waiter.
    ///
    /// Permits already handed out stay valid until dropped.
    pub fn close(&self) {
        lock_or_recover(&self.state).closed = true;
        self.cv.notify_all();
    }

    fn release(&self) {
        let mut st = lock_or_recover(&self.state);
        debug_assert!(st.in_use > 0 || std::thread::panicking(), "gate over-release");
        st.in_use = st.in_use.saturating_sub(1);
        drop(st);
        self.cv.notify_one();
    }
}

/// RAII permit for an [`AdmissionGate`]; releases on drop.
#[derive(Debug)]
#[must_use = "Permit releases on drop; not holding it defeats the admission limit"]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Clonable handle that cancels a running (or future) [`Scheduler::run_all`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    gate: Arc<AdmissionGate>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.gate.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.is_closed()
    }
}

/// How a single task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult<R> {
    /// The job ran and returned a value.
    Completed(R),
    /// The job panicked; carries the panic message.
    Panicked(String),
    /// Cancelled before admission; the job never ran.
    Cancelled,
}

/// Runs one task per item on a dedicated rayon pool, gated by an
/// [`AdmissionGate`].
pub struct Scheduler {
    gate: Arc<AdmissionGate>,
    pool: rayon::ThreadPool,
}

impl Scheduler {
    /// Build a scheduler admitting `parallelism` jobs at once on a pool of
    /// `threads` workers.
    ///
    /// # Panics
    ///
    /// Panics if `parallelism` is 0 (validated away by
    /// [`RunConfig::validate`](crate::config::RunConfig::validate)).
    pub fn new(parallelism: usize, threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sticker-worker-{i}"))
            .build()?;
        Ok(Self {
            gate: Arc::new(AdmissionGate::new(parallelism)),
            pool,
        })
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            gate: Arc::clone(&self.gate),
        }
    }

    /// Run `job` once per item and wait for all of them.
    ///
    /// `on_finish` is called from the worker as each task ends, in completion
    /// order. The returned vector is in item order. The gate's peak is reset
    /// on entry, so it describes this call only.
    pub fn run_all<T, R, F, N>(&self, items: &[T], job: F, on_finish: N) -> Vec<TaskResult<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync,
        N: Fn(usize, &TaskResult<R>) + Sync,
    {
        self.gate.reset_peak();
        let slots: Vec<Mutex<Option<TaskResult<R>>>> =
            items.iter().map(|_| Mutex::new(None)).collect();
        let gate: &AdmissionGate = &self.gate;
        let (job, on_finish, slots_ref) = (&job, &on_finish, &slots);

        // The scope is the join barrier: it returns once every spawn is done
        self.pool.scope(|scope| {
            for (index, item) in items.iter().enumerate() {
                scope.spawn(move |_| {
                    let result = match gate.acquire() {
                        None => TaskResult::Cancelled,
                        Some(_permit) => {
                            match panic::catch_unwind(AssertUnwindSafe(|| job(index, item))) {
                                Ok(value) => TaskResult::Completed(value),
                                Err(payload) => TaskResult::Panicked(panic_message(&*payload)),
                            }
                        }
                    };
                    on_finish(index, &result);
                    *lock_or_recover(&slots_ref[index]) = Some(result);
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.into_inner()
                    .unwrap_or_else(PoisonError::into_inner)
                    .unwrap_or(TaskResult::Cancelled)
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
