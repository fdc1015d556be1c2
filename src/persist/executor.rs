//! Execution contexts for asynchronous consumption.
//!
//! An [`Executor`] takes a zero-argument unit of work and returns a
//! [`CompletionHandle`] the caller can block on later. The work's error, if
//! any, comes back wrapped in [`PersistError::ExecutionFailed`]; a unit that
//! panics or never reports surfaces as [`PersistError::WorkerLost`].
//!
//! Dropping a handle abandons the result. The work itself keeps running to
//! completion; there is no preemption.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{ConfigError, PersistError};

use super::PersistResult;

enum Outcome<T> {
    Done(PersistResult<T>),
    Lost(String),
}

/// Eventual result of a unit of work.
pub struct CompletionHandle<T> {
    rx: mpsc::Receiver<Outcome<T>>,
    finished: Arc<AtomicBool>,
}

impl<T> CompletionHandle<T> {
    fn channel() -> (Reporter<T>, Self) {
        let (tx, rx) = mpsc::channel();
        let finished = Arc::new(AtomicBool::new(false));
        let reporter = Reporter {
            tx,
            finished: Arc::clone(&finished),
        };
        (reporter, Self { rx, finished })
    }

    /// A handle that is already failed, for work that could not be scheduled.
    fn lost(message: String) -> Self {
        let (reporter, handle) = Self::channel();
        reporter.report(Outcome::Lost(message));
        handle
    }

    /// Whether the work has reported (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Block until the work reports.
    pub fn wait(self) -> PersistResult<T> {
        match self.rx.recv() {
            Ok(outcome) => Self::unwrap_outcome(outcome),
            Err(_) => Err(PersistError::WorkerLost {
                message: "worker exited without reporting".into(),
            }),
        }
    }

    /// Block for at most `timeout`. On timeout the handle is given back.
    pub fn wait_timeout(self, timeout: Duration) -> Result<PersistResult<T>, Self> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Ok(Self::unwrap_outcome(outcome)),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(self),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(Err(PersistError::WorkerLost {
                message: "worker exited without reporting".into(),
            })),
        }
    }

    fn unwrap_outcome(outcome: Outcome<T>) -> PersistResult<T> {
        match outcome {
            Outcome::Done(Ok(value)) => Ok(value),
            Outcome::Done(Err(source)) => Err(PersistError::ExecutionFailed {
                source: Box::new(source),
            }),
            Outcome::Lost(message) => Err(PersistError::WorkerLost { message }),
        }
    }
}

impl<T> std::fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

struct Reporter<T> {
    tx: mpsc::Sender<Outcome<T>>,
    finished: Arc<AtomicBool>,
}

impl<T> Reporter<T> {
    fn report(self, outcome: Outcome<T>) {
        // A closed receiver means the caller abandoned the handle.
        let _ = self.tx.send(outcome);
        self.finished.store(true, Ordering::Release);
    }

    /// Run `work`, catching panics, and report its outcome.
    fn run<F>(self, work: F)
    where
        F: FnOnce() -> PersistResult<T>,
    {
        let outcome = match catch_unwind(AssertUnwindSafe(work)) {
            Ok(result) => Outcome::Done(result),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(%message, "unit of work panicked");
                Outcome::Lost(message)
            }
        };
        self.report(outcome);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".into()
    }
}

/// A concurrent execution context.
pub trait Executor {
    fn execute<T, F>(&self, work: F) -> CompletionHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> PersistResult<T> + Send + 'static;
}

/// One named OS thread per unit of work.
#[derive(Debug)]
pub struct ThreadExecutor {
    name: String,
    spawned: AtomicUsize,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spawned: AtomicUsize::new(0),
        }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("rdf-kernel")
    }
}

impl Executor for ThreadExecutor {
    fn execute<T, F>(&self, work: F) -> CompletionHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> PersistResult<T> + Send + 'static,
    {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let (reporter, handle) = CompletionHandle::channel();
        let spawned = thread::Builder::new()
            .name(format!("{}-{n}", self.name))
            .spawn(move || reporter.run(work));
        match spawned {
            Ok(_) => handle,
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn worker thread");
                CompletionHandle::lost(format!("failed to spawn worker thread: {e}"))
            }
        }
    }
}

/// A fixed-size rayon thread pool.
#[derive(Debug, Clone)]
pub struct PoolExecutor {
    pool: Arc<rayon::ThreadPool>,
}

impl PoolExecutor {
    pub fn new(threads: usize) -> Result<Self, ConfigError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rdf-kernel-pool-{i}"))
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("failed to build thread pool: {e}"),
            })?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for PoolExecutor {
    fn execute<T, F>(&self, work: F) -> CompletionHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> PersistResult<T> + Send + 'static,
    {
        let (reporter, handle) = CompletionHandle::channel();
        self.pool.spawn(move || reporter.run(work));
        handle
    }
}

/// Executor chosen at runtime from configuration.
#[derive(Debug)]
pub enum AnyExecutor {
    Thread(ThreadExecutor),
    Pool(PoolExecutor),
}

impl Executor for AnyExecutor {
    fn execute<T, F>(&self, work: F) -> CompletionHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> PersistResult<T> + Send + 'static,
    {
        match self {
            AnyExecutor::Thread(executor) => executor.execute(work),
            AnyExecutor::Pool(executor) => executor.execute(work),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn thread_executor_returns_value() {
        let handle = ThreadExecutor::default().execute(|| Ok(21 * 2));
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn error_is_wrapped_in_execution_failed() {
        let handle = ThreadExecutor::default().execute::<(), _>(|| {
            Err(StoreError::Rejected {
                statement: "<a> <b> <c> .".into(),
                message: "no".into(),
            }
            .into())
        });
        let err = handle.wait().unwrap_err();
        assert!(matches!(err, PersistError::ExecutionFailed { .. }));
        assert!(matches!(err.root(), PersistError::Store(StoreError::Rejected { .. })));
    }

    #[test]
    fn panic_becomes_worker_lost() {
        let handle = PoolExecutor::new(1)
            .unwrap()
            .execute::<(), _>(|| panic!("kaboom"));
        match handle.wait() {
            Err(PersistError::WorkerLost { message }) => assert_eq!(message, "kaboom"),
            other => panic!("expected WorkerLost, got {other:?}"),
        }
    }

    #[test]
    fn wait_timeout_gives_handle_back() {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let handle = ThreadExecutor::default().execute(move || {
            let _ = gate_rx.recv();
            Ok("done")
        });
        let handle = handle
            .wait_timeout(Duration::from_millis(10))
            .expect_err("work is blocked on the gate");
        assert!(!handle.is_finished());
        gate_tx.send(()).unwrap();
        assert_eq!(handle.wait().unwrap(), "done");
    }

    #[test]
    fn pool_runs_many_units() {
        let pool = PoolExecutor::new(2).unwrap();
        assert_eq!(pool.threads(), 2);
        let handles: Vec<_> = (0..8).map(|i| pool.execute(move || Ok(i))).collect();
        let sum: i32 = handles.into_iter().map(|h| h.wait().unwrap()).sum();
        assert_eq!(sum, 28);
    }

    #[test]
    fn any_executor_delegates() {
        let executor = AnyExecutor::Thread(ThreadExecutor::new("test"));
        assert_eq!(executor.execute(|| Ok(1)).wait().unwrap(), 1);
    }
}
