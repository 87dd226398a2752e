//! Fixed-size worker pool with a rendezvous intake.
//!
//! `submit` returns only once an idle worker has taken the envelope, so a
//! busy pool pushes back on whoever is feeding it. `shutdown` lets every
//! worker finish the unit it is running, then waits for all of them to exit.

use crate::error::PoolError;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Number of workers every crawl pool is started with
pub const POOL_WORKERS: usize = 100;

/// A unit of work executed by one pool worker.
pub trait Work: Send + 'static {
    fn work(self: Box<Self>, context: String) -> BoxFuture<'static, ()>;
}

struct Envelope {
    context: String,
    work: Box<dyn Work>,
    accepted: oneshot::Sender<()>,
}

pub struct WorkerPool {
    tasks: mpsc::Sender<Envelope>,
    kill: watch::Sender<bool>,
    workers: StdMutex<Vec<JoinHandle<()>>>,
    handoffs: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Start `workers` long-lived workers on the current tokio runtime.
    pub fn new(workers: usize) -> Self {
        let size = workers.max(1);
        // Capacity 1 plus the acceptance handshake gives rendezvous semantics:
        // the submitter is released by a worker, not by the buffer.
        let (tasks, intake) = mpsc::channel::<Envelope>(1);
        let intake = Arc::new(Mutex::new(intake));
        let (kill, _) = watch::channel(false);

        let handles = (0..size)
            .map(|worker_id| {
                let intake = intake.clone();
                let kill = kill.subscribe();
                tokio::spawn(Self::run_worker(worker_id, intake, kill))
            })
            .collect();

        Self {
            tasks,
            kill,
            workers: StdMutex::new(handles),
            handoffs: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shut_down(&self) -> bool {
        *self.kill.borrow()
    }

    /// Hand `work` to an idle worker, waiting until one accepts it.
    ///
    /// Fails with [`PoolError::ShutDown`] once `shutdown` has been called. If
    /// this future is dropped after the envelope was queued, the work may
    /// still run.
    pub async fn submit<W: Work>(
        &self,
        context: impl Into<String>,
        work: W,
    ) -> Result<(), PoolError> {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        let (accepted, on_accept) = oneshot::channel();
        let envelope = Envelope {
            context: context.into(),
            work: Box::new(work),
            accepted,
        };

        self.tasks
            .send(envelope)
            .await
            .map_err(|_| PoolError::ShutDown)?;

        // The envelope is dropped unaccepted only when the workers are gone.
        on_accept.await.map_err(|_| PoolError::ShutDown)
    }

    /// Detached submissions that no worker has accepted yet
    pub fn pending_handoffs(&self) -> usize {
        self.size - self.handoffs.available_permits()
    }

    /// Hand `work` over without ever waiting on this pool.
    ///
    /// Workers use this for follow-up work: a worker blocked on its own pool
    /// could otherwise hold the last free slot forever. At most `size`
    /// handoffs are outstanding; once they are all taken the caller runs the
    /// work itself, so a saturated pool slows down whoever is feeding it.
    /// Work dispatched after shutdown is dropped.
    pub async fn dispatch<W: Work>(self: &Arc<Self>, context: impl Into<String>, work: W) {
        let context = context.into();
        if self.is_shut_down() {
            warn!("[{}] dropped dispatched work: {}", context, PoolError::ShutDown);
            return;
        }

        match Arc::clone(&self.handoffs).try_acquire_owned() {
            Ok(permit) => {
                let pool = Arc::clone(self);
                tokio::spawn(async move {
                    // Held until a worker accepts or the pool rejects.
                    let _permit = permit;
                    if let Err(e) = pool.submit(context.clone(), work).await {
                        warn!("[{}] dropped dispatched work: {}", context, e);
                    }
                });
            }
            Err(_) => {
                debug!("[{}] all {} handoffs pending, running inline", context, self.size);
                execute(context, Box::new(work), "caller").await;
            }
        }
    }

    /// Signal every worker to stop and wait until all of them have exited.
    ///
    /// Work already running is finished first. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        self.kill.send_replace(true);

        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            workers.drain(..).collect()
        };

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }
        debug!("Worker pool of {} shut down", self.size);
    }

    async fn run_worker(
        worker_id: usize,
        intake: Arc<Mutex<mpsc::Receiver<Envelope>>>,
        mut kill: watch::Receiver<bool>,
    ) {
        loop {
            let envelope = tokio::select! {
                biased;
                _ = async { let _ = kill.wait_for(|killed| *killed).await; } => break,
                envelope = async { intake.lock().await.recv().await } => envelope,
            };

            let Some(Envelope {
                context,
                work,
                accepted,
            }) = envelope
            else {
                break;
            };

            // A submitter that gave up waiting does not cancel the work.
            let _ = accepted.send(());

            execute(context, work, &format!("worker {}", worker_id)).await;
        }
        debug!("Worker {} exiting", worker_id);
    }
}

/// Run one unit of work, containing any panic it raises.
async fn execute(context: String, work: Box<dyn Work>, runner: &str) {
    let label = context.clone();
    let outcome = AssertUnwindSafe(async move { work.work(context).await })
        .catch_unwind()
        .await;
    if outcome.is_err() {
        error!("[{}] {} recovered from a panicking task", label, runner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Count(Arc<AtomicUsize>);

    impl Work for Count {
        fn work(self: Box<Self>, _context: String) -> BoxFuture<'static, ()> {
            Box::pin(async move {
                self.0.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    struct Gated {
        gate: Arc<Notify>,
        done: Arc<AtomicUsize>,
    }

    impl Work for Gated {
        fn work(self: Box<Self>, _context: String) -> BoxFuture<'static, ()> {
            Box::pin(async move {
                self.gate.notified().await;
                self.done.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    struct Panics;

    impl Work for Panics {
        fn work(self: Box<Self>, _context: String) -> BoxFuture<'static, ()> {
            Box::pin(async move { panic!("boom") })
        }
    }

    #[tokio::test]
    async fn test_pool_runs_submitted_work() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit("TEST", Count(counter.clone())).await.unwrap();
        pool.submit("TEST", Count(counter.clone())).await.unwrap();
        pool.shutdown().await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(2);
        pool.shutdown().await;

        let counter = Arc::new(AtomicUsize::new(0));
        let result = pool.submit("late", Count(counter.clone())).await;

        assert_eq!(result, Err(PoolError::ShutDown));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_twice_is_harmless() {
        let pool = WorkerPool::new(2);
        pool.shutdown().await;
        pool.shutdown().await;
        assert!(pool.is_shut_down());
    }

    #[tokio::test]
    async fn test_submit_blocks_while_all_workers_are_busy() {
        let pool = WorkerPool::new(1);
        let gate = Arc::new(Notify::new());
        let done = Arc::new(AtomicUsize::new(0));

        pool.submit(
            "first",
            Gated {
                gate: gate.clone(),
                done: done.clone(),
            },
        )
        .await
        .unwrap();

        // The only worker is parked on the gate, so nobody can accept this yet.
        let second = tokio::time::timeout(
            Duration::from_millis(50),
            pool.submit("second", Count(Arc::new(AtomicUsize::new(0)))),
        )
        .await;
        assert!(second.is_err(), "submission should still be waiting");

        gate.notify_one();
        pool.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_running_work() {
        let pool = WorkerPool::new(1);
        let gate = Arc::new(Notify::new());
        let done = Arc::new(AtomicUsize::new(0));

        pool.submit(
            "slow",
            Gated {
                gate: gate.clone(),
                done: done.clone(),
            },
        )
        .await
        .unwrap();

        let release = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            release.notify_one();
        });

        pool.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_work() {
        let pool = WorkerPool::new(1);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit("panics", Panics).await.unwrap();
        pool.submit("after", Count(counter.clone())).await.unwrap();
        pool.shutdown().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_runs_without_blocking_caller() {
        let pool = Arc::new(WorkerPool::new(2));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            pool.dispatch("dispatched", Count(counter.clone())).await;
        }

        // Give the detached submitters time to hand everything over.
        for _ in 0..50 {
            if counter.load(Ordering::SeqCst) == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        pool.shutdown().await;

        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_dispatch_is_bounded_when_pool_is_saturated() {
        let pool = Arc::new(WorkerPool::new(1));
        assert_eq!(pool.size(), 1);
        let gate = Arc::new(Notify::new());
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(
            "busy",
            Gated {
                gate: gate.clone(),
                done: done.clone(),
            },
        )
        .await
        .unwrap();

        for _ in 0..1000 {
            pool.dispatch("fan-out", Count(counter.clone())).await;
        }

        // One handoff is parked waiting for the worker; the rest ran on the caller.
        assert_eq!(pool.pending_handoffs(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 999);

        gate.notify_one();
        for _ in 0..50 {
            if counter.load(Ordering::SeqCst) == 1000 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        pool.shutdown().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1000);
        assert_eq!(pool.pending_handoffs(), 0);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_dropped() {
        let pool = Arc::new(WorkerPool::new(1));
        pool.shutdown().await;

        let counter = Arc::new(AtomicUsize::new(0));
        pool.dispatch("late", Count(counter.clone())).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(pool.pending_handoffs(), 0);
    }
}
