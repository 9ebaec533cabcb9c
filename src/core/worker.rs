//! Fixed worker threads serving asynchronous calls
//!
//! Jobs flow through a FIFO channel shared by all workers. Shutdown closes
//! the channel: jobs already queued still run, new submissions fail with
//! [`DatabaseError::ShutDown`], and every worker is joined.

use super::error::{DatabaseError, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool of named worker threads draining one job queue
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `count` workers named `db-worker-{n}`
    pub fn new(count: usize) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("db-worker-{index}"))
                .spawn(move || run_worker(&receiver))?;
            workers.push(handle);
        }
        tracing::info!(workers = count, "worker pool started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Queue `task` and return a handle to its eventual result
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ShutDown`] once [`WorkerPool::shutdown`] has started.
    pub fn submit<T, F>(&self, task: F) -> Result<QueryHandle<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            // receiver may have been dropped; nothing to report then
            let _ = tx.send(task());
        });

        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| DatabaseError::ShutDown)?,
            None => return Err(DatabaseError::ShutDown),
        }
        tracing::trace!("task queued");
        Ok(QueryHandle { rx })
    }

    /// Number of worker threads still attached
    pub fn size(&self) -> usize {
        self.workers.lock().len()
    }

    /// Whether shutdown has started
    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stop accepting work, let queued jobs finish, then join every worker.
    ///
    /// Must not be called from a worker thread.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let joined = workers.len();
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("worker thread terminated abnormally");
            }
        }
        tracing::info!(workers = joined, "worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.size())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn run_worker(receiver: &Mutex<Receiver<Job>>) {
    loop {
        // hold the lock only while dequeuing
        let job = receiver.lock().recv();
        match job {
            Ok(job) => {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!(
                        worker = thread::current().name().unwrap_or("db-worker"),
                        "asynchronous task panicked"
                    );
                }
            }
            Err(_) => break,
        }
    }
}

/// Eventual result of a queued task.
///
/// Await it from async code, or call [`QueryHandle::wait`] from a plain thread.
#[derive(Debug)]
pub struct QueryHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

fn task_dropped() -> DatabaseError {
    DatabaseError::TaskFailed("task ended without producing a result".to_string())
}

impl<T> QueryHandle<T> {
    /// Block the current thread until the result arrives.
    ///
    /// Panics if called from within an async runtime; `.await` the handle there.
    pub fn wait(self) -> Result<T> {
        self.rx.blocking_recv().map_err(|_| task_dropped())?
    }

    /// Take the result if it is ready
    pub fn try_result(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(task_dropped())),
        }
    }
}

impl<T> Future for QueryHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.map_err(|_| task_dropped())?)
    }
}
