use std::future::Future;
use std::io;
use std::sync::mpsc;

use log::debug;
use tokio::runtime::{Builder, Runtime};

/// Runs network-bound jobs off the calling thread.
///
/// The caller (a UI loop, or the console's main thread) issues a job and
/// either hands over a completion callback or gets a [`Completion`] to poll.
/// Jobs are never cancelled: once dispatched they run to completion or
/// failure.
///
/// The worker owns its runtime, so it must be created and dropped outside of
/// any other Tokio runtime.
pub struct Worker {
    runtime: Runtime,
}

impl Worker {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("winops-worker")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Run `job` on the worker; `on_complete` receives its output on a worker
    /// thread once it finishes.
    pub fn dispatch<F, C>(&self, job: F, on_complete: C)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
        C: FnOnce(F::Output) + Send + 'static,
    {
        self.runtime.spawn(async move {
            let output = job.await;
            on_complete(output);
        });
    }

    /// Run `job` on the worker; its output is delivered through the returned
    /// [`Completion`].
    pub fn submit<F>(&self, job: F) -> Completion<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.dispatch(job, move |output| {
            if tx.send(output).is_err() {
                debug!("Completion dropped before the job finished");
            }
        });
        Completion { rx }
    }

    /// Submit and block the calling thread until the job is done.
    /// `None` if the job panicked.
    pub fn run<F>(&self, job: F) -> Option<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.submit(job).wait()
    }
}

/// Pending result of a [`Worker::submit`] call.
pub struct Completion<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Completion<T> {
    /// Non-blocking check, for callers that poll from an event loop.
    pub fn try_take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Block until the job finishes. `None` if it panicked.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn callback_receives_output() {
        let worker = Worker::new().unwrap();
        let (tx, rx) = mpsc::channel();
        worker.dispatch(async { 40 + 2 }, move |n| tx.send(n).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn completion_can_be_polled_then_awaited() {
        let worker = Worker::new().unwrap();
        let completion = worker.submit(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "done"
        });
        assert_eq!(completion.try_take(), None);
        assert_eq!(completion.wait(), Some("done"));
    }

    #[test]
    fn panicking_job_yields_none() {
        let worker = Worker::new().unwrap();
        let result = worker.run(async {
            if true {
                panic!("boom");
            }
        });
        assert_eq!(result, None);
    }
}
