//! The dedicated render thread and its dispatch/wait rendezvous.
//!
//! The render thread runs exactly one job at a time, handed to it by the application
//! thread through [`RenderThread::dispatch`]. It never schedules further work on its
//! own. [`RenderThread::wait`] is the sole rendezvous point between the two threads:
//! once it returns, the previous dispatch has fully finished and the application
//! thread may touch frame state again.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use anyhow::Result;

use crate::core::error::Error;

type RenderJob = Box<dyn FnOnce() -> Result<()> + Send>;

struct State {
    job: Option<RenderJob>,
    busy: bool,
    shutdown: bool,
    result: Option<Result<()>>,
}

struct Shared {
    state: Mutex<State>,
    work: Condvar,
    done: Condvar,
}

/// Handle to the dedicated render thread.
pub struct RenderThread {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Spawn the render thread.
    pub fn spawn() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                job: None,
                busy: false,
                shutdown: false,
                result: None,
            }),
            work: Condvar::new(),
            done: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("deimos-render".into())
            .spawn(move || Self::worker_loop(worker_shared))
            .map_err(|_| Error::InitFailed("could not spawn the render thread"))?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    fn worker_loop(shared: Arc<Shared>) {
        let mut state = shared.state.lock().unwrap();
        loop {
            if state.shutdown {
                return;
            }
            if let Some(job) = state.job.take() {
                // Run the job with the state lock released so producers can queue
                // deferred commands and the main thread can inspect statistics.
                drop(state);
                let result = panic::catch_unwind(AssertUnwindSafe(job));
                state = shared.state.lock().unwrap();
                state.result = Some(match result {
                    Ok(result) => result,
                    Err(_) => Err(Error::RenderThreadPanicked.into()),
                });
                state.busy = false;
                shared.done.notify_all();
            } else {
                state = shared.work.wait(state).unwrap();
            }
        }
    }

    /// Hand a job to the render thread. At most one job may be outstanding; callers
    /// must [`wait`](RenderThread::wait) before dispatching again.
    pub fn dispatch(&self, job: impl FnOnce() -> Result<()> + Send + 'static) -> Result<()> {
        let mut state = self.shared.state.lock().map_err(Error::from)?;
        if state.busy {
            return Err(Error::RenderThreadBusy.into());
        }
        state.busy = true;
        state.result = None;
        state.job = Some(Box::new(job));
        self.shared.work.notify_one();
        Ok(())
    }

    /// Block until the outstanding job, if any, completes, and return its result.
    pub fn wait(&self) -> Result<()> {
        let mut state = self.shared.state.lock().map_err(Error::from)?;
        while state.busy {
            state = self.shared.done.wait(state).map_err(Error::from)?;
        }
        state.result.take().unwrap_or(Ok(()))
    }

    /// True while a dispatch is outstanding.
    pub fn is_busy(&self) -> bool {
        self.shared.state.lock().map(|s| s.busy).unwrap_or(false)
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.shutdown = true;
            self.shared.work.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
