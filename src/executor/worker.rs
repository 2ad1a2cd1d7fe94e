use super::runner::{BatchEngine, ExecutionRequest, ExecutionResult};
use crate::config::EngineConfig;
use crate::error::ExecError;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

type Callback = Box<dyn FnOnce(ExecutionResult) + Send>;

enum Job {
    Run(ExecutionRequest, Callback),
    Configure(EngineConfig),
}

/// A single background thread that owns a [`BatchEngine`] and runs
/// requests in submission order, handing each result to its callback.
pub struct BatchWorker {
    jobs: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl BatchWorker {
    pub fn spawn(mut engine: BatchEngine) -> Result<Self, ExecError> {
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("batch-worker".to_string())
            .spawn(move || {
                for job in rx {
                    match job {
                        Job::Run(request, on_done) => on_done(engine.run_request(&request)),
                        Job::Configure(config) => engine.set_config(config),
                    }
                }
                debug!("batch worker drained");
            })
            .map_err(|_| ExecError::WorkerGone)?;

        info!("batch worker started");
        Ok(Self {
            jobs: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue a request. `on_done` runs on the worker thread.
    pub fn submit<F>(&self, request: ExecutionRequest, on_done: F) -> Result<(), ExecError>
    where
        F: FnOnce(ExecutionResult) + Send + 'static,
    {
        self.send(Job::Run(request, Box::new(on_done)))
    }

    /// Applies to requests queued after this call.
    pub fn configure(&self, config: EngineConfig) -> Result<(), ExecError> {
        self.send(Job::Configure(config))
    }

    fn send(&self, job: Job) -> Result<(), ExecError> {
        self.jobs
            .as_ref()
            .ok_or(ExecError::WorkerGone)?
            .send(job)
            .map_err(|_| ExecError::WorkerGone)
    }

    /// Finish queued work and stop the thread.
    pub fn shutdown(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BatchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
