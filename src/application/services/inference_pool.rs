use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const THREAD_NAME: &str = "inference-worker";

/// Dedicated runtime for model construction and inference, kept apart from
/// the runtime accepting requests. A semaphore bounds how many jobs run at
/// once; excess jobs wait for a permit.
pub struct InferencePool {
    runtime: Option<Runtime>,
    permits: Arc<Semaphore>,
}

/// Holds a pool permit past the end of the job that acquired it. Work the job
/// left running, such as a segment producer, counts against the concurrency
/// limit until the lease is dropped.
#[derive(Debug)]
pub struct PoolLease {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("inference pool is shut down")]
    Closed,
    #[error("inference job did not complete: {0}")]
    JobFailed(String),
}

impl InferencePool {
    pub fn new(worker_threads: usize, max_concurrent_jobs: usize) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name(THREAD_NAME)
            .enable_all()
            .build()?;

        tracing::info!(
            worker_threads = worker_threads.max(1),
            max_concurrent_jobs = max_concurrent_jobs.max(1),
            "Inference pool started"
        );

        Ok(Self {
            runtime: Some(runtime),
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        })
    }

    pub async fn run<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (output, _lease) = self.run_leased(job).await?;
        Ok(output)
    }

    /// Like [`run`](Self::run), but hands the permit back to the caller
    /// instead of releasing it when the job completes.
    pub async fn run_leased<F, T>(&self, job: F) -> Result<(T, PoolLease), PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = self.runtime.as_ref().ok_or(PoolError::Closed)?;
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        // Held by the task until the job finishes, even if the caller goes away.
        let handle = runtime.spawn(async move {
            let output = job.await;
            (output, permit)
        });

        let (output, permit) = handle
            .await
            .map_err(|e| PoolError::JobFailed(e.to_string()))?;

        Ok((output, PoolLease { _permit: permit }))
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Drop for InferencePool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
