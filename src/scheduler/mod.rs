//! Cron-driven crawl cycles
//!
//! One tokio-cron-scheduler job calls `CrawlOrchestrator::run_cycle` on every
//! tick. Overlapping ticks are dropped: if the previous cycle still holds the
//! run guard when the next tick fires, that tick is logged and skipped.
//!
//! ```text
//! JobScheduler (cron)
//!     │
//!     └─► run_guarded()
//!             ├─► guard busy → skip tick
//!             └─► run_cycle() → CycleReport
//! ```

use crate::config::ScheduleConfig;
use crate::crawler::{ContentHasher, CrawlOrchestrator, CycleReport, Fetcher, Sha256Hasher};
use crate::index::Indexer;
use crate::storage::{ArticleStore, PageStore, StorageResult};
use crate::SpiderError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Runs crawl cycles on a cron schedule, one at a time
pub struct CycleScheduler<S, F, I, H = Sha256Hasher> {
    orchestrator: Arc<CrawlOrchestrator<S, F, I, H>>,
    schedule: ScheduleConfig,
    running: Arc<Mutex<()>>,
}

impl<S, F, I, H> CycleScheduler<S, F, I, H>
where
    S: ArticleStore + PageStore + Send + 'static,
    F: Fetcher + Send + Sync + 'static,
    I: Indexer + Send + 'static,
    H: ContentHasher + Send + Sync + 'static,
{
    pub fn new(orchestrator: Arc<CrawlOrchestrator<S, F, I, H>>, schedule: ScheduleConfig) -> Self {
        Self {
            orchestrator,
            schedule,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Runs one cycle now unless a cycle is already in flight
    ///
    /// Returns `Ok(None)` when the cycle was skipped.
    pub async fn run_now(&self) -> StorageResult<Option<CycleReport>> {
        run_guarded(&self.orchestrator, &self.running).await
    }

    /// Registers the cron job and starts the scheduler
    pub async fn start(&self) -> Result<JobScheduler, SpiderError> {
        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

        let orchestrator = Arc::clone(&self.orchestrator);
        let running = Arc::clone(&self.running);
        let job = Job::new_async(self.schedule.cron.as_str(), move |_uuid, _lock| {
            let orchestrator = Arc::clone(&orchestrator);
            let running = Arc::clone(&running);
            Box::pin(async move {
                log_cycle(run_guarded(&orchestrator, &running).await);
            })
        })
        .map_err(scheduler_error)?;

        scheduler.add(job).await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;

        tracing::info!("Crawl scheduler started ({})", self.schedule.cron);
        Ok(scheduler)
    }

    /// Starts the scheduler and blocks until Ctrl-C
    pub async fn run_until_shutdown(&self) -> Result<(), SpiderError> {
        let mut scheduler = self.start().await?;

        if self.schedule.run_on_start {
            let orchestrator = Arc::clone(&self.orchestrator);
            let running = Arc::clone(&self.running);
            tokio::spawn(async move {
                log_cycle(run_guarded(&orchestrator, &running).await);
            });
        }

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown requested, stopping scheduler");

        // An in-flight cycle is abandoned here; its seed is recovered on next start
        scheduler.shutdown().await.map_err(scheduler_error)?;
        Ok(())
    }
}

async fn run_guarded<S, F, I, H>(
    orchestrator: &CrawlOrchestrator<S, F, I, H>,
    running: &Mutex<()>,
) -> StorageResult<Option<CycleReport>>
where
    S: ArticleStore + PageStore,
    F: Fetcher,
    I: Indexer,
    H: ContentHasher,
{
    let Ok(_guard) = running.try_lock() else {
        tracing::warn!("Previous crawl cycle is still running, skipping this tick");
        return Ok(None);
    };

    orchestrator.run_cycle().await.map(Some)
}

fn log_cycle(result: StorageResult<Option<CycleReport>>) {
    match result {
        Ok(Some(report)) if report.is_empty() => {
            tracing::info!("Crawl cycle found no eligible seeds");
        }
        Ok(Some(report)) => {
            tracing::info!(
                "Scheduled cycle done: {} crawled, {} failed, {} pages",
                report.crawled(),
                report.failed(),
                report.pages_saved()
            );
        }
        Ok(None) => {}
        Err(e) => tracing::error!("Crawl cycle failed: {}", e),
    }
}

fn scheduler_error(e: JobSchedulerError) -> SpiderError {
    SpiderError::Scheduler(format!("{:?}", e))
}
