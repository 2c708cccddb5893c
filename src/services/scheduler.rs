use chrono::{Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::Config;
use crate::database::DatabaseManager;
use crate::services::dispatcher::{DispatchSummary, TaskDispatcher};
use crate::services::notifier::Notifier;
use crate::services::{maintenance, motivation, reports};

type JobResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Everything the recurring jobs need, cheap to clone into each job.
#[derive(Clone)]
struct Jobs {
    db: Arc<DatabaseManager>,
    notifier: Arc<dyn Notifier>,
    dispatcher: TaskDispatcher,
    timezone: Tz,
    camp_report_hour: u32,
}

impl Jobs {
    async fn every_minute(&self) -> JobResult<DispatchSummary> {
        Ok(self.dispatcher.dispatch_due(Utc::now()).await?)
    }

    /// Runs the three hourly jobs independently. Returns how many of them failed.
    async fn every_hour(&self) -> usize {
        let now = Utc::now();
        let mut failures = 0;

        match motivation::send_motivation_round(&self.db, &self.notifier, self.timezone, now).await {
            Ok(quotes) => tracing::debug!(quotes, "Motivation round finished"),
            Err(e) => {
                tracing::error!("Motivation round failed: {}", e);
                failures += 1;
            }
        }

        match reports::send_due_camp_reports(&self.db, &self.notifier, self.timezone, self.camp_report_hour, now).await {
            Ok(reports) => tracing::debug!(reports, "Camp reports finished"),
            Err(e) => {
                tracing::error!("Camp reports failed: {}", e);
                failures += 1;
            }
        }

        if let Err(e) = maintenance::run_daily_maintenance(&self.db, self.timezone, now).await {
            tracing::error!("Daily maintenance failed: {}", e);
            failures += 1;
        }

        failures
    }
}

/// Drives the dispatcher every minute and the housekeeping jobs every hour.
pub struct SchedulerService {
    jobs: Jobs,
    scheduler: JobScheduler,
}

impl SchedulerService {
    pub async fn new(
        db: Arc<DatabaseManager>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> JobResult<Self> {
        let scheduler = JobScheduler::new().await?;
        let dispatcher = TaskDispatcher::new(
            db.clone(),
            notifier.clone(),
            Duration::minutes(config.task_grace_minutes),
            config.timezone,
        );

        Ok(Self {
            jobs: Jobs {
                db,
                notifier,
                dispatcher,
                timezone: config.timezone,
                camp_report_hour: config.camp_report_hour,
            },
            scheduler,
        })
    }

    pub async fn start(&mut self) -> JobResult<()> {
        let jobs = self.jobs.clone();
        let dispatch_job = Job::new_async("0 * * * * *", move |_uuid, _l| {
            let jobs = jobs.clone();
            Box::pin(async move {
                if let Err(e) = jobs.every_minute().await {
                    tracing::error!("Dispatch tick failed: {}", e);
                }
            })
        })?;

        let jobs = self.jobs.clone();
        let hourly_job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let jobs = jobs.clone();
            Box::pin(async move {
                let failures = jobs.every_hour().await;
                if failures > 0 {
                    tracing::warn!(failures, "Hourly jobs finished with errors");
                }
            })
        })?;

        self.scheduler.add(dispatch_job).await?;
        self.scheduler.add(hourly_job).await?;
        self.scheduler.start().await?;

        tracing::info!("Scheduler started - dispatching every minute, housekeeping hourly");
        Ok(())
    }

    pub async fn stop(&mut self) -> JobResult<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Runs one dispatch tick immediately, outside the cron schedule.
    pub async fn run_tick_now(&self) -> JobResult<DispatchSummary> {
        self.jobs.every_minute().await
    }

    /// Runs the hourly jobs immediately. Returns how many of them failed.
    pub async fn run_hourly_now(&self) -> usize {
        self.jobs.every_hour().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifier::MockNotifier;
    use tempfile::TempDir;

    fn config() -> Config {
        Config {
            telegram_bot_token: "0:test".to_string(),
            database_url: String::new(),
            http_port: 0,
            timezone: chrono_tz::Asia::Riyadh,
            task_grace_minutes: 15,
            admin_ids: Vec::new(),
            camp_report_hour: 23,
        }
    }

    #[tokio::test]
    async fn test_manual_runs_on_empty_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_url = format!("sqlite:{}", temp_dir.path().join("jobs.db").display());
        let db = DatabaseManager::new(&db_url).await.unwrap();
        db.run_migrations().await.unwrap();

        let notifier: Arc<dyn Notifier> = Arc::new(MockNotifier::new());
        let service = SchedulerService::new(Arc::new(db), notifier, &config()).await.unwrap();

        assert_eq!(service.run_tick_now().await.unwrap(), DispatchSummary::default());
        assert_eq!(service.run_hourly_now().await, 0);
    }

    #[tokio::test]
    async fn test_maintenance_runs_when_motivation_fails() {
        let temp_dir = TempDir::new().unwrap();
        let db_url = format!("sqlite:{}", temp_dir.path().join("jobs.db").display());
        let db = DatabaseManager::new(&db_url).await.unwrap();
        db.run_migrations().await.unwrap();
        sqlx::query("ALTER TABLE groups RENAME TO groups_moved").execute(&db.pool).await.unwrap();

        let db = Arc::new(db);
        let notifier: Arc<dyn Notifier> = Arc::new(MockNotifier::new());
        let service = SchedulerService::new(db.clone(), notifier, &config()).await.unwrap();

        assert_eq!(service.run_hourly_now().await, 1);
        let marker = crate::database::models::SystemStat::get(&db.pool, crate::database::models::STAT_LAST_MAINTENANCE_DATE)
            .await
            .unwrap();
        assert!(marker.is_some());
    }
}
