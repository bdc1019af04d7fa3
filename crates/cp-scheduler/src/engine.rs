use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use cp_core::config::MissedPolicy;
use cp_core::error::AppError;
use cp_core::ids::{JobId, PostId, RunId, UserId};
use cp_runs::RunController;
use cp_storage::models::{CronJobRow, ScheduledPostRow};
use cp_storage::{CronJobRepository, CronJobRunRepository, ScheduledPostRepository};
use dashmap::DashSet;

use crate::cron_expr;

/// Workflow invoked for one-shot scheduled posts. Not user-configurable:
/// posting is the one action this engine knows how to synthesize.
const CONTENT_POST_WORKFLOW: &str = "content_post";

#[derive(Clone)]
pub struct SchedulerEngine {
    posts: ScheduledPostRepository,
    jobs: CronJobRepository,
    runs: CronJobRunRepository,
    controller: RunController,
    dispatching_posts: Arc<DashSet<PostId>>,
    dispatching_jobs: Arc<DashSet<JobId>>,
}

enum FireDecision {
    Fire,
    /// Backlog detected under `skip-missed`: advance past it without
    /// dispatching, so the job resumes at its next natural occurrence.
    FastForward,
    NotDue,
}

/// True once `due` is further behind `now` than one tick interval — the
/// shared staleness test behind both cron backlog detection and one-shot
/// post skip-missed handling.
fn is_stale(due: DateTime<Utc>, now: DateTime<Utc>, tick: Duration) -> bool {
    let staleness = now - due;
    let tick_window = chrono::Duration::from_std(tick).unwrap_or(chrono::Duration::zero());
    staleness > tick_window
}

fn decide_fire(
    schedule: &Schedule,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
    tick: Duration,
    policy: MissedPolicy,
) -> FireDecision {
    let Some(next) = cron_expr::next_fire_after(schedule, since) else {
        return FireDecision::NotDue;
    };
    if next > now {
        return FireDecision::NotDue;
    }
    match policy {
        MissedPolicy::FireOnce => FireDecision::Fire,
        MissedPolicy::SkipMissed => {
            if is_stale(next, now, tick) {
                FireDecision::FastForward
            } else {
                FireDecision::Fire
            }
        }
    }
}

impl SchedulerEngine {
    pub fn new(
        posts: ScheduledPostRepository,
        jobs: CronJobRepository,
        runs: CronJobRunRepository,
        controller: RunController,
    ) -> Self {
        Self {
            posts,
            jobs,
            runs,
            controller,
            dispatching_posts: Arc::new(DashSet::new()),
            dispatching_jobs: Arc::new(DashSet::new()),
        }
    }

    pub async fn add_post(
        &self,
        user_id: &UserId,
        content: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<ScheduledPostRow, AppError> {
        self.posts.insert(user_id, content, scheduled_at).await
    }

    pub async fn update_post(
        &self,
        post_id: PostId,
        content: Option<&str>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        self.posts
            .update_content_and_time(post_id, content, scheduled_at)
            .await
    }

    pub async fn cancel_post(&self, post_id: PostId) -> Result<(), AppError> {
        self.posts.set_status(post_id, "cancelled", None).await
    }

    pub async fn add_job(
        &self,
        user_id: &UserId,
        name: &str,
        workflow_name: &str,
        cron_expression: &str,
    ) -> Result<CronJobRow, AppError> {
        cron_expr::parse(cron_expression).map_err(AppError::BadRequest)?;
        self.jobs
            .insert(user_id, name, workflow_name, cron_expression)
            .await
    }

    pub async fn pause_job(&self, job_id: JobId) -> Result<(), AppError> {
        self.jobs.set_active(job_id, false).await
    }

    pub async fn resume_job(&self, job_id: JobId) -> Result<(), AppError> {
        self.jobs.set_active(job_id, true).await
    }

    /// Cascade-removes `CronJobRun`s via the foreign key's `ON DELETE CASCADE`.
    pub async fn delete_job(&self, job_id: JobId) -> Result<(), AppError> {
        self.jobs.delete(job_id).await
    }

    /// Owning user of a scheduled post, for ownership checks at the HTTP edge.
    pub async fn post_owner(&self, post_id: PostId) -> Result<Option<UserId>, AppError> {
        Ok(self.posts.get(post_id).await?.map(|r| r.user_id.into()))
    }

    /// Owning user of a cron job, for ownership checks at the HTTP edge.
    pub async fn job_owner(&self, job_id: JobId) -> Result<Option<UserId>, AppError> {
        Ok(self.jobs.get(job_id).await?.map(|r| r.user_id.into()))
    }

    pub async fn run_post_now(&self, post_id: PostId) -> Result<(), AppError> {
        let row = self
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("scheduled post not found".into()))?;
        self.dispatch_post(row).await
    }

    pub async fn run_job_now(&self, job_id: JobId) -> Result<(), AppError> {
        let row = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound("cron job not found".into()))?;
        self.dispatch_job(row).await
    }

    /// One clock-tick pass: dispatches every due post and cron job. Each
    /// dispatch runs in its own task so one user's failure can't delay
    /// another's fire, and the per-id dashset guard keeps a slow run from
    /// being picked up twice by an overlapping tick.
    pub async fn tick(&self, tick_interval: Duration, missed_policy: MissedPolicy) -> Result<(), AppError> {
        let now = Utc::now();

        for post in self.posts.list_scheduled().await? {
            if post.scheduled_at > now {
                continue;
            }

            if missed_policy == MissedPolicy::SkipMissed && is_stale(post.scheduled_at, now, tick_interval) {
                let post_id = PostId::from(post.post_id);
                tracing::info!(%post_id, "skipping missed scheduled post, past tolerance window");
                if let Err(err) = self
                    .posts
                    .set_status(post_id, "skipped", Some("missed fire window elapsed"))
                    .await
                {
                    tracing::warn!(%post_id, error = %err, "failed to mark missed post as skipped");
                }
                continue;
            }

            let engine = self.clone();
            tokio::spawn(async move {
                if let Err(err) = engine.dispatch_post(post).await {
                    tracing::warn!(error = %err, "scheduled post dispatch failed");
                }
            });
        }

        for job in self.jobs.list_active().await? {
            let schedule = match cron_expr::parse(&job.cron_expression) {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(job_id = job.job_id, error = %err, "invalid cron expression, skipping");
                    continue;
                }
            };
            let since = job.last_run_at.unwrap_or(job.created_at);

            match decide_fire(&schedule, since, now, tick_interval, missed_policy) {
                FireDecision::Fire => {
                    let engine = self.clone();
                    tokio::spawn(async move {
                        if let Err(err) = engine.dispatch_job(job).await {
                            tracing::warn!(error = %err, "cron job dispatch failed");
                        }
                    });
                }
                FireDecision::FastForward => {
                    let job_id = JobId::from(job.job_id);
                    tracing::info!(%job_id, "skipping missed cron fires, resuming at next occurrence");
                    if let Err(err) = self.jobs.set_last_run_at(job_id, now).await {
                        tracing::warn!(%job_id, error = %err, "failed to fast-forward missed cron job");
                    }
                }
                FireDecision::NotDue => {}
            }
        }

        Ok(())
    }

    async fn dispatch_post(&self, row: ScheduledPostRow) -> Result<(), AppError> {
        let post_id = PostId::from(row.post_id);
        if !self.dispatching_posts.insert(post_id) {
            return Ok(());
        }
        let result = self.fire_post(&row).await;
        self.dispatching_posts.remove(&post_id);
        result
    }

    async fn fire_post(&self, row: &ScheduledPostRow) -> Result<(), AppError> {
        let post_id = PostId::from(row.post_id);
        let user_id: UserId = row.user_id.clone().into();
        self.posts.set_status(post_id, "publishing", None).await?;

        let input = serde_json::json!({ "user_id": user_id.as_str(), "content": row.content });
        let outcome = self
            .controller
            .run_to_completion(&user_id, CONTENT_POST_WORKFLOW, input, |_thread_id| async {})
            .await;

        match outcome {
            Ok(()) => self.posts.set_status(post_id, "published", None).await,
            Err(err) => {
                self.posts
                    .set_status(post_id, "failed", Some(&err.to_string()))
                    .await?;
                Err(err)
            }
        }
    }

    async fn dispatch_job(&self, row: CronJobRow) -> Result<(), AppError> {
        let job_id = JobId::from(row.job_id);
        if !self.dispatching_jobs.insert(job_id) {
            return Ok(());
        }
        let result = self.fire_job(&row).await;
        self.dispatching_jobs.remove(&job_id);
        result
    }

    async fn fire_job(&self, row: &CronJobRow) -> Result<(), AppError> {
        let job_id = JobId::from(row.job_id);
        let user_id: UserId = row.user_id.clone().into();
        let run_id = RunId::new();

        self.runs.insert_queued(run_id, job_id).await?;

        let input = serde_json::json!({
            "user_id": user_id.as_str(),
            "cron_job_id": job_id.as_i64(),
        });
        let runs = self.runs.clone();
        let outcome = self
            .controller
            .run_to_completion(&user_id, &row.workflow_name, input, move |thread_id| {
                let runs = runs.clone();
                async move {
                    if let Err(err) = runs.mark_running(run_id, thread_id).await {
                        tracing::warn!(%run_id, error = %err, "failed to record cron run as running");
                    }
                }
            })
            .await;

        let (status, error_message) = match &outcome {
            Ok(()) => ("success", None),
            Err(err) => ("failed", Some(err.to_string())),
        };
        self.runs
            .complete(run_id, status, error_message.as_deref())
            .await?;
        self.jobs.set_last_run_at(job_id, Utc::now()).await?;

        outcome
    }

    /// Logs the backlog picked up from storage at startup. Timers are not
    /// armed individually; the tick loop re-evaluates due rows every pass,
    /// so reconciliation here is purely observational.
    pub async fn reconcile_on_startup(&self) -> Result<(), AppError> {
        let posts = self.posts.list_scheduled().await?.len();
        let jobs = self.jobs.list_active().await?.len();
        tracing::info!(posts, jobs, "scheduler reconciled persisted rows at startup");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn fires_when_due_within_tick_window() {
        let schedule = cron_expr::parse("*/5 * * * *").unwrap();
        let since = dt(2024, 1, 1, 0, 0);
        let now = dt(2024, 1, 1, 0, 5);
        let decision = decide_fire(&schedule, since, now, Duration::from_secs(5), MissedPolicy::SkipMissed);
        assert!(matches!(decision, FireDecision::Fire));
    }

    #[test]
    fn fast_forwards_long_backlog_under_skip_missed() {
        let schedule = cron_expr::parse("*/5 * * * *").unwrap();
        let since = dt(2024, 1, 1, 0, 0);
        let now = dt(2024, 1, 2, 0, 0);
        let decision = decide_fire(&schedule, since, now, Duration::from_secs(5), MissedPolicy::SkipMissed);
        assert!(matches!(decision, FireDecision::FastForward));
    }

    #[test]
    fn fires_regardless_of_backlog_under_fire_once() {
        let schedule = cron_expr::parse("*/5 * * * *").unwrap();
        let since = dt(2024, 1, 1, 0, 0);
        let now = dt(2024, 1, 2, 0, 0);
        let decision = decide_fire(&schedule, since, now, Duration::from_secs(5), MissedPolicy::FireOnce);
        assert!(matches!(decision, FireDecision::Fire));
    }

    #[test]
    fn not_due_before_next_fire() {
        let schedule = cron_expr::parse("0 0 * * *").unwrap();
        let since = dt(2024, 1, 1, 0, 0);
        let now = dt(2024, 1, 1, 12, 0);
        let decision = decide_fire(&schedule, since, now, Duration::from_secs(5), MissedPolicy::SkipMissed);
        assert!(matches!(decision, FireDecision::NotDue));
    }

    #[test]
    fn is_stale_past_tick_window_only() {
        let due = dt(2024, 1, 1, 0, 0);
        assert!(!is_stale(due, due, Duration::from_secs(5)));
        assert!(is_stale(due, dt(2024, 1, 1, 0, 10), Duration::from_secs(5)));
    }
}
