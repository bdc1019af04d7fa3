use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cp_core::error::AppError;
use cp_core::ids::{SessionId, UserId};
use cp_credentials::CredentialStore;
use cp_storage::SessionRepository;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::runtime::RuntimeAllocator;
use crate::session::{Session, SessionStatus};
use crate::warmup::retry_during_warmup;

/// Per-user session allocation, reuse, and termination. Concurrent
/// `get_or_create` calls for the same user rendezvous on a per-user mutex
/// so only one caller actually allocates a runtime instance.
#[derive(Clone)]
pub struct SessionManager {
    repo: SessionRepository,
    credentials: CredentialStore,
    allocator: Arc<dyn RuntimeAllocator>,
    locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
    idle_ttl: Duration,
    warmup_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        repo: SessionRepository,
        credentials: CredentialStore,
        allocator: Arc<dyn RuntimeAllocator>,
        idle_ttl: Duration,
        warmup_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            credentials,
            allocator,
            locks: Arc::new(DashMap::new()),
            idle_ttl,
            warmup_timeout,
        }
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn is_expired(&self, session: &Session) -> bool {
        let deadline = session.touched_at
            + chrono::Duration::from_std(self.idle_ttl).unwrap_or(chrono::Duration::zero());
        Utc::now() > deadline
    }

    /// Returns the user's live session, reusing it if present and within
    /// TTL, otherwise allocating a fresh runtime instance and injecting
    /// stored credentials before recording the new session.
    pub async fn get_or_create(&self, user_id: &UserId) -> Result<Session, AppError> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        if let Some(row) = self.repo.get_by_user(user_id).await? {
            let session = Session::from_row(row);
            if session.status.is_live() && !self.is_expired(&session) {
                return Ok(session);
            }
        }

        let cookies = self
            .credentials
            .get(user_id)
            .await?
            .ok_or(AppError::NoCredentials)?;

        let (job_handle, endpoint) = self.allocator.allocate(user_id, &cookies).await?;

        let session_id = SessionId::new();
        if let Err(err) = self
            .repo
            .insert(session_id, user_id, &endpoint, job_handle)
            .await
        {
            if let Err(cleanup_err) = self.allocator.terminate(job_handle).await {
                tracing::warn!(%user_id, error = %cleanup_err, "failed to tear down orphaned runtime instance");
            }
            return Err(err);
        }

        let status = self.wait_for_warmup(session_id, &endpoint).await;

        let now = Utc::now();
        Ok(Session {
            session_id,
            user_id: user_id.clone(),
            endpoint,
            status,
            job_handle,
            created_at: now,
            touched_at: now,
        })
    }

    /// Polls the freshly allocated instance until it accepts traffic and
    /// flips the stored status to `running`. Falls back to leaving the
    /// session `starting` if the warmup budget elapses first — the caller
    /// still gets an endpoint back, just not a confirmed-live one.
    async fn wait_for_warmup(&self, session_id: SessionId, endpoint: &str) -> SessionStatus {
        let allocator = self.allocator.clone();
        let endpoint = endpoint.to_string();
        let probed = retry_during_warmup(self.warmup_timeout, move || {
            let allocator = allocator.clone();
            let endpoint = endpoint.clone();
            async move {
                allocator
                    .probe(&endpoint)
                    .await
                    .map_err(|e| AppError::Upstream(e.to_string()))
            }
        })
        .await;

        match probed {
            Ok(()) => match self.mark_running(session_id).await {
                Ok(()) => SessionStatus::Running,
                Err(err) => {
                    tracing::warn!(%session_id, error = %err, "session warmed up but status update failed");
                    SessionStatus::Starting
                }
            },
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "session did not warm up within budget");
                SessionStatus::Starting
            }
        }
    }

    pub async fn touch(&self, session_id: SessionId) -> Result<(), AppError> {
        self.repo.touch(session_id).await
    }

    /// Owning user of a session, for callers that only have a `SessionId`
    /// and must check it against the authenticated caller.
    pub async fn owner(&self, session_id: SessionId) -> Result<Option<UserId>, AppError> {
        Ok(self.repo.get(session_id).await?.map(|r| r.user_id.into()))
    }

    pub async fn list(&self, user_id: &UserId) -> Result<Option<Session>, AppError> {
        Ok(self.repo.get_by_user(user_id).await?.map(Session::from_row))
    }

    pub async fn mark_running(&self, session_id: SessionId) -> Result<(), AppError> {
        self.repo
            .set_status(session_id, SessionStatus::Running.as_str())
            .await
    }

    pub async fn terminate(&self, session_id: SessionId) -> Result<(), AppError> {
        let Some(row) = self.repo.get(session_id).await? else {
            return Ok(());
        };
        let session = Session::from_row(row);

        self.allocator.terminate(session.job_handle).await?;
        self.repo
            .set_status(session_id, SessionStatus::Stopped.as_str())
            .await?;
        self.repo.delete(session_id).await
    }

    /// One reaper sweep: terminates every session past its idle TTL. Each
    /// session's failure is isolated so one bad teardown does not stop the
    /// sweep from reaching the rest.
    pub async fn reap_expired(&self) -> Result<usize, AppError> {
        let idle_ttl_secs = self.idle_ttl.as_secs() as i64;
        let expired = self.repo.list_expired(idle_ttl_secs).await?;
        let mut reaped = 0;
        for row in expired {
            let session_id = SessionId::from(row.session_id);
            let user_id: UserId = row.user_id.clone().into();
            match self.terminate(session_id).await {
                Ok(()) => reaped += 1,
                Err(err) => {
                    tracing::warn!(%user_id, %session_id, error = %err, "failed to reap expired session")
                }
            }
        }
        Ok(reaped)
    }
}
