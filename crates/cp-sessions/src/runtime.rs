use async_trait::async_trait;
use cp_core::ids::{JobHandle, UserId};
use cp_credentials::CookieSet;

/// The isolated browser-instance allocator, an external collaborator.
/// Implementations own how an instance is actually provisioned (container,
/// VM, remote browser farm); the Session Manager only needs the handle and
/// the endpoint it returns.
#[async_trait]
pub trait RuntimeAllocator: Send + Sync {
    /// Starts a fresh instance for `user_id` and injects `cookies` before
    /// any user-visible navigation happens. Returns the instance's
    /// `JobHandle` and an externally reachable endpoint URL.
    async fn allocate(
        &self,
        user_id: &UserId,
        cookies: &CookieSet,
    ) -> Result<(JobHandle, String), AllocationError>;

    /// Tears down a previously allocated instance. Idempotent: tearing down
    /// an already-gone handle is not an error.
    async fn terminate(&self, job_handle: JobHandle) -> Result<(), AllocationError>;

    /// Checks whether `endpoint` is accepting traffic yet. Called
    /// repeatedly during warmup for a freshly allocated instance; a freshly
    /// returned endpoint is not assumed reachable until this succeeds.
    async fn probe(&self, endpoint: &str) -> Result<(), AllocationError>;
}

#[derive(Debug)]
pub struct AllocationError(pub String);

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime allocator error: {}", self.0)
    }
}

impl std::error::Error for AllocationError {}
