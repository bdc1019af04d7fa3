use async_trait::async_trait;
use cp_core::ids::{JobHandle, UserId};
use cp_credentials::CookieSet;
use cp_sessions::{AllocationError, RuntimeAllocator};
use reqwest::Client;
use serde::Deserialize;

/// Talks to the browser-instance farm over HTTP. The farm itself (how an
/// instance is provisioned, what automation primitives it exposes) is out
/// of scope here; this is just the allocate/terminate client.
#[derive(Clone)]
pub struct HttpRuntimeAllocator {
    client: Client,
    base_url: String,
}

impl HttpRuntimeAllocator {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct AllocateResponse {
    job_handle: uuid::Uuid,
    endpoint: String,
}

#[async_trait]
impl RuntimeAllocator for HttpRuntimeAllocator {
    async fn allocate(
        &self,
        user_id: &UserId,
        cookies: &CookieSet,
    ) -> Result<(JobHandle, String), AllocationError> {
        let resp = self
            .client
            .post(format!("{}/instances", self.base_url))
            .json(&serde_json::json!({ "user_id": user_id.as_str(), "cookies": cookies }))
            .send()
            .await
            .map_err(|e| AllocationError(e.to_string()))?
            .error_for_status()
            .map_err(|e| AllocationError(e.to_string()))?
            .json::<AllocateResponse>()
            .await
            .map_err(|e| AllocationError(e.to_string()))?;

        Ok((JobHandle::from(resp.job_handle), resp.endpoint))
    }

    async fn terminate(&self, job_handle: JobHandle) -> Result<(), AllocationError> {
        self.client
            .delete(format!("{}/instances/{}", self.base_url, job_handle.as_uuid()))
            .send()
            .await
            .map_err(|e| AllocationError(e.to_string()))?;
        Ok(())
    }

    async fn probe(&self, endpoint: &str) -> Result<(), AllocationError> {
        self.client
            .get(format!("{endpoint}/health"))
            .send()
            .await
            .map_err(|e| AllocationError(e.to_string()))?
            .error_for_status()
            .map_err(|e| AllocationError(e.to_string()))?;
        Ok(())
    }
}
