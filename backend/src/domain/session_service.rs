use anyhow::Result;
use log::info;
use std::sync::Arc;

use shared::SessionListResponse;

use crate::storage::traits::SessionStorage;

/// Read-only access to the session history. Sessions are append-only and
/// are written exclusively by the rotation engine on commit; no mutation
/// or deletion API exists.
#[derive(Clone)]
pub struct SessionService {
    storage: Arc<dyn SessionStorage>,
}

impl SessionService {
    /// Create a new SessionService
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// List all sessions, oldest first
    pub async fn list_sessions(&self) -> Result<SessionListResponse> {
        let sessions = self.storage.list_sessions().await?;
        info!("Found {} sessions", sessions.len());
        Ok(SessionListResponse { sessions })
    }

    /// Number of completed sessions
    pub async fn session_count(&self) -> Result<u32> {
        self.storage.session_count().await
    }
}
