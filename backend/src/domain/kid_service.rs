use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;

use shared::{CreateKidRequest, Kid, KidListResponse, KidResponse, UpdateKidRequest};

use crate::storage::traits::KidStorage;

/// Service for managing the kid roster.
///
/// The rotation engine reads the roster through storage but never writes
/// it; all roster mutations go through this service.
#[derive(Clone)]
pub struct KidService {
    storage: Arc<dyn KidStorage>,
}

impl KidService {
    /// Create a new KidService
    pub fn new(storage: Arc<dyn KidStorage>) -> Self {
        Self { storage }
    }

    /// Create a new kid
    pub async fn create_kid(&self, request: CreateKidRequest) -> Result<KidResponse> {
        info!("Creating kid: name={}", request.name);

        Self::validate_name(&request.name)?;

        let kid = Kid {
            id: Kid::generate_id(),
            name: request.name.trim().to_string(),
            avatar: request.avatar,
            created_at: Utc::now().to_rfc3339(),
        };

        self.storage.store_kid(&kid).await?;

        info!("Created kid: {} with ID: {}", kid.name, kid.id);

        Ok(KidResponse {
            kid,
            success_message: "Kid added to the team".to_string(),
        })
    }

    /// Get a kid by ID
    pub async fn get_kid(&self, kid_id: &str) -> Result<Option<Kid>> {
        let kid = self.storage.get_kid(kid_id).await?;
        if kid.is_none() {
            warn!("Kid not found: {}", kid_id);
        }
        Ok(kid)
    }

    /// List the roster, ordered by creation time ascending
    pub async fn list_kids(&self) -> Result<KidListResponse> {
        let kids = self.storage.list_kids().await?;
        info!("Found {} kids", kids.len());
        Ok(KidListResponse { kids })
    }

    /// Update an existing kid's name and/or avatar
    pub async fn update_kid(&self, kid_id: &str, request: UpdateKidRequest) -> Result<KidResponse> {
        info!("Updating kid: {}", kid_id);

        let mut kid = self
            .storage
            .get_kid(kid_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Kid not found: {}", kid_id))?;

        if let Some(name) = request.name {
            Self::validate_name(&name)?;
            kid.name = name.trim().to_string();
        }
        if let Some(avatar) = request.avatar {
            kid.avatar = Some(avatar);
        }

        self.storage.update_kid(&kid).await?;

        info!("Updated kid: {} with ID: {}", kid.name, kid.id);

        Ok(KidResponse {
            kid,
            success_message: "Kid updated successfully".to_string(),
        })
    }

    /// Delete a kid. Historical sessions keep the kid's ID; they are not
    /// rewritten.
    pub async fn delete_kid(&self, kid_id: &str) -> Result<()> {
        info!("Deleting kid: {}", kid_id);

        let deleted = self.storage.delete_kid(kid_id).await?;
        if !deleted {
            return Err(anyhow::anyhow!("Kid not found: {}", kid_id));
        }

        info!("Deleted kid: {}", kid_id);
        Ok(())
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow::anyhow!("Kid name cannot be empty"));
        }
        if name.len() > 100 {
            return Err(anyhow::anyhow!("Kid name cannot exceed 100 characters"));
        }
        Ok(())
    }
}
