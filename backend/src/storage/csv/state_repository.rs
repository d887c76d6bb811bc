//! # Rotation State Repository
//!
//! Stores the rotation singleton in a single YAML file
//! `rotation_state.yaml` at the root of the data directory.
//!
//! ## YAML Format
//!
//! ```yaml
//! rotation_index: 2
//! current_order:
//!   - "8d7f..."
//!   - "91aa..."
//! current_lucky_used: true
//! current_lucky_by_kid_id: "91aa..."
//! ```
//!
//! The in-progress fields are omitted entirely when no session is being
//! composed. Writes go through a temp file renamed into place.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::fs;

use shared::RotationState;

use super::connection::CsvConnection;
use crate::storage::events::StoreEvent;
use crate::storage::traits::RotationStateStorage;

/// YAML-file-backed rotation state singleton
#[derive(Clone)]
pub struct RotationStateRepository {
    connection: CsvConnection,
}

impl RotationStateRepository {
    /// Create a new rotation state repository
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn load_state(&self) -> Result<Option<RotationState>> {
        let state_path = self.connection.rotation_state_file_path();
        if !state_path.exists() {
            return Ok(None);
        }

        let yaml_content = fs::read_to_string(&state_path)
            .with_context(|| format!("Failed to read {}", state_path.display()))?;
        let state: RotationState = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse {}", state_path.display()))?;

        debug!("Loaded rotation state: index={}", state.rotation_index);
        Ok(Some(state))
    }

    fn save_state(&self, state: &RotationState) -> Result<()> {
        let state_path = self.connection.rotation_state_file_path();
        let temp_path = state_path.with_extension("tmp");

        fs::write(&temp_path, serde_yaml::to_string(state)?)?;
        fs::rename(&temp_path, &state_path)?;

        Ok(())
    }
}

#[async_trait]
impl RotationStateStorage for RotationStateRepository {
    async fn get_rotation_state(&self) -> Result<Option<RotationState>> {
        self.load_state()
    }

    async fn init_rotation_state(&self) -> Result<RotationState> {
        if let Some(existing) = self.load_state()? {
            debug!("Rotation state already initialized");
            return Ok(existing);
        }

        let state = RotationState::default();
        self.save_state(&state)?;
        info!("Initialized rotation state singleton");
        self.connection
            .events()
            .publish(StoreEvent::RotationStateChanged);
        Ok(state)
    }

    async fn update_rotation_state(&self, state: &RotationState) -> Result<()> {
        // Never fabricate the singleton: an absent record at update time
        // means initialization was skipped, which must surface
        if !self.connection.rotation_state_file_path().exists() {
            return Err(anyhow::anyhow!(
                "Rotation state has not been initialized; refusing to update"
            ));
        }

        self.save_state(state)?;
        debug!(
            "Updated rotation state: index={}, in_progress={}",
            state.rotation_index,
            state.current_order.is_some()
        );
        self.connection
            .events()
            .publish(StoreEvent::RotationStateChanged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RotationStateRepository) {
        let temp = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp.path()).unwrap();
        (temp, RotationStateRepository::new(connection))
    }

    #[tokio::test]
    async fn get_before_init_returns_none() {
        let (_temp, repo) = setup();
        assert!(repo.get_rotation_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn init_creates_defaults_and_is_idempotent() {
        let (_temp, repo) = setup();

        let state = repo.init_rotation_state().await.unwrap();
        assert_eq!(state, RotationState::default());

        // Mutate, then init again: the existing record must survive
        let mutated = RotationState {
            rotation_index: 3,
            ..RotationState::default()
        };
        repo.update_rotation_state(&mutated).await.unwrap();

        let state = repo.init_rotation_state().await.unwrap();
        assert_eq!(state.rotation_index, 3);
    }

    #[tokio::test]
    async fn update_without_init_fails() {
        let (_temp, repo) = setup();
        let result = repo.update_rotation_state(&RotationState::default()).await;
        assert!(result.is_err());
        assert!(repo.get_rotation_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_roundtrips_in_progress_fields() {
        let (_temp, repo) = setup();
        repo.init_rotation_state().await.unwrap();

        let state = RotationState {
            rotation_index: 1,
            current_order: Some(vec!["a".to_string(), "b".to_string()]),
            current_lucky_used: true,
            current_lucky_by_kid_id: Some("b".to_string()),
        };
        repo.update_rotation_state(&state).await.unwrap();

        let loaded = repo.get_rotation_state().await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn update_publishes_state_changed() {
        let (_temp, repo) = setup();
        repo.init_rotation_state().await.unwrap();

        let mut receiver = repo.connection.events().subscribe();
        repo.update_rotation_state(&RotationState::default())
            .await
            .unwrap();

        assert_eq!(
            receiver.recv().await.unwrap(),
            StoreEvent::RotationStateChanged
        );
    }
}
