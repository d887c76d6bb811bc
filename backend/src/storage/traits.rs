//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use async_trait::async_trait;
use shared::{Kid, RotationState, Session};

/// Trait defining the interface for kid (roster) storage operations
///
/// The rotation engine only ever reads the roster; writes come from the
/// kid CRUD workflow.
#[async_trait]
pub trait KidStorage: Send + Sync {
    /// Store a new kid
    async fn store_kid(&self, kid: &Kid) -> Result<()>;

    /// Retrieve a specific kid by ID
    async fn get_kid(&self, kid_id: &str) -> Result<Option<Kid>>;

    /// List all kids ordered by creation timestamp ascending
    async fn list_kids(&self) -> Result<Vec<Kid>>;

    /// Update an existing kid
    async fn update_kid(&self, kid: &Kid) -> Result<()>;

    /// Delete a kid by ID
    /// Returns true if the kid was found and deleted, false otherwise.
    /// Historical sessions referencing the kid are left untouched.
    async fn delete_kid(&self, kid_id: &str) -> Result<bool>;
}

/// Trait defining the interface for session history storage
///
/// Session records are append-only: there is intentionally no update or
/// delete operation.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Append a new immutable session record
    /// Fails if a session with the same ID already exists.
    async fn append_session(&self, session: &Session) -> Result<()>;

    /// List all sessions ordered by timestamp ascending
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Count of stored sessions
    async fn session_count(&self) -> Result<u32>;
}

/// Trait defining the interface for the rotation state singleton
#[async_trait]
pub trait RotationStateStorage: Send + Sync {
    /// Read the rotation state, or None if it has never been initialized
    async fn get_rotation_state(&self) -> Result<Option<RotationState>>;

    /// Create the singleton with default values if it does not exist yet,
    /// returning the stored state either way
    async fn init_rotation_state(&self) -> Result<RotationState>;

    /// Overwrite the singleton with a new value
    ///
    /// Fails if the singleton has not been initialized; this method never
    /// fabricates the record, since a missing singleton at mutation time
    /// is an initialization invariant violation.
    async fn update_rotation_state(&self, state: &RotationState) -> Result<()>;
}
