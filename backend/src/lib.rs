//! # Bathtime Tracker Backend
//!
//! Contains all non-UI logic for the bathtime rotation tracker.
//!
//! This crate brings together:
//! - **Storage**: the durable record store (kids, sessions, and the
//!   rotation state singleton) with change notifications
//! - **Domain**: roster management, the rotation engine, session
//!   history, and statistics
//!
//! The backend is UI-agnostic: a presentation layer embeds [`Backend`],
//! calls the services, and re-renders whenever the store's event bus
//! reports a change. No network or CLI surface is exposed.

pub mod domain;
pub mod storage;

use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::Arc;

use domain::{KidService, RotationService, SessionService, StatsService};
use storage::csv::{CsvConnection, KidRepository, RotationStateRepository, SessionRepository};
use storage::events::StoreEvents;

/// The assembled application backend: one record store, one instance of
/// each domain service, and the store's change-notification bus.
#[derive(Clone)]
pub struct Backend {
    pub kid_service: KidService,
    pub rotation_service: RotationService,
    pub session_service: SessionService,
    pub stats_service: StatsService,
    events: StoreEvents,
}

impl Backend {
    /// Assemble the backend over a specific data directory and initialize
    /// the rotation state singleton, making mutations safe to call.
    pub async fn new<P: AsRef<Path>>(data_directory: P) -> Result<Self> {
        let connection = CsvConnection::new(data_directory)?;
        Self::from_connection(connection).await
    }

    /// Assemble the backend over the default data directory
    /// (~/Documents/Bathtime Tracker)
    pub async fn new_default() -> Result<Self> {
        let connection = CsvConnection::new_default()?;
        Self::from_connection(connection).await
    }

    async fn from_connection(connection: CsvConnection) -> Result<Self> {
        let events = connection.events().clone();

        let kid_repository = Arc::new(KidRepository::new(connection.clone()));
        let session_repository = Arc::new(SessionRepository::new(connection.clone()));
        let state_repository = Arc::new(RotationStateRepository::new(connection));

        let kid_service = KidService::new(kid_repository.clone());
        let rotation_service = RotationService::new(
            kid_repository.clone(),
            state_repository,
            session_repository.clone(),
        );
        let session_service = SessionService::new(session_repository.clone());
        let stats_service = StatsService::new(kid_repository, session_repository);

        // The singleton must exist before any mutation is reachable
        rotation_service.ensure_initialized().await?;

        info!("Backend initialized");

        Ok(Self {
            kid_service,
            rotation_service,
            session_service,
            stats_service,
            events,
        })
    }

    /// Subscribe to store change notifications. The presentation layer
    /// and statistics re-read on notification; values observed after an
    /// event are always fully committed.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<storage::StoreEvent> {
        self.events.subscribe()
    }
}
