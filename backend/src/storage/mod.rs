//! # Storage Module
//!
//! Durable record store for the three collections: kids (roster),
//! sessions (append-only history), and the rotation state singleton.
//! The domain layer talks to the traits in [`traits`]; the concrete
//! backend is file-based (CSV for history, YAML for metadata and the
//! singleton). Every committed write publishes on the change bus in
//! [`events`].

pub mod csv;
pub mod events;
pub mod traits;

pub use csv::{CsvConnection, KidRepository, RotationStateRepository, SessionRepository};
pub use events::{StoreEvent, StoreEvents};
pub use traits::{KidStorage, RotationStateStorage, SessionStorage};
