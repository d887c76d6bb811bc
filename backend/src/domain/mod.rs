//! # Domain Module
//!
//! Business logic for the bathtime tracker: roster management, the
//! rotation engine (a pure core in [`rotation`] wrapped by the
//! persistence adapter in [`rotation_service`]), session history, and
//! statistics aggregation.

pub mod kid_service;
pub mod rotation;
pub mod rotation_service;
pub mod session_service;
pub mod stats_service;

pub use kid_service::KidService;
pub use rotation_service::{RotationError, RotationService};
pub use session_service::SessionService;
pub use stats_service::StatsService;
