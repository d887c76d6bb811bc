//! CSV/YAML file-based implementation of the record store.

pub mod connection;
pub mod kid_repository;
pub mod session_repository;
pub mod state_repository;

pub use connection::CsvConnection;
pub use kid_repository::KidRepository;
pub use session_repository::SessionRepository;
pub use state_repository::RotationStateRepository;
