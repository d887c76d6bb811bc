use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::events::StoreEvents;

/// CsvConnection manages the data directory layout and hosts the shared
/// change-notification bus.
///
/// Layout:
/// ```text
/// data/
/// ├── rotation_state.yaml
/// ├── sessions.csv
/// └── kids/
///     └── {kid_dir}/
///         ├── kid.yaml
///         └── avatar.png
/// ```
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
    events: StoreEvents,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
            events: StoreEvents::new(),
        })
    }

    /// Create a new CSV connection in the default data directory,
    /// ~/Documents/Bathtime Tracker
    pub fn new_default() -> Result<Self> {
        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;

        let data_dir = PathBuf::from(home_dir)
            .join("Documents")
            .join("Bathtime Tracker");

        Self::new(data_dir)
    }

    /// The base data directory
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Handle to the store's change-notification bus
    pub fn events(&self) -> &StoreEvents {
        &self.events
    }

    /// Directory containing one subdirectory per kid
    pub fn kids_directory(&self) -> PathBuf {
        self.base_directory.join("kids")
    }

    /// Directory for a specific kid
    pub fn kid_directory(&self, directory_name: &str) -> PathBuf {
        self.kids_directory().join(directory_name)
    }

    /// Path to the session history file
    pub fn sessions_file_path(&self) -> PathBuf {
        self.base_directory.join("sessions.csv")
    }

    /// Path to the rotation state singleton file
    pub fn rotation_state_file_path(&self) -> PathBuf {
        self.base_directory.join("rotation_state.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_creates_base_directory() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("nested").join("data");
        assert!(!base.exists());

        let connection = CsvConnection::new(&base).unwrap();
        assert!(base.exists());
        assert_eq!(connection.base_directory(), base.as_path());
    }

    #[test]
    fn paths_are_rooted_in_base_directory() {
        let temp = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp.path()).unwrap();

        assert_eq!(
            connection.sessions_file_path(),
            temp.path().join("sessions.csv")
        );
        assert_eq!(
            connection.rotation_state_file_path(),
            temp.path().join("rotation_state.yaml")
        );
        assert_eq!(
            connection.kid_directory("emma"),
            temp.path().join("kids").join("emma")
        );
    }
}
