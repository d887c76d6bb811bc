use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use shared::Kid;

use super::connection::CsvConnection;
use crate::storage::events::StoreEvent;
use crate::storage::traits::KidStorage;

const KID_YAML_FILE: &str = "kid.yaml";
const AVATAR_FILE: &str = "avatar.png";

/// On-disk kid metadata. The avatar is kept as a sibling binary file
/// rather than embedded in the YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KidRecord {
    id: String,
    name: String,
    created_at: String,
}

/// CSV/YAML-based kid repository using filesystem discovery: each kid
/// lives in its own directory under `kids/`.
#[derive(Clone)]
pub struct KidRepository {
    connection: CsvConnection,
}

impl KidRepository {
    /// Create a new kid repository
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Generate a safe filesystem identifier from a kid name
    /// Converts "Emma Smith" -> "emma_smith", "José" -> "jos_", etc.
    pub fn generate_safe_directory_name(kid_name: &str) -> String {
        kid_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect::<String>()
            .trim_matches('_')
            .to_string()
    }

    fn kid_yaml_path(&self, directory_name: &str) -> PathBuf {
        self.connection.kid_directory(directory_name).join(KID_YAML_FILE)
    }

    fn avatar_path(&self, directory_name: &str) -> PathBuf {
        self.connection.kid_directory(directory_name).join(AVATAR_FILE)
    }

    /// Load a kid from a specific directory, or None if the directory
    /// doesn't hold a valid kid record
    fn load_kid_from_directory(&self, directory_name: &str) -> Result<Option<Kid>> {
        let yaml_path = self.kid_yaml_path(directory_name);
        if !yaml_path.exists() {
            return Ok(None);
        }

        let yaml_content = fs::read_to_string(&yaml_path)
            .with_context(|| format!("Failed to read {}", yaml_path.display()))?;
        let record: KidRecord = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse {}", yaml_path.display()))?;

        let avatar_path = self.avatar_path(directory_name);
        let avatar = if avatar_path.exists() {
            Some(fs::read(&avatar_path)?)
        } else {
            None
        };

        Ok(Some(Kid {
            id: record.id,
            name: record.name,
            avatar,
            created_at: record.created_at,
        }))
    }

    /// Discover all kids by scanning the kids directory
    fn discover_kids(&self) -> Result<Vec<Kid>> {
        let kids_dir = self.connection.kids_directory();

        if !kids_dir.exists() {
            debug!("Kids directory doesn't exist yet, returning empty roster");
            return Ok(Vec::new());
        }

        let mut kids = Vec::new();

        for entry in fs::read_dir(&kids_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let dir_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    warn!("Skipping kid directory with invalid name: {:?}", path);
                    continue;
                }
            };

            match self.load_kid_from_directory(&dir_name) {
                Ok(Some(kid)) => kids.push(kid),
                Ok(None) => debug!("Directory {} doesn't contain a valid kid", dir_name),
                Err(e) => warn!("Error loading kid from directory {}: {}", dir_name, e),
            }
        }

        // Roster order is creation time ascending; id breaks ties so the
        // ordering stays stable across scans
        kids.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(kids)
    }

    /// Find the directory holding a given kid ID
    fn find_kid_directory(&self, kid_id: &str) -> Result<Option<String>> {
        let kids_dir = self.connection.kids_directory();
        if !kids_dir.exists() {
            return Ok(None);
        }

        for entry in fs::read_dir(&kids_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let dir_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            if let Ok(Some(kid)) = self.load_kid_from_directory(&dir_name) {
                if kid.id == kid_id {
                    return Ok(Some(dir_name));
                }
            }
        }

        Ok(None)
    }

    /// Pick a directory name for a new kid, suffixing with the id prefix
    /// when another kid already claimed the safe name
    fn allocate_directory_name(&self, kid: &Kid) -> String {
        let safe_name = Self::generate_safe_directory_name(&kid.name);
        let base = if safe_name.is_empty() {
            "kid".to_string()
        } else {
            safe_name
        };

        if self.connection.kid_directory(&base).exists() {
            let suffix: String = kid.id.chars().take(8).collect();
            format!("{}_{}", base, suffix)
        } else {
            base
        }
    }

    /// Write the kid's metadata and avatar into its directory
    fn write_kid_files(&self, directory_name: &str, kid: &Kid) -> Result<()> {
        let kid_dir = self.connection.kid_directory(directory_name);
        fs::create_dir_all(&kid_dir)?;

        let record = KidRecord {
            id: kid.id.clone(),
            name: kid.name.clone(),
            created_at: kid.created_at.clone(),
        };

        let yaml_path = self.kid_yaml_path(directory_name);
        let temp_path = yaml_path.with_extension("tmp");
        fs::write(&temp_path, serde_yaml::to_string(&record)?)?;
        fs::rename(&temp_path, &yaml_path)?;

        let avatar_path = self.avatar_path(directory_name);
        match &kid.avatar {
            Some(bytes) => fs::write(&avatar_path, bytes)?,
            None => {
                if avatar_path.exists() {
                    fs::remove_file(&avatar_path)?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl KidStorage for KidRepository {
    async fn store_kid(&self, kid: &Kid) -> Result<()> {
        if self.find_kid_directory(&kid.id)?.is_some() {
            return Err(anyhow::anyhow!("Kid already exists: {}", kid.id));
        }

        let directory_name = self.allocate_directory_name(kid);
        self.write_kid_files(&directory_name, kid)?;

        info!("Stored kid {} in directory {}", kid.id, directory_name);
        self.connection.events().publish(StoreEvent::KidsChanged);
        Ok(())
    }

    async fn get_kid(&self, kid_id: &str) -> Result<Option<Kid>> {
        match self.find_kid_directory(kid_id)? {
            Some(dir_name) => self.load_kid_from_directory(&dir_name),
            None => Ok(None),
        }
    }

    async fn list_kids(&self) -> Result<Vec<Kid>> {
        self.discover_kids()
    }

    async fn update_kid(&self, kid: &Kid) -> Result<()> {
        let directory_name = self
            .find_kid_directory(&kid.id)?
            .ok_or_else(|| anyhow::anyhow!("Kid not found: {}", kid.id))?;

        self.write_kid_files(&directory_name, kid)?;

        info!("Updated kid {} in directory {}", kid.id, directory_name);
        self.connection.events().publish(StoreEvent::KidsChanged);
        Ok(())
    }

    async fn delete_kid(&self, kid_id: &str) -> Result<bool> {
        let directory_name = match self.find_kid_directory(kid_id)? {
            Some(dir_name) => dir_name,
            None => return Ok(false),
        };

        fs::remove_dir_all(self.connection.kid_directory(&directory_name))?;

        info!("Deleted kid {} (directory {})", kid_id, directory_name);
        self.connection.events().publish(StoreEvent::KidsChanged);
        Ok(true)
    }
}
