use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{RegistryError, Result};
use crate::model::ChatModel;

/// A specific version of a registered model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelReference {
    pub name: String,
    pub version: u32,
}

impl ModelReference {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// Trait for model registries.
///
/// `set_alias` is a single atomic operation with last-writer-wins
/// semantics: assigning an alias moves it off whatever version held it.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Highest registered version of the named model.
    async fn latest_version(&self, name: &str) -> Result<u32>;

    /// Load a callable handle to a specific model version.
    async fn load_model(&self, name: &str, version: u32) -> Result<Arc<dyn ChatModel>>;

    /// Point `alias` at `version` of the named model.
    async fn set_alias(&self, name: &str, alias: &str, version: u32) -> Result<()>;

    /// Version currently bound to `alias`, if any.
    async fn alias_version(&self, name: &str, alias: &str) -> Result<Option<u32>>;
}

#[derive(Default)]
struct RegistryEntry {
    versions: BTreeMap<u32, Arc<dyn ChatModel>>,
    aliases: HashMap<String, u32>,
}

/// In-memory model registry. Serves as the test double for the managed
/// registry the workflow runs against in production.
#[derive(Default)]
pub struct InMemoryRegistry {
    models: RwLock<HashMap<String, RegistryEntry>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model version, returning the assigned version number.
    pub async fn register(&self, name: &str, model: Arc<dyn ChatModel>) -> u32 {
        let mut models = self.models.write().await;
        let entry = models.entry(name.to_string()).or_default();
        let version = entry.versions.keys().next_back().copied().unwrap_or(0) + 1;
        entry.versions.insert(version, model);
        version
    }
}

#[async_trait]
impl ModelRegistry for InMemoryRegistry {
    async fn latest_version(&self, name: &str) -> Result<u32> {
        let models = self.models.read().await;
        let entry = models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.into()))?;
        entry
            .versions
            .keys()
            .next_back()
            .copied()
            .ok_or_else(|| RegistryError::ModelNotFound(name.into()).into())
    }

    async fn load_model(&self, name: &str, version: u32) -> Result<Arc<dyn ChatModel>> {
        let models = self.models.read().await;
        let entry = models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.into()))?;
        entry.versions.get(&version).cloned().ok_or_else(|| {
            RegistryError::VersionNotFound {
                name: name.into(),
                version,
            }
            .into()
        })
    }

    async fn set_alias(&self, name: &str, alias: &str, version: u32) -> Result<()> {
        let mut models = self.models.write().await;
        let entry = models
            .get_mut(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.into()))?;
        if !entry.versions.contains_key(&version) {
            return Err(RegistryError::VersionNotFound {
                name: name.into(),
                version,
            }
            .into());
        }
        entry.aliases.insert(alias.to_string(), version);
        Ok(())
    }

    async fn alias_version(&self, name: &str, alias: &str) -> Result<Option<u32>> {
        let models = self.models.read().await;
        let entry = models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.into()))?;
        Ok(entry.aliases.get(alias).copied())
    }
}
