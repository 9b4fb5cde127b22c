use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{RegistryError, Result};

/// Trait for secret stores.
///
/// Constructor-injected wherever a credential is needed, so tests can
/// substitute a fixture instead of reading the process environment.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the secret stored under `scope`/`key`.
    async fn get_secret(&self, scope: &str, key: &str) -> Result<String>;
}

/// Secret store backed by environment variables, looked up as
/// `SCOPE_KEY` upper-cased.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, scope: &str, key: &str) -> Result<String> {
        let var = format!("{scope}_{key}").to_uppercase();
        std::env::var(&var).map_err(|_| {
            RegistryError::SecretNotFound {
                scope: scope.into(),
                key: key.into(),
            }
            .into()
        })
    }
}

/// Fixed-map secret store for tests.
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<(String, String), String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(
        mut self,
        scope: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.secrets.insert((scope.into(), key.into()), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, scope: &str, key: &str) -> Result<String> {
        self.secrets
            .get(&(scope.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| {
                RegistryError::SecretNotFound {
                    scope: scope.into(),
                    key: key.into(),
                }
                .into()
            })
    }
}
