pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod registry;
pub mod secret;
pub mod table;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::EvalConfig;
    pub use crate::error::{
        DatasetError, GavelError, InferenceError, JudgeError, RegistryError, Result,
    };
    pub use crate::message::{Message, UsageMetadata};
    pub use crate::model::{CallOptions, ChatModel, ChatResult};
    pub use crate::registry::{InMemoryRegistry, ModelReference, ModelRegistry};
    pub use crate::secret::{EnvSecretStore, SecretStore, StaticSecretStore};
    pub use crate::table::{JsonTableSource, TableSource};
}
