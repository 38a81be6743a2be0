use std::env;
use std::sync::Arc;

use super::auth::AuthKeys;
use super::error::ApiError;
use super::store::DocumentStore;
use crate::config::ServerConfig;

/// Shared service state: store connection, signing keys, server config.
pub struct AppState {
    pub store: DocumentStore,
    pub keys: AuthKeys,
    pub config: ServerConfig,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, ApiError> {
        let store_url = env_or("REDIS_URL", "redis://127.0.0.1:6379");
        let store = DocumentStore::connect(&store_url).await?;

        let secret = jwt_secret();
        let keys = AuthKeys::new(secret.as_bytes());

        Ok(Arc::new(Self {
            store,
            keys,
            config,
        }))
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using an insecure development secret");
        "insecure-dev-secret".to_string()
    })
}
