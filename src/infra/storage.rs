//! Route lookup storage backends: a local JSON file or Vercel Edge Config.

use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    application::store::{LookupStore, StorageError},
    config::{CacheSettings, EnvironmentSettings},
    domain::lookup::RouteLookupEnvelope,
};

pub const FILE_STORE_LABEL: &str = "File system";
pub const EDGE_CONFIG_STORE_LABEL: &str = "Vercel Edge Config";

/// Pick the backend for this deployment. Edge Config is used only in a
/// production-like stage with a connection string; an unusable connection
/// string falls back to the file store.
pub fn lookup_store(
    cache: &CacheSettings,
    environment: &EnvironmentSettings,
) -> Arc<dyn LookupStore> {
    if environment.production
        && let Some(connection) = cache.edge_config.as_deref()
    {
        match EdgeConfigLookupStore::new(
            connection,
            cache.edge_config_api_base.clone(),
            cache.lookup_key.clone(),
        ) {
            Ok(store) => return Arc::new(store),
            Err(err) => warn!(
                target = "canopy::storage",
                error = %err,
                "edge config unavailable; using file store"
            ),
        }
    }

    Arc::new(FileLookupStore::new(cache.lookup_path.clone()))
}

#[derive(Debug, Clone)]
pub struct FileLookupStore {
    path: PathBuf,
}

impl FileLookupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LookupStore for FileLookupStore {
    fn label(&self) -> &'static str {
        FILE_STORE_LABEL
    }

    async fn get(&self) -> Result<Option<RouteLookupEnvelope>, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn set(&self, envelope: &RouteLookupEnvelope) -> Result<(), StorageError> {
        let body = serde_json::to_string_pretty(envelope)?;
        tokio::fs::write(&self.path, body).await?;
        info!(
            target = "canopy::storage",
            path = %self.path.display(),
            entry_count = envelope.entry_count,
            "saved route lookup to file"
        );
        Ok(())
    }
}

/// Parsed `https://edge-config.vercel.com/{config-id}?token={token}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeConfigConnection {
    pub origin: Url,
    pub config_id: String,
    pub token: String,
}

impl EdgeConfigConnection {
    pub fn parse(connection: &str) -> Result<Self, StorageError> {
        let url = Url::parse(connection)
            .map_err(|err| StorageError::InvalidConnection(err.to_string()))?;
        let config_id = url.path().trim_matches('/').to_string();
        let token = url
            .query_pairs()
            .find_map(|(key, value)| (key == "token").then(|| value.into_owned()))
            .unwrap_or_default();

        if config_id.is_empty() || token.is_empty() {
            return Err(StorageError::InvalidConnection(
                "expected https://edge-config.vercel.com/{config-id}?token={token}".to_string(),
            ));
        }

        let mut origin = url;
        origin.set_path("/");
        origin.set_query(None);
        Ok(Self {
            origin,
            config_id,
            token,
        })
    }
}

/// Reads through the Edge Config endpoint and writes through the Vercel
/// REST API, since the read endpoint does not accept updates.
#[derive(Debug, Clone)]
pub struct EdgeConfigLookupStore {
    client: Client,
    connection: EdgeConfigConnection,
    api_base: Url,
    key: String,
}

impl EdgeConfigLookupStore {
    pub fn new(connection: &str, api_base: Url, key: String) -> Result<Self, StorageError> {
        let connection = EdgeConfigConnection::parse(connection)?;
        let client = Client::builder()
            .user_agent(concat!("canopy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StorageError::from_http)?;
        Ok(Self {
            client,
            connection,
            api_base,
            key,
        })
    }

    fn item_url(&self) -> Result<Url, StorageError> {
        self.connection
            .origin
            .join(&format!("{}/item/{}", self.connection.config_id, self.key))
            .map_err(|err| StorageError::InvalidConnection(err.to_string()))
    }

    fn items_url(&self) -> Result<Url, StorageError> {
        self.api_base
            .join(&format!("v1/edge-config/{}/items", self.connection.config_id))
            .map_err(|err| StorageError::InvalidConnection(err.to_string()))
    }
}

#[async_trait]
impl LookupStore for EdgeConfigLookupStore {
    fn label(&self) -> &'static str {
        EDGE_CONFIG_STORE_LABEL
    }

    async fn get(&self) -> Result<Option<RouteLookupEnvelope>, StorageError> {
        let response = self
            .client
            .get(self.item_url()?)
            .bearer_auth(&self.connection.token)
            .send()
            .await
            .map_err(StorageError::from_http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response.bytes().await.map_err(StorageError::from_http)?;
        if !status.is_success() {
            return Err(StorageError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn set(&self, envelope: &RouteLookupEnvelope) -> Result<(), StorageError> {
        let body = json!({
            "items": [{
                "operation": "upsert",
                "key": self.key,
                "value": envelope,
                "description": format!(
                    "Route lookup cache - {} entries, updated {}",
                    envelope.entry_count,
                    envelope.last_updated_rfc3339()
                ),
            }]
        });

        let response = self
            .client
            .patch(self.items_url()?)
            .bearer_auth(&self.connection.token)
            .json(&body)
            .send()
            .await
            .map_err(StorageError::from_http)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        info!(
            target = "canopy::storage",
            entry_count = envelope.entry_count,
            "saved route lookup to edge config"
        );
        Ok(())
    }
}
