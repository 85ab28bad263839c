//! Storage - Object storage per i file dei materiali caricati
//!
//! I file stanno sotto `users/{user_id}/courses/{course_id}/`, quindi eliminare
//! un corso o un account è una cancellazione per prefisso. Si usa Google Cloud
//! Storage se è configurato un bucket, altrimenti il filesystem locale.

use crate::core::Config;
use axum::body::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{GetResult, ObjectStore, PutPayload};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub struct FileStorage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    signed_url_ttl: Duration,
}

impl FileStorage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        signer: Option<Arc<dyn Signer>>,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            signer,
            signed_url_ttl,
        }
    }

    /// Sceglie il backend in base alla configurazione
    pub async fn from_config(config: &Config) -> Result<Self, object_store::Error> {
        let ttl = Duration::from_secs(config.signed_url_ttl_secs);
        match &config.storage_bucket {
            Some(bucket) => {
                info!("Using Google Cloud Storage bucket {}", bucket);
                let gcs = Arc::new(
                    GoogleCloudStorageBuilder::from_env()
                        .with_bucket_name(bucket)
                        .build()?,
                );
                Ok(Self::new(gcs.clone(), Some(gcs), ttl))
            }
            None => {
                info!("Using local storage at {}", config.upload_dir);
                tokio::fs::create_dir_all(&config.upload_dir)
                    .await
                    .map_err(|e| object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: Box::new(e),
                    })?;
                let local = LocalFileSystem::new_with_prefix(&config.upload_dir)?;
                Ok(Self::new(Arc::new(local), None, ttl))
            }
        }
    }

    /// Store non persistente, non può firmare URL
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), None, Duration::from_secs(3600))
    }

    pub fn signed_url_ttl(&self) -> Duration {
        self.signed_url_ttl
    }

    pub fn user_prefix(user_id: i64) -> Path {
        Path::from(format!("users/{}", user_id))
    }

    pub fn course_prefix(user_id: i64, course_id: i64) -> Path {
        Path::from(format!("users/{}/courses/{}", user_id, course_id))
    }

    /// Nuova chiave per un upload. La parte casuale tiene separati due upload
    /// con lo stesso nome file.
    pub fn material_key(user_id: i64, course_id: i64, file_name: &str) -> Path {
        Path::from(format!(
            "users/{}/courses/{}/{}-{}",
            user_id,
            course_id,
            Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        ))
    }

    #[instrument(skip(self, bytes), fields(key = %key, size = bytes.len()))]
    pub async fn put(&self, key: &Path, bytes: Bytes) -> Result<(), object_store::Error> {
        debug!("Writing blob");
        self.store.put(key, PutPayload::from(bytes)).await?;
        info!("Blob stored");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: &Path) -> Result<GetResult, object_store::Error> {
        debug!("Opening blob");
        self.store.get(key).await
    }

    /// Contenuto decodificato come UTF-8 (lossy), troncato a `max_chars` caratteri
    #[instrument(skip(self), fields(key = %key))]
    pub async fn read_text(&self, key: &Path, max_chars: usize) -> Result<String, object_store::Error> {
        let bytes = self.store.get(key).await?.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).chars().take(max_chars).collect())
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn delete(&self, key: &Path) -> Result<(), object_store::Error> {
        debug!("Deleting blob");
        match self.store.delete(key).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Elimina ogni file sotto `prefix`, ritorna quanti ne sono stati rimossi
    #[instrument(skip(self), fields(prefix = %prefix))]
    pub async fn delete_prefix(&self, prefix: &Path) -> Result<usize, object_store::Error> {
        debug!("Deleting blobs by prefix");
        let locations = self
            .store
            .list(Some(prefix))
            .map_ok(|meta| meta.location)
            .boxed();
        let deleted = self
            .store
            .delete_stream(locations)
            .try_collect::<Vec<Path>>()
            .await?;

        info!("Deleted {} blobs", deleted.len());
        Ok(deleted.len())
    }

    /// URL GET a tempo, `None` se il backend non può firmare
    #[instrument(skip(self), fields(key = %key))]
    pub async fn signed_url(&self, key: &Path) -> Result<Option<String>, object_store::Error> {
        let Some(signer) = &self.signer else {
            debug!("Backend cannot sign URLs");
            return Ok(None);
        };
        let url = signer
            .signed_url(reqwest::Method::GET, key, self.signed_url_ttl)
            .await?;
        Ok(Some(url.to_string()))
    }

    /// Cancellazione per prefisso best-effort, gli errori vengono solo loggati
    pub async fn purge_prefix(&self, prefix: &Path) {
        if let Err(e) = self.delete_prefix(prefix).await {
            warn!("Failed to delete storage prefix {}: {}", prefix, e);
        }
    }
}

/// Mantiene leggibile il nome file dentro una chiave di storage
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(120).collect()
    }
}
