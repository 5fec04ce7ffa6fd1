//! Sample data loading for an empty store.

use std::path::Path;

use super::SchemeCatalog;
use crate::errors::AppError;
use crate::models::SchemePayload;
use crate::validation::validate_create;

impl SchemeCatalog {
    /// Insert the schemes listed in a JSON file when the store is empty.
    ///
    /// Each entry goes through the same validation as a create request;
    /// entries that fail are skipped. Returns the number inserted.
    pub async fn seed_if_empty(&self, path: &Path) -> Result<usize, AppError> {
        if !self.repo.is_empty().await? {
            tracing::info!("Store already holds schemes, skipping seed");
            return Ok(0);
        }

        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Internal(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let payloads: Vec<SchemePayload> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        let mut inserted = 0;
        for (position, payload) in payloads.into_iter().enumerate() {
            let title = payload.title.clone().unwrap_or_default();
            match validate_create(payload) {
                Ok(draft) => {
                    self.repo.insert(&draft).await?;
                    inserted += 1;
                }
                Err(AppError::Validation(errors)) => {
                    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                    tracing::warn!(
                        position,
                        title = %title,
                        fields = ?fields,
                        "Skipping invalid seed scheme"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(inserted, "Seeded schemes from {}", path.display());
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StorePolicy;
    use crate::db::{init_database, ConnectRetry, SchemeRepository};
    use crate::search::SearchIndex;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn catalog(dir: &TempDir) -> SchemeCatalog {
        let retry = ConnectRetry {
            attempts: 1,
            initial_backoff: Duration::from_millis(1),
        };
        let pool = init_database(&dir.path().join("seed.sqlite"), retry)
            .await
            .unwrap();
        let search = Arc::new(SearchIndex::open(&dir.path().join("index")).unwrap());
        SchemeCatalog::new(SchemeRepository::new(pool), search, StorePolicy::default())
    }

    #[tokio::test]
    async fn test_seed_skips_invalid_rows_and_runs_once() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir).await;

        let seed = dir.path().join("schemes.json");
        std::fs::write(
            &seed,
            serde_json::json!([
                {
                    "title": "crop insurance",
                    "description": "Insurance for farmers",
                    "category": "Agriculture",
                    "benefits": ["Crop cover"],
                    "documents": ["Aadhaar Card"],
                    "applicationProcess": "Apply online",
                    "governmentBody": "Ministry of Agriculture"
                },
                {
                    "title": "Bus Pass",
                    "category": "Transport"
                }
            ])
            .to_string(),
        )
        .unwrap();

        assert_eq!(catalog.seed_if_empty(&seed).await.unwrap(), 1);
        assert_eq!(catalog.seed_if_empty(&seed).await.unwrap(), 0);
        assert_eq!(catalog.rebuild_index().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_shipped_seed_file_is_valid() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir).await;

        let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join("seed/schemes.json");
        let raw = std::fs::read_to_string(&shipped).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();

        assert_eq!(catalog.seed_if_empty(&shipped).await.unwrap(), entries.len());
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir).await;

        let result = catalog.seed_if_empty(&dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
