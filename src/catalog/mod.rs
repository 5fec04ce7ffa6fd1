//! Query orchestrator.
//!
//! Composes the filter compiler, the record store and the search index into
//! the public catalog operations. Every public listing applies the Active
//! baseline; mutating operations require the admin claim.
//!
//! Two paths produce a page:
//! - structured only: count and window in the store, newest first;
//! - with text: all index hits in score order, restricted to the ids that
//!   satisfy the structured predicate, then windowed. The total is the
//!   number of survivors, so it always agrees with the window.

mod seed;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::auth::AdminClaim;
use crate::db::SchemeRepository;
use crate::errors::AppError;
use crate::filter::{compile, Clause, Column, FilterCriteria, Predicate};
use crate::models::{Category, Scheme, SchemePayload, SchemeStatus, ValueCount};
use crate::pagination::{Page, PageRequest, Pagination};
use crate::search::{SearchHit, SearchIndex};
use crate::validation::{validate_create, validate_update};

/// Timeout and retry budget for store calls.
#[derive(Debug, Clone, Copy)]
pub struct StorePolicy {
    pub timeout: Duration,
    /// Extra attempts for idempotent reads; writes are never retried
    pub read_retries: u32,
}

impl StorePolicy {
    fn backoff(attempt: u32) -> Duration {
        Duration::from_millis(100 * 2u64.pow(attempt.saturating_sub(1).min(10)))
    }
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            read_retries: 2,
        }
    }
}

#[derive(Clone)]
pub struct SchemeCatalog {
    repo: SchemeRepository,
    search: Arc<SearchIndex>,
    policy: StorePolicy,
}

impl SchemeCatalog {
    pub fn new(repo: SchemeRepository, search: Arc<SearchIndex>, policy: StorePolicy) -> Self {
        Self {
            repo,
            search,
            policy,
        }
    }

    #[cfg(test)]
    pub fn repository(&self) -> &SchemeRepository {
        &self.repo
    }

    // ==================== READS ====================

    /// Active schemes, newest first.
    pub async fn list_active(&self, page: PageRequest) -> Result<Page<Scheme>, AppError> {
        self.query(Predicate::active(), page).await
    }

    /// Active schemes matching the visitor's criteria.
    pub async fn filter(
        &self,
        criteria: &FilterCriteria,
        page: PageRequest,
    ) -> Result<Page<Scheme>, AppError> {
        self.query(compile(criteria), page).await
    }

    pub async fn list_by_category(
        &self,
        category: Category,
        page: PageRequest,
    ) -> Result<Page<Scheme>, AppError> {
        let criteria = FilterCriteria {
            category: Some(category),
            ..Default::default()
        };
        self.filter(&criteria, page).await
    }

    /// Active featured schemes, newest first, at most `limit`.
    pub async fn list_featured(&self, limit: u32) -> Result<Vec<Scheme>, AppError> {
        let predicate = Predicate::active().and(Clause::IsSet(Column::Featured));
        self.read("list_featured", || self.repo.find(&predicate, 0, limit))
            .await
    }

    /// Active schemes matching free text, best match first.
    pub async fn search(&self, text: &str, page: PageRequest) -> Result<Page<Scheme>, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::validation("q", "Search query is required"));
        }
        self.query(Predicate::active().matching_text(text), page)
            .await
    }

    /// A single scheme by id, whatever its status.
    ///
    /// Bumps the view counter in the background; the returned record shows
    /// the count before this view.
    pub async fn get_by_id(&self, id: &str) -> Result<Scheme, AppError> {
        let id = parse_id(id)?;
        let scheme = self
            .read("get_by_id", || self.repo.get(&id))
            .await?
            .ok_or_else(not_found)?;

        self.record_view(id);
        Ok(scheme)
    }

    pub async fn distinct_categories(&self) -> Result<Vec<ValueCount>, AppError> {
        self.read("distinct_categories", || {
            self.repo.value_counts(Column::Category)
        })
        .await
    }

    pub async fn distinct_districts(&self) -> Result<Vec<ValueCount>, AppError> {
        self.read("distinct_districts", || {
            self.repo.value_counts(Column::District)
        })
        .await
    }

    /// Every scheme, optionally of one status, newest first. Admin only.
    pub async fn list_all(
        &self,
        claim: AdminClaim,
        status: Option<SchemeStatus>,
        page: PageRequest,
    ) -> Result<Page<Scheme>, AppError> {
        claim.require()?;

        let predicate = match status {
            Some(status) => Predicate::any().and(Clause::Equals(Column::Status, status.as_str())),
            None => Predicate::any(),
        };
        self.query(predicate, page).await
    }

    // ==================== WRITES ====================

    pub async fn create(
        &self,
        claim: AdminClaim,
        payload: SchemePayload,
    ) -> Result<Scheme, AppError> {
        claim.require()?;
        let draft = validate_create(payload)?;

        let scheme = self.write(self.repo.insert(&draft)).await?;
        tracing::info!(id = %scheme.id, title = %scheme.details.title, "Scheme created");

        if let Err(e) = self.search.index_scheme(&scheme).await {
            tracing::warn!(id = %scheme.id, "Failed to index scheme: {}", e);
        }
        Ok(scheme)
    }

    /// Merge the supplied fields into an existing scheme.
    pub async fn update(
        &self,
        claim: AdminClaim,
        id: &str,
        payload: SchemePayload,
    ) -> Result<Scheme, AppError> {
        claim.require()?;
        let id = parse_id(id)?;

        let existing = self
            .read("update", || self.repo.get(&id))
            .await?
            .ok_or_else(not_found)?;
        let draft = validate_update(existing.details, payload)?;

        let scheme = self
            .write(self.repo.update(&id, &draft))
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(id = %scheme.id, "Scheme updated");

        if let Err(e) = self.search.index_scheme(&scheme).await {
            tracing::warn!(id = %scheme.id, "Failed to re-index scheme: {}", e);
        }
        Ok(scheme)
    }

    pub async fn delete(&self, claim: AdminClaim, id: &str) -> Result<(), AppError> {
        claim.require()?;
        let id = parse_id(id)?;

        if !self.write(self.repo.delete(&id)).await? {
            return Err(not_found());
        }
        tracing::info!(id = %id, "Scheme deleted");

        if let Err(e) = self.search.remove_scheme(&id).await {
            tracing::warn!(id = %id, "Failed to remove scheme from index: {}", e);
        }
        Ok(())
    }

    /// Rebuild the search index from the store. Returns the number indexed.
    pub async fn rebuild_index(&self) -> Result<usize, AppError> {
        let schemes = self.read("rebuild_index", || self.repo.list_all()).await?;
        self.search.rebuild(&schemes).await?;
        Ok(schemes.len())
    }

    // ==================== INTERNALS ====================

    async fn query(&self, predicate: Predicate, page: PageRequest) -> Result<Page<Scheme>, AppError> {
        match predicate.text().map(str::to_string) {
            None => {
                let total = self.read("count", || self.repo.count(&predicate)).await?;
                let items = self
                    .read("find", || {
                        self.repo.find(&predicate, page.skip(), page.limit())
                    })
                    .await?;

                Ok(Page {
                    items,
                    pagination: Pagination::new(page, total),
                })
            }
            Some(text) => self.query_by_relevance(predicate, &text, page).await,
        }
    }

    async fn query_by_relevance(
        &self,
        predicate: Predicate,
        text: &str,
        page: PageRequest,
    ) -> Result<Page<Scheme>, AppError> {
        let hits = self
            .read("search", || {
                let search = Arc::clone(&self.search);
                let text = text.to_string();
                async move {
                    tokio::task::spawn_blocking(move || search.search(&text))
                        .await
                        .map_err(|e| AppError::Internal(format!("Search task failed: {}", e)))?
                }
            })
            .await?;
        if hits.is_empty() {
            return Ok(Page::empty(page));
        }
        tracing::debug!(hits = hits.len(), top_score = hits[0].score, "Text search");

        let hit_ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let matching = self
            .read("matching_among", || self.repo.matching_among(&predicate, &hit_ids))
            .await?;

        let survivors: Vec<&SearchHit> = hits.iter().filter(|h| matching.contains(&h.id)).collect();
        let total = survivors.len() as u64;

        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        let window: Vec<String> = survivors
            .into_iter()
            .skip(skip)
            .take(page.limit() as usize)
            .map(|h| h.id.clone())
            .collect();

        let mut items = self
            .read("get_many", || self.repo.get_many(&window))
            .await?;

        let rank: HashMap<&str, usize> = window
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        items.sort_by_key(|s| rank.get(s.id.as_str()).copied().unwrap_or(usize::MAX));

        Ok(Page {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Run an idempotent store call under the timeout, retrying store
    /// failures with exponential backoff.
    async fn read<T, F, Fut>(&self, op: &'static str, call: F) -> Result<T, AppError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let result = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(elapsed) => Err(elapsed.into()),
            };

            match result {
                Err(e) if e.is_retryable() && attempts <= self.policy.read_retries => {
                    let delay = StorePolicy::backoff(attempts);
                    tracing::warn!(op, attempts, delay_ms = delay.as_millis() as u64, "Store read failed, retrying: {}", e);
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Run a store write under the timeout. Never retried.
    async fn write<T>(&self, call: impl Future<Output = Result<T, AppError>>) -> Result<T, AppError> {
        tokio::time::timeout(self.policy.timeout, call).await?
    }

    fn record_view(&self, id: String) {
        let repo = self.repo.clone();
        let timeout = self.policy.timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, repo.increment_views(&id)).await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => tracing::debug!(id = %id, "Viewed scheme vanished before count"),
                Ok(Err(e)) => tracing::warn!(id = %id, "Failed to increment views: {}", e),
                Err(_) => tracing::warn!(id = %id, "Timed out incrementing views"),
            }
        });
    }
}

/// Canonical (lowercase hyphenated) form of a scheme id.
fn parse_id(id: &str) -> Result<String, AppError> {
    Uuid::parse_str(id.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|_| AppError::MalformedId(id.to_string()))
}

fn not_found() -> AppError {
    AppError::NotFound("Scheme not found".to_string())
}
