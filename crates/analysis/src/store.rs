//! Read-through cache in front of the analysis repository

use clauselens_common::cache::{keys, Cache};
use clauselens_common::db::models::UserFeedback;
use clauselens_common::db::{AnalysisDetail, AnalysisSummary, Repository};
use clauselens_common::errors::{AppError, Result};
use clauselens_common::metrics;
use clauselens_common::report::{AnalysisReport, Tier};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AnalysisStore {
    repository: Repository,
    cache: Cache,
    ttl_secs: u64,
}

impl AnalysisStore {
    pub fn new(repository: Repository, cache: Cache, ttl_secs: u64) -> Self {
        Self {
            repository,
            cache,
            ttl_secs,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Persist a parsed report and prime the cache with it
    #[instrument(skip(self, contract_text, report), fields(user_id = %user_id))]
    pub async fn save(
        &self,
        user_id: Uuid,
        contract_text: &str,
        contract_type: &str,
        tier: Tier,
        report: &AnalysisReport,
        ai_model: &str,
    ) -> Result<AnalysisDetail> {
        let detail = self
            .repository
            .create_analysis(user_id, contract_text, contract_type, tier, report, ai_model)
            .await?;

        self.cache_detail(&detail).await;
        Ok(detail)
    }

    /// Cache first, then the database. `None` when absent or owned by someone else.
    #[instrument(skip(self), fields(user_id = %user_id, contract_id = %id))]
    pub async fn fetch_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<AnalysisDetail>> {
        let key = keys::contract(id);

        match self.cache.get_or_evict::<AnalysisDetail>(&key).await {
            Ok(Some(detail)) if detail.owner() == user_id => {
                metrics::record_cache(true, "contract");
                return Ok(Some(detail));
            }
            Ok(Some(_)) => {
                debug!("Cached analysis belongs to another user, ignoring");
                metrics::record_cache(false, "contract");
            }
            Ok(None) => metrics::record_cache(false, "contract"),
            Err(e) => {
                warn!(error = %e, "Cache read failed, falling back to database");
            }
        }

        let detail = self.repository.find_analysis_detail(id, user_id).await?;
        if let Some(ref found) = detail {
            self.cache_detail(found).await;
        }
        Ok(detail)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<AnalysisSummary>, u64)> {
        self.repository.list_analyses(user_id, offset, limit).await
    }

    /// Upsert feedback on an owned analysis and drop the stale cache entry
    #[instrument(skip(self, comments), fields(user_id = %user_id, contract_id = %id))]
    pub async fn record_feedback(
        &self,
        user_id: Uuid,
        id: Uuid,
        rating: i32,
        comments: &str,
    ) -> Result<UserFeedback> {
        if self.repository.find_analysis(id, user_id).await?.is_none() {
            return Err(AppError::ContractNotFound { id: id.to_string() });
        }

        let feedback = self.repository.upsert_feedback(id, rating, comments).await?;

        if let Err(e) = self.cache.delete(&keys::contract(id)).await {
            warn!(error = %e, "Failed to invalidate cached analysis");
        }
        Ok(feedback)
    }

    async fn cache_detail(&self, detail: &AnalysisDetail) {
        let key = keys::contract(detail.id());
        if let Err(e) = self.cache.set_with_ttl(&key, detail, self.ttl_secs).await {
            warn!(error = %e, contract_id = %detail.id(), "Failed to cache analysis, continuing without cache");
        }
    }
}
