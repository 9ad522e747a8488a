//! Analysis processor
//!
//! Core pipeline: stage upload, extract text, prompt the model,
//! parse the completion, persist and cache the result.

use crate::errors::AnalysisError;
use crate::pdf::extract_text_from_pdf;
use crate::prompt::{build_analysis_prompt, build_detection_prompt, truncate_chars};
use crate::sanitize::{clean_contract_type, parse_report};
use crate::store::AnalysisStore;
use clauselens_common::ai::ContentGenerator;
use clauselens_common::cache::{keys, Cache};
use clauselens_common::config::AppConfig;
use clauselens_common::db::models::User;
use clauselens_common::db::AnalysisDetail;
use clauselens_common::errors::AppError;
use clauselens_common::metrics;
use clauselens_common::report::Tier;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Knobs the pipeline reads from application config
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub upload_ttl_secs: u64,
    pub detection_excerpt_chars: usize,
    pub max_contract_chars: usize,
}

impl From<&AppConfig> for AnalyzerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            upload_ttl_secs: config.cache.upload_ttl_secs,
            detection_excerpt_chars: config.ai.detection_excerpt_chars,
            max_contract_chars: config.ai.max_contract_chars,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Contract analysis pipeline
pub struct ContractAnalyzer {
    generator: Arc<dyn ContentGenerator>,
    cache: Cache,
    store: AnalysisStore,
    config: AnalyzerConfig,
}

impl ContractAnalyzer {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        cache: Cache,
        store: AnalysisStore,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            generator,
            cache,
            store,
            config,
        }
    }

    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Buffer raw upload bytes in the cache, returning the staging key
    pub async fn stage_upload(&self, user_id: Uuid, bytes: Vec<u8>) -> Result<String, AnalysisError> {
        let key = keys::upload(user_id, chrono::Utc::now().timestamp_millis());
        self.cache
            .set_bytes(&key, bytes, self.config.upload_ttl_secs)
            .await?;
        Ok(key)
    }

    /// Read a staged upload back, delete it, and extract its text
    pub async fn take_staged_text(&self, key: &str) -> Result<String, AnalysisError> {
        let bytes = self.cache.get_bytes(key).await?;

        if let Err(e) = self.cache.delete(key).await {
            warn!(key, error = %e, "Failed to delete staged upload");
        }

        let bytes = bytes.ok_or_else(|| AnalysisError::UploadExpired { key: key.to_string() })?;
        extract_text_from_pdf(&bytes)
    }

    async fn staged_text(&self, user_id: Uuid, bytes: Vec<u8>) -> Result<String, AnalysisError> {
        metrics::record_upload(bytes.len());
        let key = self.stage_upload(user_id, bytes).await?;
        self.take_staged_text(&key).await
    }

    /// Ask the model what kind of contract an upload is
    #[instrument(skip(self, user, bytes), fields(user_id = %user.id, size = bytes.len()))]
    pub async fn detect_contract_type(&self, user: &User, bytes: Vec<u8>) -> Result<String, AnalysisError> {
        let text = self.staged_text(user.id, bytes).await?;
        let prompt = build_detection_prompt(&text, self.config.detection_excerpt_chars);

        let completion = self.generator.generate(&prompt).await?;
        let contract_type = clean_contract_type(&completion)?;

        info!(contract_type = %contract_type, "Detected contract type");
        Ok(contract_type)
    }

    /// Full pipeline for one upload
    #[instrument(skip(self, user, bytes), fields(user_id = %user.id, size = bytes.len()))]
    pub async fn analyze(
        &self,
        user: &User,
        bytes: Vec<u8>,
        contract_type: &str,
    ) -> Result<AnalysisDetail, AnalysisError> {
        let contract_type = contract_type.trim();
        if contract_type.is_empty() {
            return Err(AppError::MissingField {
                field: "contractType".to_string(),
            }
            .into());
        }

        let tier = Tier::for_user(user.is_premium);
        let start = Instant::now();
        let result = self.run_analysis(user, bytes, contract_type, tier).await;

        metrics::record_analysis(start.elapsed(), tier.as_str(), result.is_ok());
        match &result {
            Ok(detail) => info!(
                contract_id = %detail.id(),
                tier = %tier,
                risks = detail.risks.len(),
                opportunities = detail.opportunities.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Analysis complete"
            ),
            Err(e) => warn!(tier = %tier, error = %e, "Analysis failed"),
        }
        result
    }

    async fn run_analysis(
        &self,
        user: &User,
        bytes: Vec<u8>,
        contract_type: &str,
        tier: Tier,
    ) -> Result<AnalysisDetail, AnalysisError> {
        let text = self.staged_text(user.id, bytes).await?;

        let excerpt = truncate_chars(&text, self.config.max_contract_chars);
        if excerpt.len() < text.len() {
            debug!(
                max_chars = self.config.max_contract_chars,
                "Contract text truncated for prompt"
            );
        }

        let prompt = build_analysis_prompt(excerpt, tier, contract_type);
        let completion = self.generator.generate(&prompt).await?;
        let report = parse_report(&completion)?;

        let detail = self
            .store
            .save(
                user.id,
                &text,
                contract_type,
                tier,
                &report,
                self.generator.model_name(),
            )
            .await?;
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::build_pdf;
    use crate::test_support::{analysis, empty_db, memory_cache, repository, risk, user};
    use clauselens_common::ai::MockGenerator;
    use clauselens_common::db::models::{FinancialTerms, Opportunity};
    use sea_orm::MockDatabase;

    fn analyzer(
        generator: Arc<MockGenerator>,
        db: MockDatabase,
    ) -> (ContractAnalyzer, Arc<clauselens_common::cache::MemoryBackend>) {
        let (cache, backend) = memory_cache();
        let store = AnalysisStore::new(repository(db), cache.clone(), 3600);
        let analyzer = ContractAnalyzer::new(generator, cache, store, AnalyzerConfig::default());
        (analyzer, backend)
    }

    #[tokio::test]
    async fn test_staged_upload_is_consumed_once() {
        let (analyzer, backend) = analyzer(Arc::new(MockGenerator::new()), empty_db());
        let user_id = Uuid::new_v4();

        let key = analyzer
            .stage_upload(user_id, build_pdf(&["Hello World!"]))
            .await
            .unwrap();
        assert!(key.starts_with(&format!("upload:{}:", user_id)));

        let text = analyzer.take_staged_text(&key).await.unwrap();
        assert_eq!(text, "Hello World!");
        assert!(backend.keys().await.is_empty());

        assert!(matches!(
            analyzer.take_staged_text(&key).await,
            Err(AnalysisError::UploadExpired { .. })
        ));
    }

    #[tokio::test]
    async fn test_back_to_back_uploads_do_not_overwrite() {
        let (analyzer, backend) = analyzer(Arc::new(MockGenerator::new()), empty_db());
        let user_id = Uuid::new_v4();

        let first = analyzer.stage_upload(user_id, build_pdf(&["First"])).await.unwrap();
        let second = analyzer.stage_upload(user_id, build_pdf(&["Second"])).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(backend.keys().await.len(), 2);

        assert_eq!(analyzer.take_staged_text(&first).await.unwrap(), "First");
        assert_eq!(analyzer.take_staged_text(&second).await.unwrap(), "Second");
    }

    #[tokio::test]
    async fn test_invalid_upload_is_still_deleted() {
        let (analyzer, backend) = analyzer(Arc::new(MockGenerator::new()), empty_db());

        let key = analyzer.stage_upload(Uuid::new_v4(), b"not a pdf".to_vec()).await.unwrap();
        assert!(matches!(
            analyzer.take_staged_text(&key).await,
            Err(AnalysisError::NotAPdf)
        ));
        assert!(backend.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_detect_contract_type() {
        let generator = Arc::new(MockGenerator::scripted(vec![Ok("\"Lease Agreement\".\n".into())]));
        let (analyzer, _) = analyzer(generator.clone(), empty_db());

        let detected = analyzer
            .detect_contract_type(&user(false), build_pdf(&["This lease is made between..."]))
            .await
            .unwrap();

        assert_eq!(detected, "Lease Agreement");
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("This lease is made between"));
    }

    #[tokio::test]
    async fn test_analyze_persists_and_caches() {
        let reader = user(false);
        let id = Uuid::new_v4();
        let row = analysis(id, reader.id);

        let db = empty_db()
            .append_query_results([vec![row.clone()]])
            .append_query_results([vec![risk(id, "high")]])
            .append_query_results([vec![risk(id, "low")]])
            .append_query_results([vec![Opportunity {
                id: Uuid::new_v4(),
                contract_id: id,
                opportunity: "Mutual obligations".into(),
                explanation: "Both parties are equally bound.".into(),
                impact: "medium".into(),
            }]])
            .append_query_results([vec![FinancialTerms {
                id: Uuid::new_v4(),
                contract_id: id,
                description: "No payments".into(),
                details: serde_json::json!([]),
            }]]);

        let generator = Arc::new(MockGenerator::new());
        let (analyzer, backend) = analyzer(generator.clone(), db);

        let detail = analyzer
            .analyze(&reader, build_pdf(&["Mutual NDA between A and B"]), "Non-Disclosure Agreement")
            .await
            .unwrap();

        assert_eq!(detail.id(), id);
        assert_eq!(detail.risks.len(), 2);
        assert!(detail.financial_terms.is_some());

        // Upload staging key gone, analysis cached
        assert_eq!(backend.keys().await, vec![format!("test:contract:{}", id)]);

        let prompts = generator.prompts();
        assert!(prompts[0].contains("at least 5 potential risks"));
        assert!(prompts[0].contains("Mutual NDA between A and B"));
    }

    #[tokio::test]
    async fn test_premium_user_gets_premium_prompt() {
        let generator = Arc::new(MockGenerator::scripted(vec![Ok("{}".into())]));
        let (analyzer, _) = analyzer(generator.clone(), empty_db());

        let err = analyzer
            .analyze(&user(true), build_pdf(&["Employment terms"]), "Employment")
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::IncompleteReport { .. }));
        let prompts = generator.prompts();
        assert!(prompts[0].contains("at least 10 potential risks"));
        assert!(prompts[0].contains("compensationStructure"));
    }

    #[tokio::test]
    async fn test_malformed_completion_is_not_persisted() {
        let generator = Arc::new(MockGenerator::scripted(vec![Ok("Sorry, I can't do that.".into())]));
        // Any insert would fail against the empty mock
        let (analyzer, backend) = analyzer(generator, empty_db());

        let err = analyzer
            .analyze(&user(false), build_pdf(&["Some contract"]), "Sales")
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::MalformedResponse { .. }));
        assert!(backend.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_contract_type_is_rejected() {
        let (analyzer, _) = analyzer(Arc::new(MockGenerator::new()), empty_db());
        let err = analyzer
            .analyze(&user(false), build_pdf(&["x"]), "  ")
            .await
            .unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_generator_failure_propagates() {
        let generator = Arc::new(MockGenerator::scripted(vec![Err(AppError::AiTimeout {
            timeout_secs: 90,
        })]));
        let (analyzer, _) = analyzer(generator, empty_db());

        let err = analyzer
            .analyze(&user(false), build_pdf(&["x"]), "Sales")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Upstream(AppError::AiTimeout { .. })));
    }
}
