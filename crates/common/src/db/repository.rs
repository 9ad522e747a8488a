//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::auth::ExternalIdentity;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::report::{AnalysisReport, Tier};
use crate::DEFAULT_LANGUAGE;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An analysis together with its child rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetail {
    #[serde(flatten)]
    pub analysis: ContractAnalysis,
    pub risks: Vec<Risk>,
    pub opportunities: Vec<Opportunity>,
    pub financial_terms: Option<FinancialTerms>,
    pub compensation_structure: Option<CompensationStructure>,
    pub feedback: Option<UserFeedback>,
}

impl AnalysisDetail {
    pub fn id(&self) -> Uuid {
        self.analysis.id
    }

    pub fn owner(&self) -> Uuid {
        self.analysis.user_id
    }
}

/// List row for a user's analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub contract_type: String,
    pub summary: String,
    pub overall_score: Option<i32>,
    pub tier: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<ContractAnalysis> for AnalysisSummary {
    fn from(model: ContractAnalysis) -> Self {
        Self {
            id: model.id,
            contract_type: model.contract_type,
            summary: model.summary,
            overall_score: model.overall_score,
            tier: model.tier,
            created_at: model.created_at,
        }
    }
}

fn string_list(items: &[String]) -> serde_json::Value {
    serde_json::Value::from(items.to_vec())
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by OAuth subject
    pub async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::GoogleId.eq(external_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Resolve a login identity to a user row, creating it on first sight
    pub async fn find_or_create_user(&self, identity: &ExternalIdentity) -> Result<User> {
        if let Some(user) = self.find_user_by_external_id(&identity.subject).await? {
            return Ok(user);
        }

        let now = chrono::Utc::now();
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            google_id: Set(identity.subject.clone()),
            email: Set(identity.email_or_default()),
            display_name: Set(identity.display_name_or_default()),
            profile_picture: Set(identity.picture.clone()),
            is_premium: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let user = user.insert(self.write_conn()).await?;
        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    // ========================================================================
    // Analysis Operations
    // ========================================================================

    /// Persist an analysis and all child rows in one transaction
    pub async fn create_analysis(
        &self,
        user_id: Uuid,
        contract_text: &str,
        contract_type: &str,
        tier: Tier,
        report: &AnalysisReport,
        ai_model: &str,
    ) -> Result<AnalysisDetail> {
        if report.summary.trim().is_empty() {
            return Err(AppError::Validation {
                message: "analysis summary must not be empty".to_string(),
                field: Some("summary".to_string()),
            });
        }

        let contract_id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let txn = self.write_conn().begin().await?;

        let analysis = ContractAnalysisActiveModel {
            id: Set(contract_id),
            user_id: Set(user_id),
            contract_text: Set(contract_text.to_string()),
            contract_type: Set(contract_type.to_string()),
            summary: Set(report.summary.clone()),
            recommendations: Set(string_list(&report.recommendations)),
            key_clauses: Set(string_list(&report.key_clauses)),
            legal_compliance: Set(report.legal_compliance.clone()),
            negotiation_points: Set(string_list(&report.negotiation_points)),
            contract_duration: Set(report.contract_duration_months),
            contract_duration_text: Set(report.contract_duration_text.clone()),
            termination_conditions: Set(report.termination_conditions.clone()),
            overall_score: Set(report.overall_score),
            performance_metrics: Set(string_list(&report.performance_metrics)),
            specific_clauses: Set(report.specific_clauses.clone()),
            tier: Set(tier.as_str().to_string()),
            language: Set(DEFAULT_LANGUAGE.to_string()),
            ai_model: Set(ai_model.to_string()),
            version: Set(1),
            expiration_date: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut risks = Vec::with_capacity(report.risks.len());
        for item in &report.risks {
            let risk = RiskActiveModel {
                id: Set(Uuid::new_v4()),
                contract_id: Set(contract_id),
                risk: Set(item.risk.clone()),
                explanation: Set(item.explanation.clone()),
                severity: Set(item.severity.into()),
            }
            .insert(&txn)
            .await?;
            risks.push(risk);
        }

        let mut opportunities = Vec::with_capacity(report.opportunities.len());
        for item in &report.opportunities {
            let opportunity = OpportunityActiveModel {
                id: Set(Uuid::new_v4()),
                contract_id: Set(contract_id),
                opportunity: Set(item.opportunity.clone()),
                explanation: Set(item.explanation.clone()),
                impact: Set(item.impact.into()),
            }
            .insert(&txn)
            .await?;
            opportunities.push(opportunity);
        }

        let financial_terms = match &report.financial_terms {
            Some(terms) => Some(
                FinancialTermsActiveModel {
                    id: Set(Uuid::new_v4()),
                    contract_id: Set(contract_id),
                    description: Set(terms.description.clone()),
                    details: Set(string_list(&terms.details)),
                }
                .insert(&txn)
                .await?,
            ),
            None => None,
        };

        let compensation_structure = match &report.compensation_structure {
            Some(comp) => Some(
                CompensationStructureActiveModel {
                    id: Set(Uuid::new_v4()),
                    contract_id: Set(contract_id),
                    base_salary: Set(comp.base_salary.clone()),
                    bonuses: Set(comp.bonuses.clone()),
                    equity: Set(comp.equity.clone()),
                    other_benefits: Set(comp.other_benefits.clone()),
                }
                .insert(&txn)
                .await?,
            ),
            None => None,
        };

        txn.commit().await?;

        tracing::info!(
            contract_id = %contract_id,
            user_id = %user_id,
            risks = risks.len(),
            opportunities = opportunities.len(),
            "Stored analysis"
        );

        Ok(AnalysisDetail {
            analysis,
            risks,
            opportunities,
            financial_terms,
            compensation_structure,
            feedback: None,
        })
    }

    /// List a user's analyses newest first, with the total count
    pub async fn list_analyses(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<AnalysisSummary>, u64)> {
        let query = ContractAnalysisEntity::find()
            .filter(ContractAnalysisColumn::UserId.eq(user_id));

        let total = query.clone().count(self.read_conn()).await?;

        let rows = query
            .order_by_desc(ContractAnalysisColumn::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((rows.into_iter().map(AnalysisSummary::from).collect(), total))
    }

    /// Find an analysis owned by a user
    pub async fn find_analysis(&self, id: Uuid, user_id: Uuid) -> Result<Option<ContractAnalysis>> {
        ContractAnalysisEntity::find_by_id(id)
            .filter(ContractAnalysisColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load an analysis and its child rows; `None` when absent or not owned
    pub async fn find_analysis_detail(&self, id: Uuid, user_id: Uuid) -> Result<Option<AnalysisDetail>> {
        let Some(analysis) = self.find_analysis(id, user_id).await? else {
            return Ok(None);
        };

        let conn = self.read_conn();
        let (risks, opportunities, financial_terms, compensation_structure, feedback) = futures::try_join!(
            RiskEntity::find()
                .filter(RiskColumn::ContractId.eq(id))
                .all(conn),
            OpportunityEntity::find()
                .filter(OpportunityColumn::ContractId.eq(id))
                .all(conn),
            FinancialTermsEntity::find()
                .filter(FinancialTermsColumn::ContractId.eq(id))
                .one(conn),
            CompensationStructureEntity::find()
                .filter(CompensationStructureColumn::ContractId.eq(id))
                .one(conn),
            UserFeedbackEntity::find()
                .filter(UserFeedbackColumn::ContractId.eq(id))
                .one(conn),
        )?;

        Ok(Some(AnalysisDetail {
            analysis,
            risks,
            opportunities,
            financial_terms,
            compensation_structure,
            feedback,
        }))
    }

    // ========================================================================
    // Feedback Operations
    // ========================================================================

    /// Insert or replace the feedback attached to an analysis
    pub async fn upsert_feedback(
        &self,
        contract_id: Uuid,
        rating: i32,
        comments: &str,
    ) -> Result<UserFeedback> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation {
                message: "rating must be between 1 and 5".to_string(),
                field: Some("rating".to_string()),
            });
        }

        let now = chrono::Utc::now();
        let existing = UserFeedbackEntity::find()
            .filter(UserFeedbackColumn::ContractId.eq(contract_id))
            .one(self.write_conn())
            .await?;

        let feedback = match existing {
            Some(row) => {
                let mut active: UserFeedbackActiveModel = row.into();
                active.rating = Set(rating);
                active.comments = Set(comments.to_string());
                active.updated_at = Set(now.into());
                active.update(self.write_conn()).await?
            }
            None => {
                UserFeedbackActiveModel {
                    id: Set(Uuid::new_v4()),
                    contract_id: Set(contract_id),
                    rating: Set(rating),
                    comments: Set(comments.to_string()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                }
                .insert(self.write_conn())
                .await?
            }
        };

        Ok(feedback)
    }
}
