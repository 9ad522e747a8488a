//! Shared fixtures for unit tests

use clauselens_common::cache::{Cache, MemoryBackend};
use clauselens_common::db::models::{ContractAnalysis, Risk, User};
use clauselens_common::db::{AnalysisDetail, DbPool, Repository};
use sea_orm::{DatabaseBackend, MockDatabase};
use std::sync::Arc;
use uuid::Uuid;

pub fn user(is_premium: bool) -> User {
    let now = chrono::Utc::now();
    User {
        id: Uuid::new_v4(),
        google_id: format!("g-{}", Uuid::new_v4()),
        email: "reader@example.com".into(),
        display_name: "Reader".into(),
        profile_picture: None,
        is_premium,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

pub fn analysis(id: Uuid, user_id: Uuid) -> ContractAnalysis {
    ContractAnalysis {
        id,
        user_id,
        contract_text: "Hello World!".into(),
        contract_type: "Non-Disclosure Agreement".into(),
        summary: "Mutual NDA.".into(),
        recommendations: serde_json::json!(["Narrow the definition"]),
        key_clauses: serde_json::json!([]),
        legal_compliance: None,
        negotiation_points: serde_json::json!([]),
        contract_duration: Some(24),
        contract_duration_text: Some("2 years".into()),
        termination_conditions: None,
        overall_score: Some(72),
        performance_metrics: serde_json::json!([]),
        specific_clauses: None,
        tier: "free".into(),
        language: "en".into(),
        ai_model: "mock-generator".into(),
        version: 1,
        expiration_date: None,
        created_at: chrono::Utc::now().into(),
    }
}

pub fn risk(contract_id: Uuid, severity: &str) -> Risk {
    Risk {
        id: Uuid::new_v4(),
        contract_id,
        risk: "Broad definition".into(),
        explanation: "Covers everything.".into(),
        severity: severity.into(),
    }
}

pub fn detail(user_id: Uuid) -> AnalysisDetail {
    let id = Uuid::new_v4();
    AnalysisDetail {
        analysis: analysis(id, user_id),
        risks: vec![risk(id, "high")],
        opportunities: Vec::new(),
        financial_terms: None,
        compensation_structure: None,
        feedback: None,
    }
}

pub fn repository(db: MockDatabase) -> Repository {
    Repository::new(DbPool::from_connection(db.into_connection()))
}

pub fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

pub fn memory_cache() -> (Cache, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    (Cache::with_backend(backend.clone(), "test", 60), backend)
}
