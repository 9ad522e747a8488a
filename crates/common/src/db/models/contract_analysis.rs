//! Contract analysis entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contract_analyses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub contract_text: String,

    #[sea_orm(column_type = "Text")]
    pub contract_type: String,

    #[sea_orm(column_type = "Text")]
    pub summary: String,

    /// JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub recommendations: Json,

    #[sea_orm(column_type = "JsonBinary")]
    pub key_clauses: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub legal_compliance: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub negotiation_points: Json,

    /// Months
    pub contract_duration: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub contract_duration_text: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub termination_conditions: Option<String>,

    pub overall_score: Option<i32>,

    #[sea_orm(column_type = "JsonBinary")]
    pub performance_metrics: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub specific_clauses: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub tier: String,

    #[sea_orm(column_type = "Text")]
    pub language: String,

    #[sea_orm(column_type = "Text")]
    pub ai_model: String,

    pub version: i32,

    pub expiration_date: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::risk::Entity")]
    Risks,

    #[sea_orm(has_many = "super::opportunity::Entity")]
    Opportunities,

    #[sea_orm(has_one = "super::financial_terms::Entity")]
    FinancialTerms,

    #[sea_orm(has_one = "super::compensation_structure::Entity")]
    CompensationStructure,

    #[sea_orm(has_one = "super::user_feedback::Entity")]
    UserFeedback,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::risk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Risks.def()
    }
}

impl Related<super::opportunity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Opportunities.def()
    }
}

impl Related<super::financial_terms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialTerms.def()
    }
}

impl Related<super::compensation_structure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompensationStructure.def()
    }
}

impl Related<super::user_feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserFeedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
