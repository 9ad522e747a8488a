//! Opportunity entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opportunities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub contract_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub opportunity: String,

    #[sea_orm(column_type = "Text")]
    pub explanation: String,

    /// low | medium | high
    #[sea_orm(column_type = "Text")]
    pub impact: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contract_analysis::Entity",
        from = "Column::ContractId",
        to = "super::contract_analysis::Column::Id",
        on_delete = "Cascade"
    )]
    ContractAnalysis,
}

impl Related<super::contract_analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContractAnalysis.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
