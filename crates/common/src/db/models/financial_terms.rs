//! Financial terms entity (one per analysis)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_terms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub contract_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub details: Json,
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
