//! SeaORM entity models
//!
//! Database entities for ClauseLens

mod user;
mod contract_analysis;
mod risk;
mod opportunity;
mod financial_terms;
mod compensation_structure;
mod user_feedback;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use contract_analysis::{
    Entity as ContractAnalysisEntity,
    Model as ContractAnalysis,
    ActiveModel as ContractAnalysisActiveModel,
    Column as ContractAnalysisColumn,
};

pub use risk::{
    Entity as RiskEntity,
    Model as Risk,
    ActiveModel as RiskActiveModel,
    Column as RiskColumn,
};

pub use opportunity::{
    Entity as OpportunityEntity,
    Model as Opportunity,
    ActiveModel as OpportunityActiveModel,
    Column as OpportunityColumn,
};

pub use financial_terms::{
    Entity as FinancialTermsEntity,
    Model as FinancialTerms,
    ActiveModel as FinancialTermsActiveModel,
    Column as FinancialTermsColumn,
};

pub use compensation_structure::{
    Entity as CompensationStructureEntity,
    Model as CompensationStructure,
    ActiveModel as CompensationStructureActiveModel,
    Column as CompensationStructureColumn,
};

pub use user_feedback::{
    Entity as UserFeedbackEntity,
    Model as UserFeedback,
    ActiveModel as UserFeedbackActiveModel,
    Column as UserFeedbackColumn,
};
