//! Structured contract report
//!
//! The typed shape the AI completion is parsed into before persistence.
//! Persisted rows carry the same data; see `db::models`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service tier controlling analysis depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn for_user(is_premium: bool) -> Self {
        if is_premium {
            Tier::Premium
        } else {
            Tier::Free
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a risk or impact of an opportunity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    /// Lenient parse; anything unrecognised is `Medium`
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" => Level::Low,
            "high" | "critical" | "severe" | "major" => Level::High,
            _ => Level::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskItem {
    pub risk: String,
    pub explanation: String,
    pub severity: Level,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityItem {
    pub opportunity: String,
    pub explanation: String,
    pub impact: Level,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialTermsItem {
    pub description: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationItem {
    pub base_salary: String,
    pub bonuses: String,
    pub equity: String,
    pub other_benefits: String,
}

/// Parsed AI analysis of one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub risks: Vec<RiskItem>,
    pub opportunities: Vec<OpportunityItem>,
    pub recommendations: Vec<String>,
    pub key_clauses: Vec<String>,
    pub legal_compliance: Option<String>,
    pub negotiation_points: Vec<String>,
    /// Duration normalised to months
    pub contract_duration_months: Option<i32>,
    /// Duration as the model phrased it
    pub contract_duration_text: Option<String>,
    pub termination_conditions: Option<String>,
    /// 1..=100
    pub overall_score: Option<i32>,
    pub financial_terms: Option<FinancialTermsItem>,
    pub compensation_structure: Option<CompensationItem>,
    pub performance_metrics: Vec<String>,
    pub specific_clauses: Option<String>,
}

impl AnalysisReport {
    /// Report with only the required fields populated
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            risks: Vec::new(),
            opportunities: Vec::new(),
            recommendations: Vec::new(),
            key_clauses: Vec::new(),
            legal_compliance: None,
            negotiation_points: Vec::new(),
            contract_duration_months: None,
            contract_duration_text: None,
            termination_conditions: None,
            overall_score: None,
            financial_terms: None,
            compensation_structure: None,
            performance_metrics: Vec::new(),
            specific_clauses: None,
        }
    }
}
