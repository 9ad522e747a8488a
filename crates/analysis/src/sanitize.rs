//! Completion cleanup and parsing
//!
//! Models wrap JSON in markdown fences, leave trailing commas and mix
//! numbers with strings. Everything here is best effort: only a missing
//! summary, risk list or opportunity list rejects a completion.

use crate::errors::AnalysisError;
use crate::prompt::truncate_chars;
use clauselens_common::report::{
    AnalysisReport, CompensationItem, FinancialTermsItem, Level, OpportunityItem, RiskItem,
};
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const MAX_CONTRACT_TYPE_CHARS: usize = 100;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z]*").expect("valid regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("valid regex"))
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\)?[\s-]*(years?|yrs?|months?|mos?|weeks?|wks?|days?)\b")
            .expect("valid regex")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"))
}

/// Strip fences and surrounding prose, leaving the outermost JSON object
pub fn strip_markdown(completion: &str) -> String {
    let unfenced = fence_re().replace_all(completion, "");
    let trimmed = unfenced.trim();

    let body = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    };

    trailing_comma_re().replace_all(body, "$1").into_owned()
}

/// Label from a detection completion
pub fn clean_contract_type(completion: &str) -> Result<String, AnalysisError> {
    let unfenced = fence_re().replace_all(completion, "");
    let line = unfenced
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    let line = strip_prefix_ci(line, "contract type:").unwrap_or(line);
    let cleaned = line.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '.' | ',' | ':' | ';')
    });

    if cleaned.is_empty() {
        return Err(AnalysisError::MalformedResponse {
            message: "empty contract type".to_string(),
        });
    }

    Ok(truncate_chars(cleaned, MAX_CONTRACT_TYPE_CHARS).to_string())
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| s[prefix.len()..].trim())
}

/// Parse a completion into a typed report
pub fn parse_report(completion: &str) -> Result<AnalysisReport, AnalysisError> {
    let cleaned = strip_markdown(completion);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| AnalysisError::MalformedResponse {
        message: format!("invalid JSON: {}", e),
    })?;

    let obj = value.as_object().ok_or_else(|| AnalysisError::MalformedResponse {
        message: "top-level value is not an object".to_string(),
    })?;

    let summary = text_field(obj, "summary").ok_or_else(|| AnalysisError::IncompleteReport {
        field: "summary".to_string(),
    })?;

    let risks = obj
        .get("risks")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalysisError::IncompleteReport { field: "risks".to_string() })?
        .iter()
        .filter_map(parse_risk)
        .collect();

    let opportunities = obj
        .get("opportunities")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalysisError::IncompleteReport {
            field: "opportunities".to_string(),
        })?
        .iter()
        .filter_map(parse_opportunity)
        .collect();

    let contract_duration_text = text_field(obj, "contractDuration");
    let contract_duration_months = obj.get("contractDuration").and_then(parse_duration_months);

    Ok(AnalysisReport {
        summary,
        risks,
        opportunities,
        recommendations: string_list(obj.get("recommendations")),
        key_clauses: string_list(obj.get("keyClauses")),
        legal_compliance: text_field(obj, "legalCompliance"),
        negotiation_points: string_list(obj.get("negotiationPoints")),
        contract_duration_months,
        contract_duration_text,
        termination_conditions: text_field(obj, "terminationConditions"),
        overall_score: obj.get("overallScore").and_then(parse_score),
        financial_terms: obj.get("financialTerms").and_then(parse_financial_terms),
        compensation_structure: obj.get("compensationStructure").and_then(parse_compensation),
        performance_metrics: string_list(obj.get("performanceMetrics")),
        specific_clauses: text_field(obj, "specificClauses"),
    })
}

/// Non-blank string; numbers are rendered as text
fn as_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(as_text)
}

fn text_or_empty(obj: &Map<String, Value>, key: &str) -> String {
    text_field(obj, key).unwrap_or_default()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(as_text).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn level(obj: &Map<String, Value>, key: &str) -> Level {
    obj.get(key)
        .and_then(Value::as_str)
        .map(Level::parse_lenient)
        .unwrap_or_default()
}

fn parse_risk(value: &Value) -> Option<RiskItem> {
    match value {
        Value::Object(obj) => Some(RiskItem {
            risk: text_field(obj, "risk").or_else(|| text_field(obj, "description"))?,
            explanation: text_or_empty(obj, "explanation"),
            severity: level(obj, "severity"),
        }),
        Value::String(s) if !s.trim().is_empty() => Some(RiskItem {
            risk: s.trim().to_string(),
            explanation: String::new(),
            severity: Level::Medium,
        }),
        _ => None,
    }
}

fn parse_opportunity(value: &Value) -> Option<OpportunityItem> {
    match value {
        Value::Object(obj) => Some(OpportunityItem {
            opportunity: text_field(obj, "opportunity").or_else(|| text_field(obj, "description"))?,
            explanation: text_or_empty(obj, "explanation"),
            impact: level(obj, "impact"),
        }),
        Value::String(s) if !s.trim().is_empty() => Some(OpportunityItem {
            opportunity: s.trim().to_string(),
            explanation: String::new(),
            impact: Level::Medium,
        }),
        _ => None,
    }
}

fn parse_financial_terms(value: &Value) -> Option<FinancialTermsItem> {
    let obj = value.as_object()?;
    Some(FinancialTermsItem {
        description: text_or_empty(obj, "description"),
        details: string_list(obj.get("details")),
    })
}

fn parse_compensation(value: &Value) -> Option<CompensationItem> {
    let obj = value.as_object()?;
    Some(CompensationItem {
        base_salary: text_or_empty(obj, "baseSalary"),
        bonuses: text_or_empty(obj, "bonuses"),
        equity: text_or_empty(obj, "equity"),
        other_benefits: text_or_empty(obj, "otherBenefits"),
    })
}

/// Number or numeric string, clamped to 1..=100
pub fn parse_score(value: &Value) -> Option<i32> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => number_re().find(s)?.as_str().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some((raw.round() as i64).clamp(1, 100) as i32)
}

/// Free-text duration to whole months; a bare number is taken as months
pub fn parse_duration_months(value: &Value) -> Option<i32> {
    let (amount, unit) = match value {
        Value::Number(n) => (n.as_f64()?, String::new()),
        Value::String(s) => match duration_re().captures(s) {
            Some(caps) => {
                let amount = caps.get(1)?.as_str().parse::<f64>().ok()?;
                let unit = caps.get(2)?.as_str().to_ascii_lowercase();
                (amount, unit)
            }
            // Without a unit only a bare number counts
            None => (s.trim().parse::<f64>().ok()?, String::new()),
        },
        _ => return None,
    };

    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }

    let months = if unit.starts_with('y') {
        amount * 12.0
    } else if unit.starts_with('w') {
        amount * 7.0 / 30.0
    } else if unit.starts_with('d') {
        amount / 30.0
    } else {
        amount
    };

    Some((months.round() as i64).clamp(1, i32::MAX as i64) as i32)
}
