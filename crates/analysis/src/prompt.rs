//! Prompt construction for contract-type detection and analysis

use clauselens_common::report::Tier;

/// Contract types that also get a compensation breakdown
const EMPLOYMENT_MARKERS: &[&str] = &["employment", "employee", "offer letter", "contractor", "consulting"];

/// First `max_chars` characters, cut on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn is_employment_type(contract_type: &str) -> bool {
    let lowered = contract_type.to_lowercase();
    EMPLOYMENT_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Ask for the contract type as a bare string
pub fn build_detection_prompt(contract_text: &str, excerpt_chars: usize) -> String {
    format!(
        r#"Analyze the following contract text and determine the type of contract it is.
Provide only the contract type as a single string (e.g., "Employment", "Non-Disclosure Agreement", "Sales", "Lease", etc.).
Do not include any additional explanation or text.

Contract text:
{}
"#,
        truncate_chars(contract_text, excerpt_chars)
    )
}

fn premium_instructions(contract_type: &str) -> String {
    let compensation_item = if is_employment_type(contract_type) {
        "\n14. A breakdown of the compensation structure: base salary, bonuses, equity, and other benefits."
    } else {
        ""
    };
    let compensation_shape = if is_employment_type(contract_type) {
        r#",
  "compensationStructure": {
    "baseSalary": "Base salary",
    "bonuses": "Bonus structure",
    "equity": "Equity or stock options",
    "otherBenefits": "Other benefits"
  }"#
    } else {
        ""
    };

    format!(
        r#"Analyze the following {contract_type} contract and provide:
1. A list of at least 10 potential risks for the party receiving the contract, each with a brief explanation and severity level (low, medium, high).
2. A list of at least 10 potential opportunities or benefits for the receiving party, each with a brief explanation and impact level (low, medium, high).
3. A comprehensive summary of the contract, including key terms and conditions.
4. Any recommendations for improving the contract from the receiving party's perspective.
5. A list of key clauses in the contract.
6. An assessment of the contract's legal compliance.
7. A list of potential negotiation points.
8. The contract duration or term, if applicable.
9. A summary of termination conditions, if applicable.
10. A breakdown of any financial terms, if applicable.
11. Any performance metrics or KPIs mentioned, if applicable.
12. A summary of any specific clauses relevant to this type of contract (e.g., intellectual property for employment contracts, warranties for sales contracts).
13. An overall score from 1 to 100, with 100 being the highest. This score represents the overall favorability of the contract based on the identified risks and opportunities.{compensation_item}

Format your response as a JSON object with the following structure:
{{
  "risks": [{{"risk": "Risk description", "explanation": "Brief explanation", "severity": "low|medium|high"}}],
  "opportunities": [{{"opportunity": "Opportunity description", "explanation": "Brief explanation", "impact": "low|medium|high"}}],
  "summary": "Comprehensive summary of the contract",
  "recommendations": ["Recommendation 1", "Recommendation 2"],
  "keyClauses": ["Clause 1", "Clause 2"],
  "legalCompliance": "Assessment of legal compliance",
  "negotiationPoints": ["Point 1", "Point 2"],
  "contractDuration": "Duration of the contract, if applicable",
  "terminationConditions": "Summary of termination conditions, if applicable",
  "overallScore": "Overall score from 1 to 100",
  "financialTerms": {{
    "description": "Overview of financial terms",
    "details": ["Detail 1", "Detail 2"]
  }},
  "performanceMetrics": ["Metric 1", "Metric 2"],
  "specificClauses": "Summary of clauses specific to this contract type"{compensation_shape}
}}
"#
    )
}

fn free_instructions(contract_type: &str) -> String {
    format!(
        r#"Analyze the following {contract_type} contract and provide:
1. A list of at least 5 potential risks for the party receiving the contract, each with a brief explanation and severity level (low, medium, high).
2. A list of at least 5 potential opportunities or benefits for the receiving party, each with a brief explanation and impact level (low, medium, high).
3. A brief summary of the contract.
4. An overall score from 1 to 100, with 100 being the highest. This score represents the overall favorability of the contract based on the identified risks and opportunities.

Format your response as a JSON object with the following structure:
{{
  "risks": [{{"risk": "Risk description", "explanation": "Brief explanation", "severity": "low|medium|high"}}],
  "opportunities": [{{"opportunity": "Opportunity description", "explanation": "Brief explanation", "impact": "low|medium|high"}}],
  "summary": "Brief summary of the contract",
  "overallScore": "Overall score from 1 to 100"
}}
"#
    )
}

/// Full analysis prompt for a tier; `contract_text` should already be truncated
pub fn build_analysis_prompt(contract_text: &str, tier: Tier, contract_type: &str) -> String {
    let contract_type = contract_type.trim();
    let mut prompt = match tier {
        Tier::Premium => premium_instructions(contract_type),
        Tier::Free => free_instructions(contract_type),
    };

    prompt.push_str(
        "\nImportant: Provide only the JSON object in your response, without any additional text or formatting.\n\nContract text:\n",
    );
    prompt.push_str(contract_text);
    prompt.push('\n');
    prompt
}
