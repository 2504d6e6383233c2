//! Prompt construction and response parsing for query analysis.
//!
//! The generation model is asked for a strict JSON object; models routinely
//! wrap it in prose or code fences, so parsing extracts the outermost brace
//! span before deserializing and falls back to a degraded rationale when
//! nothing usable comes back.

use serde::Deserialize;
use serde_json::Value;

use crate::processing::types::{DecisionRationale, Domain, RetrievalResult};

/// Parsed analysis produced from a generation response.
#[derive(Debug, Clone)]
pub(crate) struct LlmAnalysis {
    /// Direct answer to the query.
    pub(crate) answer: String,
    /// Structured justification for the answer.
    pub(crate) rationale: DecisionRationale,
}

/// Build the analysis prompt from the query and its retrieved context.
pub(crate) fn build_analysis_prompt(
    query: &str,
    hits: &[RetrievalResult],
    domain: Option<Domain>,
) -> String {
    let domain_name = domain.map(|d| d.as_str()).unwrap_or("various");
    let guidance = domain.map(domain_guidance).unwrap_or("");
    let context = prepare_context(hits);

    format!(
        "You are an expert document analyst specializing in {domain_name} domains.\n\
         Analyze the following query and provide a comprehensive, accurate response based on the retrieved context.\n\
         \n\
         {guidance}\n\
         \n\
         Query: {query}\n\
         \n\
         Retrieved Context:\n\
         {context}\n\
         \n\
         Provide your response in the following JSON format:\n\
         {{\n\
         \x20   \"answer\": \"Direct answer to the query\",\n\
         \x20   \"reasoning\": \"Detailed explanation of your analysis\",\n\
         \x20   \"confidence_score\": 0.0-1.0,\n\
         \x20   \"supporting_evidence\": [\"Evidence point 1\", \"Evidence point 2\"],\n\
         \x20   \"conditions\": [\"Condition 1\", \"Condition 2\"],\n\
         \x20   \"limitations\": [\"Limitation 1\", \"Limitation 2\"],\n\
         \x20   \"additional_considerations\": \"Any other relevant information\"\n\
         }}\n\
         \n\
         Important guidelines:\n\
         - Base your answer strictly on the provided context\n\
         - If information is insufficient, clearly state this\n\
         - Provide specific evidence from the documents\n\
         - Include relevant conditions and limitations\n\
         - Rate your confidence based on the clarity and completeness of the evidence\n"
    )
}

/// Analysis focus areas per business domain.
fn domain_guidance(domain: Domain) -> &'static str {
    match domain {
        Domain::Insurance => {
            "Focus on:\n\
             - Coverage details and limitations\n\
             - Exclusions and conditions\n\
             - Claim procedures and requirements\n\
             - Policy terms and definitions"
        }
        Domain::Legal => {
            "Focus on:\n\
             - Legal clauses and provisions\n\
             - Rights and obligations\n\
             - Compliance requirements\n\
             - Regulatory implications"
        }
        Domain::Hr => {
            "Focus on:\n\
             - Employee policies and procedures\n\
             - Benefits and entitlements\n\
             - Compliance with labor laws\n\
             - Performance and conduct standards"
        }
        Domain::Compliance => {
            "Focus on:\n\
             - Regulatory requirements\n\
             - Audit standards\n\
             - Risk assessments\n\
             - Compliance procedures"
        }
    }
}

/// Render retrieved chunks as numbered context sections.
fn prepare_context(hits: &[RetrievalResult]) -> String {
    let sections: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(index, hit)| {
            let filename = hit
                .metadata
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            format!(
                "Document {} (Relevance: {:.3}):\nSource: {}\nContent: {}\n",
                index + 1,
                hit.relevance_score,
                filename,
                hit.content
            )
        })
        .collect();
    sections.join("\n---\n")
}

/// Parse a generation response into an analysis, degrading gracefully.
///
/// Any parse failure produces the fallback rationale instead of an error so
/// that retrieval results still reach the caller.
pub(crate) fn parse_analysis(raw: &str) -> LlmAnalysis {
    match try_parse(raw) {
        Some(analysis) => analysis,
        None => {
            tracing::warn!("Could not parse analysis response; using fallback rationale");
            LlmAnalysis {
                answer: "Error processing response".to_string(),
                rationale: DecisionRationale {
                    reasoning: "Unable to parse LLM response".to_string(),
                    confidence_score: 0.0,
                    supporting_evidence: Vec::new(),
                    conditions: Vec::new(),
                    limitations: vec!["Response parsing failed".to_string()],
                },
            }
        }
    }
}

fn try_parse(raw: &str) -> Option<LlmAnalysis> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let parsed: RawAnalysis = serde_json::from_str(&raw[start..=end]).ok()?;
    Some(LlmAnalysis {
        answer: parsed
            .answer
            .unwrap_or_else(|| "Unable to provide answer".to_string()),
        rationale: DecisionRationale {
            reasoning: parsed
                .reasoning
                .unwrap_or_else(|| "No reasoning provided".to_string()),
            confidence_score: parsed.confidence_score.unwrap_or(0.0).clamp(0.0, 1.0),
            supporting_evidence: parsed.supporting_evidence.unwrap_or_default(),
            conditions: parsed.conditions.unwrap_or_default(),
            limitations: parsed.limitations.unwrap_or_default(),
        },
    })
}

#[derive(Deserialize)]
struct RawAnalysis {
    answer: Option<String>,
    reasoning: Option<String>,
    confidence_score: Option<f32>,
    supporting_evidence: Option<Vec<String>>,
    conditions: Option<Vec<String>>,
    limitations: Option<Vec<String>>,
}
