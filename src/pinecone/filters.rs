//! Metadata filter helpers for Pinecone similarity queries.

use serde_json::{Map, Value, json};

use crate::processing::types::Domain;

/// Compose the metadata filter applied to similarity queries.
///
/// Sibling keys combine as a conjunction, so a domain restriction and a
/// document id restriction narrow each other. Returns `None` when nothing
/// constrains the query.
pub fn build_metadata_filter(
    domain: Option<Domain>,
    document_ids: Option<&[String]>,
) -> Option<Value> {
    let mut filter = Map::new();

    if let Some(domain) = domain {
        filter.insert("domain".into(), json!({ "$eq": domain.as_str() }));
    }

    if let Some(ids) = document_ids {
        let cleaned: Vec<&str> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if !cleaned.is_empty() {
            filter.insert("document_id".into(), json!({ "$in": cleaned }));
        }
    }

    if filter.is_empty() {
        None
    } else {
        Some(Value::Object(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_handles_domain() {
        let filter = build_metadata_filter(Some(Domain::Insurance), None).expect("filter");
        assert_eq!(filter, json!({ "domain": { "$eq": "insurance" } }));
    }

    #[test]
    fn filter_handles_document_ids() {
        let ids = vec!["doc-1".to_string(), " doc-2 ".to_string(), "".to_string()];
        let filter = build_metadata_filter(None, Some(&ids)).expect("filter");
        assert_eq!(filter, json!({ "document_id": { "$in": ["doc-1", "doc-2"] } }));
    }

    #[test]
    fn filter_combines_constraints() {
        let ids = vec!["doc-9".to_string()];
        let filter = build_metadata_filter(Some(Domain::Legal), Some(&ids)).expect("filter");
        assert_eq!(
            filter,
            json!({
                "domain": { "$eq": "legal" },
                "document_id": { "$in": ["doc-9"] }
            })
        );
    }

    #[test]
    fn filter_returns_none_when_unconstrained() {
        assert!(build_metadata_filter(None, None).is_none());
        let empty: Vec<String> = vec!["  ".to_string()];
        assert!(build_metadata_filter(None, Some(&empty)).is_none());
    }
}
