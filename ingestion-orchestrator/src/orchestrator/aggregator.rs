use std::collections::HashSet;

use common::types::{
    batch::{BatchResult, ExtractedDocument},
    document::FailedDocument,
};
use tracing::debug;

/// Per-batch outcomes merged into one job-level view.
#[derive(Debug, Default)]
pub struct MergedResults {
    pub documents: Vec<ExtractedDocument>,
    pub failures: Vec<FailedDocument>,
}

impl MergedResults {
    pub fn failed_names(&self) -> HashSet<String> {
        self.failures
            .iter()
            .map(|failure| failure.document_name.clone())
            .collect()
    }
}

/// Merges batch results ordered by batch number, so job output is stable
/// regardless of completion order under parallel execution. Failure records
/// are deduplicated by document name; the first record for a name wins.
pub fn merge_batch_results(mut results: Vec<BatchResult>) -> MergedResults {
    results.sort_by_key(|result| result.number);

    let mut merged = MergedResults::default();
    let mut seen_failures: HashSet<String> = HashSet::new();

    for result in results {
        merged.documents.extend(result.documents);
        for failure in result.failures {
            if seen_failures.insert(failure.document_name.clone()) {
                merged.failures.push(failure);
            } else {
                debug!(
                    document_name = %failure.document_name,
                    "dropping duplicate failure record"
                );
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::batch::{ContentElement, ElementKind};

    fn document(name: &str) -> ExtractedDocument {
        ExtractedDocument {
            source_name: name.to_string(),
            elements: vec![ContentElement {
                kind: ElementKind::Text,
                content: String::new(),
                metadata: serde_json::Value::Null,
            }],
        }
    }

    #[test]
    fn results_are_ordered_by_batch_number_not_completion_order() {
        let results = vec![
            BatchResult {
                number: 3,
                documents: vec![document("c.pdf")],
                failures: Vec::new(),
            },
            BatchResult {
                number: 1,
                documents: vec![document("a.pdf")],
                failures: Vec::new(),
            },
            BatchResult {
                number: 2,
                documents: vec![document("b.pdf")],
                failures: vec![FailedDocument::new("x.pdf", "extraction error")],
            },
        ];

        let merged = merge_batch_results(results);

        assert_eq!(
            merged
                .documents
                .iter()
                .map(|doc| doc.source_name.as_str())
                .collect::<Vec<_>>(),
            vec!["a.pdf", "b.pdf", "c.pdf"]
        );
        assert_eq!(merged.failures.len(), 1);
    }

    #[test]
    fn duplicate_failures_keep_the_first_record() {
        let results = vec![
            BatchResult {
                number: 1,
                documents: Vec::new(),
                failures: vec![FailedDocument::new("dup.pdf", "first reason")],
            },
            BatchResult {
                number: 2,
                documents: Vec::new(),
                failures: vec![
                    FailedDocument::new("dup.pdf", "second reason"),
                    FailedDocument::new("other.pdf", "another reason"),
                ],
            },
        ];

        let merged = merge_batch_results(results);

        assert_eq!(merged.failures.len(), 2);
        assert_eq!(merged.failures[0].document_name, "dup.pdf");
        assert_eq!(merged.failures[0].error_message, "first reason");
        assert!(merged.failed_names().contains("other.pdf"));
    }
}
