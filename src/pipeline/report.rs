// src/pipeline/report.rs

//! Per-document result lines and the run summary.

use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{BatchResult, BatchStatus};

/// One output line describing the fate of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// 0-based position in the result stream
    pub index: usize,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRecord {
    pub fn new(index: usize, result: &Result<BatchResult>) -> Self {
        match result {
            Ok(result) => Self {
                index,
                status: result.status,
                id: Some(result.id.clone()),
                page_uri: None,
                error: None,
            },
            Err(err) => {
                let id = match err.root() {
                    AppError::FailedBulkAction { id, .. } => Some(id.clone()),
                    _ => None,
                };
                Self {
                    index,
                    status: BatchStatus::Error,
                    id,
                    page_uri: err.page_uri().map(str::to_owned),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Serialize as a single JSON line.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Pair every result with its record, numbered from 0 in stream order.
pub fn number_results<S>(results: S) -> impl Stream<Item = (Result<BatchResult>, ResultRecord)>
where
    S: Stream<Item = Result<BatchResult>>,
{
    results.enumerate().map(|(index, result)| {
        let record = ResultRecord::new(index, &result);
        (result, record)
    })
}

/// Counts of a finished (or interrupted) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub succeeded: usize,
    /// Pages that never produced a document
    pub page_failures: usize,
    /// Documents the search engine refused
    pub bulk_failures: usize,
}

impl RunSummary {
    pub fn record(&mut self, result: &Result<BatchResult>) {
        match result {
            Ok(r) if r.status == BatchStatus::Success => self.succeeded += 1,
            Ok(_) => self.bulk_failures += 1,
            Err(err) if matches!(err.root(), AppError::FailedBulkAction { .. }) => {
                self.bulk_failures += 1
            }
            Err(_) => self.page_failures += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.page_failures + self.bulk_failures
    }

    pub fn failed(&self) -> usize {
        self.page_failures + self.bulk_failures
    }

    pub fn log(&self) {
        log::info!(
            "Reindex finished: {} documents, {} succeeded, {} page failures, {} bulk failures",
            self.total(),
            self.succeeded,
            self.page_failures,
            self.bulk_failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_record() {
        let record = ResultRecord::new(0, &Ok(BatchResult::success("foo.com/pages/1")));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"index": 0, "status": "success", "id": "foo.com/pages/1"})
        );
    }

    #[test]
    fn test_page_failure_record() {
        let err = AppError::NotFound {
            url: "http://cms/pages/2.json".into(),
        }
        .tag_page("foo.com/pages/2");
        let record = ResultRecord::new(2, &Err(err));

        assert_eq!(record.status, BatchStatus::Error);
        assert_eq!(record.page_uri.as_deref(), Some("foo.com/pages/2"));
        assert_eq!(record.id, None);
        let line = record.to_json_line().unwrap();
        assert!(line.contains("\"pageUri\":\"foo.com/pages/2\""));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_bulk_failure_record() {
        let err = AppError::failed_bulk_action("foo.com/pages/3", Some(400), "bad field");
        let record = ResultRecord::new(3, &Err(err));
        assert_eq!(record.id.as_deref(), Some("foo.com/pages/3"));
        assert_eq!(
            record.error.as_deref(),
            Some("Elastic batch action failed on foo.com/pages/3 (400): bad field")
        );
    }

    #[tokio::test]
    async fn test_records_are_numbered_from_zero() {
        let results = futures::stream::iter(vec![
            Ok(BatchResult::success("a")),
            Err(AppError::failed_bulk_action("b", None, "x")),
        ]);
        let indexes: Vec<usize> = number_results(results)
            .map(|(_, record)| record.index)
            .collect()
            .await;
        assert_eq!(indexes, vec![0, 1]);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.record(&Ok(BatchResult::success("a")));
        summary.record(&Err(AppError::failed_bulk_action("b", None, "x")));
        summary.record(&Err(AppError::validation("y").tag_page("c")));

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.bulk_failures, 1);
        assert_eq!(summary.page_failures, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.failed(), 2);
    }
}
