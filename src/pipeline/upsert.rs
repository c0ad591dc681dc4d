// src/pipeline/upsert.rs

//! Batched upserts into the search index.
//!
//! Documents are grouped into bulk requests of at most `batch_size`.
//! Upstream errors pass straight through without occupying a slot in a
//! batch, and every document written yields exactly one result.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::{Stream, StreamExt, stream};

use crate::error::{AppError, Result};
use crate::models::{BatchResult, BulkResponse, ElasticDoc, docs_to_bulk_actions};
use crate::services::SearchBackend;

struct UpsertState<S> {
    docs: S,
    backend: Arc<dyn SearchBackend>,
    index: String,
    batch_size: usize,
    batch: Vec<ElasticDoc>,
    pending: VecDeque<Result<BatchResult>>,
    exhausted: bool,
    batches: usize,
}

impl<S> UpsertState<S> {
    async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let docs = std::mem::take(&mut self.batch);
        self.batches += 1;
        let results = commit_batch(self.backend.as_ref(), &self.index, docs, self.batches).await;
        self.pending.extend(results);
    }
}

/// Upsert every successful document from `docs` into `index`.
///
/// Results arrive in batch order. Errors from `docs` are emitted as soon
/// as they are read.
pub fn put_docs<S>(
    backend: Arc<dyn SearchBackend>,
    index: impl Into<String>,
    batch_size: usize,
    docs: S,
) -> impl Stream<Item = Result<BatchResult>>
where
    S: Stream<Item = Result<ElasticDoc>> + Unpin,
{
    let state = UpsertState {
        docs,
        backend,
        index: index.into(),
        batch_size: batch_size.max(1),
        batch: Vec::new(),
        pending: VecDeque::new(),
        exhausted: false,
        batches: 0,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(result) = state.pending.pop_front() {
                return Some((result, state));
            }
            if state.exhausted {
                return None;
            }
            match state.docs.next().await {
                Some(Ok(doc)) => {
                    state.batch.push(doc);
                    if state.batch.len() >= state.batch_size {
                        state.flush().await;
                    }
                }
                Some(Err(err)) => state.pending.push_back(Err(err)),
                None => {
                    state.exhausted = true;
                    state.flush().await;
                }
            }
        }
    })
}

/// Write one batch and reduce the response to one result per document.
async fn commit_batch(backend: &dyn SearchBackend, index: &str, docs: Vec<ElasticDoc>, number: usize) -> Vec<Result<BatchResult>> {
    let ids: Vec<String> = docs.iter().map(|doc| doc.id().to_string()).collect();
    log::info!("Committing batch {} ({} documents) to {}", number, ids.len(), index);

    match backend.bulk(docs_to_bulk_actions(docs, index)).await {
        Ok(response) => reduce_bulk_response(response, &ids),
        Err(err) => {
            log::error!("Batch {} failed: {}", number, err);
            let status = match &err {
                AppError::RequestFailed { status, .. } => *status,
                _ => None,
            };
            ids.into_iter()
                .map(|id| Err(AppError::failed_bulk_action(id, status, &err)))
                .collect()
        }
    }
}

/// Map each bulk item to a success or a [`AppError::FailedBulkAction`].
///
/// Documents the response does not mention are reported as failed.
fn reduce_bulk_response(response: BulkResponse, ids: &[String]) -> Vec<Result<BatchResult>> {
    let mut seen = HashSet::new();
    let mut results: Vec<Result<BatchResult>> = response
        .items
        .iter()
        .filter_map(|item| item.status())
        .map(|status| {
            seen.insert(status.id.clone());
            if status.is_success() {
                Ok(BatchResult::success(status.id.clone()))
            } else {
                log::warn!("Upsert of {} failed: {}", status.id, status.reason());
                Err(AppError::failed_bulk_action(
                    status.id.clone(),
                    Some(status.status),
                    status.reason(),
                ))
            }
        })
        .collect();

    results.extend(
        ids.iter()
            .filter(|id| !seen.contains(*id))
            .map(|id| Err(AppError::failed_bulk_action(id.clone(), None, "missing from bulk response"))),
    );
    results
}
