//! Submit accepted records to the backend in fixed-size batches
//!
//! Batches are sent one after another. A failing batch stops the upload;
//! batches already sent stay committed, and their ids are returned so the
//! import can still be undone.

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;

use crate::api::Backend;
use crate::types::{RecordDraft, RecordId, RecordKind};

/// Records per backend call
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Anything that can insert a batch of records and return their ids
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert_batch(&self, kind: RecordKind, records: &[RecordDraft]) -> Result<Vec<RecordId>>;
}

#[async_trait]
impl<B: Backend + ?Sized> RecordSink for B {
    async fn insert_batch(&self, kind: RecordKind, records: &[RecordDraft]) -> Result<Vec<RecordId>> {
        self.insert_records(kind, records).await
    }
}

/// The batch that stopped an upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    /// 0-based batch number
    pub batch_index: usize,
    pub batch_len: usize,
    pub message: String,
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "batch {} ({} records) failed: {}",
            self.batch_index + 1,
            self.batch_len,
            self.message
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadOutcome {
    /// Ids of committed records, in input order. After an id count
    /// mismatch this also holds the ids the failing batch did return.
    pub ids: Vec<RecordId>,
    pub batches_submitted: usize,
    pub failure: Option<BatchFailure>,
}

impl UploadOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchUploader {
    batch_size: usize,
}

impl Default for BatchUploader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchUploader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of backend calls needed for `records` records
    pub fn batch_count(&self, records: usize) -> usize {
        records.div_ceil(self.batch_size)
    }

    /// Upload records sequentially, one call per chunk
    pub async fn upload<S: RecordSink + ?Sized>(
        &self,
        sink: &S,
        kind: RecordKind,
        records: &[RecordDraft],
    ) -> UploadOutcome {
        let total_batches = self.batch_count(records.len());
        let mut outcome = UploadOutcome {
            ids: Vec::with_capacity(records.len()),
            ..Default::default()
        };

        for (batch_index, chunk) in records.chunks(self.batch_size).enumerate() {
            outcome.batches_submitted += 1;

            let result = sink.insert_batch(kind, chunk).await;

            match result {
                Ok(ids) if ids.len() == chunk.len() => {
                    info!(
                        "Uploaded batch {}/{} ({} {} records)",
                        batch_index + 1,
                        total_batches,
                        chunk.len(),
                        kind.tag()
                    );
                    info!(
                        "Batch {} ids: {}",
                        batch_index + 1,
                        ids.iter().map(RecordId::as_str).collect::<Vec<_>>().join(",")
                    );
                    outcome.ids.extend(ids);
                }
                Ok(ids) => {
                    // Chunk is committed; keep the ids that came back
                    let message = format!(
                        "backend returned {} ids for {} records",
                        ids.len(),
                        chunk.len()
                    );
                    warn!("Batch {}/{}: {}", batch_index + 1, total_batches, message);
                    outcome.ids.extend(ids);
                    outcome.failure = Some(BatchFailure {
                        batch_index,
                        batch_len: chunk.len(),
                        message,
                    });
                    break;
                }
                Err(e) => {
                    warn!(
                        "Batch {}/{} failed after {} committed records: {:#}",
                        batch_index + 1,
                        total_batches,
                        outcome.ids.len(),
                        e
                    );
                    outcome.failure = Some(BatchFailure {
                        batch_index,
                        batch_len: chunk.len(),
                        message: format!("{:#}", e),
                    });
                    break;
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Hands out sequential ids and remembers each call's size
    #[derive(Default)]
    struct CountingSink {
        calls: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
        short_ids: bool,
    }

    #[async_trait]
    impl RecordSink for CountingSink {
        async fn insert_batch(
            &self,
            _kind: RecordKind,
            records: &[RecordDraft],
        ) -> Result<Vec<RecordId>> {
            let mut calls = self.calls.lock().unwrap();
            let call = calls.len();
            calls.push(records.len());
            if self.fail_on_call == Some(call) {
                anyhow::bail!("backend unavailable");
            }
            let mut ids: Vec<RecordId> = records
                .iter()
                .map(|r| RecordId::new(format!("id-{}", r.name)))
                .collect();
            if self.short_ids {
                ids.pop();
            }
            Ok(ids)
        }
    }

    fn drafts(n: usize) -> Vec<RecordDraft> {
        (0..n).map(|i| RecordDraft::new(format!("r{}", i))).collect()
    }

    #[tokio::test]
    async fn test_batches_and_order() {
        for n in [0usize, 1, 49, 50, 51, 120, 150] {
            let sink = CountingSink::default();
            let records = drafts(n);
            let outcome = BatchUploader::default()
                .upload(&sink, RecordKind::Farmer, &records)
                .await;

            let calls = sink.calls.lock().unwrap().clone();
            assert_eq!(calls.len(), n.div_ceil(50), "calls for {}", n);
            assert!(calls.iter().all(|size| *size <= 50));
            assert_eq!(outcome.ids.len(), n);
            assert_eq!(outcome.batches_submitted, calls.len());
            assert!(outcome.is_complete());

            let expected: Vec<RecordId> = (0..n).map(|i| RecordId::new(format!("id-r{}", i))).collect();
            assert_eq!(outcome.ids, expected);
        }
    }

    #[tokio::test]
    async fn test_last_chunk_smaller() {
        let sink = CountingSink::default();
        BatchUploader::new(50)
            .upload(&sink, RecordKind::Farmer, &drafts(120))
            .await;
        assert_eq!(*sink.calls.lock().unwrap(), vec![50, 50, 20]);
    }

    #[tokio::test]
    async fn test_failure_keeps_committed_ids() {
        let sink = CountingSink {
            fail_on_call: Some(1),
            ..Default::default()
        };
        let outcome = BatchUploader::new(50)
            .upload(&sink, RecordKind::AgroProcessor, &drafts(120))
            .await;

        assert_eq!(sink.calls.lock().unwrap().len(), 2);
        assert_eq!(outcome.ids.len(), 50);
        assert_eq!(outcome.ids[0], RecordId::new("id-r0"));
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.batch_index, 1);
        assert_eq!(failure.batch_len, 50);
        assert!(failure.message.contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_id_count_mismatch_keeps_returned_ids() {
        let sink = CountingSink {
            short_ids: true,
            ..Default::default()
        };
        let outcome = BatchUploader::new(3)
            .upload(&sink, RecordKind::Farmer, &drafts(5))
            .await;

        // Upload stops at the first batch, but its returned ids are kept
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
        assert_eq!(outcome.ids, vec![RecordId::new("id-r0"), RecordId::new("id-r1")]);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.batch_index, 0);
        assert!(failure.message.contains("2 ids for 3 records"));
    }

    #[tokio::test]
    async fn test_mismatch_after_good_batch() {
        #[derive(Default)]
        struct ShortSecondCall {
            calls: Mutex<usize>,
        }

        #[async_trait]
        impl RecordSink for ShortSecondCall {
            async fn insert_batch(
                &self,
                _kind: RecordKind,
                records: &[RecordDraft],
            ) -> Result<Vec<RecordId>> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                let take = if *calls == 2 { records.len() - 1 } else { records.len() };
                Ok(records
                    .iter()
                    .take(take)
                    .map(|r| RecordId::new(r.name.clone()))
                    .collect())
            }
        }

        let sink = ShortSecondCall::default();
        let outcome = BatchUploader::new(2)
            .upload(&sink, RecordKind::Farmer, &drafts(6))
            .await;

        assert_eq!(*sink.calls.lock().unwrap(), 2);
        assert_eq!(
            outcome.ids,
            vec![RecordId::new("r0"), RecordId::new("r1"), RecordId::new("r2")]
        );
        assert_eq!(outcome.failure.unwrap().batch_index, 1);
    }

    #[test]
    fn test_batch_count() {
        let uploader = BatchUploader::new(50);
        assert_eq!(uploader.batch_count(0), 0);
        assert_eq!(uploader.batch_count(50), 1);
        assert_eq!(uploader.batch_count(101), 3);
        assert_eq!(BatchUploader::new(0).batch_size(), 1);
    }
}
