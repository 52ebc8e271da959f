//! Bounded-concurrency execution of independent units of work
//!
//! Every unit runs behind a shared semaphore, so no more than the configured
//! number of external calls are in flight at once. A failing unit is logged
//! with its index and counted; it never stops its siblings.

use crate::graph::{GraphStore, Statement};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Completions between progress log lines
const PROGRESS_INTERVAL: usize = 50;

/// Aggregate outcome of a concurrent run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn merge(&mut self, other: RunStats) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Fan-out executor shared by the indexer and the graph writer
#[derive(Debug, Clone)]
pub struct Coordinator {
    label: String,
}

impl Coordinator {
    /// `label` names the work in progress logs
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Run `worker` over every item with at most `max_concurrent` in flight
    pub async fn run_concurrently<T, F, Fut>(
        &self,
        items: Vec<T>,
        worker: F,
        max_concurrent: usize,
    ) -> RunStats
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut stats = RunStats::default();
        for result in self.map_concurrently(items, worker, max_concurrent).await {
            match result {
                Ok(()) => stats.succeeded += 1,
                Err(_) => stats.failed += 1,
            }
        }
        stats
    }

    /// Like [`run_concurrently`](Self::run_concurrently), returning every
    /// item's result in input order
    pub async fn map_concurrently<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        worker: F,
        max_concurrent: usize,
    ) -> Vec<Result<R>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let total = items.len();
        if total == 0 {
            return Vec::new();
        }

        let limit = max_concurrent.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let worker = &worker;

        let mut stream = stream::iter(items.into_iter().enumerate().map(|(index, item)| {
            let semaphore = semaphore.clone();
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => worker(item).await,
                    Err(e) => Err(anyhow::Error::new(e).context("Concurrency gate closed")),
                };
                (index, result)
            }
        }))
        .buffer_unordered(limit);

        let mut slots: Vec<Option<Result<R>>> = (0..total).map(|_| None).collect();
        let mut completed = 0;
        let mut failed = 0;

        while let Some((index, result)) = stream.next().await {
            completed += 1;
            if let Err(e) = &result {
                failed += 1;
                tracing::warn!("{} item {} failed: {:#}", self.label, index, e);
            }
            if completed % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "{} progress: {}/{} done, {} failed",
                    self.label,
                    completed,
                    total,
                    failed
                );
            }
            slots[index] = Some(result);
        }

        tracing::debug!(
            "{} finished: {} succeeded, {} failed",
            self.label,
            total - failed,
            failed
        );

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(anyhow::anyhow!("Item produced no result"))))
            .collect()
    }

    /// Group `statements` into batches of `batch_size`, each executed as one
    /// store call. Counts are in statements: a failed batch fails all of its
    /// statements.
    pub async fn run_in_batches(
        &self,
        store: &dyn GraphStore,
        statements: &[Statement],
        batch_size: usize,
        max_concurrent_batches: usize,
    ) -> RunStats {
        let batches: Vec<&[Statement]> = statements.chunks(batch_size.max(1)).collect();
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();

        let results = self
            .map_concurrently(
                batches,
                |batch| async move {
                    store
                        .execute(batch)
                        .await
                        .with_context(|| format!("Batch of {} statement(s) failed", batch.len()))
                        .map(|_| ())
                },
                max_concurrent_batches,
            )
            .await;

        let mut stats = RunStats::default();
        for (result, size) in results.into_iter().zip(sizes) {
            match result {
                Ok(()) => stats.succeeded += size,
                Err(_) => stats.failed += size,
            }
        }
        stats
    }
}
