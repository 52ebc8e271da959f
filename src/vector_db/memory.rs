use super::{ScoredRow, VectorRow, VectorStore, cosine_similarity};
use crate::error::VectorDbError;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

/// Brute-force cosine search over rows held in memory
#[derive(Default)]
pub struct InMemoryVectorStore {
    rows: RwLock<HashMap<String, VectorRow>>,
    dimension: RwLock<Option<usize>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored row
    pub fn rows(&self) -> Vec<VectorRow> {
        self.rows
            .read()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned(e: impl std::fmt::Display) -> anyhow::Error {
    VectorDbError::StoreFailed(format!("row lock poisoned: {}", e)).into()
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        *self.dimension.write().map_err(poisoned)? = Some(dimension);
        Ok(())
    }

    async fn upsert(&self, rows: Vec<VectorRow>) -> Result<usize> {
        let expected = *self.dimension.read().map_err(poisoned)?;
        if let Some(expected) = expected
            && let Some(bad) = rows.iter().find(|r| r.embedding.len() != expected)
        {
            return Err(VectorDbError::StoreFailed(format!(
                "row {} has dimension {}, table expects {}",
                bad.id,
                bad.embedding.len(),
                expected
            ))
            .into());
        }

        let count = rows.len();
        let mut stored = self.rows.write().map_err(poisoned)?;
        for row in rows {
            stored.insert(row.id.clone(), row);
        }
        Ok(count)
    }

    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredRow>> {
        let rows = self
            .rows
            .read()
            .map_err(|e| VectorDbError::SearchFailed(e.to_string()))?;

        let mut hits: Vec<ScoredRow> = rows
            .values()
            .map(|row| (row, cosine_similarity(embedding, &row.embedding)))
            .filter(|(_, score)| *score >= threshold)
            .map(|(row, score)| ScoredRow::from_row(row.clone(), score))
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn clear(&self) -> Result<()> {
        self.rows
            .write()
            .map_err(|e| VectorDbError::ClearFailed(e.to_string()))?
            .clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, embedding: Vec<f32>) -> VectorRow {
        VectorRow {
            id: id.to_string(),
            content: format!("content {}", id),
            embedding,
            filepath: format!("{}.py", id),
            start_line: 1,
            end_line: 5,
            language: "python".to_string(),
            symbols: Vec::new(),
            context: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store.initialize(2).await.unwrap();
        store.upsert(vec![row("a", vec![1.0, 0.0])]).await.unwrap();
        store.upsert(vec![row("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.rows()[0].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimension() {
        let store = InMemoryVectorStore::new();
        store.initialize(3).await.unwrap();
        assert!(store.upsert(vec![row("a", vec![1.0, 0.0])]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_orders_and_thresholds() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                row("exact", vec![1.0, 0.0]),
                row("close", vec![0.9, 0.1]),
                row("orthogonal", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 0.5, 10).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close"]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits.iter().all(|h| h.score >= 0.5));

        let limited = store.search(&[1.0, 0.0], 0.0, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryVectorStore::new();
        store.upsert(vec![row("a", vec![1.0])]).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
