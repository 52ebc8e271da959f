//! LanceDB vector store (embedded, no server required)

use super::{ScoredRow, SymbolSummary, VectorRow, VectorStore};
use crate::config::VectorDbConfig;
use crate::error::VectorDbError;
use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::sync::{Arc, RwLock};

/// Chunk rows in one LanceDB table, searched by cosine distance
pub struct LanceVectorStore {
    connection: Connection,
    table_name: String,
    db_path: String,
    dimension: RwLock<Option<usize>>,
}

impl LanceVectorStore {
    pub async fn new(config: &VectorDbConfig) -> Result<Self> {
        let db_path = config.lancedb_path.to_string_lossy().to_string();
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        if let Some(parent) = config.lancedb_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let connection = lancedb::connect(&db_path)
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            connection,
            table_name: config.table_name.clone(),
            db_path,
            dimension: RwLock::new(None),
        })
    }

    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("filepath", DataType::Utf8, false),
            Field::new("start_line", DataType::UInt32, false),
            Field::new("end_line", DataType::UInt32, false),
            Field::new("language", DataType::Utf8, false),
            Field::new("symbols", DataType::Utf8, false),
            Field::new("context", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
        ]))
    }

    async fn get_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .context(VectorDbError::NotInitialized)
    }

    fn dimension(&self) -> Result<Option<usize>> {
        self.dimension
            .read()
            .map(|d| *d)
            .map_err(|e| anyhow::anyhow!("Failed to read table dimension: {}", e))
    }

    async fn create_empty_table(&self, dimension: usize) -> Result<()> {
        let schema = Self::create_schema(dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches = RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema);

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .map_err(|e| VectorDbError::InitializationFailed(e.to_string()))?;

        tracing::info!("Created table '{}'", self.table_name);
        Ok(())
    }

    fn create_record_batch(rows: &[VectorRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let dimension = rows.first().map(|r| r.embedding.len()).unwrap_or(0);

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            rows.iter()
                .map(|r| Some(r.embedding.iter().copied().map(Some))),
            dimension as i32,
        );
        let strings =
            |f: fn(&VectorRow) -> &str| StringArray::from(rows.iter().map(f).collect::<Vec<_>>());
        let symbols = rows
            .iter()
            .map(|r| serde_json::to_string(&r.symbols))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to serialize chunk symbols")?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(strings(|r| r.id.as_str())),
                Arc::new(strings(|r| r.filepath.as_str())),
                Arc::new(UInt32Array::from(
                    rows.iter().map(|r| r.start_line as u32).collect::<Vec<_>>(),
                )),
                Arc::new(UInt32Array::from(
                    rows.iter().map(|r| r.end_line as u32).collect::<Vec<_>>(),
                )),
                Arc::new(strings(|r| r.language.as_str())),
                Arc::new(StringArray::from(symbols)),
                Arc::new(strings(|r| r.context.as_str())),
                Arc::new(strings(|r| r.content.as_str())),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    fn rows_from_batch(batch: &RecordBatch, threshold: f32, out: &mut Vec<ScoredRow>) -> Result<()> {
        let distance = column::<Float32Array>(batch, "_distance")?;
        let ids = column::<StringArray>(batch, "id")?;
        let filepaths = column::<StringArray>(batch, "filepath")?;
        let languages = column::<StringArray>(batch, "language")?;
        let symbols = column::<StringArray>(batch, "symbols")?;
        let contexts = column::<StringArray>(batch, "context")?;
        let contents = column::<StringArray>(batch, "content")?;
        let starts = column::<UInt32Array>(batch, "start_line")?;
        let ends = column::<UInt32Array>(batch, "end_line")?;

        for i in 0..batch.num_rows() {
            let score = 1.0 - distance.value(i);
            if score < threshold {
                continue;
            }
            let symbols: Vec<SymbolSummary> =
                serde_json::from_str(symbols.value(i)).unwrap_or_default();
            out.push(ScoredRow {
                id: ids.value(i).to_string(),
                content: contents.value(i).to_string(),
                filepath: filepaths.value(i).to_string(),
                start_line: starts.value(i) as usize,
                end_line: ends.value(i) as usize,
                language: languages.value(i).to_string(),
                symbols,
                context: contexts.value(i).to_string(),
                score,
            });
        }
        Ok(())
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("Invalid {} type", name))
}

#[async_trait::async_trait]
impl VectorStore for LanceVectorStore {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        tracing::info!(
            "Initializing LanceDB with dimension {} at {}",
            dimension,
            self.db_path
        );
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| VectorDbError::InitializationFailed(e.to_string()))?;

        if table_names.contains(&self.table_name) {
            tracing::info!("Table '{}' already exists", self.table_name);
            let schema = self
                .get_table()
                .await?
                .schema()
                .await
                .map_err(|e| VectorDbError::InitializationFailed(e.to_string()))?;
            if let Some(actual) = vector_dimension(&schema)
                && actual != dimension
            {
                return Err(VectorDbError::DimensionMismatch {
                    table: self.table_name.clone(),
                    expected: dimension,
                    actual,
                }
                .into());
            }
        } else {
            self.create_empty_table(dimension).await?;
        }

        *self
            .dimension
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to record table dimension: {}", e))? =
            Some(dimension);
        Ok(())
    }

    async fn upsert(&self, rows: Vec<VectorRow>) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let dimension = rows[0].embedding.len();
        if let Some(bad) = rows.iter().find(|r| r.embedding.len() != dimension) {
            return Err(VectorDbError::StoreFailed(format!(
                "row {} has dimension {}, batch has {}",
                bad.id,
                bad.embedding.len(),
                dimension
            ))
            .into());
        }

        let schema = Self::create_schema(dimension);
        let batch = Self::create_record_batch(&rows, schema.clone())?;
        let count = batch.num_rows();
        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);

        let table = self.get_table().await?;
        let mut merge = table.merge_insert(&["id"]);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge
            .execute(Box::new(batches))
            .await
            .map_err(|e| VectorDbError::StoreFailed(e.to_string()))?;

        tracing::debug!("Upserted {} row(s)", count);
        Ok(count)
    }

    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredRow>> {
        let table = self.get_table().await?;

        let stream = table
            .vector_search(embedding.to_vec())
            .map_err(|e| VectorDbError::SearchFailed(e.to_string()))?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| VectorDbError::SearchFailed(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        let mut hits = Vec::new();
        for batch in &batches {
            Self::rows_from_batch(batch, threshold, &mut hits)?;
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn clear(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| VectorDbError::ClearFailed(e.to_string()))?;

        if table_names.contains(&self.table_name) {
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| VectorDbError::ClearFailed(e.to_string()))?;
        }

        if let Some(dimension) = self.dimension()? {
            self.create_empty_table(dimension).await?;
        }
        tracing::info!("Cleared table '{}'", self.table_name);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let table = self.get_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| VectorDbError::SearchFailed(e.to_string()).into())
    }
}

/// Length of the `vector` column's fixed-size list
fn vector_dimension(schema: &Schema) -> Option<usize> {
    match schema.field_with_name("vector").ok()?.data_type() {
        DataType::FixedSizeList(_, len) => usize::try_from(*len).ok(),
        _ => None,
    }
}
