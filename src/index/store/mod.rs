
use super::{ChunkRecord, EmbeddingRecord, IndexMetadata};
use crate::{QaError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "chunks";
const METADATA_FILE: &str = "metadata.toml";
/// Upper bound on rows fetched per search when ranking distance ties
const TIE_SCAN_LIMIT: usize = 4096;

/// Persistent vector index over document chunks, backed by LanceDB
pub struct VectorIndex {
    connection: Connection,
    dimension: usize,
    metadata: IndexMetadata,
}

/// A chunk returned from similarity search
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: ChunkRecord,
    /// Distance to the query vector; smaller is nearer
    pub distance: f32,
}

impl VectorIndex {
    /// Build a fresh index from chunk embeddings, replacing any index
    /// already stored at `index_dir`.
    ///
    /// The metadata record naming `embedding_model` is written last, so a
    /// partially written index reads as absent rather than corrupt.
    #[inline]
    pub async fn build(
        index_dir: &Path,
        embedding_model: &str,
        records: &[EmbeddingRecord],
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(QaError::EmptyCorpus);
        }

        let dimension = records[0].vector.len();
        if records.iter().any(|r| r.vector.len() != dimension) {
            return Err(QaError::Config(format!(
                "Inconsistent embedding dimensions in batch (expected {dimension})"
            )));
        }

        std::fs::create_dir_all(index_dir).map_err(|e| {
            QaError::StorageWrite(format!("Failed to create index directory: {}", e))
        })?;

        debug!(
            "Building vector index at {} with {} chunks ({} dimensions)",
            index_dir.display(),
            records.len(),
            dimension
        );

        let connection = connect(index_dir)
            .await
            .map_err(|e| QaError::StorageWrite(format!("Failed to open index storage: {}", e)))?;

        drop_table_if_exists(&connection)
            .await
            .map_err(|e| QaError::StorageWrite(format!("Failed to replace index table: {}", e)))?;

        connection
            .create_empty_table(TABLE_NAME, create_schema(dimension))
            .execute()
            .await
            .map_err(|e| QaError::StorageWrite(format!("Failed to create index table: {}", e)))?;

        let record_batch = create_record_batch(records, dimension)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| QaError::StorageWrite(format!("Failed to open index table: {}", e)))?;
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| QaError::StorageWrite(format!("Failed to insert chunks: {}", e)))?;

        let metadata = IndexMetadata {
            embedding_model: embedding_model.to_string(),
            dimension: dimension as u32,
            chunk_count: records.len() as u64,
            created_at: Utc::now().to_rfc3339(),
        };
        write_metadata(index_dir, &metadata)?;

        info!(
            "Built vector index with {} chunks at {}",
            records.len(),
            index_dir.display()
        );

        Ok(Self {
            connection,
            dimension,
            metadata,
        })
    }

    /// Open an existing index for querying.
    ///
    /// Fails with [`QaError::IndexNotFound`] when nothing is stored at
    /// `index_dir`, [`QaError::EmbeddingMismatch`] when the index was built
    /// with a different embedding model, and [`QaError::IndexCorrupt`] when
    /// the storage is present but unreadable.
    #[inline]
    pub async fn open(index_dir: &Path, embedding_model: &str) -> Result<Self> {
        let metadata = read_metadata(index_dir)?;

        if metadata.embedding_model != embedding_model {
            return Err(QaError::EmbeddingMismatch {
                indexed: metadata.embedding_model,
                configured: embedding_model.to_string(),
            });
        }

        let connection = connect(index_dir)
            .await
            .map_err(|e| QaError::IndexCorrupt(format!("Failed to open index storage: {}", e)))?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| QaError::IndexCorrupt(format!("Failed to list index tables: {}", e)))?;
        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(QaError::IndexCorrupt(
                "Chunk table is missing from index storage".to_string(),
            ));
        }

        let dimension = detect_vector_dimension(&connection).await?;
        if dimension as u32 != metadata.dimension {
            return Err(QaError::IndexCorrupt(format!(
                "Metadata declares {} dimensions but the table stores {}",
                metadata.dimension, dimension
            )));
        }

        info!(
            "Opened vector index with {} chunks ({} dimensions) at {}",
            metadata.chunk_count,
            dimension,
            index_dir.display()
        );

        Ok(Self {
            connection,
            dimension,
            metadata,
        })
    }

    /// Whether an index has been persisted at `index_dir`
    #[inline]
    pub fn exists(index_dir: &Path) -> bool {
        index_dir.join(METADATA_FILE).is_file()
    }

    #[inline]
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of chunks currently stored
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| QaError::IndexCorrupt(format!("Failed to count chunks: {}", e)))?;
        Ok(count as u64)
    }

    /// Return up to `limit` chunks nearest to `query_vector`, nearest first.
    ///
    /// Ties are resolved by insertion order. Fewer than `limit` results are
    /// returned when the index holds fewer chunks; an empty index yields an
    /// empty result, not an error.
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.dimension {
            return Err(QaError::Config(format!(
                "Query vector has {} dimensions but the index stores {}",
                query_vector.len(),
                self.dimension
            )));
        }

        debug!("Searching for nearest chunks with limit: {}", limit);

        let table = self.open_table().await?;

        let row_count = table
            .count_rows(None)
            .await
            .map_err(|e| QaError::IndexCorrupt(format!("Failed to count chunks: {}", e)))?;
        if row_count == 0 {
            return Ok(Vec::new());
        }

        // Fetch past the requested limit so equidistant chunks rank by the
        // persisted insertion order before the cut, not by whichever rows the
        // store happened to return first.
        let fetch = row_count.min(TIE_SCAN_LIMIT).max(limit);

        let results = table
            .vector_search(query_vector)
            .map_err(|e| QaError::IndexCorrupt(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(fetch)
            .execute()
            .await
            .map_err(|e| QaError::IndexCorrupt(format!("Failed to execute search: {}", e)))?;

        let mut scored = parse_search_results_stream(results).await?;
        scored.sort_by(|a, b| a.0.distance.total_cmp(&b.0.distance).then(a.1.cmp(&b.1)));
        scored.truncate(limit);

        debug!("Search returned {} chunks", scored.len());
        Ok(scored.into_iter().map(|(chunk, _)| chunk).collect())
    }

    async fn open_table(&self) -> Result<lancedb::table::Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| QaError::IndexCorrupt(format!("Failed to open index table: {}", e)))
    }
}

async fn connect(index_dir: &Path) -> std::result::Result<Connection, lancedb::Error> {
    // LanceDB file URIs must be absolute
    let absolute = index_dir
        .canonicalize()
        .unwrap_or_else(|_| index_dir.to_path_buf());
    let uri = format!("file://{}", absolute.display());
    lancedb::connect(&uri).execute().await
}

async fn drop_table_if_exists(connection: &Connection) -> std::result::Result<(), lancedb::Error> {
    let table_names = connection.table_names().execute().await?;
    if table_names.iter().any(|name| name == TABLE_NAME) {
        info!("Dropping existing chunk table");
        connection.drop_table(TABLE_NAME).await?;
    }
    Ok(())
}

fn metadata_path(index_dir: &Path) -> PathBuf {
    index_dir.join(METADATA_FILE)
}

fn read_metadata(index_dir: &Path) -> Result<IndexMetadata> {
    let path = metadata_path(index_dir);
    if !path.is_file() {
        return Err(QaError::IndexNotFound(index_dir.to_path_buf()));
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| QaError::IndexCorrupt(format!("Failed to read index metadata: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| QaError::IndexCorrupt(format!("Failed to parse index metadata: {}", e)))
}

fn write_metadata(index_dir: &Path, metadata: &IndexMetadata) -> Result<()> {
    let content = toml::to_string_pretty(metadata)
        .map_err(|e| QaError::StorageWrite(format!("Failed to serialize index metadata: {}", e)))?;

    std::fs::write(metadata_path(index_dir), content)
        .map_err(|e| QaError::StorageWrite(format!("Failed to write index metadata: {}", e)))
}

/// Create the chunk table schema with the given vector dimension
fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("source", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("seq", DataType::UInt64, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

/// Detect the vector dimension from the stored table schema
async fn detect_vector_dimension(connection: &Connection) -> Result<usize> {
    let table = connection
        .open_table(TABLE_NAME)
        .execute()
        .await
        .map_err(|e| QaError::IndexCorrupt(format!("Failed to open index table: {}", e)))?;

    let schema = table
        .schema()
        .await
        .map_err(|e| QaError::IndexCorrupt(format!("Failed to get table schema: {}", e)))?;

    for field in schema.fields() {
        if field.name() == "vector" {
            if let DataType::FixedSizeList(_, size) = field.data_type() {
                return Ok(*size as usize);
            }
        }
    }

    Err(QaError::IndexCorrupt(
        "Could not find vector column or determine dimension".to_string(),
    ))
}

/// Create a RecordBatch from embedding records; `seq` preserves insertion order
fn create_record_batch(records: &[EmbeddingRecord], vector_dim: usize) -> Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut seqs = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    let created_at = Utc::now().to_rfc3339();
    for (seq, record) in records.iter().enumerate() {
        ids.push(record.id.as_str());
        sources.push(record.chunk.source.as_str());
        contents.push(record.chunk.content.as_str());
        chunk_indices.push(record.chunk.chunk_index);
        seqs.push(seq as u64);
        created_ats.push(created_at.as_str());
    }

    let mut flat_values = Vec::with_capacity(len * vector_dim);
    for record in records {
        flat_values.extend_from_slice(&record.vector);
    }
    let values_array = Float32Array::from(flat_values);
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
            .map_err(|e| QaError::StorageWrite(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(sources)),
        Arc::new(StringArray::from(contents)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(UInt64Array::from(seqs)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(create_schema(vector_dim), arrays)
        .map_err(|e| QaError::StorageWrite(format!("Failed to create record batch: {}", e)))
}

async fn parse_search_results_stream(
    mut results: lancedb::arrow::SendableRecordBatchStream,
) -> Result<Vec<(ScoredChunk, u64)>> {
    let mut search_results = Vec::new();

    while let Some(batch_result) = results
        .try_next()
        .await
        .map_err(|e| QaError::IndexCorrupt(format!("Failed to read result stream: {}", e)))?
    {
        let parsed_batch = parse_search_batch(&batch_result)?;
        search_results.extend(parsed_batch);
    }

    debug!("Parsed {} search results from stream", search_results.len());
    Ok(search_results)
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<(ScoredChunk, u64)>> {
    let num_rows = batch.num_rows();
    let mut search_results = Vec::with_capacity(num_rows);

    let sources = string_column(batch, "source")?;
    let contents = string_column(batch, "content")?;

    let chunk_indices = batch
        .column_by_name("chunk_index")
        .ok_or_else(|| QaError::IndexCorrupt("Missing chunk_index column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| QaError::IndexCorrupt("Invalid chunk_index column type".to_string()))?;

    let seqs = batch
        .column_by_name("seq")
        .ok_or_else(|| QaError::IndexCorrupt("Missing seq column".to_string()))?
        .as_any()
        .downcast_ref::<UInt64Array>()
        .ok_or_else(|| QaError::IndexCorrupt("Invalid seq column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let chunk = ChunkRecord {
            source: sources.value(row).to_string(),
            content: contents.value(row).to_string(),
            chunk_index: chunk_indices.value(row),
        };

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        search_results.push((ScoredChunk { chunk, distance }, seqs.value(row)));
    }

    Ok(search_results)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| QaError::IndexCorrupt(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| QaError::IndexCorrupt(format!("Invalid {} column type", name)))
}
