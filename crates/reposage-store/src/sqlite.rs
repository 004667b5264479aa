//! SQLite-backed `VectorIndex` with int8-quantized embeddings.
//!
//! Every collection is a row in `collections`; chunks reference it by name.
//! Search loads a collection's embeddings into a normalized (N, dim) matrix,
//! cached per collection until the next insert into that collection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::embedding::{l2_normalize, top_k, QuantizedVector};
use crate::index::{CollectionHandle, VectorIndex};
use crate::schema::SCHEMA_SQL;
use crate::types::{CollectionInfo, EmbeddedChunk, IndexStats, SearchHit};
use reposage_core::{Chunk, DocumentMetadata, Error, FormatTag, Result};

pub struct SqliteIndex {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    embedding_dim: usize,
    matrices: Mutex<HashMap<String, Arc<EmbeddingMatrix>>>,
}

struct EmbeddingMatrix {
    /// Normalized embeddings, shape (N, dim).
    matrix: Array2<f32>,
    /// Chunk IDs corresponding to each row.
    chunk_ids: Vec<i64>,
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::CollectionUnavailable(e.to_string())
}

impl SqliteIndex {
    /// Open or create the index.
    ///
    /// `db_dir` is the directory (e.g., `data/vectordb/`). The file will be `db_dir/reposage.db`.
    pub fn open(db_dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir)
            .map_err(|e| Error::CollectionUnavailable(format!("{}: {e}", db_dir.display())))?;
        let db_path = db_dir.join("reposage.db");

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::CollectionUnavailable(format!("Schema init failed: {e}")))?;

        Self::check_stored_dim(&conn, embedding_dim)?;

        let index = Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
            matrices: Mutex::new(HashMap::new()),
        };

        let stats = index.stats()?;
        info!(
            "SqliteIndex initialized: {} collections, {} chunks, dim={}, path={}",
            stats.collections,
            stats.chunks,
            embedding_dim,
            index.db_path.display()
        );
        Ok(index)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -65536;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    /// Record the vector width on first open; later opens must match it.
    fn check_stored_dim(conn: &Connection, embedding_dim: usize) -> Result<()> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'embedding_dim'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match stored {
            None => {
                conn.execute(
                    "INSERT INTO index_meta (key, value) VALUES ('embedding_dim', ?1)",
                    params![embedding_dim.to_string()],
                )
                .map_err(db_err)?;
                Ok(())
            }
            Some(value) => {
                let stored_dim: usize = value.parse().map_err(|_| {
                    Error::CollectionUnavailable(format!("invalid stored embedding_dim '{value}'"))
                })?;
                if stored_dim != embedding_dim {
                    return Err(Error::Config(format!(
                        "index was built with {stored_dim}-dimensional embeddings but the embedder produces {embedding_dim}; re-ingest into a fresh data directory or restore the original model"
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn check_width(&self, vector: &Array1<f32>) -> Result<()> {
        if vector.len() != self.embedding_dim {
            return Err(Error::Embedding(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.embedding_dim
            )));
        }
        Ok(())
    }

    fn ensure_exists(conn: &Connection, name: &str) -> Result<()> {
        let found = conn
            .prepare_cached("SELECT 1 FROM collections WHERE name = ?1")
            .map_err(db_err)?
            .query_row(params![name], |_| Ok(()))
            .optional()
            .map_err(db_err)?;
        found.ok_or_else(|| Error::CollectionUnavailable(format!("collection {name} does not exist")))
    }

    /// Cached matrix for a collection, loading it on first use.
    fn matrix_for(&self, name: &str) -> Result<Arc<EmbeddingMatrix>> {
        // Held across the load so an insert can only invalidate after we cache.
        let mut cache = self.matrices.lock();
        if let Some(matrix) = cache.get(name) {
            return Ok(matrix.clone());
        }
        let loaded = Arc::new(self.load_matrix(name)?);
        cache.insert(name.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn load_matrix(&self, name: &str) -> Result<EmbeddingMatrix> {
        let mut chunk_ids = Vec::new();
        let mut rows: Vec<Array1<f32>> = Vec::new();

        {
            let conn = self.conn.lock();
            Self::ensure_exists(&conn, name)?;

            let mut stmt = conn
                .prepare_cached(
                    "SELECT ce.chunk_id, ce.embedding, ce.scale, ce.offset_val \
                     FROM chunk_embeddings ce \
                     JOIN chunks c ON c.id = ce.chunk_id \
                     WHERE c.collection = ?1 \
                     ORDER BY c.id",
                )
                .map_err(db_err)?;

            let stored = stmt
                .query_map(params![name], |row| {
                    let chunk_id: i64 = row.get(0)?;
                    let bytes: Vec<u8> = row.get(1)?;
                    let scale: f64 = row.get(2)?;
                    let offset: f64 = row.get(3)?;
                    Ok((chunk_id, bytes, scale as f32, offset as f32))
                })
                .map_err(db_err)?;

            for row in stored {
                let (chunk_id, bytes, scale, offset) = row.map_err(db_err)?;
                let vector = QuantizedVector {
                    bytes,
                    scale,
                    offset,
                }
                .dequantize();
                if vector.len() != self.embedding_dim {
                    warn!(
                        "Skipping chunk {} in {}: {} dimensions, index expects {}",
                        chunk_id,
                        name,
                        vector.len(),
                        self.embedding_dim
                    );
                    continue;
                }
                // Zero vectors never match a query.
                if let Some(unit) = l2_normalize(&vector) {
                    chunk_ids.push(chunk_id);
                    rows.push(unit);
                }
            }
        }

        let mut matrix = Array2::zeros((rows.len(), self.embedding_dim));
        for (i, row) in rows.iter().enumerate() {
            matrix.row_mut(i).assign(row);
        }
        debug!("Loaded {} embeddings for collection {}", rows.len(), name);

        Ok(EmbeddingMatrix { matrix, chunk_ids })
    }

    fn load_chunk(conn: &Connection, chunk_id: i64) -> Result<Chunk> {
        let (ordinal, text, format, metadata_json): (i64, String, String, String) = conn
            .prepare_cached("SELECT ordinal, text, format, metadata_json FROM chunks WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![chunk_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(db_err)?;

        let format: FormatTag = format.parse().map_err(|_| {
            Error::CollectionUnavailable(format!("chunk {chunk_id} has invalid format '{format}'"))
        })?;
        let metadata: DocumentMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
            Error::CollectionUnavailable(format!("chunk {chunk_id} has invalid metadata: {e}"))
        })?;

        Ok(Chunk {
            text,
            ordinal: ordinal as usize,
            format,
            metadata,
        })
    }
}

impl VectorIndex for SqliteIndex {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn dimension(&self) -> usize {
        self.embedding_dim
    }

    fn create_if_absent(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)",
                params![name, chrono::Utc::now().timestamp_millis()],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    fn insert(&self, collection: &CollectionHandle, chunks: &[EmbeddedChunk]) -> Result<usize> {
        let mut prepared = Vec::with_capacity(chunks.len());
        for item in chunks {
            self.check_width(&item.embedding)?;
            prepared.push((
                serde_json::to_string(&item.chunk.metadata)?,
                QuantizedVector::quantize(&item.embedding),
            ));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let mut conn = self.conn.lock();
        Self::ensure_exists(&conn, collection.name())?;

        let tx = conn.transaction().map_err(db_err)?;
        {
            let mut insert_chunk = tx
                .prepare_cached(
                    "INSERT INTO chunks (collection, ordinal, text, format, metadata_json, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_err)?;
            let mut insert_embedding = tx
                .prepare_cached(
                    "INSERT INTO chunk_embeddings (chunk_id, embedding, scale, offset_val) \
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(db_err)?;

            for (item, (metadata_json, quantized)) in chunks.iter().zip(&prepared) {
                let chunk_id = insert_chunk
                    .insert(params![
                        collection.name(),
                        item.chunk.ordinal as i64,
                        item.chunk.text,
                        item.chunk.format.as_str(),
                        metadata_json,
                        now,
                    ])
                    .map_err(db_err)?;
                insert_embedding
                    .execute(params![
                        chunk_id,
                        quantized.bytes,
                        quantized.scale,
                        quantized.offset
                    ])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        drop(conn);

        self.matrices.lock().remove(collection.name());
        Ok(chunks.len())
    }

    fn query(
        &self,
        collection: &CollectionHandle,
        vector: &Array1<f32>,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        self.check_width(vector)?;
        let matrix = self.matrix_for(collection.name())?;
        let Some(query) = l2_normalize(vector) else {
            return Ok(Vec::new());
        };
        if matrix.chunk_ids.is_empty() {
            return Ok(Vec::new());
        }

        // (N, dim) @ (dim,) → (N,)
        let similarities = matrix.matrix.dot(&query).to_vec();
        let ranked = top_k(&similarities, k);

        let conn = self.conn.lock();
        ranked
            .into_iter()
            .map(|(row, score)| {
                Ok(SearchHit {
                    chunk: Self::load_chunk(&conn, matrix.chunk_ids[row])?,
                    score,
                })
            })
            .collect()
    }

    fn collection_size(&self, collection: &CollectionHandle) -> Result<usize> {
        let conn = self.conn.lock();
        Self::ensure_exists(&conn, collection.name())?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
                params![collection.name()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as usize)
    }

    fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT c.name, c.created_at, COUNT(ch.id) \
                 FROM collections c \
                 LEFT JOIN chunks ch ON ch.collection = c.name \
                 GROUP BY c.name \
                 ORDER BY c.name",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                let count: i64 = row.get(2)?;
                Ok(CollectionInfo {
                    name: row.get(0)?,
                    created_at: row.get(1)?,
                    chunks: count as usize,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn stats(&self) -> Result<IndexStats> {
        let collections = self.list_collections()?;
        let db_size = std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0);

        Ok(IndexStats {
            backend: self.backend().to_string(),
            collections: collections.len(),
            chunks: collections.iter().map(|c| c.chunks).sum(),
            embedding_dimension: self.embedding_dim,
            db_path: Some(self.db_path.to_string_lossy().to_string()),
            db_size_mb: Some(db_size as f64 / (1024.0 * 1024.0)),
        })
    }
}
