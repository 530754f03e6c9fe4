//! # Durable Catalog (SQLite)
//!
//! Persists the catalog in a single `artifact` table via SQLx. The schema
//! is embedded from `migrations/` and applied when the catalog is opened.
//!
//! ## Write Path
//!
//! An ingest holds the handle's writer lock for the whole transaction:
//! read the existing row and the owners of the supplied legacy digests,
//! plan with [`plan_ingest`], write, commit. Dropping the transaction before
//! commit rolls it back, so a cancelled or failed ingest leaves no trace.
//!
//! The sparse unique indexes on the legacy columns back this up against
//! writers in other processes. Such a violation surfaces as
//! [`CatalogError::WriteConflict`].
//!
//! ## Read Concurrency
//!
//! With a database file, lookups run on their own pooled connections and
//! WAL mode lets them read the last committed state while an ingest holds
//! the write lock. A private in-memory database lives on a single
//! connection, so there every lookup queues behind whatever ingest is
//! holding it. Use a file when reads must not wait on writes.
//!
//! ## Encoding
//!
//! Digests are stored as raw bytes. Lengths are stored as `INTEGER`; the
//! descriptor check in `artcat-core` caps them at
//! [`MAX_ARTIFACT_LENGTH`](artcat_core::MAX_ARTIFACT_LENGTH) before a
//! transaction starts, the same limit the in-process catalog applies.

use std::str::FromStr;

use artcat_core::{
    plan_ingest, scan_collisions, ArtifactDescriptor, ArtifactRecord, CanonicalDigest,
    CatalogError, CollisionReport, IngestOutcome, IngestPlan, LegacyAlgorithm, LegacyDigest,
    LegacyOwners,
};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::catalog::{observe_ingest, ArtifactCatalog};
use crate::config::CatalogConfig;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite primary result codes that mean "try again later".
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// A catalog persisted in SQLite.
#[derive(Debug)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    writer: Mutex<()>,
    page_size: usize,
}

impl SqliteCatalog {
    /// Connect, creating the database file if needed, and apply migrations.
    pub async fn open(config: &CatalogConfig) -> Result<Self, CatalogError> {
        config
            .validate()
            .map_err(|e| CatalogError::Storage(e.to_string()))?;

        let in_memory = config.is_in_memory();
        let url = config.database_url.trim();
        let options = if in_memory && !url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(storage_error)?
        } else if url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(url).map_err(storage_error)?
        } else {
            SqliteConnectOptions::new().filename(url)
        };
        let mut options = options
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout);

        // A private in-memory database exists only while its connection
        // lives, so the pool must hold exactly one and never recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(storage_error)?;
        info!(database = %url, in_memory, "connected to SQLite");

        Self::with_pool(pool, config.page_size).await
    }

    /// Wrap an existing pool and apply migrations to it.
    pub async fn with_pool(pool: SqlitePool, page_size: usize) -> Result<Self, CatalogError> {
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CatalogError::Storage(format!("migration failed: {e}")))?;
        info!("catalog migrations applied");

        Ok(Self {
            pool,
            writer: Mutex::new(()),
            page_size: page_size.max(1),
        })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection. Later calls fail with
    /// [`CatalogError::StorageUnavailable`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ingest_atomic(
        &self,
        descriptor: &ArtifactDescriptor,
    ) -> Result<IngestPlan, CatalogError> {
        descriptor.validate()?;

        let _writer = self.writer.lock().await;
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let existing = fetch_by_canonical(&mut tx, &descriptor.canonical).await?;
        let mut owners = LegacyOwners::new();
        for digest in &descriptor.legacy {
            if let Some(owner) = fetch_owner(&mut tx, digest).await? {
                owners.insert(digest.clone(), owner);
            }
        }

        let plan = plan_ingest(descriptor, existing.as_ref(), &owners)?;
        match &plan.outcome {
            IngestOutcome::Created => insert_record(&mut tx, &plan.record).await?,
            IngestOutcome::Enriched { .. } => {
                for digest in plan.attached() {
                    attach_digest(&mut tx, &plan.record.canonical, digest).await?;
                }
            }
            IngestOutcome::Unchanged => {}
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(plan)
    }
}

impl ArtifactCatalog for SqliteCatalog {
    #[instrument(skip(self, descriptor), fields(canonical = %descriptor.canonical))]
    async fn ingest(&self, descriptor: &ArtifactDescriptor) -> Result<ArtifactRecord, CatalogError> {
        let result = self.ingest_atomic(descriptor).await;
        observe_ingest(descriptor, &result);
        result.map(|plan| plan.record)
    }

    async fn get_by_canonical(
        &self,
        digest: &CanonicalDigest,
    ) -> Result<Option<ArtifactRecord>, CatalogError> {
        sqlx::query_as::<_, ArtifactRow>(SELECT_BY_CANONICAL)
            .bind(digest.as_bytes().to_vec())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .map(ArtifactRow::into_record)
            .transpose()
    }

    async fn get_by_legacy(
        &self,
        digest: &LegacyDigest,
    ) -> Result<Option<ArtifactRecord>, CatalogError> {
        sqlx::query_as::<_, ArtifactRow>(select_by_legacy(digest.algorithm()))
            .bind(digest.as_bytes().to_vec())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .map(ArtifactRow::into_record)
            .transpose()
    }

    async fn list_by_name_page(
        &self,
        name: &str,
        after: Option<&CanonicalDigest>,
        limit: usize,
    ) -> Result<Vec<ArtifactRecord>, CatalogError> {
        // Every stored digest sorts after the empty blob.
        let after = after.map(|d| d.as_bytes().to_vec()).unwrap_or_default();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query_as::<_, ArtifactRow>(
            "SELECT blake3, name, src, len, sha1, sha256, md5 FROM artifact \
             WHERE name = ? AND blake3 > ? ORDER BY blake3 LIMIT ?",
        )
        .bind(name)
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?
        .into_iter()
        .map(ArtifactRow::into_record)
        .collect()
    }

    async fn audit_collisions(&self) -> Result<Vec<CollisionReport>, CatalogError> {
        let rows = sqlx::query_as::<_, ArtifactRow>(
            "SELECT blake3, name, src, len, sha1, sha256, md5 FROM artifact \
             WHERE sha1 IN (SELECT sha1 FROM artifact WHERE sha1 IS NOT NULL \
                            GROUP BY sha1 HAVING COUNT(*) > 1) \
                OR sha256 IN (SELECT sha256 FROM artifact WHERE sha256 IS NOT NULL \
                              GROUP BY sha256 HAVING COUNT(*) > 1) \
                OR md5 IN (SELECT md5 FROM artifact WHERE md5 IS NOT NULL \
                           GROUP BY md5 HAVING COUNT(*) > 1)",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let records = rows
            .into_iter()
            .map(ArtifactRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scan_collisions(&records))
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

// ---------------------------------------------------------------------------
// Rows and statements
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct ArtifactRow {
    blake3: Vec<u8>,
    name: String,
    src: String,
    len: i64,
    sha1: Option<Vec<u8>>,
    sha256: Option<Vec<u8>>,
    md5: Option<Vec<u8>>,
}

impl ArtifactRow {
    fn into_record(self) -> Result<ArtifactRecord, CatalogError> {
        let canonical = CanonicalDigest::from_slice(&self.blake3)
            .map_err(|e| CatalogError::Storage(format!("corrupt blake3 column: {e}")))?;
        let length = u64::try_from(self.len).map_err(|_| {
            CatalogError::Storage(format!("corrupt len column for {canonical}: {}", self.len))
        })?;

        let mut record = ArtifactRecord::new(canonical, self.name, self.src, length);
        let slots = [
            (LegacyAlgorithm::Sha1, self.sha1),
            (LegacyAlgorithm::Sha256, self.sha256),
            (LegacyAlgorithm::Md5, self.md5),
        ];
        for (algorithm, bytes) in slots {
            if let Some(bytes) = bytes {
                let digest = LegacyDigest::new(algorithm, bytes).map_err(|e| {
                    CatalogError::Storage(format!("corrupt {algorithm} column for {canonical}: {e}"))
                })?;
                record.legacy.insert(digest);
            }
        }
        Ok(record)
    }
}

const SELECT_BY_CANONICAL: &str =
    "SELECT blake3, name, src, len, sha1, sha256, md5 FROM artifact WHERE blake3 = ?";

fn select_by_legacy(algorithm: LegacyAlgorithm) -> &'static str {
    match algorithm {
        LegacyAlgorithm::Sha1 => {
            "SELECT blake3, name, src, len, sha1, sha256, md5 FROM artifact WHERE sha1 = ?"
        }
        LegacyAlgorithm::Sha256 => {
            "SELECT blake3, name, src, len, sha1, sha256, md5 FROM artifact WHERE sha256 = ?"
        }
        LegacyAlgorithm::Md5 => {
            "SELECT blake3, name, src, len, sha1, sha256, md5 FROM artifact WHERE md5 = ?"
        }
    }
}

fn select_owner(algorithm: LegacyAlgorithm) -> &'static str {
    match algorithm {
        LegacyAlgorithm::Sha1 => "SELECT blake3 FROM artifact WHERE sha1 = ?",
        LegacyAlgorithm::Sha256 => "SELECT blake3 FROM artifact WHERE sha256 = ?",
        LegacyAlgorithm::Md5 => "SELECT blake3 FROM artifact WHERE md5 = ?",
    }
}

fn update_slot(algorithm: LegacyAlgorithm) -> &'static str {
    match algorithm {
        LegacyAlgorithm::Sha1 => {
            "UPDATE artifact SET sha1 = ? WHERE blake3 = ? AND sha1 IS NULL"
        }
        LegacyAlgorithm::Sha256 => {
            "UPDATE artifact SET sha256 = ? WHERE blake3 = ? AND sha256 IS NULL"
        }
        LegacyAlgorithm::Md5 => "UPDATE artifact SET md5 = ? WHERE blake3 = ? AND md5 IS NULL",
    }
}

async fn fetch_by_canonical(
    conn: &mut SqliteConnection,
    digest: &CanonicalDigest,
) -> Result<Option<ArtifactRecord>, CatalogError> {
    sqlx::query_as::<_, ArtifactRow>(SELECT_BY_CANONICAL)
        .bind(digest.as_bytes().to_vec())
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage_error)?
        .map(ArtifactRow::into_record)
        .transpose()
}

async fn fetch_owner(
    conn: &mut SqliteConnection,
    digest: &LegacyDigest,
) -> Result<Option<CanonicalDigest>, CatalogError> {
    let owner: Option<Vec<u8>> = sqlx::query_scalar(select_owner(digest.algorithm()))
        .bind(digest.as_bytes().to_vec())
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage_error)?;
    owner
        .map(|bytes| {
            CanonicalDigest::from_slice(&bytes)
                .map_err(|e| CatalogError::Storage(format!("corrupt blake3 column: {e}")))
        })
        .transpose()
}

async fn insert_record(
    conn: &mut SqliteConnection,
    record: &ArtifactRecord,
) -> Result<(), CatalogError> {
    let length = i64::try_from(record.length).map_err(|_| {
        CatalogError::InvalidDescriptor(format!("length {} is not storable", record.length))
    })?;
    let slot = |algorithm: LegacyAlgorithm| record.legacy.get(algorithm).map(|d| d.as_bytes().to_vec());
    sqlx::query(
        "INSERT INTO artifact (blake3, name, src, len, sha1, sha256, md5) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.canonical.as_bytes().to_vec())
    .bind(record.name.as_str())
    .bind(record.source.as_str())
    .bind(length)
    .bind(slot(LegacyAlgorithm::Sha1))
    .bind(slot(LegacyAlgorithm::Sha256))
    .bind(slot(LegacyAlgorithm::Md5))
    .execute(&mut *conn)
    .await
    .map_err(storage_error)?;
    Ok(())
}

async fn attach_digest(
    conn: &mut SqliteConnection,
    canonical: &CanonicalDigest,
    digest: &LegacyDigest,
) -> Result<(), CatalogError> {
    let result = sqlx::query(update_slot(digest.algorithm()))
        .bind(digest.as_bytes().to_vec())
        .bind(canonical.as_bytes().to_vec())
        .execute(&mut *conn)
        .await
        .map_err(storage_error)?;
    if result.rows_affected() != 1 {
        return Err(CatalogError::WriteConflict(format!(
            "{} slot of {canonical} was set concurrently",
            digest.algorithm()
        )));
    }
    Ok(())
}

/// Classify a driver error.
pub(crate) fn storage_error(err: sqlx::Error) -> CatalogError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_) => CatalogError::StorageUnavailable(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CatalogError::WriteConflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if is_busy_code(db.code().as_deref()) => {
            CatalogError::StorageUnavailable(db.message().to_string())
        }
        _ => CatalogError::Storage(err.to_string()),
    }
}

/// Extended result codes keep the primary code in the low byte.
fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}
