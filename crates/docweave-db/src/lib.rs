//! # docweave-db
//!
//! Storage layer for docweave.
//!
//! This crate provides:
//! - Connection pool management and schema migrations
//! - PostgreSQL repositories for documents, file assets and summaries
//! - An in-memory repository set with the same semantics
//! - The filesystem blob store
//! - The attachment coordinator tying blobs and rows together
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docweave_db::{AttachmentCoordinator, Database, FilesystemBlobStore, Repositories};
//!
//! let db = Database::connect("postgres://localhost/docweave").await?;
//! db.migrate().await?;
//! let repos = db.repositories();
//! let coordinator = AttachmentCoordinator::new(
//!     repos.documents.clone(),
//!     repos.file_assets.clone(),
//!     Arc::new(FilesystemBlobStore::new("uploads")),
//!     extractor,
//! );
//! ```

pub mod attachments;
pub mod blob_store;
pub mod documents;
pub mod file_assets;
pub mod memory;
pub mod pool;
pub mod summaries;

use std::sync::Arc;

// Re-export core types
pub use docweave_core::*;

pub use attachments::{AttachmentCoordinator, DocumentDeletion};
pub use blob_store::{generate_storage_key, BlobStore, FilesystemBlobStore};
pub use documents::PgDocumentRepository;
pub use file_assets::PgFileAssetRepository;
pub use memory::MemoryRepository;
pub use pool::PoolConfig;
pub use summaries::PgSummaryRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// The repository set a deployment runs on, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub documents: Arc<dyn DocumentRepository>,
    pub file_assets: Arc<dyn FileAssetRepository>,
    pub summaries: Arc<dyn SummaryRepository>,
}

impl Repositories {
    /// In-process repositories sharing one state.
    pub fn memory() -> Self {
        Self::from_memory(MemoryRepository::new())
    }

    /// Wrap an existing in-memory store, keeping a handle for inspection.
    pub fn from_memory(store: MemoryRepository) -> Self {
        Self {
            documents: Arc::new(store.clone()),
            file_assets: Arc::new(store.clone()),
            summaries: Arc::new(store),
        }
    }
}

/// PostgreSQL-backed database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::PgPool,
    pub documents: PgDocumentRepository,
    pub file_assets: PgFileAssetRepository,
    pub summaries: PgSummaryRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            documents: PgDocumentRepository::new(pool.clone()),
            file_assets: PgFileAssetRepository::new(pool.clone()),
            summaries: PgSummaryRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the default pool sizing.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    /// Connect with explicit pool sizing, usually [`PoolConfig::from_env`].
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        Ok(Self::new(config.connect(url).await?))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// The repositories as trait objects.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            documents: Arc::new(self.documents.clone()),
            file_assets: Arc::new(self.file_assets.clone()),
            summaries: Arc::new(self.summaries.clone()),
        }
    }
}
