//! Content-addressed blob storage with a filesystem backend.
//!
//! Every stored object gets a fresh random key (optionally suffixed with the
//! source file's extension). The SHA-256 digest is computed while the bytes
//! are written, so nothing is read twice.
//!
//! ## Example
//!
//! ```rust,ignore
//! use docweave_db::{BlobStore, FilesystemBlobStore};
//!
//! let store = FilesystemBlobStore::new("/var/docweave/uploads");
//! let blob = store.save_bytes(b"hello", "hello.txt").await?;
//! assert_eq!(store.load(&blob.key).await?, b"hello");
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use docweave_core::{defaults, file_extension, Error, Result, StoredBlob};

/// Byte storage addressed by opaque keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream `reader` into a new object.
    ///
    /// `filename` only contributes its extension to the key. `size_hint`
    /// sizes the copy buffer and is otherwise advisory.
    async fn save(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        filename: &str,
        size_hint: Option<u64>,
    ) -> Result<StoredBlob>;

    /// Open an object for streaming. `Error::NotFound` if absent.
    async fn open(&self, key: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>>;

    /// Delete an object. Returns false if it was already absent.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Store an in-memory buffer.
    async fn save_bytes(&self, data: &[u8], filename: &str) -> Result<StoredBlob> {
        let mut reader = data;
        self.save(&mut reader, filename, Some(data.len() as u64))
            .await
    }

    /// Read a whole object into memory. `Error::NotFound` if absent.
    async fn load(&self, key: &str) -> Result<Vec<u8>> {
        let mut reader = self.open(key).await?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| Error::storage(format!("read blob {}", key), e))?;
        Ok(data)
    }
}

/// Generate a fresh storage key, keeping a sanitised extension of `filename`.
///
/// Format: `{32 hex chars}` or `{32 hex chars}.{ext}`.
pub fn generate_storage_key(filename: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    match file_extension(filename) {
        Some(ext) => format!("{}.{}", token, ext),
        None => token,
    }
}

/// Keys are flat file names; anything that could escape the root is refused.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Malformed storage key: {:?}", key)))
    }
}

/// Filesystem blob store. One file per object, named by its key, directly
/// under the root directory.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store rooted at `UPLOAD_DIR`, or the default location.
    pub fn from_env() -> Self {
        let root = std::env::var(defaults::ENV_UPLOAD_DIR)
            .unwrap_or_else(|_| defaults::UPLOAD_DIR.to_string());
        Self::new(root)
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Check that the root is writable, readable and deletable.
    ///
    /// Run at startup to surface permission or mount problems before the
    /// first upload does.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let marker = self.root.join(".health-check");

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.root, e))?;

        let data = b"blob-store-health-check";
        fs::write(&marker, data)
            .await
            .map_err(|e| format!("write({:?}): {}", marker, e))?;

        let read_back = fs::read(&marker)
            .await
            .map_err(|e| format!("read({:?}): {}", marker, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&marker)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", marker, e))?;
        Ok(())
    }

    /// Copy `reader` into `file`, hashing each chunk as it is written.
    async fn copy_hashing(
        reader: &mut (dyn AsyncRead + Unpin + Send),
        file: &mut fs::File,
        buffer_len: usize,
    ) -> std::io::Result<(String, u64)> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; buffer_len];
        let mut size = 0u64;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
            size += n as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok((hex::encode(hasher.finalize()), size))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn save(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        filename: &str,
        size_hint: Option<u64>,
    ) -> Result<StoredBlob> {
        let start = Instant::now();
        let key = generate_storage_key(filename);
        let final_path = self.object_path(&key)?;
        let temp_path = self.root.join(format!(".{}.partial", key));

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::storage(format!("create blob root {}", self.root.display()), e))?;

        let buffer_len = size_hint
            .map(|hint| hint.clamp(1, defaults::BLOB_COPY_BUFFER_BYTES as u64) as usize)
            .unwrap_or(defaults::BLOB_COPY_BUFFER_BYTES);

        // Write to a temp name and rename, so a crashed write never leaves a
        // truncated object under a live key.
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::storage(format!("create blob {}", key), e))?;

        // Permissions go on the temp file so the rename is the last fallible
        // step and a failure never leaves an object under the final key.
        let copied = async {
            let done = Self::copy_hashing(reader, &mut file, buffer_len).await?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(std::fs::Permissions::from_mode(0o644))
                    .await?;
            }
            Ok::<_, std::io::Error>(done)
        }
        .await;
        drop(file);

        let (sha256, size) = match copied {
            Ok(done) => done,
            Err(e) => {
                warn!(
                    subsystem = "storage",
                    component = "blob_store",
                    op = "save",
                    storage_key = %key,
                    error = %e,
                    "Blob write failed"
                );
                let _ = fs::remove_file(&temp_path).await;
                return Err(Error::storage(format!("write blob {}", key), e));
            }
        };

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::storage(format!("commit blob {}", key), e));
        }

        debug!(
            subsystem = "storage",
            component = "blob_store",
            op = "save",
            storage_key = %key,
            size_bytes = size,
            size_hint = ?size_hint,
            duration_ms = start.elapsed().as_millis() as u64,
            "Blob stored"
        );

        Ok(StoredBlob { key, sha256, size })
    }

    async fn open(&self, key: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        let path = self.object_path(key)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Blob {}", key)))
            }
            Err(e) => Err(Error::storage(format!("open blob {}", key), e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(
                    subsystem = "storage",
                    component = "blob_store",
                    op = "delete",
                    storage_key = %key,
                    "Blob deleted"
                );
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage(format!("delete blob {}", key), e)),
        }
    }
}
