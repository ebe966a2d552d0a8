//! In-process repositories.
//!
//! `MemoryRepository` implements the document, file asset and summary
//! repositories over one shared state, with the same semantics as the
//! PostgreSQL implementations: version-checked attachment writes, cascade
//! on document delete, and orphan removal. Used by tests and by
//! database-less deployments (`STORAGE_BACKEND=memory`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use docweave_core::{
    new_v7, CreateDocumentRequest, Document, DocumentRepository, Error, FileAsset,
    FileAssetRepository, ListDocumentsRequest, ListDocumentsResponse, NewFileAsset, NewSummary,
    Result, Summary, SummaryRepository, UpdateDocumentRequest,
};

#[derive(Default)]
struct MemoryState {
    /// Documents as stored; `attachment_ids` is derived from `owners` on read.
    documents: HashMap<Uuid, Document>,
    files: HashMap<Uuid, FileAsset>,
    /// file asset id -> owning document id
    owners: HashMap<Uuid, Uuid>,
    summaries: Vec<Summary>,
}

impl MemoryState {
    fn attachment_ids(&self, document_id: Uuid) -> Vec<Uuid> {
        let mut owned: Vec<&FileAsset> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == document_id)
            .filter_map(|(file_id, _)| self.files.get(file_id))
            .collect();
        owned.sort_by_key(|f| (f.created_at, f.id));
        owned.into_iter().map(|f| f.id).collect()
    }

    fn materialize(&self, id: Uuid) -> Result<Document> {
        let mut doc = self
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Document {}", id)))?;
        doc.attachment_ids = self.attachment_ids(id);
        Ok(doc)
    }

    fn remove_file(&mut self, id: Uuid) -> bool {
        self.owners.remove(&id);
        self.files.remove(&id).is_some()
    }
}

/// Shared in-memory store implementing every repository trait.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory repository lock poisoned".to_string()))
    }

    /// Number of stored file asset rows, owned or not.
    pub fn file_asset_count(&self) -> usize {
        self.lock().map(|s| s.files.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    async fn insert(&self, req: CreateDocumentRequest) -> Result<Document> {
        if req.title.trim().is_empty() {
            return Err(Error::InvalidInput("Title must not be empty".to_string()));
        }
        let now = Utc::now();
        let doc = Document {
            id: new_v7(),
            title: req.title.trim().to_string(),
            content: req.content,
            attachment_ids: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.documents.insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn fetch(&self, id: Uuid) -> Result<Document> {
        self.lock()?.materialize(id)
    }

    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse> {
        let state = self.lock()?;
        let needle = req.needle().map(str::to_lowercase);

        let mut matching: Vec<&Document> = state
            .documents
            .values()
            .filter(|d| match &needle {
                Some(n) => {
                    d.title.to_lowercase().contains(n) || d.content.to_lowercase().contains(n)
                }
                None => true,
            })
            .collect();
        matching.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));

        let total = matching.len() as i64;
        let documents = matching
            .into_iter()
            .skip(req.effective_offset() as usize)
            .take(req.effective_limit() as usize)
            .map(|d| state.materialize(d.id))
            .collect::<Result<Vec<_>>>()?;

        Ok(ListDocumentsResponse { documents, total })
    }

    async fn update(&self, id: Uuid, req: UpdateDocumentRequest) -> Result<Document> {
        if let Some(title) = req.title.as_deref() {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("Title must not be empty".to_string()));
            }
        }
        let mut state = self.lock()?;
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Document {}", id)))?;
        if let Some(title) = req.title {
            doc.title = title.trim().to_string();
        }
        if let Some(content) = req.content {
            doc.content = content;
        }
        doc.updated_at = Utc::now();
        state.materialize(id)
    }

    async fn save_attachments(&self, doc: &Document) -> Result<Document> {
        let mut state = self.lock()?;
        let stored = state
            .documents
            .get(&doc.id)
            .ok_or_else(|| Error::NotFound(format!("Document {}", doc.id)))?;
        if stored.version != doc.version {
            return Err(Error::Conflict(format!(
                "Document {} changed since version {}",
                doc.id, doc.version
            )));
        }

        for file_id in &doc.attachment_ids {
            if state.files.contains_key(file_id) && !state.owners.contains_key(file_id) {
                state.owners.insert(*file_id, doc.id);
            }
        }

        let orphans: Vec<Uuid> = state
            .owners
            .iter()
            .filter(|(file_id, owner)| **owner == doc.id && !doc.attachment_ids.contains(file_id))
            .map(|(file_id, _)| *file_id)
            .collect();
        for file_id in orphans {
            state.remove_file(file_id);
        }

        if let Some(stored) = state.documents.get_mut(&doc.id) {
            stored.version += 1;
            stored.updated_at = Utc::now();
        }
        state.materialize(doc.id)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock()?;
        if state.documents.remove(&id).is_none() {
            return Err(Error::NotFound(format!("Document {}", id)));
        }
        let owned: Vec<Uuid> = state
            .owners
            .iter()
            .filter(|(_, owner)| **owner == id)
            .map(|(file_id, _)| *file_id)
            .collect();
        for file_id in owned {
            state.remove_file(file_id);
        }
        Ok(())
    }
}

#[async_trait]
impl FileAssetRepository for MemoryRepository {
    async fn insert(&self, asset: NewFileAsset) -> Result<FileAsset> {
        let mut state = self.lock()?;
        if state.files.contains_key(&asset.id) {
            return Err(Error::InvalidInput(format!(
                "File asset {} already exists",
                asset.id
            )));
        }
        if state
            .files
            .values()
            .any(|f| f.storage_key == asset.storage_key)
        {
            return Err(Error::InvalidInput(format!(
                "Storage key {} already in use",
                asset.storage_key
            )));
        }
        let now = Utc::now();
        let row = FileAsset {
            id: asset.id,
            original_filename: asset.original_filename,
            content_type: asset.content_type,
            size_bytes: asset.size_bytes,
            storage_key: asset.storage_key,
            sha256: asset.sha256,
            extracted_text: asset.extracted_text,
            created_at: now,
            updated_at: now,
        };
        state.files.insert(row.id, row.clone());
        Ok(row)
    }

    async fn fetch(&self, id: Uuid) -> Result<FileAsset> {
        self.lock()?
            .files
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("File asset {}", id)))
    }

    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<FileAsset>> {
        let state = self.lock()?;
        let mut found: Vec<FileAsset> = ids
            .iter()
            .filter_map(|id| state.files.get(id).cloned())
            .collect();
        found.sort_by_key(|f| (f.created_at, f.id));
        found.dedup_by_key(|f| f.id);
        Ok(found)
    }

    async fn owner_of(&self, id: Uuid) -> Result<Option<Uuid>> {
        let state = self.lock()?;
        if !state.files.contains_key(&id) {
            return Err(Error::NotFound(format!("File asset {}", id)));
        }
        Ok(state.owners.get(&id).copied())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        if self.lock()?.remove_file(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("File asset {}", id)))
        }
    }
}

#[async_trait]
impl SummaryRepository for MemoryRepository {
    async fn insert(&self, summary: NewSummary) -> Result<Summary> {
        let row = Summary {
            id: new_v7(),
            file_asset_id: summary.file_asset_id,
            summary_text: summary.summary_text,
            model_name: summary.model_name,
            style: summary.style,
            latency_ms: summary.latency_ms,
            created_at: Utc::now(),
        };
        self.lock()?.summaries.push(row.clone());
        Ok(row)
    }

    async fn list_for_file(&self, file_asset_id: Uuid) -> Result<Vec<Summary>> {
        let state = self.lock()?;
        let mut rows: Vec<Summary> = state
            .summaries
            .iter()
            .filter(|s| s.file_asset_id == file_asset_id)
            .cloned()
            .collect();
        // Newest first; equal timestamps keep reverse insertion order.
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn latest_for_file(&self, file_asset_id: Uuid) -> Result<Option<Summary>> {
        Ok(self
            .list_for_file(file_asset_id)
            .await?
            .into_iter()
            .next())
    }

    async fn delete_for_file(&self, file_asset_id: Uuid) -> Result<u64> {
        let mut state = self.lock()?;
        let before = state.summaries.len();
        state.summaries.retain(|s| s.file_asset_id != file_asset_id);
        Ok((before - state.summaries.len()) as u64)
    }
}
