//! Attachment coordinator behaviour over the in-memory repositories and a
//! temporary blob directory.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::io::AsyncRead;
use uuid::Uuid;

use docweave_db::{
    AttachmentCoordinator, BlobStore, CreateDocumentRequest, DocumentRepository, Error,
    FileAsset, FileAssetRepository, FilesystemBlobStore, MemoryRepository, NewFileAsset,
    NewSummary, Repositories, Result, StoredBlob, SummaryRepository, SummaryScheduler,
    TextExtractor,
};

/// Extracts plain text verbatim; everything else is unsupported.
struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn is_supported(&self, content_type: &str) -> bool {
        content_type == "text/plain"
    }

    async fn extract_text(&self, data: &[u8], _filename: &str) -> String {
        String::from_utf8_lossy(data).into_owned()
    }
}

#[derive(Default)]
struct RecordingScheduler {
    calls: Mutex<Vec<(Uuid, String)>>,
}

impl SummaryScheduler for RecordingScheduler {
    fn schedule(&self, file_asset_id: Uuid, text: String) {
        self.calls.lock().unwrap().push((file_asset_id, text));
    }
}

/// Blob store whose deletes fail for chosen keys.
struct FlakyDeleteStore {
    inner: FilesystemBlobStore,
    failing: Mutex<HashSet<String>>,
    attempted: Mutex<Vec<String>>,
}

#[async_trait]
impl BlobStore for FlakyDeleteStore {
    async fn save(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        filename: &str,
        size_hint: Option<u64>,
    ) -> Result<StoredBlob> {
        self.inner.save(reader, filename, size_hint).await
    }

    async fn open(&self, key: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        self.inner.open(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.attempted.lock().unwrap().push(key.to_string());
        if self.failing.lock().unwrap().contains(key) {
            return Err(Error::storage(
                format!("delete blob {}", key),
                std::io::Error::other("disk on fire"),
            ));
        }
        self.inner.delete(key).await
    }
}

/// File asset repository whose inserts always fail.
struct BrokenInsertRepo(MemoryRepository);

#[async_trait]
impl FileAssetRepository for BrokenInsertRepo {
    async fn insert(&self, _asset: NewFileAsset) -> Result<FileAsset> {
        Err(Error::Internal("insert refused".to_string()))
    }
    async fn fetch(&self, id: Uuid) -> Result<FileAsset> {
        FileAssetRepository::fetch(&self.0, id).await
    }
    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<FileAsset>> {
        self.0.fetch_many(ids).await
    }
    async fn owner_of(&self, id: Uuid) -> Result<Option<Uuid>> {
        self.0.owner_of(id).await
    }
    async fn delete(&self, id: Uuid) -> Result<()> {
        FileAssetRepository::delete(&self.0, id).await
    }
}

struct Harness {
    _dir: TempDir,
    root: std::path::PathBuf,
    store: MemoryRepository,
    repos: Repositories,
    scheduler: Arc<RecordingScheduler>,
    coordinator: AttachmentCoordinator,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("uploads");
    let store = MemoryRepository::new();
    let repos = Repositories::from_memory(store.clone());
    let scheduler = Arc::new(RecordingScheduler::default());
    let coordinator = AttachmentCoordinator::new(
        repos.documents.clone(),
        repos.file_assets.clone(),
        Arc::new(FilesystemBlobStore::new(&root)),
        Arc::new(PlainTextExtractor),
    )
    .with_scheduler(scheduler.clone());
    Harness {
        _dir: dir,
        root,
        store,
        repos,
        scheduler,
        coordinator,
    }
}

fn blob_count(root: &std::path::Path) -> usize {
    match std::fs::read_dir(root) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

async fn create_doc(repos: &Repositories, title: &str) -> Uuid {
    repos
        .documents
        .insert(CreateDocumentRequest {
            title: title.to_string(),
            content: String::new(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_add_plain_text_attachment_end_to_end() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;
    let bytes = b"0123456789";

    let asset = h
        .coordinator
        .add_attachment(doc_id, bytes, "ten.txt", Some("text/plain"))
        .await
        .unwrap();

    assert_eq!(asset.size_bytes, 10);
    assert_eq!(asset.sha256, hex::encode(Sha256::digest(bytes)));
    assert_eq!(asset.extracted_text.as_deref(), Some("0123456789"));
    assert_eq!(asset.original_filename, "ten.txt");

    let doc = h.repos.documents.fetch(doc_id).await.unwrap();
    assert_eq!(doc.attachment_ids, vec![asset.id]);

    let (meta, data) = h.coordinator.open_attachment(doc_id, asset.id).await.unwrap();
    assert_eq!(meta.id, asset.id);
    assert_eq!(data, bytes);

    let calls = h.scheduler.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![(asset.id, "0123456789".to_string())]);
}

#[tokio::test]
async fn test_unsupported_type_skips_extraction_and_summary() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

    let asset = h
        .coordinator
        .add_attachment(doc_id, &png, "pic.png", None)
        .await
        .unwrap();

    assert_eq!(asset.content_type, "image/png");
    assert_eq!(asset.extracted_text, None);
    assert!(h.scheduler.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_text_is_not_scheduled() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;

    let asset = h
        .coordinator
        .add_attachment(doc_id, b"   \n\t ", "blank.txt", Some("text/plain"))
        .await
        .unwrap();

    assert!(asset.extracted_text.is_some());
    assert!(h.scheduler.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_add_to_missing_document_leaves_no_blob() {
    let h = harness();

    let err = h
        .coordinator
        .add_attachment(Uuid::now_v7(), b"orphan?", "o.txt", Some("text/plain"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    assert_eq!(blob_count(&h.root), 0);
    assert_eq!(h.store.file_asset_count(), 0);
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;

    let err = h
        .coordinator
        .add_attachment(doc_id, b"", "empty.txt", Some("text/plain"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(blob_count(&h.root), 0);
}

#[tokio::test]
async fn test_failed_row_insert_removes_blob() {
    let dir = TempDir::new().unwrap();
    let store = MemoryRepository::new();
    let coordinator = AttachmentCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(BrokenInsertRepo(store.clone())),
        Arc::new(FilesystemBlobStore::new(dir.path())),
        Arc::new(PlainTextExtractor),
    );
    let doc_id = DocumentRepository::insert(
        &store,
        CreateDocumentRequest {
            title: "Doc".into(),
            content: String::new(),
        },
    )
    .await
    .unwrap()
    .id;

    let err = coordinator
        .add_attachment(doc_id, b"bytes", "b.txt", Some("text/plain"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Internal(_)));
    assert_eq!(blob_count(dir.path()), 0);
}

#[tokio::test]
async fn test_remove_attachment_deletes_row_and_blob() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;
    let asset = h
        .coordinator
        .add_attachment(doc_id, b"remove me", "r.txt", Some("text/plain"))
        .await
        .unwrap();
    assert_eq!(blob_count(&h.root), 1);

    h.coordinator.remove_attachment(doc_id, asset.id).await.unwrap();

    assert_eq!(blob_count(&h.root), 0);
    assert!(h.repos.documents.fetch(doc_id).await.unwrap().attachment_ids.is_empty());
    let err = h.coordinator.file(asset.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_remove_attachment_of_other_document_is_mismatch() {
    let h = harness();
    let doc_a = create_doc(&h.repos, "A").await;
    let doc_b = create_doc(&h.repos, "B").await;
    let asset = h
        .coordinator
        .add_attachment(doc_a, b"belongs to a", "a.txt", Some("text/plain"))
        .await
        .unwrap();
    let before_a = h.repos.documents.fetch(doc_a).await.unwrap();
    let before_b = h.repos.documents.fetch(doc_b).await.unwrap();

    let err = h
        .coordinator
        .remove_attachment(doc_b, asset.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AttachmentMismatch { .. }), "got {err:?}");

    assert_eq!(h.repos.documents.fetch(doc_a).await.unwrap(), before_a);
    assert_eq!(h.repos.documents.fetch(doc_b).await.unwrap(), before_b);
    assert_eq!(blob_count(&h.root), 1);

    let err = h
        .coordinator
        .remove_attachment(doc_b, Uuid::now_v7())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_delete_document_attempts_every_blob_despite_failure() {
    let dir = TempDir::new().unwrap();
    let store = MemoryRepository::new();
    let repos = Repositories::from_memory(store.clone());
    let blobs = Arc::new(FlakyDeleteStore {
        inner: FilesystemBlobStore::new(dir.path()),
        failing: Mutex::new(HashSet::new()),
        attempted: Mutex::new(Vec::new()),
    });
    let coordinator = AttachmentCoordinator::new(
        repos.documents.clone(),
        repos.file_assets.clone(),
        blobs.clone(),
        Arc::new(PlainTextExtractor),
    );
    let doc_id = create_doc(&repos, "Doc").await;

    let mut keys = Vec::new();
    for i in 0..3 {
        let asset = coordinator
            .add_attachment(doc_id, format!("file {i}").as_bytes(), "f.txt", Some("text/plain"))
            .await
            .unwrap();
        keys.push(asset.storage_key);
    }
    blobs.failing.lock().unwrap().insert(keys[1].clone());

    let deletion = coordinator
        .delete_document_with_attachments(doc_id)
        .await
        .unwrap();

    assert_eq!(deletion.attachments, 3);
    assert_eq!(deletion.blobs_deleted, 2);
    assert_eq!(deletion.blob_failures, 1);

    let attempted: HashSet<String> = blobs.attempted.lock().unwrap().iter().cloned().collect();
    assert_eq!(attempted, keys.iter().cloned().collect::<HashSet<_>>());

    assert_eq!(store.file_asset_count(), 0);
    let err = repos.documents.fetch(doc_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_all_kept() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Busy").await;
    let coordinator = Arc::new(h.coordinator.clone());

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .add_attachment(
                        doc_id,
                        format!("payload {i}").as_bytes(),
                        &format!("f{i}.txt"),
                        Some("text/plain"),
                    )
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(asset) => {
                ids.insert(asset.id);
            }
            // Exhausting the retry budget is reported, never silently lost.
            Err(Error::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    let doc = h.repos.documents.fetch(doc_id).await.unwrap();
    let persisted: HashSet<Uuid> = doc.attachment_ids.into_iter().collect();
    assert_eq!(persisted, ids);
    assert_eq!(h.store.file_asset_count(), ids.len());
    assert_eq!(blob_count(&h.root), ids.len());
}

#[tokio::test]
async fn test_two_concurrent_adds_both_visible() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Pair").await;

    let (a, b) = tokio::join!(
        h.coordinator
            .add_attachment(doc_id, b"first file", "a.txt", Some("text/plain")),
        h.coordinator
            .add_attachment(doc_id, b"second file", "b.txt", Some("text/plain")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let doc = h.repos.documents.fetch(doc_id).await.unwrap();
    let persisted: HashSet<Uuid> = doc.attachment_ids.into_iter().collect();
    assert_eq!(persisted, HashSet::from([a.id, b.id]));
}

#[tokio::test]
async fn test_standalone_upload_and_delete() {
    let h = harness();

    let asset = h
        .coordinator
        .upload_file(b"loose bytes", "loose.txt", Some("text/plain"))
        .await
        .unwrap();
    assert_eq!(asset.extracted_text, None);
    assert!(h.scheduler.calls.lock().unwrap().is_empty());
    assert_eq!(h.repos.file_assets.owner_of(asset.id).await.unwrap(), None);

    let (_, data) = h.coordinator.open_file(asset.id).await.unwrap();
    assert_eq!(data, b"loose bytes");

    h.coordinator.delete_file(asset.id).await.unwrap();
    assert_eq!(blob_count(&h.root), 0);
    assert!(matches!(
        h.coordinator.file(asset.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_delete_file_detaches_from_owner() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;
    let keep = h
        .coordinator
        .add_attachment(doc_id, b"keep", "keep.txt", Some("text/plain"))
        .await
        .unwrap();
    let drop = h
        .coordinator
        .add_attachment(doc_id, b"drop", "drop.txt", Some("text/plain"))
        .await
        .unwrap();

    h.coordinator.delete_file(drop.id).await.unwrap();

    let listed = h.coordinator.list_attachments(doc_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keep.id);
    assert_eq!(blob_count(&h.root), 1);
}

#[tokio::test]
async fn test_remove_with_missing_blob_still_removes_row() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;
    let asset = h
        .coordinator
        .add_attachment(doc_id, b"bytes", "x.txt", Some("text/plain"))
        .await
        .unwrap();
    std::fs::remove_file(h.root.join(&asset.storage_key)).unwrap();

    h.coordinator.remove_attachment(doc_id, asset.id).await.unwrap();
    assert!(h.coordinator.list_attachments(doc_id).await.unwrap().is_empty());
}

async fn record_summary(repos: &Repositories, file_asset_id: Uuid, text: &str) {
    repos
        .summaries
        .insert(NewSummary {
            file_asset_id,
            summary_text: text.to_string(),
            model_name: "test-model".to_string(),
            style: "concise".to_string(),
            latency_ms: 3,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_summaries_survive_every_delete_path() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;
    let mut ids = Vec::new();
    for name in ["removed.txt", "deleted.txt", "cascaded.txt"] {
        let asset = h
            .coordinator
            .add_attachment(doc_id, name.as_bytes(), name, Some("text/plain"))
            .await
            .unwrap();
        record_summary(&h.repos, asset.id, name).await;
        ids.push(asset.id);
    }

    h.coordinator.remove_attachment(doc_id, ids[0]).await.unwrap();
    h.coordinator.delete_file(ids[1]).await.unwrap();
    h.coordinator
        .delete_document_with_attachments(doc_id)
        .await
        .unwrap();

    assert_eq!(h.store.file_asset_count(), 0);
    assert_eq!(blob_count(&h.root), 0);
    for id in ids {
        let kept = h.repos.summaries.list_for_file(id).await.unwrap();
        assert_eq!(kept.len(), 1, "summary of {id} was removed");
        assert_eq!(kept[0].file_asset_id, id);
    }
}

#[tokio::test]
async fn test_attachments_of_loaded_document() {
    let h = harness();
    let doc_id = create_doc(&h.repos, "Doc").await;
    let first = h
        .coordinator
        .add_attachment(doc_id, b"one", "1.txt", Some("text/plain"))
        .await
        .unwrap();
    let second = h
        .coordinator
        .add_attachment(doc_id, b"two", "2.txt", Some("text/plain"))
        .await
        .unwrap();

    let doc = h.repos.documents.fetch(doc_id).await.unwrap();
    let ids: HashSet<Uuid> = h
        .coordinator
        .attachments_of(&doc)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, HashSet::from([first.id, second.id]));
}
