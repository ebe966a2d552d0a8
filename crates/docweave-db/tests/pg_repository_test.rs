//! PostgreSQL repository tests.
//!
//! These run only when `DATABASE_URL` points at a scratch database; the
//! schema is migrated on first use. Without it each test returns early.

use docweave_db::{
    CreateDocumentRequest, Database, DocumentRepository, Error, FileAssetRepository,
    ListDocumentsRequest, NewFileAsset, NewSummary, SummaryRepository, UpdateDocumentRequest,
};
use uuid::Uuid;

async fn test_db() -> Option<Database> {
    let _ = dotenvy::dotenv();
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        }
    };
    let db = Database::connect(&url).await.expect("connect to test database");
    db.migrate().await.expect("run migrations");
    Some(db)
}

fn new_asset() -> NewFileAsset {
    NewFileAsset {
        id: Uuid::now_v7(),
        original_filename: "a.txt".into(),
        content_type: "text/plain".into(),
        size_bytes: 3,
        storage_key: Uuid::new_v4().simple().to_string(),
        sha256: "a".repeat(64),
        extracted_text: Some("abc".into()),
    }
}

async fn new_doc(db: &Database, title: &str) -> docweave_db::Document {
    db.documents
        .insert(CreateDocumentRequest {
            title: title.into(),
            content: "body".into(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_pg_attachment_versioning_and_orphan_removal() {
    let Some(db) = test_db().await else { return };

    let mut doc = new_doc(&db, "pg versioning").await;
    let file = db.file_assets.insert(new_asset()).await.unwrap();
    assert_eq!(db.file_assets.owner_of(file.id).await.unwrap(), None);

    let stale = doc.clone();
    doc.attach(file.id);
    let mut saved = db.documents.save_attachments(&doc).await.unwrap();
    assert_eq!(saved.version, doc.version + 1);
    assert_eq!(saved.attachment_ids, vec![file.id]);
    assert_eq!(db.file_assets.owner_of(file.id).await.unwrap(), Some(doc.id));

    let err = db.documents.save_attachments(&stale).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {err:?}");

    saved.detach(file.id);
    db.documents.save_attachments(&saved).await.unwrap();
    let err = db.file_assets.fetch(file.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    db.documents.delete(doc.id).await.unwrap();
}

#[tokio::test]
async fn test_pg_document_delete_cascades() {
    let Some(db) = test_db().await else { return };

    let mut doc = new_doc(&db, "pg cascade").await;
    let f1 = db.file_assets.insert(new_asset()).await.unwrap();
    let f2 = db.file_assets.insert(new_asset()).await.unwrap();
    doc.attach(f1.id);
    doc.attach(f2.id);
    db.documents.save_attachments(&doc).await.unwrap();

    db.documents.delete(doc.id).await.unwrap();
    assert!(db
        .file_assets
        .fetch_many(&[f1.id, f2.id])
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        db.documents.fetch(doc.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_pg_update_and_list() {
    let Some(db) = test_db().await else { return };

    let marker = Uuid::new_v4().simple().to_string();
    let doc = new_doc(&db, &format!("pg list {marker}")).await;
    let updated = db
        .documents
        .update(
            doc.id,
            UpdateDocumentRequest {
                title: None,
                content: Some("changed".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.content, "changed");
    assert_eq!(updated.title, doc.title);

    let page = db
        .documents
        .list(ListDocumentsRequest {
            query: Some(marker.to_uppercase()),
            limit: None,
            offset: None,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.documents[0].id, doc.id);

    db.documents.delete(doc.id).await.unwrap();
}

#[tokio::test]
async fn test_pg_summaries_survive_file_delete() {
    let Some(db) = test_db().await else { return };

    let file = db.file_assets.insert(new_asset()).await.unwrap();
    db.summaries
        .insert(NewSummary {
            file_asset_id: file.id,
            summary_text: "S".into(),
            model_name: "m".into(),
            style: "concise".into(),
            latency_ms: 5,
        })
        .await
        .unwrap();

    FileAssetRepository::delete(&db.file_assets, file.id).await.unwrap();
    let latest = db.summaries.latest_for_file(file.id).await.unwrap();
    assert_eq!(latest.map(|s| s.summary_text).as_deref(), Some("S"));

    assert_eq!(db.summaries.delete_for_file(file.id).await.unwrap(), 1);
}
