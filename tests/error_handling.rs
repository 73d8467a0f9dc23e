//! Error handling and edge case tests.

use folio::attachments::DEFAULT_MAX_UPLOAD_BYTES;
use folio::{ErrorKind, Fields, RecordStore, StoreConfig, StoreError, UploadFile};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn test_store(dir: &TempDir) -> RecordStore {
    RecordStore::open(StoreConfig::with_root(dir.path())).unwrap()
}

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn gif(name: &str) -> UploadFile {
    UploadFile::new(name, "image/gif", b"GIF89a-test".to_vec())
}

fn entries(path: &Path) -> usize {
    fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
}

// --- NotFound ---

#[test]
fn test_unknown_collection() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let results = [
        store.create_record("blog", Fields::new()).map(|_| ()),
        store.update_record("blog", "x", Fields::new()).map(|_| ()),
        store.delete_record("blog", "x").map(|_| ()),
        store.upload_attachments("blog", "x", vec![gif("a.gif")]).map(|_| ()),
        store.delete_attachment("blog", "x", "a.gif").map(|_| ()),
        store.list_collection("blog").map(|_| ()),
    ];
    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    assert!(!dir.path().join("data/blog.json").exists());
}

#[test]
fn test_unknown_record() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    store.create_record("team", fields(json!({"name": "A"}))).unwrap();

    let results = [
        store.update_record("team", "missing", Fields::new()).map(|_| ()),
        store.delete_record("team", "missing").map(|_| ()),
        store.upload_attachments("team", "missing", vec![gif("a.gif")]).map(|_| ()),
        store.delete_attachment("team", "missing", "a.gif").map(|_| ()),
    ];
    for result in results {
        assert!(matches!(result, Err(StoreError::RecordNotFound { .. })));
    }
    assert_eq!(store.load("team").len(), 1);
    assert!(!dir.path().join("static/storage/pbc_3824009647/missing").exists());
}

#[test]
fn test_resolve_missing_attachment() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let err = store
        .resolve_attachment_path("pbc_3824009647", "nobody", "x.png")
        .unwrap_err();
    assert!(matches!(err, StoreError::AttachmentNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// --- Upload validation ---

#[test]
fn test_upload_empty_batch() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", Fields::new()).unwrap();

    let err = store
        .upload_attachments("team", record.id.as_str(), Vec::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_upload_disallowed_type_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", Fields::new()).unwrap();
    let id = record.id.as_str();

    let doc_path = dir.path().join("data/team.json");
    let before = fs::read(&doc_path).unwrap();

    let err = store
        .upload_attachments(
            "team",
            id,
            vec![
                gif("ok.gif"),
                UploadFile::new("notes.txt", "text/plain", b"hello".to_vec()),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    assert_eq!(fs::read(&doc_path).unwrap(), before);
    let record_dir = dir.path().join("static/storage/pbc_3824009647").join(id);
    assert_eq!(entries(&record_dir), 0);
}

#[test]
fn test_upload_undecodable_image_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", Fields::new()).unwrap();
    let id = record.id.as_str();

    let err = store
        .upload_attachments(
            "team",
            id,
            vec![
                gif("ok.gif"),
                UploadFile::new("broken.png", "image/png", b"not a png".to_vec()),
            ],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let record_dir = dir.path().join("static/storage/pbc_3824009647").join(id);
    assert_eq!(entries(&record_dir), 0);
    assert!(store.get_record("team", id).unwrap().pic.is_empty());
}

#[test]
fn test_upload_too_large() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", Fields::new()).unwrap();

    let huge = UploadFile::new(
        "huge.gif",
        "image/gif",
        vec![0u8; DEFAULT_MAX_UPLOAD_BYTES as usize + 1],
    );
    let err = store
        .upload_attachments("team", record.id.as_str(), vec![huge])
        .unwrap_err();
    assert!(matches!(err, StoreError::PayloadTooLarge { .. }));
    assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
}

#[test]
fn test_configured_upload_ceiling() {
    let dir = TempDir::new().unwrap();
    let mut config = StoreConfig::with_root(dir.path());
    config.max_upload_bytes = 8;
    let store = RecordStore::open(config).unwrap();
    let record = store.create_record("team", Fields::new()).unwrap();

    let err = store
        .upload_attachments("team", record.id.as_str(), vec![gif("a.gif")])
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::PayloadTooLarge { limit: 8, .. }
    ));
}

// --- Path hardening ---

#[test]
fn test_traversal_rejected() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", Fields::new()).unwrap();
    let id = record.id.as_str();

    let err = store
        .delete_attachment("team", id, "../../../data/team.json")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(dir.path().join("data/team.json").is_file());

    let err = store
        .resolve_attachment_path("..", "..", "data")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// --- Best-effort cleanup ---

#[test]
fn test_delete_record_without_storage_dir() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("partner", Fields::new()).unwrap();
    let id = record.id.as_str();

    fs::remove_dir_all(dir.path().join("static/storage/cx8afblkixaub05").join(id)).unwrap();

    store.delete_record("partner", id).unwrap();
    assert!(store.load("partner").is_empty());
}

#[test]
fn test_delete_attachment_missing_file() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", Fields::new()).unwrap();
    let id = record.id.as_str();

    let uploaded = store.upload_attachments("team", id, vec![gif("a.gif")]).unwrap();
    let name = uploaded.pic[0].clone();
    fs::remove_file(
        store
            .resolve_attachment_path("pbc_3824009647", id, &name)
            .unwrap(),
    )
    .unwrap();

    let after = store.delete_attachment("team", id, &name).unwrap();
    assert!(after.pic.is_empty());
}

// --- Storage failures ---

#[test]
fn test_update_save_failure() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", fields(json!({"name": "A"}))).unwrap();

    // A directory squatting on the temp path makes the write fail.
    fs::create_dir_all(dir.path().join("data/team.json.tmp")).unwrap();

    let err = store
        .update_record("team", record.id.as_str(), fields(json!({"name": "B"})))
        .unwrap_err();
    assert!(matches!(err, StoreError::SaveFailed(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(
        store.get_record("team", record.id.as_str()).unwrap().get("name"),
        Some(&json!("A"))
    );
}

#[test]
fn test_create_over_corrupt_document() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    fs::write(dir.path().join("data/team.json"), b"not json at all").unwrap();

    assert!(store.load("team").is_empty());
    // Lenient read: the corrupt document is replaced on the next save.
    let record = store.create_record("team", fields(json!({"name": "A"}))).unwrap();
    let records = store.load("team");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, record.id);
}

#[test]
fn test_irregular_records_survive_mutation() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let doc_path = dir.path().join("data/team.json");

    let document = json!([
        {
            "id": "keepkeepkeep001",
            "created": "2024-05-01T10:00:00.000Z",
            "updated": "2024-05-01T10:00:00.000Z",
            "collectionName": "team",
            "pic": "[]",
            "name": "Keep"
        },
        {
            "id": "oddoddoddodd002",
            "created": null,
            "updated": "2024-05-01",
            "name": "Odd"
        },
        { "id": 3, "name": "Numeric" },
        { "name": "No id" }
    ]);
    fs::write(&doc_path, serde_json::to_vec_pretty(&document).unwrap()).unwrap();

    let loaded = store.load("team");
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded[2].id, "3");

    let created = store.create_record("team", fields(json!({"name": "New"}))).unwrap();
    store
        .update_record("team", "oddoddoddodd002", fields(json!({"role": "Bass"})))
        .unwrap();

    let records = store.load("team");
    assert_eq!(records.len(), 5);
    assert_eq!(records[4].id, created.id);

    let written: Value = serde_json::from_slice(&fs::read(&doc_path).unwrap()).unwrap();
    let entries = written.as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0]["name"], json!("Keep"));
    assert_eq!(entries[1]["created"], Value::Null);
    assert_eq!(entries[1]["role"], json!("Bass"));
    assert!(entries[1]["updated"].as_str().unwrap().ends_with('Z'));
    assert_eq!(entries[3]["name"], json!("No id"));
    assert!(entries[3].get("id").is_none());
    assert!(entries[3].get("created").is_none());
}

#[test]
fn test_control_characters_in_upload_name() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let record = store.create_record("team", Fields::new()).unwrap();
    let id = record.id.as_str();

    let updated = store
        .upload_attachments("team", id, vec![gif("first.gif"), gif("bad\0name.gif")])
        .unwrap();

    assert_eq!(updated.pic.len(), 2);
    assert!(updated.pic[1].starts_with("badname_"));
    let record_dir = dir.path().join("static/storage/pbc_3824009647").join(id);
    assert_eq!(entries(&record_dir), 2);
    for name in &updated.pic {
        assert!(record_dir.join(name).is_file());
    }
}
