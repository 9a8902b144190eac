//! Persistence integration tests.
//!
//! Verifies:
//! - Documents, history and content survive a close/reopen cycle
//! - The legacy id sequence resumes after reopening
//! - Path bindings follow moves and deletes on disk
//! - A checked-out working copy survives a restart and can be cancelled

use chrono::Utc;
use tempfile::tempdir;
use vellum_core::{Attachment, ForeignRef, FunctionalVersion, UnlockOptions};
use vellum_store::{
    DocumentRepository, NewDocument, NodeStore, RepositoryConfig, RocksNodeStore, StoreConfig,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn open(path: &std::path::Path) -> DocumentRepository<RocksNodeStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = RocksNodeStore::open(StoreConfig::for_testing(path)).unwrap();
    DocumentRepository::new(store, RepositoryConfig::for_testing())
}

fn new_document(foreign_id: &str) -> NewDocument {
    let attachment = Attachment::builder("fr")
        .filename("test.odp")
        .title("Mon document de test")
        .created("10", Utc::now())
        .build()
        .unwrap();
    NewDocument::new(ForeignRef::new(foreign_id, "kmelia73"), "10").attachment(attachment)
}

/// Highly repetitive content, to exercise block compression.
fn repetitive_text(approx_bytes: usize) -> Vec<u8> {
    let pattern = "Ceci est un document de test. ";
    pattern.repeat(approx_bytes / pattern.len() + 1).into_bytes()
}

// ─── Roundtrip ───────────────────────────────────────────────────────────────

#[test]
fn test_history_and_content_survive_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("db");
    let large = repetitive_text(64 * 1024);

    let key = {
        let mut repo = open(&db);
        let key = repo
            .create_document_with_content(new_document("node18").versioned(true), &mut &b"first"[..])
            .unwrap();
        repo.checkout(&key, "10").unwrap();
        repo.store_content(&key, "fr", &mut &large[..]).unwrap();
        repo.checkin(&key, false).unwrap();
        key
    };

    let repo = open(&db);
    let document = repo.find_document_by_id(&key, "fr").unwrap().unwrap();
    assert_eq!(document.version(), FunctionalVersion::new(2, 0));
    assert_eq!(document.version_index(), 1);
    assert_eq!(document.attachment().unwrap().size, large.len() as u64);

    let doc = document.as_historized().unwrap();
    assert_eq!(doc.history.len(), 1);
    assert_eq!(doc.history.get(0).unwrap().frozen_by.as_deref(), Some("10"));

    assert_eq!(repo.get_content(&key, "fr", 0, -1).unwrap(), large);
    assert_eq!(repo.read_version_content(&key, 0, "fr", 0, -1).unwrap(), b"first");
    assert_eq!(
        repo.find_by_path("/kmelia73/attachments/simpledoc_1", "fr")
            .unwrap()
            .unwrap()
            .id(),
        key.id
    );
}

#[test]
fn test_sequence_resumes_after_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("db");

    {
        let mut repo = open(&db);
        repo.create_document(new_document("node18")).unwrap();
        repo.create_document(new_document("node18")).unwrap();
    }

    let mut repo = open(&db);
    let key = repo.create_document(new_document("node18")).unwrap();
    assert_eq!(key.legacy_id, Some(3));
    assert_eq!(repo.list_by_foreign_key(&ForeignRef::new("node18", "kmelia73"), "fr").unwrap().len(), 3);
}

#[test]
fn test_move_and_delete_update_paths_on_disk() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("db");

    let (moved, deleted) = {
        let mut repo = open(&db);
        let first = repo.create_document(new_document("node18").versioned(true)).unwrap();
        let second = repo
            .create_document_with_content(new_document("node18"), &mut &b"gone"[..])
            .unwrap();
        let moved = repo
            .move_document(&first, &ForeignRef::new("node18", "kmelia36"))
            .unwrap();
        repo.delete_document(&second).unwrap();
        (moved, second)
    };

    let repo = open(&db);
    assert!(repo.find_by_path("/kmelia73/attachments/simpledoc_1", "fr").unwrap().is_none());
    assert!(repo.find_by_path("/kmelia73/attachments/simpledoc_2", "fr").unwrap().is_none());
    let document = repo
        .find_by_path("/kmelia36/attachments/simpledoc_1", "fr")
        .unwrap()
        .unwrap();
    assert_eq!(document.id(), moved.id);

    let entry = document.as_historized().unwrap().history.get(0).unwrap();
    assert_eq!(entry.real_version_pk().container_id, "kmelia73");
    assert!(repo.find_document_by_id(&deleted, "fr").unwrap().is_none());
    assert_eq!(repo.store().scan_nodes().unwrap().len(), 1);
}

#[test]
fn test_checkout_survives_restart() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("db");

    let key = {
        let mut repo = open(&db);
        let key = repo
            .create_document_with_content(new_document("node18").versioned(true), &mut &b"committed"[..])
            .unwrap();
        repo.checkout(&key, "10").unwrap();
        repo.store_content(&key, "fr", &mut &b"working copy"[..]).unwrap();
        key
    };

    let mut repo = open(&db);
    let document = repo.find_document_by_id(&key, "fr").unwrap().unwrap();
    assert_eq!(document.editor(), Some("10"));
    assert_eq!(repo.get_content(&key, "fr", 0, -1).unwrap(), b"working copy");

    assert!(repo.unlock(&key, "10", UnlockOptions::empty()).unwrap());
    assert_eq!(repo.get_content(&key, "fr", 0, -1).unwrap(), b"committed");
    let document = repo.find_document_by_id(&key, "fr").unwrap().unwrap();
    assert!(!document.is_checked_out());
    assert_eq!(document.version_index(), 0);
}
