use multas_core::db::open_db_in_memory;
use multas_core::{Document, Fields, RecordStore, SqliteRecordStore, StoreError};
use serde_json::{json, Value};

const COLLECTION: &str = "usuarios";

fn store() -> SqliteRecordStore {
    SqliteRecordStore::new(open_db_in_memory().unwrap())
}

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

#[test]
fn fetch_all_returns_documents_in_insertion_order() {
    let store = store();
    let first = store
        .insert_document(COLLECTION, &fields(json!({ "Nombre": "Ana" })))
        .unwrap();
    let second = store
        .insert_document(COLLECTION, &fields(json!({ "Nombre": "Beto" })))
        .unwrap();
    store
        .insert_document("otra", &fields(json!({ "Nombre": "Ciro" })))
        .unwrap();

    let documents = store.fetch_all(COLLECTION).unwrap();
    let ids: Vec<&str> = documents.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    assert_eq!(documents[0].fields["Nombre"], json!("Ana"));
}

#[test]
fn update_field_merges_single_field() {
    let store = store();
    store
        .put_document(
            COLLECTION,
            "a",
            &fields(json!({ "Nombre": "Ana", "GroseriasLeves": 2, "GroseriasFuertes": 1 })),
        )
        .unwrap();

    store
        .update_field(COLLECTION, "a", "GroseriasLeves", json!(3))
        .unwrap();

    let document = store.get_document(COLLECTION, "a").unwrap().unwrap();
    assert_eq!(
        document,
        Document::new(
            "a",
            fields(json!({ "Nombre": "Ana", "GroseriasLeves": 3, "GroseriasFuertes": 1 }))
        )
    );
}

#[test]
fn update_field_on_missing_document_returns_not_found() {
    let store = store();
    let err = store
        .update_field(COLLECTION, "ghost", "GroseriasLeves", json!(1))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref id, .. } if id == "ghost"));
    assert!(store.get_document(COLLECTION, "ghost").unwrap().is_none());
}

#[test]
fn commit_batch_applies_every_update() {
    let store = store();
    store
        .put_document(COLLECTION, "a", &fields(json!({ "GroseriasLeves": 2 })))
        .unwrap();
    store
        .put_document(COLLECTION, "b", &fields(json!({ "GroseriasFuertes": 3 })))
        .unwrap();

    let zero = fields(json!({ "GroseriasLeves": 0, "GroseriasFuertes": 0 }));
    let mut batch = store.begin_batch();
    batch
        .update(COLLECTION, "a", zero.clone())
        .update(COLLECTION, "b", zero.clone());
    store.commit_batch(batch).unwrap();

    for id in ["a", "b"] {
        let document = store.get_document(COLLECTION, id).unwrap().unwrap();
        assert_eq!(document.fields, zero);
    }
}

#[test]
fn commit_batch_rolls_back_when_any_document_is_missing() {
    let store = store();
    store
        .put_document(COLLECTION, "a", &fields(json!({ "GroseriasLeves": 2 })))
        .unwrap();

    let mut batch = store.begin_batch();
    batch.update(COLLECTION, "a", fields(json!({ "GroseriasLeves": 0 })));
    batch.update(COLLECTION, "missing", fields(json!({ "GroseriasLeves": 0 })));
    let err = store.commit_batch(batch).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let document = store.get_document(COLLECTION, "a").unwrap().unwrap();
    assert_eq!(document.fields["GroseriasLeves"], json!(2));

    // The connection is usable again after the rollback.
    store
        .update_field(COLLECTION, "a", "GroseriasLeves", json!(5))
        .unwrap();
}

#[test]
fn empty_batch_commits() {
    let store = store();
    let batch = store.begin_batch();
    assert!(batch.is_empty());
    store.commit_batch(batch).unwrap();
}

#[test]
fn malformed_stored_json_is_rejected_on_read() {
    let store = store();
    store
        .connection()
        .execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    store
        .connection()
        .execute(
            "INSERT INTO documents (collection, id, fields) VALUES (?1, 'bad', '\"text\"');",
            [COLLECTION],
        )
        .unwrap();

    let err = store.fetch_all(COLLECTION).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}
