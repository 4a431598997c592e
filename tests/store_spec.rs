use notedeck::db::SqliteStore;
use notedeck::store::{DocumentStore, MemoryStore, QueryOp, StoreError};
use serde_json::json;
use speculate2::speculate;
use tokio_test::block_on;

fn sqlite() -> SqliteStore {
    let store = SqliteStore::open_memory().expect("Failed to create in-memory database");
    store.migrate().expect("Failed to run migrations");
    store
}

/// Behavior both backends must share.
async fn check_contract(store: &dyn DocumentStore) {
    // create/get
    let id = store
        .create("notes", json!({ "title": "Graphs", "view_counter": 0 }))
        .await
        .expect("create failed");
    let doc = store.get("notes", &id).await.expect("get failed").expect("missing");
    assert_eq!(doc.data["title"], "Graphs");
    assert!(store.get("notes", "nope").await.unwrap().is_none());

    // partial update keeps untouched fields, supports dotted paths
    store
        .update("notes", &id, json!({ "title": "Trees", "access_policy.type": "public" }))
        .await
        .expect("update failed");
    let doc = store.get("notes", &id).await.unwrap().unwrap();
    assert_eq!(doc.data["title"], "Trees");
    assert_eq!(doc.data["view_counter"], 0);
    assert_eq!(doc.data["access_policy"]["type"], "public");

    // a failing update leaves the document untouched
    let result = store
        .update("notes", &id, json!({ "content": "half", "title.draft": true }))
        .await;
    assert!(result.is_err());
    let doc = store.get("notes", &id).await.unwrap().unwrap();
    assert!(doc.data.get("content").is_none());
    assert_eq!(doc.data["title"], "Trees");

    // union append
    store
        .append_to_array("notes", &id, "tag", json!("exam"))
        .await
        .unwrap();
    store
        .append_to_array("notes", &id, "tag", json!("exam"))
        .await
        .unwrap();
    store
        .append_to_array("notes", &id, "tag", json!("summary"))
        .await
        .unwrap();
    let doc = store.get("notes", &id).await.unwrap().unwrap();
    assert_eq!(doc.data["tag"], json!(["exam", "summary"]));

    // increment
    store.increment("notes", &id, "view_counter", 1).await.unwrap();
    store.increment("notes", &id, "view_counter", 2).await.unwrap();
    let doc = store.get("notes", &id).await.unwrap().unwrap();
    assert_eq!(doc.data["view_counter"], 3);

    // writes to a missing document fail
    assert!(matches!(
        store.update("notes", "nope", json!({ "a": 1 })).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        store.append_to_array("notes", "nope", "tag", json!("x")).await,
        Err(StoreError::NotFound { .. })
    ));

    // queries keep insertion order
    let second = store
        .create("notes", json!({ "title": "Heaps", "tag": ["exam"] }))
        .await
        .unwrap();
    let hits = store
        .query("notes", "tag", QueryOp::ArrayContains, &json!("exam"))
        .await
        .unwrap();
    let ids: Vec<&str> = hits.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec![id.as_str(), second.as_str()]);

    let hits = store
        .query("notes", "access_policy.type", QueryOp::Eq, &json!("public"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    // put with explicit id, then replace
    store.put("users", "u1", json!({ "username": "a" })).await.unwrap();
    store.put("users", "u1", json!({ "username": "b" })).await.unwrap();
    let users = store.list("users").await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].data["username"], "b");

    // delete
    assert!(store.delete("notes", &id).await.unwrap());
    assert!(!store.delete("notes", &id).await.unwrap());
    assert_eq!(store.list("notes").await.unwrap().len(), 1);
}

speculate! {
    describe "memory store" {
        before {
            let store = MemoryStore::new();
        }

        it "satisfies the store contract" {
            block_on(check_contract(&store));
        }

        it "shares data between clones" {
            let other = store.clone();
            let id = block_on(store.create("groups", json!({ "name": "study" }))).unwrap();
            let doc = block_on(other.get("groups", &id)).unwrap();
            assert!(doc.is_some());
        }

        it "lists an unknown collection as empty" {
            assert!(block_on(store.list("nothing")).unwrap().is_empty());
        }
    }

    describe "sqlite store" {
        before {
            let store = sqlite();
        }

        it "satisfies the store contract" {
            block_on(check_contract(&store));
        }

        it "migrates idempotently" {
            store.migrate().expect("second migration failed");
            let id = block_on(store.create("subjects", json!({ "name": "Algorithms" }))).unwrap();
            assert!(block_on(store.get("subjects", &id)).unwrap().is_some());
        }

        it "keeps collections apart" {
            block_on(store.put("notes", "x", json!({ "kind": "note" }))).unwrap();
            block_on(store.put("groups", "x", json!({ "kind": "group" }))).unwrap();
            let note = block_on(store.get("notes", "x")).unwrap().unwrap();
            let group = block_on(store.get("groups", "x")).unwrap().unwrap();
            assert_eq!(note.data["kind"], "note");
            assert_eq!(group.data["kind"], "group");
        }
    }

    describe "sqlite store on disk" {
        it "persists documents across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("notedeck.db");

            let id = {
                let store = SqliteStore::open(path.clone()).expect("open failed");
                store.migrate().expect("migrate failed");
                block_on(store.create("notes", json!({ "title": "Persisted" }))).unwrap()
            };

            let reopened = SqliteStore::open(path).expect("reopen failed");
            reopened.migrate().expect("migrate failed");
            let doc = block_on(reopened.get("notes", &id)).unwrap().expect("missing after reopen");
            assert_eq!(doc.data["title"], "Persisted");
        }
    }
}
