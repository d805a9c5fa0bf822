use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use user_gateway::framework::{FilterPredicate, RequestContext, ResourceError};
use user_gateway::store::mock::{MockStore, ReceivedCall};
use user_gateway::store::{
    Document, DocumentStore, FieldWrite, QueryResult, StoreActor, StoreClient, StoreError,
    StoreFilter,
};
use user_gateway::user::{self, User, UserService, UserUpdate};

fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("document must be an object")
}

/// Real service over a running in-process store.
fn users() -> (UserService<StoreClient>, StoreClient) {
    let (actor, store) = StoreActor::new(16);
    tokio::spawn(actor.run());
    (user::new(store.clone()), store)
}

fn ctx() -> RequestContext {
    RequestContext::background()
}

#[tokio::test]
async fn test_create_then_read_stamps_timestamps() {
    let (users, _store) = users();

    users.create(&ctx(), User::new("u1", "Ann")).await.unwrap();
    let read = users.read(&ctx(), "u1").await.unwrap();

    assert_eq!(read.id, "u1");
    assert_eq!(read.name, "Ann");
    assert!(read.created.is_some());
    assert_eq!(read.created, read.updated);
}

#[tokio::test]
async fn test_create_duplicate_is_already_exists() {
    let (users, _store) = users();

    users.create(&ctx(), User::new("u1", "Ann")).await.unwrap();
    let err = users.create(&ctx(), User::new("u1", "Other")).await.unwrap_err();

    assert_eq!(
        err,
        ResourceError::AlreadyExists {
            resource: "user",
            id: "u1".into()
        }
    );
    assert_eq!(users.read(&ctx(), "u1").await.unwrap().name, "Ann");
}

#[tokio::test]
async fn test_read_missing_is_not_found() {
    let (users, _store) = users();

    let err = users.read(&ctx(), "nobody").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_update_name_refreshes_updated_only() {
    let (users, _store) = users();

    users.create(&ctx(), User::new("u1", "Ann")).await.unwrap();
    let before = users.read(&ctx(), "u1").await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let update = UserUpdate {
        id: "u1".into(),
        name: Some("Annie".into()),
    };
    users.update(&ctx(), update).await.unwrap();

    let after = users.read(&ctx(), "u1").await.unwrap();
    assert_eq!(after.id, "u1");
    assert_eq!(after.name, "Annie");
    assert_eq!(after.created, before.created);
    assert!(after.updated > before.updated);
}

#[tokio::test]
async fn test_update_can_clear_name() {
    let (users, _store) = users();

    users.create(&ctx(), User::new("u1", "Ann")).await.unwrap();
    let update = UserUpdate {
        id: "u1".into(),
        name: Some(String::new()),
    };
    users.update(&ctx(), update).await.unwrap();

    assert_eq!(users.read(&ctx(), "u1").await.unwrap().name, "");
}

#[tokio::test]
async fn test_update_without_fields_is_a_noop() {
    let mock = MockStore::new();
    mock.expect_get("u1").return_ok(doc(json!({
        "id": "u1", "name": "Ann", "created": 1_000, "updated": 1_000
    })));
    let users = user::new(mock.clone());

    let update = UserUpdate {
        id: "u1".into(),
        name: None,
    };
    users.update(&ctx(), update).await.unwrap();

    // Only the existence check reached the store.
    mock.verify();
    assert_eq!(mock.received(), vec![ReceivedCall::Get { key: "u1".into() }]);
}

#[tokio::test]
async fn test_update_writes_present_fields_and_updated_in_one_call() {
    let mock = MockStore::new();
    mock.expect_get("u1").return_ok(doc(json!({
        "id": "u1", "name": "Ann", "created": 1_000, "updated": 1_000
    })));
    mock.expect_update_fields("u1").return_ok(());
    let users = user::new(mock.clone());

    let update = UserUpdate {
        id: "u1".into(),
        name: Some("Annie".into()),
    };
    users.update(&ctx(), update).await.unwrap();
    mock.verify();

    let writes = mock
        .received()
        .into_iter()
        .find_map(|call| match call {
            ReceivedCall::UpdateFields { writes, .. } => Some(writes),
            _ => None,
        })
        .expect("update_fields was called");
    let paths: Vec<&str> = writes.iter().map(|w| w.path.as_str()).collect();
    assert_eq!(paths, vec!["name", "updated"]);
    assert_eq!(writes[0], FieldWrite::new("name", "Annie"));
    assert!(writes[1].value.is_i64());
}

#[tokio::test]
async fn test_invalid_update_never_reaches_store() {
    let mock = MockStore::new();
    let users = user::new(mock.clone());

    let update = UserUpdate {
        id: "u1".into(),
        name: Some("a".repeat(101)),
    };
    let err = users.update(&ctx(), update).await.unwrap_err();

    assert!(matches!(err, ResourceError::InvalidUpdate { .. }));
    assert_eq!(err.to_string(), "invalid user update: (name: max 100 chars)");
    assert!(mock.received().is_empty());
}

#[tokio::test]
async fn test_delete() {
    let (users, _store) = users();

    let err = users.delete(&ctx(), "ghost").await.unwrap_err();
    assert_eq!(
        err,
        ResourceError::NotFound {
            resource: "user",
            id: "ghost".into()
        }
    );

    users.create(&ctx(), User::new("u1", "Ann")).await.unwrap();
    users.delete(&ctx(), "u1").await.unwrap();
    assert_eq!(users.read(&ctx(), "u1").await.unwrap_err().status_code(), 404);
}

#[tokio::test]
async fn test_corrupt_record_is_hidden_but_repairable() {
    let (users, store) = users();
    store
        .create_if_absent(
            "user",
            "bad",
            doc(json!({ "id": "bad", "name": "x".repeat(150), "created": 1_000, "updated": 1_000 })),
        )
        .await
        .unwrap();

    let err = users.read(&ctx(), "bad").await.unwrap_err();
    assert_eq!(
        err,
        ResourceError::Corrupt {
            resource: "user",
            id: "bad".into()
        }
    );
    assert_eq!(err.status_code(), 400);

    // Search drops it instead of failing.
    users.create(&ctx(), User::new("good", "Ann")).await.unwrap();
    let all = users.search(&ctx(), vec![]).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "good");

    // Update counts a corrupt record as existing and can repair it.
    let repair = UserUpdate {
        id: "bad".into(),
        name: Some("Fixed".into()),
    };
    users.update(&ctx(), repair).await.unwrap();
    assert_eq!(users.read(&ctx(), "bad").await.unwrap().name, "Fixed");
}

#[tokio::test]
async fn test_delete_corrupt_record_is_allowed() {
    let (users, store) = users();
    // Missing timestamps: does not even decode.
    store
        .create_if_absent("user", "broken", doc(json!({ "id": "broken", "name": "?" })))
        .await
        .unwrap();

    assert_eq!(users.read(&ctx(), "broken").await.unwrap_err().status_code(), 400);
    assert!(users.search(&ctx(), vec![]).await.unwrap().is_empty());

    users.delete(&ctx(), "broken").await.unwrap();
    assert_eq!(users.read(&ctx(), "broken").await.unwrap_err().status_code(), 404);
}

#[tokio::test]
async fn test_search_by_name() {
    let (users, _store) = users();
    for (id, name) in [("a", "Alice"), ("b", "Bob"), ("c", "Alice")] {
        users.create(&ctx(), User::new(id, name)).await.unwrap();
    }

    let alices = users
        .search(&ctx(), vec![FilterPredicate::new("name", "EQ", "Alice")])
        .await
        .unwrap();
    let ids: Vec<&str> = alices.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(alices.iter().all(|u| u.name == "Alice"));

    let none = users
        .search(&ctx(), vec![FilterPredicate::new("NAME", "eq", "Zed")])
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_search_by_created() {
    let (users, _store) = users();
    users.create(&ctx(), User::new("a", "Alice")).await.unwrap();

    let recent = users
        .search(&ctx(), vec![FilterPredicate::new("created", "GE", "2000-01-01_00:00")])
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);

    let ancient = users
        .search(&ctx(), vec![FilterPredicate::new("created", "LT", "2000-01-01_00:00")])
        .await
        .unwrap();
    assert!(ancient.is_empty());
}

#[tokio::test]
async fn test_invalid_predicate_fails_before_store_call() {
    let mock = MockStore::new();
    let users = user::new(mock.clone());

    let err = users
        .search(
            &ctx(),
            vec![
                FilterPredicate::new("name", "EQ", "Alice"),
                FilterPredicate::new("bogus", "EQ", "x"),
            ],
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert_eq!(err.to_string(), "invalid query: (key[bogus]: invalid)");
    assert!(mock.received().is_empty());

    let err = users
        .search(&ctx(), vec![FilterPredicate::new("created", "GT", "yesterday")])
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::InvalidQuery(_)));
    assert!(mock.received().is_empty());
}

#[tokio::test]
async fn test_search_translates_predicates_for_the_store() {
    let mock = MockStore::new();
    mock.expect_query().return_ok(QueryResult {
        documents: vec![doc(json!({ "id": "a", "name": "Alice", "created": 1_000, "updated": 1_000 }))],
        skipped: vec!["mangled".into()],
    });
    let users = user::new(mock.clone());

    let found = users
        .search(
            &ctx(),
            vec![
                FilterPredicate::new("Name", "ne", "Bob"),
                FilterPredicate::new("created", "LE", "1970-01-01_00:01"),
            ],
        )
        .await
        .unwrap();

    // Skipped records are logged, not fatal.
    assert_eq!(found.len(), 1);
    mock.verify();

    let expected = vec![
        StoreFilter {
            path: "name".into(),
            operator: "≠",
            value: json!("Bob"),
        },
        StoreFilter {
            path: "created".into(),
            operator: "≤",
            value: json!(60_000),
        },
    ];
    assert_eq!(mock.received(), vec![ReceivedCall::Query { filters: expected }]);
}

#[tokio::test]
async fn test_store_failures_are_backend_faults() {
    let mock = MockStore::new();
    mock.expect_get("u1")
        .return_err(StoreError::Failure("disk on fire".into()));
    mock.expect_query().return_err(StoreError::Unavailable);
    let users = user::new(mock.clone());

    let err = users.read(&ctx(), "u1").await.unwrap_err();
    assert_eq!(err, ResourceError::Store("store failure: disk on fire".into()));
    assert_eq!(err.status_code(), 500);

    let err = users.search(&ctx(), vec![]).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
    mock.verify();
}

/// A store whose every call hangs.
struct StalledStore;

#[async_trait]
impl DocumentStore for StalledStore {
    async fn create_if_absent(&self, _: &str, _: &str, _: Document) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn get(&self, _: &str, _: &str) -> Result<Document, StoreError> {
        std::future::pending().await
    }

    async fn update_fields(&self, _: &str, _: &str, _: Vec<FieldWrite>) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn query(&self, _: &str, _: Vec<StoreFilter>) -> Result<QueryResult, StoreError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_store_calls() {
    let users = user::new(StalledStore);
    let ctx = RequestContext::with_timeout(Duration::from_millis(100));

    let err = users.create(&ctx, User::new("u1", "Ann")).await.unwrap_err();
    assert!(matches!(err, ResourceError::Cancelled(_)));
    assert_eq!(err.status_code(), 504);

    let err = users.read(&ctx, "u1").await.unwrap_err();
    assert!(matches!(err, ResourceError::Cancelled(_)));
}
