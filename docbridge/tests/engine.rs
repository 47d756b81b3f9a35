use docbridge::{bson::{Bson, doc}, memory::InMemoryConnector, prelude::*};
use rstest::rstest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Setting {
    key: String,
    value: String,
}

impl Setting {
    fn new(key: &str, value: &str) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Counter {
    count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct KeyOnly {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

fn manager() -> Arc<ConnectionManager<InMemoryConnector>> {
    Arc::new(ConnectionManager::new(
        ConnectionConfig::from_uri("memory://localhost/app"),
        InMemoryConnector::new(),
    ))
}

async fn engine() -> QueryEngine<InMemoryConnector> {
    let manager = manager();
    manager.setup().await.unwrap();
    QueryEngine::new(manager)
}

async fn seed(engine: &QueryEngine<InMemoryConnector>, count: usize) -> Vec<Identifier> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let setting = Setting::new(&format!("k{i}"), &format!("v{i}"));
        ids.push(engine.insert("settings", &setting).await.unwrap());
    }
    ids.sort();
    ids
}

#[tokio::test]
async fn inserted_record_reads_back_unchanged() {
    let engine = engine().await;
    let setting = Setting::new("theme", "dark");

    let id = engine.insert("settings", &setting).await.unwrap();
    let record = engine.get::<Setting>("settings", &id.to_hex()).await.unwrap().unwrap();

    assert_eq!(record.id, id);
    assert_eq!(record.value, setting);
}

#[tokio::test]
async fn get_with_unknown_identifier_is_none() {
    let engine = engine().await;
    seed(&engine, 2).await;

    let missing = Identifier::generate().to_hex();
    assert_eq!(engine.get::<Setting>("settings", &missing).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_identifier_fails_before_touching_the_store() {
    // Never set up: reaching the store would yield NotConnected instead.
    let engine = QueryEngine::new(manager());
    let setting = Setting::new("k", "v");

    let err = engine.get::<Setting>("settings", "not-an-id").await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Identifier(..)));

    let err = engine.update("settings", "abc123", &setting).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Identifier(..)));

    let err = engine.delete("settings", "").await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Identifier(..)));
}

#[tokio::test]
async fn operations_require_an_active_connection() {
    let manager = manager();
    let engine = QueryEngine::new(manager.clone());
    let id = Identifier::generate().to_hex();

    assert_eq!(
        engine.get::<Setting>("settings", &id).await.unwrap_err(),
        DocumentStoreError::NotConnected
    );

    manager.setup().await.unwrap();
    engine.insert("settings", &Setting::new("k", "v")).await.unwrap();
    manager.teardown().await;

    assert_eq!(
        engine.query::<Setting>("settings", &Query::new()).await.unwrap_err(),
        DocumentStoreError::NotConnected
    );
}

#[tokio::test]
async fn data_survives_reconnecting_with_the_same_connector() {
    let manager = manager();
    let engine = QueryEngine::new(manager.clone());

    manager.setup().await.unwrap();
    let id = engine.insert("settings", &Setting::new("k", "v")).await.unwrap();
    manager.teardown().await;
    manager.setup().await.unwrap();

    assert!(engine.get::<Setting>("settings", &id.to_hex()).await.unwrap().is_some());
}

#[tokio::test]
async fn empty_sort_orders_by_identifier() {
    let engine = engine().await;
    let ids = seed(&engine, 6).await;

    let records = engine.query::<Setting>("settings", &Query::new()).await.unwrap();

    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
}

#[tokio::test]
async fn explicit_sort_is_honoured() {
    let engine = engine().await;
    seed(&engine, 4).await;

    let query = Query::builder().sort(SortSpec::new().desc("key")).build();
    let keys = engine
        .query::<Setting>("settings", &query)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.value.key)
        .collect::<Vec<_>>();

    assert_eq!(keys, vec!["k3", "k2", "k1", "k0"]);
}

#[rstest]
#[case(0, 3)]
#[case(2, 2)]
#[case(4, 10)]
#[case(5, 1)]
#[case(9, 3)]
#[case(1, 0)]
#[case(0, u64::MAX)]
#[tokio::test]
async fn page_window_returns_the_matching_slice(#[case] start: u64, #[case] limit: u64) {
    let engine = engine().await;
    let ids = seed(&engine, 5).await;

    let page = Query::builder().start(start).limit(limit).build();
    let records = engine.query::<Setting>("settings", &page).await.unwrap();

    let expected = ids
        .iter()
        .copied()
        .skip(start as usize)
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect::<Vec<_>>();
    assert_eq!(records.len() as u64, limit.min(5_u64.saturating_sub(start)));
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn native_and_typed_filters_select_the_same_records() {
    let engine = engine().await;
    seed(&engine, 5).await;

    let native = Query::builder()
        .filter(doc! { "key": { "$in": ["k1", "k3"] } })
        .build();
    let typed = Query::builder()
        .filter(Field::new("key").eq("k1").or(Field::new("key").eq("k3")))
        .build();

    let from_native = engine.query::<Setting>("settings", &native).await.unwrap();
    let from_typed = engine.query::<Setting>("settings", &typed).await.unwrap();

    assert_eq!(from_native.len(), 2);
    assert_eq!(from_native, from_typed);
}

#[tokio::test]
async fn undecodable_matches_are_dropped_from_query_results() {
    let engine = engine().await;
    seed(&engine, 3).await;
    engine.insert("settings", &Counter { count: 7 }).await.unwrap();

    let settings = engine.query::<Setting>("settings", &Query::new()).await.unwrap();
    let counters = engine.query::<Counter>("settings", &Query::new()).await.unwrap();

    assert_eq!(settings.len(), 3);
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].value.count, 7);
}

#[tokio::test]
async fn get_reports_a_record_of_the_wrong_shape() {
    let engine = engine().await;
    let id = engine.insert("settings", &Counter { count: 1 }).await.unwrap();

    let err = engine.get::<Setting>("settings", &id.to_hex()).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Decode(_)));
}

#[tokio::test]
async fn projection_limits_returned_fields() {
    let engine = engine().await;
    seed(&engine, 2).await;

    let query = Query::builder().projection(Projection::only(["key"])).build();
    let records = engine.query::<KeyOnly>("settings", &query).await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.value.value.is_none()));
    assert_eq!(records[0].value.key, "k0");
}

#[tokio::test]
async fn projection_over_required_fields_fails_instead_of_emptying() {
    let engine = engine().await;
    seed(&engine, 2).await;

    let query = Query::builder().projection(Projection::only(["key"])).build();
    let err = engine.query::<Setting>("settings", &query).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Decode(_)));
}

#[tokio::test]
async fn request_filters_select_records() {
    let engine = engine().await;
    seed(&engine, 5).await;

    let filter = Filter::from_params([
        ("key", "in_", Bson::from(vec!["k1", "k2", "k4"])),
        ("value", "isnot", Bson::from("v2")),
    ]);
    let keys = engine
        .query::<Setting>("settings", &Query::builder().filter(filter).build())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.value.key)
        .collect::<Vec<_>>();

    assert_eq!(keys, vec!["k1", "k4"]);
}

#[tokio::test]
async fn empty_alternatives_match_nothing() {
    let engine = engine().await;
    seed(&engine, 3).await;

    let none = Query::builder().filter(Filter::or([])).build();
    let all = Query::builder().filter(Filter::and([])).build();

    assert!(engine.query::<Setting>("settings", &none).await.unwrap().is_empty());
    assert_eq!(engine.query::<Setting>("settings", &all).await.unwrap().len(), 3);
}

#[tokio::test]
async fn update_reports_matched_and_modified_counts() {
    let engine = engine().await;
    let id = engine.insert("settings", &Setting::new("k", "v")).await.unwrap();

    let missing = Identifier::generate().to_hex();
    let outcome = engine.update("settings", &missing, &Setting::new("k", "v")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::new(0, 0));
    assert!(!outcome.found());

    let outcome = engine.update("settings", &id.to_hex(), &Setting::new("k", "v")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::new(1, 0));

    let outcome = engine.update("settings", &id.to_hex(), &Setting::new("k", "w")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::new(1, 1));

    let record = engine.get::<Setting>("settings", &id.to_hex()).await.unwrap().unwrap();
    assert_eq!(record.value, Setting::new("k", "w"));
}

#[tokio::test]
async fn delete_removes_the_record_once() {
    let engine = engine().await;
    let id = engine.insert("settings", &Setting::new("k", "v")).await.unwrap();

    assert!(engine.delete("settings", &id.to_hex()).await.unwrap());
    assert_eq!(engine.get::<Setting>("settings", &id.to_hex()).await.unwrap(), None);
    assert!(!engine.delete("settings", &id.to_hex()).await.unwrap());
}

#[tokio::test]
async fn update_then_get_yields_the_new_value() {
    let engine = engine().await;

    let id = engine.insert("settings", &Setting::new("k1", "v1")).await.unwrap();
    engine.update("settings", &id.to_hex(), &Setting::new("k1", "v2")).await.unwrap();
    let record = engine.get::<Setting>("settings", &id.to_hex()).await.unwrap().unwrap();

    assert_eq!(record.value, Setting::new("k1", "v2"));
}

#[tokio::test]
async fn typed_collection_binds_name_and_type() {
    let engine = engine().await;
    let settings = engine.collection::<Setting>("settings");

    let id = settings.insert(&Setting::new("k1", "v1")).await.unwrap();
    settings.update(&id.to_hex(), &Setting::new("k1", "v2")).await.unwrap();

    assert_eq!(settings.name(), "settings");
    assert_eq!(settings.get(&id.to_hex()).await.unwrap().unwrap().value.value, "v2");

    let keys = settings.with_type::<KeyOnly>().query(&Query::new()).await.unwrap();
    assert_eq!(keys[0].value.value.as_deref(), Some("v2"));

    assert!(settings.delete(&id.to_hex()).await.unwrap());
    assert!(settings.query(&Query::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn records_render_as_json_with_hex_identifier() {
    let engine = engine().await;
    let id = engine.insert("settings", &Setting::new("k", "v")).await.unwrap();

    let record = engine.get::<Setting>("settings", &id.to_hex()).await.unwrap().unwrap();
    let json = record.to_json().unwrap();

    assert_eq!(json["id"], id.to_hex());
    assert_eq!(json["key"], "k");
}
