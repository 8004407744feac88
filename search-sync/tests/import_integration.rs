//! Integration tests for the import engine.
//!
//! These tests drive the real Importer and SearchManager against a mock
//! engine (instant, scriptable tasks) and an in-memory data provider.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use search_sync::config::{IndexRegistry, SearchConfig};
use search_sync::events::{EventListener, ImportEvent};
use search_sync::importer::{ImportOptions, Importer};
use search_sync::manager::SearchManager;
use search_sync::provider::{identifier_values_from_fields, DataProvider, Record};
use search_sync::{EntityResolver, SyncError};
use search_sync_repository::{
    ApiError, EngineError, EngineStats, IndexStats, SearchEngineClient, SearchParams,
    SearchResponse, Task, TaskDetails, TaskRef, TaskStatus,
};
use search_sync_shared::{DocumentId, IdentifierValues, IndexSettings};

// Mock engine with instant tasks and inspectable state.

#[derive(Default)]
struct EngineState {
    next_task: u64,
    tasks: HashMap<u64, Task>,
    /// index uid -> document id (as string) -> payload
    indexes: BTreeMap<String, BTreeMap<String, Map<String, Value>>>,
    add_calls: Vec<(String, usize)>,
    delete_calls: Vec<(String, Vec<DocumentId>)>,
    swap_calls: Vec<Vec<(String, String)>>,
    deleted_indexes: Vec<String>,
    settings_updates: Vec<String>,
}

struct MockEngine {
    state: Mutex<EngineState>,
    /// Fail every document submission task with this message.
    fail_with: Option<String>,
    /// Leave every task enqueued forever.
    never_complete: bool,
}

impl MockEngine {
    fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            fail_with: None,
            never_complete: false,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    fn stalled() -> Self {
        Self {
            never_complete: true,
            ..Self::new()
        }
    }

    fn document_count(&self, uid: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(uid)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn index_uids(&self) -> Vec<String> {
        self.state.lock().unwrap().indexes.keys().cloned().collect()
    }

    fn add_call_count(&self) -> usize {
        self.state.lock().unwrap().add_calls.len()
    }

    fn enqueue_task(
        state: &mut EngineState,
        status: TaskStatus,
        details: Option<TaskDetails>,
        error: Option<ApiError>,
    ) -> TaskRef {
        let uid = state.next_task;
        state.next_task += 1;
        state.tasks.insert(
            uid,
            Task {
                uid,
                index_uid: None,
                status,
                details,
                error,
            },
        );

        TaskRef {
            task_uid: uid,
            index_uid: None,
        }
    }

    fn succeed(state: &mut EngineState, details: TaskDetails) -> TaskRef {
        Self::enqueue_task(state, TaskStatus::Succeeded, Some(details), None)
    }
}

#[async_trait]
impl SearchEngineClient for MockEngine {
    async fn create_index(
        &self,
        uid: &str,
        _primary_key: Option<&str>,
    ) -> Result<TaskRef, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.indexes.entry(uid.to_string()).or_default();
        Ok(Self::succeed(&mut state, TaskDetails::default()))
    }

    async fn add_documents(
        &self,
        uid: &str,
        primary_key: Option<&str>,
        documents: &[Map<String, Value>],
    ) -> Result<TaskRef, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.add_calls.push((uid.to_string(), documents.len()));

        if self.never_complete {
            return Ok(Self::enqueue_task(
                &mut state,
                TaskStatus::Enqueued,
                None,
                None,
            ));
        }

        if let Some(message) = &self.fail_with {
            return Ok(Self::enqueue_task(
                &mut state,
                TaskStatus::Failed,
                None,
                Some(ApiError {
                    message: message.clone(),
                    code: "internal".to_string(),
                    error_type: None,
                    link: None,
                }),
            ));
        }

        let primary_key = primary_key.unwrap_or("id");
        let index = state.indexes.entry(uid.to_string()).or_default();
        for document in documents {
            let id = document
                .get(primary_key)
                .map(|value| match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            index.insert(id, document.clone());
        }

        Ok(Self::succeed(
            &mut state,
            TaskDetails {
                received_documents: Some(documents.len() as u64),
                indexed_documents: Some(documents.len() as u64),
                ..Default::default()
            },
        ))
    }

    async fn delete_documents(
        &self,
        uid: &str,
        ids: &[DocumentId],
    ) -> Result<TaskRef, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push((uid.to_string(), ids.to_vec()));

        let index = state.indexes.entry(uid.to_string()).or_default();
        let mut deleted = 0;
        for id in ids {
            if index.remove(&id.to_string()).is_some() {
                deleted += 1;
            }
        }

        Ok(Self::succeed(
            &mut state,
            TaskDetails {
                deleted_documents: Some(deleted),
                ..Default::default()
            },
        ))
    }

    async fn clear_documents(&self, uid: &str) -> Result<TaskRef, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.indexes.entry(uid.to_string()).or_default().clear();
        Ok(Self::succeed(&mut state, TaskDetails::default()))
    }

    async fn delete_index(&self, uid: &str) -> Result<TaskRef, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.indexes.remove(uid);
        state.deleted_indexes.push(uid.to_string());
        Ok(Self::succeed(&mut state, TaskDetails::default()))
    }

    async fn swap_indexes(&self, pairs: &[(String, String)]) -> Result<TaskRef, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.swap_calls.push(pairs.to_vec());

        for (a, b) in pairs {
            let left = state.indexes.remove(a).unwrap_or_default();
            let right = state.indexes.remove(b).unwrap_or_default();
            state.indexes.insert(a.clone(), right);
            state.indexes.insert(b.clone(), left);
        }

        Ok(Self::succeed(&mut state, TaskDetails::default()))
    }

    async fn update_settings(
        &self,
        uid: &str,
        _settings: &IndexSettings,
    ) -> Result<TaskRef, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.settings_updates.push(uid.to_string());
        Ok(Self::succeed(&mut state, TaskDetails::default()))
    }

    async fn get_task(&self, task_uid: u64) -> Result<Task, EngineError> {
        let state = self.state.lock().unwrap();
        state
            .tasks
            .get(&task_uid)
            .cloned()
            .ok_or_else(|| EngineError::request(404, format!("Task {} not found", task_uid)))
    }

    async fn search(
        &self,
        uid: &str,
        _query: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, EngineError> {
        let state = self.state.lock().unwrap();
        let documents = state.indexes.get(uid).cloned().unwrap_or_default();

        let total = documents.len() as u64;
        let limit = params.limit.unwrap_or(documents.len());
        let hits: Vec<Map<String, Value>> = documents.into_values().take(limit).collect();

        Ok(SearchResponse {
            hits,
            estimated_total_hits: Some(total),
            limit: Some(limit),
            offset: params.offset,
            processing_time_ms: Some(0),
            query: None,
        })
    }

    async fn stats(&self) -> Result<EngineStats, EngineError> {
        let state = self.state.lock().unwrap();
        let indexes = state
            .indexes
            .iter()
            .map(|(uid, docs)| {
                (
                    uid.clone(),
                    IndexStats {
                        number_of_documents: docs.len() as u64,
                        raw_document_db_size: 0,
                        avg_document_size: 0,
                        is_indexing: false,
                        number_of_embeddings: None,
                        number_of_embedded_documents: None,
                    },
                )
            })
            .collect();

        Ok(EngineStats {
            database_size: 0,
            used_database_size: 0,
            last_update: None,
            indexes,
        })
    }
}

// In-memory data provider with call counters.

struct MemoryProvider {
    records: Vec<Record>,
    provide_calls: AtomicUsize,
    cleanup_calls: AtomicUsize,
}

impl MemoryProvider {
    fn new(records: Vec<Record>) -> Self {
        let mut records = records;
        records.sort_by_key(|record| record.get("id").and_then(Value::as_i64).unwrap_or(0));

        Self {
            records,
            provide_calls: AtomicUsize::new(0),
            cleanup_calls: AtomicUsize::new(0),
        }
    }

    fn provide_call_count(&self) -> usize {
        self.provide_calls.load(Ordering::SeqCst)
    }

    fn cleanup_call_count(&self) -> usize {
        self.cleanup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for MemoryProvider {
    async fn provide(&self, limit: usize, offset: usize) -> Result<Vec<Record>, SyncError> {
        self.provide_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .records
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn load_by_identifiers(&self, ids: &[DocumentId]) -> Result<Vec<Record>, SyncError> {
        Ok(self
            .records
            .iter()
            .filter(|record| {
                record
                    .get("id")
                    .and_then(DocumentId::from_json)
                    .map(|id| ids.contains(&id))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    fn identifier_values(&self, record: &Record) -> Result<IdentifierValues, SyncError> {
        identifier_values_from_fields(record, &["id".to_string()])
    }

    async fn cleanup(&self) {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// Event listener that records every notification.

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<ImportEvent>>,
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &ImportEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// Helpers.

fn post(id: i64, title: &str, published: bool) -> Record {
    json!({"id": id, "title": title, "is_published": published})
        .as_object()
        .cloned()
        .unwrap()
}

fn posts(count: i64) -> Vec<Record> {
    (1..=count)
        .map(|id| post(id, &format!("post {}", id), true))
        .collect()
}

const POSTS_CONFIG: &str = r#"
prefix: app_
batch_size: 2
indices:
  - name: posts
    entity: post
    index_if: is_published
"#;

struct Harness {
    registry: Arc<IndexRegistry>,
    engine: Arc<MockEngine>,
    provider: Arc<MemoryProvider>,
    listener: Arc<RecordingListener>,
    importer: Importer,
}

fn harness(yaml: &str, engine: MockEngine, records: Vec<Record>) -> Harness {
    let config = SearchConfig::from_yaml_str(yaml).unwrap();
    let registry = Arc::new(IndexRegistry::new(&config).unwrap());
    let engine = Arc::new(engine);
    let provider = Arc::new(MemoryProvider::new(records));
    let listener = Arc::new(RecordingListener::default());

    let mut providers: HashMap<String, Arc<dyn DataProvider>> = HashMap::new();
    providers.insert("post".to_string(), provider.clone());

    let importer = Importer::new(
        registry.clone(),
        providers,
        engine.clone(),
        listener.clone(),
    );

    Harness {
        registry,
        engine,
        provider,
        listener,
        importer,
    }
}

fn options() -> ImportOptions {
    ImportOptions {
        update_settings: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_six_records_batch_two_end_to_end() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), posts(6));

    let summary = h.importer.import(&options()).await.unwrap();

    // Three full batches plus one empty terminal page.
    assert_eq!(h.provider.provide_call_count(), 4);
    assert_eq!(h.engine.add_call_count(), 3);
    assert_eq!(summary.total_records, 6);
    assert_eq!(summary.per_index["app_posts"], 6);
    assert_eq!(h.engine.document_count("app_posts"), 6);

    // cleanup() runs once per page.
    assert_eq!(h.provider.cleanup_call_count(), 4);

    let stats = h.engine.stats().await.unwrap();
    assert_eq!(stats.indexes["app_posts"].number_of_documents, 6);
}

#[tokio::test]
async fn test_page_read_count_for_short_last_page() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), posts(5));

    h.importer.import(&options()).await.unwrap();

    // ceil((5 + 1) / 2) pages: two full, one short. The short page already
    // terminates the loop.
    assert_eq!(h.provider.provide_call_count(), 3);
    assert_eq!(h.engine.document_count("app_posts"), 5);
}

#[tokio::test]
async fn test_empty_index_processes_one_empty_page() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), Vec::new());

    let summary = h.importer.import(&options()).await.unwrap();

    assert_eq!(h.provider.provide_call_count(), 1);
    assert_eq!(h.engine.add_call_count(), 0);
    assert_eq!(summary.total_records, 0);
}

#[tokio::test]
async fn test_skip_batches_resumes_after_processed_pages() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), posts(6));

    let summary = h
        .importer
        .import(&ImportOptions {
            skip_batches: 2,
            ..options()
        })
        .await
        .unwrap();

    // Pages 0 and 1 (records 1..=4) are never re-processed.
    assert_eq!(summary.total_records, 2);
    assert_eq!(h.engine.document_count("app_posts"), 2);

    let events = h.listener.events.lock().unwrap();
    assert!(events.contains(&ImportEvent::BatchesSkipped {
        batches: 2,
        records: 4
    }));
}

#[tokio::test]
async fn test_resume_processes_same_tail_as_full_run() {
    let full = harness(POSTS_CONFIG, MockEngine::new(), posts(6));
    full.importer.import(&options()).await.unwrap();

    let resumed = harness(POSTS_CONFIG, MockEngine::new(), posts(6));
    resumed
        .importer
        .import(&ImportOptions {
            skip_batches: 1,
            ..options()
        })
        .await
        .unwrap();

    // The resumed run wrote exactly the documents of pages 1.. of the full
    // run, with identical payloads.
    let full_state = full.engine.state.lock().unwrap();
    let resumed_state = resumed.engine.state.lock().unwrap();

    let full_docs = &full_state.indexes["app_posts"];
    let resumed_docs = &resumed_state.indexes["app_posts"];

    assert_eq!(resumed_docs.len(), 4);
    for (id, payload) in resumed_docs {
        assert_eq!(full_docs.get(id), Some(payload));
    }
}

#[tokio::test]
async fn test_failed_task_aborts_index_with_engine_message() {
    let h = harness(POSTS_CONFIG, MockEngine::failing("X"), posts(6));

    let error = h.importer.import(&options()).await.unwrap_err();

    match error {
        SyncError::Task { message, .. } => assert_eq!(message, "X"),
        other => panic!("expected task error, got {:?}", other),
    }

    // The failure aborts before any further page is read.
    assert_eq!(h.provider.provide_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_response_timeout_does_not_hang() {
    let h = harness(POSTS_CONFIG, MockEngine::stalled(), posts(2));

    let error = h
        .importer
        .import(&ImportOptions {
            response_timeout: Duration::from_millis(1),
            ..options()
        })
        .await
        .unwrap_err();

    assert!(matches!(error, SyncError::Timeout { timeout_ms: 1, .. }));
}

#[tokio::test]
async fn test_unpublished_records_are_removed_not_indexed() {
    let records = vec![
        post(1, "live", true),
        post(2, "draft", false),
        post(3, "live", true),
    ];
    let h = harness(POSTS_CONFIG, MockEngine::new(), records);

    h.importer.import(&options()).await.unwrap();

    let state = h.engine.state.lock().unwrap();
    let removed: Vec<&DocumentId> = state
        .delete_calls
        .iter()
        .flat_map(|(_, ids)| ids.iter())
        .collect();

    assert_eq!(removed, vec![&DocumentId::Integer(2)]);
    assert!(!state.indexes["app_posts"].contains_key("2"));
    assert_eq!(state.indexes["app_posts"].len(), 2);
}

#[tokio::test]
async fn test_aggregator_receives_documents_from_all_constituents() {
    let yaml = r#"
prefix: app_
batch_size: 10
indices:
  - name: posts
    entity: post
  - name: everything
    aggregate: [post]
"#;
    let h = harness(yaml, MockEngine::new(), posts(3));

    h.importer.import(&options()).await.unwrap();

    assert_eq!(h.engine.document_count("app_posts"), 3);
    assert_eq!(h.engine.document_count("app_everything"), 3);
}

#[tokio::test]
async fn test_swap_mode_writes_shadow_then_swaps_and_cleans_up() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), posts(4));

    h.importer
        .import(&ImportOptions {
            swap_indices: true,
            ..options()
        })
        .await
        .unwrap();

    {
        let state = h.engine.state.lock().unwrap();

        // Every write went to the shadow uid.
        assert!(state.add_calls.iter().all(|(uid, _)| uid == "_tmp_app_posts"));

        // One swap call with the full pair list.
        assert_eq!(
            state.swap_calls,
            vec![vec![("_tmp_app_posts".to_string(), "app_posts".to_string())]]
        );
        assert!(state
            .deleted_indexes
            .contains(&"_tmp_app_posts".to_string()));
    }

    // The live name now holds the imported data and no shadow uid remains.
    assert_eq!(h.engine.document_count("app_posts"), 4);
    assert!(h
        .engine
        .index_uids()
        .iter()
        .all(|uid| !uid.starts_with("_tmp_")));
}

#[tokio::test]
async fn test_settings_are_updated_once_per_index() {
    let yaml = r#"
prefix: app_
batch_size: 10
indices:
  - name: posts
    entity: post
    settings:
      rankingRules: [words, typo]
"#;
    let h = harness(yaml, MockEngine::new(), posts(1));

    h.importer
        .import(&ImportOptions {
            update_settings: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let state = h.engine.state.lock().unwrap();
    assert_eq!(state.settings_updates, vec!["app_posts".to_string()]);
}

#[tokio::test]
async fn test_import_requested_subset_only() {
    let yaml = r#"
prefix: app_
batch_size: 10
indices:
  - name: posts
    entity: post
  - name: drafts
    entity: draft
"#;
    // Only the posts provider is registered; importing everything would
    // fail, importing the subset must not touch the drafts entity.
    let h = harness(yaml, MockEngine::new(), posts(2));

    h.importer
        .import(&ImportOptions {
            indices: vec!["posts".to_string()],
            ..options()
        })
        .await
        .unwrap();

    assert_eq!(h.engine.document_count("app_posts"), 2);
}

#[tokio::test]
async fn test_missing_provider_is_a_configuration_error() {
    let yaml = r#"
prefix: app_
indices:
  - name: posts
    entity: post
  - name: drafts
    entity: draft
"#;
    let h = harness(yaml, MockEngine::new(), posts(2));

    let error = h.importer.import(&options()).await.unwrap_err();
    assert!(matches!(error, SyncError::Configuration(_)));

    // Detected before any engine call or page read.
    assert_eq!(h.engine.add_call_count(), 0);
    assert_eq!(h.provider.provide_call_count(), 0);
}

#[tokio::test]
async fn test_resolving_nothing_is_informational_not_fatal() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), posts(2));

    let summary = h
        .importer
        .import(&ImportOptions {
            indices: vec!["ghost".to_string()],
            ..options()
        })
        .await
        .unwrap();

    assert_eq!(summary, Default::default());
    assert_eq!(h.engine.add_call_count(), 0);
}

// Search manager over the same mocks.

fn manager(h: &Harness) -> SearchManager {
    let mut providers: HashMap<String, Arc<dyn DataProvider>> = HashMap::new();
    providers.insert("post".to_string(), h.provider.clone());

    SearchManager::new(h.registry.clone(), providers, h.engine.clone())
}

#[tokio::test]
async fn test_manager_search_hydrates_hits_in_engine_order() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), posts(3));
    h.importer.import(&options()).await.unwrap();

    let manager = manager(&h);
    let results = manager
        .search("post", "post", &SearchParams::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);

    let hit_order: Vec<i64> = {
        let state = h.engine.state.lock().unwrap();
        state.indexes["app_posts"]
            .values()
            .map(|doc| doc.get("id").and_then(Value::as_i64).unwrap())
            .collect()
    };
    let result_order: Vec<i64> = results
        .iter()
        .map(|record| record.get("id").and_then(Value::as_i64).unwrap())
        .collect();

    assert_eq!(result_order, hit_order);
}

#[tokio::test]
async fn test_manager_index_records_routes_predicate_failures() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), Vec::new());
    let manager = manager(&h);

    let records = vec![post(1, "live", true), post(2, "draft", false)];
    manager.index_records("post", &records).await.unwrap();

    let state = h.engine.state.lock().unwrap();
    assert_eq!(state.indexes["app_posts"].len(), 1);
    assert_eq!(state.delete_calls.len(), 1);
}

#[tokio::test]
async fn test_manager_rejects_unconfigured_entity() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), Vec::new());
    let manager = manager(&h);

    let result = manager.clear("user").await;
    assert!(matches!(result, Err(SyncError::NotSearchable(_))));
}

#[tokio::test]
async fn test_manager_count_uses_engine_estimate() {
    let h = harness(POSTS_CONFIG, MockEngine::new(), posts(5));
    h.importer.import(&options()).await.unwrap();

    let manager = manager(&h);
    let count = manager
        .count("post", "", &SearchParams::default())
        .await
        .unwrap();

    assert_eq!(count, 5);
}

#[tokio::test]
async fn test_resolver_expansion_matches_create_command_dedup() {
    let yaml = r#"
prefix: app_
indices:
  - name: posts
    entity: post
  - name: everything
    aggregate: [post]
"#;
    let config = SearchConfig::from_yaml_str(yaml).unwrap();
    let registry = Arc::new(IndexRegistry::new(&config).unwrap());
    let resolver = EntityResolver::new(registry);

    let first = resolver.resolve(&["everything".to_string()]);
    let second = resolver.resolve(&["everything".to_string()]);

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].entity, "post");
}
