//! Todo service - owns the task store and runs the create-then-enrich flow.
//!
//! Creating a task inserts a provisional record and returns immediately.
//! Enrichment then runs as a background tokio task keyed by the task's id.
//! Every user edit or delete made through this service cancels that pending
//! enrichment first, and a finished enrichment only writes if its token is
//! still live once it holds the store's write lock. A late result therefore
//! never overwrites a user edit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, EnrichmentMode};
use crate::extract::{DetailExtractor, TaskDetails};
use crate::llm::{LlmClient, OpenRouterClient};
use crate::task::{
    CategoryCount, Priority, Task, TaskError, TaskFilter, TaskId, TaskPatch, TaskStore,
};

/// Task store shared between the service and its enrichment jobs.
pub type SharedTaskStore = Arc<RwLock<TaskStore>>;

/// In-flight enrichment for one task.
struct PendingEnrichment {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

type PendingMap = Arc<Mutex<HashMap<TaskId, PendingEnrichment>>>;

/// Single-writer front for the task store.
pub struct TodoService {
    store: SharedTaskStore,
    extractor: Option<Arc<DetailExtractor>>,
    mode: EnrichmentMode,
    default_duration: String,
    pending: PendingMap,
}

impl TodoService {
    /// Service without enrichment; tasks keep their provisional values.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(TaskStore::new())),
            extractor: None,
            mode: EnrichmentMode::Details,
            default_duration: crate::task::DEFAULT_DURATION.to_string(),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Service that enriches new tasks through `extractor`.
    pub fn with_extractor(extractor: DetailExtractor, mode: EnrichmentMode) -> Self {
        let default_duration = extractor.default_duration().to_string();
        Self {
            extractor: Some(Arc::new(extractor)),
            mode,
            default_duration,
            ..Self::new()
        }
    }

    /// Build the service described by `config`.
    ///
    /// Enrichment is enabled only when an API key is configured.
    pub fn from_config(config: &Config) -> Self {
        match &config.api_key {
            Some(api_key) => {
                let client: Arc<dyn LlmClient> = Arc::new(OpenRouterClient::with_api_url(
                    api_key.clone(),
                    config.api_url.clone(),
                ));
                let extractor = DetailExtractor::new(client, config.model.clone())
                    .with_max_tokens(config.max_tokens)
                    .with_default_duration(config.default_duration.clone());
                tracing::info!(
                    model = %config.model,
                    mode = ?config.enrichment,
                    "Task enrichment enabled"
                );
                Self::with_extractor(extractor, config.enrichment)
            }
            None => {
                tracing::info!("Task enrichment disabled (no API key configured)");
                Self {
                    default_duration: config.default_duration.clone(),
                    ..Self::new()
                }
            }
        }
    }

    /// Create a task and start enriching it in the background.
    ///
    /// Returns the provisional record as inserted.
    pub async fn add_task(&self, title: &str) -> Result<Task, TaskError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::InvalidField {
                field: "title",
                reason: "title cannot be empty".to_string(),
            });
        }

        let mut task = Task::new(title);
        task.duration = self.default_duration.clone();

        let known_categories = {
            let mut store = self.store.write().await;
            store.insert_task(task.clone());
            store.categories()
        };
        tracing::info!(task_id = %task.id, "Task created");

        if let Some(extractor) = &self.extractor {
            self.spawn_enrichment(Arc::clone(extractor), &task, known_categories);
        }

        Ok(task)
    }

    fn spawn_enrichment(
        &self,
        extractor: Arc<DetailExtractor>,
        task: &Task,
        known_categories: Vec<String>,
    ) {
        let id = task.id;
        let title = task.title.clone();
        let token = CancellationToken::new();
        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        let mode = self.mode;

        // Registered before spawning so the job's own cleanup always finds it.
        let mut guard = lock_pending(&self.pending);
        guard.insert(
            id,
            PendingEnrichment {
                token: token.clone(),
                handle: None,
            },
        );

        let job_token = token.clone();
        let handle = tokio::spawn(async move {
            let patch = tokio::select! {
                _ = job_token.cancelled() => None,
                patch = enrichment_patch(&extractor, mode, &title, &known_categories, Utc::now()) => Some(patch),
            };

            if let Some(patch) = patch {
                let mut store = store.write().await;
                if job_token.is_cancelled() {
                    tracing::debug!(task_id = %id, "Discarding stale enrichment result");
                } else {
                    match store.patch(id, patch) {
                        Ok(true) => tracing::debug!(task_id = %id, "Applied enrichment"),
                        Ok(false) => tracing::debug!(task_id = %id, "Task gone before enrichment finished"),
                        Err(e) => tracing::warn!(task_id = %id, "Enrichment patch rejected: {}", e),
                    }
                }
            } else {
                tracing::debug!(task_id = %id, "Enrichment cancelled");
            }

            lock_pending(&pending).remove(&id);
        });

        if let Some(entry) = guard.get_mut(&id) {
            entry.handle = Some(handle);
        }
    }

    fn cancel_enrichment(&self, id: TaskId) {
        if let Some(entry) = lock_pending(&self.pending).get(&id) {
            entry.token.cancel();
        }
    }

    /// Wait for the enrichment of `id` to finish, if one is running.
    ///
    /// Returns `false` when nothing was pending.
    pub async fn wait_for_enrichment(&self, id: TaskId) -> bool {
        let handle = lock_pending(&self.pending)
            .get_mut(&id)
            .and_then(|entry| entry.handle.take());
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    tracing::error!(task_id = %id, "Enrichment job panicked: {}", e);
                }
                true
            }
            None => false,
        }
    }

    /// Number of enrichments still in flight.
    pub fn pending_enrichments(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    pub async fn get_task(&self, id: TaskId) -> Option<Task> {
        self.store.read().await.get(id).cloned()
    }

    /// Tasks matching `filter`, optionally most urgent first.
    pub async fn list_tasks(&self, filter: &TaskFilter, sort_by_priority: bool) -> Vec<Task> {
        self.store
            .read()
            .await
            .view(filter, sort_by_priority)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Apply a user edit. Cancels any pending enrichment for the task.
    pub async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        patch.validate()?;
        self.cancel_enrichment(id);
        let mut store = self.store.write().await;
        if !store.patch(id, patch)? {
            return Err(TaskError::NotFound(id));
        }
        store.get(id).cloned().ok_or(TaskError::NotFound(id))
    }

    pub async fn set_priority(&self, id: TaskId, priority: Priority) -> Result<Task, TaskError> {
        self.update_task(
            id,
            TaskPatch {
                priority: Some(priority),
                ..TaskPatch::default()
            },
        )
        .await
    }

    pub async fn set_duration(&self, id: TaskId, duration: &str) -> Result<Task, TaskError> {
        self.update_task(
            id,
            TaskPatch {
                duration: Some(duration.to_string()),
                ..TaskPatch::default()
            },
        )
        .await
    }

    pub async fn set_due_date(
        &self,
        id: TaskId,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, TaskError> {
        self.update_task(
            id,
            TaskPatch {
                due_date: Some(due_date),
                ..TaskPatch::default()
            },
        )
        .await
    }

    pub async fn add_category(&self, id: TaskId, label: &str) -> Result<Task, TaskError> {
        self.cancel_enrichment(id);
        let mut store = self.store.write().await;
        store
            .update(id, |task| task.add_category(label).map(|_| task.clone()))
            .ok_or(TaskError::NotFound(id))?
    }

    pub async fn remove_category(&self, id: TaskId, label: &str) -> Result<Task, TaskError> {
        self.cancel_enrichment(id);
        let mut store = self.store.write().await;
        store
            .update(id, |task| {
                task.remove_category(label);
                task.clone()
            })
            .ok_or(TaskError::NotFound(id))
    }

    /// Delete a task, cancelling its pending enrichment.
    pub async fn delete_task(&self, id: TaskId) -> Result<Task, TaskError> {
        self.cancel_enrichment(id);
        let removed = self.store.write().await.remove(id);
        match removed {
            Some(task) => {
                tracing::info!(task_id = %id, "Task deleted");
                Ok(task)
            }
            None => Err(TaskError::NotFound(id)),
        }
    }

    /// Move the task at display position `source` to `destination`.
    pub async fn reorder(&self, source: usize, destination: usize) -> Result<(), TaskError> {
        self.store.write().await.reorder(source, destination)
    }

    pub async fn category_tally(&self, sort_by_count: bool) -> Vec<CategoryCount> {
        self.store.read().await.category_tally(sort_by_count)
    }

    pub async fn categories(&self) -> Vec<String> {
        self.store.read().await.categories()
    }
}

impl Default for TodoService {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_pending(
    pending: &Mutex<HashMap<TaskId, PendingEnrichment>>,
) -> std::sync::MutexGuard<'_, HashMap<TaskId, PendingEnrichment>> {
    // A poisoned map only means a job panicked mid-cleanup; the entries stay usable.
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run the configured enrichment and turn its outcome into a patch.
///
/// Extraction failures are logged and replaced by the fallback record.
async fn enrichment_patch(
    extractor: &DetailExtractor,
    mode: EnrichmentMode,
    title: &str,
    known_categories: &[String],
    now: DateTime<Utc>,
) -> TaskPatch {
    match mode {
        EnrichmentMode::Details => match extractor.extract(title, known_categories, now).await {
            Ok(details) => details.into_patch(),
            Err(e) => {
                tracing::warn!("Task detail extraction failed: {}", e);
                TaskDetails::fallback(title, extractor.default_duration()).into_patch()
            }
        },
        EnrichmentMode::DurationOnly => TaskPatch {
            duration: Some(extractor.estimate_duration(title).await),
            ..TaskPatch::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedClient;
    use chrono::{Duration as ChronoDuration, Timelike};
    use std::time::Duration;

    fn enriching_service(client: ScriptedClient, mode: EnrichmentMode) -> TodoService {
        let extractor = DetailExtractor::new(Arc::new(client), "test-model");
        TodoService::with_extractor(extractor, mode)
    }

    #[tokio::test]
    async fn test_add_task_without_extractor_keeps_provisional_values() {
        let service = TodoService::new();
        let task = service.add_task("  water plants ").await.unwrap();
        assert_eq!(task.title, "water plants");
        assert_eq!(task.priority, Priority::P3);
        assert_eq!(task.duration, "15m");
        assert!(!service.wait_for_enrichment(task.id).await);
        assert_eq!(service.get_task(task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn test_add_task_rejects_blank_title() {
        let service = TodoService::new();
        assert!(service.add_task("   ").await.is_err());
        assert!(service.list_tasks(&TaskFilter::All, false).await.is_empty());
    }

    #[tokio::test]
    async fn test_enrichment_patches_task() {
        let tomorrow = (Utc::now() + ChronoDuration::days(1)).date_naive();
        let reply = format!(
            r#"{{"dueDate": "{}T12:00:00.000Z", "priority": "P1", "duration": "15m", "categories": ["Errands"], "cleanTitle": "buy milk"}}"#,
            tomorrow
        );
        let service = enriching_service(ScriptedClient::replying(&reply), EnrichmentMode::Details);

        let task = service.add_task("buy milk tomorrow p1").await.unwrap();
        assert_eq!(task.title, "buy milk tomorrow p1");
        assert!(service.wait_for_enrichment(task.id).await);

        let task = service.get_task(task.id).await.unwrap();
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.priority, Priority::P1);
        assert_eq!(task.categories, vec!["Errands"]);
        let due = task.due_date.unwrap();
        assert_eq!(due.date_naive(), tomorrow);
        assert_eq!(due.hour(), 12);
        assert_eq!(service.pending_enrichments(), 0);
    }

    #[tokio::test]
    async fn test_failed_enrichment_applies_fallback() {
        let service = enriching_service(ScriptedClient::failing(), EnrichmentMode::Details);

        let task = service.add_task("xyz").await.unwrap();
        service.wait_for_enrichment(task.id).await;

        let task = service.get_task(task.id).await.unwrap();
        assert_eq!(task.title, "xyz");
        assert_eq!(task.duration, "15m");
        assert!(task.categories.is_empty());
        assert!(task.due_date.is_none());
        assert_eq!(task.priority, Priority::P3);
    }

    #[tokio::test]
    async fn test_malformed_reply_applies_fallback() {
        let service = enriching_service(ScriptedClient::replying("not json"), EnrichmentMode::Details);
        let task = service.add_task("xyz").await.unwrap();
        service.wait_for_enrichment(task.id).await;
        let task = service.get_task(task.id).await.unwrap();
        assert_eq!(task.title, "xyz");
        assert_eq!(task.priority, Priority::P3);
    }

    #[tokio::test]
    async fn test_duration_only_mode() {
        let service = enriching_service(ScriptedClient::replying("3 days"), EnrichmentMode::DurationOnly);
        let task = service.add_task("renovate kitchen").await.unwrap();
        service.wait_for_enrichment(task.id).await;
        let task = service.get_task(task.id).await.unwrap();
        assert_eq!(task.duration, "3 days");
        assert_eq!(task.title, "renovate kitchen");
        assert_eq!(task.priority, Priority::P3);
    }

    #[tokio::test]
    async fn test_user_edit_cancels_stale_enrichment() {
        let client = ScriptedClient::replying(
            r#"{"priority": "P1", "duration": "2h", "cleanTitle": "from model"}"#,
        )
        .with_delay(Duration::from_millis(200));
        let service = enriching_service(client, EnrichmentMode::Details);

        let task = service.add_task("draft").await.unwrap();
        service.set_priority(task.id, Priority::P2).await.unwrap();
        service.wait_for_enrichment(task.id).await;

        let task = service.get_task(task.id).await.unwrap();
        assert_eq!(task.priority, Priority::P2);
        assert_eq!(task.title, "draft");
        assert_eq!(task.duration, "15m");
        assert_eq!(service.pending_enrichments(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_enrichments_patch_their_own_tasks() {
        let client = ScriptedClient::keyed(&[
            ("first errand", r#"{"priority": "P1", "cleanTitle": "one"}"#),
            ("second errand", r#"{"priority": "P2", "cleanTitle": "two"}"#),
        ])
        .with_delay(Duration::from_millis(100));
        let service = enriching_service(client, EnrichmentMode::Details);

        let a = service.add_task("first errand").await.unwrap();
        let b = service.add_task("second errand").await.unwrap();
        assert_eq!(service.pending_enrichments(), 2);

        service.wait_for_enrichment(b.id).await;
        service.wait_for_enrichment(a.id).await;

        let a = service.get_task(a.id).await.unwrap();
        let b = service.get_task(b.id).await.unwrap();
        assert_eq!((a.title.as_str(), a.priority), ("one", Priority::P1));
        assert_eq!((b.title.as_str(), b.priority), ("two", Priority::P2));
        assert_eq!(service.pending_enrichments(), 0);
    }

    #[tokio::test]
    async fn test_delete_cancels_enrichment() {
        let client = ScriptedClient::replying(r#"{"cleanTitle": "x"}"#)
            .with_delay(Duration::from_millis(200));
        let service = enriching_service(client, EnrichmentMode::Details);

        let task = service.add_task("x").await.unwrap();
        service.delete_task(task.id).await.unwrap();
        service.wait_for_enrichment(task.id).await;
        assert!(service.get_task(task.id).await.is_none());
        assert!(matches!(
            service.delete_task(task.id).await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_known_categories_reach_prompt() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(r#"{"categories": ["Garden"], "cleanTitle": "mow lawn"}"#.to_string()),
            Ok(r#"{"categories": ["Garden"], "cleanTitle": "weed beds"}"#.to_string()),
        ]));
        let extractor = DetailExtractor::new(client.clone(), "m");
        let service = TodoService::with_extractor(extractor, EnrichmentMode::Details);

        let first = service.add_task("mow lawn").await.unwrap();
        service.wait_for_enrichment(first.id).await;
        let second = service.add_task("weed beds").await.unwrap();
        service.wait_for_enrichment(second.id).await;

        let prompts = client.prompts();
        assert!(!prompts[0].contains("Garden"));
        assert!(prompts[1].contains("Existing categories: Work, Personal, Study, Garden"));

        let tally = service.category_tally(true).await;
        assert_eq!(tally[0].label, "Garden");
        assert_eq!(tally[0].count, 2);
    }

    #[tokio::test]
    async fn test_category_edits_and_reorder() {
        let service = TodoService::new();
        let a = service.add_task("a").await.unwrap();
        let b = service.add_task("b").await.unwrap();

        let updated = service.add_category(a.id, "Work").await.unwrap();
        assert_eq!(updated.categories, vec!["Work"]);
        let updated = service.add_category(a.id, "Work").await.unwrap();
        assert_eq!(updated.categories, vec!["Work"]);
        assert!(service.add_category(a.id, " ").await.is_err());
        let updated = service.remove_category(a.id, "Work").await.unwrap();
        assert!(updated.categories.is_empty());

        service.reorder(0, 1).await.unwrap();
        let order: Vec<TaskId> = service
            .list_tasks(&TaskFilter::All, false)
            .await
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(order, vec![a.id, b.id]);
        assert!(service.reorder(0, 9).await.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let service = TodoService::new();
        let err = service
            .set_duration(TaskId::new(), "1h")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NotFound(_)));
    }
}
