//! Task API endpoints.
//!
//! Provides endpoints for the browser front end:
//! - List tasks (with sidebar filter and optional priority sort)
//! - Create task (enrichment continues in the background)
//! - Get / update / delete task
//! - Add / remove category
//! - Reorder
//! - Category tally and label catalogue

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::task::{CategoryCount, Priority, Task, TaskError, TaskFilter, TaskId, TaskPatch};

use super::routes::AppState;

/// Create task routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/reorder", post(reorder_tasks))
        .route("/:id", get(get_task).patch(update_task).delete(delete_task))
        .route("/:id/categories", post(add_category))
        .route("/:id/categories/:label", delete(remove_category))
}

/// Create category routes.
pub fn category_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories))
        .route("/labels", get(list_category_labels))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Sidebar selector: a priority label or a category label.
    pub filter: Option<String>,
    /// Priority only.
    pub priority: Option<String>,
    /// Category only.
    pub category: Option<String>,
    /// `priority` sorts most urgent first.
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub priority: Option<String>,
    pub duration: Option<String>,
    /// `null` clears the due date; omitting the key leaves it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub source: usize,
    pub destination: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    /// `count` sorts by descending task count.
    pub sort: Option<String>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

type ApiError = (StatusCode, String);

fn task_error(e: TaskError) -> ApiError {
    let status = match e {
        TaskError::NotFound(_) => StatusCode::NOT_FOUND,
        TaskError::IndexOutOfRange { .. } | TaskError::InvalidField { .. } => {
            StatusCode::BAD_REQUEST
        }
    };
    (status, e.to_string())
}

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse::<TaskId>()
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid task id: {}", raw)))
}

fn parse_priority(raw: &str) -> Result<Priority, ApiError> {
    raw.parse::<Priority>().map_err(task_error)
}

impl ListTasksQuery {
    fn to_filter(&self) -> Result<TaskFilter, ApiError> {
        if let Some(priority) = self.priority.as_deref().map(str::trim) {
            if !priority.is_empty() {
                return Ok(TaskFilter::Priority(parse_priority(priority)?));
            }
        }
        if let Some(category) = self.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                return Ok(TaskFilter::Category(category.to_string()));
            }
        }
        Ok(TaskFilter::from_selector(self.filter.as_deref()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/tasks
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let filter = query.to_filter()?;
    let sort_by_priority = query.sort.as_deref() == Some("priority");
    Ok(Json(state.todos.list_tasks(&filter, sort_by_priority).await))
}

/// POST /api/tasks
/// Returns the provisional task; enrichment patches it later.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.todos.add_task(&req.title).await.map_err(task_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/tasks/:id
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    state
        .todos
        .get_task(id)
        .await
        .map(Json)
        .ok_or_else(|| task_error(TaskError::NotFound(id)))
}

/// PATCH /api/tasks/:id
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    let priority = req.priority.as_deref().map(parse_priority).transpose()?;
    let patch = TaskPatch {
        title: req.title,
        due_date: req.due_date,
        duration: req.duration,
        priority,
        categories: req.categories,
    };
    if patch.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No fields to update".to_string()));
    }
    let task = state.todos.update_task(id, patch).await.map_err(task_error)?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.todos.delete_task(id).await.map_err(task_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/:id/categories
async fn add_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddCategoryRequest>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    let task = state
        .todos
        .add_category(id, &req.label)
        .await
        .map_err(task_error)?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id/categories/:label
async fn remove_category(
    State(state): State<Arc<AppState>>,
    Path((id, label)): Path<(String, String)>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    let task = state
        .todos
        .remove_category(id, &label)
        .await
        .map_err(task_error)?;
    Ok(Json(task))
}

/// POST /api/tasks/reorder
async fn reorder_tasks(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReorderRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .todos
        .reorder(req.source, req.destination)
        .await
        .map_err(task_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/categories
/// Task count per label in use.
async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CategoriesQuery>,
) -> Json<Vec<CategoryCount>> {
    let sort_by_count = query.sort.as_deref() == Some("count");
    Json(state.todos.category_tally(sort_by_count).await)
}

/// GET /api/categories/labels
/// Labels offered for selection, defaults first.
async fn list_category_labels(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.todos.categories().await)
}
