//! HTTP API module for the browser front end.
//!
//! ## Endpoints
//! - `GET /api/health` - Health check
//! - `GET /api/tasks` - List tasks (`filter`, `priority`, `category`, `sort`)
//! - `POST /api/tasks` - Create a task
//! - `GET|PATCH|DELETE /api/tasks/:id` - Read, edit, delete one task
//! - `POST /api/tasks/:id/categories` - Add a category label
//! - `DELETE /api/tasks/:id/categories/:label` - Remove a category label
//! - `POST /api/tasks/reorder` - Move a task to a new position
//! - `GET /api/categories` - Task count per category label
//! - `GET /api/categories/labels` - Category labels offered for selection

mod routes;
mod tasks;

pub use routes::{router, serve, AppState};
