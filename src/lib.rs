//! # tasklane
//!
//! To-do list backend with LLM-assisted task detail extraction.
//!
//! This library provides:
//! - An in-memory ordered task store with filter and category views
//! - A detail extractor that turns free text into due date, priority,
//!   duration and categories through a text-completion service
//! - A service that enriches new tasks in the background
//! - An HTTP API for a browser front end
//!
//! ## Task Flow
//! 1. Receive task text via API
//! 2. Insert a provisional task and return it
//! 3. Extract details in the background
//! 4. Patch the task (or apply the fallback on failure)
//!
//! ## Modules
//! - `task`: Task model, filters and the ordered store
//! - `extract`: Prompt building, response decoding and normalization
//! - `llm`: Completion client trait and OpenRouter implementation
//! - `service`: Store ownership and background enrichment
//! - `api`: HTTP routes

pub mod api;
pub mod config;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod service;
pub mod task;

pub use config::Config;
pub use service::TodoService;
