//! In-memory ordered task store.
//!
//! The store is the only owner of the task sequence. Insert, patch, reorder
//! and remove are its mutation entry points; filter and tally views are
//! recomputed on every read.

use std::collections::HashMap;

use serde::Serialize;

use super::filter::TaskFilter;
use super::task::{Task, TaskError, TaskId, TaskPatch};

/// Labels always offered to the user, before any task carries them.
pub const DEFAULT_CATEGORIES: [&str; 3] = ["Work", "Personal", "Study"];

/// Number of tasks carrying one category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Ordered sequence of tasks, most recently inserted first.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a provisional task at the front and return its identifier.
    pub fn insert(&mut self, title: impl Into<String>) -> TaskId {
        self.insert_task(Task::new(title))
    }

    /// Insert a fully built task at the front.
    pub fn insert_task(&mut self, task: Task) -> TaskId {
        let id = task.id;
        self.tasks.insert(0, task);
        tracing::debug!(task_id = %id, total = self.tasks.len(), "Inserted task");
        id
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Merge `patch` into the task with `id`.
    ///
    /// Returns `Ok(false)` without changes when no task has that identifier.
    /// A patch with an invalid field is rejected as a whole.
    pub fn patch(&mut self, id: TaskId, patch: TaskPatch) -> Result<bool, TaskError> {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                patch.apply_to(task)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run `f` against the task with `id`, if present.
    pub fn update<F, T>(&mut self, id: TaskId, f: F) -> Option<T>
    where
        F: FnOnce(&mut Task) -> T,
    {
        self.tasks.iter_mut().find(|t| t.id == id).map(f)
    }

    /// Move the task at `source` to `destination`.
    pub fn reorder(&mut self, source: usize, destination: usize) -> Result<(), TaskError> {
        let len = self.tasks.len();
        for index in [source, destination] {
            if index >= len {
                return Err(TaskError::IndexOutOfRange { index, len });
            }
        }
        if source == destination {
            return Ok(());
        }
        let moved = self.tasks.remove(source);
        self.tasks.insert(destination, moved);
        Ok(())
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.position(id).map(|index| self.tasks.remove(index))
    }

    /// All tasks in display order.
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks matching `filter`, in display order.
    pub fn filtered(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    /// Tasks matching `filter`, optionally stable-sorted most urgent first.
    pub fn view(&self, filter: &TaskFilter, sort_by_priority: bool) -> Vec<&Task> {
        let mut tasks = self.filtered(filter);
        if sort_by_priority {
            tasks.sort_by_key(|t| t.priority);
        }
        tasks
    }

    /// Count of tasks per category label.
    ///
    /// Unsorted output lists labels in first-seen order. Sorted output is by
    /// descending count, ties broken by label.
    pub fn category_tally(&self, sort_by_count: bool) -> Vec<CategoryCount> {
        let mut tally: Vec<CategoryCount> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for label in self.tasks.iter().flat_map(|t| t.categories.iter()) {
            match index.get(label.as_str()) {
                Some(&i) => tally[i].count += 1,
                None => {
                    index.insert(label, tally.len());
                    tally.push(CategoryCount {
                        label: label.clone(),
                        count: 1,
                    });
                }
            }
        }
        if sort_by_count {
            tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        }
        tally
    }

    /// Labels offered for selection: the defaults followed by every label in use.
    pub fn categories(&self) -> Vec<String> {
        let mut labels: Vec<String> = DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect();
        for label in self.tasks.iter().flat_map(|t| t.categories.iter()) {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use std::collections::HashSet;

    fn store_with(titles: &[&str]) -> TaskStore {
        let mut store = TaskStore::new();
        for title in titles.iter().rev() {
            store.insert(*title);
        }
        store
    }

    fn titles(store: &TaskStore) -> Vec<&str> {
        store.list().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_insert_puts_newest_first() {
        let mut store = TaskStore::new();
        let first = store.insert("first");
        let second = store.insert("second");
        assert_eq!(titles(&store), vec!["second", "first"]);
        assert_ne!(first, second);
        assert_eq!(store.get(first).unwrap().title, "first");
    }

    #[test]
    fn test_ids_unique_across_lifetime() {
        let mut store = TaskStore::new();
        let mut seen = HashSet::new();
        for i in 0..200 {
            let id = store.insert(format!("task {}", i));
            assert!(seen.insert(id));
            if i % 3 == 0 {
                store.remove(id);
            }
        }
    }

    #[test]
    fn test_patch_missing_id_is_noop() {
        let mut store = store_with(&["a"]);
        let before = store.list().to_vec();
        let patched = store
            .patch(
                TaskId::new(),
                TaskPatch {
                    priority: Some(Priority::P1),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert!(!patched);
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_patches_apply_in_call_order() {
        let mut store = TaskStore::new();
        let id = store.insert("a");
        for duration in ["1h", "2h"] {
            store
                .patch(
                    id,
                    TaskPatch {
                        duration: Some(duration.to_string()),
                        ..TaskPatch::default()
                    },
                )
                .unwrap();
        }
        assert_eq!(store.get(id).unwrap().duration, "2h");
    }

    #[test]
    fn test_reorder_moves_task() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.reorder(0, 2).unwrap();
        assert_eq!(titles(&store), vec!["b", "c", "a", "d"]);
        store.reorder(3, 0).unwrap();
        assert_eq!(titles(&store), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_reorder_same_index_is_unchanged() {
        let mut store = store_with(&["a", "b", "c"]);
        let before = store.list().to_vec();
        for i in 0..3 {
            store.reorder(i, i).unwrap();
            assert_eq!(store.list(), before.as_slice());
        }
    }

    #[test]
    fn test_reorder_out_of_range_is_rejected() {
        let mut store = store_with(&["a", "b"]);
        assert_eq!(
            store.reorder(2, 0),
            Err(TaskError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            store.reorder(0, 5),
            Err(TaskError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(titles(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_filtered_selector_view() {
        let mut store = store_with(&["a", "b", "c"]);
        let ids: Vec<TaskId> = store.list().iter().map(|t| t.id).collect();
        store.update(ids[0], |t| t.priority = Priority::P1);
        store.update(ids[1], |t| t.set_categories(["P1"]));
        store.update(ids[2], |t| t.set_categories(["Work"]));

        let view = store.filtered(&TaskFilter::from_selector(Some("P1")));
        let got: Vec<&str> = view.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(got, vec!["a", "b"]);

        let all = store.filtered(&TaskFilter::All);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].title, "c");
    }

    #[test]
    fn test_view_sorted_by_priority_is_stable() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        let ids: Vec<TaskId> = store.list().iter().map(|t| t.id).collect();
        store.update(ids[1], |t| t.priority = Priority::P1);
        store.update(ids[3], |t| t.priority = Priority::P4);

        let view = store.view(&TaskFilter::All, true);
        let got: Vec<&str> = view.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(got, vec!["b", "a", "c", "d"]);
        assert_eq!(titles(&store), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_category_tally_counts_memberships() {
        let mut store = store_with(&["a", "b", "c"]);
        let ids: Vec<TaskId> = store.list().iter().map(|t| t.id).collect();
        store.update(ids[0], |t| t.set_categories(["Home"]));
        store.update(ids[1], |t| t.set_categories(["Work", "Home"]));
        store.update(ids[2], |t| t.set_categories(["Errands", "Home", "Work"]));

        let tally = store.category_tally(true);
        assert_eq!(
            tally,
            vec![
                CategoryCount { label: "Home".to_string(), count: 3 },
                CategoryCount { label: "Work".to_string(), count: 2 },
                CategoryCount { label: "Errands".to_string(), count: 1 },
            ]
        );

        let memberships: usize = store.list().iter().map(|t| t.categories.len()).sum();
        let unsorted = store.category_tally(false);
        let counted: usize = unsorted.iter().map(|c| c.count).sum();
        assert_eq!(counted, memberships);
        let order: Vec<&str> = unsorted.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(order, vec!["Home", "Work", "Errands"]);
    }

    #[test]
    fn test_categories_merges_defaults_with_used_labels() {
        let mut store = store_with(&["a"]);
        let id = store.list()[0].id;
        store.update(id, |t| t.set_categories(["Work", "Errands"]));
        assert_eq!(store.categories(), vec!["Work", "Personal", "Study", "Errands"]);
    }
}
