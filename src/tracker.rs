//! In-memory registry of outstanding work items.
//!
//! Entries live from a successful submission until a cancellation or a
//! terminal callback removes them. Nothing is persisted: a restart forgets
//! every outstanding job, and late callbacks for them find nothing.

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::model::WorkItem;

/// Outstanding work items keyed by their Design Automation id.
///
/// Each operation is atomic on its own; no lock is held across calls.
#[derive(Debug, Default)]
pub struct WorkItemTracker {
    items: DashMap<String, WorkItem>,
}

impl WorkItemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a work item. A duplicate id replaces the old entry.
    pub fn register(&self, item: WorkItem) {
        let id = item.workitem_id.clone();
        if self.items.insert(id.clone(), item).is_some() {
            warn!(workitem_id = %id, "work item id already tracked, replaced");
        } else {
            debug!(workitem_id = %id, tracked = self.items.len(), "work item registered");
        }
    }

    /// Look up a work item. `None` is an expected outcome, e.g. after a
    /// cancellation already removed it.
    pub fn find(&self, workitem_id: &str) -> Option<WorkItem> {
        self.items.get(workitem_id).map(|entry| entry.value().clone())
    }

    /// Stop tracking a work item, returning it if it was still present.
    ///
    /// Idempotent: of several racing callers exactly one gets `Some`.
    pub fn remove(&self, workitem_id: &str) -> Option<WorkItem> {
        let removed = self.items.remove(workitem_id).map(|(_, item)| item);
        if removed.is_none() {
            debug!(workitem_id, "work item not tracked, nothing to remove");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of all tracked work items, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|entry| entry.key().clone()).collect()
    }
}
