//! Work scheduled to run after a table has been created.

use std::collections::VecDeque;

use smol_str::SmolStr;
use strata_schema::{IndexDescriptor, ModelSource};

/// A unit of deferred work.
#[derive(Debug, Clone)]
pub enum DeferredTask {
    /// Create an index on a table that now exists.
    CreateIndex {
        /// Table name.
        table: SmolStr,
        /// Index to create.
        index: IndexDescriptor,
    },
    /// Create a many-to-many join table if it is missing.
    JoinTable {
        /// Join model.
        source: ModelSource,
        /// Add missing pieces to the join table when it already exists.
        migrate_existing: bool,
    },
}

impl std::fmt::Display for DeferredTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateIndex { table, index } => {
                write!(f, "create index {} on {}", index.name, table)
            }
            Self::JoinTable { source, .. } => write!(f, "join table {}", source.name()),
        }
    }
}

/// A deferred task that failed. Failures do not abort the migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredFailure {
    /// Task description.
    pub task: String,
    /// Error message.
    pub message: String,
}

/// FIFO queue of deferred work, drained right after the statement that
/// scheduled it succeeds.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    tasks: VecDeque<DeferredTask>,
}

impl DeferredQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task.
    pub fn push(&mut self, task: DeferredTask) {
        self.tasks.push_back(task);
    }

    /// Take the oldest task.
    pub fn pop(&mut self) -> Option<DeferredTask> {
        self.tasks.pop_front()
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::IndexOption;

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = DeferredQueue::new();
        for name in ["idx_a", "idx_b"] {
            queue.push(DeferredTask::CreateIndex {
                table: "users".into(),
                index: IndexDescriptor::new(name, vec![IndexOption::column("a")]),
            });
        }

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop().map(|t| t.to_string()).as_deref(),
            Some("create index idx_a on users")
        );
        assert_eq!(
            queue.pop().map(|t| t.to_string()).as_deref(),
            Some("create index idx_b on users")
        );
        assert!(queue.is_empty());
    }
}
