#![forbid(unsafe_code)]

use time::OffsetDateTime;

use crate::error::{TaskdeckError, ValidationError};
use crate::task::clock::Clock;
use crate::task::model::{Task, TaskDraft, TaskPatch, TaskStatus};
use crate::task::policy::{self, Counts, Views};
use crate::task::storage::TaskSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Reject creation without a deadline.
    pub require_deadline: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            require_deadline: true,
        }
    }
}

/// Owns the task collection and keeps its storage slot in sync.
///
/// Every mutation stamps `updated_at`, re-sorts by score and rewrites the
/// whole collection to the slot before returning.
#[derive(Debug)]
pub struct TaskStore<S, C> {
    tasks: Vec<Task>,
    slot: S,
    clock: C,
    options: StoreOptions,
}

impl<S: TaskSlot, C: Clock> TaskStore<S, C> {
    /// Loads the slot once and sorts it for the current time.
    pub fn open(slot: S, clock: C, options: StoreOptions) -> Result<Self, TaskdeckError> {
        let tasks = slot.load()?;
        let mut store = Self {
            tasks,
            slot,
            clock,
            options,
        };
        store.resort();
        Ok(store)
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn slot(&self) -> &S {
        &self.slot
    }

    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    #[must_use]
    pub fn views(&self) -> Views<'_> {
        Views::compute(&self.tasks, self.clock.now())
    }

    #[must_use]
    pub fn counts(&self) -> Counts {
        policy::counts(&self.tasks, self.clock.now())
    }

    /// Re-sorts against the current time without persisting. Scores drift
    /// as deadlines approach.
    pub fn resort(&mut self) {
        let now = self.clock.now();
        policy::sort_by_score(&mut self.tasks, now);
    }

    /// Every rule `create` would reject `draft` for, without touching the
    /// collection. Empty when the draft is acceptable.
    #[must_use]
    pub fn check(&self, draft: &TaskDraft) -> ValidationError {
        let mut invalid = ValidationError::new();
        if draft.title.trim().is_empty() {
            invalid.push("task title is required");
        }
        if self.options.require_deadline && draft.deadline.is_none() {
            invalid.push("deadline is required");
        }
        invalid
    }

    pub fn create(&mut self, draft: TaskDraft) -> Result<&Task, TaskdeckError> {
        self.check(&draft).into_result()?;
        let title = draft.title.trim();

        let now = self.clock.now();
        let id = self.next_id(now);
        let task = Task {
            id,
            title: title.to_owned(),
            description: draft.description.trim().to_owned(),
            deadline: draft.deadline,
            priority: draft.priority,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(id, title = %task.title, "creating task");
        self.tasks.push(task);
        self.commit(now)?;

        self.get(id)
            .ok_or_else(|| TaskdeckError::Other(format!("task {id} vanished after create")))
    }

    /// Merges `patch` over task `id`. Unknown ids are ignored and nothing is
    /// written; the return value tells whether a task was touched.
    pub fn update(&mut self, id: i64, patch: &TaskPatch) -> Result<bool, TaskdeckError> {
        let now = self.clock.now();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            tracing::warn!(id, "update ignored: no such task");
            return Ok(false);
        };

        patch.apply_to(task);
        task.updated_at = now.max(task.created_at);
        tracing::debug!(id, ?patch, "updated task");
        self.commit(now)?;
        Ok(true)
    }

    pub fn set_status(&mut self, id: i64, status: TaskStatus) -> Result<bool, TaskdeckError> {
        self.update(id, &TaskPatch::status(status))
    }

    /// Removes task `id`. Unknown ids are ignored and nothing is written.
    pub fn delete(&mut self, id: i64) -> Result<bool, TaskdeckError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            tracing::warn!(id, "delete ignored: no such task");
            return Ok(false);
        }
        tracing::debug!(id, "deleted task");
        self.commit(self.clock.now())?;
        Ok(true)
    }

    fn commit(&mut self, now: OffsetDateTime) -> Result<(), TaskdeckError> {
        policy::sort_by_score(&mut self.tasks, now);
        self.slot.save(&self.tasks)?;
        Ok(())
    }

    /// Millisecond timestamp, bumped past the largest existing id when the
    /// clock has not moved on.
    fn next_id(&self, now: OffsetDateTime) -> i64 {
        let millis = i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
        match self.tasks.iter().map(|t| t.id).max() {
            Some(max) if max >= millis => max.saturating_add(1),
            _ => millis,
        }
    }
}
