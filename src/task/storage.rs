#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::task::model::Task;

/// Where the task collection is mirrored. The whole collection is read once
/// and rewritten in full after every change.
pub trait TaskSlot {
    fn load(&self) -> anyhow::Result<Vec<Task>>;
    fn save(&self, tasks: &[Task]) -> anyhow::Result<()>;
}

pub fn encode(tasks: &[Task]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(tasks).context("failed to serialize tasks")
}

pub fn decode(raw: &str) -> anyhow::Result<Vec<Task>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    // A stored `null` means nothing was saved yet.
    let tasks: Option<Vec<Task>> = serde_json::from_str(raw).context("failed to parse tasks")?;
    Ok(tasks.unwrap_or_default())
}

/// JSON file on disk, rewritten atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> anyhow::Result<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create task dir {}", parent.display()))
    }
}

impl TaskSlot for FileSlot {
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "task file missing; starting empty");
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let tasks =
            decode(&raw).with_context(|| format!("failed to load {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        self.ensure_parent()?;
        let data = encode(tasks)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data.as_bytes())
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!("failed to rename {} -> {}", tmp.display(), self.path.display())
        })?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }
}

/// In-process text slot; holds exactly what a file would.
#[derive(Debug, Default)]
pub struct MemorySlot {
    raw: RefCell<Option<String>>,
    writes: Cell<usize>,
}

impl MemorySlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_contents(raw: impl Into<String>) -> Self {
        Self {
            raw: RefCell::new(Some(raw.into())),
            writes: Cell::new(0),
        }
    }

    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.raw.borrow().clone()
    }

    /// Number of `save` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl TaskSlot for MemorySlot {
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        match self.raw.borrow().as_deref() {
            Some(raw) => decode(raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let data = encode(tasks)?;
        *self.raw.borrow_mut() = Some(data);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

impl<S: TaskSlot + ?Sized> TaskSlot for &S {
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        (**self).load()
    }

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        (**self).save(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{Priority, TaskStatus};
    use time::macros::{date, datetime};

    fn sample(id: i64) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: "notes".to_owned(),
            deadline: Some(date!(2024 - 12 - 24)),
            priority: Priority::Medium,
            status: TaskStatus::Todo,
            created_at: datetime!(2024-12-01 09:00 UTC),
            updated_at: datetime!(2024-12-02 09:00 UTC),
        }
    }

    #[test]
    fn decode_treats_blank_and_null_as_empty() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("null").unwrap().is_empty());
        assert!(decode("[]").unwrap().is_empty());
        assert!(decode("{\"not\": \"a list\"}").is_err());
    }

    #[test]
    fn file_slot_missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slot = FileSlot::new(dir.path().join("nested").join("tasks.json"));
        assert!(slot.load().unwrap().is_empty());
    }

    #[test]
    fn file_slot_save_creates_dirs_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("tasks.json");
        let slot = FileSlot::new(path.clone());

        let tasks = vec![sample(1), sample(2)];
        slot.save(&tasks).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(slot.load().unwrap(), tasks);
    }

    #[test]
    fn file_slot_corrupt_file_is_an_error_naming_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "[{").unwrap();
        let err = FileSlot::new(path.clone()).load().unwrap_err();
        assert!(format!("{err:#}").contains(&path.display().to_string()));
    }

    #[test]
    fn memory_slot_counts_writes() {
        let slot = MemorySlot::new();
        assert!(slot.load().unwrap().is_empty());
        slot.save(&[sample(7)]).unwrap();
        assert_eq!(slot.writes(), 1);
        assert_eq!(slot.load().unwrap()[0].id, 7);
        assert!(slot.contents().unwrap().contains("\"createdAt\""));
    }
}
