//! # Offline Sync Queue
//!
//! Plan edits made while offline are queued and replayed later.
//!
//! ```text
//! 1. An editor with a repository attached diffs every committed change,
//!    undo and redo into Operations (see `diff_operations`)
//! 2. The queue is persisted through a SyncRepository
//! 3. When a backend is reachable, drain() hands the operations over;
//!    failures are retried up to MAX_RETRIES times, then dropped
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId};
use crate::error::CanvasResult;

/// Attempts before a failing operation is dropped.
pub const MAX_RETRIES: u32 = 3;

/// Default queue capacity.
pub const DEFAULT_QUEUE_SIZE: usize = 1000;

/// A queued plan change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Add a new element to the plan.
    Add {
        /// The element to add.
        element: Element,
        /// Timestamp when operation was created (ms since epoch).
        timestamp: u64,
    },
    /// Replace an existing element.
    Update {
        /// The element's new state.
        element: Element,
        /// Timestamp when operation was created (ms since epoch).
        timestamp: u64,
    },
    /// Remove an element from the plan.
    Remove {
        /// The element ID to remove.
        id: ElementId,
        /// Timestamp when operation was created (ms since epoch).
        timestamp: u64,
    },
}

impl Operation {
    /// Get the timestamp of this operation.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        match self {
            Self::Add { timestamp, .. }
            | Self::Update { timestamp, .. }
            | Self::Remove { timestamp, .. } => *timestamp,
        }
    }

    /// The element this operation touches.
    #[must_use]
    pub fn element_id(&self) -> ElementId {
        match self {
            Self::Add { element, .. } | Self::Update { element, .. } => element.id,
            Self::Remove { id, .. } => *id,
        }
    }

    /// Get the current timestamp in milliseconds since epoch.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// An operation plus its failed attempt count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedOperation {
    /// The change.
    pub op: Operation,
    /// Failed sync attempts so far.
    #[serde(default)]
    pub retries: u32,
}

/// Outcome of [`SyncQueue::process`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Operations accepted by the backend.
    pub synced_count: usize,
    /// Operations that failed and stay queued.
    pub retry_count: usize,
    /// Operations dropped after too many failures.
    pub dropped_count: usize,
}

impl SyncResult {
    /// Whether everything went through.
    #[must_use]
    pub fn success(&self) -> bool {
        self.retry_count == 0 && self.dropped_count == 0
    }
}

/// Bounded queue of pending operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueue {
    pending: VecDeque<QueuedOperation>,
    last_sync: Option<u64>,
    max_size: usize,
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncQueue {
    /// Create a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_QUEUE_SIZE)
    }

    /// Create a queue with a custom max size.
    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            last_sync: None,
            max_size: max_size.max(1),
        }
    }

    /// Enqueue an operation, dropping the oldest at capacity.
    pub fn enqueue(&mut self, op: Operation) {
        if self.pending.len() >= self.max_size {
            if let Some(dropped) = self.pending.pop_front() {
                tracing::warn!(id = %dropped.op.element_id(), "Sync queue full, dropping oldest operation");
            }
        }
        self.pending.push_back(QueuedOperation { op, retries: 0 });
    }

    /// Get the number of pending operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get the last sync timestamp.
    #[must_use]
    pub const fn last_sync(&self) -> Option<u64> {
        self.last_sync
    }

    /// Peek at pending operations without removing them.
    pub fn pending(&self) -> impl Iterator<Item = &Operation> {
        self.pending.iter().map(|q| &q.op)
    }

    /// Take all pending operations and stamp the sync time.
    pub fn drain(&mut self, timestamp: u64) -> Vec<Operation> {
        self.last_sync = Some(timestamp);
        self.pending.drain(..).map(|q| q.op).collect()
    }

    /// Offer every pending operation to `send`.
    ///
    /// Operations for which `send` returns `false` stay queued with their
    /// retry count bumped, unless they reached [`MAX_RETRIES`].
    pub fn process<F>(&mut self, timestamp: u64, mut send: F) -> SyncResult
    where
        F: FnMut(&Operation) -> bool,
    {
        let mut result = SyncResult::default();
        let mut remaining = VecDeque::with_capacity(self.pending.len());

        for mut queued in self.pending.drain(..) {
            if send(&queued.op) {
                result.synced_count += 1;
                continue;
            }
            queued.retries += 1;
            if queued.retries >= MAX_RETRIES {
                tracing::warn!(
                    id = %queued.op.element_id(),
                    retries = queued.retries,
                    "Operation failed too many times, dropping"
                );
                result.dropped_count += 1;
            } else {
                result.retry_count += 1;
                remaining.push_back(queued);
            }
        }

        self.pending = remaining;
        self.last_sync = Some(timestamp);
        result
    }

    /// Clear all pending operations.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Operations that turn `before` into `after`.
///
/// Elements are matched by id. Selection and hover state are not plan
/// content and never produce an update.
#[must_use]
pub fn diff_operations(before: &[Element], after: &[Element], timestamp: u64) -> Vec<Operation> {
    let old: HashMap<ElementId, &Element> = before.iter().map(|e| (e.id, e)).collect();
    let mut ops = Vec::new();
    for element in after {
        match old.get(&element.id) {
            None => ops.push(Operation::Add {
                element: plain(element),
                timestamp,
            }),
            Some(previous) if plain(previous) != plain(element) => ops.push(Operation::Update {
                element: plain(element),
                timestamp,
            }),
            Some(_) => {}
        }
    }
    let kept: HashSet<ElementId> = after.iter().map(|e| e.id).collect();
    ops.extend(
        before
            .iter()
            .filter(|e| !kept.contains(&e.id))
            .map(|e| Operation::Remove {
                id: e.id,
                timestamp,
            }),
    );
    ops
}

fn plain(element: &Element) -> Element {
    Element {
        selected: false,
        hovered: false,
        ..element.clone()
    }
}

/// Persistent storage for the sync queue.
pub trait SyncRepository: std::fmt::Debug + Send {
    /// Read the stored queue; an absent store yields an empty queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read.
    fn load(&self) -> CanvasResult<SyncQueue>;

    /// Overwrite the stored queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&mut self, queue: &SyncQueue) -> CanvasResult<()>;

    /// Append one operation to the stored queue.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or saving fails.
    fn enqueue(&mut self, op: Operation) -> CanvasResult<()> {
        let mut queue = self.load()?;
        queue.enqueue(op);
        self.save(&queue)
    }

    /// Remove and return every stored operation.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or saving fails.
    fn drain(&mut self) -> CanvasResult<Vec<Operation>> {
        let mut queue = self.load()?;
        let ops = queue.drain(Operation::now());
        self.save(&queue)?;
        Ok(ops)
    }
}

/// Queue storage that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    queue: SyncQueue,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncRepository for MemoryRepository {
    fn load(&self) -> CanvasResult<SyncQueue> {
        Ok(self.queue.clone())
    }

    fn save(&mut self, queue: &SyncQueue) -> CanvasResult<()> {
        self.queue = queue.clone();
        Ok(())
    }
}

/// Queue storage in a JSON file.
#[derive(Debug, Clone)]
pub struct FileRepository {
    path: PathBuf,
}

impl FileRepository {
    /// Store the queue at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SyncRepository for FileRepository {
    fn load(&self) -> CanvasResult<SyncQueue> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SyncQueue::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, queue: &SyncQueue) -> CanvasResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(queue)?;
        fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), pending = queue.len(), "Saved sync queue");
        Ok(())
    }
}
