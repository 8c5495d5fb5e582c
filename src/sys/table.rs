use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::errno::Errno;
use super::error::SysResult;

/// Descriptors that exist for the whole lifetime of a table.
pub const STD_STREAMS: [i32; 3] = [0, 1, 2];

/// How `read` and `write` pick their file offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// The host's own cursor is used; `position` mirrors it.
    #[default]
    Tracked,
    /// `position` is authoritative. Entered on the first seek and never left.
    Explicit,
}

/// Per-descriptor state.
#[derive(Debug, Default)]
pub struct Descriptor {
    pub path: String,
    /// Pending directory entries; `None` when not opened on a directory.
    pub entries: Option<VecDeque<String>>,
    pub position: i64,
    pub cursor: CursorMode,
}

impl Descriptor {
    pub fn new(path: impl Into<String>, entries: Option<Vec<String>>) -> Self {
        Self {
            path: path.into(),
            entries: entries.map(VecDeque::from),
            position: 0,
            cursor: CursorMode::Tracked,
        }
    }

    /// Move the cursor to `position` and switch to explicit mode for good.
    pub fn seek_to(&mut self, position: i64) {
        if self.cursor == CursorMode::Tracked {
            debug!("descriptor {:?} switching to explicit positioning", self.path);
        }
        self.cursor = CursorMode::Explicit;
        self.position = position;
    }

    pub fn advance(&mut self, n: usize) {
        self.position = self.position.saturating_add(n as i64);
    }
}

pub type DescriptorRef = Arc<Mutex<Descriptor>>;

/// The mapping from descriptor number to descriptor record.
///
/// The map lock is only held for lookup, insert and remove. Callers lock
/// the returned record for the duration of an operation on it.
#[derive(Debug)]
pub struct DescriptorTable {
    files: Mutex<HashMap<i32, Slot>>,
}

#[derive(Debug)]
struct Slot {
    /// One of the records the table was created with. Those survive close.
    std_stream: bool,
    descriptor: DescriptorRef,
}

impl Slot {
    fn new(std_stream: bool, descriptor: Descriptor) -> Self {
        Self {
            std_stream,
            descriptor: Arc::new(Mutex::new(descriptor)),
        }
    }
}

/// Outcome of [`DescriptorTable::release`].
#[derive(Debug)]
pub enum Released {
    /// A standard stream; it stays in the table.
    Kept,
    /// The record was removed and its host fd must be closed.
    Removed(DescriptorRef),
}

impl DescriptorTable {
    /// A table holding only the standard streams.
    pub fn new() -> Self {
        let files = STD_STREAMS
            .iter()
            .map(|&fd| (fd, Slot::new(true, Descriptor::default())))
            .collect();
        Self {
            files: Mutex::new(files),
        }
    }

    pub fn get(&self, fd: i32) -> SysResult<DescriptorRef> {
        self.files()
            .get(&fd)
            .map(|slot| Arc::clone(&slot.descriptor))
            .ok_or(Errno::EBADF.into())
    }

    pub fn insert(&self, fd: i32, descriptor: Descriptor) {
        debug!("descriptor {fd} opened on {:?}", descriptor.path);
        let previous = self.files().insert(fd, Slot::new(false, descriptor));
        if previous.is_some() {
            debug!("descriptor {fd} replaced a stale record");
        }
    }

    pub fn remove(&self, fd: i32) -> Option<DescriptorRef> {
        let removed = self.files().remove(&fd);
        if removed.is_some() {
            debug!("descriptor {fd} removed");
        }
        removed.map(|slot| slot.descriptor)
    }

    /// Remove `fd` unless it is one of the standard streams the table was
    /// seeded with. A record the host opened on 0, 1 or 2 is removed.
    pub fn release(&self, fd: i32) -> SysResult<Released> {
        let mut files = self.files();
        match files.get(&fd).map(|slot| slot.std_stream) {
            None => Err(Errno::EBADF.into()),
            Some(true) => Ok(Released::Kept),
            Some(false) => {
                let slot = files.remove(&fd).ok_or(Errno::EBADF)?;
                debug!("descriptor {fd} removed");
                Ok(Released::Removed(slot.descriptor))
            }
        }
    }

    pub fn contains(&self, fd: i32) -> bool {
        self.files().contains_key(&fd)
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<i32, Slot>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a descriptor record.
pub fn lock(descriptor: &DescriptorRef) -> MutexGuard<'_, Descriptor> {
    descriptor.lock().unwrap_or_else(PoisonError::into_inner)
}
