//! Fragment table and byte storage of encapsulated frame data.

mod store;

pub use store::{FileStore, FragmentStore, MemoryStore, SourceStream};

use std::sync::Arc;

use parking_lot::Mutex;

/// Where the bytes of a fragment live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    File,
    Memory,
}

/// One opaque byte span of a frame, as reported by the container parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFragment {
    /// Absolute offset into the backing file.
    File { offset: u64, length: u64 },
    /// Inline span of the backing buffer. Its position is the summed length of every
    /// fragment before it, since inline fragments carry no address of their own.
    Memory { length: u64 },
}

impl FrameFragment {
    pub fn length(&self) -> u64 {
        match *self {
            Self::File { length, .. } | Self::Memory { length } => length,
        }
    }

    pub fn storage_kind(&self) -> StorageKind {
        match self {
            Self::File { .. } => StorageKind::File,
            Self::Memory { .. } => StorageKind::Memory,
        }
    }
}

/// Ordered fragment list shared between a producer that discovers fragments and the
/// threads that resolve frames.
///
/// The lock is held only to append or to take a snapshot. A snapshot is an immutable
/// `Arc` of the list at that instant; appends made later copy the list instead of
/// mutating it under a reader.
#[derive(Debug, Default)]
pub struct FragmentTable {
    fragments: Mutex<Arc<Vec<FrameFragment>>>,
}

impl FragmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragments(fragments: Vec<FrameFragment>) -> Self {
        Self {
            fragments: Mutex::new(Arc::new(fragments)),
        }
    }

    pub fn push(&self, fragment: FrameFragment) {
        let mut guard = self.fragments.lock();
        Arc::make_mut(&mut *guard).push(fragment);
    }

    pub fn extend<I: IntoIterator<Item = FrameFragment>>(&self, fragments: I) {
        let mut guard = self.fragments.lock();
        Arc::make_mut(&mut *guard).extend(fragments);
    }

    pub fn len(&self) -> usize {
        self.fragments.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Arc<Vec<FrameFragment>> {
        self.fragments.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_immutable() {
        let table = FragmentTable::from_fragments(vec![FrameFragment::Memory { length: 10 }]);
        let before = table.snapshot();

        table.push(FrameFragment::Memory { length: 20 });

        assert_eq!(before.len(), 1);
        assert_eq!(table.snapshot().len(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_fragment_accessors() {
        let file = FrameFragment::File {
            offset: 100,
            length: 8,
        };
        assert_eq!(file.length(), 8);
        assert_eq!(file.storage_kind(), StorageKind::File);
        assert_eq!(
            FrameFragment::Memory { length: 3 }.storage_kind(),
            StorageKind::Memory
        );
    }
}
