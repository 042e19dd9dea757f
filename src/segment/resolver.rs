use std::sync::Arc;

use bytes::Bytes;

use super::{LogicalFrame, SegmentLocator, StreamSegmentRange};
use crate::PixelDescriptor;
use crate::error::{BridgeError, Result};
use crate::fragment::{FragmentStore, FragmentTable, FrameFragment};

/// Frame index to fragment span mapping, as declared by the container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTable {
    frames: Vec<LogicalFrame>,
}

impl FrameTable {
    pub fn new(frames: Vec<LogicalFrame>) -> Self {
        Self { frames }
    }

    /// Frame `i` is exactly fragment `i`.
    pub fn one_per_fragment(frame_count: usize) -> Self {
        Self::new((0..frame_count).map(|i| LogicalFrame::new(i, i, i + 1)).collect())
    }

    /// One frame spanning fragments `0..fragment_count`.
    pub fn single(fragment_count: usize) -> Self {
        Self::new(vec![LogicalFrame::new(0, 0, fragment_count)])
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&LogicalFrame> {
        self.frames.get(index).ok_or(BridgeError::InvalidFrameIndex {
            index,
            count: self.frames.len(),
        })
    }
}

/// Resolves and reads frames by index over a shared fragment table and its store.
///
/// `FrameResolver` is `Sync`: frames can be resolved and read from several threads
/// while a producer keeps appending to the table.
#[derive(Debug)]
pub struct FrameResolver {
    table: Arc<FragmentTable>,
    store: FragmentStore,
    frames: FrameTable,
    descriptor: PixelDescriptor,
}

impl FrameResolver {
    pub fn new(
        table: Arc<FragmentTable>,
        store: FragmentStore,
        frames: FrameTable,
        descriptor: PixelDescriptor,
    ) -> Self {
        Self {
            table,
            store,
            frames,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &PixelDescriptor {
        &self.descriptor
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn store(&self) -> &FragmentStore {
        &self.store
    }

    pub fn table(&self) -> &Arc<FragmentTable> {
        &self.table
    }

    /// Byte ranges of frame `index`, in logical order.
    pub fn resolve(&self, index: usize) -> Result<StreamSegmentRange> {
        let frame = *self.frames.get(index)?;
        let fragments = self.table.snapshot();

        if let Some(fragment) = fragments.get(frame.first_fragment) {
            if fragment.storage_kind() != self.store.storage_kind() {
                return Err(BridgeError::corrupt(
                    index,
                    format!(
                        "{:?} fragment cannot be read from a {:?} store",
                        fragment.storage_kind(),
                        self.store.storage_kind()
                    ),
                ));
            }
        }

        let prior = prior_length(&fragments, frame.first_fragment);
        let locator = SegmentLocator::new(index)
            .extend_to_end(self.frames.len() == 1 && index == 0);
        let (segments, _) =
            locator.resolve(&fragments, frame.first_fragment, frame.end_fragment, prior)?;

        let range = StreamSegmentRange {
            frame: index,
            segments,
            descriptor: self.descriptor,
        };

        if let Some(declared) = frame.declared_length {
            let total = range.total_length();
            if total != declared {
                return Err(BridgeError::corrupt(
                    index,
                    format!("fragments sum to {total} bytes, frame declares {declared}"),
                ));
            }
        }
        locator.check_bounds(&range.segments, self.store.len()?)?;

        tracing::debug!(
            frame = index,
            ranges = range.segments.len(),
            length = range.total_length(),
            "resolved frame"
        );
        Ok(range)
    }

    /// Contiguous bytes of frame `index`.
    pub fn read_frame(&self, index: usize) -> Result<Bytes> {
        let range = self.resolve(index)?;
        self.store.read_segments(&range)
    }

    pub fn close(&self) {
        self.store.close();
    }
}

fn prior_length(fragments: &[FrameFragment], first: usize) -> u64 {
    fragments
        .iter()
        .take(first)
        .map(FrameFragment::length)
        .fold(0u64, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn memory_resolver(lengths: &[u64], frames: FrameTable) -> FrameResolver {
        let total: u64 = lengths.iter().sum();
        let buffer: Vec<u8> = (0..total).map(|i| (i % 251) as u8).collect();
        let table = FragmentTable::from_fragments(
            lengths
                .iter()
                .map(|&length| FrameFragment::Memory { length })
                .collect(),
        );
        FrameResolver::new(
            Arc::new(table),
            FragmentStore::memory(buffer),
            frames,
            PixelDescriptor::new(4, 4, 8, 1),
        )
    }

    #[test]
    fn test_resolve_memory_frames() {
        let resolver = memory_resolver(&[16, 16, 16], FrameTable::one_per_fragment(3));
        let range = resolver.resolve(2).unwrap();
        assert_eq!(range.positions(), vec![32]);
        assert_eq!(range.lengths(), vec![16]);

        let bytes = resolver.read_frame(1).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 16);
    }

    #[test]
    fn test_invalid_frame_index() {
        let resolver = memory_resolver(&[16], FrameTable::one_per_fragment(1));
        let err = resolver.resolve(1).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidFrameIndex { index: 1, count: 1 }));
    }

    #[test]
    fn test_declared_length_mismatch() {
        let frames = FrameTable::new(vec![LogicalFrame::new(0, 0, 2).with_declared_length(30)]);
        let resolver = memory_resolver(&[16, 16], frames);
        let err = resolver.resolve(0).unwrap_err();
        assert!(matches!(err, BridgeError::CorruptFragmentTable { frame: 0, .. }));
    }

    #[test]
    fn test_single_frame_extends_over_appended_fragments() {
        let resolver = memory_resolver(&[8, 8], FrameTable::single(1));
        assert_eq!(resolver.resolve(0).unwrap().total_length(), 16);
    }

    #[test]
    fn test_multi_frame_does_not_extend() {
        let resolver = memory_resolver(&[8, 8, 8], FrameTable::one_per_fragment(2));
        assert_eq!(resolver.resolve(1).unwrap().lengths(), vec![8]);
    }

    #[test]
    fn test_range_past_store_end() {
        let table = FragmentTable::from_fragments(vec![FrameFragment::Memory { length: 64 }]);
        let resolver = FrameResolver::new(
            Arc::new(table),
            FragmentStore::memory(vec![0u8; 32]),
            FrameTable::single(1),
            PixelDescriptor::new(8, 8, 8, 1),
        );
        assert!(matches!(
            resolver.resolve(0),
            Err(BridgeError::CorruptFragmentTable { .. })
        ));
    }

    #[test]
    fn test_storage_kind_mismatch() {
        let table = FragmentTable::from_fragments(vec![FrameFragment::File {
            offset: 0,
            length: 4,
        }]);
        let resolver = FrameResolver::new(
            Arc::new(table),
            FragmentStore::memory(vec![0u8; 4]),
            FrameTable::single(1),
            PixelDescriptor::new(2, 2, 8, 1),
        );
        assert!(resolver.resolve(0).is_err());
    }

    #[test]
    fn test_concurrent_resolution_while_appending() {
        let resolver = memory_resolver(&[10, 20, 30, 40], FrameTable::one_per_fragment(4));

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for index in 0..4 {
                        let range = resolver.resolve(index).unwrap();
                        let expected_position: u64 = [0, 10, 30, 60][index];
                        assert_eq!(range.positions(), vec![expected_position]);
                        assert_eq!(resolver.read_frame(index).unwrap().len() as u64, range.total_length());
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..16 {
                    resolver.table().push(FrameFragment::Memory { length: 1 });
                }
            });
        });

        assert_eq!(resolver.table().len(), 20);
    }

    #[test]
    fn test_closed_resolver_fails_reads() {
        let resolver = memory_resolver(&[4], FrameTable::single(1));
        resolver.close();
        assert!(matches!(resolver.read_frame(0), Err(BridgeError::Io(_))));
    }
}
