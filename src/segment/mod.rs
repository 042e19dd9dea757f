//! Resolution of logical frames to physical byte ranges.

mod resolver;

pub use resolver::{FrameResolver, FrameTable};

use crate::PixelDescriptor;
use crate::error::{BridgeError, Result};
use crate::fragment::FrameFragment;

/// A physical byte range backing part of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub position: u64,
    pub length: u64,
}

impl Segment {
    pub fn end(&self) -> u64 {
        self.position + self.length
    }
}

/// Resolved byte ranges of one frame, in logical order. Built per call, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSegmentRange {
    pub frame: usize,
    pub segments: Vec<Segment>,
    pub descriptor: PixelDescriptor,
}

impl StreamSegmentRange {
    pub fn total_length(&self) -> u64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    pub fn positions(&self) -> Vec<u64> {
        self.segments.iter().map(|s| s.position).collect()
    }

    pub fn lengths(&self) -> Vec<u64> {
        self.segments.iter().map(|s| s.length).collect()
    }
}

/// One decodable frame: a span of the fragment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalFrame {
    pub index: usize,
    /// First fragment of the frame.
    pub first_fragment: usize,
    /// One past the last fragment, as declared by the container.
    pub end_fragment: usize,
    /// Total byte length, when the container declares it.
    pub declared_length: Option<u64>,
}

impl LogicalFrame {
    pub fn new(index: usize, first_fragment: usize, end_fragment: usize) -> Self {
        Self {
            index,
            first_fragment,
            end_fragment,
            declared_length: None,
        }
    }

    pub fn with_declared_length(mut self, length: u64) -> Self {
        self.declared_length = Some(length);
        self
    }
}

/// Maps a span of the fragment table to byte ranges.
///
/// Holds no mutable state. The running length of inline fragments is passed in and
/// returned, so resolutions of different frames never interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLocator {
    frame: usize,
    extend_to_end: bool,
}

impl SegmentLocator {
    pub fn new(frame: usize) -> Self {
        Self {
            frame,
            extend_to_end: false,
        }
    }

    /// Consume every fragment after `cursor`, whatever end index the caller declares.
    ///
    /// Only for the final frame of a single-frame stream. This keeps trailing fragments
    /// that some producers leave out of the frame span; it is a compatibility shim and
    /// not a contract of the fragment table.
    pub fn extend_to_end(mut self, extend: bool) -> Self {
        self.extend_to_end = extend;
        self
    }

    /// Returns the byte ranges of `fragments[cursor..end]` and the running length of
    /// inline fragments after them.
    pub fn resolve(
        &self,
        fragments: &[FrameFragment],
        cursor: usize,
        end: usize,
        prior_cumulative_length: u64,
    ) -> Result<(Vec<Segment>, u64)> {
        let mut end = end;
        if self.extend_to_end && end < fragments.len() {
            tracing::warn!(
                frame = self.frame,
                declared_end = end,
                fragments = fragments.len(),
                "extending final frame over trailing fragments"
            );
            end = fragments.len();
        }

        if cursor >= end || end > fragments.len() {
            return Err(BridgeError::corrupt(
                self.frame,
                format!(
                    "fragment span {cursor}..{end} outside table of {} entries",
                    fragments.len()
                ),
            ));
        }

        let span = &fragments[cursor..end];
        let kind = span[0].storage_kind();
        let mut cumulative = prior_cumulative_length;
        let mut segments: Vec<Segment> = Vec::with_capacity(span.len());

        for (i, fragment) in span.iter().enumerate() {
            if fragment.storage_kind() != kind {
                return Err(BridgeError::corrupt(
                    self.frame,
                    format!("fragment {} mixes file and memory storage", cursor + i),
                ));
            }

            let segment = match *fragment {
                FrameFragment::File { offset, length } => Segment {
                    position: offset,
                    length,
                },
                FrameFragment::Memory { length } => Segment {
                    position: cumulative,
                    length,
                },
            };
            if segment.position.checked_add(segment.length).is_none() {
                return Err(BridgeError::corrupt(
                    self.frame,
                    format!("fragment {} overflows the address space", cursor + i),
                ));
            }
            if let Some(previous) = segments.last() {
                if segment.position < previous.end() {
                    return Err(BridgeError::corrupt(
                        self.frame,
                        format!(
                            "fragment {} at {} overlaps or precedes the range ending at {}",
                            cursor + i,
                            segment.position,
                            previous.end()
                        ),
                    ));
                }
            }

            cumulative = cumulative.checked_add(fragment.length()).ok_or_else(|| {
                BridgeError::corrupt(self.frame, "cumulative fragment length overflows")
            })?;
            segments.push(segment);
        }

        Ok((segments, cumulative))
    }

    /// Fails when any segment reaches past `store_len`.
    pub fn check_bounds(&self, segments: &[Segment], store_len: u64) -> Result<()> {
        match segments.iter().find(|s| s.end() > store_len) {
            Some(s) => Err(BridgeError::corrupt(
                self.frame,
                format!(
                    "range {}+{} past end of {store_len} byte store",
                    s.position, s.length
                ),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(offset: u64, length: u64) -> FrameFragment {
        FrameFragment::File { offset, length }
    }

    fn mem(length: u64) -> FrameFragment {
        FrameFragment::Memory { length }
    }

    #[test]
    fn test_file_positions_are_absolute() {
        let table = [file(100, 10), file(120, 5), file(300, 7)];
        let (segments, cumulative) = SegmentLocator::new(0).resolve(&table, 0, 3, 0).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment { position: 100, length: 10 },
                Segment { position: 120, length: 5 },
                Segment { position: 300, length: 7 },
            ]
        );
        assert_eq!(cumulative, 22);
    }

    #[test]
    fn test_memory_positions_are_cumulative() {
        let table = [mem(4), mem(6), mem(8), mem(2)];
        let locator = SegmentLocator::new(1);

        let (first, after_first) = locator.resolve(&table, 0, 2, 0).unwrap();
        assert_eq!(first[1], Segment { position: 4, length: 6 });
        assert_eq!(after_first, 10);

        let (second, after_second) = locator.resolve(&table, 2, 4, after_first).unwrap();
        assert_eq!(
            second,
            vec![
                Segment { position: 10, length: 8 },
                Segment { position: 18, length: 2 },
            ]
        );
        assert_eq!(after_second, 20);
    }

    #[test]
    fn test_extension_consumes_trailing_fragments() {
        let table = [mem(3), mem(3), mem(3)];
        let (segments, _) = SegmentLocator::new(0)
            .extend_to_end(true)
            .resolve(&table, 0, 1, 0)
            .unwrap();
        assert_eq!(segments.len(), 3);

        let (segments, _) = SegmentLocator::new(0).resolve(&table, 0, 1, 0).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_overlapping_file_fragments() {
        let table = [file(100, 10), file(105, 10)];
        let err = SegmentLocator::new(2).resolve(&table, 0, 2, 0).unwrap_err();
        assert!(matches!(err, BridgeError::CorruptFragmentTable { frame: 2, .. }));
    }

    #[test]
    fn test_span_outside_table() {
        let table = [mem(1)];
        assert!(SegmentLocator::new(0).resolve(&table, 0, 2, 0).is_err());
        assert!(SegmentLocator::new(0).resolve(&table, 1, 1, 0).is_err());
    }

    #[test]
    fn test_mixed_storage_is_corrupt() {
        let table = [file(0, 1), mem(1)];
        assert!(SegmentLocator::new(0).resolve(&table, 0, 2, 0).is_err());
    }

    #[test]
    fn test_check_bounds() {
        let locator = SegmentLocator::new(0);
        let segments = [Segment { position: 10, length: 10 }];
        assert!(locator.check_bounds(&segments, 20).is_ok());
        assert!(matches!(
            locator.check_bounds(&segments, 19),
            Err(BridgeError::CorruptFragmentTable { .. })
        ));
    }
}
