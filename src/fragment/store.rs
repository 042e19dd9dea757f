use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;

use super::StorageKind;
use crate::error::{BridgeError, Result};
use crate::segment::StreamSegmentRange;

/// The stream a container parser read its fragments from.
///
/// Each recognized variant has a resolution adapter. Any other reader is wrapped as
/// `Opaque` and cannot back a store.
pub enum SourceStream {
    File(File),
    Cursor(Cursor<Vec<u8>>),
    Buffer(Vec<u8>),
    Bytes(Bytes),
    Opaque(Box<dyn Read + Send>),
}

impl SourceStream {
    pub fn opaque<R: Read + Send + 'static>(reader: R) -> Self {
        Self::Opaque(Box::new(reader))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Cursor(_) => "cursor",
            Self::Buffer(_) => "buffer",
            Self::Bytes(_) => "bytes",
            Self::Opaque(_) => "opaque reader",
        }
    }
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SourceStream").field(&self.kind_name()).finish()
    }
}

impl From<File> for SourceStream {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}

impl From<Cursor<Vec<u8>>> for SourceStream {
    fn from(cursor: Cursor<Vec<u8>>) -> Self {
        Self::Cursor(cursor)
    }
}

impl From<Vec<u8>> for SourceStream {
    fn from(buffer: Vec<u8>) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<Bytes> for SourceStream {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "fragment store closed")
}

/// Fragments at absolute offsets of one random-access file.
#[derive(Debug)]
pub struct FileStore {
    file: RwLock<Option<Arc<File>>>,
}

impl FileStore {
    pub fn new(file: File) -> Self {
        Self {
            file: RwLock::new(Some(Arc::new(file))),
        }
    }

    /// The lock is held only while the handle is cloned, never across a read.
    fn handle(&self) -> io::Result<Arc<File>> {
        self.file.read().clone().ok_or_else(closed)
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.handle()?.metadata()?.len())
    }

    /// Positioned read: no shared cursor is moved, so frames can be read concurrently.
    pub fn read_exact_at(&self, buf: &mut [u8], position: u64) -> Result<()> {
        read_exact_at(&*self.handle()?, buf, position)?;
        Ok(())
    }

    fn close(&self) {
        self.file.write().take();
    }
}

/// Fragments inside one contiguous buffer.
#[derive(Debug)]
pub struct MemoryStore {
    buffer: RwLock<Option<Bytes>>,
}

impl MemoryStore {
    pub fn new(buffer: Bytes) -> Self {
        Self {
            buffer: RwLock::new(Some(buffer)),
        }
    }

    fn buffer(&self) -> io::Result<Bytes> {
        self.buffer.read().clone().ok_or_else(closed)
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.buffer()?.len() as u64)
    }

    /// Zero-copy view of `length` bytes at `position`.
    pub fn slice(&self, position: u64, length: u64) -> Result<Bytes> {
        let buffer = self.buffer()?;
        let end = position
            .checked_add(length)
            .filter(|&end| end <= buffer.len() as u64)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "range {position}+{length} past end of {} byte buffer",
                        buffer.len()
                    ),
                )
            })?;
        Ok(buffer.slice(position as usize..end as usize))
    }

    fn close(&self) {
        self.buffer.write().take();
    }
}

/// Raw byte access to fragment data, backed by a file or a memory buffer.
#[derive(Debug)]
pub enum FragmentStore {
    File(FileStore),
    Memory(MemoryStore),
}

impl FragmentStore {
    /// Picks the adapter for a concrete stream kind.
    ///
    /// Unrecognized readers yield `UnsupportedStreamKind`, so callers can fall back to
    /// reading the stream themselves.
    pub fn from_stream(stream: SourceStream) -> Result<Self> {
        match stream {
            SourceStream::File(file) => Ok(Self::File(FileStore::new(file))),
            SourceStream::Cursor(cursor) => Ok(Self::memory(cursor.into_inner())),
            SourceStream::Buffer(buffer) => Ok(Self::memory(buffer)),
            SourceStream::Bytes(bytes) => Ok(Self::memory(bytes)),
            SourceStream::Opaque(_) => {
                tracing::debug!("no resolution adapter for opaque reader");
                Err(BridgeError::UnsupportedStreamKind("opaque reader"))
            }
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::File(FileStore::new(File::open(path)?)))
    }

    pub fn memory(buffer: impl Into<Bytes>) -> Self {
        Self::Memory(MemoryStore::new(buffer.into()))
    }

    pub fn storage_kind(&self) -> StorageKind {
        match self {
            Self::File(_) => StorageKind::File,
            Self::Memory(_) => StorageKind::Memory,
        }
    }

    /// Current size of the backing file or buffer.
    pub fn len(&self) -> Result<u64> {
        match self {
            Self::File(store) => store.len(),
            Self::Memory(store) => store.len(),
        }
    }

    pub fn read_range(&self, position: u64, length: u64) -> Result<Bytes> {
        match self {
            Self::File(store) => {
                let mut buf = vec![0u8; to_usize(length)?];
                store.read_exact_at(&mut buf, position)?;
                Ok(Bytes::from(buf))
            }
            Self::Memory(store) => store.slice(position, length),
        }
    }

    /// Reads every segment of a resolved frame into one contiguous buffer.
    ///
    /// A single in-memory segment is returned without copying.
    pub fn read_segments(&self, range: &StreamSegmentRange) -> Result<Bytes> {
        if let ([segment], Self::Memory(store)) = (range.segments.as_slice(), self) {
            return store.slice(segment.position, segment.length);
        }

        let mut out = BytesMut::with_capacity(to_usize(range.total_length())?);
        for segment in &range.segments {
            match self {
                Self::File(store) => {
                    let start = out.len();
                    out.resize(start + to_usize(segment.length)?, 0);
                    store.read_exact_at(&mut out[start..], segment.position)?;
                }
                Self::Memory(store) => {
                    out.extend_from_slice(&store.slice(segment.position, segment.length)?);
                }
            }
        }
        Ok(out.freeze())
    }

    /// Drops the store's handle without waiting for reads in flight, which finish on
    /// their own reference. Reads issued afterwards fail with `NotConnected`.
    pub fn close(&self) {
        match self {
            Self::File(store) => store.close(),
            Self::Memory(store) => store.close(),
        }
    }
}

fn to_usize(length: u64) -> Result<usize> {
    usize::try_from(length)
        .map_err(|_| BridgeError::invalid_argument(format!("length {length} exceeds address space")))
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], position: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, position)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut position: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, position) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            Ok(n) => {
                buf = &mut buf[n..];
                position += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn read_exact_at(_file: &File, _buf: &mut [u8], _position: u64) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "positioned reads are not available on this platform",
    ))
}
