//! Buffer / slab allocator
//!
//! A slab is an append-only byte region. `Heap` slabs back inserted text;
//! `MmapOriginal`/`MmapPrivate` back the bytes a file was loaded with. Once
//! a byte address is published into a `Piece` it stays valid for the life
//! of the `Document` — slabs are never truncated or moved, only grown
//! (`Heap`) or replaced wholesale (`MmapOriginal` -> `MmapPrivate` on
//! in-place save, see `document::save`).

use crate::error::{EditorError, IoErrorKind};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Below this size, `Auto` loading reads the whole file into a `Heap` slab
/// instead of mapping it.
pub const MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Minimum size of a freshly allocated `Heap` slab.
pub const SLAB_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlabKind {
    MmapOriginal,
    MmapPrivate,
    Heap,
}

/// How a file should be loaded (mirrored by `:set loadmethod`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMethod {
    Auto,
    Read,
    Mmap,
}

#[derive(Debug)]
enum Backing {
    Mmap(Mmap),
    Heap(Vec<u8>),
}

/// An append-only byte region backing one or more pieces.
#[derive(Debug)]
pub struct Slab {
    backing: Backing,
    kind: SlabKind,
    /// Logical length currently in use (<=`capacity` for `Heap`, ==`capacity` for mmap)
    len: usize,
}

impl Slab {
    #[must_use]
    pub fn new_heap(min_bytes: usize) -> Self {
        let capacity = min_bytes.max(SLAB_SIZE);
        Self {
            backing: Backing::Heap(Vec::with_capacity(capacity)),
            kind: SlabKind::Heap,
            len: 0,
        }
    }

    fn from_mmap(mmap: Mmap, kind: SlabKind) -> Self {
        let len = mmap.len();
        Self {
            backing: Backing::Mmap(mmap),
            kind,
            len,
        }
    }

    fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            backing: Backing::Heap(bytes),
            kind: SlabKind::MmapOriginal,
            len,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SlabKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        match &self.backing {
            Backing::Mmap(m) => m.len(),
            Backing::Heap(v) => v.capacity(),
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        match &self.backing {
            Backing::Mmap(m) => &m[..self.len],
            Backing::Heap(v) => &v[..self.len],
        }
    }

    /// Append bytes to the tail of a `Heap` slab, returning the offset they
    /// were written at. Requires remaining capacity.
    pub fn append(&mut self, bytes: &[u8]) -> Result<usize, EditorError> {
        let Backing::Heap(v) = &mut self.backing else {
            return Err(EditorError::other("SLAB_READONLY", "cannot append to an mmap slab"));
        };
        if v.len() + bytes.len() > v.capacity() {
            return Err(EditorError::OutOfMemory);
        }
        let offset = v.len();
        v.extend_from_slice(bytes);
        self.len = v.len();
        Ok(offset)
    }

    /// Extend the most-recently-appended run in place by `bytes`, used by
    /// the piece table's CacheHint fast path. Only valid when
    /// `at == self.len`.
    pub fn extend_tail(&mut self, at: usize, bytes: &[u8]) -> Result<(), EditorError> {
        if at != self.len {
            return Err(EditorError::other("SLAB_NOT_TAIL", "extend_tail called off the end"));
        }
        self.append(bytes).map(|_| ())
    }

    /// Shrink the logical length by `n` bytes from the tail, used when an
    /// in-Action delete collapses an insert made earlier in the same
    /// Action's CacheHint piece.
    pub fn truncate_tail(&mut self, n: usize) {
        self.len = self.len.saturating_sub(n);
        if let Backing::Heap(v) = &mut self.backing {
            v.truncate(self.len);
        }
    }

    pub fn remaining(&self) -> usize {
        self.capacity().saturating_sub(self.len)
    }
}

/// Load a file's bytes into a `Slab`, choosing `Read` vs `Mmap` per `method`.
pub fn load(path: impl AsRef<Path>, method: LoadMethod) -> Result<Slab, EditorError> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).map_err(|e| {
        EditorError::io(IoErrorKind::from(e), path.display().to_string())
    })?;
    if meta.is_dir() {
        return Err(EditorError::io(IoErrorKind::IsDir, path.display().to_string()));
    }
    if !meta.is_file() {
        return Err(EditorError::io(IoErrorKind::NotRegular, path.display().to_string()));
    }

    let use_mmap = match method {
        LoadMethod::Mmap => true,
        LoadMethod::Read => false,
        LoadMethod::Auto => meta.len() >= MMAP_THRESHOLD,
    };

    let file = File::open(path).map_err(|e| EditorError::io(IoErrorKind::from(e), path.display().to_string()))?;

    if use_mmap && meta.len() > 0 {
        // SAFETY: the file is not modified by this process while mapped;
        // document::save remaps to a private copy before any in-place write.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| EditorError::io(IoErrorKind::from(e), path.display().to_string()))?;
        Ok(Slab::from_mmap(mmap, SlabKind::MmapOriginal))
    } else {
        let mut file = file;
        let mut bytes = Vec::with_capacity(meta.len() as usize);
        file.read_to_end(&mut bytes)
            .map_err(|e| EditorError::io(IoErrorKind::from(e), path.display().to_string()))?;
        Ok(Slab::from_bytes(bytes))
    }
}

/// Make a private heap copy of a mapped slab's bytes, used before an
/// in-place save remaps the original mapping.
#[must_use]
pub fn privatize(slab: &Slab) -> Slab {
    let mut copy = Slab::from_bytes(slab.data().to_vec());
    copy.kind = SlabKind::MmapPrivate;
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn heap_append_and_extend() {
        let mut slab = Slab::new_heap(16);
        let off = slab.append(b"hello").unwrap();
        assert_eq!(off, 0);
        slab.extend_tail(5, b" world").unwrap();
        assert_eq!(slab.data(), b"hello world");
    }

    #[test]
    fn append_past_capacity_fails() {
        let mut slab = Slab {
            backing: Backing::Heap(Vec::with_capacity(4)),
            kind: SlabKind::Heap,
            len: 0,
        };
        assert!(slab.append(b"toolong").is_err());
    }

    #[test]
    fn load_small_file_reads_into_heap() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"abc").unwrap();
        let slab = load(tmp.path(), LoadMethod::Auto).unwrap();
        assert_eq!(slab.data(), b"abc");
        assert_eq!(slab.kind(), SlabKind::MmapOriginal);
    }

    #[test]
    fn load_forced_mmap() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"mapped bytes").unwrap();
        let slab = load(tmp.path(), LoadMethod::Mmap).unwrap();
        assert_eq!(slab.data(), b"mapped bytes");
    }

    #[test]
    fn load_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), LoadMethod::Auto).unwrap_err();
        assert!(matches!(err, EditorError::Io { kind: IoErrorKind::IsDir, .. }));
    }
}
