//! A `File`: one document's buffer, undo graph and marks bound to an
//! optional path on disk.
//!
//! Grounded on the document layer's load/save shape (numeric id,
//! `display_name`, atomic write via a sibling temp file then rename) but
//! rebuilt on the piece-table stack: the buffer is a `PieceTable` fed by
//! `buffer::slab::load`, and "dirty" is `History::modified` rather than a
//! hand-rolled revision counter.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::buffer::slab::{self, LoadMethod};
use crate::buffer::PieceTable;
use crate::error::EditorError;
use crate::history::History;
use crate::marks::Marks;

pub type FileId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineConvention {
    Lf,
    CrLf,
}

impl NewlineConvention {
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        if let Some(pos) = bytes.iter().position(|b| *b == b'\n') {
            if pos > 0 && bytes[pos - 1] == b'\r' {
                return Self::CrLf;
            }
        }
        Self::Lf
    }

    #[must_use]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMethod {
    /// Write to a sibling temp file, then rename over the target.
    Atomic,
    /// Overwrite the target inode directly; any `MmapOriginal` slab must
    /// be privatized first since its bytes are about to be replaced.
    InPlace,
}

pub struct FileSettings {
    pub expandtab: bool,
    pub tabwidth: usize,
    pub load_method: LoadMethod,
    pub save_method: SaveMethod,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self { expandtab: false, tabwidth: 8, load_method: LoadMethod::Auto, save_method: SaveMethod::Atomic }
    }
}

pub struct File {
    pub id: FileId,
    pub table: PieceTable,
    pub history: History,
    pub marks: Marks,
    pub newline: NewlineConvention,
    pub settings: FileSettings,
    path: Option<PathBuf>,
}

impl File {
    #[must_use]
    pub fn scratch(id: FileId) -> Self {
        Self {
            id,
            table: PieceTable::new(),
            history: History::new(),
            marks: Marks::new(),
            newline: NewlineConvention::Lf,
            settings: FileSettings::default(),
            path: None,
        }
    }

    pub fn open(id: FileId, path: impl AsRef<Path>, load_method: LoadMethod) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let slab = slab::load(path, load_method)?;
        let newline = NewlineConvention::detect(slab.data());
        let table = PieceTable::from_original(slab);
        Ok(Self {
            id,
            table,
            history: History::new(),
            marks: Marks::new(),
            newline,
            settings: FileSettings { load_method, ..FileSettings::default() },
            path: Some(path.to_path_buf()),
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.path.as_ref().and_then(|p| p.file_name()).and_then(|n| n.to_str()).unwrap_or("[No Name]")
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.history.modified()
    }

    pub fn set_path(&mut self, path: impl AsRef<Path>) {
        self.path = Some(path.as_ref().to_path_buf());
    }

    /// Write the document's current bytes to `path` (or the document's own
    /// path if `None`), per `settings.save_method`.
    pub fn save(&mut self, path: Option<&Path>) -> Result<(), EditorError> {
        let target = path.or(self.path.as_deref()).ok_or_else(|| EditorError::other("NO_PATH", "no file path to save to"))?;
        let bytes = self.table.to_bytes();
        match self.settings.save_method {
            SaveMethod::Atomic => write_atomic(target, &bytes)?,
            SaveMethod::InPlace => write_inplace(target, &bytes)?,
        }
        if path.is_some() {
            self.path = Some(target.to_path_buf());
        }
        self.history.mark_saved();
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EditorError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
    let temp_path = parent.join(format!(".{file_name}.tmp"));
    {
        let mut temp = fs::File::create(&temp_path)?;
        temp.write_all(bytes)?;
        temp.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn write_inplace(path: &Path, bytes: &[u8]) -> Result<(), EditorError> {
    let mut file = fs::OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_file_has_no_path() {
        let f = File::scratch(1);
        assert_eq!(f.path(), None);
        assert_eq!(f.display_name(), "[No Name]");
    }

    #[test]
    fn detects_crlf_newline_convention() {
        assert_eq!(NewlineConvention::detect(b"a\r\nb"), NewlineConvention::CrLf);
        assert_eq!(NewlineConvention::detect(b"a\nb"), NewlineConvention::Lf);
    }

    #[test]
    fn save_and_reopen_round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut f = File::scratch(1);
        f.table.insert(0, b"hello world").unwrap();
        f.save(Some(&path)).unwrap();
        assert!(!f.is_modified());

        let reopened = File::open(2, &path, LoadMethod::Auto).unwrap();
        assert_eq!(reopened.table.to_bytes(), b"hello world");
    }

    #[test]
    fn in_place_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inplace.txt");
        std::fs::write(&path, b"old content").unwrap();
        let mut f = File::open(1, &path, LoadMethod::Read).unwrap();
        f.settings.save_method = SaveMethod::InPlace;
        f.table.insert(0, b"new ").unwrap();
        f.save(None).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new old content");
    }
}
