//! IMG archive reader.
//!
//! An archive is a pair of files: a directory (`.dir`) made of fixed
//! 32-byte entries and a payload (`.img`) addressed in 2048-byte sectors.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{Error, Result};

/// Size of one archive sector in bytes
pub const SECTOR_SIZE: u64 = 2048;

/// Size of one directory entry in bytes
pub const DIRECTORY_ENTRY_SIZE: usize = 32;

/// Texture dictionary shipped as a loose file next to the archive
pub const GENERIC_TXD: &str = "generic.txd";

const NAME_LEN: usize = 24;

/// One file record of the archive directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Offset in sectors
    pub offset: u32,
    /// Size in sectors
    pub size: u32,
    pub name: String,
}

impl DirectoryEntry {
    /// Decode one 32-byte entry; the name is NUL-terminated
    pub fn parse(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DIRECTORY_ENTRY_SIZE {
            return Err(Error::Archive(format!("directory entry truncated to {} bytes", bytes.len())));
        }
        let offset = bytes.read_u32::<LittleEndian>()?;
        let size = bytes.read_u32::<LittleEndian>()?;
        let raw = &bytes[..NAME_LEN];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let name = String::from_utf8_lossy(&raw[..end]).into_owned();
        Ok(Self { offset, size, name })
    }

    /// Byte offset of the payload
    pub fn byte_offset(&self) -> u64 {
        self.offset as u64 * SECTOR_SIZE
    }

    /// Payload length in bytes, rounded up to whole sectors
    pub fn byte_len(&self) -> u64 {
        self.size as u64 * SECTOR_SIZE
    }
}

/// An opened IMG archive
#[derive(Debug)]
pub struct ImgArchive {
    entries: Vec<DirectoryEntry>,
    img: File,
    img_path: PathBuf,
}

impl ImgArchive {
    /// Open an archive from its directory and payload files
    pub fn open(dir_path: &Path, img_path: &Path) -> Result<Self> {
        let dir = std::fs::read(dir_path)?;
        let entries = parse_directory(&dir)?;
        let img = File::open(img_path)?;
        log::info!("Opened {} with {} entries", img_path.display(), entries.len());
        Ok(Self {
            entries,
            img,
            img_path: img_path.to_path_buf(),
        })
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Find an entry by exact name
    pub fn find(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Read a whole file into memory
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self.locate(name)?;
        self.img.seek(SeekFrom::Start(entry.byte_offset()))?;
        let mut data = vec![0u8; entry.byte_len() as usize];
        self.img.read_exact(&mut data)?;
        Ok(data)
    }

    /// Copy a file to `dest` sector by sector; returns the bytes written
    pub fn extract(&mut self, name: &str, dest: &Path) -> Result<u64> {
        let entry = self.locate(name)?;
        log::debug!("Extracting '{}' to '{}'", name, dest.display());

        self.img.seek(SeekFrom::Start(entry.byte_offset()))?;
        let mut out = File::create(dest)?;
        let mut sector = [0u8; SECTOR_SIZE as usize];
        for _ in 0..entry.size {
            self.img.read_exact(&mut sector)?;
            out.write_all(&sector)?;
        }
        Ok(entry.byte_len())
    }

    fn locate(&self, name: &str) -> Result<DirectoryEntry> {
        self.find(name).cloned().ok_or_else(|| {
            Error::Archive(format!("'{}' not found in {}", name, self.img_path.display()))
        })
    }
}

/// Decode a whole directory file; a trailing partial entry is ignored
pub fn parse_directory(bytes: &[u8]) -> Result<Vec<DirectoryEntry>> {
    bytes
        .chunks_exact(DIRECTORY_ENTRY_SIZE)
        .map(DirectoryEntry::parse)
        .collect()
}

/// Extract every named file into `dest_dir`.
///
/// `generic.txd` is copied from `generic_txd` instead of the archive. Names
/// missing from the archive are logged and skipped. Returns how many files
/// were written.
pub fn extract_all<'a>(
    archive: &mut ImgArchive,
    names: impl IntoIterator<Item = &'a String>,
    generic_txd: &Path,
    dest_dir: &Path,
) -> Result<usize> {
    std::fs::create_dir_all(dest_dir)?;
    let mut written = 0;
    for name in names {
        let dest = dest_dir.join(name);
        if name.eq_ignore_ascii_case(GENERIC_TXD) {
            std::fs::copy(generic_txd, &dest)?;
            written += 1;
            continue;
        }
        match archive.extract(name, &dest) {
            Ok(_) => written += 1,
            Err(Error::Archive(msg)) => log::error!("Failed to locate file: {}", msg),
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}
