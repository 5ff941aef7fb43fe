//! Flat binary blobs consumed by the renderer.
//!
//! The baker writes four little-endian blobs:
//!
//! | File | Layout |
//! |---|---|
//! | `texturebuckets.blob` | `u32 split_count, u32 max_split_bytes`, then per slice `u32 format, i32 w, i32 h, i32 layers, i32 size, bytes` |
//! | `meshes.blob` | `u32 vertices, u32 indices, u16[], [f32; 3][], [u8; 4][], [f32; 4][]` |
//! | `instances.blob` | `u32 count, [f32; 16][]` |
//! | `drawables.blob` | `u32 count, u64[]` keys, `[u32; 7][]` draw calls |
//!
//! With the `lz4` feature every array payload is stored as `u32 length`
//! followed by an LZ4 block. The transcoder rewrites blobs for big-endian
//! targets and never compresses its output.

pub mod endian;
pub mod reader;
pub mod transcode;
pub mod writer;

pub use endian::Endian;
pub use reader::{
    DrawableBlob, MeshBlob, TextureBlob, read_drawable_blob, read_instance_blob, read_mesh_blob,
    read_texture_blob,
};
pub use transcode::{BlobLayout, PostStep, Segment, TranscodeReport, Word, transcode, transcode_file};
pub use writer::{
    TextureBlobStats, write_drawable_blob, write_instance_blob, write_mesh_blob, write_texture_blob,
};

use std::io::{Read, Write};

use crate::core::{Error, Result};

/// The four blobs, in the order the transcoder converts them
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlobKind {
    TextureBuckets,
    Meshes,
    Instances,
    Drawables,
}

impl BlobKind {
    pub const ALL: [BlobKind; 4] = [
        BlobKind::TextureBuckets,
        BlobKind::Meshes,
        BlobKind::Instances,
        BlobKind::Drawables,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            BlobKind::TextureBuckets => "texturebuckets.blob",
            BlobKind::Meshes => "meshes.blob",
            BlobKind::Instances => "instances.blob",
            BlobKind::Drawables => "drawables.blob",
        }
    }
}

/// Byte order and payload framing of a blob
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobEncoding {
    pub endian: Endian,
    /// Array payloads are LZ4 blocks with a length prefix
    pub compressed: bool,
}

impl BlobEncoding {
    /// What the baker writes in this build
    pub const fn baked() -> Self {
        Self {
            endian: Endian::Little,
            compressed: cfg!(feature = "lz4"),
        }
    }

    /// What the transcoder writes
    pub const fn transcoded(endian: Endian) -> Self {
        Self {
            endian,
            compressed: false,
        }
    }
}

/// Settings of one transcoding run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// Byte order of the input blobs
    pub source: Endian,
    /// Byte order of the output blobs
    pub target: Endian,
    /// Input array payloads are LZ4 compressed
    pub compressed_input: bool,
    /// Convert instance matrices between column- and row-major
    pub transpose_matrices: bool,
    /// Rewrite RGB texture splits as RGBA
    pub expand_rgb: bool,
}

impl TranscodeOptions {
    pub fn source_encoding(&self) -> BlobEncoding {
        BlobEncoding {
            endian: self.source,
            compressed: self.compressed_input,
        }
    }

    pub fn target_encoding(&self) -> BlobEncoding {
        BlobEncoding::transcoded(self.target)
    }
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        let baked = BlobEncoding::baked();
        Self {
            source: baked.endian,
            target: Endian::Big,
            compressed_input: baked.compressed,
            transpose_matrices: true,
            expand_rgb: true,
        }
    }
}

/// Write one array payload
pub(crate) fn write_payload<W: Write + ?Sized>(w: &mut W, bytes: &[u8], encoding: BlobEncoding) -> Result<()> {
    if encoding.compressed {
        return write_compressed(w, bytes, encoding.endian);
    }
    w.write_all(bytes)?;
    Ok(())
}

/// Read one array payload of `len` uncompressed bytes
pub(crate) fn read_payload<R: Read + ?Sized>(r: &mut R, len: usize, encoding: BlobEncoding) -> Result<Vec<u8>> {
    if encoding.compressed {
        let stored = encoding.endian.read_u32(r)? as usize;
        let block = read_exact_vec(r, stored)?;
        return decompress(&block, len);
    }
    read_exact_vec(r, len)
}

fn read_exact_vec<R: Read + ?Sized>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    // Grow with the data instead of trusting a length read from the file
    let mut buf = Vec::new();
    r.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(Error::Blob(format!(
            "truncated payload: expected {} bytes, got {}",
            len,
            buf.len()
        )));
    }
    Ok(buf)
}

#[cfg(feature = "lz4")]
fn write_compressed<W: Write + ?Sized>(w: &mut W, bytes: &[u8], endian: Endian) -> Result<()> {
    let block = lz4_flex::compress(bytes);
    let len = u32::try_from(block.len())
        .map_err(|_| Error::Blob(format!("compressed payload of {} bytes is too large", block.len())))?;
    endian.write_u32(w, len)?;
    w.write_all(&block)?;
    Ok(())
}

#[cfg(feature = "lz4")]
fn decompress(block: &[u8], len: usize) -> Result<Vec<u8>> {
    let data = lz4_flex::decompress(block, len)
        .map_err(|e| Error::Blob(format!("LZ4 decompression failed: {}", e)))?;
    if data.len() != len {
        return Err(Error::Blob(format!(
            "payload decompressed to {} bytes, expected {}",
            data.len(),
            len
        )));
    }
    Ok(data)
}

#[cfg(not(feature = "lz4"))]
fn write_compressed<W: Write + ?Sized>(_w: &mut W, _bytes: &[u8], _endian: Endian) -> Result<()> {
    Err(Error::Blob("compressed blobs need the `lz4` feature".to_string()))
}

#[cfg(not(feature = "lz4"))]
fn decompress(_block: &[u8], _len: usize) -> Result<Vec<u8>> {
    Err(Error::Blob("compressed blobs need the `lz4` feature".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_payload() {
        let encoding = BlobEncoding::transcoded(Endian::Big);
        let mut out = Vec::new();
        write_payload(&mut out, &[1, 2, 3], encoding).expect("write");
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(read_payload(&mut out.as_slice(), 3, encoding).expect("read"), vec![1, 2, 3]);
    }

    #[test]
    fn test_truncated_payload() {
        let encoding = BlobEncoding::transcoded(Endian::Little);
        let err = read_payload(&mut [1u8, 2].as_slice(), 4, encoding).expect_err("short read");
        assert!(matches!(err, Error::Blob(_)));
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn test_compressed_payload() {
        let encoding = BlobEncoding { endian: Endian::Little, compressed: true };
        let data = vec![7u8; 4096];
        let mut out = Vec::new();
        write_payload(&mut out, &data, encoding).expect("write");
        assert!(out.len() < data.len());
        assert_eq!(read_payload(&mut out.as_slice(), data.len(), encoding).expect("read"), data);
    }

    #[cfg(not(feature = "lz4"))]
    #[test]
    fn test_compressed_needs_feature() {
        let encoding = BlobEncoding { endian: Endian::Little, compressed: true };
        assert!(write_payload(&mut Vec::new(), &[0], encoding).is_err());
    }

    #[test]
    fn test_kind_order() {
        let names: Vec<&str> = BlobKind::ALL.iter().map(|k| k.file_name()).collect();
        assert_eq!(names, vec!["texturebuckets.blob", "meshes.blob", "instances.blob", "drawables.blob"]);
    }
}
