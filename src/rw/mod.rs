//! RenderWare binary stream decoding.
//!
//! Every RenderWare file is a tree of chunks. A chunk starts with a 12-byte
//! header (`type`, `size`, `library id`) followed by `size` bytes of payload,
//! which is either raw data (`STRUCT`) or further chunks.

pub mod clump;
pub mod txd;
pub mod convert;

pub use clump::{Clump, Geometry, GeometryFlags, Material, Split, Triangle, read_clumps};
pub use txd::{NativeTexture, Platform, TextureDictionary, read_texture_dictionary};
pub use convert::normalize;

use byteorder::{ByteOrder, LittleEndian};

use crate::core::{Error, Result};

/// Chunk type ids
pub mod chunk {
    pub const STRUCT: u32 = 0x01;
    pub const STRING: u32 = 0x02;
    pub const EXTENSION: u32 = 0x03;
    pub const TEXTURE: u32 = 0x06;
    pub const MATERIAL: u32 = 0x07;
    pub const MATERIAL_LIST: u32 = 0x08;
    pub const FRAME_LIST: u32 = 0x0E;
    pub const GEOMETRY: u32 = 0x0F;
    pub const CLUMP: u32 = 0x10;
    pub const ATOMIC: u32 = 0x14;
    pub const TEXTURE_NATIVE: u32 = 0x15;
    pub const TEXTURE_DICTIONARY: u32 = 0x16;
    pub const GEOMETRY_LIST: u32 = 0x1A;
    pub const BIN_MESH: u32 = 0x50E;
}

/// Size of a chunk header in bytes
pub const HEADER_SIZE: usize = 12;

/// A decoded chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_type: u32,
    pub size: u32,
    pub library_id: u32,
}

impl ChunkHeader {
    /// Library version, e.g. `0x34003` for Vice City PC
    pub fn version(&self) -> u32 {
        if self.library_id & 0xFFFF_0000 != 0 {
            (((self.library_id >> 14) & 0x3FF00) + 0x30000) | ((self.library_id >> 16) & 0x3F)
        } else {
            self.library_id << 8
        }
    }
}

/// Bounds-checked little-endian cursor over a chunk stream
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::RenderWare(format!(
                "unexpected end of stream: need {} bytes at offset {}, {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Read `count` consecutive floats
    pub fn f32_vec(&mut self, count: usize) -> Result<Vec<f32>> {
        let bytes = self.take(count * 4)?;
        let mut out = vec![0.0; count];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    /// Fixed-size NUL-padded string field
    pub fn fixed_str(&mut self, len: usize) -> Result<String> {
        Ok(c_string(self.take(len)?))
    }

    pub fn header(&mut self) -> Result<ChunkHeader> {
        Ok(ChunkHeader {
            chunk_type: self.u32()?,
            size: self.u32()?,
            library_id: self.u32()?,
        })
    }

    /// Read a header and require its type to be `chunk_type`
    pub fn expect_chunk(&mut self, chunk_type: u32) -> Result<ChunkHeader> {
        let at = self.pos;
        let header = self.header()?;
        if header.chunk_type != chunk_type {
            return Err(Error::RenderWare(format!(
                "expected chunk 0x{:X} at offset {}, found 0x{:X}",
                chunk_type, at, header.chunk_type
            )));
        }
        Ok(header)
    }

    /// Split off the payload of a chunk whose header was just read
    pub fn body(&mut self, header: &ChunkHeader) -> Result<ChunkReader<'a>> {
        Ok(ChunkReader::new(self.take(header.size as usize)?))
    }

    /// Read a header of the given type and return its payload reader
    pub fn chunk(&mut self, chunk_type: u32) -> Result<(ChunkHeader, ChunkReader<'a>)> {
        let header = self.expect_chunk(chunk_type)?;
        let body = self.body(&header)?;
        Ok((header, body))
    }

    /// Read a `STRING` chunk
    pub fn string_chunk(&mut self) -> Result<String> {
        let (_, body) = self.chunk(chunk::STRING)?;
        Ok(c_string(body.data))
    }

    /// Skip over a whole chunk of any type
    pub fn skip_chunk(&mut self) -> Result<ChunkHeader> {
        let header = self.header()?;
        self.skip(header.size as usize)?;
        Ok(header)
    }
}

/// Decode a NUL-terminated byte string
pub fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
