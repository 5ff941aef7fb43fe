//! Byte order primitives for blob encoding

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// Byte order of a blob
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// PC byte order, used by the baker
    #[default]
    Little,
    /// PS3 byte order
    Big,
}

macro_rules! endian_dispatch {
    ($self:expr, $order:ident => $body:expr) => {
        match $self {
            Endian::Little => {
                type $order = LittleEndian;
                $body
            }
            Endian::Big => {
                type $order = BigEndian;
                $body
            }
        }
    };
}

impl Endian {
    pub fn read_u32<R: Read + ?Sized>(self, r: &mut R) -> io::Result<u32> {
        endian_dispatch!(self, E => r.read_u32::<E>())
    }

    pub fn read_i32<R: Read + ?Sized>(self, r: &mut R) -> io::Result<i32> {
        endian_dispatch!(self, E => r.read_i32::<E>())
    }

    pub fn write_u32<W: Write + ?Sized>(self, w: &mut W, value: u32) -> io::Result<()> {
        endian_dispatch!(self, E => w.write_u32::<E>(value))
    }

    pub fn write_i32<W: Write + ?Sized>(self, w: &mut W, value: i32) -> io::Result<()> {
        endian_dispatch!(self, E => w.write_i32::<E>(value))
    }

    pub fn decode_u16s(self, src: &[u8]) -> Vec<u16> {
        let mut out = vec![0u16; src.len() / 2];
        endian_dispatch!(self, E => E::read_u16_into(&src[..out.len() * 2], &mut out));
        out
    }

    pub fn decode_u32s(self, src: &[u8]) -> Vec<u32> {
        let mut out = vec![0u32; src.len() / 4];
        endian_dispatch!(self, E => E::read_u32_into(&src[..out.len() * 4], &mut out));
        out
    }

    pub fn decode_u64s(self, src: &[u8]) -> Vec<u64> {
        let mut out = vec![0u64; src.len() / 8];
        endian_dispatch!(self, E => E::read_u64_into(&src[..out.len() * 8], &mut out));
        out
    }

    pub fn decode_f32s(self, src: &[u8]) -> Vec<f32> {
        let mut out = vec![0f32; src.len() / 4];
        endian_dispatch!(self, E => E::read_f32_into(&src[..out.len() * 4], &mut out));
        out
    }

    pub fn encode_u16s(self, values: &[u16]) -> Vec<u8> {
        let mut out = vec![0u8; values.len() * 2];
        endian_dispatch!(self, E => E::write_u16_into(values, &mut out));
        out
    }

    pub fn encode_u32s(self, values: &[u32]) -> Vec<u8> {
        let mut out = vec![0u8; values.len() * 4];
        endian_dispatch!(self, E => E::write_u32_into(values, &mut out));
        out
    }

    pub fn encode_u64s(self, values: &[u64]) -> Vec<u8> {
        let mut out = vec![0u8; values.len() * 8];
        endian_dispatch!(self, E => E::write_u64_into(values, &mut out));
        out
    }

    pub fn encode_f32s(self, values: &[f32]) -> Vec<u8> {
        let mut out = vec![0u8; values.len() * 4];
        endian_dispatch!(self, E => E::write_f32_into(values, &mut out));
        out
    }
}
