//! Blob readers.
//!
//! These decode what the baker or the transcoder wrote, in either byte
//! order, into owned buffers.

use std::io::Read;

use glam::{Mat4, Vec3, Vec4};

use super::{BlobEncoding, read_payload};
use crate::batch::DrawCall;
use crate::core::{Error, Result};
use crate::texture::{TextureFormat, TextureSlice};

/// Decoded `texturebuckets.blob`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureBlob {
    pub max_split_bytes: u32,
    pub slices: Vec<TextureSlice>,
}

/// Decoded `meshes.blob`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBlob {
    pub indices: Vec<u16>,
    pub positions: Vec<Vec3>,
    pub colors: Vec<[u8; 4]>,
    pub uvs: Vec<Vec4>,
}

/// Decoded `drawables.blob`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawableBlob {
    pub keys: Vec<u64>,
    pub draw_calls: Vec<DrawCall>,
}

fn count<R: Read>(r: &mut R, encoding: BlobEncoding) -> Result<usize> {
    Ok(encoding.endian.read_u32(r)? as usize)
}

fn dimension<R: Read>(r: &mut R, encoding: BlobEncoding, what: &str) -> Result<u32> {
    let value = encoding.endian.read_i32(r)?;
    u32::try_from(value).map_err(|_| Error::Blob(format!("negative {} {}", what, value)))
}

fn byte_len(elements: usize, element_size: usize) -> Result<usize> {
    elements
        .checked_mul(element_size)
        .ok_or_else(|| Error::Blob(format!("array of {} elements overflows", elements)))
}

pub fn read_texture_blob<R: Read>(r: &mut R, encoding: BlobEncoding) -> Result<TextureBlob> {
    let split_count = count(r, encoding)?;
    let max_split_bytes = encoding.endian.read_u32(r)?;

    let mut slices = Vec::new();
    for i in 0..split_count {
        let code = encoding.endian.read_u32(r)?;
        let format = TextureFormat::from_gl_code(code)
            .ok_or_else(|| Error::Blob(format!("split {} has unknown format 0x{:X}", i, code)))?;
        let width = dimension(r, encoding, "width")?;
        let height = dimension(r, encoding, "height")?;
        let layers = dimension(r, encoding, "layer count")?;
        let size = dimension(r, encoding, "byte size")?;
        if size > max_split_bytes {
            return Err(Error::Blob(format!(
                "split {} holds {} bytes, header maximum is {}",
                i, size, max_split_bytes
            )));
        }
        let data = read_payload(r, size as usize, encoding)?;
        slices.push(TextureSlice { format, width, height, layers, data });
    }
    Ok(TextureBlob { max_split_bytes, slices })
}

pub fn read_mesh_blob<R: Read>(r: &mut R, encoding: BlobEncoding) -> Result<MeshBlob> {
    let endian = encoding.endian;
    let vertex_count = count(r, encoding)?;
    let index_count = count(r, encoding)?;

    let indices = endian.decode_u16s(&read_payload(r, byte_len(index_count, 2)?, encoding)?);
    let positions = endian
        .decode_f32s(&read_payload(r, byte_len(vertex_count, 12)?, encoding)?)
        .chunks_exact(3)
        .map(Vec3::from_slice)
        .collect();
    // Colors are stored as one 32-bit word per vertex
    let colors = endian
        .decode_u32s(&read_payload(r, byte_len(vertex_count, 4)?, encoding)?)
        .into_iter()
        .map(u32::to_le_bytes)
        .collect();
    let uvs = endian
        .decode_f32s(&read_payload(r, byte_len(vertex_count, 16)?, encoding)?)
        .chunks_exact(4)
        .map(Vec4::from_slice)
        .collect();

    Ok(MeshBlob { indices, positions, colors, uvs })
}

/// Read the instance transforms as stored.
///
/// Baked blobs are column-major; transcoded blobs with transposition hold
/// the transposed matrices.
pub fn read_instance_blob<R: Read>(r: &mut R, encoding: BlobEncoding) -> Result<Vec<Mat4>> {
    let instance_count = count(r, encoding)?;
    let floats = encoding
        .endian
        .decode_f32s(&read_payload(r, byte_len(instance_count, 64)?, encoding)?);
    Ok(floats.chunks_exact(16).map(Mat4::from_cols_slice).collect())
}

pub fn read_drawable_blob<R: Read>(r: &mut R, encoding: BlobEncoding) -> Result<DrawableBlob> {
    let endian = encoding.endian;
    let draw_count = count(r, encoding)?;
    let keys = endian.decode_u64s(&read_payload(r, byte_len(draw_count, 8)?, encoding)?);
    let words = endian.decode_u32s(&read_payload(
        r,
        byte_len(draw_count, std::mem::size_of::<DrawCall>())?,
        encoding,
    )?);
    let draw_calls = bytemuck::try_cast_slice::<u32, DrawCall>(&words)
        .map_err(|e| Error::Blob(format!("draw call array: {:?}", e)))?
        .to_vec();
    Ok(DrawableBlob { keys, draw_calls })
}
