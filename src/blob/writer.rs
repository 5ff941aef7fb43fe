//! Blob writers used by the baker

use std::io::{Seek, SeekFrom, Write};

use glam::Mat4;

use super::{BlobEncoding, write_payload};
use crate::batch::{DrawCall, DrawCallBatcher};
use crate::core::{Error, Result};
use crate::mesh::MeshBuffers;
use crate::texture::{TextureBuckets, TextureSlice};

/// Header counters of a written texture blob
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureBlobStats {
    pub split_count: u32,
    pub max_split_bytes: u32,
}

fn to_u32(what: &str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Blob(format!("{} {} does not fit in 32 bits", what, value)))
}

fn to_i32(what: &str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Blob(format!("{} {} does not fit in 31 bits", what, value)))
}

/// Pack every bucket slice and write `texturebuckets.blob`.
///
/// The header counters are only known once the last slice is packed, so
/// they are written as zero and patched afterwards.
pub fn write_texture_blob<W: Write + Seek>(w: &mut W, textures: &TextureBuckets) -> Result<TextureBlobStats> {
    let encoding = BlobEncoding::baked();
    let endian = encoding.endian;
    let start = w.stream_position()?;
    endian.write_u32(w, 0)?;
    endian.write_u32(w, 0)?;

    let mut stats = TextureBlobStats::default();
    for slice in textures.slices() {
        let slice = slice?;
        stats.split_count += 1;
        log::debug!(
            "Writing split {} ({}) {}x{}x{}",
            stats.split_count,
            slice.format.name(),
            slice.width,
            slice.height,
            slice.layers
        );
        let size = write_slice(w, &slice, encoding)?;
        stats.max_split_bytes = stats.max_split_bytes.max(size);
    }

    let end = w.stream_position()?;
    w.seek(SeekFrom::Start(start))?;
    endian.write_u32(w, stats.split_count)?;
    endian.write_u32(w, stats.max_split_bytes)?;
    w.seek(SeekFrom::Start(end))?;
    Ok(stats)
}

fn write_slice<W: Write>(w: &mut W, slice: &TextureSlice, encoding: BlobEncoding) -> Result<u32> {
    let endian = encoding.endian;
    endian.write_u32(w, slice.format.gl_code())?;
    endian.write_i32(w, to_i32("slice width", slice.width as usize)?)?;
    endian.write_i32(w, to_i32("slice height", slice.height as usize)?)?;
    endian.write_i32(w, to_i32("slice layers", slice.layers as usize)?)?;
    endian.write_i32(w, to_i32("slice size", slice.byte_size())?)?;
    write_payload(w, &slice.data, encoding)?;
    to_u32("slice size", slice.byte_size())
}

/// Write the shared vertex and index buffers as `meshes.blob`
pub fn write_mesh_blob<W: Write>(w: &mut W, meshes: &MeshBuffers) -> Result<()> {
    let encoding = BlobEncoding::baked();
    let endian = encoding.endian;
    endian.write_u32(w, to_u32("vertex count", meshes.positions.len())?)?;
    endian.write_u32(w, to_u32("index count", meshes.indices.len())?)?;
    write_payload(w, &endian.encode_u16s(&meshes.indices), encoding)?;
    write_payload(w, &endian.encode_f32s(bytemuck::cast_slice(&meshes.positions)), encoding)?;
    write_payload(w, bytemuck::cast_slice(&meshes.colors), encoding)?;
    write_payload(w, &endian.encode_f32s(bytemuck::cast_slice(&meshes.uvs)), encoding)?;
    Ok(())
}

/// Write the placement transforms as `instances.blob`, column-major
pub fn write_instance_blob<W: Write>(w: &mut W, transforms: &[Mat4]) -> Result<()> {
    let encoding = BlobEncoding::baked();
    let endian = encoding.endian;
    endian.write_u32(w, to_u32("instance count", transforms.len())?)?;
    write_payload(w, &endian.encode_f32s(bytemuck::cast_slice(transforms)), encoding)?;
    Ok(())
}

/// Write the sorted keys and draw calls as `drawables.blob`
pub fn write_drawable_blob<W: Write>(w: &mut W, batcher: &DrawCallBatcher) -> Result<()> {
    let encoding = BlobEncoding::baked();
    let endian = encoding.endian;
    let (keys, calls): (Vec<u64>, Vec<DrawCall>) = batcher.to_arrays();
    endian.write_u32(w, to_u32("draw call count", calls.len())?)?;
    write_payload(w, &endian.encode_u64s(&keys), encoding)?;
    write_payload(w, &endian.encode_u32s(bytemuck::cast_slice(&calls)), encoding)?;
    Ok(())
}
