//! Draw call batching.
//!
//! Instances group all placements of one definition into a contiguous range
//! of the transform buffer. Every material split of an instanced mesh
//! becomes one indirect draw call, stored under its [`SortKey`] so that
//! iteration yields draws grouped by texture state.

pub mod sort_key;

pub use sort_key::{SortKey, SortKeyFields};

use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::catalog::ItemPlacement;
use crate::core::{Error, Result};
use crate::mesh::MeshBuffers;
use crate::texture::TextureBuckets;

/// One indirect draw, as stored in `drawables.blob`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawCall {
    /// Slice handle: 1-based ordinal of the slice in `texturebuckets.blob`
    pub texture_array: u32,
    /// Layer within the slice
    pub tex_index: u32,
    /// Byte offset into the index buffer
    pub index_offset: u32,
    /// Index count
    pub num_vertices: u32,
    pub base_vertex: u32,
    pub num_instances: u32,
    pub base_instance: u32,
}

/// Contiguous transform range of one definition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Instance {
    pub id: u32,
    pub num_instances: u32,
    pub base_instance: u32,
}

/// Flatten placements into instances and a transform buffer, in ascending id order
pub fn build_instances(placements: &BTreeMap<u32, Vec<ItemPlacement>>) -> (Vec<Instance>, Vec<Mat4>) {
    let mut instances = Vec::with_capacity(placements.len());
    let mut transforms = Vec::new();
    for (&id, group) in placements {
        instances.push(Instance {
            id,
            num_instances: group.len() as u32,
            base_instance: transforms.len() as u32,
        });
        transforms.extend(group.iter().map(|p| p.world_from_object));
    }
    (instances, transforms)
}

/// Sorted draw calls
#[derive(Debug, Clone, Default)]
pub struct DrawCallBatcher {
    draw_calls: BTreeMap<SortKey, DrawCall>,
}

impl DrawCallBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a draw call for every textured split of every instanced mesh.
    ///
    /// Slice handles must have been assigned. Returns the number of draw
    /// calls in the batcher afterwards.
    pub fn batch(&mut self, instances: &[Instance], meshes: &MeshBuffers, textures: &TextureBuckets) -> Result<usize> {
        let max_layers = textures.max_layers();
        let mut skipped = 0usize;

        for instance in instances {
            let Some((mesh, splits)) = meshes.mesh(instance.id) else {
                continue;
            };

            let mut running = 0u32;
            for (split_index, split) in splits.iter().enumerate() {
                let advance = split.num_indices * std::mem::size_of::<u16>() as u32;
                let resolved = textures
                    .resolve(&split.material_name)
                    .and_then(|r| textures.bucket(r.bucket_key).map(|b| (r, b)));
                let Some((texture, bucket)) = resolved else {
                    skipped += 1;
                    running += advance;
                    continue;
                };

                let slice = texture.index / max_layers;
                let tex_index = texture.index % max_layers;
                let handle = bucket.slice_handles.get(slice as usize).copied().ok_or_else(|| {
                    Error::Texture(format!(
                        "bucket {:x} has no handle for slice {}",
                        texture.bucket_key, slice
                    ))
                })?;

                let key = SortKey::try_pack(texture.bucket_key as u32, slice, instance.id, split_index as u32)?;
                self.draw_calls.insert(
                    key,
                    DrawCall {
                        texture_array: handle,
                        tex_index,
                        index_offset: mesh.offset + running,
                        num_vertices: split.num_indices,
                        base_vertex: mesh.base_vertex,
                        num_instances: instance.num_instances,
                        base_instance: instance.base_instance,
                    },
                );
                running += advance;
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} splits without a loaded texture", skipped);
        }
        Ok(self.draw_calls.len())
    }

    /// Draw calls in ascending key order
    pub fn draw_calls(&self) -> &BTreeMap<SortKey, DrawCall> {
        &self.draw_calls
    }

    pub fn len(&self) -> usize {
        self.draw_calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draw_calls.is_empty()
    }

    /// Keys and draw calls as parallel arrays
    pub fn to_arrays(&self) -> (Vec<u64>, Vec<DrawCall>) {
        self.draw_calls.iter().map(|(k, dc)| (k.value(), *dc)).unzip()
    }
}
