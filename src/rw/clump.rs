//! Clump (DFF) decoding: geometry list, materials and bin-mesh splits

use glam::{Vec2, Vec3};

use super::{ChunkReader, HEADER_SIZE, chunk};
use crate::core::{Error, Result};

/// Most UV sets a geometry may carry
pub const MAX_UV_SETS: usize = 8;

/// Last library version whose geometry struct carries surface properties
const SURFACE_PROPS_BEFORE: u32 = 0x34000;

/// Library versions above this store lighting coefficients in materials
const MATERIAL_SURFACE_PROPS_AFTER: u32 = 0x30400;

bitflags::bitflags! {
    /// Geometry format flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GeometryFlags: u16 {
        const TRISTRIP = 0x01;
        const POSITIONS = 0x02;
        const TEXTURED = 0x04;
        const PRELIT = 0x08;
        const NORMALS = 0x10;
        const LIGHT = 0x20;
        const MODULATE_MATERIAL_COLOR = 0x40;
        const TEXTURED2 = 0x80;
    }
}

/// A triangle of the geometry struct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [u16; 3],
    pub material: u16,
}

/// A material; only the texture binding matters for baking
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub color: [u8; 4],
    /// Texture name, empty when untextured
    pub texture_name: String,
    pub mask_name: String,
}

/// A run of indices sharing one material (bin-mesh PLG)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub material_index: u32,
    pub indices: Vec<u32>,
}

/// One decoded geometry
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub flags: GeometryFlags,
    /// Vertex data lives in a platform-specific native block
    pub native: bool,
    pub vertex_count: u32,
    /// Prelit RGBA colors, empty when not prelit
    pub colors: Vec<[u8; 4]>,
    pub uv_sets: Vec<Vec<Vec2>>,
    pub triangles: Vec<Triangle>,
    /// Positions of morph target 0
    pub positions: Vec<Vec3>,
    /// Normals of morph target 0, empty when absent
    pub normals: Vec<Vec3>,
    pub materials: Vec<Material>,
    pub splits: Vec<Split>,
    /// Splits are triangle strips rather than lists
    pub tristrip: bool,
}

/// A decoded clump
#[derive(Debug, Clone, Default)]
pub struct Clump {
    pub atomic_count: u32,
    pub geometries: Vec<Geometry>,
}

impl Clump {
    /// Decode a clump from its chunk payload
    pub fn read(mut body: ChunkReader<'_>) -> Result<Self> {
        let (_, mut s) = body.chunk(chunk::STRUCT)?;
        let atomic_count = s.u32()?;

        let mut geometries = Vec::new();
        while body.remaining() >= HEADER_SIZE {
            let header = body.header()?;
            let child = body.body(&header)?;
            if header.chunk_type == chunk::GEOMETRY_LIST {
                geometries = read_geometry_list(child)?;
            }
        }
        Ok(Self { atomic_count, geometries })
    }
}

/// Decode every clump in a DFF stream; other top-level chunks are skipped
pub fn read_clumps(data: &[u8]) -> Result<Vec<Clump>> {
    let mut reader = ChunkReader::new(data);
    let mut clumps = Vec::new();
    while reader.remaining() >= HEADER_SIZE {
        let header = reader.header()?;
        // Archive sectors are zero-padded
        if header.chunk_type == 0 {
            break;
        }
        let body = reader.body(&header)?;
        if header.chunk_type == chunk::CLUMP {
            clumps.push(Clump::read(body)?);
        }
    }
    Ok(clumps)
}

fn read_geometry_list(mut body: ChunkReader<'_>) -> Result<Vec<Geometry>> {
    let (_, mut s) = body.chunk(chunk::STRUCT)?;
    let count = s.u32()?;
    let mut geometries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (header, g) = body.chunk(chunk::GEOMETRY)?;
        geometries.push(Geometry::read(g, header.version())?);
    }
    Ok(geometries)
}

impl Geometry {
    /// Decode a geometry from its chunk payload
    pub fn read(mut body: ChunkReader<'_>, version: u32) -> Result<Self> {
        let (_, s) = body.chunk(chunk::STRUCT)?;
        let mut geometry = Self::read_struct(s, version)?;

        while body.remaining() >= HEADER_SIZE {
            let header = body.header()?;
            let child = body.body(&header)?;
            match header.chunk_type {
                chunk::MATERIAL_LIST => geometry.materials = read_material_list(child)?,
                chunk::EXTENSION => geometry.read_extension(child)?,
                _ => {}
            }
        }
        Ok(geometry)
    }

    fn read_struct(mut s: ChunkReader<'_>, version: u32) -> Result<Self> {
        let flags = GeometryFlags::from_bits_retain(s.u16()?);
        let mut uv_set_count = s.u8()? as usize;
        let native = s.u8()? != 0;
        let triangle_count = s.u32()? as usize;
        let vertex_count = s.u32()?;
        let morph_target_count = s.u32()?;

        if uv_set_count == 0 {
            if flags.contains(GeometryFlags::TEXTURED2) {
                uv_set_count = 2;
            } else if flags.contains(GeometryFlags::TEXTURED) {
                uv_set_count = 1;
            }
        }
        if uv_set_count > MAX_UV_SETS {
            return Err(Error::RenderWare(format!("geometry has {} UV sets", uv_set_count)));
        }

        if version < SURFACE_PROPS_BEFORE {
            s.skip(12)?;
        }

        let mut geometry = Self {
            flags,
            native,
            vertex_count,
            ..Default::default()
        };
        let n = vertex_count as usize;

        if !native {
            if flags.contains(GeometryFlags::PRELIT) {
                let raw = s.take(n * 4)?;
                geometry.colors = raw.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect();
            }
            for _ in 0..uv_set_count {
                let uv = s.f32_vec(n * 2)?;
                geometry.uv_sets.push(uv.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect());
            }
            geometry.triangles.reserve(triangle_count);
            for _ in 0..triangle_count {
                let v1 = s.u16()?;
                let v0 = s.u16()?;
                let material = s.u16()?;
                let v2 = s.u16()?;
                geometry.triangles.push(Triangle { vertices: [v0, v1, v2], material });
            }
        }

        for target in 0..morph_target_count {
            // Bounding sphere
            s.skip(16)?;
            let has_positions = s.u32()? != 0;
            let has_normals = s.u32()? != 0;
            let positions = if has_positions { read_vec3s(&mut s, n)? } else { Vec::new() };
            let normals = if has_normals { read_vec3s(&mut s, n)? } else { Vec::new() };
            if target == 0 {
                geometry.positions = positions;
                geometry.normals = normals;
            }
        }

        Ok(geometry)
    }

    fn read_extension(&mut self, mut ext: ChunkReader<'_>) -> Result<()> {
        while ext.remaining() >= HEADER_SIZE {
            let header = ext.header()?;
            let mut plugin = ext.body(&header)?;
            if header.chunk_type != chunk::BIN_MESH || self.native {
                continue;
            }
            self.tristrip = plugin.u32()? & 1 != 0;
            let split_count = plugin.u32()?;
            let _total_indices = plugin.u32()?;
            self.splits = (0..split_count)
                .map(|_| {
                    let index_count = plugin.u32()? as usize;
                    let material_index = plugin.u32()?;
                    let indices = (0..index_count).map(|_| plugin.u32()).collect::<Result<Vec<_>>>()?;
                    Ok(Split { material_index, indices })
                })
                .collect::<Result<Vec<_>>>()?;
        }
        Ok(())
    }

    /// Texture name of the material used by `split`, empty when untextured
    pub fn split_texture_name(&self, split: &Split) -> Result<&str> {
        self.materials
            .get(split.material_index as usize)
            .map(|m| m.texture_name.as_str())
            .ok_or_else(|| {
                Error::RenderWare(format!(
                    "split references material {} of {}",
                    split.material_index,
                    self.materials.len()
                ))
            })
    }
}

fn read_vec3s(s: &mut ChunkReader<'_>, count: usize) -> Result<Vec<Vec3>> {
    let raw = s.f32_vec(count * 3)?;
    Ok(raw.chunks_exact(3).map(Vec3::from_slice).collect())
}

fn read_material_list(mut body: ChunkReader<'_>) -> Result<Vec<Material>> {
    let (_, mut s) = body.chunk(chunk::STRUCT)?;
    let count = s.u32()?;
    let mut materials: Vec<Material> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = s.i32()?;
        if index < 0 {
            let (header, m) = body.chunk(chunk::MATERIAL)?;
            materials.push(read_material(m, header.version())?);
        } else {
            let shared = materials.get(index as usize).cloned().ok_or_else(|| {
                Error::RenderWare(format!("material list references unknown material {}", index))
            })?;
            materials.push(shared);
        }
    }
    Ok(materials)
}

fn read_material(mut body: ChunkReader<'_>, version: u32) -> Result<Material> {
    let (_, mut s) = body.chunk(chunk::STRUCT)?;
    let _flags = s.u32()?;
    let c = s.take(4)?;
    let color = [c[0], c[1], c[2], c[3]];
    let _unused = s.u32()?;
    let textured = s.u32()? != 0;
    if version > MATERIAL_SURFACE_PROPS_AFTER {
        s.skip(12)?;
    }

    let mut material = Material { color, ..Default::default() };
    while body.remaining() >= HEADER_SIZE {
        let header = body.header()?;
        let mut child = body.body(&header)?;
        if header.chunk_type == chunk::TEXTURE && textured {
            let _filter = child.chunk(chunk::STRUCT)?;
            material.texture_name = child.string_chunk()?;
            material.mask_name = child.string_chunk()?;
        }
    }
    Ok(material)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rw::fixtures::{chunk as rw_chunk, f32s, string, u32s};

    /// Describes one split of a fixture geometry
    pub(crate) struct FixtureSplit<'a> {
        pub texture: &'a str,
        pub indices: &'a [u32],
    }

    /// Build a DFF holding one clump with one geometry.
    ///
    /// Vertex `i` is placed at `(i, 0, 0)`; every split gets its own material.
    pub(crate) fn dff_bytes(vertex_count: u32, prelit: bool, uv_sets: u8, splits: &[FixtureSplit<'_>]) -> Vec<u8> {
        let mut flags = GeometryFlags::POSITIONS.bits();
        if prelit {
            flags |= GeometryFlags::PRELIT.bits();
        }
        let mut geo = Vec::new();
        geo.extend_from_slice(&flags.to_le_bytes());
        geo.push(uv_sets);
        geo.push(0);
        geo.extend(u32s(&[1, vertex_count, 1]));
        if prelit {
            for i in 0..vertex_count {
                geo.extend_from_slice(&[i as u8, 2, 3, 4]);
            }
        }
        for set in 0..uv_sets {
            for i in 0..vertex_count {
                geo.extend(f32s(&[i as f32 + set as f32 * 10.0, 0.5]));
            }
        }
        // One triangle: v1, v0, material, v2
        geo.extend_from_slice(&[1, 0, 0, 0, 0, 0, 2, 0]);
        geo.extend(f32s(&[0.0, 0.0, 0.0, 1.0]));
        geo.extend(u32s(&[1, 0]));
        for i in 0..vertex_count {
            geo.extend(f32s(&[i as f32, 0.0, 0.0]));
        }

        let mut matlist_struct = u32s(&[splits.len() as u32]);
        let mut materials = Vec::new();
        for split in splits {
            matlist_struct.extend(u32s(&[u32::MAX]));
            let textured = !split.texture.is_empty();
            let mut mat_struct = u32s(&[0]);
            mat_struct.extend_from_slice(&[255, 255, 255, 255]);
            mat_struct.extend(u32s(&[0, textured as u32]));
            mat_struct.extend(f32s(&[1.0, 1.0, 1.0]));
            let mut mat = rw_chunk(chunk::STRUCT, &mat_struct);
            if textured {
                let mut tex = rw_chunk(chunk::STRUCT, &u32s(&[0x1106]));
                tex.extend(string(split.texture));
                tex.extend(string(""));
                tex.extend(rw_chunk(chunk::EXTENSION, &[]));
                mat.extend(rw_chunk(chunk::TEXTURE, &tex));
            }
            mat.extend(rw_chunk(chunk::EXTENSION, &[]));
            materials.extend(rw_chunk(chunk::MATERIAL, &mat));
        }
        let mut matlist = rw_chunk(chunk::STRUCT, &matlist_struct);
        matlist.extend(materials);

        let total: u32 = splits.iter().map(|s| s.indices.len() as u32).sum();
        let mut bin = u32s(&[0, splits.len() as u32, total]);
        for (i, split) in splits.iter().enumerate() {
            bin.extend(u32s(&[split.indices.len() as u32, i as u32]));
            bin.extend(u32s(split.indices));
        }

        let mut geometry = rw_chunk(chunk::STRUCT, &geo);
        geometry.extend(rw_chunk(chunk::MATERIAL_LIST, &matlist));
        geometry.extend(rw_chunk(chunk::EXTENSION, &rw_chunk(chunk::BIN_MESH, &bin)));

        let mut list = rw_chunk(chunk::STRUCT, &u32s(&[1]));
        list.extend(rw_chunk(chunk::GEOMETRY, &geometry));

        let mut clump = rw_chunk(chunk::STRUCT, &u32s(&[1, 0, 0]));
        clump.extend(rw_chunk(chunk::FRAME_LIST, &u32s(&[0])));
        clump.extend(rw_chunk(chunk::GEOMETRY_LIST, &list));
        clump.extend(rw_chunk(chunk::EXTENSION, &[]));

        let mut out = rw_chunk(chunk::CLUMP, &clump);
        // Sector padding
        out.resize(out.len() + 64, 0);
        out
    }

    #[test]
    fn test_read_single_geometry() {
        let bytes = dff_bytes(
            3,
            true,
            2,
            &[
                FixtureSplit { texture: "brick", indices: &[0, 1, 2] },
                FixtureSplit { texture: "", indices: &[2, 1] },
            ],
        );
        let clumps = read_clumps(&bytes).expect("read_clumps failed");
        assert_eq!(clumps.len(), 1);
        let geo = &clumps[0].geometries[0];

        assert_eq!(geo.vertex_count, 3);
        assert!(geo.flags.contains(GeometryFlags::PRELIT));
        assert_eq!(geo.colors[1], [1, 2, 3, 4]);
        assert_eq!(geo.uv_sets.len(), 2);
        assert_eq!(geo.uv_sets[1][2], Vec2::new(12.0, 0.5));
        assert_eq!(geo.positions[2], Vec3::new(2.0, 0.0, 0.0));
        assert!(geo.normals.is_empty());
        assert_eq!(geo.triangles[0], Triangle { vertices: [0, 1, 2], material: 0 });

        assert_eq!(geo.materials.len(), 2);
        assert_eq!(geo.materials[0].texture_name, "brick");
        assert_eq!(geo.materials[1].texture_name, "");

        assert_eq!(geo.splits.len(), 2);
        assert_eq!(geo.splits[0].indices, vec![0, 1, 2]);
        assert_eq!(geo.split_texture_name(&geo.splits[1]).expect("material"), "");
        assert!(!geo.tristrip);
    }

    #[test]
    fn test_unlit_untextured_geometry() {
        let bytes = dff_bytes(2, false, 0, &[]);
        let clumps = read_clumps(&bytes).expect("read_clumps failed");
        let geo = &clumps[0].geometries[0];
        assert!(geo.colors.is_empty());
        assert!(geo.uv_sets.is_empty());
        assert!(geo.splits.is_empty());
    }

    #[test]
    fn test_truncated_stream_fails() {
        let bytes = dff_bytes(3, true, 1, &[FixtureSplit { texture: "a", indices: &[0, 1, 2] }]);
        assert!(read_clumps(&bytes[..bytes.len() - 120]).is_err());
    }

    #[test]
    fn test_non_clump_chunks_are_skipped() {
        let mut bytes = rw_chunk(0x2B, &[0; 8]);
        bytes.extend(dff_bytes(1, false, 1, &[]));
        let clumps = read_clumps(&bytes).expect("read_clumps failed");
        assert_eq!(clumps.len(), 1);
        assert_eq!(clumps[0].atomic_count, 1);
    }
}
