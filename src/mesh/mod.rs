//! Mesh extraction into shared vertex and index buffers.
//!
//! Every mesh is appended to four global buffers. A [`MeshTableEntry`] keeps
//! where a definition's vertices and indices start, and its
//! [`MaterialSplit`]s describe consecutive index runs per material.

use std::collections::BTreeMap;
use std::path::Path;

use glam::{Vec3, Vec4};

use crate::core::{Error, Result};
use crate::rw::{Clump, read_clumps};

/// Vertex color of geometry without prelighting
pub const DEFAULT_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Where one definition's mesh lives inside the shared buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshTableEntry {
    /// Definition id
    pub id: u32,
    pub num_splits: u32,
    /// First vertex of the mesh
    pub base_vertex: u32,
    /// Byte offset of the first index
    pub offset: u32,
}

/// A run of indices drawn with one material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSplit {
    /// Texture name of the material, empty when untextured
    pub material_name: String,
    pub material_index: u32,
    pub num_indices: u32,
}

/// Shared vertex/index buffers plus the per-definition mesh table
#[derive(Debug, Clone, Default)]
pub struct MeshBuffers {
    pub positions: Vec<Vec3>,
    pub colors: Vec<[u8; 4]>,
    /// UV set 0 in `xy`, set 1 in `zw`
    pub uvs: Vec<Vec4>,
    pub indices: Vec<u16>,
    table: BTreeMap<u32, MeshTableEntry>,
    splits: BTreeMap<u32, Vec<MaterialSplit>>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the first geometry of `clump` as the mesh of definition `id`.
    ///
    /// Returns `false` when there is nothing to draw (no geometry or no
    /// vertices); no table entry is recorded in that case.
    pub fn extract(&mut self, id: u32, clump: &Clump) -> Result<bool> {
        let Some(geometry) = clump.geometries.first() else {
            return Ok(false);
        };
        if clump.geometries.len() > 1 {
            log::debug!("Mesh {}: using 1 of {} geometries", id, clump.geometries.len());
        }
        if geometry.native {
            log::warn!("Mesh {}: native geometry data is not supported, skipping", id);
            return Ok(false);
        }
        if geometry.vertex_count == 0 {
            return Ok(false);
        }

        let n = geometry.vertex_count as usize;
        if geometry.positions.len() != n {
            return Err(Error::Mesh(format!(
                "mesh {} has {} vertices but {} positions",
                id,
                n,
                geometry.positions.len()
            )));
        }

        // Validate everything before touching the shared buffers
        let mut splits = Vec::with_capacity(geometry.splits.len());
        let mut indices = Vec::new();
        for split in &geometry.splits {
            for &index in &split.indices {
                let narrow = u16::try_from(index).map_err(|_| {
                    Error::Mesh(format!("mesh {} index {} does not fit 16 bits", id, index))
                })?;
                indices.push(narrow);
            }
            splits.push(MaterialSplit {
                material_name: geometry.split_texture_name(split)?.to_string(),
                material_index: split.material_index,
                num_indices: split.indices.len() as u32,
            });
        }

        let entry = MeshTableEntry {
            id,
            num_splits: splits.len() as u32,
            base_vertex: self.positions.len() as u32,
            offset: (self.indices.len() * std::mem::size_of::<u16>()) as u32,
        };

        self.positions.extend_from_slice(&geometry.positions);
        for v in 0..n {
            self.colors.push(geometry.colors.get(v).copied().unwrap_or(DEFAULT_COLOR));
            let uv0 = geometry.uv_sets.first().and_then(|set| set.get(v)).copied().unwrap_or_default();
            let uv1 = geometry.uv_sets.get(1).and_then(|set| set.get(v)).copied().unwrap_or_default();
            self.uvs.push(Vec4::new(uv0.x, uv0.y, uv1.x, uv1.y));
        }
        self.indices.extend(indices);

        self.table.insert(id, entry);
        self.splits.insert(id, splits);
        Ok(true)
    }

    /// Decode a DFF file and extract the first clump that has geometry
    pub fn load_dff(&mut self, id: u32, path: &Path) -> Result<bool> {
        log::debug!("Loading DFF id={}: '{}'", id, path.display());
        let data = std::fs::read(path)?;
        let clumps = read_clumps(&data)?;
        match clumps.iter().find(|c| !c.geometries.is_empty()) {
            Some(clump) => self.extract(id, clump),
            None => {
                log::warn!("DFF '{}' has no geometry", path.display());
                Ok(false)
            }
        }
    }

    /// Mesh table entry and splits of a definition
    pub fn mesh(&self, id: u32) -> Option<(&MeshTableEntry, &[MaterialSplit])> {
        let entry = self.table.get(&id)?;
        let splits = self.splits.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        Some((entry, splits))
    }

    /// Mesh table in ascending id order
    pub fn table(&self) -> impl Iterator<Item = &MeshTableEntry> {
        self.table.values()
    }

    pub fn mesh_count(&self) -> usize {
        self.table.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rw::clump::tests::{FixtureSplit, dff_bytes};
    use crate::rw::{Geometry, Split};

    fn clump_of(bytes: &[u8]) -> Clump {
        read_clumps(bytes).expect("read_clumps failed").remove(0)
    }

    #[test]
    fn test_extract_appends_buffers() {
        let mut buffers = MeshBuffers::new();
        let a = clump_of(&dff_bytes(3, true, 2, &[FixtureSplit { texture: "brick", indices: &[0, 1, 2] }]));
        let b = clump_of(&dff_bytes(
            4,
            false,
            1,
            &[
                FixtureSplit { texture: "roof", indices: &[0, 1, 2, 3] },
                FixtureSplit { texture: "", indices: &[3, 2] },
            ],
        ));

        assert!(buffers.extract(7, &a).expect("extract a"));
        assert!(buffers.extract(3, &b).expect("extract b"));

        assert_eq!(buffers.vertex_count(), 7);
        assert_eq!(buffers.colors.len(), 7);
        assert_eq!(buffers.uvs.len(), 7);
        assert_eq!(buffers.index_count(), 9);

        let (entry_a, splits_a) = buffers.mesh(7).expect("mesh 7");
        assert_eq!(*entry_a, MeshTableEntry { id: 7, num_splits: 1, base_vertex: 0, offset: 0 });
        assert_eq!(splits_a[0].material_name, "brick");

        let (entry_b, splits_b) = buffers.mesh(3).expect("mesh 3");
        assert_eq!(entry_b.base_vertex, 3);
        assert_eq!(entry_b.offset, 6);
        assert_eq!(entry_b.num_splits, 2);
        assert_eq!(splits_b[1].material_name, "");
        assert_eq!(splits_b[1].num_indices, 2);

        // Prelit colors are kept, unlit vertices are white
        assert_eq!(buffers.colors[1], [1, 2, 3, 4]);
        assert_eq!(buffers.colors[3], DEFAULT_COLOR);
        // Second UV set lands in zw, missing sets are zero
        assert_eq!(buffers.uvs[2], Vec4::new(2.0, 0.5, 12.0, 0.5));
        assert_eq!(buffers.uvs[4], Vec4::new(1.0, 0.5, 0.0, 0.0));

        let ids: Vec<u32> = buffers.table().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn test_zero_vertices_is_skipped() {
        let mut buffers = MeshBuffers::new();
        let clump = Clump {
            atomic_count: 1,
            geometries: vec![Geometry::default()],
        };
        assert!(!buffers.extract(1, &clump).expect("extract"));
        assert!(buffers.mesh(1).is_none());
        assert_eq!(buffers.vertex_count(), 0);
    }

    #[test]
    fn test_wide_index_is_fatal() {
        let mut clump = clump_of(&dff_bytes(3, false, 1, &[FixtureSplit { texture: "a", indices: &[0, 1, 2] }]));
        clump.geometries[0].splits = vec![Split { material_index: 0, indices: vec![0, 70_000] }];
        let mut buffers = MeshBuffers::new();
        assert!(matches!(buffers.extract(1, &clump), Err(Error::Mesh(_))));
        assert_eq!(buffers.vertex_count(), 0);
    }

    #[test]
    fn test_only_first_geometry_is_used() {
        let mut clump = clump_of(&dff_bytes(2, false, 1, &[]));
        let extra = clump.geometries[0].clone();
        clump.geometries.push(extra);
        let mut buffers = MeshBuffers::new();
        assert!(buffers.extract(1, &clump).expect("extract"));
        assert_eq!(buffers.vertex_count(), 2);
    }

    #[test]
    fn test_load_dff_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("box.dff");
        std::fs::write(&path, dff_bytes(3, false, 1, &[FixtureSplit { texture: "a", indices: &[0, 1, 2] }]))
            .expect("write");
        let mut buffers = MeshBuffers::new();
        assert!(buffers.load_dff(9, &path).expect("load_dff"));
        assert!(buffers.load_dff(9, &dir.path().join("missing.dff")).is_err());
    }
}
