//! Baking driver.
//!
//! A [`BakeContext`] owns everything one run builds: the item catalog, the
//! shared mesh buffers, the texture buckets and the batched draw calls.
//! [`run`] drives the phases strictly in sequence:
//!
//! 1. catalog (`generic.ide`, then each zone's IDE followed by its IPL)
//! 2. extraction of every referenced DFF and TXD from the IMG archive
//! 3. DFF and TXD loading
//! 4. `meshes.blob`, `texturebuckets.blob`
//! 5. batching, `instances.blob`, `drawables.blob`
//!
//! The first failing phase aborts the run; its [`BakePhase::exit_code`]
//! becomes the process exit code.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{ImgArchive, extract_all};
use crate::batch::{DrawCallBatcher, Instance, build_instances};
use crate::blob::{
    BlobKind, TextureBlobStats, write_drawable_blob, write_instance_blob, write_mesh_blob, write_texture_blob,
};
use crate::catalog::ItemCatalog;
use crate::core::{BakeConfig, Error, Result};
use crate::mesh::MeshBuffers;
use crate::texture::TextureBuckets;

/// File the run summary is written to, inside the output directory
pub const SUMMARY_FILE: &str = "bake_summary.json";

/// Exit code used when the configuration cannot be loaded
pub const CONFIG_EXIT_CODE: u8 = 10;

/// Baking phases, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BakePhase {
    Definitions,
    Placements,
    Extraction,
    Models,
    Textures,
    MeshBlob,
    TextureBlob,
    Instances,
    Drawables,
}

impl BakePhase {
    pub const ALL: [BakePhase; 9] = [
        BakePhase::Definitions,
        BakePhase::Placements,
        BakePhase::Extraction,
        BakePhase::Models,
        BakePhase::Textures,
        BakePhase::MeshBlob,
        BakePhase::TextureBlob,
        BakePhase::Instances,
        BakePhase::Drawables,
    ];

    /// Process exit code reported when this phase fails
    pub fn exit_code(self) -> u8 {
        match self {
            BakePhase::Definitions => 1,
            BakePhase::Placements => 2,
            BakePhase::Extraction => 3,
            BakePhase::Models => 4,
            BakePhase::Textures => 5,
            BakePhase::MeshBlob => 6,
            BakePhase::TextureBlob => 7,
            BakePhase::Instances => 8,
            BakePhase::Drawables => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BakePhase::Definitions => "IDE loading",
            BakePhase::Placements => "IPL loading",
            BakePhase::Extraction => "archive extraction",
            BakePhase::Models => "DFF loading",
            BakePhase::Textures => "TXD loading",
            BakePhase::MeshBlob => "mesh blob",
            BakePhase::TextureBlob => "texture blob",
            BakePhase::Instances => "batching",
            BakePhase::Drawables => "drawable blob",
        }
    }
}

impl fmt::Display for BakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed phase and its cause
#[derive(Debug, Error)]
#[error("{phase} failed: {source}")]
pub struct BakeError {
    pub phase: BakePhase,
    #[source]
    pub source: Error,
}

impl BakeError {
    pub fn exit_code(&self) -> u8 {
        self.phase.exit_code()
    }
}

trait PhaseResult<T> {
    fn during(self, phase: BakePhase) -> std::result::Result<T, BakeError>;
}

impl<T> PhaseResult<T> for Result<T> {
    fn during(self, phase: BakePhase) -> std::result::Result<T, BakeError> {
        self.map_err(|source| BakeError { phase, source })
    }
}

/// Counts of a finished run, written as `bake_summary.json`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BakeSummary {
    pub definitions: usize,
    pub placements: usize,
    pub meshes: usize,
    pub vertices: usize,
    pub indices: usize,
    pub buckets: usize,
    pub textures: usize,
    pub slices: u32,
    pub max_split_bytes: u32,
    pub instances: usize,
    pub draw_calls: usize,
}

/// State shared by all phases of one run
pub struct BakeContext {
    config: BakeConfig,
    pub catalog: ItemCatalog,
    pub meshes: MeshBuffers,
    pub textures: TextureBuckets,
    pub instances: Vec<Instance>,
    pub transforms: Vec<Mat4>,
    pub batcher: DrawCallBatcher,
    texture_stats: TextureBlobStats,
}

impl BakeContext {
    pub fn new(config: BakeConfig) -> Self {
        Self {
            catalog: ItemCatalog::from_config(&config),
            textures: TextureBuckets::new(config.max_array_texture_layers),
            meshes: MeshBuffers::new(),
            instances: Vec::new(),
            transforms: Vec::new(),
            batcher: DrawCallBatcher::new(),
            texture_stats: TextureBlobStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    /// Parse `generic.ide`, then every zone's IDE and IPL in turn
    pub fn load_catalog(&mut self) -> std::result::Result<(), BakeError> {
        let generic = self.config.generic_ide.clone();
        self.load_definition_file(&generic).during(BakePhase::Definitions)?;
        for zone in self.config.zones.clone() {
            let ide = self.config.zone_ide(&zone);
            self.load_definition_file(&ide).during(BakePhase::Definitions)?;
            let ipl = self.config.zone_ipl(&zone);
            self.load_placement_file(&ipl, &zone).during(BakePhase::Placements)?;
        }
        log::info!(
            "Catalog: {} definitions, {} placements",
            self.catalog.definitions().len(),
            self.catalog.placement_count()
        );
        Ok(())
    }

    fn load_definition_file(&mut self, path: &Path) -> Result<usize> {
        log::info!("Loading IDE: '{}'", path.display());
        let accepted = self.catalog.load_definitions(path)?;
        if accepted == 0 {
            return Err(Error::Catalog(format!("no definitions accepted from {}", path.display())));
        }
        Ok(accepted)
    }

    fn load_placement_file(&mut self, path: &Path, zone: &str) -> Result<usize> {
        log::info!("Loading IPL: '{}'", path.display());
        let accepted = self.catalog.load_placements(path, zone)?;
        if accepted == 0 {
            return Err(Error::Catalog(format!("no placements accepted from {}", path.display())));
        }
        Ok(accepted)
    }

    /// Copy every referenced DFF and TXD into the extraction directory
    pub fn extract(&self) -> Result<usize> {
        let mut archive = ImgArchive::open(&self.config.img_dir, &self.config.img_archive)?;
        let names = self.catalog.dependent_dff().iter().chain(self.catalog.dependent_txd());
        let written = extract_all(&mut archive, names, &self.config.generic_txd, &self.config.extract_dir)?;
        log::info!("Extracted {} files to {}", written, self.config.extract_dir.display());
        Ok(written)
    }

    /// Load every referenced DFF under the id its model name maps to
    pub fn load_models(&mut self) -> Result<usize> {
        let mut loaded = 0;
        for file in self.catalog.dependent_dff() {
            let model = file.strip_suffix(".dff").unwrap_or(file);
            let Some(id) = self.catalog.model_id(model) else {
                log::warn!("No definition id for DFF '{}', skipping", file);
                continue;
            };
            let path = self.config.extract_dir.join(file);
            log::debug!("Loading DFF: '{}' as {}", path.display(), id);
            if self.meshes.load_dff(id, &path)? {
                loaded += 1;
            }
        }
        log::info!(
            "Meshes: {} loaded, {} vertices, {} indices",
            loaded,
            self.meshes.vertex_count(),
            self.meshes.index_count()
        );
        Ok(loaded)
    }

    /// Load every referenced TXD into the texture buckets
    pub fn load_textures(&mut self) -> Result<usize> {
        let mut added = 0;
        for file in self.catalog.dependent_txd() {
            added += self.textures.load_txd(&self.config.extract_dir.join(file))?;
        }
        log::info!(
            "Textures: {} registered in {} buckets",
            self.textures.texture_count(),
            self.textures.bucket_count()
        );
        Ok(added)
    }

    fn blob_path(&self, kind: BlobKind) -> PathBuf {
        self.config.output_dir.join(kind.file_name())
    }

    fn create_blob(&self, kind: BlobKind) -> Result<BufWriter<File>> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self.blob_path(kind);
        log::info!("Writing {}", path.display());
        Ok(BufWriter::new(File::create(path)?))
    }

    pub fn write_meshes(&self) -> Result<()> {
        let mut w = self.create_blob(BlobKind::Meshes)?;
        write_mesh_blob(&mut w, &self.meshes)?;
        w.flush()?;
        Ok(())
    }

    /// Number the slices and write `texturebuckets.blob`
    pub fn write_textures(&mut self) -> Result<TextureBlobStats> {
        let slices = self.textures.assign_slices();
        let mut w = self.create_blob(BlobKind::TextureBuckets)?;
        self.texture_stats = write_texture_blob(&mut w, &self.textures)?;
        w.flush()?;
        debug_assert_eq!(slices, self.texture_stats.split_count);
        log::info!(
            "Texture slices: {}, largest {} bytes",
            self.texture_stats.split_count,
            self.texture_stats.max_split_bytes
        );
        Ok(self.texture_stats)
    }

    /// Build instances, batch draw calls and write `instances.blob`
    pub fn batch(&mut self) -> Result<usize> {
        let (instances, transforms) = build_instances(self.catalog.placements());
        self.instances = instances;
        self.transforms = transforms;
        let draw_calls = self.batcher.batch(&self.instances, &self.meshes, &self.textures)?;
        log::info!(
            "Batched {} instances ({} transforms) into {} draw calls",
            self.instances.len(),
            self.transforms.len(),
            draw_calls
        );

        let mut w = self.create_blob(BlobKind::Instances)?;
        write_instance_blob(&mut w, &self.transforms)?;
        w.flush()?;
        Ok(draw_calls)
    }

    pub fn write_drawables(&self) -> Result<()> {
        let mut w = self.create_blob(BlobKind::Drawables)?;
        write_drawable_blob(&mut w, &self.batcher)?;
        w.flush()?;
        Ok(())
    }

    pub fn summary(&self) -> BakeSummary {
        BakeSummary {
            definitions: self.catalog.definitions().len(),
            placements: self.catalog.placement_count(),
            meshes: self.meshes.mesh_count(),
            vertices: self.meshes.vertex_count(),
            indices: self.meshes.index_count(),
            buckets: self.textures.bucket_count(),
            textures: self.textures.texture_count(),
            slices: self.texture_stats.split_count,
            max_split_bytes: self.texture_stats.max_split_bytes,
            instances: self.instances.len(),
            draw_calls: self.batcher.len(),
        }
    }

    /// Run every phase after catalog loading
    fn run_phases(&mut self) -> std::result::Result<(), BakeError> {
        self.extract().during(BakePhase::Extraction)?;
        self.load_models().during(BakePhase::Models)?;
        self.load_textures().during(BakePhase::Textures)?;
        self.write_meshes().during(BakePhase::MeshBlob)?;
        self.write_textures().during(BakePhase::TextureBlob)?;
        self.batch().during(BakePhase::Instances)?;
        self.write_drawables().during(BakePhase::Drawables)?;
        Ok(())
    }
}

/// Bake every blob described by `config`
pub fn run(config: &BakeConfig) -> std::result::Result<BakeSummary, BakeError> {
    let start = Instant::now();
    let mut ctx = BakeContext::new(config.clone());
    ctx.load_catalog()?;
    ctx.run_phases()?;

    let summary = ctx.summary();
    log::info!("Bake finished in {:.2}s: {:?}", start.elapsed().as_secs_f64(), summary);
    let path = config.output_dir.join(SUMMARY_FILE);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, json) {
                log::warn!("Failed to write {}: {}", path.display(), e);
            }
        }
        Err(e) => log::warn!("Failed to serialize bake summary: {}", e),
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_archive;
    use crate::blob::{BlobEncoding, read_drawable_blob, read_instance_blob, read_texture_blob};
    use crate::rw::clump::tests::{FixtureSplit, dff_bytes};
    use crate::rw::txd::raster;
    use crate::rw::txd::tests::{FixtureTexture, d3d8_native, txd_bytes};

    fn dxt1_txd(name: &'static str) -> Vec<u8> {
        let data = vec![0x55u8; 128];
        txd_bytes(&[d3d8_native(&FixtureTexture {
            name,
            raster: raster::FORMAT_565,
            width: 16,
            height: 16,
            depth: 16,
            dxt: 1,
            has_alpha: false,
            palette: &[],
            data: &data,
        })])
    }

    /// One zone with a single placed definition, everything on disk under `root`
    fn scene(root: &Path) -> BakeConfig {
        let maps = root.join("maps");
        std::fs::create_dir_all(maps.join("zone")).expect("mkdir");
        std::fs::write(maps.join("generic.ide"), "objs\n1, barrel, generic, 1, 100, 0\nend\n").expect("write");
        std::fs::write(
            maps.join("zone").join("zone.ide"),
            "objs\n7, house, house, 1, 300, 0\n8, LODhouse, house, 1, 300, 0\nend\n",
        )
        .expect("write");
        std::fs::write(
            maps.join("zone").join("zone.ipl"),
            "inst\n7, house, 0, 10, 20, 30, 1, 1, 1, 0, 0, 0, 1\n7, house, 5, 0, 0, 0, 1, 1, 1, 0, 0, 0, 1\nend\n",
        )
        .expect("write");

        let house = dff_bytes(3, true, 1, &[FixtureSplit { texture: "brick", indices: &[0, 1, 2] }]);
        let barrel = dff_bytes(3, false, 1, &[FixtureSplit { texture: "metal", indices: &[2, 1, 0] }]);
        let house_txd = dxt1_txd("brick");
        let models = root.join("models");
        std::fs::create_dir_all(&models).expect("mkdir");
        let (dir, img) = write_archive(
            &models,
            &[
                ("house.dff", house.as_slice()),
                ("barrel.dff", barrel.as_slice()),
                ("house.txd", house_txd.as_slice()),
            ],
        );
        let generic_txd = models.join("generic.txd");
        std::fs::write(&generic_txd, dxt1_txd("metal")).expect("write");

        BakeConfig {
            maps_dir: maps.clone(),
            generic_ide: maps.join("generic.ide"),
            zones: vec!["zone".to_string()],
            img_dir: dir,
            img_archive: img,
            generic_txd,
            extract_dir: root.join("extracted"),
            output_dir: root.join("out"),
            ..BakeConfig::default()
        }
    }

    #[test]
    fn test_exit_codes_follow_phase_order() {
        let codes: Vec<u8> = BakePhase::ALL.iter().map(|p| p.exit_code()).collect();
        assert_eq!(codes, (1..=9).collect::<Vec<u8>>());
    }

    #[test]
    fn test_single_placement_scene() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = scene(dir.path());
        let summary = run(&config).expect("bake failed");

        assert_eq!(summary.definitions, 2);
        assert_eq!(summary.placements, 1);
        assert_eq!(summary.meshes, 2);
        assert_eq!(summary.instances, 1);
        assert_eq!(summary.draw_calls, 1);
        assert_eq!(summary.slices, 1);

        let out = &config.output_dir;
        let read = |kind: BlobKind| std::fs::read(out.join(kind.file_name())).expect("blob missing");
        let drawables = read_drawable_blob(&mut read(BlobKind::Drawables).as_slice(), BlobEncoding::baked())
            .expect("drawables");
        let dc = drawables.draw_calls[0];
        assert_eq!(dc.num_instances, 1);
        assert_eq!(dc.base_instance, 0);
        assert_eq!(dc.num_vertices, 3);
        assert_eq!(dc.texture_array, 1);
        // barrel (id 1) was loaded first, so the house mesh starts after it
        assert_eq!(dc.base_vertex, 3);
        assert_eq!(dc.index_offset, 6);

        let transforms = read_instance_blob(&mut read(BlobKind::Instances).as_slice(), BlobEncoding::baked())
            .expect("instances");
        assert_eq!(transforms.len(), 1);
        assert_eq!(transforms[0].w_axis.truncate(), glam::Vec3::new(10.0, 20.0, 30.0));

        let textures = read_texture_blob(&mut read(BlobKind::TextureBuckets).as_slice(), BlobEncoding::baked())
            .expect("textures");
        assert_eq!(textures.slices[0].layers, 2);

        let json = std::fs::read_to_string(out.join(SUMMARY_FILE)).expect("summary");
        let written: BakeSummary = serde_json::from_str(&json).expect("summary json");
        assert_eq!(written, summary);
    }

    #[test]
    fn test_missing_ide_fails_first_phase() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = scene(dir.path());
        config.generic_ide = dir.path().join("nope.ide");
        let err = run(&config).expect_err("must fail");
        assert_eq!(err.phase, BakePhase::Definitions);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_empty_ipl_fails_placement_phase() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = scene(dir.path());
        std::fs::write(config.zone_ipl("zone"), "inst\nend\n").expect("write");
        let err = run(&config).expect_err("must fail");
        assert_eq!(err.phase, BakePhase::Placements);
    }

    #[test]
    fn test_model_missing_from_archive_fails_dff_phase() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = scene(dir.path());
        let (toc, img) = write_archive(&dir.path().join("models"), &[("house.txd", dxt1_txd("brick").as_slice())]);
        config.img_dir = toc;
        config.img_archive = img;
        let err = run(&config).expect_err("must fail");
        assert_eq!(err.phase, BakePhase::Models);
        assert_eq!(err.exit_code(), 4);
    }
}
