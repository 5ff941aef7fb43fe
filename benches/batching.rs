use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, Criterion, black_box};

use vcbake::batch::{build_instances, DrawCallBatcher, SortKey};
use vcbake::catalog::ItemPlacement;
use vcbake::mesh::MeshBuffers;
use vcbake::rw::txd::raster;
use vcbake::rw::{Clump, Geometry, GeometryFlags, Material, NativeTexture, Platform, Split, TextureDictionary};
use vcbake::texture::TextureBuckets;

use glam::{Quat, Vec2, Vec3};

const DEFINITIONS: u32 = 2000;
const TEXTURES: u32 = 512;

fn clump(id: u32) -> Clump {
    let vertex_count = 24u32;
    let materials: Vec<Material> = (0..3)
        .map(|m| Material {
            color: [255; 4],
            texture_name: format!("tex{}", (id * 3 + m) % TEXTURES),
            mask_name: String::new(),
        })
        .collect();
    let splits = (0..3)
        .map(|m| Split {
            material_index: m,
            indices: (0..12).map(|i| (i + m * 4) % vertex_count).collect(),
        })
        .collect();
    Clump {
        atomic_count: 1,
        geometries: vec![Geometry {
            flags: GeometryFlags::POSITIONS | GeometryFlags::TEXTURED,
            vertex_count,
            uv_sets: vec![vec![Vec2::ZERO; vertex_count as usize]],
            positions: (0..vertex_count).map(|i| Vec3::splat(i as f32)).collect(),
            materials,
            splits,
            ..Default::default()
        }],
    }
}

fn textures() -> TextureBuckets {
    let natives = (0..TEXTURES)
        .map(|i| NativeTexture {
            platform: Platform::D3d8,
            name: format!("tex{}", i),
            mask_name: String::new(),
            filter_flags: 0,
            raster_format: if i % 2 == 0 { raster::FORMAT_565 } else { raster::FORMAT_1555 },
            has_alpha: false,
            width: 64,
            height: 64,
            depth: 16,
            mipmap_count: 1,
            dxt_compression: 1,
            palette: Vec::new(),
            levels: vec![vec![0; 2048]],
        })
        .collect();
    let mut buckets = TextureBuckets::new(64);
    buckets
        .add_dictionary(&mut TextureDictionary { device_id: 0, textures: natives })
        .expect("textures");
    buckets.assign_slices();
    buckets
}

fn scene() -> (BTreeMap<u32, Vec<ItemPlacement>>, MeshBuffers, TextureBuckets) {
    let mut meshes = MeshBuffers::new();
    let mut placements = BTreeMap::new();
    for id in 1..=DEFINITIONS {
        meshes.extract(id, &clump(id)).expect("extract");
        let group = (0..(id % 7 + 1))
            .map(|n| ItemPlacement::new(id, "m", 0, Vec3::new(n as f32, id as f32, 0.0), Vec3::ONE, Quat::IDENTITY))
            .collect();
        placements.insert(id, group);
    }
    (placements, meshes, textures())
}

fn bench_sort_key_pack(c: &mut Criterion) {
    c.bench_function("sort_key_pack_unpack", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for id in 0..1024u32 {
                let key = SortKey::try_pack(black_box(0x622), id & 0xFF, id * 6, id & 7).expect("pack");
                acc ^= key.value() ^ key.unpack().id as u64;
            }
            acc
        });
    });
}

fn bench_build_instances(c: &mut Criterion) {
    let (placements, _, _) = scene();

    c.bench_function("build_instances_2000", |b| {
        b.iter(|| build_instances(black_box(&placements)));
    });
}

fn bench_batch(c: &mut Criterion) {
    let (placements, meshes, textures) = scene();
    let (instances, _) = build_instances(&placements);

    c.bench_function("batch_2000_definitions", |b| {
        b.iter(|| {
            let mut batcher = DrawCallBatcher::new();
            batcher
                .batch(black_box(&instances), &meshes, &textures)
                .expect("batch")
        });
    });
}

criterion_group!(benches, bench_sort_key_pack, bench_build_instances, bench_batch);
criterion_main!(benches);
