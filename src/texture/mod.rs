//! Texture bucketing.
//!
//! Textures that can share one GPU texture array are grouped into buckets
//! under a 16-bit key: `format class << 8 | width exponent << 4 | height
//! exponent`. Each bucket is later cut into slices of at most
//! `max_layers` textures.

pub mod format;
pub mod slice;

pub use format::{BlockScheme, TextureFormat};
pub use slice::{TextureSlice, pack_slice};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::core::Result;
use crate::rw::{NativeTexture, TextureDictionary, normalize, read_texture_dictionary};

/// Raster pixel format nibble -> format class
pub const FORMAT_CLASS_LUT: [u16; 11] = [0, 5, 2, 4, 1, 6, 3, 0, 0, 0, 2];

/// Texture sizes that can be bucketed; the index is the size exponent
pub const BUCKET_SIZES: [u32; 5] = [16, 32, 64, 128, 256];

/// Format class of a raster format; unknown formats map to 0
pub fn format_class(raster_format: u32) -> u16 {
    let index = ((raster_format >> 8) & 0xF) as usize;
    FORMAT_CLASS_LUT.get(index).copied().unwrap_or(0)
}

/// Exponent of a bucketable texture side length
pub fn size_exponent(size: u32) -> Option<u16> {
    BUCKET_SIZES.iter().position(|&s| s == size).map(|e| e as u16)
}

/// Bucket key of a texture, `None` when its size cannot be bucketed
pub fn bucket_key(tex: &NativeTexture) -> Option<u16> {
    let w = size_exponent(tex.width)?;
    let h = size_exponent(tex.height)?;
    Some(format_class(tex.raster_format) << 8 | w << 4 | h)
}

/// Where a named texture lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub bucket_key: u16,
    /// Index into the bucket's textures
    pub index: u32,
}

/// Textures sharing one bucket key
#[derive(Debug, Clone, Default)]
pub struct TextureBucket {
    pub natives: Vec<NativeTexture>,
    /// Blob ordinal of every slice, filled by [`TextureBuckets::assign_slices`]
    pub slice_handles: Vec<u32>,
}

/// All buckets plus the name registry
#[derive(Debug, Clone)]
pub struct TextureBuckets {
    buckets: BTreeMap<u16, TextureBucket>,
    named: HashMap<String, TextureRef>,
    max_layers: u32,
}

impl TextureBuckets {
    pub fn new(max_layers: u32) -> Self {
        Self {
            buckets: BTreeMap::new(),
            named: HashMap::new(),
            max_layers: max_layers.max(1),
        }
    }

    pub fn max_layers(&self) -> u32 {
        self.max_layers
    }

    /// Normalize and register every named texture of a dictionary.
    ///
    /// Returns how many textures were added.
    pub fn add_dictionary(&mut self, dict: &mut TextureDictionary) -> Result<usize> {
        for tex in dict.textures.iter_mut() {
            normalize(tex)?;
        }

        let mut added = 0;
        for tex in &dict.textures {
            if tex.name.is_empty() {
                continue;
            }
            let Some(key) = bucket_key(tex) else {
                log::warn!(
                    "Texture '{}' has unsupported size {}x{}, skipping",
                    tex.name, tex.width, tex.height
                );
                continue;
            };
            if let Some(existing) = self.named.get(&tex.name) {
                if existing.bucket_key != key {
                    log::warn!(
                        "Texture name conflict '{}'! Bucket keys: {:x} vs {:x}",
                        tex.name, existing.bucket_key, key
                    );
                }
                continue;
            }

            let bucket = self.buckets.entry(key).or_default();
            bucket.natives.push(tex.clone());
            self.named.insert(
                tex.name.clone(),
                TextureRef {
                    bucket_key: key,
                    index: (bucket.natives.len() - 1) as u32,
                },
            );
            added += 1;
        }
        Ok(added)
    }

    /// Read a TXD file and add its textures
    pub fn load_txd(&mut self, path: &Path) -> Result<usize> {
        log::debug!("Loading TXD: '{}'", path.display());
        let data = std::fs::read(path)?;
        let mut dict = read_texture_dictionary(&data)?;
        self.add_dictionary(&mut dict)
    }

    /// Look up a texture by name
    pub fn resolve(&self, name: &str) -> Option<&TextureRef> {
        self.named.get(name)
    }

    pub fn bucket(&self, key: u16) -> Option<&TextureBucket> {
        self.buckets.get(&key)
    }

    /// Buckets in ascending key order
    pub fn buckets(&self) -> impl Iterator<Item = (u16, &TextureBucket)> {
        self.buckets.iter().map(|(k, b)| (*k, b))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn texture_count(&self) -> usize {
        self.named.len()
    }

    /// Number a bucket's slices from 1 in blob order; returns the slice count
    pub fn assign_slices(&mut self) -> u32 {
        let max_layers = self.max_layers as usize;
        let mut next = 0u32;
        for bucket in self.buckets.values_mut() {
            let slices = bucket.natives.len().div_ceil(max_layers);
            bucket.slice_handles = (0..slices)
                .map(|_| {
                    next += 1;
                    next
                })
                .collect();
        }
        next
    }

    /// Pack every slice lazily, in the same order as [`Self::assign_slices`]
    pub fn slices(&self) -> impl Iterator<Item = Result<TextureSlice>> + '_ {
        let max_layers = self.max_layers as usize;
        self.buckets
            .values()
            .flat_map(move |bucket| bucket.natives.chunks(max_layers))
            .map(pack_slice)
    }
}

impl Default for TextureBuckets {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_MAX_ARRAY_TEXTURE_LAYERS)
    }
}
