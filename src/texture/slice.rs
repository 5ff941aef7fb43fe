//! Packing bucket textures into texture array slices

use super::format::TextureFormat;
use crate::core::{Error, Result};
use crate::rw::NativeTexture;

/// Pixel data of one texture array, ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSlice {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    /// `layers` consecutive base levels
    pub data: Vec<u8>,
}

impl TextureSlice {
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

/// Pack `textures` into one slice described by the first texture.
///
/// Every texture must agree with the first on size, compression, alpha and
/// pixel format; anything else means textures were bucketed wrongly.
pub fn pack_slice(textures: &[NativeTexture]) -> Result<TextureSlice> {
    let rep = textures
        .first()
        .ok_or_else(|| Error::Texture("cannot pack an empty slice".to_string()))?;
    let format = TextureFormat::for_texture(rep)?;
    let texels = (rep.width * rep.height) as usize;
    let layer_size = match format {
        TextureFormat::BlockCompressed(_) => rep.base_level().len(),
        TextureFormat::Uncompressed { bytes_per_pixel, .. } => texels * bytes_per_pixel as usize,
    };

    let mut data = Vec::with_capacity(layer_size * textures.len());
    for tex in textures {
        check_compatible(rep, tex)?;
        match format {
            TextureFormat::BlockCompressed(_) => {
                if tex.base_level().len() != layer_size {
                    return Err(Error::Texture(format!(
                        "texture '{}' holds {} compressed bytes, slice expects {}",
                        tex.name,
                        tex.base_level().len(),
                        layer_size
                    )));
                }
                data.extend_from_slice(tex.base_level());
            }
            TextureFormat::Uncompressed { bytes_per_pixel, .. } => {
                let pixels = if tex.is_palettized() {
                    expand_palette(tex, texels)?
                } else {
                    repack(tex, texels, bytes_per_pixel as usize)?
                };
                if pixels.len() != layer_size {
                    return Err(Error::Texture(format!(
                        "texture '{}' packs to {} bytes, slice expects {}",
                        tex.name,
                        pixels.len(),
                        layer_size
                    )));
                }
                data.extend_from_slice(&pixels);
            }
        }
    }

    Ok(TextureSlice {
        format,
        width: rep.width,
        height: rep.height,
        layers: textures.len() as u32,
        data,
    })
}

fn check_compatible(rep: &NativeTexture, tex: &NativeTexture) -> Result<()> {
    let mismatch = |what: &str| {
        Err(Error::Texture(format!(
            "texture '{}' differs from slice representative '{}' in {}",
            tex.name, rep.name, what
        )))
    };
    if tex.width != rep.width || tex.height != rep.height {
        return mismatch("size");
    }
    if tex.dxt_compression != rep.dxt_compression {
        return mismatch("compression");
    }
    if tex.has_alpha != rep.has_alpha {
        return mismatch("alpha");
    }
    if tex.pixel_format() != rep.pixel_format() {
        return mismatch("raster format");
    }
    Ok(())
}

/// Resolve palette indices through the texture's own palette to RGBA
fn expand_palette(tex: &NativeTexture, texels: usize) -> Result<Vec<u8>> {
    let indices = tex.base_level();
    if indices.len() < texels {
        return Err(Error::Texture(format!(
            "palettized texture '{}' has {} of {} indices",
            tex.name,
            indices.len(),
            texels
        )));
    }
    let mut out = Vec::with_capacity(texels * 4);
    for &index in &indices[..texels] {
        let at = index as usize * 4;
        let entry = tex.palette.get(at..at + 4).ok_or_else(|| {
            Error::Texture(format!("texture '{}' indexes past its palette ({})", tex.name, index))
        })?;
        out.extend_from_slice(entry);
    }
    Ok(out)
}

/// Convert direct-color texels to `bytes_per_pixel` (3 or 4) channels
fn repack(tex: &NativeTexture, texels: usize, bytes_per_pixel: usize) -> Result<Vec<u8>> {
    let src = tex.base_level();
    let src_bpp = (tex.depth as usize / 8).max(1);
    if src.len() < texels * src_bpp {
        return Err(Error::Texture(format!(
            "texture '{}' has {} texel bytes, expected {}",
            tex.name,
            src.len(),
            texels * src_bpp
        )));
    }
    let src = &src[..texels * src_bpp];
    let out = match (src_bpp, bytes_per_pixel) {
        (a, b) if a == b => src.to_vec(),
        (4, 3) => src.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect(),
        (3, 4) => src.chunks_exact(3).flat_map(|px| [px[0], px[1], px[2], 0xFF]).collect(),
        _ => {
            return Err(Error::Texture(format!(
                "texture '{}' has {}-bit texels, cannot pack as {} bytes per pixel",
                tex.name, tex.depth, bytes_per_pixel
            )));
        }
    };
    Ok(out)
}
