//! Normalization of console texture encodings to the PC (D3D8) layout.
//!
//! After normalization a texture has linear texel order, one palette index
//! per byte, PC DXT numbering and full-range alpha. Normalized textures are
//! tagged `Platform::D3d8`, so normalizing twice is a no-op.

use super::txd::{NativeTexture, Platform, raster};
use crate::core::{Error, Result};
use crate::math::unswizzle_2d;

/// Bring a texture of any supported platform to the PC layout
pub fn normalize(tex: &mut NativeTexture) -> Result<()> {
    match tex.platform {
        Platform::D3d8 | Platform::D3d9 => unpack_pal4(tex),
        Platform::Xbox => convert_from_xbox(tex)?,
        Platform::Ps2 => convert_from_ps2(tex),
    }
    Ok(())
}

/// Spread two 4-bit palette indices per byte (low nibble first) to one per byte
fn unpack_pal4(tex: &mut NativeTexture) {
    if tex.raster_format & raster::PAL4 == 0 {
        return;
    }
    let texels = (tex.width * tex.height) as usize;
    let Some(level) = tex.levels.first_mut() else {
        return;
    };
    if level.len() >= texels {
        return;
    }
    let unpacked: Vec<u8> = level.iter().flat_map(|b| [b & 0x0F, b >> 4]).take(texels).collect();
    *level = unpacked;
    tex.depth = 8;
}

fn convert_from_xbox(tex: &mut NativeTexture) -> Result<()> {
    tex.dxt_compression = match tex.dxt_compression {
        0 => 0,
        0x0C => 1,
        0x0D | 0x0E => 3,
        0x0F | 0x10 => 5,
        other => {
            return Err(Error::RenderWare(format!(
                "Xbox texture '{}' uses unknown compression 0x{:X}",
                tex.name, other
            )));
        }
    };
    unpack_pal4(tex);
    if tex.dxt_compression == 0 {
        let bytes_per_texel = (tex.depth as usize / 8).max(1);
        if let Some(level) = tex.levels.first_mut() {
            *level = unswizzle_2d(level, tex.width, tex.height, bytes_per_texel);
        }
    }
    tex.platform = Platform::D3d8;
    Ok(())
}

/// Rescale PS2 alpha (0..=128) to 0..=255
fn rescale_alpha(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        px[3] = (px[3] as u16 * 2).min(255) as u8;
    }
}

/// Undo the CSM1 palette layout: entries 8..16 and 16..24 of every 32 are swapped
fn unswizzle_palette(palette: &mut [u8]) {
    for block in palette.chunks_exact_mut(32 * 4) {
        let (low, high) = block.split_at_mut(16 * 4);
        low[8 * 4..16 * 4].swap_with_slice(&mut high[..8 * 4]);
    }
}

fn convert_from_ps2(tex: &mut NativeTexture) {
    unpack_pal4(tex);
    if tex.raster_format & raster::PAL8 != 0 {
        unswizzle_palette(&mut tex.palette);
    }
    if tex.is_palettized() {
        rescale_alpha(&mut tex.palette);
    } else if tex.depth == 32 {
        if let Some(level) = tex.levels.first_mut() {
            rescale_alpha(level);
        }
    }
    tex.raster_format &= !raster::PS2_HAS_HEADERS;
    tex.platform = Platform::D3d8;
}
