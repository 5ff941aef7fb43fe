//! Texture dictionary (TXD) decoding for the D3D8, D3D9, Xbox and PS2 native formats

use super::{ChunkReader, chunk};
use crate::core::{Error, Result};

/// Raster format codes and flag bits
pub mod raster {
    /// Pixel format nibble
    pub const MASK: u32 = 0x0F00;
    pub const FORMAT_1555: u32 = 0x0100;
    pub const FORMAT_565: u32 = 0x0200;
    pub const FORMAT_4444: u32 = 0x0300;
    pub const FORMAT_LUM8: u32 = 0x0400;
    pub const FORMAT_8888: u32 = 0x0500;
    pub const FORMAT_888: u32 = 0x0600;
    pub const FORMAT_555: u32 = 0x0A00;
    pub const AUTO_MIPMAP: u32 = 0x1000;
    pub const PAL8: u32 = 0x2000;
    pub const PAL4: u32 = 0x4000;
    pub const MIPMAP: u32 = 0x8000;
    /// PS2 only: every texel and palette block starts with a GS packet header
    pub const PS2_HAS_HEADERS: u32 = 0x2_0000;
}

/// Native platform id of a PS2 texture ("PS2\0")
pub const PLATFORM_ID_PS2: u32 = 0x0032_5350;
pub const PLATFORM_ID_D3D8: u32 = 8;
pub const PLATFORM_ID_D3D9: u32 = 9;
pub const PLATFORM_ID_XBOX: u32 = 5;

/// Size of the GS packet header preceding PS2 texel and palette blocks
const PS2_BLOCK_HEADER: usize = 0x50;

const FOURCC_DXT1: u32 = u32::from_le_bytes(*b"DXT1");
const FOURCC_DXT3: u32 = u32::from_le_bytes(*b"DXT3");
const FOURCC_DXT5: u32 = u32::from_le_bytes(*b"DXT5");

/// Platform a native texture was authored for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    D3d8,
    D3d9,
    Xbox,
    Ps2,
}

impl Platform {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            PLATFORM_ID_D3D8 => Some(Self::D3d8),
            PLATFORM_ID_D3D9 => Some(Self::D3d9),
            PLATFORM_ID_XBOX => Some(Self::Xbox),
            PLATFORM_ID_PS2 => Some(Self::Ps2),
            _ => None,
        }
    }
}

/// One texture of a dictionary
#[derive(Debug, Clone, PartialEq)]
pub struct NativeTexture {
    pub platform: Platform,
    pub name: String,
    pub mask_name: String,
    pub filter_flags: u32,
    pub raster_format: u32,
    pub has_alpha: bool,
    pub width: u32,
    pub height: u32,
    /// Bits per texel as stored
    pub depth: u8,
    pub mipmap_count: u8,
    /// 0 when uncompressed, otherwise the DXT scheme number (1, 3 or 5)
    pub dxt_compression: u8,
    /// RGBA palette entries, empty unless palettized
    pub palette: Vec<u8>,
    /// Texel data per mipmap level
    pub levels: Vec<Vec<u8>>,
}

impl NativeTexture {
    /// The pixel format nibble of the raster format
    pub fn pixel_format(&self) -> u32 {
        self.raster_format & raster::MASK
    }

    pub fn is_palettized(&self) -> bool {
        self.raster_format & (raster::PAL4 | raster::PAL8) != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.dxt_compression != 0
    }

    /// Texel data of the base level
    pub fn base_level(&self) -> &[u8] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A decoded texture dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureDictionary {
    pub device_id: u16,
    pub textures: Vec<NativeTexture>,
}

/// Decode the first texture dictionary of a TXD stream
pub fn read_texture_dictionary(data: &[u8]) -> Result<TextureDictionary> {
    let mut reader = ChunkReader::new(data);
    let (_, mut body) = reader.chunk(chunk::TEXTURE_DICTIONARY)?;

    let (_, mut s) = body.chunk(chunk::STRUCT)?;
    let count = s.u16()?;
    let device_id = s.u16()?;

    let mut textures = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (_, native) = body.chunk(chunk::TEXTURE_NATIVE)?;
        textures.push(read_native(native)?);
    }
    Ok(TextureDictionary { device_id, textures })
}

fn read_native(mut body: ChunkReader<'_>) -> Result<NativeTexture> {
    let (_, mut s) = body.chunk(chunk::STRUCT)?;
    let platform_id = s.u32()?;
    let platform = Platform::from_id(platform_id).ok_or_else(|| {
        Error::RenderWare(format!("unsupported native texture platform 0x{:X}", platform_id))
    })?;
    match platform {
        Platform::D3d8 | Platform::D3d9 => read_d3d(s, platform),
        Platform::Xbox => read_xbox(s),
        Platform::Ps2 => read_ps2(s, body),
    }
}

/// Size of the base level of an uncompressed or DXT texture
fn base_level_size(width: u32, height: u32, depth: u8, dxt: u8) -> usize {
    let (w, h) = (width as usize, height as usize);
    match dxt {
        0 => w * h * depth as usize / 8,
        1 => w.div_ceil(4).max(1) * h.div_ceil(4).max(1) * 8,
        _ => w.div_ceil(4).max(1) * h.div_ceil(4).max(1) * 16,
    }
}

fn palette_size(raster_format: u32) -> usize {
    if raster_format & raster::PAL8 != 0 {
        256 * 4
    } else if raster_format & raster::PAL4 != 0 {
        32 * 4
    } else {
        0
    }
}

fn read_d3d(mut s: ChunkReader<'_>, platform: Platform) -> Result<NativeTexture> {
    let filter_flags = s.u32()?;
    let name = s.fixed_str(32)?;
    let mask_name = s.fixed_str(32)?;
    let raster_format = s.u32()?;
    let format_word = s.u32()?;
    let width = s.u16()? as u32;
    let height = s.u16()? as u32;
    let depth = s.u8()?;
    let mipmap_count = s.u8()?;
    let _raster_type = s.u8()?;
    let last = s.u8()?;

    let (has_alpha, dxt_compression) = match platform {
        Platform::D3d9 => {
            let compressed = last & 0x8 != 0;
            let dxt = match (compressed, format_word) {
                (false, _) => 0,
                (true, FOURCC_DXT1) => 1,
                (true, FOURCC_DXT3) => 3,
                (true, FOURCC_DXT5) => 5,
                (true, other) => {
                    return Err(Error::RenderWare(format!(
                        "texture '{}' uses unsupported D3D9 format 0x{:X}",
                        name, other
                    )));
                }
            };
            (last & 0x1 != 0, dxt)
        }
        _ => (format_word != 0, last),
    };

    let palette = s.take(palette_size(raster_format))?.to_vec();
    let mut levels = Vec::with_capacity(mipmap_count as usize);
    for _ in 0..mipmap_count {
        let size = s.u32()? as usize;
        levels.push(s.take(size)?.to_vec());
    }

    Ok(NativeTexture {
        platform,
        name,
        mask_name,
        filter_flags,
        raster_format,
        has_alpha,
        width,
        height,
        depth,
        mipmap_count,
        dxt_compression,
        palette,
        levels,
    })
}

fn read_xbox(mut s: ChunkReader<'_>) -> Result<NativeTexture> {
    let filter_flags = s.u32()?;
    let name = s.fixed_str(32)?;
    let mask_name = s.fixed_str(32)?;
    let raster_format = s.u32()?;
    let has_alpha = s.u32()? != 0;
    let width = s.u16()? as u32;
    let height = s.u16()? as u32;
    let depth = s.u8()?;
    let mipmap_count = s.u8()?;
    let _raster_type = s.u8()?;
    let dxt_compression = s.u8()?;
    let total_size = s.u32()? as usize;

    let palette = s.take(palette_size(raster_format))?.to_vec();
    let data = s.take(total_size)?;
    // Codes are remapped later, but 0xC is the only 8-byte block scheme
    let block_dxt = match dxt_compression {
        0 => 0,
        0xC => 1,
        _ => 3,
    };
    let base = base_level_size(width, height, depth, block_dxt).min(data.len());

    Ok(NativeTexture {
        platform: Platform::Xbox,
        name,
        mask_name,
        filter_flags,
        raster_format,
        has_alpha,
        width,
        height,
        depth,
        mipmap_count,
        dxt_compression,
        palette,
        levels: vec![data[..base].to_vec()],
    })
}

fn read_ps2(mut s: ChunkReader<'_>, mut body: ChunkReader<'_>) -> Result<NativeTexture> {
    let filter_flags = s.u32()?;
    let name = body.string_chunk()?;
    let mask_name = body.string_chunk()?;

    let (_, mut raster_chunk) = body.chunk(chunk::STRUCT)?;
    let (_, mut header) = raster_chunk.chunk(chunk::STRUCT)?;
    let width = header.u32()?;
    let height = header.u32()?;
    let depth = header.u32()? as u8;
    let raster_format = header.u32()?;
    // GS registers
    header.skip(8 * 4)?;
    let texel_size = header.u32()? as usize;
    let palette_data_size = header.u32()? as usize;

    let (_, mut data) = raster_chunk.chunk(chunk::STRUCT)?;
    let mut texels = data.take(texel_size)?;
    let mut palette = data.take(palette_data_size)?;
    if raster_format & raster::PS2_HAS_HEADERS != 0 {
        texels = texels.get(PS2_BLOCK_HEADER..).unwrap_or(&[]);
        palette = palette.get(PS2_BLOCK_HEADER..).unwrap_or(&[]);
    }

    let base = base_level_size(width, height, depth, 0);
    if texels.len() < base {
        return Err(Error::RenderWare(format!(
            "PS2 texture '{}' holds {} texel bytes, expected {}",
            name,
            texels.len(),
            base
        )));
    }
    let entries = if raster_format & raster::PAL8 != 0 {
        256
    } else if raster_format & raster::PAL4 != 0 {
        16
    } else {
        0
    };
    let palette = palette[..palette.len().min(entries * 4)].to_vec();
    let has_alpha = matches!(
        raster_format & raster::MASK,
        raster::FORMAT_1555 | raster::FORMAT_4444 | raster::FORMAT_8888
    );

    Ok(NativeTexture {
        platform: Platform::Ps2,
        name,
        mask_name,
        filter_flags,
        raster_format,
        has_alpha,
        width,
        height,
        depth,
        mipmap_count: 1,
        dxt_compression: 0,
        palette,
        levels: vec![texels[..base].to_vec()],
    })
}

impl TextureDictionary {
    /// Find a texture by name
    pub fn find(&self, name: &str) -> Option<&NativeTexture> {
        self.textures.iter().find(|t| t.name == name)
    }
}
