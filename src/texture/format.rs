//! GPU texture formats of baked slices

use crate::core::{Error, Result};
use crate::rw::NativeTexture;
use crate::rw::txd::raster;

/// OpenGL enum values written to `texturebuckets.blob`
pub mod gl {
    pub const RGB: u32 = 0x1907;
    pub const RGBA: u32 = 0x1908;
    pub const COMPRESSED_RGB_S3TC_DXT1: u32 = 0x83F0;
    pub const COMPRESSED_RGBA_S3TC_DXT1: u32 = 0x83F1;
    pub const COMPRESSED_RGBA_S3TC_DXT3: u32 = 0x83F2;
    pub const COMPRESSED_RGBA_S3TC_DXT5: u32 = 0x83F3;
}

/// S3TC block compression scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockScheme {
    Dxt1Rgb,
    Dxt1Rgba,
    Dxt3,
    Dxt5,
}

/// Pixel format of a texture array slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit channels, RGB or RGBA
    Uncompressed { bytes_per_pixel: u8, alpha: bool },
    BlockCompressed(BlockScheme),
}

impl TextureFormat {
    pub const RGB: Self = Self::Uncompressed { bytes_per_pixel: 3, alpha: false };
    pub const RGBA: Self = Self::Uncompressed { bytes_per_pixel: 4, alpha: true };

    /// Pick the slice format for a (normalized) texture
    pub fn for_texture(tex: &NativeTexture) -> Result<Self> {
        let unsupported = || {
            Error::Texture(format!(
                "texture '{}' has unsupported format: raster 0x{:X}, DXT{}",
                tex.name, tex.raster_format, tex.dxt_compression
            ))
        };
        let format = match (tex.pixel_format(), tex.dxt_compression) {
            (raster::FORMAT_1555, 1) => Self::BlockCompressed(BlockScheme::Dxt1Rgba),
            (raster::FORMAT_565, 1) => Self::BlockCompressed(BlockScheme::Dxt1Rgb),
            (raster::FORMAT_4444, 3) => Self::BlockCompressed(BlockScheme::Dxt3),
            (raster::FORMAT_888 | raster::FORMAT_8888, 5) => Self::BlockCompressed(BlockScheme::Dxt5),
            (raster::FORMAT_888 | raster::FORMAT_8888, 0) => {
                if tex.has_alpha || tex.is_palettized() {
                    Self::RGBA
                } else {
                    Self::RGB
                }
            }
            _ => return Err(unsupported()),
        };
        Ok(format)
    }

    /// OpenGL internal format enum
    pub fn gl_code(&self) -> u32 {
        match self {
            Self::Uncompressed { bytes_per_pixel: 3, .. } => gl::RGB,
            Self::Uncompressed { .. } => gl::RGBA,
            Self::BlockCompressed(BlockScheme::Dxt1Rgb) => gl::COMPRESSED_RGB_S3TC_DXT1,
            Self::BlockCompressed(BlockScheme::Dxt1Rgba) => gl::COMPRESSED_RGBA_S3TC_DXT1,
            Self::BlockCompressed(BlockScheme::Dxt3) => gl::COMPRESSED_RGBA_S3TC_DXT3,
            Self::BlockCompressed(BlockScheme::Dxt5) => gl::COMPRESSED_RGBA_S3TC_DXT5,
        }
    }

    pub fn from_gl_code(code: u32) -> Option<Self> {
        match code {
            gl::RGB => Some(Self::RGB),
            gl::RGBA => Some(Self::RGBA),
            gl::COMPRESSED_RGB_S3TC_DXT1 => Some(Self::BlockCompressed(BlockScheme::Dxt1Rgb)),
            gl::COMPRESSED_RGBA_S3TC_DXT1 => Some(Self::BlockCompressed(BlockScheme::Dxt1Rgba)),
            gl::COMPRESSED_RGBA_S3TC_DXT3 => Some(Self::BlockCompressed(BlockScheme::Dxt3)),
            gl::COMPRESSED_RGBA_S3TC_DXT5 => Some(Self::BlockCompressed(BlockScheme::Dxt5)),
            _ => None,
        }
    }

    /// Short name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uncompressed { bytes_per_pixel: 3, .. } => "RGB",
            Self::Uncompressed { .. } => "RGBA",
            Self::BlockCompressed(BlockScheme::Dxt1Rgb) => "RGB_DXT1",
            Self::BlockCompressed(BlockScheme::Dxt1Rgba) => "RGBA_DXT1",
            Self::BlockCompressed(BlockScheme::Dxt3) => "RGBA_DXT3",
            Self::BlockCompressed(BlockScheme::Dxt5) => "RGBA_DXT5",
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::BlockCompressed(_))
    }
}
