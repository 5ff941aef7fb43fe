//! Blob transcoding between byte orders.
//!
//! Every blob kind is described by a [`BlobLayout`]: a number of leading
//! `u32` header words followed by segments whose lengths are read from the
//! header. The transcoder walks the layout, swaps every typed word into the
//! target order and applies the per-segment post steps. Record counts and
//! record order are never changed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use glam::Mat4;

use super::{BlobEncoding, BlobKind, Endian, TranscodeOptions, read_payload};
use crate::core::{Error, Result};
use crate::texture::TextureFormat;
use crate::texture::format::gl;

/// Word type of an array segment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Word {
    U16,
    U32,
    U64,
    F32,
}

impl Word {
    pub fn size(self) -> usize {
        match self {
            Word::U16 => 2,
            Word::U32 | Word::F32 => 4,
            Word::U64 => 8,
        }
    }
}

/// Per-element rewrite applied after swapping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostStep {
    None,
    /// Elements are 4x4 `f32` matrices; transpose them when enabled
    Transpose4x4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    /// `header[count_word] * per_element` words of one type
    Array {
        count_word: usize,
        word: Word,
        per_element: usize,
        post: PostStep,
    },
    /// `header[count_word]` texture split records with sized payloads
    TextureRecords { count_word: usize, max_bytes_word: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobLayout {
    pub header_words: usize,
    pub segments: Vec<Segment>,
}

impl BlobLayout {
    pub fn of(kind: BlobKind) -> Self {
        let array = |count_word, word, per_element| Segment::Array {
            count_word,
            word,
            per_element,
            post: PostStep::None,
        };
        match kind {
            BlobKind::TextureBuckets => Self {
                header_words: 2,
                segments: vec![Segment::TextureRecords { count_word: 0, max_bytes_word: 1 }],
            },
            BlobKind::Meshes => Self {
                header_words: 2,
                segments: vec![
                    array(1, Word::U16, 1),
                    array(0, Word::F32, 3),
                    // RGBA8 color swapped as a single word
                    array(0, Word::U32, 1),
                    array(0, Word::F32, 4),
                ],
            },
            BlobKind::Instances => Self {
                header_words: 1,
                segments: vec![Segment::Array {
                    count_word: 0,
                    word: Word::F32,
                    per_element: 16,
                    post: PostStep::Transpose4x4,
                }],
            },
            BlobKind::Drawables => Self {
                header_words: 1,
                segments: vec![array(0, Word::U64, 1), array(0, Word::U32, 7)],
            },
        }
    }
}

/// What a transcoding run saw
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranscodeReport {
    /// Header words as read from the input
    pub header: Vec<u32>,
    /// Texture records rewritten from RGB to RGBA
    pub expanded_rgb: usize,
    /// Final value of the texture blob's maximum split size
    pub max_split_bytes: Option<u32>,
}

fn header_word(header: &[u32], index: usize) -> Result<u32> {
    header
        .get(index)
        .copied()
        .ok_or_else(|| Error::Blob(format!("layout references header word {} of {}", index, header.len())))
}

/// Transcode one blob from `input` to `output`
pub fn transcode<R: Read, W: Write + Seek>(
    kind: BlobKind,
    input: &mut R,
    output: &mut W,
    options: &TranscodeOptions,
) -> Result<TranscodeReport> {
    let layout = BlobLayout::of(kind);
    let source = options.source_encoding();
    let target = options.target_encoding();
    let start = output.stream_position()?;

    let mut report = TranscodeReport::default();
    for _ in 0..layout.header_words {
        let word = source.endian.read_u32(input)?;
        target.endian.write_u32(output, word)?;
        report.header.push(word);
    }
    log::info!("{}: header {:?}", kind.file_name(), report.header);

    for segment in &layout.segments {
        match *segment {
            Segment::Array { count_word, word, per_element, post } => {
                let elements = header_word(&report.header, count_word)? as usize;
                let len = elements
                    .checked_mul(per_element * word.size())
                    .ok_or_else(|| Error::Blob(format!("segment of {} elements overflows", elements)))?;
                let bytes = read_payload(input, len, source)?;
                let transpose = post == PostStep::Transpose4x4 && options.transpose_matrices;
                output.write_all(&swap_array(&bytes, word, source.endian, target.endian, transpose))?;
            }
            Segment::TextureRecords { count_word, max_bytes_word } => {
                let records = header_word(&report.header, count_word)?;
                let mut max_bytes = header_word(&report.header, max_bytes_word)?;
                for index in 0..records {
                    let grown = transcode_texture_record(index, input, output, source, target, options)?;
                    if let Some(size) = grown {
                        report.expanded_rgb += 1;
                        if size > max_bytes {
                            max_bytes = size;
                            patch_word(output, start + 4 * max_bytes_word as u64, size, target.endian)?;
                        }
                    }
                }
                report.max_split_bytes = Some(max_bytes);
            }
        }
    }
    Ok(report)
}

fn swap_array(bytes: &[u8], word: Word, from: Endian, to: Endian, transpose: bool) -> Vec<u8> {
    match word {
        Word::U16 => to.encode_u16s(&from.decode_u16s(bytes)),
        Word::U32 => to.encode_u32s(&from.decode_u32s(bytes)),
        Word::U64 => to.encode_u64s(&from.decode_u64s(bytes)),
        Word::F32 => {
            let mut floats = from.decode_f32s(bytes);
            if transpose {
                for m in floats.chunks_exact_mut(16) {
                    Mat4::from_cols_slice(m).transpose().write_cols_to_slice(m);
                }
            }
            to.encode_f32s(&floats)
        }
    }
}

fn patch_word<W: Write + Seek>(output: &mut W, at: u64, value: u32, endian: Endian) -> Result<()> {
    let here = output.stream_position()?;
    output.seek(SeekFrom::Start(at))?;
    endian.write_u32(output, value)?;
    output.seek(SeekFrom::Start(here))?;
    Ok(())
}

/// Copy one split record; returns the new byte size if it was expanded to RGBA
fn transcode_texture_record<R: Read, W: Write>(
    index: u32,
    input: &mut R,
    output: &mut W,
    source: BlobEncoding,
    target: BlobEncoding,
    options: &TranscodeOptions,
) -> Result<Option<u32>> {
    let format = source.endian.read_u32(input)?;
    let mut dims = [0i32; 4];
    for d in dims.iter_mut() {
        *d = source.endian.read_i32(input)?;
    }
    let [width, height, layers, size] = dims;
    if dims.iter().any(|&d| d < 0) {
        return Err(Error::Blob(format!(
            "split {} has negative dimensions {}x{}x{} ({} bytes)",
            index, width, height, layers, size
        )));
    }
    let data = read_payload(input, size as usize, source)?;
    log::debug!(
        "split {}: {} {}x{}x{} ({} bytes)",
        index,
        TextureFormat::from_gl_code(format).map_or("unknown", |f| f.name()),
        width,
        height,
        layers,
        size
    );

    if !(options.expand_rgb && format == gl::RGB) {
        target.endian.write_u32(output, format)?;
        for d in dims {
            target.endian.write_i32(output, d)?;
        }
        output.write_all(&data)?;
        return Ok(None);
    }

    let texels = width as usize * height as usize * layers as usize;
    if data.len() != texels * 3 {
        return Err(Error::Blob(format!(
            "RGB split {} holds {} bytes, expected {}",
            index,
            data.len(),
            texels * 3
        )));
    }
    let rgba: Vec<u8> = data
        .chunks_exact(3)
        .flat_map(|px| [0xFF, px[2], px[1], px[0]])
        .collect();
    let new_size = i32::try_from(rgba.len())
        .map_err(|_| Error::Blob(format!("RGBA split {} is too large ({} bytes)", index, rgba.len())))?;

    target.endian.write_u32(output, gl::RGBA)?;
    for d in [width, height, layers, new_size] {
        target.endian.write_i32(output, d)?;
    }
    output.write_all(&rgba)?;
    Ok(Some(new_size as u32))
}

/// Transcode the blob at `input` into a new file at `output`
pub fn transcode_file(kind: BlobKind, input: &Path, output: &Path, options: &TranscodeOptions) -> Result<TranscodeReport> {
    log::info!("Transcoding {} -> {}", input.display(), output.display());
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let report = transcode(kind, &mut reader, &mut writer, options)?;
    writer.flush()?;

    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? > 0 {
        log::warn!("{} has trailing bytes after its last segment", input.display());
    }
    Ok(report)
}
