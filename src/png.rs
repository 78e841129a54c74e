use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::compose::Canvas;
use crate::palette::Palette;
use crate::{MzpError, MzpErrorCode, Result};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const BIT_DEPTH: u8 = 8;
// No prediction filter is ever applied; every scanline is prefixed with the
// "none" filter type.
const FILTER_NONE: u8 = 0;

/// PNG color modes the extractor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Indexed,
    Rgb,
    Rgba,
}

impl ColorMode {
    fn code(self) -> u8 {
        match self {
            Self::Indexed => 3,
            Self::Rgb => 2,
            Self::Rgba => 6,
        }
    }
}

/// Serializes the canvas as a PNG stream: signature, `IHDR`, palette chunks
/// for indexed output, one zlib-compressed `IDAT`, and `IEND`. Indexed mode
/// requires the shared palette.
pub fn write_png<W: Write>(
    writer: &mut W,
    canvas: &Canvas,
    color: ColorMode,
    palette: Option<&Palette>,
) -> Result<()> {
    writer
        .write_all(&PNG_SIGNATURE)
        .map_err(write_failed)?;

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(canvas.width() as u32).to_be_bytes());
    ihdr.extend_from_slice(&(canvas.height() as u32).to_be_bytes());
    ihdr.push(BIT_DEPTH);
    ihdr.push(color.code());
    ihdr.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
    write_chunk(writer, b"IHDR", &ihdr)?;

    if color == ColorMode::Indexed {
        let palette = palette.ok_or_else(|| {
            MzpError::new(
                MzpErrorCode::InvalidHeader,
                "Indexed output requires a palette.",
            )
        })?;
        write_chunk(writer, b"PLTE", palette.rgb())?;
        write_chunk(writer, b"tRNS", palette.alpha())?;
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for row in canvas.rows() {
        encoder.write_all(&[FILTER_NONE]).map_err(|err| {
            MzpError::new(
                MzpErrorCode::Io,
                format!("Could not compress image data: {err}"),
            )
        })?;
        encoder.write_all(row).map_err(|err| {
            MzpError::new(
                MzpErrorCode::Io,
                format!("Could not compress image data: {err}"),
            )
        })?;
    }
    let image_data = encoder.finish().map_err(|err| {
        MzpError::new(
            MzpErrorCode::Io,
            format!("Could not finish zlib stream: {err}"),
        )
    })?;
    write_chunk(writer, b"IDAT", &image_data)?;

    write_chunk(writer, b"IEND", &[])
}

/// One chunk: big-endian data length, 4-byte type, data, then the CRC32 of
/// type and data (ISO-3309 polynomial, big-endian).
fn write_chunk<W: Write>(writer: &mut W, kind: &[u8; 4], data: &[u8]) -> Result<()> {
    writer
        .write_all(&(data.len() as u32).to_be_bytes())
        .map_err(write_failed)?;
    writer.write_all(kind).map_err(write_failed)?;
    writer.write_all(data).map_err(write_failed)?;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    writer
        .write_all(&hasher.finalize().to_be_bytes())
        .map_err(write_failed)
}

fn write_failed(err: std::io::Error) -> MzpError {
    MzpError::new(
        MzpErrorCode::Io,
        format!("Could not write PNG stream: {err}"),
    )
}
