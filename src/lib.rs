//! Extractor for MZP tiled-bitmap containers.
//!
//! An MZP image is a 16-byte grid descriptor, an optional shared palette,
//! and a row-major grid of independently compressed tiles. This crate parses
//! the descriptor, decodes every tile into canonical pixels, stitches the
//! crop-trimmed scanlines into one canvas, and serializes the result as a
//! PNG. The tile decompression codec is supplied by the caller through the
//! [`Decompress`] trait.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;

mod common;
mod compose;
mod consts;
mod header;
mod palette;
mod png;
mod tile;

pub use compose::{compose, Canvas, DroppedScanline, OverflowPolicy};
pub use consts::{BITMAP_HEADER_LENGTH, PALETTE_SLOTS, TILE_RECORD_HEADER_LENGTH};
pub use header::{BitmapHeader, PaletteLayout, PixelFormat};
pub use palette::{expand_alpha, Palette};
pub use png::{write_png, ColorMode};
pub use tile::{decode_tile, Decompress};

use consts::PALETTE_ENTRY_LENGTH;

/// One slot of the container's entry table. Slot 0 holds the bitmap header
/// and palette; the remaining slots are tiles in row-major grid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileEntry {
    pub offset: u64,
    pub byte_length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MzpErrorCode {
    UnknownBitmapType,
    UnknownBitmapDepth,
    UnsupportedFormat,
    InvalidHeader,
    DecodeFailed,
    StitchOverflow,
    Io,
}

impl MzpErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownBitmapType => "UNKNOWN_BITMAP_TYPE",
            Self::UnknownBitmapDepth => "UNKNOWN_BITMAP_DEPTH",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::InvalidHeader => "INVALID_HEADER",
            Self::DecodeFailed => "DECODE_FAILED",
            Self::StitchOverflow => "STITCH_OVERFLOW",
            Self::Io => "IO",
        }
    }
}

impl fmt::Display for MzpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MzpError {
    pub code: MzpErrorCode,
    pub message: String,
}

impl MzpError {
    pub fn new(code: MzpErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for MzpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MzpError {}

pub type Result<T> = std::result::Result<T, MzpError>;

/// Pipeline configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub overflow: OverflowPolicy,
}

/// Result of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub header: BitmapHeader,
    pub format: PixelFormat,
    /// The complete PNG stream.
    pub png: Vec<u8>,
    /// Scanlines discarded under [`OverflowPolicy::DropAndReport`]; empty on
    /// a clean run.
    pub dropped_scanlines: Vec<DroppedScanline>,
}

/// Runs the full pipeline over one container: header, palette, tiles,
/// canvas, PNG. `entries` is the container's entry table with the header
/// entry still in slot 0; the first fatal error aborts the run.
pub fn extract_to_png<R, D>(
    source: &mut R,
    entries: &[TileEntry],
    decompressor: &D,
    options: &ExtractOptions,
) -> Result<ExtractedImage>
where
    R: Read + Seek,
    D: Decompress,
{
    let Some((header_entry, tiles)) = entries.split_first() else {
        return Err(MzpError::new(
            MzpErrorCode::InvalidHeader,
            "Entry table is empty.",
        ));
    };

    source
        .seek(SeekFrom::Start(header_entry.offset))
        .map_err(|err| {
            MzpError::new(
                MzpErrorCode::Io,
                format!("Could not seek to the header entry: {err}"),
            )
        })?;
    let mut header_bytes = [0_u8; BITMAP_HEADER_LENGTH];
    source.read_exact(&mut header_bytes).map_err(|err| {
        MzpError::new(
            MzpErrorCode::Io,
            format!("Could not read the bitmap header: {err}"),
        )
    })?;

    let header = BitmapHeader::parse(&header_bytes)?;
    let format = PixelFormat::from_header(&header)?;
    debug!(
        "MZP format: {}x{} in {}x{} tiles of {}x{}, type=0x{:02X} depth=0x{:02X} crop={} -> {:?}",
        header.width,
        header.height,
        header.tile_x_count,
        header.tile_y_count,
        header.tile_width,
        header.tile_height,
        header.bmp_type,
        header.bmp_depth,
        header.tile_crop,
        format
    );

    if tiles.len() != header.tile_count() {
        return Err(MzpError::new(
            MzpErrorCode::InvalidHeader,
            format!(
                "Entry table holds {} tiles, grid declares {}.",
                tiles.len(),
                header.tile_count()
            ),
        ));
    }

    // The shared palette immediately follows the header within entry 0.
    let palette = match format.palette() {
        Some((layout, palette_count)) => {
            let mut palette_bytes = vec![0_u8; palette_count * PALETTE_ENTRY_LENGTH];
            source.read_exact(&mut palette_bytes).map_err(|err| {
                MzpError::new(
                    MzpErrorCode::Io,
                    format!("Could not read the shared palette: {err}"),
                )
            })?;
            Some(Palette::build(&palette_bytes, layout, palette_count)?)
        }
        None => None,
    };

    let (canvas, dropped_scanlines) =
        compose(source, tiles, &header, format, decompressor, options.overflow)?;

    let color = if format.is_indexed() {
        ColorMode::Indexed
    } else if format.bytes_per_pixel() == 4 {
        ColorMode::Rgba
    } else {
        ColorMode::Rgb
    };

    let mut png = Vec::new();
    write_png(&mut png, &canvas, color, palette.as_ref())?;

    Ok(ExtractedImage {
        header,
        format,
        png,
        dropped_scanlines,
    })
}

/// Deterministic output name for a container: same base name, `.png`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_code_and_message() {
        let error = MzpError::new(MzpErrorCode::UnsupportedFormat, "PEH");
        assert_eq!(error.to_string(), "UNSUPPORTED_FORMAT: PEH");
    }

    #[test]
    fn empty_entry_table_is_rejected() {
        struct Never;
        impl Decompress for Never {
            fn decompress(&self, _: &[u8], _: usize) -> Result<Vec<u8>> {
                unreachable!()
            }
        }

        let error = extract_to_png(
            &mut std::io::Cursor::new(Vec::new()),
            &[],
            &Never,
            &ExtractOptions::default(),
        )
        .expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::InvalidHeader);
    }

    #[test]
    fn output_name_swaps_the_extension() {
        assert_eq!(
            output_path(Path::new("scenes/title.mzp")),
            PathBuf::from("scenes/title.png")
        );
    }
}
