use std::io::{Read, Seek, SeekFrom};

use log::warn;

use crate::header::{BitmapHeader, PixelFormat};
use crate::tile::{decode_tile, Decompress};
use crate::{MzpError, MzpErrorCode, Result, TileEntry};

/// What to do when a decoded scanline targets a canvas row that was never
/// allocated. The permissive default mirrors the historical behavior but
/// keeps the drop visible to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    #[default]
    DropAndReport,
    Fail,
}

/// Diagnostic record for one scanline discarded by `OverflowPolicy::DropAndReport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedScanline {
    pub tile_x: u16,
    pub tile_y: u16,
    pub scanline: usize,
    pub target_row: usize,
}

/// The assembled image: cropped scanlines in top-to-bottom order. Row count
/// is derived from the per-tile-row contributions actually produced, so the
/// published height always matches the allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    rows: Vec<Vec<u8>>,
    width: usize,
    bytes_per_pixel: usize,
}

impl Canvas {
    pub(crate) fn new(rows: Vec<Vec<u8>>, width: usize, bytes_per_pixel: usize) -> Self {
        Canvas {
            rows,
            width,
            bytes_per_pixel,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }
}

/// Walks the tile grid in row-major order, decodes each tile, and
/// accumulates its cropped scanlines into the canvas.
pub fn compose<R, D>(
    source: &mut R,
    tiles: &[TileEntry],
    header: &BitmapHeader,
    format: PixelFormat,
    decompressor: &D,
    policy: OverflowPolicy,
) -> Result<(Canvas, Vec<DroppedScanline>)>
where
    R: Read + Seek,
    D: Decompress,
{
    let width = usize::from(header.width);
    let height = usize::from(header.height);
    let tile_width = usize::from(header.tile_width);
    let tile_height = usize::from(header.tile_height);
    let crop = usize::from(header.tile_crop);
    let bytes_per_pixel = format.bytes_per_pixel();
    let stride = tile_height - 2 * crop;

    // Number of scanlines each tile row contributes, clipped at the image's
    // bottom edge.
    let row_counts: Vec<usize> = (0..usize::from(header.tile_y_count))
        .map(|y| {
            let start_row = y * stride;
            height
                .min(start_row + tile_height)
                .saturating_sub(start_row + 2 * crop)
        })
        .collect();

    let mut rows: Vec<Vec<u8>> = vec![Vec::new(); row_counts.iter().sum()];
    let mut dropped = Vec::new();
    let mut record = Vec::new();

    for (y, &row_count) in row_counts.iter().enumerate() {
        let start_row = y * stride;
        for x in 0..usize::from(header.tile_x_count) {
            let entry = &tiles[y * usize::from(header.tile_x_count) + x];
            read_entry(source, entry, &mut record)?;
            let decoded = decode_tile(&record, format, header.tile_size(), decompressor)?;

            for (i, scanline) in decoded.chunks(tile_width * bytes_per_pixel).enumerate() {
                if i < crop {
                    continue;
                }
                if i - crop >= row_count {
                    break;
                }
                let target_row = start_row + i - crop;
                let Some(row) = rows.get_mut(target_row) else {
                    let drop = DroppedScanline {
                        tile_x: x as u16,
                        tile_y: y as u16,
                        scanline: i,
                        target_row,
                    };
                    handle_overflow(policy, drop, &mut dropped)?;
                    continue;
                };

                // Running width counter, in pixels: the last column may spill
                // past the declared image width and its excess is discarded.
                let current = row.len() / bytes_per_pixel;
                let take = width.min(current + tile_width).saturating_sub(current);
                let taken = &scanline[..(take * bytes_per_pixel).min(scanline.len())];
                let crop_bytes = crop * bytes_per_pixel;
                if taken.len() > 2 * crop_bytes {
                    row.extend_from_slice(&taken[crop_bytes..taken.len() - crop_bytes]);
                }
            }
        }
    }

    Ok((Canvas::new(rows, header.out_width(), bytes_per_pixel), dropped))
}

fn read_entry<R: Read + Seek>(
    source: &mut R,
    entry: &TileEntry,
    record: &mut Vec<u8>,
) -> Result<()> {
    source.seek(SeekFrom::Start(entry.offset)).map_err(|err| {
        MzpError::new(
            MzpErrorCode::Io,
            format!("Could not seek to tile entry at offset {}: {err}", entry.offset),
        )
    })?;
    record.clear();
    record.resize(entry.byte_length as usize, 0);
    source.read_exact(record).map_err(|err| {
        MzpError::new(
            MzpErrorCode::Io,
            format!("Could not read tile entry at offset {}: {err}", entry.offset),
        )
    })
}

fn handle_overflow(
    policy: OverflowPolicy,
    drop: DroppedScanline,
    dropped: &mut Vec<DroppedScanline>,
) -> Result<()> {
    match policy {
        OverflowPolicy::DropAndReport => {
            warn!(
                "Dropping scanline {} of tile ({}, {}): canvas row {} was never allocated",
                drop.scanline, drop.tile_x, drop.tile_y, drop.target_row
            );
            dropped.push(drop);
            Ok(())
        }
        OverflowPolicy::Fail => Err(MzpError::new(
            MzpErrorCode::StitchOverflow,
            format!(
                "Scanline {} of tile ({}, {}) targets unallocated canvas row {}.",
                drop.scanline, drop.tile_x, drop.tile_y, drop.target_row
            ),
        )),
    }
}
