use crate::common::read_u32_le;
use crate::consts::{HEP_HEADER_LENGTH, HEP_PALETTE_LENGTH, TILE_RECORD_HEADER_LENGTH};
use crate::header::PixelFormat;
use crate::{MzpError, MzpErrorCode, Result};

/// The external tile decompression codec. Implementations must return exactly
/// `expected_len` bytes; any framing is internal to the collaborator.
pub trait Decompress {
    fn decompress(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

impl<F> Decompress for F
where
    F: Fn(&[u8], usize) -> Result<Vec<u8>>,
{
    fn decompress(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        self(compressed, expected_len)
    }
}

/// Decodes one tile record (8-byte header plus compressed payload) into the
/// canonical per-pixel buffer for `format`: index bytes, RGB24, or RGBA32,
/// row-major and uncropped.
pub fn decode_tile(
    record: &[u8],
    format: PixelFormat,
    tile_size: usize,
    decompressor: &impl Decompress,
) -> Result<Vec<u8>> {
    if record.len() < TILE_RECORD_HEADER_LENGTH {
        return Err(MzpError::new(
            MzpErrorCode::DecodeFailed,
            "Tile record shorter than its fixed header.",
        ));
    }
    // First field is a signature the original tooling never checks.
    let declared_len = read_u32_le(record, 4)? as usize;

    let raw = decompressor.decompress(&record[TILE_RECORD_HEADER_LENGTH..], declared_len)?;
    if raw.len() != declared_len {
        return Err(MzpError::new(
            MzpErrorCode::DecodeFailed,
            format!(
                "Decompressor returned {} bytes, tile declared {declared_len}.",
                raw.len()
            ),
        ));
    }

    match format {
        PixelFormat::Indexed4 => Ok(unpack_nibbles(&raw)),
        PixelFormat::Indexed8 => Ok(raw),
        PixelFormat::PackedRgb => expand_packed_color(&raw, tile_size, false),
        PixelFormat::PackedRgba => expand_packed_color(&raw, tile_size, true),
        PixelFormat::EmbeddedPalette => resolve_embedded_palette(&raw),
    }
}

/// Each byte packs two palette indices, low nibble first.
fn unpack_nibbles(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() * 2);
    for byte in raw {
        out.push(byte & 0x0F);
        out.push(byte >> 4);
    }
    out
}

/// Expands the packed 16-bit plane to RGB24/RGBA32. Plane 0 interleaves two
/// bytes `(P,Q)` per pixel, the plane at `tile_size*2` holds a per-pixel
/// correction byte restoring the precision lost to the packing, and RGBA
/// tiles carry the alpha plane at `tile_size*3`.
fn expand_packed_color(raw: &[u8], tile_size: usize, with_alpha: bool) -> Result<Vec<u8>> {
    let planes = if with_alpha { 4 } else { 3 };
    if raw.len() < tile_size * planes {
        return Err(MzpError::new(
            MzpErrorCode::DecodeFailed,
            format!(
                "Packed-color tile too short. expected={} got={}",
                tile_size * planes,
                raw.len()
            ),
        ));
    }

    let mut out = Vec::with_capacity(tile_size * planes);
    for index in 0..tile_size {
        let p = raw[index * 2];
        let q = raw[index * 2 + 1];
        let b = (p & 0x1F) << 3;
        let g = ((q & 0x07) << 5) | ((p & 0xE0) >> 3);
        let r = q & 0xF8;

        // Field widths leave exactly enough headroom for the correction, so
        // the additions cannot wrap.
        let correction = raw[tile_size * 2 + index];
        out.push(r + (correction >> 5));
        out.push(g + ((correction & 0x1F) >> 3));
        out.push(b + (correction & 0x07));
        if with_alpha {
            out.push(raw[tile_size * 3 + index]);
        }
    }
    Ok(out)
}

/// "HEP" tiles: `[32-byte header][index bytes][1024-byte trailing palette]`.
/// Each index resolves to the first three bytes of its palette entry; the
/// per-tile alpha byte carries no usable transparency and is dropped.
fn resolve_embedded_palette(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.len() < HEP_HEADER_LENGTH + HEP_PALETTE_LENGTH {
        return Err(MzpError::new(
            MzpErrorCode::DecodeFailed,
            format!(
                "Embedded-palette tile too short. minimum={} got={}",
                HEP_HEADER_LENGTH + HEP_PALETTE_LENGTH,
                raw.len()
            ),
        ));
    }

    let indices = &raw[HEP_HEADER_LENGTH..raw.len() - HEP_PALETTE_LENGTH];
    let palette = &raw[raw.len() - HEP_PALETTE_LENGTH..];
    let mut out = Vec::with_capacity(indices.len() * 3);
    for &index in indices {
        let entry = usize::from(index) * 4;
        out.extend_from_slice(&palette[entry..entry + 3]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stored;

    impl Decompress for Stored {
        fn decompress(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>> {
            Ok(compressed[..expected_len.min(compressed.len())].to_vec())
        }
    }

    fn record(payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"mzx0");
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn unpacks_two_indices_per_byte_low_nibble_first() {
        let decoded =
            decode_tile(&record(&[0x21, 0x43]), PixelFormat::Indexed4, 4, &Stored)
                .expect("decode tile");
        assert_eq!(decoded, vec![0x1, 0x2, 0x3, 0x4]);
    }

    #[test]
    fn passes_index8_bytes_through() {
        let decoded =
            decode_tile(&record(&[9, 8, 7, 6]), PixelFormat::Indexed8, 4, &Stored)
                .expect("decode tile");
        assert_eq!(decoded, vec![9, 8, 7, 6]);
    }

    #[test]
    fn saturating_correction_on_zero_base() {
        // One-pixel tile: P=Q=0 gives a zero base, a full correction byte
        // contributes its 3/2/3-bit fields verbatim.
        let payload = [0x00, 0x00, 0xFF];
        let decoded = decode_tile(&record(&payload), PixelFormat::PackedRgb, 1, &Stored)
            .expect("decode tile");
        assert_eq!(decoded, vec![7, 3, 7]);
    }

    #[test]
    fn expands_packed_color_fields() {
        // P=0xFF, Q=0xFF: every packed field at its maximum, correction 0xFF
        // saturates each channel at 0xFF exactly.
        let payload = [0xFF, 0xFF, 0xFF];
        let decoded = decode_tile(&record(&payload), PixelFormat::PackedRgb, 1, &Stored)
            .expect("decode tile");
        assert_eq!(decoded, vec![0xFF, 0xFF, 0xFF]);

        // P=0x1F selects only the blue field: b = 0x1F<<3 = 0xF8.
        let payload = [0x1F, 0x00, 0x00];
        let decoded = decode_tile(&record(&payload), PixelFormat::PackedRgb, 1, &Stored)
            .expect("decode tile");
        assert_eq!(decoded, vec![0x00, 0x00, 0xF8]);
    }

    #[test]
    fn reads_alpha_from_its_own_plane() {
        let payload = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xAB];
        let decoded = decode_tile(&record(&payload), PixelFormat::PackedRgba, 2, &Stored)
            .expect("decode tile");
        assert_eq!(decoded, vec![0, 0, 0, 0, 0, 0, 0, 0xAB]);
    }

    #[test]
    fn rejects_short_packed_planes() {
        let payload = [0x00, 0x00];
        let error = decode_tile(&record(&payload), PixelFormat::PackedRgb, 1, &Stored)
            .expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::DecodeFailed);
    }

    #[test]
    fn resolves_embedded_palette_entries() {
        let mut payload = vec![0_u8; HEP_HEADER_LENGTH];
        payload.extend_from_slice(&[0, 1]);
        let mut palette = vec![0_u8; HEP_PALETTE_LENGTH];
        palette[..4].copy_from_slice(&[10, 20, 30, 99]);
        palette[4..8].copy_from_slice(&[40, 50, 60, 99]);
        payload.extend_from_slice(&palette);

        let decoded = decode_tile(&record(&payload), PixelFormat::EmbeddedPalette, 2, &Stored)
            .expect("decode tile");
        assert_eq!(decoded, vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn rejects_collaborator_size_mismatch() {
        struct Short;
        impl Decompress for Short {
            fn decompress(&self, _compressed: &[u8], _expected_len: usize) -> Result<Vec<u8>> {
                Ok(vec![0])
            }
        }

        let error = decode_tile(&record(&[1, 2, 3, 4]), PixelFormat::Indexed8, 4, &Short)
            .expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::DecodeFailed);
    }
}
