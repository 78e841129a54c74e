use crate::common::read_u16_le;
use crate::consts::{
    BITMAP_HEADER_LENGTH, BMP_TYPE_HEP, BMP_TYPE_INDEXED, BMP_TYPE_PEH, BMP_TYPE_RGB,
    BMP_TYPE_RGBA, OFFSET_BMP_DEPTH, OFFSET_BMP_TYPE, OFFSET_HEIGHT, OFFSET_TILE_CROP,
    OFFSET_TILE_HEIGHT, OFFSET_TILE_WIDTH, OFFSET_TILE_X_COUNT, OFFSET_TILE_Y_COUNT, OFFSET_WIDTH,
};
use crate::{MzpError, MzpErrorCode, Result};

/// The fixed 16-byte little-endian grid/bitmap descriptor stored in the
/// container's first entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub width: u16,
    pub height: u16,
    pub tile_width: u16,
    pub tile_height: u16,
    pub tile_x_count: u16,
    pub tile_y_count: u16,
    pub bmp_type: u16,
    pub bmp_depth: u8,
    pub tile_crop: u8,
}

impl BitmapHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BITMAP_HEADER_LENGTH {
            return Err(MzpError::new(
                MzpErrorCode::InvalidHeader,
                "Entry shorter than the fixed bitmap header.",
            ));
        }

        let header = BitmapHeader {
            width: read_u16_le(bytes, OFFSET_WIDTH)?,
            height: read_u16_le(bytes, OFFSET_HEIGHT)?,
            tile_width: read_u16_le(bytes, OFFSET_TILE_WIDTH)?,
            tile_height: read_u16_le(bytes, OFFSET_TILE_HEIGHT)?,
            tile_x_count: read_u16_le(bytes, OFFSET_TILE_X_COUNT)?,
            tile_y_count: read_u16_le(bytes, OFFSET_TILE_Y_COUNT)?,
            bmp_type: read_u16_le(bytes, OFFSET_BMP_TYPE)?,
            bmp_depth: bytes[OFFSET_BMP_DEPTH],
            tile_crop: bytes[OFFSET_TILE_CROP],
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MzpError::new(
                MzpErrorCode::InvalidHeader,
                "width and height must be > 0.",
            ));
        }
        if self.tile_x_count == 0 || self.tile_y_count == 0 {
            return Err(MzpError::new(
                MzpErrorCode::InvalidHeader,
                "tile grid counts must be > 0.",
            ));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(MzpError::new(
                MzpErrorCode::InvalidHeader,
                "tile dimensions must be > 0.",
            ));
        }
        let crop_span = 2 * u16::from(self.tile_crop);
        if crop_span > self.tile_width.min(self.tile_height) {
            return Err(MzpError::new(
                MzpErrorCode::InvalidHeader,
                format!(
                    "tile_crop {} overruns the {}x{} tile.",
                    self.tile_crop, self.tile_width, self.tile_height
                ),
            ));
        }
        Ok(())
    }

    pub fn tile_size(&self) -> usize {
        usize::from(self.tile_width) * usize::from(self.tile_height)
    }

    pub fn tile_count(&self) -> usize {
        usize::from(self.tile_x_count) * usize::from(self.tile_y_count)
    }

    /// Output width once the per-tile crop borders are removed.
    pub fn out_width(&self) -> usize {
        usize::from(self.width)
            .saturating_sub(2 * usize::from(self.tile_crop) * usize::from(self.tile_x_count))
    }
}

/// How palette bytes are physically laid out in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteLayout {
    Linear,
    BlockSwizzled,
}

/// Pixel encoding descriptor, selected once from `(bmp_type, bmp_depth)`.
/// All downstream stages dispatch on this instead of re-inspecting the raw
/// codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Two palette indices per byte, 16-entry linear palette.
    Indexed4,
    /// One palette index per byte, 256-entry block-swizzled palette.
    Indexed8,
    /// Packed 16-bit color plus a correction plane, decoded to RGB24.
    PackedRgb,
    /// As `PackedRgb` with an additional alpha plane, decoded to RGBA32.
    PackedRgba,
    /// "HEP" tiles carrying their own trailing palette, decoded to RGB24.
    EmbeddedPalette,
}

impl PixelFormat {
    pub fn from_header(header: &BitmapHeader) -> Result<Self> {
        match header.bmp_type {
            BMP_TYPE_INDEXED => match header.bmp_depth {
                0x00 | 0x10 => Ok(Self::Indexed4),
                0x01 | 0x11 | 0x91 => Ok(Self::Indexed8),
                depth => Err(unknown_depth(header.bmp_type, depth)),
            },
            BMP_TYPE_RGB => match header.bmp_depth {
                0x14 => Ok(Self::PackedRgb),
                depth => Err(unknown_depth(header.bmp_type, depth)),
            },
            BMP_TYPE_RGBA => match header.bmp_depth {
                0x14 => Ok(Self::PackedRgba),
                depth => Err(unknown_depth(header.bmp_type, depth)),
            },
            BMP_TYPE_HEP => match header.bmp_depth {
                0x11 => Ok(Self::EmbeddedPalette),
                depth => Err(unknown_depth(header.bmp_type, depth)),
            },
            BMP_TYPE_PEH => Err(MzpError::new(
                MzpErrorCode::UnsupportedFormat,
                "Bitmap type 0x03 (PEH) is recognized but not supported.",
            )),
            code => Err(MzpError::new(
                MzpErrorCode::UnknownBitmapType,
                format!("Unknown bitmap type 0x{code:02X}."),
            )),
        }
    }

    pub fn bits_per_pixel(self) -> usize {
        match self {
            Self::Indexed4 => 4,
            Self::Indexed8 => 8,
            Self::PackedRgb | Self::EmbeddedPalette => 24,
            Self::PackedRgba => 32,
        }
    }

    /// Width of one canonical decoded pixel; sub-byte indices expand to one
    /// byte per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        (self.bits_per_pixel() / 8).max(1)
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Indexed4 | Self::Indexed8)
    }

    /// On-disk palette layout and entry count, for formats with a shared
    /// palette following the header.
    pub fn palette(self) -> Option<(PaletteLayout, usize)> {
        match self {
            Self::Indexed4 => Some((PaletteLayout::Linear, 16)),
            Self::Indexed8 => Some((PaletteLayout::BlockSwizzled, 256)),
            _ => None,
        }
    }
}

fn unknown_depth(bmp_type: u16, depth: u8) -> MzpError {
    MzpError::new(
        MzpErrorCode::UnknownBitmapDepth,
        format!("Unknown depth 0x{depth:02X} for bitmap type 0x{bmp_type:02X}."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(bmp_type: u16, bmp_depth: u8, tile_crop: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        for field in [64_u16, 48, 32, 24, 2, 2] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes.extend_from_slice(&bmp_type.to_le_bytes());
        bytes.push(bmp_depth);
        bytes.push(tile_crop);
        bytes
    }

    #[test]
    fn parses_fixed_record() {
        let header = BitmapHeader::parse(&header_bytes(0x01, 0x11, 4)).expect("parse header");
        assert_eq!(header.width, 64);
        assert_eq!(header.height, 48);
        assert_eq!(header.tile_width, 32);
        assert_eq!(header.tile_height, 24);
        assert_eq!(header.tile_x_count, 2);
        assert_eq!(header.tile_y_count, 2);
        assert_eq!(header.bmp_type, 0x01);
        assert_eq!(header.bmp_depth, 0x11);
        assert_eq!(header.tile_crop, 4);
        assert_eq!(header.tile_size(), 32 * 24);
        assert_eq!(header.tile_count(), 4);
        assert_eq!(header.out_width(), 64 - 2 * 4 * 2);
    }

    #[test]
    fn rejects_truncated_record() {
        let error = BitmapHeader::parse(&[0_u8; 15]).expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::InvalidHeader);
    }

    #[test]
    fn rejects_crop_wider_than_tile() {
        let error = BitmapHeader::parse(&header_bytes(0x01, 0x11, 13)).expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::InvalidHeader);
    }

    #[test]
    fn derives_formats_from_type_and_depth() {
        let cases = [
            (0x01_u16, 0x00_u8, PixelFormat::Indexed4),
            (0x01, 0x10, PixelFormat::Indexed4),
            (0x01, 0x01, PixelFormat::Indexed8),
            (0x01, 0x11, PixelFormat::Indexed8),
            (0x01, 0x91, PixelFormat::Indexed8),
            (0x08, 0x14, PixelFormat::PackedRgb),
            (0x0B, 0x14, PixelFormat::PackedRgba),
            (0x0C, 0x11, PixelFormat::EmbeddedPalette),
        ];
        for (bmp_type, depth, expected) in cases {
            let header =
                BitmapHeader::parse(&header_bytes(bmp_type, depth, 0)).expect("parse header");
            assert_eq!(PixelFormat::from_header(&header).expect("derive format"), expected);
        }
    }

    #[test]
    fn format_parameters() {
        assert_eq!(PixelFormat::Indexed4.bits_per_pixel(), 4);
        assert_eq!(PixelFormat::Indexed4.bytes_per_pixel(), 1);
        assert_eq!(
            PixelFormat::Indexed4.palette(),
            Some((PaletteLayout::Linear, 16))
        );
        assert_eq!(
            PixelFormat::Indexed8.palette(),
            Some((PaletteLayout::BlockSwizzled, 256))
        );
        assert_eq!(PixelFormat::PackedRgb.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::PackedRgba.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::EmbeddedPalette.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::EmbeddedPalette.palette(), None);
    }

    #[test]
    fn rejects_unknown_type() {
        let header = BitmapHeader::parse(&header_bytes(0x05, 0x14, 0)).expect("parse header");
        let error = PixelFormat::from_header(&header).expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::UnknownBitmapType);
    }

    #[test]
    fn rejects_unknown_depth() {
        let header = BitmapHeader::parse(&header_bytes(0x08, 0x15, 0)).expect("parse header");
        let error = PixelFormat::from_header(&header).expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::UnknownBitmapDepth);
    }

    #[test]
    fn rejects_peh_as_unsupported() {
        let header = BitmapHeader::parse(&header_bytes(0x03, 0x01, 0)).expect("parse header");
        let error = PixelFormat::from_header(&header).expect_err("should fail");
        assert_eq!(error.code, MzpErrorCode::UnsupportedFormat);
    }
}
