use crate::consts::{
    PALETTE_BLOCK_LENGTH, PALETTE_ENTRY_LENGTH, PALETTE_SLOTS, PALETTE_SUB_BLOCK_ENTRIES,
    PALETTE_SUB_BLOCK_LENGTH,
};
use crate::header::PaletteLayout;
use crate::{MzpError, MzpErrorCode, Result};

/// The shared 256-slot palette, kept as the two projections the PNG encoder
/// consumes: RGB triples for `PLTE` and the parallel alpha bytes for `tRNS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    rgb: Vec<u8>,
    alpha: Vec<u8>,
}

impl Palette {
    /// Decodes `palette_count` on-disk entries (4 bytes each, R,G,B followed
    /// by a 7-bit alpha) and pads the remaining slots with opaque black.
    pub fn build(bytes: &[u8], layout: PaletteLayout, palette_count: usize) -> Result<Self> {
        let needed = palette_count * PALETTE_ENTRY_LENGTH;
        if bytes.len() < needed {
            return Err(MzpError::new(
                MzpErrorCode::InvalidHeader,
                format!(
                    "Palette data too short. expected={needed} got={}",
                    bytes.len()
                ),
            ));
        }

        let mut palette = Palette {
            rgb: Vec::with_capacity(PALETTE_SLOTS * 3),
            alpha: Vec::with_capacity(PALETTE_SLOTS),
        };

        match layout {
            PaletteLayout::Linear => {
                for entry in bytes[..needed].chunks_exact(PALETTE_ENTRY_LENGTH) {
                    palette.push_entry(entry);
                }
            }
            PaletteLayout::BlockSwizzled => {
                for block in 0..needed / PALETTE_BLOCK_LENGTH {
                    for col in 0..2 {
                        for row in 0..2 {
                            let sub_block = block * PALETTE_BLOCK_LENGTH
                                + (col + row * 2) * PALETTE_SUB_BLOCK_LENGTH;
                            for entry_index in 0..PALETTE_SUB_BLOCK_ENTRIES {
                                let start = sub_block + entry_index * PALETTE_ENTRY_LENGTH;
                                palette.push_entry(&bytes[start..start + PALETTE_ENTRY_LENGTH]);
                            }
                        }
                    }
                }
            }
        }

        for _ in palette.alpha.len()..PALETTE_SLOTS {
            palette.rgb.extend_from_slice(&[0, 0, 0]);
            palette.alpha.push(0xFF);
        }

        Ok(palette)
    }

    fn push_entry(&mut self, entry: &[u8]) {
        self.rgb.extend_from_slice(&entry[..3]);
        self.alpha.push(expand_alpha(entry[3]));
    }

    /// 768 bytes of RGB triples in logical index order.
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// 256 alpha bytes parallel to `rgb`.
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }
}

/// Expands the container's 7-bit alpha channel to the full 8-bit range, with
/// a rounding correction from the top bits; 0x80 and above are fully opaque.
pub fn expand_alpha(raw: u8) -> u8 {
    if raw < 0x80 {
        (raw << 1) | (raw >> 6)
    } else {
        0xFF
    }
}
